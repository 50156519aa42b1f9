/// Document indexing
///
/// - Chunker: overlapping char windows
/// - Processors: text extraction per file type
/// - DocumentIndexer: eligibility, embedding, atomic commit, maintenance
mod chunker;
mod indexer;
mod processor;

pub use chunker::Chunker;
pub(crate) use indexer::absolute_path;
pub use indexer::{BatchStats, DocumentIndexer, IndexOutcome, IndexStats, SearchHit, SkipReason};
pub use processor::{ExtractedDocument, FileProcessor, Processor, ProcessorRegistry};
