//! Hybrid retrieval
//!
//! Runs a semantic leg (indexer search rescored with keyword overlap) and a
//! filename leg (fuzzy match over staged and scanned files), then fuses both
//! by path into one thresholded ranking.

mod filename;
mod fusion;
mod hybrid;
mod query;
mod similarity;

pub use filename::{FilenameMatch, FilenameMatcher};
pub use fusion::{fuse, FusionParams, HybridResult, LegHit, MatchSource};
pub use hybrid::{preview, HybridSearcher};
pub use query::{expand_query, SearchStrategy};
pub use similarity::{keyword_overlap, sequence_ratio, tokens};
