//! Document indexer
//!
//! Owns the metadata store and the vector index and keeps them consistent:
//! vectors are appended before the document row is written, so a failed
//! metadata write leaves orphaned slots and never a chunk pointing at a
//! missing vector. Commits are serialised by a single lock; extraction and
//! embedding run outside it.

use super::chunker::Chunker;
use super::processor::{file_facts, FileProcessor, ProcessorRegistry};
use crate::config::Config;
use crate::embedding::{
    create_provider, embed_normalized, normalize, EmbeddingError, EmbeddingProvider, IndexBackend,
    SlotRecord, VectorIndex,
};
use crate::error::{DocseekError, Result};
use crate::storage::{MetadataBlob, MetadataStore, NewDocument, StorageLayout};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Files whose stored mtime is within this many seconds count as unchanged
const MTIME_TOLERANCE_SECS: f64 = 1.0;

/// Why a file was not indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    NotAFile,
    UnsupportedExtension,
    TooLarge,
    IgnoredDirectory,
    AlreadyCurrent,
    NoProcessor,
    EmptyContent,
    NoChunks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndexOutcome {
    Indexed { chunks: usize },
    Skipped(SkipReason),
}

impl IndexOutcome {
    pub fn is_indexed(&self) -> bool {
        matches!(self, IndexOutcome::Indexed { .. })
    }
}

/// Counters for a batch of files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub processed: usize,
    pub indexed: usize,
    pub errors: usize,
}

impl BatchStats {
    fn merge(&mut self, other: BatchStats) {
        self.processed += other.processed;
        self.indexed += other.indexed;
        self.errors += other.errors;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub total_chunks: usize,
    pub vector_count: usize,
    pub orphaned_slots: usize,
    pub index_size_mb: f64,
}

/// One document matched by a semantic search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub path: String,
    pub name: String,
    pub score: f32,
    pub chunk_index: usize,
    /// Text of the best-scoring chunk
    pub content: String,
    pub metadata: MetadataBlob,
}

pub struct DocumentIndexer {
    config: Config,
    layout: StorageLayout,
    store: MetadataStore,
    vectors: VectorIndex,
    provider: Arc<dyn EmbeddingProvider>,
    chunker: Chunker,
    processors: ProcessorRegistry,
    commit_lock: Mutex<()>,
}

impl DocumentIndexer {
    /// Open the index under `config.storage.data_dir` with the configured
    /// embedding model
    pub fn open(config: &Config) -> Result<Self> {
        let provider = create_provider(&config.embedding)?;
        Self::with_provider(config, provider)
    }

    /// Open the index with an explicit embedding provider
    pub fn with_provider(config: &Config, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        if provider.dimension() != config.embedding.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: config.embedding.dimension,
                actual: provider.dimension(),
            }
            .into());
        }

        let chunker = Chunker::new(config.indexing.chunk_size, config.indexing.chunk_overlap)?;
        let layout = StorageLayout::new(config.storage.data_dir.clone())?;
        let store = MetadataStore::open(&layout.metadata_db_path())?;
        let backend = IndexBackend::from_config(&config.vector_index)?;

        let mut needs_rebuild = false;
        let vectors = match VectorIndex::open(
            config.embedding.dimension,
            backend,
            layout.vectors_dir(),
        ) {
            Ok(vectors) => vectors,
            Err(e) => {
                warn!("Vector index unreadable ({}), starting empty", e);
                needs_rebuild = true;
                VectorIndex::new(config.embedding.dimension, backend, layout.vectors_dir())
            }
        };

        if !needs_rebuild {
            if let Some(slot) = first_mismatched_slot(&store, &vectors)? {
                warn!(
                    "Metadata and vector index disagree at slot {} ({} vectors)",
                    slot,
                    vectors.count()
                );
                needs_rebuild = true;
            }
        }

        let indexer = Self {
            config: config.clone(),
            layout,
            store,
            vectors,
            provider,
            chunker,
            processors: ProcessorRegistry::new(),
            commit_lock: Mutex::new(()),
        };

        if needs_rebuild && indexer.store.count_chunks()? > 0 {
            indexer.rebuild_from_store()?;
        }

        info!(
            "Opened index at {} ({} documents, {} vectors, {})",
            indexer.layout.base_path().display(),
            indexer.store.count_documents()?,
            indexer.vectors.count(),
            indexer.provider.model_name()
        );

        Ok(indexer)
    }

    /// Add a processor that is consulted before the built-in ones
    pub fn register_processor(&mut self, processor: Arc<dyn FileProcessor>) {
        self.processors.register(processor);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn vector_count(&self) -> usize {
        self.vectors.count()
    }

    /// Index one file; `true` if it was (re)indexed, `false` if skipped
    pub fn index_file(&self, path: &Path) -> Result<bool> {
        Ok(self.index_file_detailed(path)?.is_indexed())
    }

    /// Index one file, reporting why it was skipped
    pub fn index_file_detailed(&self, path: &Path) -> Result<IndexOutcome> {
        self.index_file_inner(path, false)
    }

    fn index_file_inner(&self, path: &Path, force: bool) -> Result<IndexOutcome> {
        let path = absolute_path(path)?;
        let path_str = path.to_string_lossy().to_string();

        if !path.is_file() {
            return Ok(self.skip(&path, SkipReason::NotAFile));
        }

        let (size, mtime) = file_facts(&path)?;
        if let Some(reason) = self.check_eligibility(&path, size, mtime, force)? {
            return Ok(self.skip(&path, reason));
        }

        let Some(processor) = self.processors.find(&path) else {
            return Ok(self.skip(&path, SkipReason::NoProcessor));
        };
        let extracted = processor.extract(&path)?;
        if extracted.content.trim().is_empty() {
            return Ok(self.skip(&path, SkipReason::EmptyContent));
        }

        let chunks = self.chunker.chunk(&extracted.content);
        if chunks.is_empty() {
            return Ok(self.skip(&path, SkipReason::NoChunks));
        }

        let embeddings = embed_normalized(
            self.provider.as_ref(),
            &chunks,
            self.config.embedding.batch_size,
        )?;

        let document = NewDocument {
            path: path_str.clone(),
            name: file_name(&path),
            size: extracted.size,
            mtime: extracted.mtime,
            content_hash: blake3::hash(extracted.content.as_bytes()).to_hex().to_string(),
            chunk_count: chunks.len(),
            indexed_at: Utc::now(),
            metadata: extracted.metadata,
        };
        let records: Vec<SlotRecord> = (0..chunks.len())
            .map(|chunk_index| SlotRecord {
                path: path_str.clone(),
                chunk_index,
            })
            .collect();

        let chunk_count = chunks.len();
        {
            let _guard = self.lock_commits()?;
            // another writer may have committed this file since the first check
            if !force && self.is_current(&path, mtime)? {
                return Ok(self.skip(&path, SkipReason::AlreadyCurrent));
            }
            let start = self.vectors.add(&embeddings, records)?;
            let rows: Vec<(String, usize)> = chunks
                .into_iter()
                .enumerate()
                .map(|(i, chunk)| (chunk, start + i))
                .collect();

            if let Err(e) = self.store.replace_document(&document, &rows) {
                warn!(
                    "Metadata write failed for {}, {} vector slots orphaned: {}",
                    path.display(),
                    chunk_count,
                    e
                );
                return Err(e);
            }
        }

        info!("Indexed: {} ({} chunks)", path.display(), chunk_count);
        Ok(IndexOutcome::Indexed {
            chunks: chunk_count,
        })
    }

    fn skip(&self, path: &Path, reason: SkipReason) -> IndexOutcome {
        debug!("Skipped {}: {:?}", path.display(), reason);
        IndexOutcome::Skipped(reason)
    }

    fn check_eligibility(
        &self,
        path: &Path,
        size: u64,
        mtime: f64,
        force: bool,
    ) -> Result<Option<SkipReason>> {
        if !self.is_supported_extension(path) {
            return Ok(Some(SkipReason::UnsupportedExtension));
        }
        if size > self.config.max_file_size_bytes() {
            return Ok(Some(SkipReason::TooLarge));
        }
        if self.in_ignored_directory(path) {
            return Ok(Some(SkipReason::IgnoredDirectory));
        }
        if !force && self.is_current(path, mtime)? {
            return Ok(Some(SkipReason::AlreadyCurrent));
        }
        Ok(None)
    }

    fn is_supported_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension() else {
            return false;
        };
        let ext = format!(".{}", ext.to_string_lossy().to_lowercase());
        self.config
            .indexing
            .supported_extensions
            .iter()
            .any(|supported| supported.to_lowercase() == ext)
    }

    /// True if any ancestor directory matches an ignored entry; entries with
    /// a `/` match that many consecutive components
    pub fn in_ignored_directory(&self, path: &Path) -> bool {
        let components: Vec<String> = path
            .parent()
            .map(|parent| {
                parent
                    .components()
                    .filter_map(|c| match c {
                        std::path::Component::Normal(name) => {
                            Some(name.to_string_lossy().to_string())
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        self.config.indexing.ignored_directories.iter().any(|entry| {
            let parts: Vec<&str> = entry.split('/').filter(|p| !p.is_empty()).collect();
            !parts.is_empty()
                && components
                    .windows(parts.len())
                    .any(|window| window.iter().zip(&parts).all(|(a, b)| a == b))
        })
    }

    fn is_current(&self, path: &Path, mtime: f64) -> Result<bool> {
        Ok(self
            .store
            .get_document_by_path(&path.to_string_lossy())?
            .map(|doc| (doc.mtime - mtime).abs() < MTIME_TOLERANCE_SECS)
            .unwrap_or(false))
    }

    fn lock_commits(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.commit_lock
            .lock()
            .map_err(|_| DocseekError::Other(anyhow::anyhow!("Commit lock poisoned")))
    }

    /// Semantic search: at most one hit per document, best chunk first
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 || query.trim().is_empty() || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let mut embedding = self.provider.embed(query)?;
        normalize(&mut embedding)?;

        // Orphans may outrank live slots; over-fetch so they cannot starve
        // the result list
        let orphans = self.orphaned_slots()?;
        let candidates = self.vectors.search(&embedding, k + orphans)?;

        let threshold = self.config.search.similarity_threshold;
        let mut seen = HashSet::new();
        let mut hits = Vec::new();

        for candidate in candidates {
            if candidate.score < threshold {
                break;
            }
            let Some((chunk, document)) = self.store.get_chunk_by_slot(candidate.slot)? else {
                continue;
            };
            if !seen.insert(document.id) {
                continue;
            }
            hits.push(SearchHit {
                path: document.path,
                name: document.name,
                score: candidate.score,
                chunk_index: chunk.chunk_index,
                content: chunk.content,
                metadata: document.metadata,
            });
            if hits.len() == k {
                break;
            }
        }

        Ok(hits)
    }

    /// Forget a file; its vectors stay behind as orphans until `compact`
    pub fn remove_file_from_index(&self, path: &Path) -> Result<bool> {
        let path = absolute_path(path)?;
        let removed = {
            let _guard = self.lock_commits()?;
            self.store.delete_document_by_path(&path.to_string_lossy())?
        };
        if removed {
            info!("Removed from index: {}", path.display());
            warn!(
                "Vector index still holds {} orphaned slots; run compaction to reclaim them",
                self.orphaned_slots()?
            );
        }
        Ok(removed)
    }

    /// Index every file under `dir`, pruning ignored directories
    pub fn index_directory(&self, dir: &Path) -> Result<BatchStats> {
        let files = self.collect_files(dir)?;
        info!("Indexing {} ({} files)", dir.display(), files.len());
        self.index_paths(&files)
    }

    /// Index a staged list of paths
    pub fn index_paths(&self, paths: &[PathBuf]) -> Result<BatchStats> {
        self.index_paths_cancellable(paths, &AtomicBool::new(false))
    }

    /// Index a list of paths, stopping between files once `cancel` is set
    pub fn index_paths_cancellable(
        &self,
        paths: &[PathBuf],
        cancel: &AtomicBool,
    ) -> Result<BatchStats> {
        self.run_batch(paths, cancel, false)
    }

    fn run_batch(&self, paths: &[PathBuf], cancel: &AtomicBool, force: bool) -> Result<BatchStats> {
        let start = std::time::Instant::now();
        let mut stats = BatchStats::default();
        let mut unsaved = 0;

        for path in paths {
            if cancel.load(Ordering::Relaxed) {
                info!("Indexing cancelled after {} files", stats.processed);
                break;
            }

            stats.processed += 1;
            match self.index_file_inner(path, force) {
                Ok(IndexOutcome::Indexed { .. }) => {
                    stats.indexed += 1;
                    unsaved += 1;
                    if unsaved >= self.config.indexing.persist_every {
                        self.persist_counted(&mut stats, &mut unsaved);
                    }
                }
                Ok(IndexOutcome::Skipped(_)) => {}
                Err(e) => {
                    warn!("Failed to index {}: {}", path.display(), e);
                    stats.errors += 1;
                }
            }
        }

        if unsaved > 0 {
            self.persist_counted(&mut stats, &mut unsaved);
        }

        info!(
            "Batch complete: {} processed, {} indexed, {} errors, {}ms",
            stats.processed,
            stats.indexed,
            stats.errors,
            start.elapsed().as_millis()
        );

        Ok(stats)
    }

    /// Index paths on the blocking pool, at most `max_concurrent` at a time.
    ///
    /// Extraction and embedding overlap; commits still go through the single
    /// writer lock.
    pub async fn index_paths_concurrent(
        self: &Arc<Self>,
        paths: Vec<PathBuf>,
        max_concurrent: usize,
    ) -> Result<BatchStats> {
        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let mut handles = Vec::with_capacity(paths.len());

        for path in paths {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| DocseekError::Other(e.into()))?;
            let indexer = Arc::clone(self);

            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let outcome = indexer.index_file_detailed(&path);
                (path, outcome)
            }));
        }

        let mut stats = BatchStats::default();
        let mut unsaved = 0;

        for handle in handles {
            stats.processed += 1;
            match handle.await {
                Ok((_, Ok(IndexOutcome::Indexed { .. }))) => {
                    stats.indexed += 1;
                    unsaved += 1;
                }
                Ok((_, Ok(IndexOutcome::Skipped(_)))) => {}
                Ok((path, Err(e))) => {
                    warn!("Failed to index {}: {}", path.display(), e);
                    stats.errors += 1;
                }
                Err(e) => {
                    warn!("Indexing task failed: {}", e);
                    stats.errors += 1;
                }
            }

            if unsaved >= self.config.indexing.persist_every {
                self.persist_counted(&mut stats, &mut unsaved);
            }
        }

        if unsaved > 0 {
            self.persist_counted(&mut stats, &mut unsaved);
        }

        info!(
            "Concurrent batch complete: {} processed, {} indexed, {} errors",
            stats.processed, stats.indexed, stats.errors
        );

        Ok(stats)
    }

    /// Re-index every eligible file under the scan paths, ignoring stored
    /// mtimes, then compact away the replaced vectors
    pub fn full_reindex(&self) -> Result<BatchStats> {
        info!("Starting full reindex");
        let mut total = BatchStats::default();
        let never = AtomicBool::new(false);

        for scan_path in self.existing_scan_paths() {
            let files = self.collect_files(&scan_path)?;
            let stats = self.run_batch(&files, &never, true)?;
            info!("Completed {}: {:?}", scan_path.display(), stats);
            total.merge(stats);
        }

        if self.orphaned_slots()? > 0 {
            self.compact()?;
        }

        info!("Full reindex completed: {:?}", total);
        Ok(total)
    }

    /// Index only files under the scan paths that are new or modified
    pub fn incremental_index(&self) -> Result<BatchStats> {
        info!("Starting incremental indexing");
        let mut total = BatchStats::default();

        for scan_path in self.existing_scan_paths() {
            let mut pending = Vec::new();
            for file in self.collect_files(&scan_path)? {
                let (_, mtime) = match file_facts(&file) {
                    Ok(facts) => facts,
                    Err(e) => {
                        warn!("Failed to stat {}: {}", file.display(), e);
                        total.errors += 1;
                        continue;
                    }
                };
                if !self.is_current(&file, mtime)? {
                    pending.push(file);
                }
            }
            total.merge(self.index_paths(&pending)?);
        }

        info!("Incremental indexing completed: {:?}", total);
        Ok(total)
    }

    fn existing_scan_paths(&self) -> Vec<PathBuf> {
        self.config
            .scan
            .paths
            .iter()
            .filter(|p| p.exists())
            .cloned()
            .collect()
    }

    /// Files under `dir` (absolute), skipping ignored directories entirely
    pub fn collect_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let dir = absolute_path(dir)?;
        if !dir.is_dir() {
            return Err(DocseekError::io(
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
                format!("Cannot index {}", dir.display()),
            ));
        }

        let ignored = &self.config.indexing.ignored_directories;
        let files = WalkDir::new(&dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !ignored
                        .iter()
                        .any(|name| entry.file_name().to_string_lossy() == name.as_str())
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();

        Ok(files)
    }

    /// Slots in the vector index no chunk refers to any more
    pub fn orphaned_slots(&self) -> Result<usize> {
        Ok(self
            .vectors
            .count()
            .saturating_sub(self.store.count_chunks()?))
    }

    pub fn get_stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            total_documents: self.store.count_documents()?,
            total_chunks: self.store.count_chunks()?,
            vector_count: self.vectors.count(),
            orphaned_slots: self.orphaned_slots()?,
            index_size_mb: self.vectors.persisted_size() as f64 / (1024.0 * 1024.0),
        })
    }

    /// Write the vector index to disk
    pub fn persist(&self) -> Result<()> {
        let _guard = self.lock_commits()?;
        self.vectors.save()?;
        debug!("Persisted {} vectors", self.vectors.count());
        Ok(())
    }

    /// Persist inside a batch; a failure is counted and `unsaved` is kept so
    /// the next cadence point retries
    fn persist_counted(&self, stats: &mut BatchStats, unsaved: &mut usize) {
        match self.persist() {
            Ok(()) => *unsaved = 0,
            Err(e) => {
                warn!("Failed to persist vector index ({} files pending): {}", unsaved, e);
                stats.errors += 1;
            }
        }
    }

    /// Drop orphaned slots, keeping stored vectors for live chunks.
    ///
    /// Returns the number of slots reclaimed.
    pub fn compact(&self) -> Result<usize> {
        let _guard = self.lock_commits()?;

        let live = self.store.live_slots()?;
        let before = self.vectors.count();

        let mut vectors = Vec::with_capacity(live.len());
        let mut records = Vec::with_capacity(live.len());
        let mut mapping = Vec::with_capacity(live.len());

        for (new_slot, &old_slot) in live.iter().enumerate() {
            let (Some(vector), Some(record)) =
                (self.vectors.get(old_slot)?, self.vectors.record(old_slot)?)
            else {
                return Err(DocseekError::Other(anyhow::anyhow!(
                    "Live slot {} missing from vector index",
                    old_slot
                )));
            };
            vectors.push(vector);
            records.push(record);
            mapping.push((old_slot, new_slot));
        }

        // Store first: if it fails, the old vectors are still in place
        self.store.remap_slots(&mapping)?;
        self.vectors.replace_all(&vectors, records)?;
        self.vectors.save()?;

        let reclaimed = before - live.len();
        info!(
            "Compacted vector index: {} -> {} slots ({} reclaimed)",
            before,
            live.len(),
            reclaimed
        );
        Ok(reclaimed)
    }

    /// Re-embed every live chunk into a fresh vector index
    pub fn rebuild_from_store(&self) -> Result<()> {
        let _guard = self.lock_commits()?;

        let chunks = self.store.all_chunks()?;
        info!("Rebuilding vector index from {} stored chunks", chunks.len());

        let texts: Vec<String> = chunks.iter().map(|(c, _)| c.content.clone()).collect();
        let embeddings = embed_normalized(
            self.provider.as_ref(),
            &texts,
            self.config.embedding.batch_size,
        )?;

        let mut records = Vec::with_capacity(chunks.len());
        let mut mapping = Vec::with_capacity(chunks.len());
        for (new_slot, (chunk, path)) in chunks.into_iter().enumerate() {
            records.push(SlotRecord {
                path,
                chunk_index: chunk.chunk_index,
            });
            mapping.push((chunk.embedding_slot, new_slot));
        }

        self.store.remap_slots(&mapping)?;
        self.vectors.replace_all(&embeddings, records)?;
        self.vectors.save()?;
        Ok(())
    }
}

/// First live slot whose persisted record names a different chunk, or that
/// lies past the end of the vector index
fn first_mismatched_slot(store: &MetadataStore, vectors: &VectorIndex) -> Result<Option<usize>> {
    for (slot, path, chunk_index) in store.slot_owners()? {
        let matches = vectors
            .record(slot)?
            .map(|record| record.path == path && record.chunk_index == chunk_index)
            .unwrap_or(false);
        if !matches {
            return Ok(Some(slot));
        }
    }
    Ok(None)
}

/// Resolve `path` against the current directory without touching the disk
pub(crate) fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| DocseekError::io(e, "Failed to resolve current directory"))?;
    Ok(cwd.join(path))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingProvider;
    use tempfile::TempDir;

    fn test_config(temp: &TempDir) -> Config {
        let mut config = Config::with_data_dir(temp.path().join("data"));
        config.embedding.model = HashingProvider::MODEL_NAME.to_string();
        config.embedding.dimension = 64;
        config.search.similarity_threshold = 0.1;
        config.scan.paths = vec![temp.path().join("docs")];
        config
    }

    #[test]
    fn test_ignored_directory_matching() {
        let temp = TempDir::new().unwrap();
        let indexer = DocumentIndexer::open(&test_config(&temp)).unwrap();

        assert!(indexer.in_ignored_directory(Path::new("/home/u/project/node_modules/a/b.js")));
        assert!(indexer.in_ignored_directory(Path::new("/Users/u/Library/Caches/x/y.txt")));
        assert!(!indexer.in_ignored_directory(Path::new("/Users/u/Library/Notes/y.txt")));
        assert!(!indexer.in_ignored_directory(Path::new("/Users/u/Caches/y.txt")));
        assert!(!indexer.in_ignored_directory(Path::new("/home/u/docs/venv.txt")));
    }

    #[test]
    fn test_skip_reasons() {
        let temp = TempDir::new().unwrap();
        let mut config = test_config(&temp);
        config.indexing.max_file_size_mb = 0;
        let indexer = DocumentIndexer::open(&config).unwrap();

        let docs = temp.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();

        let binary = docs.join("tool.exe");
        std::fs::write(&binary, "MZ").unwrap();
        assert_eq!(
            indexer.index_file_detailed(&binary).unwrap(),
            IndexOutcome::Skipped(SkipReason::UnsupportedExtension)
        );

        let large = docs.join("large.txt");
        std::fs::write(&large, "some text").unwrap();
        assert_eq!(
            indexer.index_file_detailed(&large).unwrap(),
            IndexOutcome::Skipped(SkipReason::TooLarge)
        );

        assert_eq!(
            indexer.index_file_detailed(&docs).unwrap(),
            IndexOutcome::Skipped(SkipReason::NotAFile)
        );
    }

    #[test]
    fn test_empty_and_unprocessable_files() {
        let temp = TempDir::new().unwrap();
        let indexer = DocumentIndexer::open(&test_config(&temp)).unwrap();
        let docs = temp.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();

        let blank = docs.join("blank.txt");
        std::fs::write(&blank, "   \n").unwrap();
        assert_eq!(
            indexer.index_file_detailed(&blank).unwrap(),
            IndexOutcome::Skipped(SkipReason::EmptyContent)
        );

        let pdf = docs.join("scan.pdf");
        std::fs::write(&pdf, "%PDF-1.4").unwrap();
        assert_eq!(
            indexer.index_file_detailed(&pdf).unwrap(),
            IndexOutcome::Skipped(SkipReason::NoProcessor)
        );
    }

    #[test]
    fn test_single_short_file_gives_one_chunk() {
        let temp = TempDir::new().unwrap();
        let indexer = DocumentIndexer::open(&test_config(&temp)).unwrap();
        let docs = temp.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();

        let note = docs.join("note.txt");
        std::fs::write(&note, "Fifty characters of plain text for a single chunk").unwrap();

        assert_eq!(
            indexer.index_file_detailed(&note).unwrap(),
            IndexOutcome::Indexed { chunks: 1 }
        );
        let stats = indexer.get_stats().unwrap();
        assert_eq!(stats.total_chunks, 1);
        assert_eq!(stats.vector_count, 1);
    }

    #[test]
    fn test_collect_files_prunes_ignored() {
        let temp = TempDir::new().unwrap();
        let indexer = DocumentIndexer::open(&test_config(&temp)).unwrap();
        let docs = temp.path().join("docs");
        std::fs::create_dir_all(docs.join("node_modules/pkg")).unwrap();
        std::fs::create_dir_all(docs.join("sub")).unwrap();
        std::fs::write(docs.join("a.txt"), "a").unwrap();
        std::fs::write(docs.join("sub/b.md"), "b").unwrap();
        std::fs::write(docs.join("node_modules/pkg/c.js"), "c").unwrap();

        let mut files = indexer.collect_files(&docs).unwrap();
        files.sort();
        assert_eq!(files, vec![docs.join("a.txt"), docs.join("sub/b.md")]);
    }

    #[test]
    fn test_provider_dimension_must_match() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);
        let provider = Arc::new(HashingProvider::new(32).unwrap());
        assert!(matches!(
            DocumentIndexer::with_provider(&config, provider),
            Err(DocseekError::Embedding(EmbeddingError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn test_cancelled_batch_stops_before_first_file() {
        let temp = TempDir::new().unwrap();
        let indexer = DocumentIndexer::open(&test_config(&temp)).unwrap();
        let docs = temp.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("a.txt"), "alpha").unwrap();

        let cancel = AtomicBool::new(true);
        let stats = indexer
            .index_paths_cancellable(&[docs.join("a.txt")], &cancel)
            .unwrap();
        assert_eq!(stats, BatchStats::default());
    }
}
