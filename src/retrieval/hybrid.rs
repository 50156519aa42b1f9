//! Hybrid search combining semantic and filename search

use super::filename::FilenameMatcher;
use super::fusion::{fuse, FusionParams, HybridResult, LegHit};
use super::query::{expand_query, SearchStrategy};
use super::similarity::keyword_overlap;
use crate::config::{Config, SearchConfig};
use crate::error::{DocseekError, Result};
use crate::indexing::{absolute_path, DocumentIndexer};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Hybrid searcher over one indexer plus the file system
pub struct HybridSearcher {
    indexer: Arc<DocumentIndexer>,
    config: SearchConfig,
    extensions: Vec<String>,
    scan_paths: Vec<PathBuf>,
    staged: RwLock<Vec<PathBuf>>,
}

impl HybridSearcher {
    pub fn new(config: &Config, indexer: Arc<DocumentIndexer>) -> Self {
        Self {
            indexer,
            config: config.search.clone(),
            extensions: config.indexing.supported_extensions.clone(),
            scan_paths: config.scan.paths.clone(),
            staged: RwLock::new(Vec::new()),
        }
    }

    /// Replace the staged paths offered to the filename leg.
    ///
    /// Relative paths are resolved against the current directory so they
    /// merge with indexed paths during fusion.
    pub fn set_staged_paths(&self, paths: Vec<PathBuf>) -> Result<()> {
        let paths = paths
            .iter()
            .map(|p| absolute_path(p))
            .collect::<Result<Vec<_>>>()?;
        let mut staged = self
            .staged
            .write()
            .map_err(|_| DocseekError::Other(anyhow::anyhow!("Staged paths lock poisoned")))?;
        *staged = paths;
        Ok(())
    }

    pub fn clear_staged_paths(&self) -> Result<()> {
        self.set_staged_paths(Vec::new())
    }

    pub fn search(&self, query: &str, max_results: usize) -> Result<Vec<HybridResult>> {
        let query = query.trim();
        if query.is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let strategy = SearchStrategy::classify(query, &self.extensions);
        debug!("Query {:?} classified as {:?}", query, strategy);

        let semantic = if strategy.runs_semantic() {
            self.semantic_leg(query, max_results)?
        } else {
            Vec::new()
        };

        let filename = if strategy.runs_filename() {
            self.filename_leg(query)?
        } else {
            Vec::new()
        };

        let params = FusionParams {
            combined_boost: self.config.combined_boost,
            min_score: self.config.min_score,
            max_results,
        };
        Ok(fuse(semantic, filename, &params))
    }

    /// Indexer hits rescored as `w_s * similarity + w_k * keyword overlap`
    fn semantic_leg(&self, query: &str, max_results: usize) -> Result<Vec<LegHit>> {
        let expanded = expand_query(query);
        let hits = self.indexer.search(&expanded, max_results * 2)?;

        Ok(hits
            .into_iter()
            .map(|hit| {
                let snippet = preview(&hit.content, self.config.preview_chars);
                let keyword = keyword_overlap(query, &snippet);
                LegHit {
                    path: hit.path,
                    name: hit.name,
                    score: self.config.semantic_weight * hit.score
                        + self.config.keyword_weight * keyword,
                    preview: Some(snippet),
                }
            })
            .collect())
    }

    fn filename_leg(&self, query: &str) -> Result<Vec<LegHit>> {
        let candidates = self.filename_candidates()?;
        let matcher = FilenameMatcher::new(self.config.filename_min_score);

        Ok(matcher
            .find(query, &candidates)
            .into_iter()
            .map(|m| LegHit {
                path: m.path.to_string_lossy().to_string(),
                name: m.name,
                score: m.score,
                preview: None,
            })
            .collect())
    }

    /// Staged files first, then files under the scan paths, without repeats
    fn filename_candidates(&self) -> Result<Vec<PathBuf>> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        let staged = self
            .staged
            .read()
            .map_err(|_| DocseekError::Other(anyhow::anyhow!("Staged paths lock poisoned")))?;
        for path in staged.iter().filter(|p| p.is_file()) {
            if seen.insert(path.clone()) {
                candidates.push(path.clone());
            }
        }

        for scan_path in self.scan_paths.iter().filter(|p| p.is_dir()) {
            match self.indexer.collect_files(scan_path) {
                Ok(files) => {
                    for file in files {
                        if seen.insert(file.clone()) {
                            candidates.push(file);
                        }
                    }
                }
                Err(e) => warn!("Failed to scan {}: {}", scan_path.display(), e),
            }
        }

        debug!("Filename leg over {} candidates", candidates.len());
        Ok(candidates)
    }
}

/// First `max_chars` chars, with "..." appended when cut
pub fn preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}
