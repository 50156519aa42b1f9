//! Fuzzy file-name matching

use super::similarity::{keyword_overlap, sequence_ratio};
use std::path::{Path, PathBuf};

/// A file whose name matched the query
#[derive(Debug, Clone, PartialEq)]
pub struct FilenameMatch {
    pub path: PathBuf,
    pub name: String,
    pub score: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct FilenameMatcher {
    min_score: f32,
}

impl FilenameMatcher {
    pub fn new(min_score: f32) -> Self {
        Self { min_score }
    }

    /// 1.0 for a case-insensitive substring hit, otherwise the better of the
    /// sequence ratio and the token overlap
    pub fn score(&self, query: &str, file_name: &str) -> f32 {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return 0.0;
        }
        let name = file_name.to_lowercase();
        if name.contains(&query) {
            return 1.0;
        }
        sequence_ratio(&query, &name).max(keyword_overlap(&query, &name))
    }

    /// Score every candidate, keeping those at or above the minimum in
    /// candidate order
    pub fn find<'a, I>(&self, query: &str, candidates: I) -> Vec<FilenameMatch>
    where
        I: IntoIterator<Item = &'a PathBuf>,
    {
        candidates
            .into_iter()
            .filter_map(|path| {
                let name = display_name(path);
                let score = self.score(query, &name);
                (score >= self.min_score).then(|| FilenameMatch {
                    path: path.clone(),
                    name,
                    score,
                })
            })
            .collect()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
