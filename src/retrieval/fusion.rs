//! Merging the semantic and filename legs into one ranked list

use serde::Serialize;
use std::collections::HashMap;

/// Which legs found a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Semantic,
    Filename,
    Combined,
}

impl MatchSource {
    pub fn label(&self) -> &'static str {
        match self {
            MatchSource::Semantic => "semantic",
            MatchSource::Filename => "filename",
            MatchSource::Combined => "combined",
        }
    }
}

/// A single leg's view of a path
#[derive(Debug, Clone, PartialEq)]
pub struct LegHit {
    pub path: String,
    pub name: String,
    pub score: f32,
    pub preview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridResult {
    pub path: String,
    pub name: String,
    /// Start of the best chunk, semantic hits only
    pub preview: Option<String>,
    pub score: f32,
    pub source: MatchSource,
}

/// Score knobs applied during fusion
#[derive(Debug, Clone, Copy)]
pub struct FusionParams {
    /// Added to the semantic score when both legs find a path
    pub combined_boost: f32,
    pub min_score: f32,
    pub max_results: usize,
}

/// Merge by path, threshold, rank and truncate.
///
/// A path found by both legs scores `max(semantic + boost, filename)`.
/// Ranking is a stable descending sort, so equal scores keep discovery order:
/// semantic hits first, then filename-only hits.
pub fn fuse(
    semantic: Vec<LegHit>,
    filename: Vec<LegHit>,
    params: &FusionParams,
) -> Vec<HybridResult> {
    let mut results: Vec<HybridResult> = Vec::with_capacity(semantic.len() + filename.len());
    let mut by_path: HashMap<String, usize> = HashMap::new();

    for hit in semantic {
        if by_path.contains_key(&hit.path) {
            continue;
        }
        by_path.insert(hit.path.clone(), results.len());
        results.push(HybridResult {
            path: hit.path,
            name: hit.name,
            preview: hit.preview,
            score: hit.score,
            source: MatchSource::Semantic,
        });
    }

    for hit in filename {
        match by_path.get(&hit.path) {
            Some(&idx) => {
                let existing = &mut results[idx];
                if existing.source == MatchSource::Semantic {
                    existing.score = (existing.score + params.combined_boost).max(hit.score);
                    existing.source = MatchSource::Combined;
                }
            }
            None => {
                by_path.insert(hit.path.clone(), results.len());
                results.push(HybridResult {
                    path: hit.path,
                    name: hit.name,
                    preview: None,
                    score: hit.score,
                    source: MatchSource::Filename,
                });
            }
        }
    }

    results.retain(|r| r.score >= params.min_score);
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(params.max_results);
    results
}
