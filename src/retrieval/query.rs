//! Query classification and expansion

use serde::Serialize;

/// Which search legs a query runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    Semantic,
    Filename,
    Both,
}

impl SearchStrategy {
    /// Classify a query.
    ///
    /// A token ending in a known extension (`report.pdf`, `.xlsx`) means the
    /// user is after a file name; a single bare token could be either; longer
    /// phrases are natural language.
    pub fn classify(query: &str, extensions: &[String]) -> Self {
        let lowered = query.trim().to_lowercase();
        let tokens: Vec<&str> = lowered.split_whitespace().collect();

        let has_extension = tokens.iter().any(|token| {
            extensions
                .iter()
                .any(|ext| ext.len() > 1 && token.ends_with(&ext.to_lowercase()))
        });

        if has_extension {
            SearchStrategy::Filename
        } else if tokens.len() == 1 {
            SearchStrategy::Both
        } else {
            SearchStrategy::Semantic
        }
    }

    pub fn runs_semantic(&self) -> bool {
        matches!(self, SearchStrategy::Semantic | SearchStrategy::Both)
    }

    pub fn runs_filename(&self) -> bool {
        matches!(self, SearchStrategy::Filename | SearchStrategy::Both)
    }
}

const EXPANSIONS: &[(&str, &str)] = &[
    ("doc", "document"),
    ("pic", "picture image photo"),
    ("vid", "video"),
    ("txt", "text"),
    ("pdf", "document"),
    ("excel", "spreadsheet xlsx csv"),
    ("presentation", "powerpoint ppt pptx slides"),
];

/// Lowercase the query and append synonyms after each abbreviation token.
///
/// Matching is per whitespace token so "document" is not expanded again
/// because it starts with "doc".
pub fn expand_query(query: &str) -> String {
    let mut expanded = Vec::new();
    for token in query.trim().to_lowercase().split_whitespace() {
        expanded.push(token.to_string());
        if let Some((_, synonyms)) = EXPANSIONS.iter().find(|(abbrev, _)| *abbrev == token) {
            expanded.push(synonyms.to_string());
        }
    }
    expanded.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extensions() -> Vec<String> {
        [".pdf", ".xlsx", ".doc", ".txt"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_classify() {
        let exts = extensions();
        assert_eq!(
            SearchStrategy::classify("Invoice_2023.PDF", &exts),
            SearchStrategy::Filename
        );
        assert_eq!(
            SearchStrategy::classify("budget .xlsx", &exts),
            SearchStrategy::Filename
        );
        assert_eq!(
            SearchStrategy::classify("invoice", &exts),
            SearchStrategy::Both
        );
        assert_eq!(
            SearchStrategy::classify("notes about the quarterly budget", &exts),
            SearchStrategy::Semantic
        );
    }

    #[test]
    fn test_strategy_legs() {
        assert!(SearchStrategy::Both.runs_semantic() && SearchStrategy::Both.runs_filename());
        assert!(!SearchStrategy::Filename.runs_semantic());
        assert!(!SearchStrategy::Semantic.runs_filename());
    }

    #[test]
    fn test_expand_query() {
        assert_eq!(expand_query("Excel budget"), "excel spreadsheet xlsx csv budget");
        assert_eq!(expand_query("holiday pic"), "holiday pic picture image photo");
        assert_eq!(expand_query("document archive"), "document archive");
        assert_eq!(expand_query("  "), "");
    }
}
