/// Hybrid search tests: strategy routing, fusion labels and thresholds
mod common;

use common::{docs_dir, test_config, write_file};
use docseek::config::Config;
use docseek::indexing::DocumentIndexer;
use docseek::retrieval::{HybridSearcher, MatchSource};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn searcher(config: &Config) -> HybridSearcher {
    let indexer = Arc::new(DocumentIndexer::open(config).unwrap());
    let docs = config.scan.paths[0].clone();
    if docs.is_dir() {
        indexer.index_directory(&docs).unwrap();
    }
    HybridSearcher::new(config, indexer)
}

#[test]
fn test_staged_file_matches_by_name() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path());
    let staged = write_file(&temp.path().join("inbox"), "Invoice_2023.pdf", "%PDF-1.4");

    let searcher = searcher(&config);
    searcher.set_staged_paths(vec![staged.clone()]).unwrap();

    let results = searcher.search("invoice", 10).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(Path::new(&results[0].path), staged);
    assert_eq!(results[0].name, "Invoice_2023.pdf");
    assert_eq!(results[0].score, 1.0);
    assert_eq!(results[0].source, MatchSource::Filename);
    assert!(results[0].preview.is_none());

    searcher.clear_staged_paths().unwrap();
    assert!(searcher.search("invoice", 10).unwrap().is_empty());
}

#[test]
fn test_name_and_content_match_is_combined() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path());
    let docs = docs_dir(temp.path());
    write_file(&docs, "report.txt", "quarterly report of sales figures");
    write_file(&docs, "notes.txt", "shopping list for the weekend");

    let searcher = searcher(&config);
    let results = searcher.search("report", 10).unwrap();

    let top = &results[0];
    assert_eq!(top.name, "report.txt");
    assert_eq!(top.source, MatchSource::Combined);
    assert!(top.score >= 0.8);
    assert!(top.preview.as_deref().unwrap().contains("quarterly"));
    assert!(results.iter().all(|r| r.name != "notes.txt"));
}

#[test]
fn test_phrase_query_runs_semantic_only() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path());
    let docs = docs_dir(temp.path());
    write_file(&docs, "shed.md", "meeting notes about the garden shed");
    write_file(&docs, "garden shed notes.txt", "paint colours");

    let searcher = searcher(&config);
    let results = searcher.search("garden shed meeting notes", 10).unwrap();

    assert!(!results.is_empty());
    assert_eq!(results[0].name, "shed.md");
    assert!(results
        .iter()
        .all(|r| r.source == MatchSource::Semantic && r.preview.is_some()));
}

#[test]
fn test_extension_query_runs_filename_only() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path());
    let docs = docs_dir(temp.path());
    write_file(&docs, "budget.xlsx", "not really a spreadsheet");
    write_file(&docs, "budget notes.txt", "budget xlsx figures for budget.xlsx");

    let searcher = searcher(&config);
    let results = searcher.search("budget.xlsx", 10).unwrap();

    assert_eq!(results[0].name, "budget.xlsx");
    assert_eq!(results[0].score, 1.0);
    assert!(results.iter().all(|r| r.source == MatchSource::Filename));
}

#[test]
fn test_unrelated_query_finds_nothing() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path());
    let docs = docs_dir(temp.path());
    write_file(&docs, "recipe.txt", "slow roasted tomato soup with basil");
    write_file(&docs, "trip.md", "itinerary for the lake district walk");

    let searcher = searcher(&config);
    assert!(searcher.search("xylophone quokka", 10).unwrap().is_empty());
    assert!(searcher.search("   ", 10).unwrap().is_empty());
}

#[test]
fn test_results_truncated_and_ranked() {
    let temp = TempDir::new().unwrap();
    let config = test_config(temp.path());
    let docs = docs_dir(temp.path());
    for i in 0..5 {
        write_file(&docs, &format!("ledger_{}.csv", i), "date,amount\n2024-01-01,10\n");
    }

    let searcher = searcher(&config);
    let results = searcher.search("ledger", 3).unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(searcher.search("ledger", 0).unwrap().is_empty());
}
