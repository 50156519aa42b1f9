//! docseek - local document finder
//!
//! Indexes local files into an append-only vector index and a SQLite metadata
//! store kept in lockstep, then answers natural-language and filename queries
//! by fusing embedding similarity, keyword overlap and fuzzy filename scores.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod indexing;
pub mod retrieval;
pub mod storage;

pub use error::{DocseekError, Result};
