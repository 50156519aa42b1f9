//! Text extraction per file type
//!
//! Built-in processors are variants of [`Processor`]; callers add their own
//! through [`Processor::Custom`]. The registry dispatches to the first
//! processor whose `can_process` accepts the path.

use crate::error::{DocseekError, Result};
use crate::storage::MetadataBlob;
use serde_json::json;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

/// Rows of a delimited file kept in the extracted text
const MAX_DELIMITED_ROWS: usize = 100;

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "py", "js", "ts", "html", "css", "yaml", "yml", "json", "xml", "toml", "ini",
];

/// Text and file facts produced by a processor
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub content: String,
    pub size: u64,
    /// Seconds since the Unix epoch
    pub mtime: f64,
    pub metadata: MetadataBlob,
}

/// Something that can turn a file into text
pub trait FileProcessor: Send + Sync {
    fn can_process(&self, path: &Path) -> bool;

    fn extract(&self, path: &Path) -> Result<ExtractedDocument>;
}

/// Tagged processor variants
#[derive(Clone)]
pub enum Processor {
    /// UTF-8 text, falling back to Latin-1
    Text,
    /// Comma-separated rows
    Delimited,
    Custom(Arc<dyn FileProcessor>),
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Processor::Text => write!(f, "Text"),
            Processor::Delimited => write!(f, "Delimited"),
            Processor::Custom(_) => write!(f, "Custom"),
        }
    }
}

impl FileProcessor for Processor {
    fn can_process(&self, path: &Path) -> bool {
        match self {
            Processor::Text => extension(path)
                .map(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
                .unwrap_or(false),
            Processor::Delimited => extension(path).as_deref() == Some("csv"),
            Processor::Custom(inner) => inner.can_process(path),
        }
    }

    fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
        match self {
            Processor::Text => extract_text(path),
            Processor::Delimited => extract_delimited(path),
            Processor::Custom(inner) => inner.extract(path),
        }
    }
}

/// Ordered list of processors, first match wins
#[derive(Debug, Clone)]
pub struct ProcessorRegistry {
    processors: Vec<Processor>,
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self {
            processors: vec![Processor::Delimited, Processor::Text],
        }
    }
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a processor ahead of the built-ins
    pub fn register(&mut self, processor: Arc<dyn FileProcessor>) {
        self.processors.insert(0, Processor::Custom(processor));
    }

    pub fn find(&self, path: &Path) -> Option<&Processor> {
        self.processors.iter().find(|p| p.can_process(path))
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

/// Size and modification time of `path`
pub fn file_facts(path: &Path) -> Result<(u64, f64)> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| DocseekError::io(e, format!("Failed to stat {}", path.display())))?;
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    Ok((metadata.len(), mtime))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Read a file as UTF-8, decoding as Latin-1 when that fails
fn read_decoded(path: &Path) -> Result<(String, &'static str)> {
    let bytes = std::fs::read(path).map_err(|e| DocseekError::Extraction {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok((text, "utf-8")),
        Err(err) => {
            let text = err.into_bytes().iter().map(|&b| b as char).collect();
            Ok((text, "latin-1"))
        }
    }
}

fn extract_text(path: &Path) -> Result<ExtractedDocument> {
    let (content, encoding) = read_decoded(path)?;
    let (size, mtime) = file_facts(path)?;

    let metadata = json!({
        "line_count": content.lines().count(),
        "character_count": content.chars().count(),
        "encoding": encoding,
    });

    Ok(ExtractedDocument {
        content,
        size,
        mtime,
        metadata: MetadataBlob::new(metadata),
    })
}

fn extract_delimited(path: &Path) -> Result<ExtractedDocument> {
    let (raw, _) = read_decoded(path)?;
    let (size, mtime) = file_facts(path)?;
    let rows = parse_rows(&raw, ',');

    let Some(headers) = rows.first() else {
        return Ok(ExtractedDocument {
            content: String::new(),
            size,
            mtime,
            metadata: MetadataBlob::new(json!({ "row_count": 0 })),
        });
    };

    let mut content = format!("Headers: {}\n\n", headers.join(", "));
    let body: Vec<String> = rows
        .iter()
        .take(MAX_DELIMITED_ROWS)
        .map(|row| row.join("\t"))
        .collect();
    content.push_str(&body.join("\n"));

    let metadata = json!({
        "row_count": rows.len(),
        "column_count": headers.len(),
        "headers": headers,
    });

    Ok(ExtractedDocument {
        content,
        size,
        mtime,
        metadata: MetadataBlob::new(metadata),
    })
}

/// Split delimited text into rows of fields.
///
/// Double-quoted fields may contain the delimiter, newlines and `""` escapes.
/// A blank line yields an empty row.
fn parse_rows(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line_has_data = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                line_has_data = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                if line_has_data {
                    row.push(std::mem::take(&mut field));
                }
                rows.push(std::mem::take(&mut row));
                line_has_data = false;
            }
            c if c == delimiter => {
                row.push(std::mem::take(&mut field));
                line_has_data = true;
            }
            _ => {
                field.push(c);
                line_has_data = true;
            }
        }
    }

    if line_has_data {
        row.push(field);
        rows.push(row);
    }

    rows
}
