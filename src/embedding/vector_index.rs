/// Append-only vector index with flat or HNSW search
use crate::config::VectorIndexConfig;
use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

const VECTORS_FILE: &str = "vectors.bin";
const RECORDS_FILE: &str = "vectors.json";
const MAGIC: &[u8; 4] = b"DSVI";
const FORMAT_VERSION: u32 = 1;
const MAX_LAYER: usize = 16;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Vector count ({vectors}) does not match record count ({records})")]
    CountMismatch { vectors: usize, records: usize },

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("Index artifact is corrupt: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Index lock poisoned")]
    LockPoisoned,
}

/// Search backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBackend {
    /// Exact brute-force inner product
    Flat,
    /// Approximate search over an HNSW graph kept next to the flat array
    Hnsw {
        m: usize,
        ef_construction: usize,
        ef_search: usize,
    },
}

impl IndexBackend {
    pub fn from_config(config: &VectorIndexConfig) -> Result<Self, VectorIndexError> {
        match config.backend.as_str() {
            "flat" => Ok(Self::Flat),
            "hnsw" => Ok(Self::Hnsw {
                m: config.hnsw_m,
                ef_construction: config.hnsw_ef_construction,
                ef_search: config.hnsw_ef_search,
            }),
            other => Err(VectorIndexError::UnknownBackend(other.to_string())),
        }
    }
}

/// Companion record persisted for every slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub path: String,
    pub chunk_index: usize,
}

/// Search hit: slot and inner-product score
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub slot: usize,
    pub score: f32,
}

#[derive(Serialize, Deserialize)]
struct RecordsFile {
    dimension: usize,
    count: usize,
    records: Vec<SlotRecord>,
}

struct Inner {
    /// Row-major, `dimension` floats per slot
    data: Vec<f32>,
    records: Vec<SlotRecord>,
    graph: Option<Hnsw<'static, f32, DistCosine>>,
}

/// Append-only array of unit vectors addressed by slot
///
/// Slots are never removed; callers filter orphaned slots themselves.
/// Searches share a read lock, `add` takes the write lock.
pub struct VectorIndex {
    inner: RwLock<Inner>,
    dimension: usize,
    backend: IndexBackend,
    dir: PathBuf,
}

impl VectorIndex {
    /// Create an empty index that persists into `dir`
    pub fn new(dimension: usize, backend: IndexBackend, dir: PathBuf) -> Self {
        Self {
            inner: RwLock::new(Inner {
                data: Vec::new(),
                records: Vec::new(),
                graph: new_graph(backend, 0),
            }),
            dimension,
            backend,
            dir,
        }
    }

    /// Load the index persisted in `dir`, or create an empty one if nothing
    /// has been saved there yet.
    pub fn open(
        dimension: usize,
        backend: IndexBackend,
        dir: PathBuf,
    ) -> Result<Self, VectorIndexError> {
        if dir.join(VECTORS_FILE).exists() || dir.join(RECORDS_FILE).exists() {
            Self::load(dimension, backend, dir)
        } else {
            Ok(Self::new(dimension, backend, dir))
        }
    }

    /// Load both artifacts; fails if either is missing or they disagree
    pub fn load(
        dimension: usize,
        backend: IndexBackend,
        dir: PathBuf,
    ) -> Result<Self, VectorIndexError> {
        let data = read_vectors(&dir.join(VECTORS_FILE), dimension)?;

        let reader = BufReader::new(File::open(dir.join(RECORDS_FILE))?);
        let file: RecordsFile = serde_json::from_reader(reader)?;

        if file.dimension != dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: dimension,
                actual: file.dimension,
            });
        }
        let vectors = data.len() / dimension;
        if vectors != file.records.len() || file.count != file.records.len() {
            return Err(VectorIndexError::CountMismatch {
                vectors,
                records: file.records.len(),
            });
        }

        let graph = build_graph(backend, &data, dimension);
        tracing::info!("Loaded vector index with {} vectors", vectors);

        Ok(Self {
            inner: RwLock::new(Inner {
                data,
                records: file.records,
                graph,
            }),
            dimension,
            backend,
            dir,
        })
    }

    /// Write both artifacts via temp file + rename
    pub fn save(&self) -> Result<(), VectorIndexError> {
        std::fs::create_dir_all(&self.dir)?;
        let inner = self.read()?;

        let vectors_tmp = self.dir.join(format!("{}.tmp", VECTORS_FILE));
        {
            let mut writer = BufWriter::new(File::create(&vectors_tmp)?);
            writer.write_all(MAGIC)?;
            writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
            writer.write_all(&(self.dimension as u32).to_le_bytes())?;
            writer.write_all(&(inner.records.len() as u64).to_le_bytes())?;
            for value in &inner.data {
                writer.write_all(&value.to_le_bytes())?;
            }
            writer.flush()?;
        }

        let records_tmp = self.dir.join(format!("{}.tmp", RECORDS_FILE));
        {
            let file = RecordsFile {
                dimension: self.dimension,
                count: inner.records.len(),
                records: inner.records.clone(),
            };
            let mut writer = BufWriter::new(File::create(&records_tmp)?);
            serde_json::to_writer(&mut writer, &file)?;
            writer.flush()?;
        }

        std::fs::rename(&vectors_tmp, self.dir.join(VECTORS_FILE))?;
        std::fs::rename(&records_tmp, self.dir.join(RECORDS_FILE))?;
        Ok(())
    }

    /// Append vectors; returns the slot of the first one
    pub fn add(
        &self,
        vectors: &[Vec<f32>],
        records: Vec<SlotRecord>,
    ) -> Result<usize, VectorIndexError> {
        if vectors.len() != records.len() {
            return Err(VectorIndexError::CountMismatch {
                vectors: vectors.len(),
                records: records.len(),
            });
        }
        for vector in vectors {
            self.check_dimension(vector)?;
        }

        let mut inner = self.write()?;
        let start = inner.records.len();
        for (offset, vector) in vectors.iter().enumerate() {
            inner.data.extend_from_slice(vector);
            if let Some(graph) = &inner.graph {
                graph.insert((vector.as_slice(), start + offset));
            }
        }
        inner.records.extend(records);

        Ok(start)
    }

    /// Top `k` slots by inner product, ties broken by lower slot
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, VectorIndexError> {
        self.check_dimension(query)?;

        let inner = self.read()?;
        let count = inner.records.len();
        if count == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let mut results: Vec<SearchResult> = match (&inner.graph, self.backend) {
            (Some(graph), IndexBackend::Hnsw { ef_search, .. }) => graph
                .search(query, k, ef_search.max(k))
                .into_iter()
                .map(|neighbour| SearchResult {
                    slot: neighbour.d_id,
                    score: 1.0 - neighbour.distance,
                })
                .collect(),
            _ => inner
                .data
                .chunks_exact(self.dimension)
                .enumerate()
                .map(|(slot, vector)| SearchResult {
                    slot,
                    score: dot(query, vector),
                })
                .collect(),
        };

        results.sort_by(rank_order);
        results.truncate(k);
        Ok(results)
    }

    /// Replace every slot at once; used by compaction
    pub fn replace_all(
        &self,
        vectors: &[Vec<f32>],
        records: Vec<SlotRecord>,
    ) -> Result<(), VectorIndexError> {
        if vectors.len() != records.len() {
            return Err(VectorIndexError::CountMismatch {
                vectors: vectors.len(),
                records: records.len(),
            });
        }
        let mut data = Vec::with_capacity(vectors.len() * self.dimension);
        for vector in vectors {
            self.check_dimension(vector)?;
            data.extend_from_slice(vector);
        }
        let graph = build_graph(self.backend, &data, self.dimension);

        let mut inner = self.write()?;
        *inner = Inner {
            data,
            records,
            graph,
        };
        Ok(())
    }

    /// Stored vector for `slot`
    pub fn get(&self, slot: usize) -> Result<Option<Vec<f32>>, VectorIndexError> {
        let inner = self.read()?;
        let start = slot * self.dimension;
        Ok(inner
            .data
            .get(start..start + self.dimension)
            .map(|v| v.to_vec()))
    }

    /// Companion record for `slot`
    pub fn record(&self, slot: usize) -> Result<Option<SlotRecord>, VectorIndexError> {
        Ok(self.read()?.records.get(slot).cloned())
    }

    /// Total vectors ever added, orphans included
    pub fn count(&self) -> usize {
        self.read().map(|inner| inner.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn backend(&self) -> IndexBackend {
        self.backend
    }

    /// Size of the persisted artifacts in bytes (0 if never saved)
    pub fn persisted_size(&self) -> u64 {
        [VECTORS_FILE, RECORDS_FILE]
            .iter()
            .filter_map(|name| std::fs::metadata(self.dir.join(name)).ok())
            .map(|meta| meta.len())
            .sum()
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, VectorIndexError> {
        self.inner.read().map_err(|_| VectorIndexError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, VectorIndexError> {
        self.inner.write().map_err(|_| VectorIndexError::LockPoisoned)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn rank_order(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.slot.cmp(&b.slot))
}

fn new_graph(backend: IndexBackend, expected: usize) -> Option<Hnsw<'static, f32, DistCosine>> {
    match backend {
        IndexBackend::Flat => None,
        IndexBackend::Hnsw {
            m, ef_construction, ..
        } => Some(Hnsw::<f32, DistCosine>::new(
            m,
            expected.max(10_000),
            MAX_LAYER,
            ef_construction,
            DistCosine,
        )),
    }
}

fn build_graph(
    backend: IndexBackend,
    data: &[f32],
    dimension: usize,
) -> Option<Hnsw<'static, f32, DistCosine>> {
    let graph = new_graph(backend, data.len() / dimension.max(1))?;
    for (slot, vector) in data.chunks_exact(dimension).enumerate() {
        graph.insert((vector, slot));
    }
    Some(graph)
}

fn read_vectors(path: &Path, dimension: usize) -> Result<Vec<f32>, VectorIndexError> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(VectorIndexError::Corrupt("bad magic".to_string()));
    }

    let mut word = [0u8; 4];
    reader.read_exact(&mut word)?;
    let version = u32::from_le_bytes(word);
    if version != FORMAT_VERSION {
        return Err(VectorIndexError::Corrupt(format!(
            "unsupported format version {}",
            version
        )));
    }

    reader.read_exact(&mut word)?;
    let stored_dimension = u32::from_le_bytes(word) as usize;
    if stored_dimension != dimension {
        return Err(VectorIndexError::InvalidDimension {
            expected: dimension,
            actual: stored_dimension,
        });
    }

    let mut long = [0u8; 8];
    reader.read_exact(&mut long)?;
    let expected = usize::try_from(u64::from_le_bytes(long))
        .ok()
        .and_then(|count| count.checked_mul(dimension))
        .and_then(|floats| floats.checked_mul(4))
        .ok_or_else(|| VectorIndexError::Corrupt("vector count out of range".to_string()))?;

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    if bytes.len() != expected {
        return Err(VectorIndexError::Corrupt(format!(
            "expected {} payload bytes, found {}",
            expected,
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn unit(dim: usize, hot: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[hot] = 1.0;
        v
    }

    fn record(i: usize) -> SlotRecord {
        SlotRecord {
            path: format!("/docs/{}.txt", i),
            chunk_index: 0,
        }
    }

    #[test]
    fn test_add_returns_starting_slot() {
        let temp = TempDir::new().unwrap();
        let index = VectorIndex::new(8, IndexBackend::Flat, temp.path().to_path_buf());

        let first = index
            .add(&[unit(8, 0), unit(8, 1)], vec![record(0), record(1)])
            .unwrap();
        let second = index.add(&[unit(8, 2)], vec![record(2)]).unwrap();

        assert_eq!(first, 0);
        assert_eq!(second, 2);
        assert_eq!(index.count(), 3);
    }

    #[test]
    fn test_flat_search_ties_prefer_lower_slot() {
        let temp = TempDir::new().unwrap();
        let index = VectorIndex::new(4, IndexBackend::Flat, temp.path().to_path_buf());

        index
            .add(
                &[unit(4, 1), unit(4, 0), unit(4, 0)],
                vec![record(0), record(1), record(2)],
            )
            .unwrap();

        let results = index.search(&unit(4, 0), 3).unwrap();
        let slots: Vec<usize> = results.iter().map(|r| r.slot).collect();
        assert_eq!(slots, vec![1, 2, 0]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_hnsw_search_finds_nearest() {
        let temp = TempDir::new().unwrap();
        let backend = IndexBackend::Hnsw {
            m: 16,
            ef_construction: 100,
            ef_search: 32,
        };
        let index = VectorIndex::new(8, backend, temp.path().to_path_buf());

        let vectors: Vec<Vec<f32>> = (0..8).map(|i| unit(8, i)).collect();
        let records = (0..8).map(record).collect();
        index.add(&vectors, records).unwrap();

        let results = index.search(&unit(8, 5), 1).unwrap();
        assert_eq!(results[0].slot, 5);
        assert!(results[0].score > 0.99);
    }

    #[test]
    fn test_dimension_validation() {
        let temp = TempDir::new().unwrap();
        let index = VectorIndex::new(8, IndexBackend::Flat, temp.path().to_path_buf());

        let result = index.add(&[vec![1.0; 3]], vec![record(0)]);
        assert!(matches!(
            result,
            Err(VectorIndexError::InvalidDimension { .. })
        ));
        assert!(index.search(&[1.0; 3], 1).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("vectors");

        {
            let index = VectorIndex::new(4, IndexBackend::Flat, dir.clone());
            index
                .add(&[unit(4, 0), unit(4, 3)], vec![record(0), record(1)])
                .unwrap();
            index.save().unwrap();
        }

        let index = VectorIndex::open(4, IndexBackend::Flat, dir).unwrap();
        assert_eq!(index.count(), 2);
        assert_eq!(index.get(1).unwrap(), Some(unit(4, 3)));
        assert_eq!(index.record(0).unwrap(), Some(record(0)));
        assert!(index.persisted_size() > 0);
    }

    #[test]
    fn test_load_rejects_wrong_dimension() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();

        let index = VectorIndex::new(4, IndexBackend::Flat, dir.clone());
        index.add(&[unit(4, 0)], vec![record(0)]).unwrap();
        index.save().unwrap();

        assert!(VectorIndex::load(8, IndexBackend::Flat, dir).is_err());
    }

    #[test]
    fn test_load_rejects_oversized_count() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();

        let index = VectorIndex::new(4, IndexBackend::Flat, dir.clone());
        index.add(&[unit(4, 0)], vec![record(0)]).unwrap();
        index.save().unwrap();

        // count field sits after magic, version and dimension
        let path = dir.join(VECTORS_FILE);
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[12..20].copy_from_slice(&u64::MAX.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            VectorIndex::load(4, IndexBackend::Flat, dir),
            Err(VectorIndexError::Corrupt(_))
        ));
    }

    #[test]
    fn test_replace_all() {
        let temp = TempDir::new().unwrap();
        let index = VectorIndex::new(4, IndexBackend::Flat, temp.path().to_path_buf());
        index
            .add(&[unit(4, 0), unit(4, 1), unit(4, 2)], (0..3).map(record).collect())
            .unwrap();

        index.replace_all(&[unit(4, 2)], vec![record(2)]).unwrap();
        assert_eq!(index.count(), 1);
        assert_eq!(index.search(&unit(4, 2), 5).unwrap()[0].slot, 0);
    }
}
