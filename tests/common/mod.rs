#![allow(dead_code)]

use docseek::config::Config;
use docseek::embedding::HashingProvider;
use std::path::{Path, PathBuf};

/// Config rooted in `root`, using the model-free embedder
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::with_data_dir(root.join("data"));
    config.embedding.model = HashingProvider::MODEL_NAME.to_string();
    config.embedding.dimension = 256;
    config.embedding.batch_size = 4;
    config.search.similarity_threshold = 0.2;
    config.scan.paths = vec![root.join("docs")];
    config
}

pub fn docs_dir(root: &Path) -> PathBuf {
    let dir = root.join("docs");
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// Push a file's mtime forward so it no longer counts as current
pub fn touch_forward(path: &Path, secs: u64) {
    let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    let mtime = std::time::SystemTime::now() + std::time::Duration::from_secs(secs);
    file.set_modified(mtime).unwrap();
}
