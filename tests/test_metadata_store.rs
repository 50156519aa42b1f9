/// Metadata store tests against an on-disk database
use chrono::Utc;
use docseek::storage::{MetadataBlob, MetadataStore, NewDocument, StorageLayout};
use tempfile::TempDir;

fn doc(path: &str, chunk_count: usize) -> NewDocument {
    NewDocument {
        path: path.to_string(),
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        size: 42,
        mtime: 1_700_000_000.5,
        content_hash: blake3::hash(path.as_bytes()).to_hex().to_string(),
        chunk_count,
        indexed_at: Utc::now(),
        metadata: MetadataBlob::new(serde_json::json!({ "line_count": 3 })),
    }
}

#[test]
fn test_store_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let layout = StorageLayout::new(temp.path().to_path_buf()).unwrap();

    {
        let store = MetadataStore::open(&layout.metadata_db_path()).unwrap();
        store
            .replace_document(
                &doc("/docs/a.txt", 2),
                &[("first".to_string(), 0), ("second".to_string(), 1)],
            )
            .unwrap();
    }

    let store = MetadataStore::open(&layout.metadata_db_path()).unwrap();
    let loaded = store.get_document_by_path("/docs/a.txt").unwrap().unwrap();
    assert_eq!(loaded.name, "a.txt");
    assert_eq!(loaded.size, 42);
    assert_eq!(loaded.mtime, 1_700_000_000.5);
    assert_eq!(loaded.chunk_count, 2);
    assert_eq!(loaded.metadata.value()["line_count"], 3);

    let (chunk, owner) = store.get_chunk_by_slot(1).unwrap().unwrap();
    assert_eq!(chunk.content, "second");
    assert_eq!(chunk.chunk_index, 1);
    assert_eq!(owner.id, loaded.id);
}

#[test]
fn test_slots_are_unique_across_documents() {
    let temp = TempDir::new().unwrap();
    let store = MetadataStore::open(&temp.path().join("metadata.db")).unwrap();

    store
        .replace_document(&doc("/docs/a.txt", 1), &[("a".to_string(), 0)])
        .unwrap();
    let clash = store.replace_document(&doc("/docs/b.txt", 1), &[("b".to_string(), 0)]);
    assert!(clash.is_err());

    // the failed write must leave nothing behind
    assert!(store.get_document_by_path("/docs/b.txt").unwrap().is_none());
    assert_eq!(store.count_documents().unwrap(), 1);
    assert_eq!(store.count_chunks().unwrap(), 1);
}

#[test]
fn test_reindex_and_delete_track_live_slots() {
    let temp = TempDir::new().unwrap();
    let store = MetadataStore::open(&temp.path().join("metadata.db")).unwrap();

    store
        .replace_document(
            &doc("/docs/a.txt", 2),
            &[("a0".to_string(), 0), ("a1".to_string(), 1)],
        )
        .unwrap();
    store
        .replace_document(&doc("/docs/b.txt", 1), &[("b0".to_string(), 2)])
        .unwrap();

    // re-indexing a.txt moves it to fresh slots
    store
        .replace_document(&doc("/docs/a.txt", 1), &[("a0 v2".to_string(), 3)])
        .unwrap();
    assert_eq!(store.live_slots().unwrap(), vec![2, 3]);
    assert_eq!(store.max_slot().unwrap(), Some(3));
    assert!(store.get_chunk_by_slot(0).unwrap().is_none());

    assert!(store.delete_document_by_path("/docs/b.txt").unwrap());
    assert!(!store.delete_document_by_path("/docs/b.txt").unwrap());
    assert_eq!(store.live_slots().unwrap(), vec![3]);

    store.remap_slots(&[(3, 0)]).unwrap();
    let (chunk, owner) = store.get_chunk_by_slot(0).unwrap().unwrap();
    assert_eq!(chunk.content, "a0 v2");
    assert_eq!(owner.path, "/docs/a.txt");

    let listed = store.list_documents().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(store.all_chunks().unwrap()[0].1, "/docs/a.txt");
}
