//! Record store for location records
//!
//! Backed by a single JSON document (`{"results": [...]}`). Read order equals
//! append order. A missing document is created empty on first access. A
//! document that cannot be parsed is moved aside to
//! `<name>.corrupt-<millis>` and the store starts over empty, so it is never
//! overwritten in place. Filesystem errors propagate.

use super::{write_json_atomic, StoreError};
use crate::models::{LocationDocument, LocationRecord};
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct LocationStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LocationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records in append order
    pub async fn load_all(&self) -> Result<Vec<LocationRecord>, StoreError> {
        let _guard = self.write_lock.lock().await;
        Ok(self.read_document().await?.results)
    }

    /// Append a record, rejecting a `place_id` that is already stored
    ///
    /// The existence check and the write happen under the same lock, so a
    /// rejected append never changes the document.
    pub async fn append(&self, record: LocationRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read_document().await?;

        if doc.contains(&record.place_id) {
            return Err(StoreError::Duplicate(record.place_id));
        }

        let place_id = record.place_id.clone();
        doc.results.push(record);
        write_json_atomic(&self.path, &doc).await?;

        info!(place_id = %place_id, total = doc.results.len(), "Location appended");
        Ok(())
    }

    /// Remove every record with this `place_id` and return the removed ones
    ///
    /// An empty result means nothing matched and the document is untouched.
    pub async fn remove_by_place_id(&self, place_id: &str) -> Result<Vec<LocationRecord>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read_document().await?;

        let (removed, kept): (Vec<_>, Vec<_>) = doc
            .results
            .into_iter()
            .partition(|r| r.place_id == place_id);
        doc.results = kept;

        if removed.is_empty() {
            debug!(place_id = %place_id, "No location to remove");
            return Ok(removed);
        }

        write_json_atomic(&self.path, &doc).await?;
        info!(place_id = %place_id, removed = removed.len(), "Location removed");
        Ok(removed)
    }

    pub async fn exists_by_place_id(&self, place_id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        Ok(self.read_document().await?.contains(place_id))
    }

    pub async fn find_by_place_id(&self, place_id: &str) -> Result<Option<LocationRecord>, StoreError> {
        let _guard = self.write_lock.lock().await;
        Ok(self
            .read_document()
            .await?
            .results
            .into_iter()
            .find(|r| r.place_id == place_id))
    }

    /// Read the document; caller must hold `write_lock`
    async fn read_document(&self) -> Result<LocationDocument, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("Locations document {} missing, initializing empty", self.path.display());
                let doc = LocationDocument::default();
                write_json_atomic(&self.path, &doc).await?;
                return Ok(doc);
            }
            Err(e) => return Err(StoreError::io(&self.path)(e)),
        };

        match serde_json::from_str::<LocationDocument>(&raw) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                let backup = self.corrupt_backup_path();
                tokio::fs::rename(&self.path, &backup)
                    .await
                    .map_err(StoreError::io(&self.path))?;
                warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "Locations document is unreadable; moved aside, starting empty"
                );
                Ok(LocationDocument::default())
            }
        }
    }

    fn corrupt_backup_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!(
            "{}.corrupt-{}",
            name,
            hgd_common::time::epoch_millis()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FreeForm, Geometry, LatLng};

    fn record(place_id: &str) -> LocationRecord {
        LocationRecord {
            place_id: place_id.to_string(),
            formatted_address: format!("{} Main St", place_id),
            address_components: vec![],
            geometry: Geometry::at(LatLng { lat: 36.3, lng: -78.4 }),
            facility_name: String::new(),
            types: vec![],
            historical_info: None,
            details: None,
            wikipedia_info: None,
            image: None,
            created_at: None,
            extra: FreeForm::new(),
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> LocationStore {
        LocationStore::new(dir.path().join("locations.json"))
    }

    #[tokio::test]
    async fn test_load_all_initializes_missing_document() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_in(&temp);

        assert!(store.load_all().await.unwrap().is_empty());

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({"results": []}));
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_in(&temp);

        for id in ["c", "a", "b"] {
            store.append(record(id)).await.unwrap();
        }

        let ids: Vec<_> = store
            .load_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.place_id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_duplicate_append_rejected_and_size_unchanged() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_in(&temp);

        store.append(record("ABC123")).await.unwrap();
        let err = store.append(record("ABC123")).await.unwrap_err();

        assert!(matches!(err, StoreError::Duplicate(id) if id == "ABC123"));
        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_unknown_returns_false_and_leaves_store() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_in(&temp);
        store.append(record("keep")).await.unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        assert!(store.remove_by_place_id("missing").await.unwrap().is_empty());

        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_existing() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_in(&temp);
        store.append(record("a")).await.unwrap();
        store.append(record("b")).await.unwrap();

        let removed = store.remove_by_place_id("a").await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].place_id, "a");
        assert!(!store.exists_by_place_id("a").await.unwrap());
        assert!(store.exists_by_place_id("b").await.unwrap());
        assert!(store.find_by_place_id("b").await.unwrap().is_some());
        assert!(store.find_by_place_id("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_drops_all_matching_records() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_in(&temp);
        // Hand-written document with a repeated id
        let doc = LocationDocument {
            results: vec![record("dup"), record("other"), record("dup")],
        };
        std::fs::write(store.path(), serde_json::to_string(&doc).unwrap()).unwrap();

        assert_eq!(store.remove_by_place_id("dup").await.unwrap().len(), 2);
        let remaining = store.load_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].place_id, "other");
    }

    fn backups_in(dir: &tempfile::TempDir) -> Vec<PathBuf> {
        std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().contains("locations.json.corrupt-"))
            .collect()
    }

    #[tokio::test]
    async fn test_corrupt_document_is_moved_aside_before_append() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_in(&temp);
        std::fs::write(store.path(), "{ not json").unwrap();

        assert!(store.load_all().await.unwrap().is_empty());
        store.append(record("fresh")).await.unwrap();
        assert_eq!(store.load_all().await.unwrap().len(), 1);

        let backups = backups_in(&temp);
        assert_eq!(backups.len(), 1);
        assert_eq!(std::fs::read_to_string(&backups[0]).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_append_keeps_sparse_records() {
        let temp = tempfile::tempdir().unwrap();
        let store = store_in(&temp);
        let raw = serde_json::json!({
            "results": [
                {
                    "place_id": "keep1",
                    "formatted_address": "100 Garnett St",
                    "geometry": { "location": { "lat": 36.32, "lng": -78.40 } }
                },
                {
                    "place_id": "keep2",
                    "formatted_address": "Henderson, NC",
                    "geometry": { "location": { "lat": 36.33, "lng": -78.41 } },
                    "address_components": [
                        { "long_name": "Henderson", "types": ["locality"] }
                    ],
                    "types": null
                }
            ]
        });
        std::fs::write(store.path(), raw.to_string()).unwrap();

        assert_eq!(store.load_all().await.unwrap().len(), 2);
        store.append(record("new")).await.unwrap();

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        let ids: Vec<_> = on_disk["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["place_id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["keep1", "keep2", "new"]);
        assert!(backups_in(&temp).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_path_propagates_io_error() {
        let temp = tempfile::tempdir().unwrap();
        // A directory where the document should be: reading it fails with a
        // non-NotFound error regardless of privileges
        let path = temp.path().join("locations.json");
        std::fs::create_dir(&path).unwrap();
        let store = LocationStore::new(path);

        assert!(matches!(store.load_all().await, Err(StoreError::Io { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_serialized() {
        let temp = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(store_in(&temp));

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.append(record(&format!("id{}", i))).await }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(store.load_all().await.unwrap().len(), 10);
    }
}
