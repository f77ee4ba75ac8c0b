//! Contact store: one JSON file per contact plus optional profile images

use super::{remove_if_exists, write_bytes_atomic, write_json_atomic, AssetName, StorageKey, StoreError};
use crate::assets::DecodedImage;
use crate::models::ContactRecord;
use serde_json::{Map, Value};
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct ContactStore {
    contacts_dir: PathBuf,
    assets_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl ContactStore {
    pub fn new(contacts_dir: impl Into<PathBuf>, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            contacts_dir: contacts_dir.into(),
            assets_dir: assets_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Path of a profile image inside the assets directory
    pub fn image_path(&self, name: &AssetName) -> PathBuf {
        self.assets_dir.join(name.as_str())
    }

    fn record_path(&self, key: &StorageKey) -> PathBuf {
        self.contacts_dir.join(key.file_name())
    }

    /// Every readable contact, ordered by file name
    ///
    /// Malformed or unreadable files are skipped with a warning.
    pub async fn list(&self) -> Result<Vec<ContactRecord>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.contacts_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.contacts_dir)(e)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(StoreError::io(&self.contacts_dir))?
        {
            let path = entry.path();
            let is_json = path.extension().map_or(false, |ext| ext == "json");
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if is_json && !hidden {
                paths.push(path);
            }
        }
        paths.sort();

        let mut contacts = Vec::with_capacity(paths.len());
        for path in paths {
            match read_contact(&path).await {
                Ok(contact) => contacts.push(contact),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable contact file"),
            }
        }
        Ok(contacts)
    }

    pub async fn get(&self, key: &StorageKey) -> Result<ContactRecord, StoreError> {
        let path = self.record_path(key);
        match read_contact(&path).await {
            Err(StoreError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            other => other,
        }
    }

    /// Write a contact, overwriting any file with the same key
    ///
    /// `profileImage` is managed here: it keeps the stored contact's image
    /// unless `image` is present, in which case the bytes go to a new
    /// `<millis>_<key>.<ext>` file and the previous image is removed.
    pub async fn save(
        &self,
        key: &StorageKey,
        mut record: ContactRecord,
        image: Option<DecodedImage>,
    ) -> Result<ContactRecord, StoreError> {
        ensure_required(&record)?;
        let _guard = self.write_lock.lock().await;

        // A contact file that no longer parses has no image worth keeping
        let previous = self.get(key).await.ok().and_then(|c| c.profile_image);
        record.profile_image = previous.clone();

        let replaced = match image {
            Some(image) => {
                record.profile_image = Some(self.write_image(key, &image).await?.to_string());
                previous
            }
            None => None,
        };

        record.updated_at = Some(hgd_common::time::now_rfc3339());
        write_json_atomic(&self.record_path(key), &record).await?;

        if let Some(old) = replaced.filter(|old| record.profile_image.as_ref() != Some(old)) {
            self.remove_image(key, &old).await;
        }

        info!(contact = %key, "Contact saved");
        Ok(record)
    }

    /// Shallow-merge `partial` onto the stored contact and overwrite it
    ///
    /// A `profileImage` key in `partial` is ignored. A replacement image gets
    /// a freshly generated name and the old file is removed afterwards.
    pub async fn update(
        &self,
        key: &StorageKey,
        partial: Map<String, Value>,
        image: Option<DecodedImage>,
    ) -> Result<ContactRecord, StoreError> {
        let _guard = self.write_lock.lock().await;
        let existing = self.get(key).await?;

        let mut merged = match serde_json::to_value(&existing)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (field, value) in partial {
            if field == PROFILE_IMAGE_FIELD {
                continue;
            }
            merged.insert(field, value);
        }
        merged.insert(
            "updatedAt".to_string(),
            Value::String(hgd_common::time::now_rfc3339()),
        );

        let mut record: ContactRecord = serde_json::from_value(Value::Object(merged))
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
        ensure_required(&record)?;

        let replaced = match image {
            Some(image) => {
                record.profile_image = Some(self.write_image(key, &image).await?.to_string());
                existing.profile_image
            }
            None => None,
        };

        write_json_atomic(&self.record_path(key), &record).await?;

        if let Some(old) = replaced.filter(|old| record.profile_image.as_ref() != Some(old)) {
            self.remove_image(key, &old).await;
        }

        info!(contact = %key, "Contact updated");
        Ok(record)
    }

    /// Remove the contact file and its profile image, if any
    pub async fn delete(&self, key: &StorageKey) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let existing = self.get(key).await?;

        remove_if_exists(&self.record_path(key)).await?;

        if let Some(image) = existing.profile_image {
            self.remove_image(key, &image).await;
        }

        info!(contact = %key, "Contact deleted");
        Ok(())
    }

    /// Store image bytes as `<millis>_<key>.<ext>`; caller holds `write_lock`
    async fn write_image(&self, key: &StorageKey, image: &DecodedImage) -> Result<AssetName, StoreError> {
        let stem = format!("{}_{}", hgd_common::time::epoch_millis(), key);
        let name = AssetName::generate(&stem, image.extension)?;
        write_bytes_atomic(&self.image_path(&name), &image.bytes).await?;
        Ok(name)
    }

    /// Best-effort removal of a profile image by its stored name
    async fn remove_image(&self, key: &StorageKey, image: &str) {
        if image.trim().is_empty() {
            return;
        }
        match AssetName::parse(image) {
            Ok(name) => {
                if let Err(e) = remove_if_exists(&self.image_path(&name)).await {
                    warn!(contact = %key, error = %e, "Failed to remove profile image");
                }
            }
            Err(_) => warn!(contact = %key, image, "Ignoring unsafe profile image name"),
        }
    }
}

const PROFILE_IMAGE_FIELD: &str = "profileImage";

async fn read_contact(path: &Path) -> Result<ContactRecord, StoreError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(StoreError::io(path))?;
    Ok(serde_json::from_str(&raw)?)
}

fn ensure_required(record: &ContactRecord) -> Result<(), StoreError> {
    let missing = record.missing_required_fields();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(StoreError::InvalidRecord(format!(
            "missing required fields: {}",
            missing.join(", ")
        )))
    }
}
