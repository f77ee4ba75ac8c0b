use crate::assets::{decode_image, AssetError, DecodedImage};
use crate::clients::{EnrichmentResult, Enricher, GeocodeError, GeocodeResult, Geocoder};
use crate::models::contact::non_blank;
use crate::models::{unique_tags, FreeForm, Geometry, LocationRecord};
use crate::store::{remove_if_exists, write_bytes_atomic, AssetName, LocationStore, StoreError};
use hgd_common::config::LOCATION_ASSETS_DIR;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Body of `POST /locations`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLocation {
    #[serde(default)]
    pub address: String,
    #[serde(default, alias = "facilityName")]
    pub facility_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub historical_info: Option<FreeForm>,
    #[serde(default)]
    pub details: Option<FreeForm>,
    #[serde(default)]
    pub wikipedia_info: Option<FreeForm>,
    /// Base64 data URL
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    GeocodeFailed(#[from] GeocodeError),

    #[error("Location already exists: {0}")]
    Duplicate(String),

    #[error("Persistence failed: {0}")]
    Persistence(StoreError),
}

impl From<StoreError> for IngestionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(id) => IngestionError::Duplicate(id),
            other => IngestionError::Persistence(other),
        }
    }
}

impl From<AssetError> for IngestionError {
    fn from(err: AssetError) -> Self {
        IngestionError::Validation(err.to_string())
    }
}

/// Synthesizes `custom_<millis>` identifiers
///
/// Identifiers are strictly increasing within a process: a call in the same
/// millisecond as the previous one gets the previous value plus one.
#[derive(Debug, Default)]
pub struct PlaceIdGenerator {
    last: AtomicU64,
}

impl PlaceIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        self.next_at(hgd_common::time::epoch_millis())
    }

    /// Next identifier given the current clock reading
    pub fn next_at(&self, now_millis: u64) -> String {
        let mut current = self.last.load(Ordering::Acquire);
        loop {
            let candidate = now_millis.max(current.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(current, candidate, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return format!("custom_{}", candidate),
                Err(actual) => current = actual,
            }
        }
    }
}

/// Name used to look up the encyclopedia entry
///
/// Caller-supplied facility name, else the first address component tagged
/// `establishment` or `point_of_interest`, else the formatted address.
pub fn derive_subject_name(facility_name: Option<&str>, geocoded: &GeocodeResult) -> String {
    if let Some(name) = facility_name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    geocoded
        .address_components
        .iter()
        .find(|c| c.has_type("establishment") || c.has_type("point_of_interest"))
        .map(|c| c.long_name.clone())
        .unwrap_or_else(|| geocoded.formatted_address.clone())
}

pub struct IngestionWorkflow {
    geocoder: Arc<dyn Geocoder>,
    enricher: Arc<dyn Enricher>,
    store: Arc<LocationStore>,
    assets_dir: PathBuf,
    place_ids: PlaceIdGenerator,
}

impl IngestionWorkflow {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        enricher: Arc<dyn Enricher>,
        store: Arc<LocationStore>,
        assets_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            geocoder,
            enricher,
            store,
            assets_dir: assets_dir.into(),
            place_ids: PlaceIdGenerator::new(),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Run the full workflow and return the stored record
    pub async fn ingest(&self, request: NewLocation) -> Result<LocationRecord, IngestionError> {
        let address = request.address.trim().to_string();
        if address.is_empty() {
            return Err(IngestionError::Validation("address is required".into()));
        }
        let image = match non_blank(&request.image) {
            Some(data) => Some(decode_image(data)?),
            None => None,
        };

        info!(address = %address, "Ingesting location");
        let geocoded = self.geocoder.geocode(&address).await?;

        let subject = derive_subject_name(request.facility_name.as_deref(), &geocoded);
        let enrichment = self.enricher.enrich(&subject).await;
        if enrichment.is_not_found() {
            debug!(subject = %subject, "No enrichment available");
        }

        let record = self.assemble(request, geocoded, subject, enrichment);
        self.persist(record, image).await
    }

    fn assemble(
        &self,
        request: NewLocation,
        geocoded: GeocodeResult,
        subject: String,
        enrichment: EnrichmentResult,
    ) -> LocationRecord {
        let place_id = geocoded
            .place_id
            .unwrap_or_else(|| self.place_ids.next_id());

        let types = match non_blank(&request.category) {
            Some(category) => vec![category.to_lowercase()],
            None => unique_tags(&geocoded.types),
        };

        let mut wikipedia_info = request.wikipedia_info.unwrap_or_default();
        wikipedia_info.insert("summary".into(), Value::String(enrichment.summary));
        if let Some(title) = enrichment.title {
            wikipedia_info.insert("title".into(), Value::String(title));
        }
        if let Some(url) = enrichment.url {
            wikipedia_info.insert("url".into(), Value::String(url));
        }

        LocationRecord {
            place_id,
            formatted_address: geocoded.formatted_address,
            address_components: geocoded.address_components,
            geometry: Geometry::at(geocoded.location),
            facility_name: subject,
            types,
            historical_info: request.historical_info,
            details: request.details,
            wikipedia_info: Some(wikipedia_info),
            image: None,
            created_at: Some(hgd_common::time::now_rfc3339()),
            extra: FreeForm::new(),
        }
    }

    async fn persist(
        &self,
        mut record: LocationRecord,
        image: Option<DecodedImage>,
    ) -> Result<LocationRecord, IngestionError> {
        if self.store.exists_by_place_id(&record.place_id).await? {
            return Err(IngestionError::Duplicate(record.place_id));
        }

        let written = match image {
            Some(image) => {
                let name = AssetName::generate(&Uuid::new_v4().simple().to_string(), image.extension)?;
                let path = self.assets_dir.join(name.as_str());
                write_bytes_atomic(&path, &image.bytes).await?;
                record.image = Some(format!("{}/{}", LOCATION_ASSETS_DIR, name));
                Some(path)
            }
            None => None,
        };

        if let Err(e) = self.store.append(record.clone()).await {
            if let Some(path) = written {
                if let Err(cleanup) = remove_if_exists(&path).await {
                    warn!(path = %path.display(), error = %cleanup, "Failed to remove orphaned image");
                }
            }
            return Err(e.into());
        }

        info!(
            place_id = %record.place_id,
            facility = %record.facility_name,
            "Location ingested"
        );
        Ok(record)
    }

    /// Remove every record with `place_id` along with its uploaded image
    ///
    /// Image removal is best effort: a stale or foreign `image` value is
    /// logged and left alone.
    pub async fn remove_location(&self, place_id: &str) -> Result<Vec<LocationRecord>, StoreError> {
        let removed = self.store.remove_by_place_id(place_id).await?;

        for image in removed.iter().filter_map(|r| r.image.as_deref()) {
            let file = image
                .strip_prefix(LOCATION_ASSETS_DIR)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(image);
            match AssetName::parse(file) {
                Ok(name) => {
                    if let Err(e) = remove_if_exists(&self.assets_dir.join(name.as_str())).await {
                        warn!(place_id = %place_id, error = %e, "Failed to remove location image");
                    }
                }
                Err(_) => warn!(place_id = %place_id, image, "Ignoring unsafe location image name"),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::NO_INFORMATION;
    use crate::models::{AddressComponent, LatLng};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubGeocoder {
        result: Result<GeocodeResult, String>,
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn geocode(&self, _address: &str) -> Result<GeocodeResult, GeocodeError> {
            self.result.clone().map_err(|status| GeocodeError::Status {
                status,
                message: None,
            })
        }
    }

    /// Records every subject it is asked about
    #[derive(Default)]
    struct StubEnricher {
        found: Option<EnrichmentResult>,
        subjects: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Enricher for StubEnricher {
        async fn enrich(&self, subject: &str) -> EnrichmentResult {
            self.subjects.lock().unwrap().push(subject.to_string());
            self.found.clone().unwrap_or_else(EnrichmentResult::not_found)
        }
    }

    fn garnett(place_id: Option<&str>) -> GeocodeResult {
        GeocodeResult {
            formatted_address: "213-215 S Garnett St, Henderson, NC 27536, USA".into(),
            location: LatLng { lat: 36.326337, lng: -78.403765 },
            address_components: vec![AddressComponent {
                long_name: "South Garnett Street".into(),
                short_name: "S Garnett St".into(),
                types: vec!["route".into()],
            }],
            place_id: place_id.map(String::from),
            types: vec!["street_address".into(), "street_address".into()],
        }
    }

    struct Harness {
        _temp: tempfile::TempDir,
        store: Arc<LocationStore>,
        enricher: Arc<StubEnricher>,
        workflow: IngestionWorkflow,
    }

    fn harness(geocoded: Result<GeocodeResult, String>, found: Option<EnrichmentResult>) -> Harness {
        let temp = tempfile::tempdir().unwrap();
        let store = Arc::new(LocationStore::new(temp.path().join("locations.json")));
        let enricher = Arc::new(StubEnricher {
            found,
            ..Default::default()
        });
        let workflow = IngestionWorkflow::new(
            Arc::new(StubGeocoder { result: geocoded }),
            enricher.clone(),
            store.clone(),
            temp.path().join("location_assets"),
        );
        Harness {
            _temp: temp,
            store,
            enricher,
            workflow,
        }
    }

    fn request(address: &str) -> NewLocation {
        NewLocation {
            address: address.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ingested_record_is_retrievable() {
        let h = harness(Ok(garnett(Some("ABC123"))), None);

        let record = h.workflow.ingest(request("213 S Garnett St, Henderson, NC")).await.unwrap();
        assert_eq!(record.place_id, "ABC123");
        assert_eq!(record.geometry.location, LatLng { lat: 36.326337, lng: -78.403765 });
        assert_eq!(record.types, vec!["street_address"]);
        assert!(record.created_at.is_some());

        let stored = h.store.load_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].place_id, "ABC123");
    }

    #[tokio::test]
    async fn test_duplicate_is_rejected_without_growing_store() {
        let h = harness(Ok(garnett(Some("ABC123"))), None);

        h.workflow.ingest(request("213 S Garnett St")).await.unwrap();
        let err = h.workflow.ingest(request("213 S Garnett St")).await.unwrap_err();

        assert!(matches!(err, IngestionError::Duplicate(id) if id == "ABC123"));
        assert_eq!(h.store.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_enrichment_failure_still_persists_with_sentinel() {
        let h = harness(Ok(garnett(Some("X1"))), None);

        let record = h.workflow.ingest(request("213 S Garnett St")).await.unwrap();
        assert_eq!(record.enrichment_summary(), Some(NO_INFORMATION));
        assert_eq!(h.store.load_all().await.unwrap()[0].enrichment_summary(), Some(NO_INFORMATION));
    }

    #[tokio::test]
    async fn test_enrichment_merges_over_caller_keys() {
        let found = EnrichmentResult {
            summary: "A historic bank building.".into(),
            title: Some("First National Bank Building".into()),
            url: Some("https://en.wikipedia.org/wiki/First_National_Bank_Building".into()),
        };
        let h = harness(Ok(garnett(Some("X1"))), Some(found));

        let mut caller_info = FreeForm::new();
        caller_info.insert("building_context".into(), Value::String("Downtown".into()));
        caller_info.insert("summary".into(), Value::String("stale".into()));

        let record = h
            .workflow
            .ingest(NewLocation {
                address: "213 S Garnett St".into(),
                facility_name: Some("First National Bank Building".into()),
                category: Some("Bank".into()),
                wikipedia_info: Some(caller_info),
                ..Default::default()
            })
            .await
            .unwrap();

        let info = record.wikipedia_info.as_ref().unwrap();
        assert_eq!(info["summary"], "A historic bank building.");
        assert_eq!(info["title"], "First National Bank Building");
        assert_eq!(info["building_context"], "Downtown");
        assert_eq!(record.types, vec!["bank"]);
        assert_eq!(record.facility_name, "First National Bank Building");
        assert_eq!(
            *h.enricher.subjects.lock().unwrap(),
            vec!["First National Bank Building".to_string()]
        );
    }

    #[tokio::test]
    async fn test_blank_address_fails_before_geocoding() {
        let h = harness(Ok(garnett(Some("X1"))), None);

        let err = h.workflow.ingest(request("   ")).await.unwrap_err();
        assert!(matches!(err, IngestionError::Validation(_)));
        assert!(h.enricher.subjects.lock().unwrap().is_empty());
        assert!(!h.store.path().exists());
    }

    #[tokio::test]
    async fn test_geocode_failure_leaves_disk_unchanged() {
        let h = harness(Err("ZERO_RESULTS".into()), None);

        let err = h.workflow.ingest(request("nowhere")).await.unwrap_err();
        assert!(matches!(err, IngestionError::GeocodeFailed(ref e) if e.is_client_fault()));
        assert!(!h.store.path().exists());
    }

    #[tokio::test]
    async fn test_undecodable_image_is_validation_error() {
        let h = harness(Ok(garnett(Some("X1"))), None);

        let err = h
            .workflow
            .ingest(NewLocation {
                address: "213 S Garnett St".into(),
                image: Some("data:image/png;base64,@@@".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::Validation(_)));
        assert!(!h.store.path().exists());
    }

    #[tokio::test]
    async fn test_image_is_written_and_referenced() {
        let h = harness(Ok(garnett(Some("X1"))), None);

        let record = h
            .workflow
            .ingest(NewLocation {
                address: "213 S Garnett St".into(),
                image: Some("data:image/png;base64,aGVsbG8=".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let image = record.image.unwrap();
        let file = image.strip_prefix("location_assets/").unwrap();
        assert!(file.ends_with(".png"));
        assert_eq!(std::fs::read(h.workflow.assets_dir().join(file)).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_remove_location_deletes_its_image() {
        let h = harness(Ok(garnett(Some("X1"))), None);
        let record = h
            .workflow
            .ingest(NewLocation {
                address: "213 S Garnett St".into(),
                image: Some("data:image/png;base64,aGVsbG8=".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let image = record.image.unwrap();
        let path = h
            .workflow
            .assets_dir()
            .join(image.strip_prefix("location_assets/").unwrap());
        assert!(path.exists());

        let removed = h.workflow.remove_location("X1").await.unwrap();

        assert_eq!(removed.len(), 1);
        assert!(!path.exists());
        assert!(h.workflow.remove_location("X1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_place_id_is_synthesized() {
        let h = harness(Ok(garnett(None)), None);

        let first = h.workflow.ingest(request("a")).await.unwrap();
        let second = h.workflow.ingest(request("b")).await.unwrap();

        assert!(first.place_id.starts_with("custom_"));
        assert_ne!(first.place_id, second.place_id);
        assert_eq!(h.store.load_all().await.unwrap().len(), 2);
    }

    #[test]
    fn test_place_ids_in_same_millisecond_differ() {
        let generator = PlaceIdGenerator::new();
        let a = generator.next_at(1_700_000_000_000);
        let b = generator.next_at(1_700_000_000_000);
        let c = generator.next_at(1_699_999_999_000);

        assert_eq!(a, "custom_1700000000000");
        assert_eq!(b, "custom_1700000000001");
        assert_eq!(c, "custom_1700000000002");
    }

    #[test]
    fn test_subject_name_fallbacks() {
        let mut geocoded = garnett(None);
        assert_eq!(derive_subject_name(Some("  City Hall "), &geocoded), "City Hall");
        assert_eq!(derive_subject_name(Some(" "), &geocoded), geocoded.formatted_address);

        geocoded.address_components.push(AddressComponent {
            long_name: "Henderson Library".into(),
            short_name: "Library".into(),
            types: vec!["point_of_interest".into(), "establishment".into()],
        });
        assert_eq!(derive_subject_name(None, &geocoded), "Henderson Library");
    }
}
