//! Location (facility) records and the document that holds them

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// String-keyed nested record with no fixed schema
pub type FreeForm = Map<String, Value>;

/// Read an explicit `null` as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One component of a geocoded address (street number, route, locality, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub long_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub short_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub types: Vec<String>,
}

impl AddressComponent {
    pub fn has_type(&self, tag: &str) -> bool {
        self.types.iter().any(|t| t == tag)
    }
}

/// WGS84 coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Both finite, lat ∈ [-90, 90], lng ∈ [-180, 180]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
    /// location_type, viewport, ... as returned by the geocoder
    #[serde(flatten)]
    pub extra: FreeForm,
}

impl Geometry {
    pub fn at(location: LatLng) -> Self {
        Self {
            location,
            extra: FreeForm::new(),
        }
    }
}

/// A geocoded point of interest
///
/// Created once by the ingestion workflow and never edited in place; it is
/// either present in the document or removed wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Unique key: geocoder place id or a synthesized `custom_<millis>`
    pub place_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub formatted_address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address_components: Vec<AddressComponent>,
    pub geometry: Geometry,
    #[serde(default, deserialize_with = "null_as_default")]
    pub facility_name: String,
    /// Category tags, unique, in first-seen order
    #[serde(default, deserialize_with = "null_as_default")]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_info: Option<FreeForm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<FreeForm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikipedia_info: Option<FreeForm>,
    /// Relative path of an uploaded image (`location_assets/<file>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// plus_code and anything else older documents carry
    #[serde(flatten)]
    pub extra: FreeForm,
}

impl LocationRecord {
    /// Enrichment summary stored under `wikipedia_info.summary`
    pub fn enrichment_summary(&self) -> Option<&str> {
        self.wikipedia_info
            .as_ref()
            .and_then(|info| info.get("summary"))
            .and_then(Value::as_str)
    }
}

/// On-disk shape of the locations document: `{"results": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<LocationRecord>,
}

impl LocationDocument {
    pub fn contains(&self, place_id: &str) -> bool {
        self.results.iter().any(|r| r.place_id == place_id)
    }
}

/// Deduplicate tags keeping first-seen order, dropping blanks
pub fn unique_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
