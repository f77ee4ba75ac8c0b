//! External service clients
//!
//! Both clients sit behind a trait so the ingestion workflow can be driven by
//! in-process stubs in tests.

pub mod geocoding;
pub mod wikipedia;

pub use geocoding::{GeocodeError, GeocodeResult, GoogleGeocodingClient};
pub use wikipedia::{EnrichmentResult, WikipediaClient, NO_INFORMATION};

use async_trait::async_trait;

/// Free-text address → structured, geocoded result
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Single attempt; never retried
    async fn geocode(&self, address: &str) -> Result<GeocodeResult, GeocodeError>;
}

/// Subject name → descriptive summary
///
/// Best effort: implementations return [`EnrichmentResult::not_found`]
/// instead of failing.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, subject: &str) -> EnrichmentResult;
}
