//! hgd-server library interface
//!
//! Exposes the router and state so integration tests can drive the service
//! in-process with stub geocoding/enrichment clients.

pub mod api;
pub mod assets;
pub mod clients;
pub mod error;
pub mod models;
pub mod store;
pub mod vcard;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use clients::{Enricher, Geocoder};
use hgd_common::config::{RootFolderInitializer, CONTACT_ASSETS_DIR, LOCATION_ASSETS_DIR};
use std::sync::Arc;
use store::{ContactStore, LocationStore};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use workflow::IngestionWorkflow;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub locations: Arc<LocationStore>,
    pub contacts: Arc<ContactStore>,
    pub ingestion: Arc<IngestionWorkflow>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        root: &RootFolderInitializer,
        geocoder: Arc<dyn Geocoder>,
        enricher: Arc<dyn Enricher>,
    ) -> Self {
        let locations = Arc::new(LocationStore::new(root.locations_path()));
        let contacts = Arc::new(ContactStore::new(
            root.contacts_dir(),
            root.contact_assets_dir(),
        ));
        let ingestion = Arc::new(IngestionWorkflow::new(
            geocoder,
            enricher,
            locations.clone(),
            root.location_assets_dir(),
        ));

        Self {
            locations,
            contacts,
            ingestion,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let contact_assets = ServeDir::new(state.contacts.assets_dir());
    let location_assets = ServeDir::new(state.ingestion.assets_dir());

    Router::new()
        .merge(api::health_routes())
        .merge(api::location_routes())
        .merge(api::contact_routes())
        .nest_service(&format!("/{}", CONTACT_ASSETS_DIR), contact_assets)
        .nest_service(&format!("/{}", LOCATION_ASSETS_DIR), location_assets)
        .with_state(state)
        .layer(DefaultBodyLimit::max(assets::MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
