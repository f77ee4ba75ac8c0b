//! Location endpoints
//!
//! - `GET /locations` - whole document, `{"results": [...]}`
//! - `GET /locations/:place_id` - one record (facility page)
//! - `POST /locations` - run the ingestion workflow, 201 with the stored record
//! - `DELETE /locations?place_id=<id>` - remove by identifier, with its image

use super::{json_body, StatusResponse};
use crate::models::{LocationDocument, LocationRecord};
use crate::workflow::NewLocation;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

/// Query string of `DELETE /locations`
#[derive(Debug, Default, Deserialize)]
pub struct DeleteLocationParams {
    #[serde(default, alias = "placeId")]
    pub place_id: Option<String>,
}

/// GET /locations
pub async fn list_locations(State(state): State<AppState>) -> ApiResult<Json<LocationDocument>> {
    let results = state.locations.load_all().await?;
    Ok(Json(LocationDocument { results }))
}

/// GET /locations/:place_id
pub async fn get_location(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
) -> ApiResult<Json<LocationRecord>> {
    state
        .locations
        .find_by_place_id(&place_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("location {}", place_id)))
}

/// POST /locations
///
/// **Errors:**
/// - 400: blank address, undecodable image, address not geocodable
/// - 409: a record with the resolved place id already exists
/// - 502: geocoding service failure
/// - 500: store write failure
pub async fn add_location(
    State(state): State<AppState>,
    payload: Result<Json<NewLocation>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<LocationRecord>)> {
    let request = json_body(payload)?;
    let record = state.ingestion.ingest(request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// DELETE /locations?place_id=<id>
pub async fn delete_location(
    State(state): State<AppState>,
    Query(params): Query<DeleteLocationParams>,
) -> ApiResult<Json<StatusResponse>> {
    let place_id = params
        .place_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("place_id query parameter is required".to_string()))?;

    if state.ingestion.remove_location(&place_id).await?.is_empty() {
        return Err(ApiError::NotFound(format!("location {}", place_id)));
    }

    info!(place_id = %place_id, "Location deleted via API");
    Ok(Json(StatusResponse::ok(format!(
        "Location {} deleted successfully",
        place_id
    ))))
}

/// Build location routes
pub fn location_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/locations",
            get(list_locations).post(add_location).delete(delete_location),
        )
        .route("/locations/:place_id", get(get_location))
}
