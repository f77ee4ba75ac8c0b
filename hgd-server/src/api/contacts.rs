//! Contact endpoints
//!
//! Contact ids are storage keys (`firstname_lastname` by default). Every id
//! taken from a path or body passes the key whitelist before it reaches the
//! filesystem; a rejected id is a 400.

use super::{json_body, StatusResponse};
use crate::assets::{decode_image, DecodedImage};
use crate::models::contact::non_blank;
use crate::models::ContactRecord;
use crate::store::StorageKey;
use crate::vcard::render_vcard;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

/// Body of `POST /contacts`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveContactRequest {
    #[serde(default)]
    pub contact: Option<Value>,
    /// Storage key, optionally with a `.json` suffix
    #[serde(default)]
    pub filename: Option<String>,
    /// Base64 data URL
    #[serde(default)]
    pub profile_image: Option<String>,
}

/// Body of `PUT /contacts/:id`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactRequest {
    /// Keys to merge onto the stored contact
    #[serde(default)]
    pub contact: Option<Map<String, Value>>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContactListResponse {
    pub contacts: Vec<ContactRecord>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub contact: ContactRecord,
}

#[derive(Debug, Serialize)]
pub struct SaveContactResponse {
    pub success: bool,
    pub message: String,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateContactResponse {
    pub success: bool,
    pub message: String,
    pub contact: ContactRecord,
}

fn decode_optional_image(data: &Option<String>) -> ApiResult<Option<DecodedImage>> {
    non_blank(data)
        .map(decode_image)
        .transpose()
        .map_err(ApiError::from)
}

/// GET /contacts
pub async fn list_contacts(State(state): State<AppState>) -> ApiResult<Json<ContactListResponse>> {
    let contacts = state.contacts.list().await?;
    Ok(Json(ContactListResponse { contacts }))
}

/// POST /contacts
///
/// **Request:** `{"contact": {...}, "filename"?: "ada_lovelace.json", "profileImage"?: "data:image/..."}`
/// **Response:** `{"success": true, "message": "...", "id": "ada_lovelace"}`
pub async fn save_contact(
    State(state): State<AppState>,
    payload: Result<Json<SaveContactRequest>, JsonRejection>,
) -> ApiResult<Json<SaveContactResponse>> {
    let request = json_body(payload)?;

    let contact = request
        .contact
        .ok_or_else(|| ApiError::BadRequest("contact is required".to_string()))?;
    let record: ContactRecord = serde_json::from_value(contact)
        .map_err(|e| ApiError::BadRequest(format!("invalid contact: {}", e)))?;

    let missing = record.missing_required_fields();
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let key = match non_blank(&request.filename) {
        Some(filename) => StorageKey::from_filename(filename)?,
        None => StorageKey::derive(&record.first_name, &record.last_name)?,
    };
    let image = decode_optional_image(&request.profile_image)?;

    state.contacts.save(&key, record, image).await?;
    info!(contact = %key, "Contact saved via API");

    Ok(Json(SaveContactResponse {
        success: true,
        message: "Contact saved successfully".to_string(),
        id: key.to_string(),
    }))
}

/// GET /contacts/:id
pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ContactResponse>> {
    let key = StorageKey::parse(&id)?;
    let contact = state.contacts.get(&key).await?;
    Ok(Json(ContactResponse { contact }))
}

/// PUT /contacts/:id
///
/// Shallow merge: keys present in `contact` replace the stored values.
pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateContactRequest>, JsonRejection>,
) -> ApiResult<Json<UpdateContactResponse>> {
    let key = StorageKey::parse(&id)?;
    let request = json_body(payload)?;

    let partial = request
        .contact
        .ok_or_else(|| ApiError::BadRequest("contact is required".to_string()))?;
    let image = decode_optional_image(&request.profile_image)?;

    let contact = state.contacts.update(&key, partial, image).await?;
    info!(contact = %key, "Contact updated via API");

    Ok(Json(UpdateContactResponse {
        success: true,
        message: "Contact updated successfully".to_string(),
        contact,
    }))
}

/// DELETE /contacts/:id
pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let key = StorageKey::parse(&id)?;
    state.contacts.delete(&key).await?;
    info!(contact = %key, "Contact deleted via API");
    Ok(Json(StatusResponse::ok("Contact deleted successfully")))
}

/// GET /contacts/:id/vcard
pub async fn contact_vcard(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let key = StorageKey::parse(&id)?;
    let contact = state.contacts.get(&key).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/vcard; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.vcf\"", key),
            ),
        ],
        render_vcard(&contact),
    ))
}

/// Build contact routes
pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/contacts", get(list_contacts).post(save_contact))
        .route(
            "/contacts/:id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
        .route("/contacts/:id/vcard", get(contact_vcard))
}
