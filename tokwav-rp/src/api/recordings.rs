//! Recording endpoints

use crate::codec::EncodedPayload;
use crate::db::recordings::{self as db, Recording, RecordingPage};
use crate::error::{ApiError, ApiResult};
use crate::ingest;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::{debug, info};

const DEFAULT_PAGE_LIMIT: u32 = 20;
const FALLBACK_FILENAME: &str = "recording";

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Fields collected from the upload form
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Vec<u8>>,
    upload_name: Option<String>,
    format: Option<String>,
    sample_rate: Option<u32>,
    original_filename: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.upload_name = field.file_name().map(str::to_string);
                form.file = Some(field.bytes().await?.to_vec());
            }
            "format" => form.format = Some(field.text().await?.trim().to_string()),
            "sample_rate" => {
                let text = field.text().await?;
                let rate = text
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::BadRequest(format!("Invalid sample_rate '{}'", text)))?;
                form.sample_rate = Some(rate);
            }
            "original_filename" => {
                form.original_filename = Some(field.text().await?).filter(|s| !s.is_empty());
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    Ok(form)
}

/// POST /recordings
///
/// Multipart fields: `file` (little-endian f32 codes), `format`,
/// `sample_rate` (defaults to the configured source rate) and optional
/// `original_filename`.
pub async fn create_recording(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<Recording>> {
    let form = read_form(multipart).await?;

    let bytes = form
        .file
        .ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;
    let format = form
        .format
        .ok_or_else(|| ApiError::BadRequest("Missing 'format' field".to_string()))?;
    let sample_rate = form.sample_rate.unwrap_or(state.config.default_source_rate);
    let filename = form
        .original_filename
        .or(form.upload_name)
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string());

    info!(
        "Upload '{}': {} bytes, format {}, {}Hz",
        filename,
        bytes.len(),
        format,
        sample_rate
    );

    let payload = EncodedPayload::new(bytes, sample_rate, format);
    let recording = ingest::ingest(&state, payload, filename).await?;
    Ok(Json(recording))
}

/// GET /recordings?page=&limit=
pub async fn list_recordings(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<RecordingPage>> {
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if page == 0 || limit == 0 {
        return Err(ApiError::BadRequest("page and limit must be at least 1".to_string()));
    }

    Ok(Json(db::list_recordings(&state.db, page, limit).await?))
}

/// GET /recordings/:id
pub async fn get_recording(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Recording>> {
    db::get_recording(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Recording {} not found", id)))
}
