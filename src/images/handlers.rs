use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::dto::UploadResponse;
use super::repo::Image;
use super::services::{self, UploadItem};
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult, MessageResponse},
    state::AppState,
};

/// Multipart field carrying the file.
const IMAGE_FIELD: &str = "image";

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/api/images", get(list_images))
}

pub fn write_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(upload))
        .route("/api/delete/:id", delete(remove))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

#[instrument(skip(state))]
pub async fn list_images(State(state): State<AppState>) -> ApiResult<Json<Vec<Image>>> {
    Ok(Json(services::list_images(&state).await?))
}

/// POST /api/upload (multipart, field `image`)
#[instrument(skip_all)]
pub async fn upload(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    mut mp: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut file: Option<(String, Option<String>, Bytes)> = None;
    while let Some(field) = mp.next_field().await.map_err(|e| {
        warn!(error = %e, status = %e.status(), "bad multipart body");
        ApiError::from(e)
    })? {
        if field.name() != Some(IMAGE_FIELD) {
            // other form fields (a client-sent user_id, say) are not trusted
            debug!(field = ?field.name(), "ignoring multipart field");
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| {
            warn!(error = %e, status = %e.status(), "multipart field read failed");
            ApiError::from(e)
        })?;
        file = Some((filename, content_type, data));
        break;
    }

    let Some((filename, content_type, body)) = file else {
        return Err(ApiError::BadRequest("No file part".into()));
    };

    let image = services::upload_image(
        &state,
        claims.user_id,
        UploadItem {
            filename: &filename,
            body,
            content_type: content_type.as_deref(),
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Image uploaded successfully!",
            image,
        }),
    ))
}

/// DELETE /api/delete/:id
#[instrument(skip(state, claims))]
pub async fn remove(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    // an unparsable id names no image
    let image_id = Uuid::parse_str(&id).map_err(|_| ApiError::NotFound)?;
    services::delete_image(&state, claims.user_id, image_id).await?;
    Ok(Json(MessageResponse::new("Image deleted successfully!")))
}
