use anyhow::Context;
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::repo::Image;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub struct UploadItem<'a> {
    pub filename: &'a str,
    pub body: Bytes,
    pub content_type: Option<&'a str>,
}

/// Reduces a client-supplied file name to `[A-Za-z0-9._-]`, turning
/// whitespace and path separators into `_` and stripping `.`/`_` from both ends.
pub fn secure_filename(raw: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    for word in raw
        .split(|c: char| c.is_whitespace() || c == '/' || c == '\\')
        .filter(|w| !w.is_empty())
    {
        let kept: String = word
            .chars()
            .filter(|&c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            .collect();
        if !kept.is_empty() {
            words.push(kept);
        }
    }
    words
        .join("_")
        .trim_start_matches(|c: char| c == '.' || c == '_')
        .trim_end_matches(|c: char| c == '.' || c == '_')
        .to_string()
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Storage key for a new upload: `<id>-<sanitized name>[.<ext>]`.
fn storage_key(id: Uuid, safe_name: &str, content_type: Option<&str>) -> String {
    match content_type.and_then(ext_from_mime) {
        Some(ext) if !safe_name.contains('.') => format!("{}-{}.{}", id, safe_name, ext),
        _ => format!("{}-{}", id, safe_name),
    }
}

pub async fn upload_image(st: &AppState, user_id: Uuid, item: UploadItem<'_>) -> ApiResult<Image> {
    if item.filename.is_empty() {
        return Err(ApiError::BadRequest("No selected file".into()));
    }
    let safe = secure_filename(item.filename);
    if safe.is_empty() {
        return Err(ApiError::BadRequest("Invalid filename".into()));
    }

    let id = Uuid::new_v4();
    let key = storage_key(id, &safe, item.content_type);
    let size = item.body.len();
    st.storage
        .put_object(&key, item.body)
        .await
        .with_context(|| format!("put_object {}", key))?;

    let image = Image {
        id,
        filename: key,
        user_id,
        upload_time: OffsetDateTime::now_utc(),
    };
    if let Err(e) = st.images.insert(&image).await {
        // keep storage and metadata in step
        if let Err(cleanup) = st.storage.delete_object(&image.filename).await {
            warn!(error = %cleanup, key = %image.filename, "orphaned blob after failed insert");
        }
        return Err(e.into());
    }

    info!(image_id = %image.id, %user_id, key = %image.filename, size, "image uploaded");
    Ok(image)
}

pub async fn list_images(st: &AppState) -> ApiResult<Vec<Image>> {
    Ok(st.images.list_all().await?)
}

/// Only the owner may delete; another user's image is reported as absent.
pub async fn delete_image(st: &AppState, user_id: Uuid, image_id: Uuid) -> ApiResult<()> {
    match st.images.find(image_id).await? {
        Some(img) if img.user_id == user_id => {}
        Some(_) => {
            warn!(%image_id, %user_id, "delete attempted by non-owner");
            return Err(ApiError::NotFound);
        }
        None => return Err(ApiError::NotFound),
    }

    let Some(image) = st.images.delete(image_id).await? else {
        return Err(ApiError::NotFound);
    };

    match st.storage.delete_object(&image.filename).await {
        Ok(true) => {}
        Ok(false) => warn!(key = %image.filename, "blob already missing on delete"),
        Err(e) => warn!(error = %e, key = %image.filename, "blob delete failed"),
    }

    info!(%image_id, %user_id, "image deleted");
    Ok(())
}
