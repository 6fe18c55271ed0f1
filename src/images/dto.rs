use serde::Serialize;

use super::repo::Image;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub image: Image,
}
