use serde::Serialize;
use utoipa::ToSchema;

/// Multipart form accepted by the upload endpoint.
#[derive(Debug, ToSchema)]
pub struct UploadFileForm {
    #[allow(unused)]
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Optional folder, e.g. `banners` or `members/2024`.
    #[allow(unused)]
    pub folder: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadedFile {
    /// Object path inside the storage, used to delete the file later.
    #[schema(example = "banners/0190f6a2-7c1e-7b3a-9d2e-3f4a5b6c7d8e_cover.png")]
    pub path: String,
    pub url: String,
    pub content_type: String,
    pub size: usize,
}
