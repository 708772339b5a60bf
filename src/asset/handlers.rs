use std::path::Path as StdPath;

use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use futures::TryStreamExt;
use sanitize_filename::sanitize;
use uuid::Uuid;

use super::model::{UploadFileForm, UploadedFile};
use crate::auth::validate_request_token;
use crate::error::AppError;
use crate::storage::validate_object_path;
use crate::AppState;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_FOLDER: &str = "others";

/// Builds the object path `<folder>/<uuid>_<name>`. Every folder segment and
/// the file name are sanitized; an empty folder falls back to `others`.
pub fn object_path(folder: Option<&str>, original_name: &str) -> Result<String, AppError> {
    let segments: Vec<String> = folder
        .unwrap_or_default()
        .split('/')
        .map(|s| sanitize(s.trim()))
        .filter(|s| !s.is_empty() && s != "." && s != "..")
        .collect();
    let folder = if segments.is_empty() {
        DEFAULT_FOLDER.to_string()
    } else {
        segments.join("/")
    };

    let name = sanitize(original_name.trim());
    if name.is_empty() {
        return Err(AppError::BadRequest("File name is missing".to_string()));
    }

    let path = format!("{}/{}_{}", folder, Uuid::new_v4(), name.replace(' ', "_"));
    validate_object_path(&path)?;
    Ok(path)
}

struct UploadParts {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
    folder: Option<String>,
}

async fn read_upload(mut payload: Multipart) -> Result<UploadParts, AppError> {
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;
    let mut folder = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        let Some(disposition) = field.content_disposition().cloned() else {
            continue;
        };
        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {}", e)))?
        {
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(AppError::BadRequest(format!(
                    "File exceeds the {} MB limit",
                    MAX_UPLOAD_BYTES / (1024 * 1024)
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        match disposition.get_name() {
            Some("file") => {
                let filename = disposition
                    .get_filename()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::BadRequest("File name is missing".to_string()))?;
                let content_type = field.content_type().map(|m| m.to_string());
                file = Some((filename, content_type, bytes));
            }
            Some("folder") => {
                folder = Some(
                    String::from_utf8(bytes).map_err(|_| AppError::BadRequest("Folder must be text".to_string()))?,
                );
            }
            _ => {}
        }
    }

    let (filename, content_type, data) =
        file.ok_or_else(|| AppError::BadRequest("No file was uploaded".to_string()))?;
    Ok(UploadParts {
        filename,
        content_type,
        data,
        folder,
    })
}

#[utoipa::path(
    post,
    path = "/api/files",
    tag = "Files",
    request_body(content = inline(UploadFileForm), content_type = "multipart/form-data"),
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "File stored", body = UploadedFile),
        (status = 400, description = "Missing or oversized file"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn upload_file(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    let upload = read_upload(payload).await?;
    if upload.data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }

    let path = object_path(upload.folder.as_deref(), &upload.filename)?;
    let content_type = upload.content_type.unwrap_or_else(|| {
        let ext = StdPath::new(&upload.filename)
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .unwrap_or_default();
        mime_guess::from_ext(ext).first_or_octet_stream().to_string()
    });

    state
        .storage
        .upload_file(&path, &upload.data, Some(&content_type))
        .await?;
    log::info!("Stored upload {} ({} bytes)", path, upload.data.len());

    Ok(HttpResponse::Created().json(UploadedFile {
        url: state.storage.get_asset_url(&path),
        size: upload.data.len(),
        path,
        content_type,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/files/{path}",
    tag = "Files",
    params(("path" = String, Path, description = "Object path returned by the upload")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "File deleted"),
        (status = 400, description = "Invalid path"),
        (status = 404, description = "File not found")
    )
)]
pub async fn delete_file(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    validate_object_path(&path)?;
    state.storage.delete_file(&path).await?;
    log::info!("Deleted upload {}", path);
    Ok(HttpResponse::Ok().finish())
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/files").route(web::post().to(upload_file)))
        .service(web::resource("/files/{path:.*}").route(web::delete().to(delete_file)));
}
