//! Document storage handlers
//!
//! Uploads land on the local filesystem under a per-bucket, per-workspace
//! prefix. Downloads are two-step: an authorized request mints a signed
//! URL, and the file endpoint serves bytes against the signature alone.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::handlers::{ensure_one_of, ApiResponse};
use crate::AppState;
use policydesk_common::{
    access::{require_access, RecordAccess},
    auth::AuthContext,
    db::models::{Document, DOCUMENT_ENTITY_TYPES},
    db::{NewDocument, Repository},
    errors::{AppError, Result},
    storage::StorageBucket,
};

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub document_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SignedFileQuery {
    pub expires: i64,
    pub signature: String,
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Upload a document.
///
/// Multipart fields: `file`, `bucket`, `entity_type`, `entity_id`.
pub async fn upload_document(
    State(state): State<AppState>,
    auth: AuthContext,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>)> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut bucket: Option<StorageBucket> = None;
    let mut entity_type: Option<String> = None;
    let mut entity_id: Option<Uuid> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart body: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let name = field.file_name().unwrap_or("upload.bin").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Unreadable file field: {}", e)))?;
                file = Some((name, content_type, data.to_vec()));
            }
            "bucket" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Unreadable bucket: {}", e)))?;
                bucket = Some(text.trim().parse()?);
            }
            "entity_type" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Unreadable entity_type: {}", e)))?;
                entity_type = Some(text.trim().to_string());
            }
            "entity_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Unreadable entity_id: {}", e)))?;
                entity_id = Some(text.trim().parse().map_err(|_| {
                    AppError::field_validation("entity_id", "Must be a UUID")
                })?);
            }
            _ => {}
        }
    }

    let (file_name, content_type, data) = file.ok_or_else(|| AppError::MissingField {
        field: "file".to_string(),
    })?;
    let bucket = bucket.ok_or_else(|| AppError::MissingField {
        field: "bucket".to_string(),
    })?;
    let entity_type = entity_type.ok_or_else(|| AppError::MissingField {
        field: "entity_type".to_string(),
    })?;
    let entity_id = entity_id.ok_or_else(|| AppError::MissingField {
        field: "entity_id".to_string(),
    })?;

    ensure_one_of("entity_type", &entity_type, DOCUMENT_ENTITY_TYPES)?;
    if data.is_empty() {
        return Err(AppError::validation("Uploaded file is empty"));
    }

    let safe_name = sanitize_file_name(&file_name);
    let relative_path = format!("{}/{}_{}", auth.workspace_id, Uuid::new_v4(), safe_name);
    let disk_dir = format!("{}/{}/{}", state.config.storage.root, bucket, auth.workspace_id);
    let disk_path = format!("{}/{}/{}", state.config.storage.root, bucket, relative_path);

    tokio::fs::create_dir_all(&disk_dir).await?;
    tokio::fs::write(&disk_path, &data).await?;

    let repo = Repository::new(state.db.clone());
    let document = repo
        .create_document(
            auth.workspace_id,
            auth.user_id,
            NewDocument {
                bucket: bucket.to_string(),
                path: relative_path,
                file_name,
                content_type,
                size_bytes: data.len() as i64,
                entity_type,
                entity_id,
            },
        )
        .await?;

    metrics::counter!("policydesk_storage_uploads_total").increment(1);
    tracing::info!(
        document_id = %document.id,
        bucket = %document.bucket,
        workspace_id = %auth.workspace_id,
        size_bytes = document.size_bytes,
        "Document uploaded"
    );

    let url = state.signer.signed_url(bucket, &document.path)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(serde_json::json!({
            "document": document,
            "url": url,
        }))),
    ))
}

/// The uploader, a privileged role, or anyone with access to the parent
/// lead/client may download a document.
async fn require_document_access(
    repo: &Repository,
    auth: &AuthContext,
    document: &Document,
) -> Result<()> {
    if auth.role.is_privileged() || document.uploaded_by == auth.user_id {
        return Ok(());
    }

    let record = match document.entity_type.as_str() {
        "lead" => repo
            .find_lead(auth.workspace_id, document.entity_id)
            .await?
            .map(|l| RecordAccess::new(l.created_by, l.assigned_to)),
        "client" => repo
            .find_client(auth.workspace_id, document.entity_id)
            .await?
            .map(|c| RecordAccess::new(c.created_by, c.assigned_to)),
        _ => None,
    };

    match record {
        Some(record) => require_access(auth.user_id, auth.role, &record),
        None => Err(AppError::Forbidden {
            message: "You do not have access to this document".to_string(),
        }),
    }
}

/// Mint a signed download URL for a document
pub async fn download_url(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<DownloadRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let repo = Repository::new(state.db.clone());

    let document = repo
        .find_document(auth.workspace_id, request.document_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "document",
            id: request.document_id.to_string(),
        })?;

    require_document_access(&repo, &auth, &document).await?;

    let bucket: StorageBucket = document.bucket.parse()?;
    let url = state.signer.signed_url(bucket, &document.path)?;

    metrics::counter!("policydesk_storage_downloads_total").increment(1);

    Ok(Json(ApiResponse::ok(serde_json::json!({
        "url": url,
        "file_name": document.file_name,
        "content_type": document.content_type,
    }))))
}

/// Serve file bytes against a signed URL. No auth headers required: the
/// signature covers bucket, path, and expiry.
pub async fn serve_file(
    State(state): State<AppState>,
    Path((bucket, path)): Path<(String, String)>,
    Query(query): Query<SignedFileQuery>,
) -> Result<Response> {
    let bucket: StorageBucket = bucket.parse()?;

    if path.contains("..") {
        return Err(AppError::validation("Invalid storage path"));
    }

    state
        .signer
        .verify(bucket, &path, query.expires, &query.signature)?;

    let disk_path = format!("{}/{}/{}", state.config.storage.root, bucket, path);
    let bytes = tokio::fs::read(&disk_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::NotFound {
                entity: "file",
                id: path.clone(),
            }
        } else {
            e.into()
        }
    })?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("policy v2.pdf"), "policy_v2.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("quote-2024_final.PDF"), "quote-2024_final.PDF");
    }
}
