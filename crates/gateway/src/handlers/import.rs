//! CSV lead import handler

use axum::{extract::Multipart, extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::Instant;

use crate::handlers::ApiResponse;
use crate::AppState;
use policydesk_common::{
    auth::AuthContext,
    db::Repository,
    errors::{AppError, Result},
    import::{parse_leads, ColumnMapping},
    metrics::record_import,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub file_name: String,
    pub total_rows: usize,
    pub imported_count: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Import leads from an uploaded CSV.
///
/// Multipart fields:
/// - `file`: the CSV
/// - `mappings`: JSON array of column mappings
/// - `pipeline_id`: target pipeline
/// - `status_id` (optional): target status, defaults to the pipeline's
///   intake status
/// - `lead_source` (optional): stamped as `source` on every imported lead
///   unless a mapped column supplies one
pub async fn import_leads(
    State(state): State<AppState>,
    auth: AuthContext,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<ImportResult>>)> {
    let started = Instant::now();

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut mappings: Option<Vec<ColumnMapping>> = None;
    let mut pipeline_id: Option<i32> = None;
    let mut status_id: Option<i32> = None;
    let mut lead_source: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart body: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let name = field.file_name().unwrap_or("upload.csv").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Unreadable file field: {}", e)))?;
                file = Some((name, data.to_vec()));
            }
            "mappings" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Unreadable mappings: {}", e)))?;
                mappings = Some(serde_json::from_str(&text).map_err(|e| {
                    AppError::field_validation("mappings", format!("Invalid mapping JSON: {}", e))
                })?);
            }
            "pipeline_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Unreadable pipeline_id: {}", e)))?;
                pipeline_id = Some(text.trim().parse().map_err(|_| {
                    AppError::field_validation("pipeline_id", "Must be an integer")
                })?);
            }
            "status_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Unreadable status_id: {}", e)))?;
                status_id = Some(text.trim().parse().map_err(|_| {
                    AppError::field_validation("status_id", "Must be an integer")
                })?);
            }
            // accept either naming convention from upload forms
            "lead_source" | "leadSource" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Unreadable lead_source: {}", e)))?;
                let text = text.trim();
                if !text.is_empty() {
                    lead_source = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    let (file_name, data) = file.ok_or_else(|| AppError::MissingField {
        field: "file".to_string(),
    })?;
    let mappings = mappings.ok_or_else(|| AppError::MissingField {
        field: "mappings".to_string(),
    })?;
    let pipeline_id = pipeline_id.ok_or_else(|| AppError::MissingField {
        field: "pipeline_id".to_string(),
    })?;

    let repo = Repository::new(state.db.clone());

    let pipeline = repo
        .find_pipeline(auth.workspace_id, pipeline_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "pipeline",
            id: pipeline_id.to_string(),
        })?;

    let status_id = match status_id {
        Some(id) => {
            repo.find_pipeline_status(id)
                .await?
                .filter(|s| s.pipeline_id == pipeline.id)
                .ok_or_else(|| {
                    AppError::field_validation(
                        "status_id",
                        format!("Status {} does not belong to pipeline {}", id, pipeline.id),
                    )
                })?
                .id
        }
        None => {
            repo.first_pipeline_status(pipeline.id)
                .await?
                .ok_or_else(|| {
                    AppError::field_validation("pipeline_id", "Pipeline has no statuses")
                })?
                .id
        }
    };

    let report = parse_leads(
        &data,
        &mappings,
        pipeline.id,
        status_id,
        &file_name,
        lead_source.as_deref(),
    )?;
    let inserted = repo
        .insert_leads(auth.workspace_id, auth.user_id, report.leads)
        .await?;

    record_import(
        started.elapsed().as_secs_f64(),
        inserted as usize,
        report.skipped,
    );
    tracing::info!(
        workspace_id = %auth.workspace_id,
        file_name = %file_name,
        total = report.total_rows,
        imported = inserted,
        skipped = report.skipped,
        "Lead import complete"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ImportResult {
            file_name,
            total_rows: report.total_rows,
            imported_count: inserted as usize,
            skipped: report.skipped,
            errors: report.errors,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_result_uses_camel_case_count_keys() {
        let result = ImportResult {
            file_name: "leads.csv".into(),
            total_rows: 3,
            imported_count: 2,
            skipped: 1,
            errors: vec!["Row 2: missing both first and last name".into()],
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["importedCount"], 2);
        assert_eq!(json["totalRows"], 3);
        assert_eq!(json["fileName"], "leads.csv");
        assert!(json.get("imported").is_none());
    }
}
