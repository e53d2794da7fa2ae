//! API handlers module

pub mod clients;
pub mod communications;
pub mod contacts;
pub mod health;
pub mod import;
pub mod leads;
pub mod opportunities;
pub mod quotes;
pub mod storage;
pub mod telephony;

use policydesk_common::errors::{AppError, Result};
use policydesk_common::pagination::PageMeta;
use serde::Serialize;

/// Standard success envelope: `{ "success": true, "data": ... }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// List envelope with the pagination block flattened alongside the rows
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    #[serde(flatten)]
    pub pagination: PageMeta,
}

impl<T: Serialize> ListResponse<T> {
    pub fn ok(data: Vec<T>, pagination: PageMeta) -> Self {
        Self {
            success: true,
            data,
            pagination,
        }
    }
}

/// Enum-like field check against a fixed value set
pub fn ensure_one_of(field: &'static str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(AppError::field_validation(
            field,
            format!("{} must be one of: {}", field, allowed.join(", ")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_one_of() {
        assert!(ensure_one_of("stage", "intake", &["intake", "quoted"]).is_ok());
        let err = ensure_one_of("stage", "closed", &["intake", "quoted"]).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_list_envelope_flattens_pagination() {
        use policydesk_common::pagination::{PageMeta, PageRequest};

        let req = PageRequest::new(Some(1), Some(20));
        let body = ListResponse::ok(vec![1, 2, 3], PageMeta::new(&req, 3));
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["totalCount"], 3);
        assert_eq!(json["hasNext"], false);
        assert!(json.get("pagination").is_none());
    }
}
