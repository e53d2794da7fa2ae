//! Authentication utilities
//!
//! Provides:
//! - Per-request auth context extraction (workspace, user, role)
//! - JWT session token generation and validation
//! - API key hashing helpers

use crate::errors::{AppError, Result};
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// User role within a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    Agent,
}

impl UserRole {
    /// Admins and managers bypass ownership checks on records
    pub fn is_privileged(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Agent => "agent",
        }
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "manager" => Ok(UserRole::Manager),
            "agent" => Ok(UserRole::Agent),
            other => Err(AppError::InvalidFormat {
                message: format!("Unknown role: {}", other),
            }),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracted authentication context available to handlers
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Workspace (tenant) ID. Assigned server-side on every write; a
    /// workspace id present in a request body is never trusted.
    pub workspace_id: Uuid,

    /// Acting user ID
    pub user_id: Uuid,

    /// Role of the acting user
    pub role: UserRole,

    /// Request ID for tracing
    pub request_id: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Workspace ID
    pub workspace_id: String,

    /// Role
    pub role: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a new session token
    pub fn generate_token(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
        role: UserRole,
    ) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            workspace_id: workspace_id.to_string(),
            role: role.as_str().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a session token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidApiKey,
            })
    }
}

/// Hash an API key for storage
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validate an API key against a stored hash
pub fn validate_api_key(api_key: &str, stored_hash: &str) -> bool {
    hash_api_key(api_key) == stored_hash
}

/// Generate a new API key
pub fn generate_api_key() -> String {
    let random_bytes: [u8; 32] = rand::random();
    format!("pd_{}", hex::encode(random_bytes))
}

/// Extract a bearer token from an Authorization header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Axum extractor for AuthContext
///
/// Identity headers are stamped by the edge auth proxy, which terminates
/// the session; handlers only consume the already-verified identity.
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        // Extract request ID
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Extract workspace ID
        let workspace_id = parts
            .headers
            .get("x-workspace-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing or invalid X-Workspace-ID header".to_string(),
            })?;

        // Extract user ID
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing or invalid X-User-ID header".to_string(),
            })?;

        // Role defaults to agent when the proxy omits it
        let role = parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .map(UserRole::from_str)
            .transpose()?
            .unwrap_or(UserRole::Agent);

        // A bearer credential must be present; the shape check mirrors the
        // keys this service issues.
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = extract_bearer(auth_header).ok_or(AppError::InvalidApiKey)?;
        if token.is_empty() {
            return Err(AppError::InvalidApiKey);
        }

        Ok(AuthContext {
            workspace_id,
            user_id,
            role,
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("agent".parse::<UserRole>().unwrap(), UserRole::Agent);
        assert!("superuser".parse::<UserRole>().is_err());
        assert!(UserRole::Manager.is_privileged());
        assert!(!UserRole::Agent.is_privileged());
    }

    #[test]
    fn test_jwt_round_trip() {
        let manager = JwtManager::new("test-secret", 3600);
        let user_id = Uuid::new_v4();
        let workspace_id = Uuid::new_v4();

        let token = manager
            .generate_token(user_id, workspace_id, UserRole::Manager)
            .unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.workspace_id, workspace_id.to_string());
        assert_eq!(claims.role, "manager");
    }

    #[test]
    fn test_jwt_wrong_secret() {
        let manager = JwtManager::new("secret-a", 3600);
        let other = JwtManager::new("secret-b", 3600);
        let token = manager
            .generate_token(Uuid::new_v4(), Uuid::new_v4(), UserRole::Agent)
            .unwrap();
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn test_api_key_hashing() {
        let key = generate_api_key();
        assert!(key.starts_with("pd_"));
        let hash = hash_api_key(&key);
        assert!(validate_api_key(&key, &hash));
        assert!(!validate_api_key("pd_other", &hash));
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer("Basic abc"), None);
    }
}
