//! Telephony collaborator (RingCentral-shaped)
//!
//! Every outbound vendor call runs through [`TelephonyClient::authorized_request`]:
//! fetch the user's token from the store, refresh it when stale, attempt
//! the request, and on a 401 refresh once and retry. Two attempts total;
//! a second 401, or a refresh token past its window, clears the stored
//! token and surfaces [`AppError::ReauthorizeRequired`] so the client
//! restarts the OAuth flow.
//!
//! Tokens live only in the database. There is no in-process token cache,
//! so concurrent gateway instances always see the row a refresh just
//! wrote.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TelephonyConfig;
use crate::db::Repository;
use crate::errors::{AppError, Result};

/// Clock skew allowance when judging token expiry
const EXPIRY_SKEW_SECS: i64 = 30;

/// A user's vendor token pair
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn access_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_SKEW_SECS) >= self.access_expires_at
    }

    pub fn refresh_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_SKEW_SECS) >= self.refresh_expires_at
    }
}

/// Persistence seam for vendor tokens
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<TokenRecord>>;
    async fn put(&self, user_id: Uuid, record: TokenRecord) -> Result<()>;
    async fn clear(&self, user_id: Uuid) -> Result<()>;
}

/// Token store backed by the `telephony_tokens` table
pub struct DbTokenStore {
    repo: Repository,
}

impl DbTokenStore {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl TokenStore for DbTokenStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<TokenRecord>> {
        let row = self.repo.find_telephony_token(user_id).await?;
        Ok(row.map(|t| TokenRecord {
            access_token: t.access_token,
            refresh_token: t.refresh_token,
            access_expires_at: t.access_expires_at.with_timezone(&Utc),
            refresh_expires_at: t.refresh_expires_at.with_timezone(&Utc),
        }))
    }

    async fn put(&self, user_id: Uuid, record: TokenRecord) -> Result<()> {
        self.repo
            .save_telephony_token(
                user_id,
                record.access_token,
                record.refresh_token,
                record.access_expires_at,
                record.refresh_expires_at,
            )
            .await?;
        Ok(())
    }

    async fn clear(&self, user_id: Uuid) -> Result<()> {
        self.repo.delete_telephony_token(user_id).await?;
        Ok(())
    }
}

/// Normalize a phone number to E.164. Ten digits get the +1 country code;
/// eleven digits starting with 1 keep it. Anything else is rejected.
pub fn normalize_phone(raw: &str) -> Result<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        10 => Ok(format!("+1{}", digits)),
        11 if digits.starts_with('1') => Ok(format!("+{}", digits)),
        _ => Err(AppError::InvalidFormat {
            message: format!("Phone number is not a valid US number: {}", raw),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    refresh_token_expires_in: i64,
}

#[derive(Debug, Serialize)]
struct PhoneNumber {
    #[serde(rename = "phoneNumber")]
    phone_number: String,
}

#[derive(Debug, Serialize)]
struct RingOutRequest {
    from: PhoneNumber,
    to: PhoneNumber,
    #[serde(rename = "playPrompt")]
    play_prompt: bool,
}

#[derive(Debug, Serialize)]
struct SmsRequest {
    from: PhoneNumber,
    to: Vec<PhoneNumber>,
    text: String,
}

/// Result of placing a ring-out call
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallResult {
    pub id: String,
    #[serde(default)]
    pub status: Option<serde_json::Value>,
}

/// Result of sending an SMS
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmsResult {
    pub id: String,
    #[serde(rename = "messageStatus", default)]
    pub message_status: Option<String>,
}

/// HTTP client for the telephony vendor
#[derive(Clone)]
pub struct TelephonyClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    store: Arc<dyn TokenStore>,
}

impl TelephonyClient {
    pub fn new(config: &TelephonyConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let client_id = config
            .client_id
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "telephony.client_id is not set".to_string(),
            })?;
        let client_secret = config
            .client_secret
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "telephony.client_secret is not set".to_string(),
            })?;

        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            store,
        })
    }

    /// Whether the user holds a usable (present, refreshable) token pair.
    /// Store-only check, no vendor round trip.
    pub async fn is_authenticated(&self, user_id: Uuid) -> Result<bool> {
        match self.store.get(user_id).await? {
            Some(record) => Ok(!record.refresh_expired()),
            None => Ok(false),
        }
    }

    /// Store tokens obtained from the vendor's OAuth callback
    pub async fn store_tokens(
        &self,
        user_id: Uuid,
        access_token: String,
        refresh_token: String,
        expires_in: i64,
        refresh_token_expires_in: i64,
    ) -> Result<()> {
        let now = Utc::now();
        self.store
            .put(
                user_id,
                TokenRecord {
                    access_token,
                    refresh_token,
                    access_expires_at: now + Duration::seconds(expires_in),
                    refresh_expires_at: now + Duration::seconds(refresh_token_expires_in),
                },
            )
            .await
    }

    /// Drop the user's stored tokens
    pub async fn disconnect(&self, user_id: Uuid) -> Result<()> {
        self.store.clear(user_id).await
    }

    /// Place a ring-out call from the user's extension
    pub async fn place_call(&self, user_id: Uuid, from: &str, to: &str) -> Result<CallResult> {
        let body = RingOutRequest {
            from: PhoneNumber {
                phone_number: normalize_phone(from)?,
            },
            to: PhoneNumber {
                phone_number: normalize_phone(to)?,
            },
            play_prompt: false,
        };

        let url = format!(
            "{}/restapi/v1.0/account/~/extension/~/ring-out",
            self.base_url
        );
        let response = self
            .authorized_request(user_id, |token| {
                self.http.post(&url).bearer_auth(token).json(&body)
            })
            .await?;

        metrics::counter!("policydesk_telephony_calls_total").increment(1);
        response.json().await.map_err(Into::into)
    }

    /// Send an SMS from the user's extension
    pub async fn send_sms(
        &self,
        user_id: Uuid,
        from: &str,
        to: &str,
        text: &str,
    ) -> Result<SmsResult> {
        if text.trim().is_empty() {
            return Err(AppError::validation("SMS text must not be empty"));
        }

        let body = SmsRequest {
            from: PhoneNumber {
                phone_number: normalize_phone(from)?,
            },
            to: vec![PhoneNumber {
                phone_number: normalize_phone(to)?,
            }],
            text: text.to_string(),
        };

        let url = format!("{}/restapi/v1.0/account/~/extension/~/sms", self.base_url);
        let response = self
            .authorized_request(user_id, |token| {
                self.http.post(&url).bearer_auth(token).json(&body)
            })
            .await?;

        metrics::counter!("policydesk_telephony_sms_total").increment(1);
        response.json().await.map_err(Into::into)
    }

    /// Cancel an in-progress ring-out call
    pub async fn end_call(&self, user_id: Uuid, call_id: &str) -> Result<()> {
        let url = format!(
            "{}/restapi/v1.0/account/~/extension/~/ring-out/{}",
            self.base_url, call_id
        );
        self.authorized_request(user_id, |token| self.http.delete(&url).bearer_auth(token))
            .await?;
        Ok(())
    }

    /// Run a vendor request with a valid access token. Refreshes a stale
    /// token before the first attempt; a 401 mid-flight triggers exactly
    /// one refresh-and-retry.
    async fn authorized_request<F>(&self, user_id: Uuid, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&str) -> reqwest::RequestBuilder,
    {
        let mut record = self.current_token(user_id).await?;

        for attempt in 0..2 {
            let response = build(&record.access_token).send().await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return check_vendor_status(response).await;
            }

            if attempt == 0 {
                tracing::debug!(%user_id, "Vendor rejected access token, refreshing");
                record = self.refresh(user_id, &record).await?;
            }
        }

        // Fresh token still rejected: the grant itself is dead
        self.store.clear(user_id).await?;
        Err(AppError::ReauthorizeRequired)
    }

    async fn current_token(&self, user_id: Uuid) -> Result<TokenRecord> {
        let record = self
            .store
            .get(user_id)
            .await?
            .ok_or(AppError::ReauthorizeRequired)?;

        if record.refresh_expired() {
            self.store.clear(user_id).await?;
            return Err(AppError::ReauthorizeRequired);
        }
        if record.access_expired() {
            return self.refresh(user_id, &record).await;
        }
        Ok(record)
    }

    async fn refresh(&self, user_id: Uuid, record: &TokenRecord) -> Result<TokenRecord> {
        let url = format!("{}/restapi/oauth/token", self.base_url);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", record.refresh_token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(%user_id, status = status.as_u16(), "Token refresh rejected");
            metrics::counter!("policydesk_telephony_reauth_total").increment(1);
            self.store.clear(user_id).await?;
            return Err(AppError::ReauthorizeRequired);
        }

        let tokens: TokenResponse = response.json().await?;
        let now = Utc::now();
        let refreshed = TokenRecord {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: now + Duration::seconds(tokens.expires_in),
            refresh_expires_at: now + Duration::seconds(tokens.refresh_token_expires_in),
        };
        self.store.put(user_id, refreshed.clone()).await?;
        Ok(refreshed)
    }
}

/// Map a non-401 vendor response to our error taxonomy
async fn check_vendor_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable vendor body>".to_string());
    let truncated: String = message.chars().take(500).collect();

    Err(AppError::Upstream {
        status: status.as_u16(),
        message: truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// In-memory store for exercising the client without a database
    #[derive(Default)]
    struct MemoryTokenStore {
        tokens: Mutex<HashMap<Uuid, TokenRecord>>,
    }

    #[async_trait]
    impl TokenStore for MemoryTokenStore {
        async fn get(&self, user_id: Uuid) -> Result<Option<TokenRecord>> {
            Ok(self.tokens.lock().await.get(&user_id).cloned())
        }

        async fn put(&self, user_id: Uuid, record: TokenRecord) -> Result<()> {
            self.tokens.lock().await.insert(user_id, record);
            Ok(())
        }

        async fn clear(&self, user_id: Uuid) -> Result<()> {
            self.tokens.lock().await.remove(&user_id);
            Ok(())
        }
    }

    fn client_with(store: Arc<dyn TokenStore>) -> TelephonyClient {
        TelephonyClient::new(
            &TelephonyConfig {
                base_url: "https://platform.ringcentral.example".into(),
                client_id: Some("cid".into()),
                client_secret: Some("secret".into()),
                timeout_secs: 5,
            },
            store,
        )
        .unwrap()
    }

    fn live_record() -> TokenRecord {
        let now = Utc::now();
        TokenRecord {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            access_expires_at: now + Duration::hours(1),
            refresh_expires_at: now + Duration::days(7),
        }
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(555) 123-4567").unwrap(), "+15551234567");
        assert_eq!(normalize_phone("15551234567").unwrap(), "+15551234567");
        assert_eq!(normalize_phone("+1 555 123 4567").unwrap(), "+15551234567");
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("+44 20 7946 0958").is_err());
    }

    #[test]
    fn test_token_expiry_skew() {
        let mut record = live_record();
        assert!(!record.access_expired());
        assert!(!record.refresh_expired());

        // Inside the skew window counts as expired
        record.access_expires_at = Utc::now() + Duration::seconds(EXPIRY_SKEW_SECS - 5);
        assert!(record.access_expired());

        record.refresh_expires_at = Utc::now() - Duration::seconds(1);
        assert!(record.refresh_expired());
    }

    #[tokio::test]
    async fn test_is_authenticated_without_tokens() {
        let store = Arc::new(MemoryTokenStore::default());
        let client = client_with(store);
        assert!(!client.is_authenticated(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_authenticated_with_live_tokens() {
        let store = Arc::new(MemoryTokenStore::default());
        let user = Uuid::new_v4();
        store.put(user, live_record()).await.unwrap();

        let client = client_with(store);
        assert!(client.is_authenticated(user).await.unwrap());
    }

    #[tokio::test]
    async fn test_dead_refresh_token_requires_reauth() {
        let store = Arc::new(MemoryTokenStore::default());
        let user = Uuid::new_v4();
        let mut record = live_record();
        record.refresh_expires_at = Utc::now() - Duration::hours(1);
        store.put(user, record).await.unwrap();

        let client = client_with(store.clone());
        assert!(!client.is_authenticated(user).await.unwrap());

        let err = client.current_token(user).await.unwrap_err();
        assert!(matches!(err, AppError::ReauthorizeRequired));
        // The dead pair is also purged from the store
        assert!(store.get(user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_token_requires_reauth() {
        let store = Arc::new(MemoryTokenStore::default());
        let client = client_with(store);
        let err = client.current_token(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::ReauthorizeRequired));
    }

    #[tokio::test]
    async fn test_empty_sms_rejected_before_any_io() {
        let store = Arc::new(MemoryTokenStore::default());
        let client = client_with(store);
        let err = client
            .send_sms(Uuid::new_v4(), "5551234567", "5559876543", "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
