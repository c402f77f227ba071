use crate::error::{MdmvizError, Result};
use crate::metadata::MetadataDocument;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Header carrying the session id on metadata requests
pub const SESSION_HEADER: &str = "IDS-SESSION-ID";

/// Request body for the login endpoint
#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Response body from the login endpoint; only the session id is read
#[derive(Deserialize, Default)]
struct LoginResponse {
    #[serde(rename = "userInfo", default)]
    user_info: Option<UserInfo>,
}

#[derive(Deserialize, Default)]
struct UserInfo {
    #[serde(rename = "sessionId", default)]
    session_id: Option<String>,
}

/// Client for the MDM login and metadata endpoints
///
/// One blocking round trip per call; no retries.
#[derive(Clone)]
pub struct MdmClient {
    client: Client,
}

impl MdmClient {
    /// Create a client whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Log in and return the session id
    ///
    /// # Errors
    ///
    /// `Authentication` on a non-success status or when the response has no
    /// `userInfo.sessionId`; `Http` on transport failures.
    pub async fn login(&self, username: &str, password: &str, login_url: &str) -> Result<String> {
        log::info!("Logging in as {} at {}", username, login_url);

        let response = self
            .client
            .post(login_url)
            .header("Content-Type", "application/json")
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            log::warn!("Login rejected with status {}", status);
            return Err(MdmvizError::Authentication(format!("HTTP {}: {}", status, body)));
        }

        let body: LoginResponse = response.json().await?;
        let session_id = body
            .user_info
            .and_then(|u| u.session_id)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MdmvizError::Authentication("Failed to retrieve session ID.".to_string()))?;

        log::info!("Login successful");
        Ok(session_id)
    }

    /// Download the tenant data model as the server sent it
    ///
    /// # Errors
    ///
    /// `MetadataFetch` on a non-success status; `Http` on transport or decode failures.
    pub async fn fetch_metadata_value(&self, session_id: &str, metadata_url: &str) -> Result<Value> {
        let response = self
            .client
            .get(metadata_url)
            .header(SESSION_HEADER, session_id)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(MdmvizError::MetadataFetch(format!("HTTP {}: {}", status, body)));
        }

        Ok(response.json().await?)
    }

    /// Download and decode the tenant data model
    ///
    /// # Errors
    ///
    /// As [`fetch_metadata_value`](Self::fetch_metadata_value); `Json` when the
    /// document does not match the metadata model.
    pub async fn fetch_metadata(&self, session_id: &str, metadata_url: &str) -> Result<MetadataDocument> {
        let start = Instant::now();

        let raw = self.fetch_metadata_value(session_id, metadata_url).await?;
        let document: MetadataDocument = serde_json::from_value(raw)?;

        log::info!(
            "Metadata loaded: {} entities, {} relationships in {:?}",
            document.business_entities.len(),
            document.relationships.len(),
            start.elapsed()
        );

        Ok(document)
    }
}
