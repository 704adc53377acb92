//! The remote response-store seam.
//!
//! [`RemoteStore`] is the trait the engine syncs through; [`HttpRemoteStore`]
//! is the production implementation speaking the questionnaire API. Tests
//! substitute their own implementation to observe and fail pushes.

use async_trait::async_trait;
use srs_core::questionnaire::QuestionnaireState;

/// Per-request timeout for remote calls.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Result of reading the remote store.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteFetch {
    /// The store holds a state for this pairing.
    Found(QuestionnaireState),
    /// The store is reachable but has no record yet.
    Missing,
    /// No backing store is configured server-side; the client should
    /// operate on local storage alone (and still count as online).
    Fallback,
}

/// Result of a successful push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Stored,
    Fallback,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("server answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unreadable server response: {0}")]
    Decode(String),
}

/// Network access to the questionnaire response store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read the stored state for a pairing.
    async fn fetch(
        &self,
        client_id: &str,
        questionnaire_id: &str,
    ) -> Result<RemoteFetch, RemoteError>;

    /// Upsert a full state payload for a pairing.
    async fn push(
        &self,
        client_id: &str,
        questionnaire_id: &str,
        state: &QuestionnaireState,
    ) -> Result<PushOutcome, RemoteError>;
}

#[async_trait]
impl<T: RemoteStore + ?Sized> RemoteStore for std::sync::Arc<T> {
    async fn fetch(
        &self,
        client_id: &str,
        questionnaire_id: &str,
    ) -> Result<RemoteFetch, RemoteError> {
        (**self).fetch(client_id, questionnaire_id).await
    }

    async fn push(
        &self,
        client_id: &str,
        questionnaire_id: &str,
        state: &QuestionnaireState,
    ) -> Result<PushOutcome, RemoteError> {
        (**self).push(client_id, questionnaire_id, state).await
    }
}

/// HTTP implementation backed by the questionnaire API.
pub struct HttpRemoteStore {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRemoteStore {
    /// Build a client for the API at `base_url` (no trailing slash needed).
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn response_url(&self, client_id: &str) -> String {
        format!("{}/api/v1/questionnaire/{client_id}", self.base_url)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch(
        &self,
        client_id: &str,
        questionnaire_id: &str,
    ) -> Result<RemoteFetch, RemoteError> {
        let response = self
            .http
            .get(self.response_url(client_id))
            .query(&[("questionnaireId", questionnaire_id)])
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;

        if body.get("fallback").and_then(|v| v.as_bool()) == Some(true) {
            return Ok(RemoteFetch::Fallback);
        }

        match body.get("data") {
            None | Some(serde_json::Value::Null) => Ok(RemoteFetch::Missing),
            Some(data) => serde_json::from_value(data.clone())
                .map(RemoteFetch::Found)
                .map_err(|e| RemoteError::Decode(e.to_string())),
        }
    }

    async fn push(
        &self,
        client_id: &str,
        questionnaire_id: &str,
        state: &QuestionnaireState,
    ) -> Result<PushOutcome, RemoteError> {
        // The wire payload is the flattened state plus the questionnaire id.
        let mut payload = serde_json::to_value(state)
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        payload["questionnaireId"] = serde_json::Value::String(questionnaire_id.to_string());

        let response = self
            .http
            .post(self.response_url(client_id))
            .json(&payload)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;

        if body.get("fallback").and_then(|v| v.as_bool()) == Some(true) {
            Ok(PushOutcome::Fallback)
        } else {
            Ok(PushOutcome::Stored)
        }
    }
}
