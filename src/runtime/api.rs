//! API-facing response envelope and event entry points.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{EventRouter, GateError, JobRunner, LedgerStore, Notifier, Response};

/// Decoded form of the envelope body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBody {
    /// Status code, repeated from the envelope.
    pub status: u16,
    /// Message.
    #[serde(rename = "errMsg")]
    pub err_msg: String,
}

/// HTTP-style response envelope returned to the front door.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    /// Status code.
    pub status_code: u16,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
    /// JSON-encoded [`ResponseBody`].
    pub body: String,
}

impl ApiResponse {
    /// Decode the body.
    ///
    /// # Errors
    ///
    /// [`GateError::MalformedRequest`] if the body is not a [`ResponseBody`].
    pub fn decoded_body(&self) -> Result<ResponseBody, GateError> {
        serde_json::from_str(&self.body).map_err(|e| GateError::MalformedRequest(e.to_string()))
    }
}

impl From<Response> for ApiResponse {
    fn from(resp: Response) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        let body = serde_json::json!({
            "status": resp.status_code,
            "errMsg": resp.message,
        })
        .to_string();
        Self {
            status_code: resp.status_code,
            headers,
            body,
        }
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Route an already-decoded JSON event.
pub async fn handle_json_event<R, L, N>(router: &EventRouter<R, L, N>, event: &Value) -> ApiResponse
where
    R: JobRunner,
    L: LedgerStore,
    N: Notifier,
{
    router.handle_value(event).await.into()
}

/// Route a raw JSON event string.
pub async fn handle_raw_event<R, L, N>(router: &EventRouter<R, L, N>, raw: &str) -> ApiResponse
where
    R: JobRunner,
    L: LedgerStore,
    N: Notifier,
{
    match serde_json::from_str::<Value>(raw) {
        Ok(event) => handle_json_event(router, &event).await,
        Err(e) => {
            let err = GateError::MalformedRequest(format!("event: {e}"));
            tracing::warn!(error = %err, "couldn't parse raw event");
            Response::from_error(&err).into()
        }
    }
}

/// Return a health payload.
#[must_use]
pub const fn health() -> Health {
    Health { ok: true }
}
