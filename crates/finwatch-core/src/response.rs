//! Invocation responses returned to the scheduler.

use serde::{Deserialize, Serialize};

/// Response body handed back to the function runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    /// HTTP-style status: 200 on success, 500 on failure.
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// JSON-encoded summary or error string.
    pub body: String,
}

impl InvocationResponse {
    /// A 200 response whose body is `payload` encoded as JSON.
    pub fn ok<T: Serialize>(payload: &T) -> Self {
        Self::encoded(200, payload)
    }

    /// A 500 response whose body is the JSON-encoded error message.
    pub fn error(message: &str) -> Self {
        Self::encoded(500, &message)
    }

    /// Whether the status code signals success.
    pub const fn is_success(&self) -> bool {
        self.status_code < 400
    }

    /// Decodes the body back into a JSON value.
    pub fn body_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.body)
    }

    fn encoded<T: Serialize + ?Sized>(status_code: u16, payload: &T) -> Self {
        match serde_json::to_string(payload) {
            Ok(body) => Self { status_code, body },
            Err(e) => Self { status_code: 500, body: format!("\"failed to encode response: {e}\"") },
        }
    }
}
