use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::runtime::HttpResponse;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The function ran and threw; the message is meant for the visitor.
    #[error("{message}")]
    Function {
        message: String,
        data: Option<Value>,
    },
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Envelope {
    Success {
        value: Value,
    },
    Error {
        #[serde(rename = "errorMessage", default)]
        error_message: String,
        #[serde(rename = "errorData", default)]
        error_data: Option<Value>,
    },
}

/// Shape returned by the `validate` functions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidationResponse {
    pub valid: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

fn snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    text.chars().take(200).collect()
}

/// Decodes a function call response into its return value.
pub fn parse_function_response<T: DeserializeOwned>(resp: &HttpResponse) -> Result<T, BackendError> {
    let envelope: Envelope = match serde_json::from_slice(&resp.body) {
        Ok(envelope) => envelope,
        Err(_) if !resp.is_success() => {
            return Err(BackendError::Status {
                status: resp.status,
                body: snippet(&resp.body),
            });
        }
        Err(e) => return Err(BackendError::Decode(e)),
    };

    match envelope {
        Envelope::Success { value } => Ok(serde_json::from_value(value)?),
        Envelope::Error {
            error_message,
            error_data,
        } => {
            // Application errors carry a readable message in their data.
            let message = error_data
                .as_ref()
                .and_then(|d| d.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(error_message);
            Err(BackendError::Function {
                message,
                data: error_data,
            })
        }
    }
}
