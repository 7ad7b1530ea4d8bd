//! Roster wire format.
//!
//! One JSON object per line, UTF-8, newline-terminated. Requests carry an
//! opaque correlation `id`, a `method` and an object of `params`. Every
//! response echoes `id` and `method` and carries exactly one of `result` or
//! `error`.
//!
//! ```text
//! -> {"id": "1", "method": "get_user", "params": {"id": "U001"}}
//! <- {"id": "1", "method": "get_user", "result": {"user": {...}}}
//! <- {"id": "1", "method": "get_user", "error": "validation error: ..."}
//! ```

use crate::core::error::RosterError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Standard request envelope
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Request {
    /// Opaque correlation token, echoed verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Operation name
    pub method: String,
    /// Operation arguments
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// What could be salvaged from a line that did not decode as a request.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeFailure {
    pub id: Option<Value>,
    pub method: Option<String>,
    /// Display text of the underlying [`RosterError::DecodeError`].
    pub error: String,
}

impl DecodeFailure {
    fn new(id: Option<Value>, method: Option<String>, detail: impl Into<String>) -> Self {
        Self {
            id,
            method,
            error: RosterError::DecodeError(detail.into()).to_string(),
        }
    }

    pub fn into_response(self) -> Response {
        Response {
            id: self.id,
            method: self.method,
            outcome: Outcome::Error(self.error),
        }
    }
}

impl Request {
    pub fn new(id: impl Into<Value>, method: &str, params: Map<String, Value>) -> Self {
        Self {
            id: Some(id.into()),
            method: method.to_string(),
            params,
        }
    }

    /// Decode one line. On failure, `id` and `method` are carried over
    /// whenever the line was at least a JSON object holding them.
    pub fn decode(line: &str) -> Result<Self, DecodeFailure> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| DecodeFailure::new(None, None, format!("invalid json: {e}")))?;

        let Value::Object(mut obj) = value else {
            return Err(DecodeFailure::new(
                None,
                None,
                "message must be a JSON object",
            ));
        };

        let id = obj.remove("id");
        let method = match obj.remove("method") {
            Some(Value::String(m)) => m,
            Some(_) => {
                return Err(DecodeFailure::new(id, None, "method must be a string"));
            }
            None => return Err(DecodeFailure::new(id, None, "missing method")),
        };

        let params = match obj.remove("params") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(p)) => p,
            Some(_) => {
                return Err(DecodeFailure::new(
                    id,
                    Some(method),
                    "params must be an object",
                ));
            }
        };

        Ok(Self { id, method, params })
    }

    pub fn encode_line(&self) -> Result<String, RosterError> {
        Ok(format!("{}\n", serde_json::to_string(self)?))
    }
}

/// Exactly one of `result` / `error`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Result(Value),
    Error(String),
}

/// Standard response envelope
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    pub fn success(request: &Request, result: Value) -> Self {
        Self {
            id: request.id.clone(),
            method: Some(request.method.clone()),
            outcome: Outcome::Result(result),
        }
    }

    pub fn failure(request: &Request, err: &RosterError) -> Self {
        Self {
            id: request.id.clone(),
            method: Some(request.method.clone()),
            outcome: Outcome::Error(err.to_string()),
        }
    }

    /// Error response for input that carried no usable envelope at all.
    pub fn undecodable(detail: impl Into<String>) -> Self {
        DecodeFailure::new(None, None, detail).into_response()
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(v) => Some(v),
            Outcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Result(_) => None,
            Outcome::Error(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<Value, String> {
        match self.outcome {
            Outcome::Result(v) => Ok(v),
            Outcome::Error(e) => Err(e),
        }
    }

    pub fn decode(line: &str) -> Result<Self, RosterError> {
        Ok(serde_json::from_str(line.trim_end())?)
    }

    pub fn encode_line(&self) -> Result<String, RosterError> {
        Ok(format!("{}\n", serde_json::to_string(self)?))
    }
}
