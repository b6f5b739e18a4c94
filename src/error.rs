// Copyright (C) 2017-2018 Red Hat, Inc.
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use std::fmt;
use std::result;

use serde::Deserialize;

/// Errors raised while talking to a storage array.
///
/// Every variant carries a human readable message, already prefixed with
/// the operation and endpoint when the failure happened on the wire.
#[derive(Debug, thiserror::Error)]
pub enum ArrayError {
    #[error("{0}")]
    LibBug(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    TimeOut(String),
    #[error("{0}")]
    NetworkError(String),
    /// HTTP 503 from the array. Retried by the session manager and the
    /// client until the retry budget is spent.
    #[error("{0}")]
    ServiceUnavailable(String),
    /// Non-2xx reply that was not retried, or 503 after the retry budget.
    #[error("HTTP {status}: {message}")]
    RequestFailed { status: u16, message: String },
    /// Login handshake rejected by the array.
    #[error("{0}")]
    AuthFailed(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    TransportSerialization(String),
    /// The request was accepted but its asynchronous job ended in
    /// `Failed`.
    #[error("{0}")]
    JobFailed(String),
}

impl ArrayError {
    /// Short description of the error class, in the style of
    /// `std::error::Error::description()`.
    pub fn kind(&self) -> &'static str {
        match *self {
            ArrayError::LibBug(_) => "Library bug",
            ArrayError::InvalidArgument(_) => "Invalid argument",
            ArrayError::TimeOut(_) => "Timeout",
            ArrayError::NetworkError(_) => "Network error",
            ArrayError::ServiceUnavailable(_) => "Service unavailable",
            ArrayError::RequestFailed { .. } => "Request failed",
            ArrayError::AuthFailed(_) => "Authentication failed",
            ArrayError::NotFound(_) => "Object not found",
            ArrayError::TransportSerialization(_) => {
                "Incorrect transport serialization"
            }
            ArrayError::JobFailed(_) => "Job failed",
        }
    }

    /// HTTP status of the reply that caused this error, if any.
    pub fn status(&self) -> Option<u16> {
        match *self {
            ArrayError::RequestFailed { status, .. } => Some(status),
            ArrayError::ServiceUnavailable(_) => Some(HTTP_SERVICE_UNAVAILABLE),
            ArrayError::NotFound(_) => Some(HTTP_NOT_FOUND),
            _ => None,
        }
    }

    /// Prefix the message with `ctx`, keeping the variant.
    pub(crate) fn context(self, ctx: &str) -> ArrayError {
        match self {
            ArrayError::LibBug(m) => ArrayError::LibBug(format!("{}: {}", ctx, m)),
            ArrayError::InvalidArgument(m) => {
                ArrayError::InvalidArgument(format!("{}: {}", ctx, m))
            }
            ArrayError::TimeOut(m) => ArrayError::TimeOut(format!("{}: {}", ctx, m)),
            ArrayError::NetworkError(m) => {
                ArrayError::NetworkError(format!("{}: {}", ctx, m))
            }
            ArrayError::ServiceUnavailable(m) => {
                ArrayError::ServiceUnavailable(format!("{}: {}", ctx, m))
            }
            ArrayError::RequestFailed { status, message } => ArrayError::RequestFailed {
                status,
                message: format!("{}: {}", ctx, message),
            },
            ArrayError::AuthFailed(m) => ArrayError::AuthFailed(format!("{}: {}", ctx, m)),
            ArrayError::NotFound(m) => ArrayError::NotFound(format!("{}: {}", ctx, m)),
            ArrayError::TransportSerialization(m) => {
                ArrayError::TransportSerialization(format!("{}: {}", ctx, m))
            }
            ArrayError::JobFailed(m) => ArrayError::JobFailed(format!("{}: {}", ctx, m)),
        }
    }
}

pub type Result<T> = result::Result<T, ArrayError>;

impl From<serde_json::Error> for ArrayError {
    fn from(e: serde_json::Error) -> Self {
        ArrayError::TransportSerialization(format!(
            "Failed to convert REST message to array object: {}",
            e
        ))
    }
}

impl From<url::ParseError> for ArrayError {
    fn from(e: url::ParseError) -> Self {
        ArrayError::InvalidArgument(format!("Failed to parse URL: {}", e))
    }
}

impl From<reqwest::Error> for ArrayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ArrayError::TimeOut(format!("Request timed out: {}", e))
        } else if e.is_decode() {
            ArrayError::TransportSerialization(format!(
                "Failed to decode reply: {}",
                e
            ))
        } else {
            ArrayError::NetworkError(format!("{}", e))
        }
    }
}

impl From<std::io::Error> for ArrayError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::TimedOut {
            ArrayError::TimeOut(format!("{}", e))
        } else {
            ArrayError::NetworkError(format!("{}", e))
        }
    }
}

impl From<regex::Error> for ArrayError {
    fn from(e: regex::Error) -> Self {
        ArrayError::LibBug(format!("Regex error: {}", e))
    }
}

pub(crate) const HTTP_UNAUTHORIZED: u16 = 401;
pub(crate) const HTTP_NOT_FOUND: u16 = 404;
pub(crate) const HTTP_SERVICE_UNAVAILABLE: u16 = 503;

/// Error body returned by the management API on non-2xx replies.
///
/// Older firmware reports `errorMessage` instead of `message`.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiErrorBody {
    pub(crate) message: Option<String>,
    pub(crate) error_message: Option<String>,
    pub(crate) cause: Option<String>,
    pub(crate) solution: Option<String>,
    pub(crate) message_id: Option<String>,
}

impl ApiErrorBody {
    /// Parse `raw` as a structured error body. `None` when it is not JSON
    /// or carries no message at all.
    pub(crate) fn parse(raw: &str) -> Option<ApiErrorBody> {
        let body: ApiErrorBody = serde_json::from_str(raw).ok()?;
        if body.message.is_none() && body.error_message.is_none() {
            return None;
        }
        Some(body)
    }
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = self
            .message
            .as_deref()
            .or(self.error_message.as_deref())
            .unwrap_or_default();
        if let Some(ref id) = self.message_id {
            write!(f, "{} {}", id, msg)?;
        } else {
            write!(f, "{}", msg)?;
        }
        if let Some(ref cause) = self.cause {
            write!(f, " {}", cause)?;
        }
        if let Some(ref solution) = self.solution {
            write!(f, " {}", solution)?;
        }
        Ok(())
    }
}

/// Reply status plus decoded error text, before it is classified.
pub(crate) struct HttpFailure {
    pub(crate) status: u16,
    pub(crate) message: String,
}

impl HttpFailure {
    /// Use the structured message when the body has one, the raw body
    /// otherwise.
    pub(crate) fn new(status: u16, raw_body: &str) -> HttpFailure {
        let message = match ApiErrorBody::parse(raw_body) {
            Some(b) => format!("{}", b),
            None => raw_body.to_string(),
        };
        HttpFailure { status, message }
    }
}

impl From<HttpFailure> for ArrayError {
    fn from(e: HttpFailure) -> Self {
        match e.status {
            HTTP_SERVICE_UNAVAILABLE => ArrayError::ServiceUnavailable(e.message),
            HTTP_NOT_FOUND => ArrayError::NotFound(e.message),
            status => ArrayError::RequestFailed {
                status,
                message: e.message,
            },
        }
    }
}
