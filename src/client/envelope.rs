//! `{ data, error }` result shape returned by every shim terminal.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Network(String),
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    Rejected(String),
}

impl From<AppError> for ClientError {
    fn from(e: AppError) -> Self {
        ClientError::Rejected(e.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub message: String,
}

impl std::fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EnvelopeError {}

/// Exactly one of `data` / `error` carries information; `data` may also be null on success.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub error: Option<EnvelopeError>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Envelope {
            data: Some(data),
            error: None,
        }
    }

    /// Success with nothing to return.
    pub fn empty() -> Self {
        Envelope { data: None, error: None }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Envelope {
            data: None,
            error: Some(EnvelopeError {
                message: message.into(),
            }),
        }
    }

    pub fn from_result(r: Result<T, ClientError>) -> Self {
        match r {
            Ok(v) => Envelope::ok(v),
            Err(e) => Envelope::err(e.to_string()),
        }
    }

    pub fn from_optional(r: Result<Option<T>, ClientError>) -> Self {
        match r {
            Ok(Some(v)) => Envelope::ok(v),
            Ok(None) => Envelope::empty(),
            Err(e) => Envelope::err(e.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Option<T>, EnvelopeError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.data),
        }
    }
}
