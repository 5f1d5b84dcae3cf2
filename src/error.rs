//! Expected, per-source failures.
//!
//! These are recovered where they happen and rendered inline in the report.
//! Anything else travels as [`anyhow::Error`] and ends the run.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url {0}")]
    InvalidUrl(String),
    #[error("tag name invalid: {0}")]
    InvalidTag(String),
}

impl SourceError {
    /// Returns the HTTP status if the failure was a non-OK response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SourceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
