//! Error types for Slashhook.

use crate::Scope;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failures of the outbound command-management client.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("forbidden - missing access")]
    Forbidden,

    #[error("unauthorized")]
    Unauthorized,

    #[error("max retries reached after {attempts} rate-limited attempts")]
    MaxRetriesExceeded { attempts: u32 },

    #[error("already exists")]
    AlreadyExists,

    #[error("{status} - {body}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

impl ApiError {
    /// Build a `Status` error from a raw response.
    pub fn status(status: u16, body: &[u8]) -> Self {
        Self::Status {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }
}

/// Terminal failures of the interaction dispatcher.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid interaction type: {0}")]
    InvalidInteractionType(i64),

    #[error("application command interaction has no command data")]
    MissingCommandData,

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("interaction response was empty")]
    NilInteractionResponse,

    #[error("took too long: no response within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("handler failed: {0}")]
    Handler(anyhow::Error),

    #[error("handler panicked: {0}")]
    HandlerPanicked(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DispatchError {
    /// HTTP status the webhook answers with for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::InvalidInteractionType(_) | Self::MissingCommandData => 400,
            Self::NotImplemented(_) => 501,
            Self::NilInteractionResponse
            | Self::DeadlineExceeded(_)
            | Self::Handler(_)
            | Self::HandlerPanicked(_)
            | Self::Json(_) => 500,
        }
    }
}

/// Invalid command registrations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid command name {0:?}: must match ^[\\w-]{{1,32}}$")]
    InvalidName(String),
}

/// Invalid credentials supplied by the embedding process.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("the following credentials are blank: {}", .0.join(", "))]
    Blank(Vec<&'static str>),
}

/// Reconciler step that produced a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    List,
    Delete,
    Create,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            SyncPhase::List => "list",
            SyncPhase::Delete => "delete",
            SyncPhase::Create => "create",
        };
        f.write_str(phase)
    }
}

/// One failed sub-operation of a reconciliation pass.
#[derive(Error, Debug)]
#[error("{phase} failed for scope {scope}{}: {source}", command_suffix(.command))]
pub struct SyncError {
    pub phase: SyncPhase,
    pub scope: Scope,
    pub command: Option<String>,
    #[source]
    pub source: ApiError,
}

fn command_suffix(command: &Option<String>) -> String {
    match command {
        Some(name) => format!(", command {}", name),
        None => String::new(),
    }
}
