//! Error bodies returned by the command-management API.

use serde::{Deserialize, Serialize};

/// Body of a non-success API response. Rate-limited responses carry
/// `retry_after` in (fractional) seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub retry_after: f64,
    #[serde(default)]
    pub global: bool,
}
