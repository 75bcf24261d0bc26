use super::ProviderId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse failure category used for grouping statuses in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProviderUnavailable,
    EmptyResult,
    ParseError,
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ProviderUnavailable => "provider unavailable",
            ErrorKind::EmptyResult => "empty result",
            ErrorKind::ParseError => "parse error",
            ErrorKind::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Outcome of one instrument's acquisition attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchStatus {
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl FetchStatus {
    pub fn succeeded(name: impl Into<String>, provider: ProviderId) -> Self {
        Self {
            name: name.into(),
            success: true,
            error: None,
            provider: Some(provider),
            error_kind: None,
        }
    }

    pub fn failed(name: impl Into<String>, kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: false,
            error: Some(error.into()),
            provider: None,
            error_kind: Some(kind),
        }
    }
}
