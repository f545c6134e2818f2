//! Error types for the scanhub library.
//!
//! Plugin failures are values, not panics: every error a plugin call can
//! produce is a [`PluginError`] that the orchestrator records against the
//! plugin and moves on.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// A failure talking to a single scanner plugin.
///
/// Serialized with a `kind` tag so that API consumers can tell the
/// failure modes apart.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PluginError {
    /// The plugin did not answer before the deadline.
    #[error("plugin timed out after {elapsed_ms} ms")]
    Timeout {
        /// How long the call ran before it was abandoned.
        elapsed_ms: u64,
    },

    /// The plugin could not be reached.
    #[error("plugin unreachable: {reason}")]
    Unreachable {
        /// Why the connection failed.
        reason: String,
    },

    /// The plugin answered with something that is not a valid response.
    #[error("malformed plugin response: {details}")]
    MalformedResponse {
        /// What was wrong with the response.
        details: String,
    },

    /// The plugin reported an error of its own.
    #[error("plugin reported error: {message}")]
    PluginReportedError {
        /// The plugin's error message.
        message: String,
    },
}

impl PluginError {
    /// Creates a `Timeout` error.
    pub fn timeout(elapsed: Duration) -> Self {
        Self::Timeout {
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Creates an `Unreachable` error.
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
        }
    }

    /// Creates a `MalformedResponse` error.
    pub fn malformed(details: impl Into<String>) -> Self {
        Self::MalformedResponse {
            details: details.into(),
        }
    }

    /// Creates a `PluginReportedError` error.
    pub fn reported(message: impl Into<String>) -> Self {
        Self::PluginReportedError {
            message: message.into(),
        }
    }

    /// Returns `true` if the call may succeed when retried.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }

    /// Returns `true` for `Timeout`.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns a short, stable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Unreachable { .. } => "unreachable",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::PluginReportedError { .. } => "plugin_reported_error",
        }
    }
}

/// Error type for registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No plugin with that name is registered.
    #[error("plugin not found: {name}")]
    NotFound {
        /// The name that was looked up.
        name: String,
    },
}

/// Error type for orchestrator operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// No scan job with that id exists.
    #[error("unknown scan job: {id}")]
    UnknownScanJob {
        /// The id that was looked up.
        id: Uuid,
    },

    /// The scan request was rejected before any dispatch.
    #[error("invalid scan request: {reason}")]
    InvalidRequest {
        /// Why the request was rejected.
        reason: String,
    },
}

impl OrchestratorError {
    /// Creates an `InvalidRequest` error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }
}

/// A specialized `Result` type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// A specialized `Result` type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
