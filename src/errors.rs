//! Error handling for the crypto version gate
//!
//! Parse failures live next to their parsers (`VersionParseError`,
//! `BuildDateParseError`); this module holds the gate-level error that the
//! host sees, which tags every failure with the check it belongs to and the
//! value that caused it.

use crate::build_date::BuildDateParseError;
use crate::version::VersionParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which of the two startup checks produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Version,
    BuildDate,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::Version => f.write_str("version"),
            CheckKind::BuildDate => f.write_str("build date"),
        }
    }
}

/// Main error type for the gate
///
/// Every variant is fatal to startup. There is no retry path: a host that
/// receives one of these refuses to serve.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration loading failed: {source}")]
    ConfigLoad {
        #[source]
        source: figment::Error,
    },

    #[error("crypto library minimum version {configured:?} is invalid: {source}")]
    InvalidMinimumVersion {
        configured: String,
        #[source]
        source: VersionParseError,
    },

    #[error("crypto library minimum build date {configured:?} is invalid: {source}")]
    InvalidMinimumBuildDate {
        configured: String,
        #[source]
        source: BuildDateParseError,
    },

    #[error(
        "crypto runtime build date {reported:?} is unparsable (checking against {configured:?}): {source}"
    )]
    InvalidRuntimeBuildDate {
        configured: String,
        reported: String,
        #[source]
        source: BuildDateParseError,
    },

    #[error("crypto runtime too old; asked for version {configured}, got: {reported}")]
    VersionBelowMinimum { configured: String, reported: String },

    #[error("crypto runtime build too old; asked for build date {configured}, got: {reported}")]
    BuildDateBelowMinimum { configured: String, reported: String },
}

/// Type alias for Result with GateError
pub type GateResult<T> = Result<T, GateError>;

impl GateError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap a bad minimum-version string
    pub fn invalid_minimum_version(configured: impl Into<String>, source: VersionParseError) -> Self {
        Self::InvalidMinimumVersion {
            configured: configured.into(),
            source,
        }
    }

    /// Wrap a bad minimum-build-date string
    pub fn invalid_minimum_build_date(
        configured: impl Into<String>,
        source: BuildDateParseError,
    ) -> Self {
        Self::InvalidMinimumBuildDate {
            configured: configured.into(),
            source,
        }
    }

    /// Wrap a runtime build date that could not be parsed
    pub fn invalid_runtime_build_date(
        configured: impl Into<String>,
        reported: impl Into<String>,
        source: BuildDateParseError,
    ) -> Self {
        Self::InvalidRuntimeBuildDate {
            configured: configured.into(),
            reported: reported.into(),
            source,
        }
    }

    /// Create a version comparison failure
    pub fn version_below_minimum(configured: impl Into<String>, reported: impl Into<String>) -> Self {
        Self::VersionBelowMinimum {
            configured: configured.into(),
            reported: reported.into(),
        }
    }

    /// Create a build date comparison failure
    pub fn build_date_below_minimum(
        configured: impl Into<String>,
        reported: impl Into<String>,
    ) -> Self {
        Self::BuildDateBelowMinimum {
            configured: configured.into(),
            reported: reported.into(),
        }
    }

    /// The check this error belongs to, if it came from one
    pub fn check(&self) -> Option<CheckKind> {
        match self {
            GateError::Config { .. } | GateError::ConfigLoad { .. } => None,
            GateError::InvalidMinimumVersion { .. } | GateError::VersionBelowMinimum { .. } => {
                Some(CheckKind::Version)
            }
            GateError::InvalidMinimumBuildDate { .. }
            | GateError::InvalidRuntimeBuildDate { .. }
            | GateError::BuildDateBelowMinimum { .. } => Some(CheckKind::BuildDate),
        }
    }

    /// The input snippet an operator should look at
    ///
    /// Parse failures point at the string that failed to parse; comparison
    /// failures point at the configured requirement.
    pub fn offending(&self) -> &str {
        match self {
            GateError::Config { message } => message,
            GateError::ConfigLoad { .. } => "",
            GateError::InvalidMinimumVersion { configured, .. }
            | GateError::InvalidMinimumBuildDate { configured, .. }
            | GateError::VersionBelowMinimum { configured, .. }
            | GateError::BuildDateBelowMinimum { configured, .. } => configured,
            GateError::InvalidRuntimeBuildDate { reported, .. } => reported,
        }
    }
}

impl From<figment::Error> for GateError {
    fn from(err: figment::Error) -> Self {
        GateError::ConfigLoad { source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = GateError::config("runtime.built_on must be set");
        assert!(err.to_string().contains("Configuration error"));
        assert_eq!(err.check(), None);

        let err = GateError::version_below_minimum("1.1.0", "1.0.2 (0x1000200f)");
        assert_eq!(
            err.to_string(),
            "crypto runtime too old; asked for version 1.1.0, got: 1.0.2 (0x1000200f)"
        );
        assert_eq!(err.check(), Some(CheckKind::Version));
        assert_eq!(err.offending(), "1.1.0");
    }

    #[test]
    fn test_error_chaining() {
        use std::error::Error;

        let err = GateError::invalid_minimum_version("1", VersionParseError::TooShort);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("\"1\""));

        let err = GateError::invalid_runtime_build_date(
            "Mon Apr  7 15:08:30 UTC 2014",
            "built on: reproducible build, date unspecified",
            BuildDateParseError::WrongLength { len: 36 },
        );
        assert_eq!(err.check(), Some(CheckKind::BuildDate));
        assert_eq!(
            err.offending(),
            "built on: reproducible build, date unspecified"
        );
    }
}
