//! Startup gate: configured minimums against the running crypto library
//!
//! Runs once, eagerly, while the host is still reading its configuration.
//! Any failure here is final; the host is expected to refuse to start.

use crate::build_date::BuildDate;
use crate::errors::{CheckKind, GateError, GateResult};
use crate::runtime_report::RuntimeReport;
use crate::version::parse_minimum_version;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

/// Administrator-supplied lower bounds. Absent or empty means "don't check".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub minimum_version: Option<String>,
    #[serde(default)]
    pub minimum_build_date: Option<String>,
}

impl Requirements {
    pub fn new(minimum_version: Option<String>, minimum_build_date: Option<String>) -> Self {
        Self {
            minimum_version,
            minimum_build_date,
        }
    }

    pub fn minimum_version(&self) -> Option<&str> {
        non_empty(&self.minimum_version)
    }

    pub fn minimum_build_date(&self) -> Option<&str> {
        non_empty(&self.minimum_build_date)
    }

    pub fn is_empty(&self) -> bool {
        self.minimum_version().is_none() && self.minimum_build_date().is_none()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Result of a single check that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Skipped,
    Satisfied,
}

/// Why startup was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct Rejection {
    pub check: CheckKind,
    /// One operator-facing line.
    pub message: String,
    pub offending: String,
}

impl Rejection {
    fn new(check: CheckKind, err: &GateError) -> Self {
        Self {
            check,
            message: err.to_string(),
            offending: err.offending().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail(Rejection),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Verdict::Pass => None,
            Verdict::Fail(rejection) => Some(rejection),
        }
    }

    pub fn into_result(self) -> Result<(), Rejection> {
        match self {
            Verdict::Pass => Ok(()),
            Verdict::Fail(rejection) => Err(rejection),
        }
    }
}

pub struct Validator {
    requirements: Requirements,
}

impl Validator {
    pub fn new(requirements: Requirements) -> Self {
        Self { requirements }
    }

    pub fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    /// Inclusive minimum: passes when the runtime number equals the configured one.
    pub fn check_version<R: RuntimeReport + ?Sized>(&self, runtime: &R) -> GateResult<CheckOutcome> {
        let Some(configured) = self.requirements.minimum_version() else {
            info!(check = %CheckKind::Version, "no minimum configured, skipping");
            return Ok(CheckOutcome::Skipped);
        };

        let wanted = parse_minimum_version(configured)
            .map_err(|e| GateError::invalid_minimum_version(configured, e))?;
        let actual = runtime.version_number();
        debug!(%wanted, %actual, "comparing crypto library versions");

        if wanted > actual {
            return Err(GateError::version_below_minimum(
                configured,
                describe_runtime_version(runtime),
            ));
        }

        info!(check = %CheckKind::Version, minimum = configured, "crypto library version accepted");
        Ok(CheckOutcome::Satisfied)
    }

    /// Inclusive minimum: a runtime built at exactly the configured second passes.
    pub fn check_build_date<R: RuntimeReport + ?Sized>(
        &self,
        runtime: &R,
    ) -> GateResult<CheckOutcome> {
        let Some(configured) = self.requirements.minimum_build_date() else {
            info!(check = %CheckKind::BuildDate, "no minimum configured, skipping");
            return Ok(CheckOutcome::Skipped);
        };

        let wanted = BuildDate::parse(configured, false)
            .map_err(|e| GateError::invalid_minimum_build_date(configured, e))?;
        let reported = runtime.built_on();
        let actual = BuildDate::parse(reported, true)
            .map_err(|e| GateError::invalid_runtime_build_date(configured, reported, e))?;
        debug!(%wanted, %actual, "comparing crypto library build dates");

        if actual < wanted {
            return Err(GateError::build_date_below_minimum(configured, reported));
        }

        info!(check = %CheckKind::BuildDate, minimum = configured, "crypto library build date accepted");
        Ok(CheckOutcome::Satisfied)
    }

    /// Run every configured check; the first failure becomes the verdict.
    pub fn run<R: RuntimeReport + ?Sized>(&self, runtime: &R) -> Verdict {
        match self.check_all(runtime) {
            Ok(()) => Verdict::Pass,
            Err(rejection) => {
                error!(check = %rejection.check, "{}", rejection.message);
                Verdict::Fail(rejection)
            }
        }
    }

    fn check_all<R: RuntimeReport + ?Sized>(&self, runtime: &R) -> Result<(), Rejection> {
        self.check_version(runtime)
            .map_err(|e| Rejection::new(CheckKind::Version, &e))?;
        self.check_build_date(runtime)
            .map_err(|e| Rejection::new(CheckKind::BuildDate, &e))?;
        Ok(())
    }
}

fn describe_runtime_version<R: RuntimeReport + ?Sized>(runtime: &R) -> String {
    let number = runtime.version_number();
    let text = runtime.version_text().trim();
    if text.is_empty() {
        format!("{} [{:#010x}]", number.decode(), number)
    } else {
        format!("{text} [{number:#010x}]")
    }
}
