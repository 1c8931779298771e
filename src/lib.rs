//! Library root for the `crypto_version_gate` crate
//! Startup gate that refuses to run against an outdated crypto library

// Core error handling
pub mod errors;

// Parsers for configured minimums and runtime-reported values
pub mod build_date;
pub mod version;

// Runtime library self-report
pub mod runtime_report;

// Startup gate
pub mod validator;

// Configuration & CLI
pub mod cli;
pub mod config_loader;


pub use build_date::{BuildDate, BuildDateParseError};
pub use errors::{CheckKind, GateError, GateResult};
pub use runtime_report::{ReportedRuntime, RuntimeReport};
pub use validator::{CheckOutcome, Rejection, Requirements, Validator, Verdict};
pub use version::{PackedVersion, VersionParseError, VersionSpec};
