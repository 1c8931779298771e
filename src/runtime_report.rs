// runtime_report.rs
// Purpose: What the running crypto library says about itself at startup

use crate::version::PackedVersion;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Self-description of the crypto library the process is linked against.
///
/// The numeric version is read directly from the library, never recovered by
/// parsing `version_text`, which is only used when talking to operators.
pub trait RuntimeReport {
    fn version_number(&self) -> PackedVersion;

    /// e.g. `OpenSSL 1.0.2h  3 May 2016`
    fn version_text(&self) -> &str;

    /// Still carries the `built on: ` prefix.
    fn built_on(&self) -> &str;

    /// Version text of the headers the binary was compiled against, if known.
    fn built_with(&self) -> Option<&str> {
        None
    }
}

/// A runtime report supplied through configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportedRuntime {
    #[serde(deserialize_with = "deserialize_version_number")]
    pub version_number: u64,
    pub version_text: String,
    pub built_on: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_with: Option<String>,
}

impl RuntimeReport for ReportedRuntime {
    fn version_number(&self) -> PackedVersion {
        PackedVersion::new(self.version_number)
    }

    fn version_text(&self) -> &str {
        &self.version_text
    }

    fn built_on(&self) -> &str {
        &self.built_on
    }

    fn built_with(&self) -> Option<&str> {
        self.built_with.as_deref()
    }
}

/// Log which library the binary was built with and which one it got.
pub fn log_runtime_banner<R: RuntimeReport + ?Sized>(runtime: &R) {
    info!(
        number = %runtime.version_number(),
        "crypto library: built with [{}] runtime is [{}]",
        runtime.built_with().unwrap_or("unknown"),
        runtime.version_text()
    );
}

/// Parse `0x1000208f`, `0X1000208F` or plain decimal.
pub fn parse_version_number(raw: &str) -> Result<u64, String> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid runtime version number {raw:?}: {e}"))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVersionNumber {
    Number(u64),
    Text(String),
}

fn deserialize_version_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawVersionNumber::deserialize(deserializer)? {
        RawVersionNumber::Number(n) => Ok(n),
        RawVersionNumber::Text(s) => parse_version_number(&s).map_err(de::Error::custom),
    }
}
