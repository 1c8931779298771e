use crate::errors::{GateError, GateResult};
use crate::runtime_report::ReportedRuntime;
use crate::validator::Requirements;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file read when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "crypto_gate.toml";

/// Environment prefix; nested keys use `__`, e.g. `CRYPTO_GATE_RUNTIME__BUILT_ON`.
pub const ENV_PREFIX: &str = "CRYPTO_GATE_";

/// Keys the env provider skips. figment would read `1.10` as the float `1.1`,
/// so `CRYPTO_GATE_MINIMUM_*` reach the config as raw strings through the CLI.
const STRING_ONLY_KEYS: [&str; 2] = ["minimum_version", "minimum_build_date"];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GateConfig {
    #[serde(default)]
    pub minimum_version: Option<String>,
    #[serde(default)]
    pub minimum_build_date: Option<String>,
    pub runtime: ReportedRuntime,
}

impl GateConfig {
    pub fn requirements(&self) -> Requirements {
        Requirements::new(
            self.minimum_version.clone(),
            self.minimum_build_date.clone(),
        )
    }
}

#[derive(Serialize)]
struct GateConfigDefaults {
    runtime: ReportedRuntime,
}

/// Layer defaults, the TOML file and `CRYPTO_GATE_*` variables, in that order.
/// The minimums are left out of the env layer; see [`STRING_ONLY_KEYS`].
pub fn config_figment(path: Option<&Path>) -> Figment {
    let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    Figment::from(Serialized::defaults(GateConfigDefaults {
        runtime: ReportedRuntime::default(),
    }))
    .merge(Toml::file(file))
    .merge(
        Env::prefixed(ENV_PREFIX)
            .split("__")
            .ignore(&STRING_ONLY_KEYS),
    )
}

/// Load and validate the gate configuration.
///
/// `overrides` come from the command line (or its `CRYPTO_GATE_MINIMUM_*`
/// env fallbacks) and win over every other layer. They are merged as plain
/// strings, so a minimum like `1.10` stays `1.10`.
pub fn load_config(path: Option<&Path>, overrides: &Requirements) -> GateResult<GateConfig> {
    let mut figment = config_figment(path);
    if let Some(version) = overrides.minimum_version() {
        figment = figment.merge(Serialized::default("minimum_version", version));
    }
    if let Some(date) = overrides.minimum_build_date() {
        figment = figment.merge(Serialized::default("minimum_build_date", date));
    }

    let config: GateConfig = figment.extract()?;

    if config.runtime.version_number == 0 {
        return Err(GateError::config("runtime.version_number must be set"));
    }
    if config.runtime.version_text.trim().is_empty() {
        return Err(GateError::config("runtime.version_text must be set"));
    }
    if config.runtime.built_on.trim().is_empty() {
        return Err(GateError::config("runtime.built_on must be set"));
    }

    Ok(config)
}
