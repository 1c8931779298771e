use crate::build_date::BuildDate;
use crate::config_loader::load_config;
use crate::runtime_report::log_runtime_banner;
use crate::validator::{Requirements, Validator, Verdict};
use crate::version::VersionSpec;
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;

/// Top-level CLI interface for the gate
#[derive(Parser, Debug)]
#[command(
    name = "crypto-gate",
    version,
    about = "Refuse to start against a crypto library older than the configured minimum"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare configured minimums with the reported runtime library
    Check {
        /// TOML config file (defaults to crypto_gate.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the configured minimum version
        #[arg(long, env = "CRYPTO_GATE_MINIMUM_VERSION")]
        minimum_version: Option<String>,
        /// Override the configured minimum build date
        #[arg(long, env = "CRYPTO_GATE_MINIMUM_BUILD_DATE")]
        minimum_build_date: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Parse a minimum version such as 1.0.2g and show its packed value
    Version {
        input: String,
        #[arg(long)]
        json: bool,
    },

    /// Parse a build date such as "Mon Apr  7 15:08:30 PDT 2014"
    BuildDate {
        input: String,
        /// Input starts with "built on: "
        #[arg(long)]
        prefixed: bool,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct VersionReport<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    spec: Option<VersionSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    packed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct BuildDateReport<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    utc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Run a command against stdout. `Ok(false)` means the input or the runtime
/// was rejected and the process should exit non-zero.
pub fn dispatch(cli: Cli) -> anyhow::Result<bool> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    dispatch_to(cli, &mut out)
}

pub fn dispatch_to<W: Write>(cli: Cli, out: &mut W) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Check {
            config,
            minimum_version,
            minimum_build_date,
            json,
        } => {
            let overrides = Requirements::new(minimum_version, minimum_build_date);
            let cfg = load_config(config.as_deref(), &overrides)
                .context("failed to load crypto gate configuration")?;

            log_runtime_banner(&cfg.runtime);
            let verdict = Validator::new(cfg.requirements()).run(&cfg.runtime);

            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&verdict)?)?;
            } else {
                match &verdict {
                    Verdict::Pass => writeln!(out, "PASS: crypto runtime meets configured minimums")?,
                    Verdict::Fail(rejection) => {
                        writeln!(out, "FAIL [{}]: {}", rejection.check, rejection.message)?
                    }
                }
            }
            Ok(verdict.is_pass())
        }

        Commands::Version { input, json } => {
            let parsed = VersionSpec::parse(&input);
            let ok = parsed.is_ok();
            if json {
                let report = match parsed {
                    Ok(spec) => VersionReport {
                        input: &input,
                        spec: Some(spec),
                        packed: Some(format!("{:#010x}", spec.pack())),
                        error: None,
                    },
                    Err(e) => VersionReport {
                        input: &input,
                        spec: None,
                        packed: None,
                        error: Some(e.to_string()),
                    },
                };
                writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            } else {
                match parsed {
                    Ok(spec) => writeln!(out, "{input} => {}", spec.pack())?,
                    Err(e) => writeln!(out, "{input:?} rejected: {e}")?,
                }
            }
            Ok(ok)
        }

        Commands::BuildDate {
            input,
            prefixed,
            json,
        } => {
            let parsed = BuildDate::parse(&input, prefixed);
            let ok = parsed.is_ok();
            if json {
                let report = match parsed {
                    Ok(date) => BuildDateReport {
                        input: &input,
                        timestamp: Some(date.timestamp()),
                        utc: date.to_datetime().map(|dt| dt.to_rfc3339()),
                        error: None,
                    },
                    Err(e) => BuildDateReport {
                        input: &input,
                        timestamp: None,
                        utc: None,
                        error: Some(e.to_string()),
                    },
                };
                writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            } else {
                match parsed {
                    Ok(date) => writeln!(out, "{input} => {} ({date})", date.timestamp())?,
                    Err(e) => writeln!(out, "{input:?} rejected: {e}")?,
                }
            }
            Ok(ok)
        }
    }
}
