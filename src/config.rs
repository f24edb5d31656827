use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use axe_logs::TailSettings;

use crate::cli::Args;

/// Default number of lines kept in the pager
pub const DEFAULT_SCROLLBACK: usize = 10_000;

/// Optional settings file. Every field may be omitted; command line flags
/// take precedence.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub context: Option<String>,
    pub namespaces: Vec<String>,
    pub lookback: Option<String>,
    pub resync: Option<String>,
    pub retry_interval: Option<String>,
    pub buffer: Option<usize>,
    pub scrollback: Option<usize>,
    pub spool: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn duration(value: Option<&str>, field: &str) -> Result<Option<Duration>> {
        value
            .map(|v| parse_duration(v).map_err(anyhow::Error::msg))
            .transpose()
            .with_context(|| format!("Invalid `{field}` in config file"))
    }
}

/// Output mode of the binary
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Pager,
    Plain,
    Json,
}

/// Fully resolved run configuration
#[derive(Debug)]
pub struct Config {
    pub context: Option<String>,

    /// Empty means the context's default namespace
    pub namespaces: Vec<String>,

    pub settings: TailSettings,
    pub scrollback: usize,
    pub output: OutputMode,
    pub spool: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Merge flags over the file over built-in defaults
    pub fn resolve(args: Args, file: FileConfig) -> Result<Self> {
        let defaults = TailSettings::default();

        let lookback = FileConfig::duration(file.lookback.as_deref(), "lookback")?;
        let resync = FileConfig::duration(file.resync.as_deref(), "resync")?;
        let retry_interval =
            FileConfig::duration(file.retry_interval.as_deref(), "retry-interval")?;

        let settings = TailSettings {
            lookback: args.lookback.or(lookback).unwrap_or(defaults.lookback),
            resync: args.resync.or(resync).unwrap_or(defaults.resync),
            retry_interval: args
                .retry_interval
                .or(retry_interval)
                .unwrap_or(defaults.retry_interval),
            buffer: args.buffer.or(file.buffer).unwrap_or(defaults.buffer),
        };

        let namespaces = if args.namespaces.is_empty() {
            file.namespaces
        } else {
            args.namespaces
        };

        let output = if args.json {
            OutputMode::Json
        } else if args.plain {
            OutputMode::Plain
        } else {
            OutputMode::Pager
        };

        Ok(Self {
            context: args.context.or(file.context),
            namespaces: clean_namespaces(namespaces),
            settings,
            scrollback: args
                .scrollback
                .or(file.scrollback)
                .unwrap_or(DEFAULT_SCROLLBACK),
            output,
            spool: args.spool.or(file.spool),
            log_file: args.log_file.or(file.log_file),
        })
    }

    /// Namespaces to watch, falling back to `default_namespace`
    pub fn namespaces_or(&self, default_namespace: &str) -> Vec<String> {
        if self.namespaces.is_empty() {
            vec![default_namespace.to_string()]
        } else {
            self.namespaces.clone()
        }
    }
}

/// Trim, drop empties and duplicates, keep order
fn clean_namespaces(namespaces: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(namespaces.len());
    for ns in namespaces {
        let ns = ns.trim();
        if !ns.is_empty() && !out.iter().any(|n| n == ns) {
            out.push(ns.to_string());
        }
    }
    out
}

/// Parse a duration such as `500ms`, `30s`, `5m`, `1h` or `1h30m`.
/// A bare `0` is accepted; other bare numbers are not.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input == "0" {
        return Ok(Duration::ZERO);
    }
    if input.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("invalid duration `{input}`: expected a number"));
        }
        let value: u64 = rest[..digits]
            .parse()
            .map_err(|_| format!("invalid duration `{input}`: number too large"))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.saturating_mul(60)),
            "h" => Duration::from_secs(value.saturating_mul(3600)),
            "" => return Err(format!("invalid duration `{input}`: missing unit")),
            unit => return Err(format!("invalid duration `{input}`: unknown unit `{unit}`")),
        };
        rest = &rest[unit_len..];
        total = total.saturating_add(part);
    }
    Ok(total)
}
