//! Upload configuration.
//!
//! Values come from, lowest precedence first: built-in defaults, an optional
//! JSON file, then `DROPLOAD_*` environment variables (a `.env` file is
//! loaded by the CLI). Command-line flags override all of these.
//!
//! | Variable                  | Example                   |
//! |---------------------------|---------------------------|
//! | `DROPLOAD_ACCEPT`         | `.pdf,image/*`            |
//! | `DROPLOAD_MAX_SIZE`       | `10MB`, `512KB`, `1048576`|
//! | `DROPLOAD_MAX_COUNT`      | `5`                       |
//! | `DROPLOAD_ALLOW_MULTIPLE` | `true`                    |
//! | `DROPLOAD_TICK_MS`        | `200`                     |
//! | `DROPLOAD_COMPLETION`     | `await-transport`         |

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::pipeline::{CompletionMode, OrchestratorOptions};
use crate::validation::ValidationPolicy;

/// Default maximum file size: 10 MiB.
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Default maximum number of queued files.
pub const DEFAULT_MAX_COUNT: usize = 5;

/// Default delay between progress steps, in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 200;

const ENV_ACCEPT: &str = "DROPLOAD_ACCEPT";
const ENV_MAX_SIZE: &str = "DROPLOAD_MAX_SIZE";
const ENV_MAX_COUNT: &str = "DROPLOAD_MAX_COUNT";
const ENV_ALLOW_MULTIPLE: &str = "DROPLOAD_ALLOW_MULTIPLE";
const ENV_TICK_MS: &str = "DROPLOAD_TICK_MS";
const ENV_COMPLETION: &str = "DROPLOAD_COMPLETION";

/// Recognized upload options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadConfig {
    /// Accept patterns; empty accepts everything.
    pub accept: Vec<String>,
    pub max_size_bytes: u64,
    pub max_count: usize,
    /// Whether one drop or selection may carry more than one file.
    pub allow_multiple: bool,
    pub tick_interval_ms: u64,
    pub completion: CompletionMode,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            accept: Vec::new(),
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            max_count: DEFAULT_MAX_COUNT,
            allow_multiple: true,
            tick_interval_ms: DEFAULT_TICK_MS,
            completion: CompletionMode::Optimistic,
        }
    }
}

impl UploadConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::default().apply_env()
    }

    /// Load a JSON file; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Override fields from `DROPLOAD_*` environment variables.
    pub fn apply_env(self) -> ConfigResult<Self> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars<F>(mut self, get: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = get(ENV_ACCEPT) {
            self.accept = parse_accept(&value);
        }
        if let Some(value) = get(ENV_MAX_SIZE) {
            self.max_size_bytes = parse_size(&value).ok_or_else(|| invalid(ENV_MAX_SIZE, &value))?;
        }
        if let Some(value) = get(ENV_MAX_COUNT) {
            self.max_count = value
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_MAX_COUNT, &value))?;
        }
        if let Some(value) = get(ENV_ALLOW_MULTIPLE) {
            self.allow_multiple =
                parse_bool(&value).ok_or_else(|| invalid(ENV_ALLOW_MULTIPLE, &value))?;
        }
        if let Some(value) = get(ENV_TICK_MS) {
            self.tick_interval_ms = value
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_TICK_MS, &value))?;
        }
        if let Some(value) = get(ENV_COMPLETION) {
            self.completion = value.parse().map_err(|_| invalid(ENV_COMPLETION, &value))?;
        }
        Ok(self)
    }

    /// Compile the validation policy.
    pub fn policy(&self) -> ConfigResult<ValidationPolicy> {
        ValidationPolicy::new(&self.accept, self.max_size_bytes, self.max_count)
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            tick: Duration::from_millis(self.tick_interval_ms),
            completion: self.completion,
        }
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Split a comma-separated accept list.
pub fn parse_accept(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a byte count with an optional binary unit: `B`, `KB`, `MB`, `GB`
/// (`K`, `M`, `G` also accepted, case-insensitive).
pub fn parse_size(value: &str) -> Option<u64> {
    let value = value.trim().to_uppercase();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let amount: u64 = digits.parse().ok()?;
    let multiplier: u64 = match unit.trim() {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        _ => return None,
    };
    amount.checked_mul(multiplier)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
