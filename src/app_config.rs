//! Application configuration loading for CLI defaults.

use std::env;
use std::fmt::Display;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use page_loader_core::LoaderConfig;

/// File configuration for page-loader defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Default output directory.
    pub output_dir: Option<PathBuf>,
    /// Retries after the first attempt (0..=10).
    pub retries: Option<u32>,
    /// Base retry delay in milliseconds (0..=60000).
    pub retry_delay_ms: Option<u64>,
    /// Request timeout in seconds (1..=3600).
    pub request_timeout_secs: Option<u64>,
    /// Concurrent asset downloads (same range as CLI).
    pub concurrency: Option<u8>,
    /// Replacement restricted-directory denylist.
    pub restricted_dirs: Option<Vec<PathBuf>>,
}

impl FileConfig {
    /// Overwrites the fields of `config` this file sets.
    pub fn apply_to(&self, config: &mut LoaderConfig) {
        if let Some(retries) = self.retries {
            config.retries = retries;
        }
        if let Some(delay) = self.retry_delay_ms {
            config.retry_delay = Duration::from_millis(delay);
        }
        if let Some(timeout) = self.request_timeout_secs {
            config.request_timeout = Duration::from_secs(timeout);
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = usize::from(concurrency);
        }
        if let Some(dirs) = &self.restricted_dirs {
            config.restricted_dirs.clone_from(dirs);
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Config path that was consulted, if any.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/page-loader/config.toml`
/// 2. `$HOME/.config/page-loader/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("page-loader")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("page-loader")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist; the default path is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = read_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(read_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_number}");

        match key {
            "output_dir" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "retries" => {
                cfg.retries = Some(parse_integer_in(value, 0..=10).with_context(invalid)?);
            }
            "retry_delay_ms" => {
                cfg.retry_delay_ms =
                    Some(parse_integer_in(value, 0..=60_000).with_context(invalid)?);
            }
            "request_timeout_secs" => {
                cfg.request_timeout_secs =
                    Some(parse_integer_in(value, 1..=3600).with_context(invalid)?);
            }
            "concurrency" => {
                cfg.concurrency = Some(parse_integer_in(value, 1..=100).with_context(invalid)?);
            }
            "restricted_dirs" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.restricted_dirs = Some(
                    parsed
                        .split(',')
                        .map(str::trim)
                        .filter(|dir| !dir.is_empty())
                        .map(PathBuf::from)
                        .collect(),
                );
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_in<T>(raw_value: &str, range: RangeInclusive<T>) -> Result<T>
where
    T: FromStr + PartialOrd + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<T>()?;
    if !range.contains(&value) {
        bail!(
            "{value} is out of range. Expected range: {}..={}",
            range.start(),
            range.end()
        );
    }
    Ok(value)
}
