//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env
//! vars. The typed [`EngineConfig`] section carries the engine tunables and
//! loads with full defaults when no configuration is present.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// What to do when an indexed hit cannot be resolved against the primary
/// store during reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingRecordPolicy {
    /// Drop the hit from the output sequence and keep going.
    Skip,
    /// Surface a reconstruction error for the position.
    Fail,
}

/// Engine tunables, loadable from the `[engine]` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Backend index name all writes and searches target.
    pub index_name: String,
    /// Hits fetched per search round-trip.
    pub page_size: usize,
    /// Bulk flush trigger: buffered document count.
    pub flush_max_docs: usize,
    /// Bulk flush trigger: elapsed milliseconds since the last flush.
    pub flush_interval_ms: u64,
    /// Default bounded wait when draining the bulk channel on close.
    pub close_timeout_ms: u64,
    /// Recovery policy for hits missing from the primary store.
    pub on_missing: MissingRecordPolicy,
    /// Root directory for the on-disk text index.
    pub index_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_name: "records".to_string(),
            page_size: 1000,
            flush_max_docs: 1000,
            flush_interval_ms: 1000,
            close_timeout_ms: 30_000,
            on_missing: MissingRecordPolicy::Skip,
            index_dir: "./data/index".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// Text index root, expanded and resolved against `base`.
    pub fn index_path(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.index_dir)
    }

    pub fn validate(&self) -> Result<()> {
        if self.index_name.is_empty() {
            return Err(Error::InvalidConfig("index_name must not be empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(Error::InvalidConfig("page_size must be positive".to_string()));
        }
        if self.flush_max_docs == 0 {
            return Err(Error::InvalidConfig("flush_max_docs must be positive".to_string()));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// The `[engine]` section, falling back to defaults when absent.
    pub fn engine(&self) -> EngineConfig {
        self.figment.extract_inner("engine").unwrap_or_default()
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after
/// expansion. If `p` is absolute, it's returned as-is; otherwise
/// `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
