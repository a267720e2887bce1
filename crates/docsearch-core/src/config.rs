//! Configuration loading.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars,
//! and extracts the typed [`SearchSettings`] from the `search` table.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::Locale;

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

    /// Wrap an already assembled figment, e.g. `Toml::string` in tests.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.figment.contains(key)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }
}

pub const DEFAULT_MAX_HITS: usize = 200;
pub const DEFAULT_RAW_HIT_LIMIT: usize = 1000;
pub const DEFAULT_WRITER_MEMORY_BYTES: usize = 50_000_000;

/// Settings of the `[search]` table.
///
/// Every field has a default so a missing config file still yields a usable
/// setup rooted at `~/.docsearch/index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub state_dir: PathBuf,
    pub default_locale: String,
    pub max_hits: usize,
    pub raw_hit_limit: usize,
    pub writer_memory_bytes: usize,
    pub prebuilt_dir: Option<PathBuf>,
    /// Locale code to analyzer kind, e.g. `en = "smart:english"`.
    pub analyzers: BTreeMap<String, String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("~/.docsearch/index"),
            default_locale: "en".to_string(),
            max_hits: DEFAULT_MAX_HITS,
            raw_hit_limit: DEFAULT_RAW_HIT_LIMIT,
            writer_memory_bytes: DEFAULT_WRITER_MEMORY_BYTES,
            prebuilt_dir: None,
            analyzers: BTreeMap::new(),
        }
    }
}

impl SearchSettings {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let settings = if config.contains("search") {
            config.get::<SearchSettings>("search")?
        } else {
            tracing::debug!("no [search] table in configuration, using defaults");
            SearchSettings::default()
        };
        Ok(settings.resolved()?)
    }

    /// Expand paths and check the values that cannot be repaired silently.
    pub fn resolved(mut self) -> crate::Result<Self> {
        self.state_dir = expand_path(self.state_dir.to_string_lossy());
        // A relative prebuilt directory is taken relative to the state root.
        self.prebuilt_dir = self
            .prebuilt_dir
            .take()
            .map(|p| resolve_with_base(&self.state_dir, p.to_string_lossy()));
        if Locale::parse(&self.default_locale).is_none() {
            return Err(Error::InvalidConfig(format!(
                "default_locale '{}' is not a locale code",
                self.default_locale
            )));
        }
        if self.max_hits == 0 {
            return Err(Error::InvalidConfig("max_hits must be positive".to_string()));
        }
        if self.raw_hit_limit < self.max_hits {
            self.raw_hit_limit = self.max_hits;
        }
        Ok(self)
    }

    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
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

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
