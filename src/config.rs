//! Pagination configuration.
//!
//! Defaults that the builder, the cursor codec and collection queries share. Values come
//! from (highest first) explicit overrides, `PAGEWISE_*` environment variables, a TOML file,
//! and finally [`PaginationConfig::default`].

use crate::errors::PageError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_per_page: u64,
    pub default_sort: String,
    /// Tokens longer than this are moved to the overflow store.
    pub max_token_length: usize,
    pub cursor_ttl_secs: u64,
    pub cache_key_prefix: String,
    pub max_inflated_bytes: usize,
    pub cache_capacity: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_per_page: 20,
            default_sort: "id asc".to_string(),
            max_token_length: 2048,
            cursor_ttl_secs: 8 * 60 * 60,
            cache_key_prefix: "paginator_cursor".to_string(),
            max_inflated_bytes: crate::token::DEFAULT_MAX_INFLATED_BYTES,
            cache_capacity: 4096,
        }
    }
}

impl PaginationConfig {
    /// # Errors
    /// Returns an error if the text is not valid TOML for this structure.
    pub fn from_toml_str(s: &str) -> Result<Self, PageError> {
        toml::from_str(s).map_err(|e| PageError::Config(e.to_string()))
    }

    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, PageError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PageError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Applies `PAGEWISE_*` environment overrides. Unparsable values are ignored with a warning.
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.apply_vars(|k| std::env::var(k).ok())
    }

    fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
            let raw = raw?;
            let v = raw.trim().parse::<T>().ok();
            if v.is_none() {
                log::warn!("ignoring {key}={raw}: not a number");
            }
            v
        }
        if let Some(v) = parsed("PAGEWISE_DEFAULT_PER_PAGE", var("PAGEWISE_DEFAULT_PER_PAGE")) {
            self.default_per_page = v;
        }
        if let Some(s) = var("PAGEWISE_DEFAULT_SORT") {
            self.default_sort = s;
        }
        if let Some(v) = parsed("PAGEWISE_MAX_TOKEN_LENGTH", var("PAGEWISE_MAX_TOKEN_LENGTH")) {
            self.max_token_length = v;
        }
        if let Some(v) = parsed("PAGEWISE_CURSOR_TTL_SECS", var("PAGEWISE_CURSOR_TTL_SECS")) {
            self.cursor_ttl_secs = v;
        }
        self
    }

    #[must_use]
    pub const fn cursor_ttl(&self) -> Duration {
        Duration::from_secs(self.cursor_ttl_secs)
    }
}
