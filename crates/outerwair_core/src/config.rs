//! Runtime configuration resolved from the environment.
//!
//! # Responsibility
//! - Resolve database path, logging and storage-cap settings.
//! - Fall back to defaults on blank or invalid values, recording why.
//!
//! # Invariants
//! - Resolution never fails; problems land in `warnings`.

use crate::db::{DbOptions, DbResult};
use crate::logging::{default_log_level, init_logging};
use crate::repo::sqlite_store::SqliteStore;
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "OUTERWAIR_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "OUTERWAIR_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "OUTERWAIR_LOG_DIR";
pub const ENV_MAX_STORAGE_PAGES: &str = "OUTERWAIR_MAX_STORAGE_PAGES";

const DEFAULT_DB_FILE_NAME: &str = "outerwair.sqlite3";

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylerConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// Page cap for the SQLite store; models device storage quota.
    pub max_storage_pages: Option<u32>,
    /// Human-readable notes about ignored values.
    pub warnings: Vec<String>,
}

impl Default for StylerConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            max_storage_pages: None,
            warnings: Vec::new(),
        }
    }
}

impl StylerConfig {
    /// Resolves configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = read(ENV_LOG_DIR).map(PathBuf::from);
        if let Some(raw) = read(ENV_MAX_STORAGE_PAGES) {
            match raw.parse::<u32>() {
                Ok(pages) if pages > 0 => config.max_storage_pages = Some(pages),
                _ => config.warnings.push(format!(
                    "ignoring {ENV_MAX_STORAGE_PAGES}=`{raw}`; expected a positive integer"
                )),
            }
        }
        config
    }

    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            max_page_count: self.max_storage_pages,
        }
    }

    /// Opens the configured SQLite store.
    pub fn open_store(&self) -> DbResult<SqliteStore> {
        SqliteStore::open(&self.db_path, self.db_options())
    }

    /// Starts logging when a log directory is configured.
    ///
    /// Returns `Ok(false)` when logging is disabled by configuration.
    pub fn init_logging(&self) -> Result<bool, String> {
        let Some(dir) = &self.log_dir else {
            return Ok(false);
        };
        let dir = dir
            .to_str()
            .ok_or_else(|| format!("log dir `{}` is not valid UTF-8", dir.display()))?;
        init_logging(&self.log_level, dir).map(|()| true)
    }
}

#[cfg(test)]
mod tests {
    use super::{StylerConfig, ENV_DB_PATH, ENV_LOG_DIR, ENV_MAX_STORAGE_PAGES};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = StylerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, StylerConfig::default());
        assert!(config.log_dir.is_none());
        assert_eq!(config.init_logging(), Ok(false));
    }

    #[test]
    fn reads_paths_and_storage_cap() {
        let config = StylerConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, " /data/styler.db "),
            (ENV_LOG_DIR, "/var/log/outerwair"),
            (ENV_MAX_STORAGE_PAGES, "256"),
        ]));
        assert_eq!(config.db_path, PathBuf::from("/data/styler.db"));
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/outerwair")));
        assert_eq!(config.db_options().max_page_count, Some(256));
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn invalid_storage_cap_is_ignored_with_warning() {
        let config = StylerConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "   "),
            (ENV_MAX_STORAGE_PAGES, "lots"),
        ]));
        assert_eq!(config.db_path, StylerConfig::default().db_path);
        assert_eq!(config.max_storage_pages, None);
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains("lots"));
    }
}
