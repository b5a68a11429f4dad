//! Settings loaded from `partsmap.toml`.
//!
//! ```toml
//! [database]
//! url = "sqlite://app.db?mode=rwc"
//! dialect = "sqlite"
//!
//! [compiler]
//! qualify_fields = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::dialect::Dialect;
use crate::error::PartsResult;

/// Environment variable overriding `database.url`.
pub const DATABASE_URL_ENV: &str = "PARTSMAP_DATABASE_URL";

const LOCAL_FILE: &str = "partsmap.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub compiler: CompilerSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub dialect: Dialect,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Prefix fields with their table name or alias
    pub qualify_fields: bool,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            qualify_fields: true,
        }
    }
}

impl Settings {
    /// Load settings from the first file found: `path`, `./partsmap.toml`,
    /// then `<config dir>/partsmap/config.toml`. Falls back to defaults.
    /// `PARTSMAP_DATABASE_URL` wins over any file.
    pub fn load(path: Option<&Path>) -> PartsResult<Self> {
        let settings = match Self::locate(path) {
            Some(file) => {
                debug!("Loading settings from {}", file.display());
                Self::from_file(&file)?
            }
            None => Self::default(),
        };
        Ok(settings.with_database_url(std::env::var(DATABASE_URL_ENV).ok()))
    }

    pub fn from_file(path: &Path) -> PartsResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> PartsResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Replace the database URL when `url` is set.
    pub fn with_database_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.is_empty()) {
            self.database.url = Some(url);
        }
        self
    }

    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let local = PathBuf::from(LOCAL_FILE);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("partsmap").join("config.toml"))
            .filter(|p| p.exists())
    }
}
