//! Config file parsing for `~/.config/ebook-assets/config.toml`.
//!
//! Use `cover_options_from_config` and `catalog_options_from_config` to build
//! pipeline options from the loaded config so archive limits apply everywhere.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogOptions;
use crate::covers::CoverOptions;
use crate::security::ArchiveLimits;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub covers: CoversConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoversConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub placeholder_width: u32,
    pub placeholder_height: u32,
    pub placeholders: bool,
    pub font_path: Option<String>,
}

impl Default for CoversConfig {
    fn default() -> Self {
        let defaults = CoverOptions::default();
        Self {
            max_width: defaults.max_width,
            max_height: defaults.max_height,
            placeholder_width: defaults.placeholder_width,
            placeholder_height: defaults.placeholder_height,
            placeholders: defaults.placeholders,
            font_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub storage_prefix: String,
    pub cover_url_prefix: String,
    pub default_tags: Vec<String>,
    pub pretty: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let defaults = CatalogOptions::default();
        Self {
            storage_prefix: defaults.storage_prefix,
            cover_url_prefix: defaults.cover_url_prefix,
            default_tags: defaults.tags,
            pretty: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub max_entries: Option<u64>,
    pub max_entry_size_mb: Option<u64>,
    pub max_compression_ratio: Option<u64>,
}

/// Load config from the default path (`~/.config/ebook-assets/config.toml`).
pub fn load_config() -> AppConfig {
    let Some(path) = config_path() else {
        return AppConfig::default();
    };

    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(_) => return AppConfig::default(),
    };

    parse_config(&content).unwrap_or_else(|e| {
        tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
        AppConfig::default()
    })
}

pub fn parse_config(content: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Return the default config file path (for init and show).
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut p| {
        p.push("ebook-assets");
        p.push("config.toml");
        p
    })
}

/// Build archive limits from config. Uses defaults for any unset values.
pub fn archive_limits_from_config(c: &SecurityConfig) -> ArchiveLimits {
    let mut limits = ArchiveLimits::default();
    if let Some(n) = c.max_entries {
        limits.max_entries = n;
    }
    if let Some(mb) = c.max_entry_size_mb {
        limits.max_entry_bytes = mb.saturating_mul(1024).saturating_mul(1024);
    }
    if let Some(r) = c.max_compression_ratio {
        limits.max_compression_ratio = r;
    }
    limits
}

pub fn cover_options_from_config(cfg: &AppConfig) -> CoverOptions {
    let c = &cfg.covers;
    CoverOptions {
        max_width: c.max_width,
        max_height: c.max_height,
        placeholder_width: c.placeholder_width,
        placeholder_height: c.placeholder_height,
        placeholders: c.placeholders,
        font_path: c.font_path.as_ref().map(PathBuf::from),
        limits: archive_limits_from_config(&cfg.security),
    }
}

/// Catalog options from config; the covers directory is left to the caller.
pub fn catalog_options_from_config(cfg: &AppConfig) -> CatalogOptions {
    CatalogOptions {
        storage_prefix: cfg.catalog.storage_prefix.clone(),
        covers_dir: None,
        cover_url_prefix: cfg.catalog.cover_url_prefix.clone(),
        tags: cfg.catalog.default_tags.clone(),
        limits: archive_limits_from_config(&cfg.security),
    }
}
