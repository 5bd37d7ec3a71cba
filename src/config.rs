//! docgraph configuration (`docgraph.toml`).
//!
//! Every field has a default, and a missing file means all defaults.
//!
//! ```toml
//! [diff]
//! alignment = "id-aware"
//!
//! [layout]
//! strategy = "time"
//! row_height = 100.0
//!
//! [store]
//! path = "/var/lib/docgraph"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diff::{Alignment, DiffOptions};
use crate::layout::LayoutConfig;

/// Default file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "docgraph.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocgraphConfig {
    #[serde(default)]
    pub diff: DiffConfig,

    /// Graph layout constants.
    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

// ---------------------------------------------------------------------------
// DiffConfig
// ---------------------------------------------------------------------------

/// Structural diff settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiffConfig {
    /// Block alignment (default: `"positional"`).
    #[serde(default)]
    pub alignment: Alignment,
}

impl DiffConfig {
    #[must_use]
    pub const fn options(&self) -> DiffOptions {
        DiffOptions {
            alignment: self.alignment,
        }
    }
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Where documents are kept.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory of the JSON file store (default: `".docgraph"`).
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".docgraph")
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message, with the line number for parse errors.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl DocgraphConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML, bad values or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start].matches('\n').count() + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutStrategy;

    #[test]
    fn defaults_all_fields() {
        let cfg = DocgraphConfig::default();
        assert_eq!(cfg.diff.alignment, Alignment::Positional);
        assert_eq!(cfg.layout.strategy, LayoutStrategy::Depth);
        assert_eq!(cfg.layout.branch_spacing, 250.0);
        assert_eq!(cfg.layout.base_x_offset, 150.0);
        assert_eq!(cfg.layout.base_y_offset, 100.0);
        assert_eq!(cfg.layout.height_range, 400.0);
        assert_eq!(cfg.store.path, PathBuf::from(".docgraph"));
    }

    #[test]
    fn parse_empty_string() {
        let cfg = DocgraphConfig::parse("").unwrap();
        assert_eq!(cfg, DocgraphConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[diff]
alignment = "id-aware"

[layout]
strategy = "time"
branch_spacing = 200.0
base_x_offset = 50.0
base_y_offset = 20.0
height_range = 600.0
row_height = 90.0
draft_offset = 40.0

[store]
path = "/srv/docs"
"#;
        let cfg = DocgraphConfig::parse(toml).unwrap();
        assert_eq!(cfg.diff.options().alignment, Alignment::IdAware);
        assert_eq!(cfg.layout.strategy, LayoutStrategy::Time);
        assert_eq!(cfg.layout.branch_spacing, 200.0);
        assert_eq!(cfg.layout.row_height, 90.0);
        assert_eq!(cfg.layout.draft_offset, 40.0);
        assert_eq!(cfg.store.path, PathBuf::from("/srv/docs"));
    }

    #[test]
    fn parse_partial_layout_uses_defaults() {
        let cfg = DocgraphConfig::parse("[layout]\nrow_height = 60.0\n").unwrap();
        assert_eq!(cfg.layout.row_height, 60.0);
        assert_eq!(cfg.layout.branch_spacing, 250.0);
        assert_eq!(cfg.layout.strategy, LayoutStrategy::Depth);
    }

    #[test]
    fn parse_rejects_unknown_top_level_field() {
        let err = DocgraphConfig::parse("[remote]\nurl = \"x\"\n").unwrap_err();
        assert!(err.message.contains("unknown field"), "{}", err.message);
    }

    #[test]
    fn parse_rejects_unknown_nested_field() {
        let err = DocgraphConfig::parse("[layout]\nzoom = 2.0\n").unwrap_err();
        assert!(err.message.contains("zoom"), "{}", err.message);
    }

    #[test]
    fn parse_rejects_invalid_alignment() {
        let err = DocgraphConfig::parse("[diff]\nalignment = \"fuzzy\"\n").unwrap_err();
        assert!(err.message.contains("fuzzy"), "{}", err.message);
    }

    #[test]
    fn parse_includes_line_number_on_error() {
        let toml = "[diff]\nalignment = \"positional\"\n[layout]\nstrategy = 3\n";
        let err = DocgraphConfig::parse(toml).unwrap_err();
        assert!(err.message.starts_with("line "), "{}", err.message);
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let cfg = DocgraphConfig::load(Path::new("/nonexistent/docgraph.toml")).unwrap();
        assert_eq!(cfg, DocgraphConfig::default());
    }

    #[test]
    fn load_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[store]\npath = \"data\"\n").unwrap();
        let cfg = DocgraphConfig::load(&path).unwrap();
        assert_eq!(cfg.store.path, PathBuf::from("data"));
    }

    #[test]
    fn load_invalid_file_shows_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid [[[toml").unwrap();
        let err = DocgraphConfig::load(&path).unwrap_err();
        assert_eq!(err.path.as_deref(), Some(path.as_path()));
        assert!(err.to_string().starts_with(&path.display().to_string()));
    }

    #[test]
    fn config_error_display_without_path() {
        let err = ConfigError {
            path: None,
            message: "parse error".to_owned(),
        };
        assert_eq!(err.to_string(), "config error: parse error");
    }
}
