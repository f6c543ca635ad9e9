//! Build and trace settings, loadable from a TOML file.
//!
//! ```toml
//! [build]
//! parallel_depth = 2
//!
//! [trace]
//! t_min = 0.0001
//! traversal = "auto"
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the hierarchy is walked per ray
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalMode {
    /// Stackless when the tree is shallow enough, otherwise the explicit stack
    #[default]
    Auto,
    /// Parent links plus a per level revisit mask
    Stackless,
    /// Fixed capacity stack of pending nodes
    Stack,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Subtrees are built concurrently above this recursion depth
    pub parallel_depth: u32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { parallel_depth: 2 }
    }
}

impl BuildConfig {
    pub fn serial() -> Self {
        Self { parallel_depth: 0 }
    }

    pub fn parallel_depth(mut self, depth: u32) -> Self {
        self.parallel_depth = depth;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Start of the valid range, keeps secondary rays off their own surface
    pub t_min: f32,
    pub traversal: TraversalMode,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            t_min: 1e-4,
            traversal: TraversalMode::Auto,
        }
    }
}

impl TraceConfig {
    pub fn t_min(mut self, t_min: f32) -> Self {
        self.t_min = t_min;
        self
    }

    pub fn traversal(mut self, traversal: TraversalMode) -> Self {
        self.traversal = traversal;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub build: BuildConfig,
    pub trace: TraceConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {:?}", path))?;

        Self::from_toml_str(&source).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.build.parallel_depth, 2);
        assert_eq!(config.trace.traversal, TraversalMode::Auto);
    }

    #[test]
    fn parses_all_fields() {
        let config = Config::from_toml_str(
            r#"
            [build]
            parallel_depth = 0

            [trace]
            t_min = 0.01
            traversal = "stack"
            "#,
        )
        .unwrap();

        assert_eq!(config.build, BuildConfig::serial());
        assert_eq!(config.trace, TraceConfig::default().t_min(0.01).traversal(TraversalMode::Stack));
    }

    #[test]
    fn partial_tables_keep_defaults() {
        let config = Config::from_toml_str("[trace]\ntraversal = \"stackless\"\n").unwrap();
        assert_eq!(config.trace.traversal, TraversalMode::Stackless);
        assert_eq!(config.trace.t_min, 1e-4);
        assert_eq!(config.build, BuildConfig::default());
    }

    #[test]
    fn rejects_unknown_traversal() {
        assert!(Config::from_toml_str("[trace]\ntraversal = \"sideways\"\n").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::load("does/not/exist.toml").unwrap_err();
        assert!(format!("{:#}", err).contains("does/not/exist.toml"));
    }
}
