//! Configuration model and JSON loader.
//!
//! JSON (de)serialization is handled by `serde`/`serde_json` rather than a
//! hand-rolled parser.

use crate::error::ConfigError;
use crate::fs::FileSystem;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The category an [`InsightCategory`]-tagged rule flags a path as.
///
/// Kept a closed enum (not an open `Other(String)` variant): the heap and
/// aggregate bookkeeping in [`crate::insight`] allocates one slot per
/// variant at `generate_insights` start, which only works for a fixed,
/// known set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Temp,
    Cache,
    BuildArtifact,
}

impl InsightCategory {
    #[must_use]
    pub const fn all() -> [InsightCategory; 3] {
        [InsightCategory::Temp, InsightCategory::Cache, InsightCategory::BuildArtifact]
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            InsightCategory::Temp => "Temp",
            InsightCategory::Cache => "Cache",
            InsightCategory::BuildArtifact => "Build Artifact",
        }
    }
}

/// Which kind of scan node a [`PatternRule`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyTo {
    File,
    Dir,
    Both,
}

impl ApplyTo {
    #[must_use]
    pub fn matches_file(self) -> bool {
        matches!(self, ApplyTo::File | ApplyTo::Both)
    }

    #[must_use]
    pub fn matches_dir(self) -> bool {
        matches!(self, ApplyTo::Dir | ApplyTo::Both)
    }

    #[must_use]
    pub fn to_str(self) -> &'static str {
        match self {
            ApplyTo::File => "file",
            ApplyTo::Dir => "dir",
            ApplyTo::Both => "both",
        }
    }

    #[must_use]
    pub fn from_str(value: &str) -> Self {
        match value {
            "file" => ApplyTo::File,
            "dir" => ApplyTo::Dir,
            _ => ApplyTo::Both,
        }
    }
}

impl Serialize for ApplyTo {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.to_str())
    }
}

impl<'de> Deserialize<'de> for ApplyTo {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ApplyTo::from_str(&raw))
    }
}

impl Default for ApplyTo {
    fn default() -> Self {
        ApplyTo::Both
    }
}

/// One classification rule: a glob `pattern` mapped to a `category`, with an
/// `apply_to` scope and an optional `stop_recursion` flag for build-artifact
/// roots like `node_modules`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRule {
    pub name: String,
    pub pattern: String,
    pub category: InsightCategory,
    #[serde(default)]
    pub apply_to: ApplyTo,
    #[serde(default)]
    pub stop_recursion: bool,
}

impl PatternRule {
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, category: InsightCategory) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            category,
            apply_to: ApplyTo::Both,
            stop_recursion: false,
        }
    }

    #[must_use]
    pub fn stopping(mut self) -> Self {
        self.stop_recursion = true;
        self
    }

    #[must_use]
    pub fn applying_to(mut self, apply_to: ApplyTo) -> Self {
        self.apply_to = apply_to;
        self
    }
}

macro_rules! int_fields {
    ($($json_key:literal, $attr:ident, $minimum:literal;)*) => {
        const INT_FIELDS: &[(&str, &str, u32)] = &[$(($json_key, stringify!($attr), $minimum)),*];

        /// Clamp `value` to the minimum registered for `field_name`, or return it
        /// unchanged if `field_name` is not a known integer knob.
        #[must_use]
        pub fn clamp_field(value: u32, field_name: &str) -> u32 {
            for (_, attr, minimum) in INT_FIELDS {
                if *attr == field_name {
                    return value.max(*minimum);
                }
            }
            value
        }
    };
}

int_fields! {
    "scanWorkers", scan_workers, 1;
    "topCount", top_count, 1;
    "pageSize", page_size, 10;
    "maxInsightsPerCategory", max_insights_per_category, 10;
    "overviewTopDirs", overview_top_dirs, 5;
    "scrollStep", scroll_step, 1;
}

/// All tunables: the pattern ruleset, user-marked additional paths, and the
/// integer knobs enumerated in [`INT_FIELDS`], each with an enforced
/// minimum applied on every load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub patterns: Vec<PatternRule>,
    #[serde(default)]
    pub additional_paths: HashMap<InsightCategory, Vec<String>>,
    #[serde(default)]
    pub max_depth: Option<u32>,
    #[serde(default = "defaults::scan_workers")]
    pub scan_workers: u32,
    #[serde(default = "defaults::top_count")]
    pub top_count: u32,
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,
    #[serde(default = "defaults::max_insights_per_category")]
    pub max_insights_per_category: u32,
    #[serde(default = "defaults::overview_top_dirs")]
    pub overview_top_dirs: u32,
    #[serde(default = "defaults::scroll_step")]
    pub scroll_step: u32,
}

mod defaults {
    pub(super) fn scan_workers() -> u32 {
        4
    }
    pub(super) fn top_count() -> u32 {
        15
    }
    pub(super) fn page_size() -> u32 {
        100
    }
    pub(super) fn max_insights_per_category() -> u32 {
        1000
    }
    pub(super) fn overview_top_dirs() -> u32 {
        100
    }
    pub(super) fn scroll_step() -> u32 {
        20
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
            additional_paths: HashMap::new(),
            max_depth: None,
            scan_workers: defaults::scan_workers(),
            top_count: defaults::top_count(),
            page_size: defaults::page_size(),
            max_insights_per_category: defaults::max_insights_per_category(),
            overview_top_dirs: defaults::overview_top_dirs(),
            scroll_step: defaults::scroll_step(),
        }
    }
}

impl AppConfig {
    /// Parse `AppConfig` from a JSON document, falling back to `defaults`
    /// for any field the document omits and clamping every integer knob to
    /// its enforced minimum.
    ///
    /// # Errors
    /// Returns [`ConfigError::Json`] if `text` is not valid JSON for this
    /// shape, or [`ConfigError::InvalidDocument`] if it parses to something
    /// other than a JSON object.
    pub fn from_json(text: &str, path: &str, defaults: &AppConfig) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(|source| ConfigError::Json {
            path: path.to_owned(),
            source,
        })?;
        if !value.is_object() {
            return Err(ConfigError::InvalidDocument { path: path.to_owned() });
        }
        let mut config: AppConfig = serde_json::from_value(value).map_err(|source| ConfigError::Json {
            path: path.to_owned(),
            source,
        })?;

        if config.patterns.is_empty() {
            config.patterns = defaults.patterns.clone();
        }
        if config.additional_paths.is_empty() {
            config.additional_paths = defaults.additional_paths.clone();
        }
        config.scan_workers = clamp_field(config.scan_workers, "scan_workers");
        config.top_count = clamp_field(config.top_count, "top_count");
        config.page_size = clamp_field(config.page_size, "page_size");
        config.max_insights_per_category = clamp_field(config.max_insights_per_category, "max_insights_per_category");
        config.overview_top_dirs = clamp_field(config.overview_top_dirs, "overview_top_dirs");
        config.scroll_step = clamp_field(config.scroll_step, "scroll_step");
        Ok(config)
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Load the config at `~/.config/dux/config.json` (or `path`, if
    /// given), falling back to [`AppConfig::default`] when the file does
    /// not exist.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] if the file exists but cannot be read,
    /// or any error [`AppConfig::from_json`] can return.
    pub fn load(path: Option<&str>, fs: &dyn FileSystem) -> Result<Self, ConfigError> {
        const DEFAULT_CONFIG_PATH: &str = "~/.config/dux/config.json";
        let resolved = fs.expanduser(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if !fs.exists(&resolved) {
            return Ok(AppConfig::default());
        }
        let text = fs.read_text(&resolved).map_err(|source| ConfigError::Io {
            path: resolved.clone(),
            source,
        })?;
        AppConfig::from_json(&text, &resolved, &AppConfig::default())
    }
}

#[must_use]
pub fn sample_config_json() -> String {
    AppConfig::default().to_json()
}

fn default_patterns() -> Vec<PatternRule> {
    use InsightCategory::{BuildArtifact, Cache, Temp};
    vec![
        PatternRule::new("Node modules", "**/node_modules/**", BuildArtifact).stopping(),
        PatternRule::new("Rust target dir", "**/target/**", BuildArtifact).stopping(),
        PatternRule::new("Python bytecode cache", "**/__pycache__/**", BuildArtifact).stopping(),
        PatternRule::new("Build output", "**/{build,dist}/**", BuildArtifact).stopping(),
        PatternRule::new("Git metadata", "**/.git/**", BuildArtifact),
        PatternRule::new("User cache directory", "**/.cache/**", Cache),
        PatternRule::new("System temp directory", "**/tmp/**", Temp),
        PatternRule::new("Editor swap/backup files", "**/*.{swp,bak}", Temp).applying_to(ApplyTo::File),
        PatternRule::new("Log files", "**/*.log", Temp).applying_to(ApplyTo::File),
        PatternRule::new("Temp files", "**/*.tmp", Temp).applying_to(ApplyTo::File),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_enforced_minima() {
        let config = AppConfig::default();
        assert!(config.scan_workers >= 1);
        assert!(config.page_size >= 10);
        assert!(!config.patterns.is_empty());
    }

    #[test]
    fn from_json_clamps_below_minimum_knobs() {
        let json = r#"{"scanWorkers": 0, "pageSize": 1}"#;
        let config = AppConfig::from_json(json, "test.json", &AppConfig::default()).unwrap();
        assert_eq!(config.scan_workers, 1);
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn from_json_rejects_non_object_document() {
        let err = AppConfig::from_json("[1,2,3]", "test.json", &AppConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDocument { .. }));
    }

    #[test]
    fn round_trips_through_json() {
        let config = AppConfig::default();
        let json = config.to_json();
        let parsed = AppConfig::from_json(&json, "test.json", &AppConfig::default()).unwrap();
        assert_eq!(parsed.scan_workers, config.scan_workers);
        assert_eq!(parsed.patterns.len(), config.patterns.len());
    }

    #[test]
    fn additional_paths_round_trip_with_camel_case_keys() {
        let mut config = AppConfig::default();
        config.additional_paths.insert(InsightCategory::Cache, vec!["/home/u/.cache".to_owned()]);
        config.additional_paths.insert(InsightCategory::BuildArtifact, vec!["/home/u/builds".to_owned()]);

        let json = config.to_json();
        assert!(json.contains("\"additionalPaths\""));
        assert!(json.contains("\"cache\""));
        assert!(json.contains("\"build_artifact\""));

        let parsed = AppConfig::from_json(&json, "test.json", &AppConfig::default()).unwrap();
        assert_eq!(parsed.additional_paths[&InsightCategory::Cache], vec!["/home/u/.cache".to_owned()]);
        assert_eq!(parsed.additional_paths[&InsightCategory::BuildArtifact], vec!["/home/u/builds".to_owned()]);
    }
}
