//! Console configuration
//!
//! Loaded from TOML; every section has defaults so an empty file is a
//! valid configuration.

use crate::error::ConfigError;
use crate::focus::{NodeRegistry, Vec3};
use crate::format::{CurrencyFormat, DigitGrouping};
use audit_model::NodeRef;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Analysis Engine connection
    pub engine: EngineConfig,
    /// Camera rig behaviour
    pub focus: FocusConfig,
    /// Display formatting
    pub display: DisplayConfig,
    /// Known node layout
    pub graph: GraphConfig,
}

impl ConsoleConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With engine base URL
    #[inline]
    #[must_use]
    pub fn with_engine_url(mut self, url: impl Into<String>) -> Self {
        self.engine.base_url = url.into();
        self
    }

    /// With client-side request timeout
    #[inline]
    #[must_use]
    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.engine.request_timeout_ms = Some(timeout_ms);
        self
    }

    /// With return period
    #[inline]
    #[must_use]
    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.engine.period = period.into();
        self
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// `ConfigError::Parse` on syntax errors, `ConfigError::Invalid` on bad values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`ConsoleConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ConfigError::Invalid` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("engine.base_url is empty".into()));
        }
        if self.engine.period.trim().is_empty() {
            return Err(ConfigError::Invalid("engine.period is empty".into()));
        }
        if self.engine.request_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "engine.request_timeout_ms must be positive".into(),
            ));
        }
        if self.display.short_id_len == 0 {
            return Err(ConfigError::Invalid("display.short_id_len must be positive".into()));
        }
        for (name, v) in [
            ("focus.camera_offset", self.focus.camera_offset),
            ("focus.default_camera", self.focus.default_camera),
            ("focus.default_anchor", self.focus.default_anchor),
        ] {
            if !v.is_finite() {
                return Err(ConfigError::Invalid(format!("{name} is not finite")));
            }
        }
        for node in &self.graph.nodes {
            node.id
                .parse::<NodeRef>()
                .map_err(|e| ConfigError::Invalid(format!("graph node {:?}: {e}", node.id)))?;
            if !node.position.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "graph node {} has a non-finite position",
                    node.id
                )));
            }
        }
        Ok(())
    }
}

/// Analysis Engine connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL, e.g. `http://127.0.0.1:8000`
    pub base_url: String,
    /// Return period sent with every analysis
    pub period: String,
    /// Client-side timeout; `None` leaves the transport default
    pub request_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            period: "2024-09".to_string(),
            request_timeout_ms: None,
        }
    }
}

/// Camera rig settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Camera offset from a focused node (above and in front)
    pub camera_offset: Vec3,
    /// Idle camera position
    pub default_camera: Vec3,
    /// Idle look-at anchor
    pub default_anchor: Vec3,
    /// Focus transition length
    pub transition_ms: u64,
    /// Return-to-default transition length
    pub reset_ms: u64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            camera_offset: Vec3::new(0.0, 2.0, 4.0),
            default_camera: Vec3::new(0.0, 0.0, 15.0),
            default_anchor: Vec3::ZERO,
            transition_ms: 2000,
            reset_ms: 2000,
        }
    }
}

/// Display formatting settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Currency symbol prefix
    pub currency_symbol: String,
    /// Digit grouping
    pub grouping: DigitGrouping,
    /// Characters kept when shortening node ids
    pub short_id_len: usize,
    /// Suffix appended to shortened ids
    pub ellipsis: String,
}

impl DisplayConfig {
    /// Currency formatter for these settings
    #[must_use]
    pub fn currency(&self) -> CurrencyFormat {
        CurrencyFormat::new(self.currency_symbol.clone(), self.grouping)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "₹".to_string(),
            grouping: DigitGrouping::Indian,
            short_id_len: 8,
            ellipsis: "...".to_string(),
        }
    }
}

/// Node layout section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Registered nodes
    pub nodes: Vec<NodeEntry>,
}

impl GraphConfig {
    /// Build the registry; entries that fail to parse are skipped
    ///
    /// Loaded configs are validated, so nothing is skipped in practice.
    #[must_use]
    pub fn registry(&self) -> NodeRegistry {
        self.nodes
            .iter()
            .filter_map(|n| n.id.parse::<NodeRef>().ok().map(|id| (id, n.position)))
            .collect()
    }
}

/// One `[[graph.nodes]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEntry {
    /// `Type:id`
    pub id: String,
    /// Scene position `[x, y, z]`
    pub position: Vec3,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [engine]
        base_url = "http://engine.local:9000"
        request_timeout_ms = 5000

        [display]
        grouping = "western"

        [[graph.nodes]]
        id = "Taxpayer:GSTIN_A"
        position = [-5.0, 0.0, -2.0]

        [[graph.nodes]]
        id = "Invoice:INV-BD-1"
        position = [0.0, -1.0, 1.0]
    "#;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ConsoleConfig::from_toml_str("").unwrap();
        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.engine.period, "2024-09");
        assert_eq!(config.focus.transition_ms, 2000);
    }

    #[test]
    fn sample_config_parses() {
        let config = ConsoleConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.engine.base_url, "http://engine.local:9000");
        assert_eq!(config.engine.request_timeout_ms, Some(5000));
        assert_eq!(config.engine.period, "2024-09");
        assert_eq!(config.display.grouping, DigitGrouping::Western);

        let registry = config.graph.registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.position(&NodeRef::invoice("INV-BD-1")),
            Some(Vec3::new(0.0, -1.0, 1.0))
        );
    }

    #[test]
    fn invalid_values_rejected() {
        let zero_len = "[display]\nshort_id_len = 0\n";
        assert!(matches!(
            ConsoleConfig::from_toml_str(zero_len),
            Err(ConfigError::Invalid(_))
        ));

        let empty_url = "[engine]\nbase_url = \"\"\n";
        assert!(matches!(
            ConsoleConfig::from_toml_str(empty_url),
            Err(ConfigError::Invalid(_))
        ));

        assert!(matches!(
            ConsoleConfig::from_toml_str("[engine\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = ConsoleConfig::load(file.path()).unwrap();
        assert_eq!(config.graph.nodes.len(), 2);

        let missing = ConsoleConfig::load("/definitely/not/here.toml");
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn builders() {
        let config = ConsoleConfig::new()
            .with_engine_url("http://x")
            .with_request_timeout_ms(10)
            .with_period("2024-10");
        assert_eq!(config.engine.base_url, "http://x");
        assert_eq!(config.engine.request_timeout_ms, Some(10));
        assert_eq!(config.engine.period, "2024-10");
    }
}
