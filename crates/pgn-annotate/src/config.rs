//! Configuration file loading for the annotator.
//!
//! Engines, analysis limits, classification thresholds and annotator
//! settings come from `annotate.toml`. A missing file means defaults.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chess_analysis::{AnalysisConfig, Annotator, MoveQuality, SessionConfig, Thresholds, DEFAULT_HINT_PLIES};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or using the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// An engine option value is neither a string, a number nor a boolean.
    #[error("Engine {engine}: unsupported value for option {option}")]
    OptionValue { engine: String, option: String },
}

/// A UCI engine the annotator may launch.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EngineConfig {
    /// Executable path or a program name looked up in `PATH`.
    pub path: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    /// Options sent after the handshake. An empty string presses a button.
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
    /// Acknowledgement timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl EngineConfig {
    /// Engine found by name or path, without options.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
            options: BTreeMap::new(),
            timeout_secs: None,
        }
    }

    /// Options as `setoption` name/value pairs.
    pub fn uci_options(&self, engine: &str) -> Result<Vec<(String, Option<String>)>, ConfigError> {
        self.options
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    toml::Value::String(s) if s.is_empty() => None,
                    toml::Value::String(s) => Some(s.clone()),
                    toml::Value::Integer(n) => Some(n.to_string()),
                    toml::Value::Boolean(b) => Some(b.to_string()),
                    _ => {
                        return Err(ConfigError::OptionValue {
                            engine: engine.to_string(),
                            option: name.clone(),
                        })
                    }
                };
                Ok((name.clone(), value))
            })
            .collect()
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig {
            args: self.args.clone(),
            ..SessionConfig::default()
        };
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}

/// How annotated games are labelled.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnnotatorSettings {
    /// Value of the `Annotator` header. Defaults to the engine's name.
    pub name: Option<String>,
    /// Move classes that get the engine's lines as variations.
    pub variations: Vec<MoveQuality>,
    /// Plies kept from each engine line. Zero disables variations.
    pub hint_plies: usize,
}

impl Default for AnnotatorSettings {
    fn default() -> Self {
        Self {
            name: None,
            variations: vec![MoveQuality::Blunder],
            hint_plies: DEFAULT_HINT_PLIES,
        }
    }
}

/// Contents of `annotate.toml`.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct AnnotateConfig {
    /// Engine used when none is named on the command line.
    #[serde(default)]
    pub default_engine: Option<String>,
    #[serde(default)]
    pub engines: HashMap<String, EngineConfig>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub annotator: AnnotatorSettings,
}

impl AnnotateConfig {
    /// Loads the configuration from `path`, or defaults when the file does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::read(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Reads a configuration file that must exist.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Returns the default configuration path, `annotate.toml` in the
    /// current working directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from("annotate.toml")
    }

    /// Picks an engine. A name that is not configured is taken as the path
    /// of the executable. Without a name the default engine is used, then
    /// the only configured engine, then `stockfish` from `PATH`.
    pub fn engine(&self, name: Option<&str>) -> (String, EngineConfig) {
        let name = name
            .map(str::to_string)
            .or_else(|| self.default_engine.clone())
            .or_else(|| match self.engines.len() {
                1 => self.engines.keys().next().cloned(),
                _ => None,
            })
            .unwrap_or_else(|| "stockfish".to_string());
        let engine = self
            .engines
            .get(&name)
            .cloned()
            .unwrap_or_else(|| EngineConfig::from_path(&name));
        (name, engine)
    }

    /// An annotator using these thresholds, labelled with the configured
    /// name or `fallback_name`.
    pub fn annotator(&self, fallback_name: &str) -> Annotator {
        let name = self.annotator.name.clone().unwrap_or_else(|| fallback_name.to_string());
        Annotator::new(name)
            .with_thresholds(self.thresholds)
            .with_variations_for(self.annotator.variations.iter().copied())
            .with_hint_plies(self.annotator.hint_plies)
    }
}
