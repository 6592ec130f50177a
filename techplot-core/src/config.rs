//! Report configuration, loaded from an optional TOML file.
//!
//! Every section and field is optional; anything left out keeps its default.
//!
//! ```toml
//! [render]
//! width = 1280
//! height = 960
//! format = "svg"
//! output_dir = "charts"
//!
//! [backtest]
//! layout = "compact"
//! join = "inner"
//!
//! [signal]
//! layout = "auto"
//! band_indicators = ["BollingerBands", "KeltnerChannels"]
//!
//! [markers]
//! long = ["Long"]
//! short = ["Short"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chart::{BacktestLayout, ImageFormat, SignalLayout, DEFAULT_BAND_INDICATORS};
use crate::data::JoinPolicy;
use crate::trade::MarkerSet;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub render: RenderConfig,
    pub backtest: BacktestConfig,
    pub signal: SignalConfig,
    pub markers: MarkerSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub output_dir: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 960,
            height: 720,
            format: ImageFormat::Png,
            output_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub layout: BacktestLayout,
    pub join: JoinPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub layout: SignalLayout,
    pub join: JoinPolicy,
    /// Indicators drawn over the price panel when the layout is `auto`.
    pub band_indicators: Vec<String>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            layout: SignalLayout::Auto,
            join: JoinPolicy::Outer,
            band_indicators: DEFAULT_BAND_INDICATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ReportConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render.width == 0 || self.render.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "image size must be positive, got {}x{}",
                self.render.width, self.render.height
            )));
        }
        if let Some(name) = self
            .markers
            .long
            .iter()
            .find(|n| self.markers.short.contains(n))
        {
            return Err(ConfigError::Invalid(format!(
                "action '{name}' is listed as both long and short"
            )));
        }
        Ok(())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.render.width, self.render.height)
    }
}
