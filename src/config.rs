// Pane engine configuration loaded from TOML.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::pane::{Orientation, PLACEHOLDER_WIDGET};

/// Upper bound for the focus delay; anything longer is a misconfiguration.
const MAX_READY_DELAY_MS: u64 = 1000;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaneConfig {
    pub split: SplitConfig,
    pub focus: FocusConfig,
    pub terminal: TerminalConfig,
}

/// Defaults applied to split actions.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    /// Orientation used when a split request does not name one.
    pub default_orientation: Orientation,
    /// Widget type of the leaf created by a split.
    pub new_widget_type: String,
}

/// Focus handshake timing.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusConfig {
    /// Delay before announcing a widget that was already ready at split time.
    pub ready_delay_ms: u64,
}

/// Terminal lifecycle policy.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalConfig {
    /// Close a pane whose terminal exited when no close callback is registered.
    pub auto_close_on_exit: bool,
}

/// Errors that can occur during config loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("validation error: {0}")]
    Validation(String),
}

// ── Serde intermediate structs ──────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    split: RawSplitConfig,
    focus: RawFocusConfig,
    terminal: RawTerminalConfig,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawSplitConfig {
    default_orientation: String,
    new_widget_type: String,
}

impl Default for RawSplitConfig {
    fn default() -> Self {
        Self {
            default_orientation: "horizontal".to_string(),
            new_widget_type: PLACEHOLDER_WIDGET.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawFocusConfig {
    ready_delay_ms: u64,
}

impl Default for RawFocusConfig {
    fn default() -> Self {
        Self { ready_delay_ms: 30 }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawTerminalConfig {
    auto_close_on_exit: bool,
}

impl Default for RawTerminalConfig {
    fn default() -> Self {
        Self {
            auto_close_on_exit: true,
        }
    }
}

// ── Default impls ───────────────────────────────────────────────────────

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            default_orientation: Orientation::Horizontal,
            new_widget_type: PLACEHOLDER_WIDGET.to_string(),
        }
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self { ready_delay_ms: 30 }
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            auto_close_on_exit: true,
        }
    }
}

// ── Config implementation ───────────────────────────────────────────────

impl FocusConfig {
    pub fn ready_delay(&self) -> Duration {
        Duration::from_millis(self.ready_delay_ms)
    }
}

impl PaneConfig {
    /// Load config from a TOML file path. Returns defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Parse a TOML string into a PaneConfig.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let default_orientation = Orientation::parse(&raw.split.default_orientation)
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "unknown orientation '{}', valid orientations: horizontal, vertical",
                    raw.split.default_orientation
                ))
            })?;

        let config = Self {
            split: SplitConfig {
                default_orientation,
                new_widget_type: raw.split.new_widget_type,
            },
            focus: FocusConfig {
                ready_delay_ms: raw.focus.ready_delay_ms,
            },
            terminal: TerminalConfig {
                auto_close_on_exit: raw.terminal.auto_close_on_exit,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the config, returning an error if any values are out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.split.new_widget_type.trim().is_empty() {
            return Err(ConfigError::Validation(
                "new_widget_type must not be empty".to_string(),
            ));
        }

        if self.focus.ready_delay_ms > MAX_READY_DELAY_MS {
            return Err(ConfigError::Validation(format!(
                "ready_delay_ms must be <= {MAX_READY_DELAY_MS}"
            )));
        }

        Ok(())
    }
}
