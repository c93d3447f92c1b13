//! Configuration System using Figment
//!
//! Configuration is loaded from:
//! 1. `config/fieldfox.toml` (base configuration)
//! 2. Environment variables (prefixed with `FIELDFOX_`, `__` between keys)
//!
//! # Environment Variable Overrides
//!
//! ```text
//! FIELDFOX_APPLICATION__LOG_LEVEL=debug
//! FIELDFOX_INSTRUMENT__RESOURCE="TCPIP::192.168.0.7::INSTR"
//! FIELDFOX_SESSION__NUM_POINTS=201
//! ```

use crate::error::{FieldFoxError, FieldFoxResult};
use crate::hardware::SocketAddress;
use crate::instrument::SessionSettings;
use crate::panel::{SlotAction, DEFAULT_COLUMNS};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Instrument connection
    pub instrument: InstrumentConfig,
    /// Sweep settings applied when the session opens
    pub session: SessionSettings,
    /// Slot assignments on top of the default layout
    #[serde(default)]
    pub panel: PanelLayoutConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Window / report title
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

/// Instrument connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Resource string (e.g., "TCPIP::192.168.0.1::INSTR")
    pub resource: String,
    /// Port used for `::INSTR` resources and bare hosts
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connect and reply timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

impl InstrumentConfig {
    /// Timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Slot overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanelLayoutConfig {
    /// Slot assignments, applied in order
    #[serde(default)]
    pub slots: Vec<SlotDefinition>,
}

/// One slot assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDefinition {
    /// Column title (e.g., "Control Setup 1")
    pub column: String,
    /// 1-based row within the column
    pub row: usize,
    /// Button text
    pub label: String,
    /// What the slot runs
    pub action: SlotAction,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_name() -> String {
    "FieldFox Control Panel".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    crate::hardware::SCPI_SOCKET_PORT
}

fn default_timeout() -> u64 {
    5000
}

// ============================================================================
// Configuration Loading and Validation
// ============================================================================

impl PanelConfig {
    /// Load configuration from `config/fieldfox.toml` and environment variables
    pub fn load() -> FieldFoxResult<Self> {
        Self::load_from("config/fieldfox.toml")
    }

    /// Load configuration from a specific file path
    ///
    /// Environment variables take precedence over the file. The result is
    /// validated before it is returned.
    pub fn load_from<P: AsRef<Path>>(path: P) -> FieldFoxResult<Self> {
        let config: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("FIELDFOX_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - Log level is valid (trace, debug, info, warn, error)
    /// - Resource string parses and the timeout is non-zero
    /// - Span is positive and at least one sweep point is requested
    /// - Slot overrides name an existing column and row
    pub fn validate(&self) -> FieldFoxResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(FieldFoxError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        SocketAddress::parse(&self.instrument.resource, self.instrument.port)?;
        if self.instrument.timeout_ms == 0 {
            return Err(FieldFoxError::Configuration(
                "Invalid timeout_ms 0. Must be > 0".to_string(),
            ));
        }

        let session = &self.session;
        if !session.center_frequency.is_finite() || session.center_frequency <= 0.0 {
            return Err(FieldFoxError::Configuration(format!(
                "Invalid center_frequency {}. Must be > 0",
                session.center_frequency
            )));
        }
        if !session.span.is_finite() || session.span <= 0.0 {
            return Err(FieldFoxError::Configuration(format!(
                "Invalid span {}. Must be > 0",
                session.span
            )));
        }
        if session.num_points == 0 {
            return Err(FieldFoxError::Configuration(
                "Invalid num_points 0. Must be > 0".to_string(),
            ));
        }

        for slot in &self.panel.slots {
            let capacity = DEFAULT_COLUMNS
                .iter()
                .find(|(title, _)| title.eq_ignore_ascii_case(&slot.column))
                .map(|(_, count)| *count)
                .ok_or_else(|| {
                    FieldFoxError::Configuration(format!(
                        "Unknown panel column '{}' for slot '{}'",
                        slot.column, slot.label
                    ))
                })?;
            if slot.row == 0 || slot.row > capacity {
                return Err(FieldFoxError::Configuration(format!(
                    "Slot '{}': row {} out of range 1-{} for column '{}'",
                    slot.label, slot.row, capacity, slot.column
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PanelConfig {
        PanelConfig {
            application: ApplicationConfig::default(),
            instrument: InstrumentConfig {
                resource: "TCPIP::192.168.0.1::INSTR".to_string(),
                port: 5025,
                timeout_ms: 5000,
            },
            session: SessionSettings::new(1.0e9, 100.0e6),
            panel: PanelLayoutConfig::default(),
        }
    }

    #[test]
    fn test_config_validation_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = config();
        config.application.log_level = "loud".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Invalid log_level"));
    }

    #[test]
    fn test_invalid_resource() {
        let mut config = config();
        config.instrument.resource = "GPIB0::5::INSTR".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_span() {
        let mut config = config();
        config.session.span = 0.0;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Invalid span"));
    }

    #[test]
    fn test_zero_points() {
        let mut config = config();
        config.session.num_points = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_slot_out_of_range() {
        let mut config = config();
        config.panel.slots.push(SlotDefinition {
            column: "Control Setup 1".to_string(),
            row: 5,
            label: "Too far".to_string(),
            action: SlotAction::Unassigned,
        });
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("out of range"));
    }

    #[test]
    fn test_slot_unknown_column() {
        let mut config = config();
        config.panel.slots.push(SlotDefinition {
            column: "Control Setup 9".to_string(),
            row: 1,
            label: "Lost".to_string(),
            action: SlotAction::Unassigned,
        });
        assert!(config.validate().is_err());
    }
}
