//! Configuration System
//!
//! Configuration management using Figment.
//!
//! # Configuration Sources
//!
//! Configuration is loaded from (in order of precedence):
//! 1. Environment variables prefixed with `FIELDFOX_`
//! 2. TOML configuration file (default: `config/fieldfox.toml`)
//!
//! # Example
//!
//! ```no_run
//! use fieldfox_panel::config::PanelConfig;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PanelConfig::load_from("config/fieldfox.toml")?;
//!     println!("Instrument: {}", config.instrument.resource);
//!     println!("Sweep points: {}", config.session.num_points);
//!     Ok(())
//! }
//! ```

pub mod panel_config;

pub use panel_config::{
    ApplicationConfig, InstrumentConfig, PanelConfig, PanelLayoutConfig, SlotDefinition,
};
