//! Control panel layer.
//!
//! Everything a front end needs to drive the session from a button grid,
//! without any widget code: the slot grid and its actions, display formatting
//! and the spreadsheet exports.

pub mod export;
pub mod slots;

pub use export::{export_column, export_trace};
pub use slots::{
    execute, round_to, CommandPanel, CommandSlot, PanelColumn, SlotAction, SlotOutput,
    DEFAULT_COLUMNS, GENERAL_COLUMN,
};

use crate::config::PanelLayoutConfig;
use crate::error::FieldFoxResult;

impl CommandPanel {
    /// Default layout with the configured slots applied on top
    pub fn from_config(layout: &PanelLayoutConfig) -> FieldFoxResult<Self> {
        let mut panel = Self::default_layout();
        for def in &layout.slots {
            panel.assign(
                &def.column,
                def.row,
                CommandSlot::new(def.label.clone(), def.action.clone()),
            )?;
        }
        Ok(panel)
    }
}
