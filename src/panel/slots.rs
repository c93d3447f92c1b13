//! Command slots of the control panel.
//!
//! The panel is a grid of labelled buttons grouped in columns. Each slot holds
//! a [`SlotAction`]: one of the built-in session operations, a user supplied
//! SCPI sequence, or nothing at all. Running a slot drives the session and
//! returns a [`SlotOutput`] for the front end to display or export.

use crate::error::{FieldFoxError, FieldFoxResult};
use crate::instrument::{FieldFoxSession, Trace};
use crate::traits::ScpiEndpoint;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Title of the column holding the built-in operations.
pub const GENERAL_COLUMN: &str = "General";
/// Default columns as (title, slot count).
pub const DEFAULT_COLUMNS: [(&str, usize); 4] = [
    (GENERAL_COLUMN, 4),
    ("Control Setup 1", 4),
    ("Control Setup 2", 4),
    ("Control Setup 3", 16),
];

/// What a slot does when pressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotAction {
    /// Spectrum analyzer setup for power measurements
    SpectrumSetup,
    /// Network analyzer setup for S-parameter phase
    NetworkSetup,
    /// Peak search; reports the trace maximum
    MaximumPower,
    /// Read trace 1 with its frequency axis
    Trace,
    /// Store the display as `<name>.s2p` on the instrument
    SaveTrace {
        /// File name without extension
        name: String,
    },
    /// Raw SCPI sequence; commands ending in `?` are queried
    Scpi {
        /// Commands in send order
        commands: Vec<String>,
    },
    /// Placeholder that does nothing
    Unassigned,
}

/// A labelled button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSlot {
    /// Button text
    pub label: String,
    /// What pressing it does
    pub action: SlotAction,
}

impl CommandSlot {
    /// Slot with the given label and action
    pub fn new(label: impl Into<String>, action: SlotAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// One titled column of slots.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelColumn {
    /// Column heading
    pub title: String,
    /// Slots from top to bottom
    pub slots: Vec<CommandSlot>,
}

/// Result of running a slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotOutput {
    /// Operation finished with nothing to show
    Done,
    /// Maximum power in dBm
    Power(f64),
    /// Trace data
    Trace(Trace),
    /// (query, reply) pairs from a SCPI sequence
    Replies(Vec<(String, String)>),
    /// Label of a slot with no action
    Unassigned(String),
}

impl SlotOutput {
    /// Text lines for the panel's output box
    ///
    /// Power is shown with two decimals.
    pub fn display_values(&self) -> Vec<String> {
        match self {
            SlotOutput::Done => Vec::new(),
            SlotOutput::Power(dbm) => vec![format!("{:.2}", round_to(*dbm, 2))],
            SlotOutput::Trace(trace) => trace
                .amplitudes
                .iter()
                .map(|value| value.to_string())
                .collect(),
            SlotOutput::Replies(replies) => replies
                .iter()
                .map(|(query, reply)| format!("{} {}", query, reply))
                .collect(),
            SlotOutput::Unassigned(label) => vec![format!("'{}' has no command assigned", label)],
        }
    }

    /// Numeric values for a spreadsheet column export
    pub fn column_values(&self) -> Vec<f64> {
        match self {
            SlotOutput::Power(dbm) => vec![round_to(*dbm, 2)],
            SlotOutput::Trace(trace) => trace.amplitudes.clone(),
            _ => Vec::new(),
        }
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// The button grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandPanel {
    columns: Vec<PanelColumn>,
}

impl Default for CommandPanel {
    fn default() -> Self {
        Self::default_layout()
    }
}

impl CommandPanel {
    /// The bench layout: the general operations in the first column and
    /// unassigned "Test N" slots in the three control setup columns
    pub fn default_layout() -> Self {
        let columns = DEFAULT_COLUMNS
            .iter()
            .map(|(title, count)| PanelColumn {
                title: title.to_string(),
                slots: (1..=*count)
                    .map(|n| CommandSlot::new(format!("Test {}", n), SlotAction::Unassigned))
                    .collect(),
            })
            .collect();

        let mut panel = Self { columns };
        let general = [
            ("Power Measurement setup", SlotAction::SpectrumSetup),
            ("S-Parameters setup", SlotAction::NetworkSetup),
            ("Get max power", SlotAction::MaximumPower),
            ("Plot power attenuation", SlotAction::Trace),
        ];
        if let Some(column) = panel.columns.first_mut() {
            column.slots = general
                .into_iter()
                .map(|(label, action)| CommandSlot::new(label, action))
                .collect();
        }
        panel
    }

    /// Columns from left to right
    pub fn columns(&self) -> &[PanelColumn] {
        &self.columns
    }

    /// Look up a slot by column title (case-insensitive) and 1-based row
    pub fn slot(&self, column: &str, row: usize) -> FieldFoxResult<&CommandSlot> {
        self.columns
            .iter()
            .find(|c| c.title.eq_ignore_ascii_case(column))
            .and_then(|c| row.checked_sub(1).and_then(|i| c.slots.get(i)))
            .ok_or_else(|| FieldFoxError::SlotNotFound(format!("{} #{}", column, row)))
    }

    /// Replace the slot at `column`/`row` (1-based)
    pub fn assign(&mut self, column: &str, row: usize, slot: CommandSlot) -> FieldFoxResult<()> {
        let target = self
            .columns
            .iter_mut()
            .find(|c| c.title.eq_ignore_ascii_case(column))
            .and_then(|c| row.checked_sub(1).and_then(move |i| c.slots.get_mut(i)))
            .ok_or_else(|| FieldFoxError::SlotNotFound(format!("{} #{}", column, row)))?;
        *target = slot;
        Ok(())
    }

    /// Run the slot at `column`/`row` against `session`
    pub async fn run<E: ScpiEndpoint>(
        &self,
        column: &str,
        row: usize,
        session: &mut FieldFoxSession<E>,
    ) -> FieldFoxResult<SlotOutput> {
        let slot = self.slot(column, row)?;
        info!("Running panel slot '{}' ({} #{})", slot.label, column, row);
        execute(slot, session).await
    }
}

/// Run one slot's action
pub async fn execute<E: ScpiEndpoint>(
    slot: &CommandSlot,
    session: &mut FieldFoxSession<E>,
) -> FieldFoxResult<SlotOutput> {
    match &slot.action {
        SlotAction::SpectrumSetup => {
            session.configure_spectrum_mode().await?;
            Ok(SlotOutput::Done)
        }
        SlotAction::NetworkSetup => {
            session.configure_network_analyzer_mode().await?;
            Ok(SlotOutput::Done)
        }
        SlotAction::MaximumPower => Ok(SlotOutput::Power(session.maximum_power().await?)),
        SlotAction::Trace => Ok(SlotOutput::Trace(session.trace().await?)),
        SlotAction::SaveTrace { name } => {
            session.save_trace(name).await?;
            Ok(SlotOutput::Done)
        }
        SlotAction::Scpi { commands } => {
            let mut replies = Vec::new();
            for cmd in commands {
                if let Some(reply) = session.command(cmd).await? {
                    replies.push((cmd.clone(), reply));
                }
            }
            Ok(SlotOutput::Replies(replies))
        }
        SlotAction::Unassigned => {
            debug!("Slot '{}' pressed with nothing assigned", slot.label);
            Ok(SlotOutput::Unassigned(slot.label.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockScpiEndpoint;
    use crate::instrument::SessionSettings;

    #[test]
    fn test_default_layout_shape() {
        let panel = CommandPanel::default_layout();
        let sizes: Vec<usize> = panel.columns().iter().map(|c| c.slots.len()).collect();
        assert_eq!(sizes, vec![4, 4, 4, 16]);
        assert_eq!(
            panel.slot("general", 3).unwrap().action,
            SlotAction::MaximumPower
        );
        assert_eq!(
            panel.slot("Control Setup 3", 16).unwrap().label,
            "Test 16"
        );
    }

    #[test]
    fn test_slot_lookup_out_of_range() {
        let panel = CommandPanel::default_layout();
        assert!(panel.slot("General", 0).is_err());
        assert!(panel.slot("General", 5).is_err());
        assert!(panel.slot("Nowhere", 1).is_err());
    }

    #[test]
    fn test_assign_slot() {
        let mut panel = CommandPanel::default_layout();
        let slot = CommandSlot::new(
            "Clear status",
            SlotAction::Scpi {
                commands: vec!["*CLS".to_string()],
            },
        );
        panel.assign("Control Setup 1", 2, slot.clone()).unwrap();
        assert_eq!(panel.slot("Control Setup 1", 2).unwrap(), &slot);
    }

    #[test]
    fn test_power_display_rounds() {
        let output = SlotOutput::Power(-23.456);
        assert_eq!(output.display_values(), vec!["-23.46"]);
        assert_eq!(output.column_values(), vec![-23.46]);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(-0.125, 1), -0.1);
        assert_eq!(round_to(2.5, 0), 3.0);
    }

    #[tokio::test]
    async fn test_unassigned_slot_is_a_no_op() {
        let mock = MockScpiEndpoint::fieldfox(401, -23.5);
        let mut session = FieldFoxSession::open(mock.clone(), SessionSettings::new(1.0e9, 1.0e8))
            .await
            .unwrap();
        mock.clear_log();

        let panel = CommandPanel::default_layout();
        let output = panel.run("Control Setup 2", 1, &mut session).await.unwrap();
        assert_eq!(output, SlotOutput::Unassigned("Test 1".to_string()));
        assert!(mock.commands().is_empty());
    }

    #[tokio::test]
    async fn test_scpi_slot_collects_query_replies() {
        let mock = MockScpiEndpoint::fieldfox(401, -23.5);
        let mut session = FieldFoxSession::open(mock.clone(), SessionSettings::new(1.0e9, 1.0e8))
            .await
            .unwrap();
        mock.clear_log();

        let slot = CommandSlot::new(
            "Check errors",
            SlotAction::Scpi {
                commands: vec!["*CLS".to_string(), "SYST:ERR?".to_string()],
            },
        );
        let output = execute(&slot, &mut session).await.unwrap();
        assert_eq!(
            output,
            SlotOutput::Replies(vec![(
                "SYST:ERR?".to_string(),
                "+0,\"No error\"".to_string()
            )])
        );
        assert_eq!(mock.writes(), vec!["*CLS"]);
    }
}
