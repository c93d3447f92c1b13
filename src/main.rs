//! Command line front end for the FieldFox control panel.
//!
//! Each subcommand is one button of the panel:
//!
//! ```bash
//! fieldfox setup                      # spectrum analyzer setup
//! fieldfox vna-setup                  # S-parameter phase setup
//! fieldfox max-power --csv peak.csv   # peak power, exported as a column
//! fieldfox trace --json               # trace with stimulus axis
//! fieldfox save testSCB               # instrument stores testSCB.s2p
//! fieldfox slots                      # list the panel grid
//! fieldfox run-slot "Control Setup 1" 2
//! ```
//!
//! `--mock` runs against a simulated analyzer instead of the network.
//! `RUST_LOG` overrides the configured log level.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fieldfox_panel::adapters::MockScpiEndpoint;
use fieldfox_panel::config::PanelConfig;
use fieldfox_panel::instrument::FieldFoxSession;
use fieldfox_panel::panel::{export_column, export_trace, CommandPanel, SlotAction, SlotOutput};
use fieldfox_panel::traits::ScpiEndpoint;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fieldfox", version, about = "FieldFox SCPI control panel")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config/fieldfox.toml")]
    config: PathBuf,

    /// Override the configured instrument resource
    #[arg(long)]
    resource: Option<String>,

    /// Use a simulated analyzer
    #[arg(long)]
    mock: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Query the instrument identity
    Idn,
    /// Spectrum analyzer setup for power measurements
    Setup,
    /// Network analyzer setup for S-parameter phase
    VnaSetup,
    /// Peak search and trace maximum
    MaxPower {
        /// Export the rounded value as a spreadsheet column
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Read trace 1 with its frequency axis
    Trace {
        /// Export frequency/amplitude rows
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Store the current display as <NAME>.s2p on the instrument
    Save { name: String },
    /// List the panel slots
    Slots,
    /// Run one panel slot
    RunSlot {
        column: String,
        /// 1-based row
        row: usize,
        /// Export numeric results as a spreadsheet column
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = PanelConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if let Some(resource) = &cli.resource {
        config.instrument.resource = resource.clone();
        config.validate()?;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.application.log_level)),
        )
        .init();

    info!("{}", config.application.name);
    let panel = CommandPanel::from_config(&config.panel)?;

    if let Command::Slots = cli.command {
        print_slots(&panel);
        return Ok(());
    }

    if cli.mock {
        let mock = MockScpiEndpoint::fieldfox(config.session.num_points, -23.5);
        let session = FieldFoxSession::open(mock, config.session.clone()).await?;
        run(&cli, &panel, session).await
    } else {
        let session = FieldFoxSession::connect(&config.instrument, config.session.clone())
            .await
            .with_context(|| format!("Failed to open {}", config.instrument.resource))?;
        run(&cli, &panel, session).await
    }
}

async fn run<E: ScpiEndpoint>(
    cli: &Cli,
    panel: &CommandPanel,
    mut session: FieldFoxSession<E>,
) -> Result<()> {
    match &cli.command {
        Command::Idn => {
            let idn = session.identify().await?;
            println!("{}", idn);
        }
        Command::Setup => {
            // Opening the session already ran spectrum setup
            println!("Spectrum analyzer ready, {} points", session.num_points());
        }
        Command::VnaSetup => {
            session.configure_network_analyzer_mode().await?;
            println!("Network analyzer ready");
        }
        Command::MaxPower { csv } => {
            let reading = session.maximum_power_reading().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&reading)?);
            } else {
                print_output(&SlotOutput::Power(reading.trace_max_dbm));
            }
            if let Some(path) = csv {
                write_column(path, &SlotOutput::Power(reading.trace_max_dbm))?;
            }
        }
        Command::Trace { csv } => {
            let trace = session.trace().await?;
            if cli.json {
                println!("{}", serde_json::to_string(&trace)?);
            } else {
                for (frequency, amplitude) in trace.points() {
                    println!("{:.0}\t{}", frequency, amplitude);
                }
            }
            if let Some(path) = csv {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                export_trace(&trace, file)?;
            }
        }
        Command::Save { name } => {
            session.save_trace(name).await?;
            println!("Save completed as: {}", name);
        }
        Command::RunSlot { column, row, csv } => {
            let output = panel.run(column, *row, &mut session).await?;
            print_output(&output);
            if let Some(path) = csv {
                write_column(path, &output)?;
            }
        }
        Command::Slots => print_slots(panel),
    }

    session.close().await?;
    Ok(())
}

fn print_output(output: &SlotOutput) {
    for line in output.display_values() {
        println!("{}", line);
    }
}

fn write_column(path: &Path, output: &SlotOutput) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    export_column(&output.column_values(), file)?;
    info!("Exported {}", path.display());
    Ok(())
}

fn print_slots(panel: &CommandPanel) {
    for column in panel.columns() {
        println!("{}", column.title);
        for (row, slot) in column.slots.iter().enumerate() {
            let action = match &slot.action {
                SlotAction::Unassigned => "-".to_string(),
                other => format!("{:?}", other),
            };
            println!("  {:>2}  {:<28} {}", row + 1, slot.label, action);
        }
    }
}
