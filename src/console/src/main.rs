//! Command line shell for the IO controller configuration core.
//!
//! Executes the core's effects against a device on the network: plain HTTP
//! requests for page and registry synchronization and a streamed multipart
//! upload for firmware images.

mod commands;
mod config;
mod shell;

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env, Target};
use iocontrol_ui_core::{ConfigPage, ModbusEvent, Parity};
use std::{io::Write, path::PathBuf};

use crate::config::{ConsoleConfig, Overrides};
use crate::shell::Shell;

#[derive(Parser)]
#[command(name = "iocontrol-console")]
#[command(author, version, about = "Configure an IO controller from the command line")]
#[command(propagate_version = true)]
struct Cli {
    /// Device address (overrides DEVICE_URL)
    #[arg(short, long)]
    device: Option<String>,

    /// Request timeout in seconds (overrides HTTP_TIMEOUT_SECS)
    #[arg(long)]
    timeout: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a configuration page: home, network, erp, analog<n>, digital<n>, settings
    Show { page: ConfigPage },

    /// Change fields of a configuration page and save it
    Set {
        page: ConfigPage,

        /// Assignments as field=value
        #[arg(required = true)]
        assignments: Vec<String>,
    },

    /// Restart the device
    Restart,

    /// Reset the counter or timer of a digital input
    ResetCounter { input: u8 },

    /// Manage Modbus parameters
    #[command(subcommand)]
    Modbus(ModbusCommand),

    /// Upload a firmware or filesystem image
    Upload {
        /// Image file (*.bin)
        file: PathBuf,

        /// Seconds to wait for the reboot (overrides REBOOT_COUNTDOWN_SECS)
        #[arg(long)]
        countdown: Option<u32>,
    },

    /// Show memory and update space of the device
    Status {
        /// Keep polling (interval from STATUS_POLL_SECS)
        #[arg(long)]
        watch: bool,

        /// Poll interval in seconds
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Show live sensor values
    Readings,
}

#[derive(Subcommand)]
enum ModbusCommand {
    /// List serial settings and parameters
    List,

    /// Create or overwrite a parameter
    Add {
        name: String,
        /// device address, function code, register address, multiplier, offset
        #[arg(num_args = 5, allow_hyphen_values = true)]
        values: Vec<String>,
    },

    /// Rename and update a parameter in one step
    Save {
        original: String,
        name: String,
        /// device address, function code, register address, multiplier, offset
        #[arg(num_args = 5, allow_hyphen_values = true)]
        values: Vec<String>,
    },

    /// Rename a parameter
    Rename { from: String, to: String },

    /// Delete a parameter
    Delete { name: String },

    /// Change serial line settings
    Serial {
        #[arg(long)]
        baudrate: Option<u32>,
        #[arg(long)]
        parity: Option<Parity>,
        #[arg(long)]
        stop_bits: Option<u8>,
        #[arg(long)]
        data_bits: Option<u8>,
        #[arg(long)]
        scan_rate: Option<f64>,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose || cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_filter));

    builder.format(|f, record| match record.level() {
        log::Level::Error | log::Level::Warn => writeln!(f, "{}: {}", record.level(), record.args()),
        _ => writeln!(f, "{}", record.args()),
    });

    builder.target(Target::Stderr).init();
}

fn five_values(values: Vec<String>) -> Result<[String; 5]> {
    values
        .try_into()
        .map_err(|v: Vec<String>| anyhow::anyhow!("expected 5 values, got {}", v.len()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    log_panics::init();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let interval = match &cli.command {
        Commands::Status { interval, .. } => *interval,
        _ => None,
    };
    let config = ConsoleConfig::load(&Overrides {
        device_url: cli.device.clone(),
        http_timeout_secs: cli.timeout,
        status_poll_secs: interval,
        ..Default::default()
    })?;

    log::debug!("module version: {}", env!("CARGO_PKG_VERSION"));
    log::debug!("device: {}", config.device_url);

    let mut shell = Shell::new(config)?;

    match cli.command {
        Commands::Show { page } => commands::show(&mut shell, page).await,
        Commands::Set { page, assignments } => commands::set(&mut shell, page, &assignments).await,
        Commands::Restart => commands::restart(&mut shell).await,
        Commands::ResetCounter { input } => commands::reset_counter(&mut shell, input).await,
        Commands::Modbus(command) => match command {
            ModbusCommand::List => commands::modbus(&mut shell, None).await,
            ModbusCommand::Add { name, values } => {
                let form = commands::parameter_form(&five_values(values)?);
                commands::modbus(&mut shell, Some(ModbusEvent::Upsert { name, form })).await
            }
            ModbusCommand::Save {
                original,
                name,
                values,
            } => {
                let form = commands::parameter_form(&five_values(values)?);
                let event = ModbusEvent::SaveParameter {
                    original,
                    name,
                    form,
                };
                commands::modbus(&mut shell, Some(event)).await
            }
            ModbusCommand::Rename { from, to } => {
                commands::modbus(&mut shell, Some(ModbusEvent::Rename { from, to })).await
            }
            ModbusCommand::Delete { name } => {
                commands::modbus(&mut shell, Some(ModbusEvent::Delete { name })).await
            }
            ModbusCommand::Serial {
                baudrate,
                parity,
                stop_bits,
                data_bits,
                scan_rate,
            } => {
                commands::modbus_serial(&mut shell, |serial| {
                    if let Some(v) = baudrate {
                        serial.baudrate = v;
                    }
                    if let Some(v) = parity {
                        serial.parity = v;
                    }
                    if let Some(v) = stop_bits {
                        serial.stop_bits = v;
                    }
                    if let Some(v) = data_bits {
                        serial.data_bits = v;
                    }
                    if let Some(v) = scan_rate {
                        serial.scan_rate = v;
                    }
                })
                .await
            }
        },
        Commands::Upload { file, countdown } => commands::upload(&mut shell, &file, countdown).await,
        Commands::Status { watch, .. } => commands::status(&mut shell, watch).await,
        Commands::Readings => commands::readings(&mut shell).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn pages_parse_from_arguments() {
        let cli = Cli::try_parse_from(["iocontrol-console", "show", "digital2"]).unwrap();

        assert!(matches!(
            cli.command,
            Commands::Show {
                page: ConfigPage::DigitalInput(2)
            }
        ));
        assert!(Cli::try_parse_from(["iocontrol-console", "show", "analog7"]).is_err());
    }

    #[test]
    fn modbus_add_takes_negative_offset() {
        let cli = Cli::try_parse_from([
            "iocontrol-console",
            "modbus",
            "add",
            "temp",
            "1",
            "3",
            "100",
            "0.1",
            "-4",
        ])
        .unwrap();

        let Commands::Modbus(ModbusCommand::Add { name, values }) = cli.command else {
            panic!("expected modbus add");
        };
        assert_eq!(name, "temp");
        assert_eq!(five_values(values).unwrap()[4], "-4");
    }
}
