use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};

use error::CliError;
use flash::*;
use list::*;

mod error;
mod flash;
mod list;
mod targets;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// list programmable devices
    List {
        /// vendor ID (ex: "1781")
        #[clap(short, long, value_parser=hex_u16)]
        vendor: Option<u16>,
        /// product ID (ex: "0c62")
        #[clap(short, long, value_parser=hex_u16)]
        product: Option<u16>,
    },
    /// switch a device into update mode
    Switch {
        /// device number from `list`
        #[clap(short, long)]
        device: Option<usize>,
    },
    /// write a firmware file to a device
    Flash {
        /// raw firmware binary
        file: PathBuf,
        /// device number from `list`
        #[clap(short, long)]
        device: Option<usize>,
        /// leave the bootloader running after the upload
        #[clap(long)]
        no_start: bool,
    },
    /// start the application firmware on a device in update mode
    Start {
        /// device number from `list`
        #[clap(short, long)]
        device: Option<usize>,
    },
    /// perform a bus-level reset of a device
    Reset {
        /// device number from `list`
        #[clap(short, long)]
        device: Option<usize>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::List {
            vendor: None,
            product: None,
        }
    }
}

fn hex_u16(s: &str) -> Result<u16, String> {
    <u16>::from_str_radix(s, 16).map_err(|e| format!("{e}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::init();

    if let Err(err) = match &cli.command.unwrap_or_default() {
        Commands::List { vendor, product } => list_devices(*vendor, *product),
        Commands::Switch { device } => switch_device(*device),
        Commands::Flash {
            file,
            device,
            no_start,
        } => flash_file(file, *device, *no_start),
        Commands::Start { device } => start_device(*device),
        Commands::Reset { device } => reset_device(*device),
    } {
        eprintln!("Error: {err}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
