use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Debug, Subcommand, PartialEq)]
pub(crate) enum Command {
    /// Print bus events as they arrive.
    Observe {
        /// Only show events of these devices (e.g. js0)
        #[clap(short, long)]
        device: Vec<String>,
        /// Only show button changes
        #[clap(long)]
        buttons: bool,
        /// Only show axis changes
        #[clap(long)]
        axes: bool,
        /// Hide the state replayed when a device is opened
        #[clap(long)]
        skip_initial: bool,
        /// Do not subscribe to devices as they connect
        #[clap(long)]
        no_subscribe: bool,
    },
    /// List the attached devices.
    List {
        /// How long to wait for device discovery, in milliseconds
        #[clap(long, default_value_t = 500)]
        wait_ms: u64,
    },
}

/// Live feed of joystick events.
#[derive(Parser)]
#[command(version, about, long_about = None)]
pub(crate) struct Cli {
    /// Turn debugging information on
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// YAML file with bus options
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Device directory, overrides the config file
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// The command to run
    #[clap(subcommand)]
    pub command: Command,
}
