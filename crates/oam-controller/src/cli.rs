//! Framework-standardized commands, in the shape of the teacher's `cli::Command`: print CRDs, or
//! run the controller.
use std::path::PathBuf;

use crate::config::ControllerConfig;

pub const AUTHOR: &str = "Ada Okafor <ada@example.com>";

#[derive(clap::Parser, Debug)]
#[command(name = "oam-controller", author, version, about = "Application reconciliation engine")]
pub struct Opts {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Parser, Debug)]
pub enum Command {
    /// Print the CRD YAML schemas for every registered kind
    Crd {
        /// Write the schemas here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the controller
    Run(ControllerConfig),
}
