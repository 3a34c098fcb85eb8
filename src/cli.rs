use clap::{ArgGroup, Parser};

use crate::plan::PipelineMode;

/// eSim installer - installs or removes the eSim EDA suite
#[derive(Parser, Debug)]
#[command(name = "esim-installer")]
#[command(about = "Installs or removes eSim together with KiCad, NGHDL and the SKY130 PDK")]
// Only the two mode flags are accepted; anything else is a usage error.
#[command(disable_help_flag = true, disable_version_flag = true)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["install", "uninstall"]),
))]
pub struct Cli {
    /// Install eSim and its toolchain
    #[arg(long)]
    pub install: bool,

    /// Remove eSim and everything the installer put on this machine
    #[arg(long)]
    pub uninstall: bool,
}

impl Cli {
    pub fn mode(&self) -> PipelineMode {
        if self.uninstall {
            PipelineMode::Uninstall
        } else {
            PipelineMode::Install
        }
    }
}
