use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "vault-env", version, about = "Runs the vault environment lifecycle")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to read instead of the default lookup order.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Vault root, overriding `vault_root` from the config.
    #[arg(long, global = true)]
    pub vault: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the environment and keep it up until Ctrl-C.
    Run(RunArgs),
    /// Probe the companion service and the sync gate.
    Check,
    /// Print the derived exclusion lists.
    Exclusions,
    /// Load collections, import once, save and exit.
    Import,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Id reported for the chat view container once the host is ready.
    #[arg(long, default_value = "main")]
    pub ui_container: String,

    /// Behave as a mobile host.
    #[arg(long)]
    pub mobile: bool,
}
