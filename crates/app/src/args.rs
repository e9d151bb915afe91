pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fangorn")]
#[command(about = "Zero-knowledge password vaults: publish encrypted content, unlock it with a proof")]
#[command(version)]
pub struct Args {
    /// Path to the fangorn config directory (defaults to ~/.fangorn)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Log level, overrides the configured one
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: crate::Command,
}
