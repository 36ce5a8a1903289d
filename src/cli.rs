use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "forcerm")]
#[command(version)]
#[command(about = "Remove directory trees, escalating through ownership and permission fixes when needed", long_about = None)]
pub struct Cli {
    /// Directories to remove, in order (glob patterns are expanded)
    #[arg(required_unless_present = "init_config")]
    pub paths: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Show what would be removed without removing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Debug diagnostics on stderr
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Directory for the run log (overrides the config file)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Account that takes ownership and gets full control during remediation
    #[arg(long)]
    pub identity: Option<String>,

    /// Do not count files before deleting
    #[arg(long)]
    pub no_count: bool,

    /// Write a default config file to ~/.forcerm/config.toml and exit
    #[arg(long)]
    pub init_config: bool,
}
