// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kbd-backlightd")]
#[command(
    author,
    version,
    about = "A daemon to control the keyboard backlight based on user activity"
)]
pub struct Cli {
    /// Config file (default: ./, ~/.config/ or /etc/keyboard-backlight-daemon/)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable all terminal output coloration
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log brightness changes instead of writing them to the backlight
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the daemon (default)
    Run,

    /// Show the backlight and input devices that would be used
    #[command(visible_alias = "d")]
    Detect,
}
