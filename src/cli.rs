use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shelfwatch")]
#[command(author, version, about = "Re-encodes newly added audiobooks on a media server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the media server and dispatch encodes (default)
    Run,

    /// Show which encode parameters the rule table picks for a source
    CheckRules {
        /// Source codec, e.g. mp3
        codec: String,

        /// Source bitrate in bits per second
        bit_rate: u64,

        /// Source channel count
        channels: u32,
    },

    /// Validate configuration
    Validate,

    /// Display version information
    Version,
}
