use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stremio-addon")]
#[command(author, version, about = "Example addon serving free movies made with Blender")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the addon server
    Start {
        /// Interface to bind to
        #[arg(long)]
        bind_addr: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config if not specified)
        config: Option<PathBuf>,
    },

    /// Print the user data segment for an install URL
    EncodeUserData {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        token: String,

        /// "http", "torrent" or empty for both
        #[arg(long, default_value = "")]
        preferred_stream_type: String,
    },
}
