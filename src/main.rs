mod cli;
mod demo;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use stremio_addon::{config, Options, UserDataEncoding};

fn load(config_path: Option<&Path>) -> Result<Options> {
    match config_path {
        Some(path) => config::load_options(path),
        None => Ok(Options::default()),
    }
}

async fn start_server(
    bind_addr: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let mut options = load(config_path)?;

    // CLI flags win over the config file
    if let Some(bind_addr) = bind_addr {
        options.bind_addr = bind_addr;
    }
    if let Some(port) = port {
        options.port = port;
    }
    if verbose {
        options.log_level = "debug".to_string();
    }

    let addon = demo::build(options).context("Failed to build addon")?;
    addon.run().await.context("Server error")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { bind_addr, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(
                bind_addr,
                port,
                cli.config.as_deref(),
                cli.verbose,
            ))
        }
        Commands::Validate { config } => {
            let path = config
                .or(cli.config)
                .context("No config file specified")?;
            let options = config::load_options(&path)?;
            println!("Configuration is valid");
            println!("  Listen address: {}:{}", options.bind_addr, options.port);
            println!("  Catalog cache: {:?}", options.catalog_cache.header_value());
            println!("  Stream cache: {:?}", options.stream_cache.header_value());
            Ok(())
        }
        Commands::EncodeUserData {
            user_id,
            token,
            preferred_stream_type,
        } => {
            let customer = demo::Customer {
                user_id,
                token,
                preferred_stream_type,
            };
            let encoded = UserDataEncoding::Base64Url.encode(&customer)?;
            println!("{encoded}");
            Ok(())
        }
    }
}
