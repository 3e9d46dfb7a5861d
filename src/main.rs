// Kali MCP
// Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

use kali_mcp::cli::ChatSession;
use kali_mcp::config::{load_config, load_config_from, Config};
use kali_mcp::errors::{address_in_use_error, config_parse_error, UserFriendlyError};
use kali_mcp::server::{log_system_info, shutdown_signal, ApiServer, GatewayServer};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "kali-mcp")]
#[command(about = "Kali Linux tools over HTTP, an MCP gateway and a local chat client", version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug endpoints, request history and file logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (default: ~/.kali-mcp/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run the tool dispatch server
    Api {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the MCP gateway
    Mcp {
        #[arg(long)]
        port: Option<u16>,
        /// Base URL of the dispatch server
        #[arg(long)]
        api_url: Option<String>,
    },
    /// Run the dispatch server and the gateway together
    Run {
        #[arg(long)]
        api_port: Option<u16>,
        #[arg(long)]
        mcp_port: Option<u16>,
    },
    /// Chat with a local model that can run tools through the gateway
    Chat {
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        gateway_url: Option<String>,
        #[arg(long)]
        ollama_url: Option<String>,
        /// Run tools suggested by the model without asking
        #[arg(long)]
        no_confirm: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load(args.config.as_deref())?;
    if args.debug {
        config.debug.enabled = true;
    }

    init_tracing(&config);
    if config.debug.enabled {
        log_system_info();
    }

    match args.command {
        Command::Api { port } => {
            if let Some(port) = port {
                config.api.port = port;
            }
            run_api(&config).await
        }
        Command::Mcp { port, api_url } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(url) = api_url {
                config.gateway.api_base_url = url;
            }
            run_gateway(&config).await
        }
        Command::Run { api_port, mcp_port } => {
            if let Some(port) = api_port {
                config.api.port = port;
            }
            if let Some(port) = mcp_port {
                config.gateway.port = port;
            }
            config.gateway.api_base_url = format!("http://127.0.0.1:{}", config.api.port);

            tracing::info!(
                api_port = config.api.port,
                mcp_port = config.gateway.port,
                "Starting dispatch server and gateway"
            );
            tokio::try_join!(run_api(&config), run_gateway(&config))?;
            Ok(())
        }
        Command::Chat {
            model,
            gateway_url,
            ollama_url,
            no_confirm,
        } => {
            if let Some(model) = model {
                config.chat.model = model;
            }
            if let Some(url) = gateway_url {
                config.chat.gateway_url = url;
            }
            if let Some(url) = ollama_url {
                config.chat.ollama_url = url;
            }
            if no_confirm {
                config.chat.confirm_tools = false;
            }

            let mut session = ChatSession::from_config(&config.chat)?;
            session.run().await
        }
    }
}

fn load(path: Option<&Path>) -> Result<Config> {
    let loaded = match path {
        Some(path) => load_config_from(path),
        None => load_config(),
    };
    loaded.user_context(&config_parse_error(path))
}

async fn bind(address: &str) -> Result<TcpListener> {
    TcpListener::bind(address)
        .await
        .map_err(anyhow::Error::from)
        .user_context(&address_in_use_error(address))
}

async fn run_api(config: &Config) -> Result<()> {
    let server = ApiServer::from_config(config)?;
    let listener = bind(&config.api.bind_address()).await?;
    server.serve_on(listener, shutdown_signal()).await
}

async fn run_gateway(config: &Config) -> Result<()> {
    let server = GatewayServer::from_config(config)?;
    let listener = bind(&config.gateway.bind_address()).await?;
    server.serve_on(listener, shutdown_signal()).await
}

/// Initialize tracing
///
/// Logs go to stderr at INFO (DEBUG in debug mode) unless RUST_LOG says
/// otherwise. Debug mode also appends plain-text logs to the debug log file.
fn init_tracing(config: &Config) {
    let default_level = if config.debug.enabled { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let file_layer = if config.debug.enabled {
        config
            .debug
            .log_path()
            .and_then(|path| match open_log_file(&path) {
                Ok(file) => Some(file),
                Err(e) => {
                    eprintln!("Debug log disabled: {:#}", e);
                    None
                }
            })
            .map(|file| {
                let file = Arc::new(file);
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
            })
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    // Bridge log crate → tracing (for dependencies using log crate)
    tracing_log::LogTracer::init().ok();
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open debug log: {}", path.display()))
}
