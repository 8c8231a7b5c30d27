//! Host command daemon (hostcmdd)
//!
//! Serves schema-defined command lines over TCP and acknowledges every
//! parsed command with a JSON echo of its decoded arguments.
//!
//! # Usage
//!
//! ```bash
//! # Start with a command schema
//! hostcmdd --config /etc/hostcmd/hostcmd.toml
//!
//! # Custom port, diagnostics echoed to the host
//! hostcmdd --config hostcmd.toml --port 7000 --interactive
//!
//! # Validate the configuration and print the compiled schema
//! hostcmdd --config hostcmd.toml --check
//! ```

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use hostcmd_transport::{Acknowledge, TcpServer};

use crate::config::DaemonConfig;

/// Host command daemon
#[derive(Parser, Debug)]
#[command(name = "hostcmdd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, env = "HOSTCMD_PORT", default_value = "6390")]
    port: u16,

    /// Bind address
    #[arg(long, env = "HOSTCMD_BIND", default_value = "127.0.0.1")]
    bind: String,

    /// Configuration file path
    #[arg(short, long, env = "HOSTCMD_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "HOSTCMD_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Echo parser diagnostics to the host
    #[arg(long)]
    interactive: bool,

    /// Validate the configuration, print the compiled schema and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    let mut config = match &args.config {
        Some(path) => DaemonConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => {
            warn!("No configuration file given, starting without commands");
            DaemonConfig::default()
        }
    };
    if args.interactive {
        config.parser.interactive = true;
    }

    let registry = config
        .build_registry()
        .context("Failed to compile command definitions")?;

    if args.check {
        println!("{}", serde_json::to_string_pretty(&registry)?);
        return Ok(());
    }

    print_banner();

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.bind, args.port))?;

    for (id, spec) in registry.iter() {
        info!(id = id.index(), command = %spec, "Command available");
    }
    info!(
        addr = %addr,
        commands = registry.len(),
        buffer = config.parser.effective_capacity(),
        interactive = config.parser.interactive,
        "Starting hostcmd daemon"
    );

    let mut server = TcpServer::new(registry, config.parser, addr, Acknowledge);

    tokio::select! {
        result = server.run() => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutting down...");
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn print_banner() {
    println!(
        r#"
  hostcmd daemon
  Line-oriented host commands over TCP
  Version {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
