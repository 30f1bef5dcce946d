use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rpc_gateway::config::{bind_addr, load_config};
use rpc_gateway::echo::EchoRegister;
use rpc_gateway::lifecycle::{wait_for_signal, Server};
use rpc_gateway::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "rpc-gateway", version, about = "RPC server with an HTTP/JSON gateway")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    if cli.check {
        println!("{}: ok", cli.config.display());
        return Ok(());
    }

    logging::init(&config.log)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), config = %cli.config.display(), "rpc-gateway starting");

    if config.metrics.enabled {
        let addr: SocketAddr = config.metrics.addr.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(bind_addr(&config.server.addr)?.as_str()).await?;

    let server = Server::new(config);
    let running = server.start(EchoRegister::default(), listener).await?;

    wait_for_signal().await;
    running.shutdown().await;
    Ok(())
}
