//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tonic::transport::Endpoint;

use rpc_gateway::config::{parse_config, AppConfig};
use rpc_gateway::echo::{EchoClient, EchoRegister};
use rpc_gateway::{Running, Server};

/// Parse a TOML config, panicking on error.
pub fn config(toml: &str) -> AppConfig {
    parse_config(toml).unwrap()
}

/// Bind `server.addr` and start the echo service with `config`.
pub async fn start(config: AppConfig) -> Running {
    let listener = TcpListener::bind(config.server.addr.as_str()).await.unwrap();
    let running = Server::new(config)
        .start(EchoRegister::default(), listener)
        .await
        .unwrap();

    // Give serving tasks a moment to enter their accept loops
    tokio::time::sleep(Duration::from_millis(50)).await;
    running
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// HTTP/2 cleartext RPC client for `addr`.
pub async fn rpc_client(addr: SocketAddr) -> EchoClient {
    let channel = Endpoint::from_shared(format!("http://{addr}"))
        .unwrap()
        .connect_timeout(Duration::from_secs(2))
        .connect()
        .await
        .unwrap();
    EchoClient::new(channel)
}
