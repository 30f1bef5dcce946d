//! Listen address canonicalization.
//!
//! `host:port` strings are compared after normalization so that the different
//! spellings of the unspecified host (`""`, `0.0.0.0`, `::`, `[::]`) agree.
//! No DNS resolution is performed; host names compare case-insensitively.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Error returned for malformed `host:port` strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddrError {
    #[error("address `{0}` is missing a port")]
    MissingPort(String),
    #[error("address `{0}` has an invalid port")]
    InvalidPort(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Host {
    Unspecified,
    Ip(IpAddr),
    Name(String),
}

/// A normalized listen address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalAddr {
    host: Host,
    port: u16,
}

impl CanonicalAddr {
    pub fn parse(addr: &str) -> Result<Self, AddrError> {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| AddrError::MissingPort(addr.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| AddrError::InvalidPort(addr.to_string()))?;

        let bare = host.trim_start_matches('[').trim_end_matches(']');
        let host = if bare.is_empty() {
            Host::Unspecified
        } else if let Ok(ip) = bare.parse::<IpAddr>() {
            if ip.is_unspecified() {
                Host::Unspecified
            } else {
                Host::Ip(ip)
            }
        } else {
            Host::Name(bare.to_ascii_lowercase())
        };

        Ok(Self { host, port })
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Address a local client should dial to reach this listener.
    ///
    /// The unspecified host is replaced by IPv4 loopback.
    pub fn dial(&self) -> String {
        match &self.host {
            Host::Unspecified => SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.port).to_string(),
            Host::Ip(ip) => SocketAddr::new(*ip, self.port).to_string(),
            Host::Name(name) => format!("{}:{}", name, self.port),
        }
    }
}

/// The socket address to bind for a configured `host:port`.
///
/// The configured spelling is kept, so `[::]` binds IPv6; only an empty host
/// is filled in, as IPv4 any.
pub fn bind_addr(addr: &str) -> Result<String, AddrError> {
    CanonicalAddr::parse(addr)?;
    match addr.rsplit_once(':') {
        Some(("", port)) => Ok(format!("0.0.0.0:{port}")),
        _ => Ok(addr.to_string()),
    }
}

/// Canonical form used for comparison and logs. Every unspecified spelling
/// prints as `0.0.0.0`.
impl fmt::Display for CanonicalAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Host::Unspecified => write!(f, "0.0.0.0:{}", self.port),
            Host::Ip(ip) => write!(f, "{}", SocketAddr::new(*ip, self.port)),
            Host::Name(name) => write!(f, "{}:{}", name, self.port),
        }
    }
}
