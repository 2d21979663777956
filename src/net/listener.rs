//! HTTP listener binding.
//!
//! # Responsibilities
//! - Bind to the configured `(ip, port)`
//! - Report the externally reachable URL
//! - Turn bind failures into a `ListenerError` naming address and port

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::CommonConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Configured address does not parse.
    #[error("invalid listen address {ip}:{port}: {reason}")]
    InvalidAddress { ip: String, port: u16, reason: String },
    /// Failed to bind to address.
    #[error("can not listen on {ip}:{port}, make sure it is not used by another application: {source}")]
    Bind {
        ip: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// URL a local browser can reach, mapping wildcard binds to loopback.
pub fn reachable_url(addr: SocketAddr) -> String {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    format!("http://{}", SocketAddr::new(ip, addr.port()))
}

/// A bound HTTP listener.
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to the configured address.
    pub async fn bind(config: &CommonConfig) -> Result<Self, ListenerError> {
        let ip: IpAddr = config
            .ip
            .parse()
            .map_err(|e: std::net::AddrParseError| ListenerError::InvalidAddress {
                ip: config.ip.clone(),
                port: config.port,
                reason: e.to_string(),
            })?;

        let bind_err = |source| ListenerError::Bind {
            ip: config.ip.clone(),
            port: config.port,
            source,
        };

        let inner = TcpListener::bind(SocketAddr::new(ip, config.port))
            .await
            .map_err(bind_err)?;
        let local_addr = inner.local_addr().map_err(bind_err)?;

        tracing::info!(
            address = %local_addr,
            url = %reachable_url(local_addr),
            "Web server works on"
        );

        Ok(Self { inner, local_addr })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn into_inner(self) -> TcpListener {
        self.inner
    }
}
