use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::EmuStream;

/// Host the emulator listens on when nothing else is configured.
pub const DEFAULT_HOST: &str = "localhost";

/// Port the emulator opens for scripting and debugger clients.
pub const DEFAULT_PORT: u16 = 6414;

/// TCP transport to an emulator's debugger socket.
///
/// Only the client side exists here: the emulator is always the listener.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    host: String,
    port: u16,
    connect_timeout: Option<Duration>,
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl TcpTransport {
    /// Describe an endpoint without connecting yet.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: None,
        }
    }

    /// Bound the time spent in `connect` (per resolved address).
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Host name or address literal.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` as used in diagnostics.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect to the configured endpoint (blocking).
    ///
    /// Every resolved address is tried in order; the last failure is reported.
    pub fn connect(&self) -> Result<EmuStream> {
        let endpoint = self.endpoint();
        let addrs = self.resolve()?;

        let mut last_err = None;
        for addr in addrs {
            let attempt = match self.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    info!(%addr, "connected to emulator");
                    let stream = EmuStream::from_tcp(stream);
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            addr: endpoint,
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    "no addresses to connect to",
                )
            }),
        })
    }

    /// Connect to a listening emulator at an explicit address (blocking).
    pub fn connect_addr(addr: SocketAddr) -> Result<EmuStream> {
        Self::new(addr.ip().to_string(), addr.port()).connect()
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map(|addrs| addrs.collect::<Vec<_>>())
            .map_err(|source| TransportError::Resolve {
                addr: self.endpoint(),
                source,
            })
    }

    /// Connect using tokio (requires `async` feature).
    #[cfg(feature = "async")]
    pub async fn connect_async(&self) -> Result<tokio::net::TcpStream> {
        let endpoint = self.endpoint();
        let stream = tokio::net::TcpStream::connect(endpoint.as_str())
            .await
            .map_err(|source| TransportError::Connect {
                addr: endpoint.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;
        info!(addr = %endpoint, "connected to emulator (async)");
        Ok(stream)
    }
}
