use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use crate::error::{Result, TransportError};

/// A connected emulator stream. Implements Read + Write.
///
/// This is the fundamental I/O type returned by transport operations.
/// The emulator only speaks TCP, so the single variant wraps a
/// [`TcpStream`].
pub struct EmuStream {
    inner: EmuStreamInner,
}

enum EmuStreamInner {
    Tcp(TcpStream),
}

impl Read for EmuStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            EmuStreamInner::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for EmuStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            EmuStreamInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            EmuStreamInner::Tcp(stream) => stream.flush(),
        }
    }
}

impl EmuStream {
    /// Create an EmuStream from a connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: EmuStreamInner::Tcp(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    ///
    /// `None` blocks indefinitely, which is the protocol's native behavior.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            EmuStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            EmuStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Disable Nagle's algorithm. Frames are small and strictly request/reply.
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        match &self.inner {
            EmuStreamInner::Tcp(stream) => stream.set_nodelay(nodelay).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new socket handle).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            EmuStreamInner::Tcp(stream) => {
                let cloned = stream.try_clone()?;
                Ok(Self::from_tcp(cloned))
            }
        }
    }

    /// Address of the connected emulator.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        match &self.inner {
            EmuStreamInner::Tcp(stream) => stream.peer_addr().map_err(Into::into),
        }
    }

    /// Close both directions of the connection.
    ///
    /// A peer that already went away is reported as [`TransportError::Shutdown`].
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            EmuStreamInner::Tcp(stream) => match stream.shutdown(Shutdown::Both) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotConnected => {
                    Err(TransportError::Shutdown)
                }
                Err(err) => Err(err.into()),
            },
        }
    }
}

impl std::fmt::Debug for EmuStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            EmuStreamInner::Tcp(stream) => f
                .debug_struct("EmuStream")
                .field("type", &"tcp")
                .field("peer", &stream.peer_addr().ok())
                .finish(),
        }
    }
}
