//! Transport layer: abstract byte-stream connections to devices.
//!
//! A transport is an opaque duplex byte stream with bounded reads. The
//! session channel owns it exclusively for its lifetime: `open()` splits the
//! stream into a read half (consumed only by the channel's background pump)
//! and a write half (used by the caller's operations). Implementations are
//! swappable without changing the channel.

pub mod config;
mod replay;
mod ssh;
mod telnet;

pub use config::{AuthMethod, PtyOptions, SshConfig, TelnetConfig};
pub use replay::ReplayTransport;
pub use ssh::SshTransport;
pub use telnet::TelnetTransport;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, TransportError};

/// Read buffer size for bounded transport reads.
const READ_CHUNK_SIZE: usize = 8192;

/// A connection to a device that can be opened into read/write halves.
#[async_trait]
pub trait Transport: Send {
    /// Open the connection and split it into independently usable halves.
    ///
    /// The read half is handed to the session channel's pump, which is the
    /// only reader for the connection's lifetime.
    async fn open(&mut self) -> Result<(Box<dyn TransportRead>, Box<dyn TransportWrite>)>;

    /// Close the connection.
    async fn close(&mut self) -> Result<()>;
}

/// The read half of an open transport.
#[async_trait]
pub trait TransportRead: Send {
    /// Bounded read: block until some bytes are available and return them.
    ///
    /// Returns [`TransportError::Disconnected`] on end-of-stream.
    async fn read(&mut self) -> Result<Bytes>;
}

/// The write half of an open transport.
#[async_trait]
pub trait TransportWrite: Send {
    /// Write all of `buf` to the device.
    async fn write(&mut self, buf: &[u8]) -> Result<()>;
}

/// [`TransportRead`] over any tokio `AsyncRead`.
pub(crate) struct StreamRead<R> {
    inner: R,
}

impl<R> StreamRead<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> TransportRead for StreamRead<R> {
    async fn read(&mut self) -> Result<Bytes> {
        let mut buf = [0u8; READ_CHUNK_SIZE];
        let n = self.inner.read(&mut buf).await.map_err(TransportError::Io)?;
        if n == 0 {
            return Err(TransportError::Disconnected.into());
        }
        Ok(Bytes::copy_from_slice(&buf[..n]))
    }
}

/// [`TransportWrite`] over any tokio `AsyncWrite`.
pub(crate) struct StreamWrite<W> {
    inner: W,
}

impl<W> StreamWrite<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> TransportWrite for StreamWrite<W> {
    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf).await.map_err(TransportError::Io)?;
        self.inner.flush().await.map_err(TransportError::Io)?;
        Ok(())
    }
}
