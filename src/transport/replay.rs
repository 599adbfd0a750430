//! Replay transport: a scripted, in-memory byte stream.
//!
//! Feeds pre-recorded device output to the session channel and records
//! everything written to it. Used throughout the test suite and useful for
//! replaying captured sessions (e.g. a saved `show running-config`
//! exchange) without a device.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::{Transport, TransportRead, TransportWrite};
use crate::error::{Result, TransportError};

/// Scripted transport for tests and session replay.
///
/// Reads are served from the fed chunks in order; a chunk may carry a
/// delay to model device response latency. When the feed is exhausted the
/// read half either blocks forever (a silent device, the default),
/// reports end-of-stream, or keeps re-delivering the last chunk (a device
/// stuck on one prompt).
#[derive(Default)]
pub struct ReplayTransport {
    feed: Vec<(Duration, Bytes)>,
    chunk_size: Option<usize>,
    repeat_last: bool,
    eof_when_exhausted: bool,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl ReplayTransport {
    /// Create an empty replay transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the entire contents of a file as a single feed chunk.
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::new().feed(data))
    }

    /// Append a chunk of device output, delivered as soon as it is read.
    pub fn feed(self, data: impl Into<Bytes>) -> Self {
        self.feed_after(Duration::ZERO, data)
    }

    /// Append a chunk of device output, delivered `delay` after the
    /// previous chunk was consumed. Models a device that takes time to
    /// respond, which keeps multi-step exchanges sequenced the way a real
    /// session would be.
    pub fn feed_after(mut self, delay: Duration, data: impl Into<Bytes>) -> Self {
        self.feed.push((delay, data.into()));
        self
    }

    /// Re-chunk the whole feed into reads of at most `n` bytes, dropping
    /// per-chunk delays. `1` delivers the script one byte at a time.
    pub fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = Some(n.max(1));
        self
    }

    /// Keep re-delivering the final feed chunk once the feed is exhausted.
    pub fn repeat_last(mut self, repeat: bool) -> Self {
        self.repeat_last = repeat;
        self
    }

    /// Report end-of-stream once the feed is exhausted instead of blocking.
    pub fn eof_when_exhausted(mut self, eof: bool) -> Self {
        self.eof_when_exhausted = eof;
        self
    }

    /// Handle to the recorded writes. Each `write()` call is one entry.
    pub fn writes(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        self.writes.clone()
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn open(&mut self) -> Result<(Box<dyn TransportRead>, Box<dyn TransportWrite>)> {
        let chunks: VecDeque<(Duration, Bytes)> = match self.chunk_size {
            Some(n) => {
                let mut all = Vec::new();
                for (_, c) in &self.feed {
                    all.extend_from_slice(c);
                }
                all.chunks(n)
                    .map(|c| (Duration::ZERO, Bytes::copy_from_slice(c)))
                    .collect()
            }
            None => self.feed.iter().cloned().collect(),
        };

        Ok((
            Box::new(ReplayRead {
                chunks,
                last: None,
                repeat_last: self.repeat_last,
                eof_when_exhausted: self.eof_when_exhausted,
            }),
            Box::new(ReplayWrite {
                writes: self.writes.clone(),
            }),
        ))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

struct ReplayRead {
    chunks: VecDeque<(Duration, Bytes)>,
    last: Option<Bytes>,
    repeat_last: bool,
    eof_when_exhausted: bool,
}

#[async_trait]
impl TransportRead for ReplayRead {
    async fn read(&mut self) -> Result<Bytes> {
        if let Some((delay, chunk)) = self.chunks.pop_front() {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.last = Some(chunk.clone());
            return Ok(chunk);
        }

        if self.repeat_last {
            if let Some(last) = &self.last {
                return Ok(last.clone());
            }
        }

        if self.eof_when_exhausted {
            return Err(TransportError::Disconnected.into());
        }

        // Silent device: block until the caller's timeout fires
        std::future::pending::<()>().await;
        unreachable!()
    }
}

struct ReplayWrite {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

#[async_trait]
impl TransportWrite for ReplayWrite {
    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.writes.lock().unwrap().push(buf.to_vec());
        Ok(())
    }
}
