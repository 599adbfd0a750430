//! Telnet transport over a raw TCP stream.
//!
//! Option negotiation is not performed: IAC command sequences from the
//! server are filtered out of the read stream and otherwise ignored, which
//! is sufficient for network devices that fall back to a dumb client.
//! Login happens in-channel (see `channel::auth`).

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;

use super::config::TelnetConfig;
use super::{StreamWrite, Transport, TransportRead, TransportWrite};
use crate::error::{Result, TransportError};

const IAC: u8 = 255;
const SB: u8 = 250;
const SE: u8 = 240;

/// Telnet transport over tokio `TcpStream`.
pub struct TelnetTransport {
    config: TelnetConfig,
}

impl TelnetTransport {
    /// Create a transport for the given configuration. No I/O happens
    /// until `open()`.
    pub fn new(config: TelnetConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for TelnetTransport {
    async fn open(&mut self) -> Result<(Box<dyn TransportRead>, Box<dyn TransportWrite>)> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let stream = tokio::time::timeout(self.config.timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::Timeout(self.config.timeout))?
            .map_err(|e| TransportError::ConnectionFailed {
                host: self.config.host.clone(),
                port: self.config.port,
                source: e,
            })?;

        let (reader, writer) = stream.into_split();

        Ok((
            Box::new(TelnetRead {
                inner: reader,
                filter: IacFilter::default(),
            }),
            Box::new(StreamWrite::new(writer)),
        ))
    }

    async fn close(&mut self) -> Result<()> {
        // Halves are dropped by the channel; nothing to tear down here.
        Ok(())
    }
}

/// Read half that strips telnet IAC command sequences.
struct TelnetRead {
    inner: OwnedReadHalf,
    filter: IacFilter,
}

#[async_trait]
impl TransportRead for TelnetRead {
    async fn read(&mut self) -> Result<Bytes> {
        let mut buf = [0u8; 8192];
        loop {
            let n = self.inner.read(&mut buf).await.map_err(TransportError::Io)?;
            if n == 0 {
                return Err(TransportError::Disconnected.into());
            }
            let filtered = self.filter.filter(&buf[..n]);
            // A chunk may be entirely IAC negotiation; keep reading
            if !filtered.is_empty() {
                return Ok(filtered);
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum IacState {
    #[default]
    Data,
    /// Saw IAC; next byte is a command.
    Command,
    /// Saw IAC DO/DONT/WILL/WONT; next byte is the option.
    Option,
    /// Inside IAC SB ... IAC SE.
    Subneg,
    /// Saw IAC inside a subnegotiation.
    SubnegIac,
}

/// Stateful IAC stripper. State survives across chunks so commands split
/// on a read boundary are still removed.
#[derive(Debug, Default)]
struct IacFilter {
    state: IacState,
}

impl IacFilter {
    fn filter(&mut self, raw: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(raw.len());

        for &b in raw {
            self.state = match self.state {
                IacState::Data => {
                    if b == IAC {
                        IacState::Command
                    } else {
                        out.put_u8(b);
                        IacState::Data
                    }
                }
                IacState::Command => match b {
                    // IAC IAC is an escaped 0xFF data byte
                    IAC => {
                        out.put_u8(IAC);
                        IacState::Data
                    }
                    SB => IacState::Subneg,
                    // DO/DONT/WILL/WONT carry one option byte
                    251..=254 => IacState::Option,
                    _ => IacState::Data,
                },
                IacState::Option => IacState::Data,
                IacState::Subneg => {
                    if b == IAC {
                        IacState::SubnegIac
                    } else {
                        IacState::Subneg
                    }
                }
                IacState::SubnegIac => {
                    if b == SE {
                        IacState::Data
                    } else {
                        IacState::Subneg
                    }
                }
            };
        }

        out.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_do_dont_will_wont() {
        let mut f = IacFilter::default();
        // IAC DO 1, "login:", IAC WILL 3
        let raw = [255, 253, 1, b'l', b'o', b'g', b'i', b'n', b':', 255, 251, 3];
        assert_eq!(&f.filter(&raw)[..], b"login:");
    }

    #[test]
    fn strips_subnegotiation() {
        let mut f = IacFilter::default();
        // a, IAC SB 24 0 1 IAC SE, b
        let raw = [b'a', 255, 250, 24, 0, 1, 255, 240, b'b'];
        assert_eq!(&f.filter(&raw)[..], b"ab");
    }

    #[test]
    fn keeps_escaped_iac() {
        let mut f = IacFilter::default();
        let raw = [b'x', 255, 255, b'y'];
        assert_eq!(&f.filter(&raw)[..], &[b'x', 255, b'y'][..]);
    }

    #[test]
    fn command_split_across_chunks() {
        let mut f = IacFilter::default();
        assert_eq!(&f.filter(&[b'a', 255])[..], b"a");
        assert_eq!(&f.filter(&[253])[..], b"");
        assert_eq!(&f.filter(&[1, b'b'])[..], b"b");
    }
}
