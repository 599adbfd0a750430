//! NETCONF channel: capability exchange, version negotiation, and RPC
//! transport over a session channel.

use std::time::Duration;

use log::{debug, info};

use super::framing::{self, DELIMITER_1_0, FramingPatterns, NetconfVersion};
use super::response::NetconfResponse;
use crate::channel::SessionChannel;
use crate::error::{NetconfError, Result};

/// First message-id used on a session; increments by one per RPC.
pub const MESSAGE_ID_BASE: u64 = 101;

/// Default bounded wait used to detect whether the server echoes client
/// input.
pub const DEFAULT_ECHO_PROBE_TIMEOUT: Duration = Duration::from_millis(750);

/// NETCONF session over a session channel.
///
/// Servers always announce capabilities with 1.0 framing; the negotiated
/// version then decides how RPCs are framed and where end-of-message is.
pub struct NetconfChannel {
    host: String,
    port: u16,
    channel: SessionChannel,
    patterns: FramingPatterns,
    version: Option<NetconfVersion>,
    capabilities: Vec<String>,
    /// Whether the server echoes client input. Unknown until the probe
    /// after the client `<hello>`; immutable afterwards.
    server_echo: Option<bool>,
    message_id: u64,
    echo_probe_timeout: Duration,
    open: bool,
}

impl NetconfChannel {
    /// Create a NETCONF channel over `channel`. Framing patterns are
    /// compiled here, once; no I/O happens until `open()`.
    pub fn new(channel: SessionChannel, host: impl Into<String>, port: u16) -> Result<Self> {
        let patterns =
            FramingPatterns::new().map_err(crate::error::ChannelError::InvalidPattern)?;

        Ok(Self {
            host: host.into(),
            port,
            channel,
            patterns,
            version: None,
            capabilities: Vec::new(),
            server_echo: None,
            message_id: MESSAGE_ID_BASE,
            echo_probe_timeout: DEFAULT_ECHO_PROBE_TIMEOUT,
            open: false,
        })
    }

    /// Override the echo probe timeout.
    pub fn set_echo_probe_timeout(&mut self, timeout: Duration) {
        self.echo_probe_timeout = timeout;
    }

    /// Complete the capability exchange and version negotiation.
    ///
    /// `pre_read` carries the server `<hello>` if it was already captured
    /// during authentication; otherwise the hello is read here, always
    /// with 1.0 framing. The client `<hello>` advertises exactly the
    /// selected version, then a bounded FIFO read probes whether the
    /// server echoes client input.
    pub async fn open(&mut self, pre_read: Option<Vec<u8>>) -> Result<()> {
        if self.open {
            return Ok(());
        }

        self.channel.open().await?;

        let hello_raw = match pre_read {
            Some(bytes) => bytes,
            None => {
                self.channel
                    .read_until_explicit(DELIMITER_1_0.as_bytes(), None)
                    .await?
            }
        };
        let hello = String::from_utf8_lossy(&hello_raw);

        self.capabilities = self.patterns.extract_capabilities(&hello);
        if self.capabilities.is_empty() {
            return Err(NetconfError::CapabilitiesExchangeFailed {
                reason: "no capabilities found in server hello".to_string(),
            }
            .into());
        }

        let version = if self
            .capabilities
            .iter()
            .any(|c| c == framing::CAPABILITY_1_1)
        {
            NetconfVersion::V1_1
        } else if self
            .capabilities
            .iter()
            .any(|c| c == framing::CAPABILITY_1_0)
        {
            NetconfVersion::V1_0
        } else {
            return Err(NetconfError::CapabilitiesExchangeFailed {
                reason: "no common base capability with server".to_string(),
            }
            .into());
        };
        self.version = Some(version);
        info!(
            "netconf session to {}:{} negotiated {:?} ({} capabilities)",
            self.host,
            self.port,
            version,
            self.capabilities.len()
        );

        // The hello handshake itself is always 1.0 framed
        let client_hello = framing::encode(&framing::client_hello(version), NetconfVersion::V1_0);
        self.channel.write(client_hello.as_bytes(), false).await?;

        // Echo probe: a bounded read through the FIFO — the pump stays
        // the transport's only reader
        let echoed = self.channel.probe_read(self.echo_probe_timeout).await?;
        self.server_echo = Some(echoed);
        debug!("netconf server echo detection: {}", echoed);

        if echoed {
            // Consume the remainder of the echoed hello
            self.channel
                .read_until_explicit(DELIMITER_1_0.as_bytes(), None)
                .await?;
        }

        self.open = true;
        Ok(())
    }

    /// Send an RPC payload and read the framed reply.
    pub async fn send_rpc(&mut self, payload: &str) -> Result<NetconfResponse> {
        let version = self.version.ok_or(NetconfError::NotOpen)?;

        let message_id = self.message_id;
        self.message_id += 1;

        let rpc = framing::wrap_rpc(payload, message_id);
        let wire = framing::encode(&rpc, version);

        let mut response = NetconfResponse::new(&self.host, self.port, payload, version);

        self.channel.write(wire.as_bytes(), false).await?;

        if self.server_echo == Some(true) {
            // Consume the echoed frame before looking for the terminator,
            // otherwise our own end-of-message marker would match first
            self.channel
                .read_until_explicit(wire.as_bytes(), None)
                .await?;
        }

        let mut raw = match version {
            NetconfVersion::V1_0 => {
                self.channel
                    .read_until_explicit(DELIMITER_1_0.as_bytes(), None)
                    .await?
            }
            NetconfVersion::V1_1 => {
                self.channel
                    .read_until_pattern(&self.patterns.terminator_1_1, None)
                    .await?
            }
        };

        // Defensive: drop an echoed frame that survived at the front
        if raw.starts_with(wire.as_bytes()) {
            raw.drain(..wire.len());
        }

        let text = String::from_utf8_lossy(&raw).to_string();
        let (result, chunk_sizes_ok) = match version {
            NetconfVersion::V1_0 => (framing::decode_1_0(&text), true),
            NetconfVersion::V1_1 => self.patterns.decode_1_1(&text),
        };

        response.record(raw, result, chunk_sizes_ok);
        debug!(
            "netconf rpc message-id={} completed in {:?} (failed={})",
            message_id,
            response.elapsed,
            response.is_failed()
        );
        Ok(response)
    }

    /// `<get>` with an optional subtree filter.
    pub async fn get(&mut self, filter: Option<&str>) -> Result<NetconfResponse> {
        let payload = match filter {
            Some(filter) => format!("<get><filter>{}</filter></get>", filter),
            None => "<get></get>".to_string(),
        };
        self.send_rpc(&payload).await
    }

    /// `<get-config>` from the named datastore.
    pub async fn get_config(&mut self, source: &str) -> Result<NetconfResponse> {
        let payload = format!(
            "<get-config><source><{}/></source></get-config>",
            source
        );
        self.send_rpc(&payload).await
    }

    /// `<edit-config>` against the named datastore.
    pub async fn edit_config(&mut self, target: &str, config: &str) -> Result<NetconfResponse> {
        let payload = format!(
            "<edit-config><target><{}/></target><config>{}</config></edit-config>",
            target, config
        );
        self.send_rpc(&payload).await
    }

    /// `<commit>` the candidate datastore.
    pub async fn commit(&mut self) -> Result<NetconfResponse> {
        self.send_rpc("<commit/>").await
    }

    /// `<close-session>`.
    pub async fn close_session(&mut self) -> Result<NetconfResponse> {
        self.send_rpc("<close-session/>").await
    }

    /// Close the session, attempting a clean `<close-session>` first.
    pub async fn close(&mut self) -> Result<()> {
        if self.open {
            let _ = self.close_session().await;
            self.open = false;
        }
        self.channel.close().await
    }

    /// Capability URNs announced by the server.
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// The negotiated protocol version, once open.
    pub fn version(&self) -> Option<NetconfVersion> {
        self.version
    }

    /// Whether the server echoes client input, once probed.
    pub fn server_echo(&self) -> Option<bool> {
        self.server_echo
    }
}
