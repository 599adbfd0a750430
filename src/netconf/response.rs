//! NETCONF response records.

use std::time::{Duration, SystemTime};

use serde::Serialize;

use super::framing::NetconfVersion;

/// Markers whose presence in a decoded reply classifies it as failed.
pub const ERROR_MARKERS: [&str; 4] = [
    "<rpc-error>",
    "<rpc-errors>",
    "</rpc-error>",
    "</rpc-errors>",
];

/// Record of one RPC exchange on a NETCONF session.
#[derive(Debug, Clone, Serialize)]
pub struct NetconfResponse {
    /// Device host the RPC ran against.
    pub host: String,

    /// Device port.
    pub port: u16,

    /// The RPC payload that was sent (unframed).
    pub channel_input: String,

    /// Raw bytes read for the exchange, framing included.
    pub raw_result: Vec<u8>,

    /// Decoded reply, framing and XML header stripped.
    pub result: String,

    /// When the exchange started.
    pub start_time: SystemTime,

    /// When the exchange finished recording.
    pub end_time: SystemTime,

    /// Elapsed wall time.
    pub elapsed: Duration,

    /// Protocol version the exchange used.
    pub version: NetconfVersion,

    /// Whether every 1.1 chunk's declared size matched its actual size.
    /// Always true for 1.0 exchanges.
    pub chunk_sizes_ok: bool,

    failed: bool,
}

impl NetconfResponse {
    /// Start a response record; the clock starts now.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        channel_input: impl Into<String>,
        version: NetconfVersion,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            host: host.into(),
            port,
            channel_input: channel_input.into(),
            raw_result: Vec::new(),
            result: String::new(),
            start_time: now,
            end_time: now,
            elapsed: Duration::ZERO,
            version,
            chunk_sizes_ok: true,
            failed: false,
        }
    }

    /// Record the decoded reply. A reply is failed if it carries any
    /// rpc-error marker, or if 1.1 chunk validation failed.
    pub fn record(&mut self, raw: Vec<u8>, result: String, chunk_sizes_ok: bool) {
        self.end_time = SystemTime::now();
        self.elapsed = self
            .end_time
            .duration_since(self.start_time)
            .unwrap_or(Duration::ZERO);

        self.chunk_sizes_ok = chunk_sizes_ok;
        self.failed =
            !chunk_sizes_ok || ERROR_MARKERS.iter().any(|marker| result.contains(marker));

        self.raw_result = raw;
        self.result = result;
    }

    /// Whether the reply classified as failed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }
}

impl std::fmt::Display for NetconfResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}
