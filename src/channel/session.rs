//! The session channel: blocking-with-timeout pattern operations over a
//! transport.
//!
//! A background pump task is the transport's only reader. It sanitizes
//! each chunk and forwards it into a FIFO; every "read until X" operation
//! drains the FIFO into the channel's pattern buffer and returns once its
//! target matches the buffered tail. The pump is unaffected by an
//! individual operation's timeout: bytes accumulated for a timed-out
//! operation stay buffered and are visible to the next operation.

use std::time::Duration;

use bytes::Bytes;
use log::{debug, trace};
use regex::bytes::Regex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::buffer::{PatternBuffer, sanitize};
use super::config::{ChannelConfig, EchoCheck, MAX_TIMEOUT_OPS, SendOptions};
use super::patterns::PatternTable;
use crate::error::{ChannelError, Result};
use crate::transport::{Transport, TransportRead};

/// Raw and restructured output of a single `send_input` operation.
#[derive(Debug, Clone)]
pub struct ChannelOutput {
    /// Everything read for the operation, echo and trailing prompt included.
    pub raw: Vec<u8>,

    /// Restructured output: echo stripped, lines trimmed, prompt line
    /// removed when requested.
    pub processed: String,
}

/// One step of an interactive exchange (`reload`, `copy`, secondary
/// authentication and similar multi-prompt flows).
#[derive(Debug, Clone)]
pub struct InteractiveEvent {
    /// The text to send.
    pub input: String,

    /// Literal response text that completes this step. When absent the
    /// step completes on the channel prompt (or the caller's
    /// interaction-complete patterns).
    pub response: Option<String>,

    /// Hide the input in logs and skip the echo wait (passwords).
    pub hidden: bool,
}

impl InteractiveEvent {
    /// A step that completes on the channel prompt.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            response: None,
            hidden: false,
        }
    }

    /// A step that completes once `response` is seen.
    pub fn expecting(input: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            response: Some(response.into()),
            hidden: false,
        }
    }

    /// Mark this step's input as hidden.
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

/// What a blocking read is waiting for.
enum ReadTarget<'a> {
    /// A single pattern matched against the buffer tail.
    Pattern(&'a Regex),

    /// The first of several patterns; the matched index is returned.
    AnyPattern(&'a [Regex]),

    /// A literal marker anywhere in the buffer.
    Explicit(&'a [u8]),

    /// All input bytes present in order (echo detection).
    Fuzzy(&'a [u8]),
}

/// Session channel over an exclusive transport.
pub struct SessionChannel {
    config: ChannelConfig,
    patterns: PatternTable,
    transport: Box<dyn Transport>,
    writer: Option<Box<dyn crate::transport::TransportWrite>>,
    rx: Option<mpsc::UnboundedReceiver<Bytes>>,
    stop_tx: Option<watch::Sender<bool>>,
    pump: Option<JoinHandle<()>>,
    buf: PatternBuffer,
}

impl SessionChannel {
    /// Create a channel over `transport`. Patterns are compiled here,
    /// once; no I/O happens until `open()`.
    pub fn new(transport: Box<dyn Transport>, config: ChannelConfig) -> Result<Self> {
        let patterns = PatternTable::new(&config).map_err(ChannelError::InvalidPattern)?;
        let buf = PatternBuffer::new(config.search_depth);

        Ok(Self {
            config,
            patterns,
            transport,
            writer: None,
            rx: None,
            stop_tx: None,
            pump: None,
            buf,
        })
    }

    /// Open the transport and start the background pump.
    pub async fn open(&mut self) -> Result<()> {
        if self.writer.is_some() {
            return Ok(());
        }

        let (reader, writer) = self.transport.open().await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        self.pump = Some(tokio::spawn(pump(
            reader,
            tx,
            stop_rx,
            self.config.read_delay,
        )));
        self.writer = Some(writer);
        self.rx = Some(rx);
        self.stop_tx = Some(stop_tx);

        Ok(())
    }

    /// Stop the pump and close the transport.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(true);
        }
        if let Some(pump) = self.pump.take() {
            let _ = pump.await;
        }
        self.rx = None;
        self.writer = None;
        self.transport.close().await
    }

    /// Whether `open()` has completed.
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// The channel's compiled pattern table.
    pub fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    /// The channel configuration.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Write to the transport. Redacted values never reach the logs.
    pub async fn write(&mut self, data: &[u8], redacted: bool) -> Result<()> {
        if redacted {
            debug!("channel write: <redacted>");
        } else {
            debug!("channel write: {:?}", String::from_utf8_lossy(data));
        }
        self.writer
            .as_mut()
            .ok_or(ChannelError::NotOpen)?
            .write(data)
            .await
    }

    /// Send the configured return-character sequence.
    pub async fn send_return(&mut self) -> Result<()> {
        let ret = self.config.return_char.clone();
        self.write(ret.as_bytes(), false).await
    }

    /// Write followed by the return sequence.
    pub async fn write_and_return(&mut self, data: &[u8], redacted: bool) -> Result<()> {
        self.write(data, redacted).await?;
        self.send_return().await
    }

    /// Read until the channel prompt matches.
    pub async fn read_until_prompt(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>> {
        let timeout = self.resolve_timeout(timeout);
        let Self {
            rx, buf, patterns, ..
        } = self;
        let rx = rx.as_mut().ok_or(ChannelError::NotOpen)?;
        let (bytes, _) = read_until(rx, buf, ReadTarget::Pattern(patterns.prompt()), timeout).await?;
        Ok(bytes)
    }

    /// Read until a literal marker is seen anywhere in the buffered output.
    pub async fn read_until_explicit(
        &mut self,
        marker: &[u8],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>> {
        let timeout = self.resolve_timeout(timeout);
        let Self { rx, buf, .. } = self;
        let rx = rx.as_mut().ok_or(ChannelError::NotOpen)?;
        let (bytes, _) = read_until(rx, buf, ReadTarget::Explicit(marker), timeout).await?;
        Ok(bytes)
    }

    /// Read until the first of `patterns` matches. Returns the consumed
    /// bytes and the index of the pattern that matched.
    pub async fn read_until_any_prompt(
        &mut self,
        patterns: &[Regex],
        timeout: Option<Duration>,
    ) -> Result<(Vec<u8>, usize)> {
        let timeout = self.resolve_timeout(timeout);
        let Self { rx, buf, .. } = self;
        let rx = rx.as_mut().ok_or(ChannelError::NotOpen)?;
        read_until(rx, buf, ReadTarget::AnyPattern(patterns), timeout).await
    }

    /// Read until a single arbitrary pattern matches the buffer tail.
    pub async fn read_until_pattern(
        &mut self,
        pattern: &Regex,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>> {
        let timeout = self.resolve_timeout(timeout);
        let Self { rx, buf, .. } = self;
        let rx = rx.as_mut().ok_or(ChannelError::NotOpen)?;
        let (bytes, _) = read_until(rx, buf, ReadTarget::Pattern(pattern), timeout).await?;
        Ok(bytes)
    }

    async fn read_until_fuzzy(
        &mut self,
        input: &[u8],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>> {
        let timeout = self.resolve_timeout(timeout);
        let Self { rx, buf, .. } = self;
        let rx = rx.as_mut().ok_or(ChannelError::NotOpen)?;
        let (bytes, _) = read_until(rx, buf, ReadTarget::Fuzzy(input), timeout).await?;
        Ok(bytes)
    }

    /// Bounded probe: wait up to `probe_timeout` for any bytes to arrive.
    /// Arrived bytes stay buffered for the next read. Used for NETCONF
    /// server-echo detection; goes through the same FIFO as every other
    /// read so the pump stays the transport's only reader.
    pub async fn probe_read(&mut self, probe_timeout: Duration) -> Result<bool> {
        let Self { rx, buf, .. } = self;
        let rx = rx.as_mut().ok_or(ChannelError::NotOpen)?;

        while let Ok(chunk) = rx.try_recv() {
            buf.extend(&chunk);
        }
        if !buf.is_empty() {
            return Ok(true);
        }

        match tokio::time::timeout(probe_timeout, rx.recv()).await {
            Ok(Some(chunk)) => {
                buf.extend(&chunk);
                Ok(true)
            }
            Ok(None) => Err(ChannelError::Closed.into()),
            Err(_) => Ok(false),
        }
    }

    /// Send the return sequence and read the resulting prompt text.
    pub async fn get_prompt(&mut self) -> Result<String> {
        self.send_return().await?;
        let bytes = self.read_until_prompt(None).await?;

        let prompt = self
            .patterns
            .prompt()
            .find_iter(&bytes)
            .last()
            .map(|m| String::from_utf8_lossy(&bytes[m.start()..m.end()]).trim().to_string())
            .unwrap_or_default();

        Ok(prompt)
    }

    /// Send an input and collect its output.
    ///
    /// Writes the input, optionally waits for the device to echo it, sends
    /// the return sequence, then (unless eager) waits for the prompt and
    /// restructures the output.
    pub async fn send_input(&mut self, input: &str, opts: &SendOptions) -> Result<ChannelOutput> {
        let echo = opts.echo.unwrap_or(self.config.echo);
        let strip_prompt = opts.strip_prompt.unwrap_or(self.config.strip_prompt);
        let eager = opts.eager.unwrap_or(self.config.eager);
        let timeout = opts.timeout;

        self.write(input.as_bytes(), opts.redacted).await?;

        let mut raw = Vec::new();
        match echo {
            EchoCheck::None => {}
            EchoCheck::Exact => {
                raw.extend(self.read_until_explicit(input.as_bytes(), timeout).await?);
            }
            EchoCheck::Fuzzy => {
                raw.extend(self.read_until_fuzzy(input.as_bytes(), timeout).await?);
            }
        }

        self.send_return().await?;

        if !eager {
            raw.extend(self.read_until_prompt(timeout).await?);
        }

        let processed = restructure_output(&raw, input, strip_prompt, self.patterns.prompt());
        trace!("send_input: {} raw bytes", raw.len());

        Ok(ChannelOutput { raw, processed })
    }

    /// Drive an ordered interactive exchange.
    ///
    /// Each step writes its input, waits for the echo (unless hidden),
    /// sends the return sequence, then reads until the step's expected
    /// response — or, for steps without one, until an
    /// interaction-complete pattern or the channel prompt.
    pub async fn send_interactive(
        &mut self,
        events: &[InteractiveEvent],
        complete_patterns: &[Regex],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>> {
        let mut raw = Vec::new();

        for event in events {
            self.write(event.input.as_bytes(), event.hidden).await?;

            if !event.hidden && !event.input.is_empty() {
                raw.extend(self.read_until_fuzzy(event.input.as_bytes(), timeout).await?);
            }

            self.send_return().await?;

            match &event.response {
                Some(response) => {
                    raw.extend(self.read_until_explicit(response.as_bytes(), timeout).await?);
                }
                None if complete_patterns.is_empty() => {
                    raw.extend(self.read_until_prompt(timeout).await?);
                }
                None => {
                    let (bytes, _) = self
                        .read_until_any_prompt(complete_patterns, timeout)
                        .await?;
                    raw.extend(bytes);
                }
            }
        }

        Ok(raw)
    }

    /// Resolve a per-call timeout against the channel default. Zero means
    /// "no timeout" and is clamped to the hard maximum.
    fn resolve_timeout(&self, timeout: Option<Duration>) -> Duration {
        let t = timeout.unwrap_or(self.config.timeout_ops);
        if t.is_zero() {
            MAX_TIMEOUT_OPS
        } else {
            t.min(MAX_TIMEOUT_OPS)
        }
    }
}

/// Background pump: the transport's only reader for the channel's
/// lifetime. Sanitizes each chunk and forwards it into the FIFO until
/// stop is signaled or the transport ends.
async fn pump(
    mut reader: Box<dyn TransportRead>,
    tx: mpsc::UnboundedSender<Bytes>,
    mut stop: watch::Receiver<bool>,
    read_delay: Duration,
) {
    loop {
        tokio::select! {
            _ = stop.changed() => {
                trace!("channel pump: stop signaled");
                return;
            }
            read = reader.read() => match read {
                Ok(chunk) => {
                    let clean = sanitize(&chunk);
                    if !clean.is_empty() && tx.send(Bytes::from(clean)).is_err() {
                        return;
                    }
                    tokio::time::sleep(read_delay).await;
                }
                Err(e) => {
                    debug!("channel pump: transport read ended: {e}");
                    return;
                }
            },
        }
    }
}

/// Core read loop: drain the FIFO into the buffer until the target
/// matches or the timeout fires. On a match, only the bytes up to the
/// match end are consumed; the remainder stays buffered.
async fn read_until(
    rx: &mut mpsc::UnboundedReceiver<Bytes>,
    buf: &mut PatternBuffer,
    target: ReadTarget<'_>,
    timeout: Duration,
) -> Result<(Vec<u8>, usize)> {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        while let Ok(chunk) = rx.try_recv() {
            buf.extend(&chunk);
        }

        if let Some((idx, end)) = find_target(buf, &target) {
            return Ok((buf.split_to(end), idx));
        }

        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(chunk)) => buf.extend(&chunk),
            Ok(None) => return Err(ChannelError::Closed.into()),
            Err(_) => return Err(ChannelError::OperationTimeout(timeout).into()),
        }
    }
}

fn find_target(buf: &PatternBuffer, target: &ReadTarget<'_>) -> Option<(usize, usize)> {
    match target {
        ReadTarget::Pattern(pattern) => buf.search_tail(pattern).map(|(_, end)| (0, end)),
        ReadTarget::AnyPattern(patterns) => patterns
            .iter()
            .enumerate()
            .find_map(|(idx, p)| buf.search_tail(p).map(|(_, end)| (idx, end))),
        ReadTarget::Explicit(marker) => buf.find_explicit(marker).map(|(_, end)| (0, end)),
        ReadTarget::Fuzzy(input) => buf.fuzzy_find(input).map(|end| (0, end)),
    }
}

/// Restructure raw operation output: drop the echoed input, split into
/// lines with trailing whitespace trimmed, optionally drop the trailing
/// prompt line, and trim surrounding newline padding.
fn restructure_output(raw: &[u8], input: &str, strip_prompt: bool, prompt: &Regex) -> String {
    let text = String::from_utf8_lossy(raw);
    let mut rest: &str = &text;
    if let Some(stripped) = rest.strip_prefix(input) {
        rest = stripped;
    }

    let mut lines: Vec<&str> = rest.lines().map(str::trim_end).collect();

    if strip_prompt
        && lines
            .last()
            .is_some_and(|line| prompt.is_match(line.as_bytes()))
    {
        lines.pop();
    }

    lines.join("\n").trim_matches('\n').to_string()
}
