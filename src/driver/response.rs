//! Response types recording the outcome of channel operations.

use std::time::{Duration, SystemTime};

use serde::Serialize;

/// Record of a single operation against a device: what was sent, what
/// came back, when, and whether the output classified as failed.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// Device host the operation ran against.
    pub host: String,

    /// Device port.
    pub port: u16,

    /// The input that was sent.
    pub channel_input: String,

    /// Raw bytes read for the operation (echo and prompt included).
    pub raw_result: Vec<u8>,

    /// Restructured output.
    pub result: String,

    /// When the operation started.
    pub start_time: SystemTime,

    /// When the operation finished recording.
    pub end_time: SystemTime,

    /// Elapsed wall time.
    pub elapsed: Duration,

    /// Substrings that mark the output as failed.
    pub failed_when_contains: Vec<String>,

    failed: bool,
}

impl Response {
    /// Start a response record. The clock starts now; call
    /// [`record`](Self::record) when the output is in.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        channel_input: impl Into<String>,
        failed_when_contains: Vec<String>,
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
            failed_when_contains,
            failed: false,
        }
    }

    /// Record the operation's output, stamping the end time and
    /// classifying failure from the configured substrings.
    pub fn record(&mut self, raw: Vec<u8>, result: String) {
        self.end_time = SystemTime::now();
        self.elapsed = self
            .end_time
            .duration_since(self.start_time)
            .unwrap_or(Duration::ZERO);

        self.failed = self
            .failed_when_contains
            .iter()
            .any(|marker| result.contains(marker));

        self.raw_result = raw;
        self.result = result;
    }

    /// Whether the output classified as failed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// The result lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }

    /// Check if the result contains a substring.
    pub fn contains(&self, substring: &str) -> bool {
        self.result.contains(substring)
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}

/// Ordered responses from a batch operation. Batch sends return whatever
/// was accumulated before an error, so completed work is never discarded.
#[derive(Debug, Clone, Serialize)]
pub struct MultiResponse {
    /// Device host the batch ran against.
    pub host: String,

    /// Responses in send order.
    pub responses: Vec<Response>,

    failed: bool,
}

impl MultiResponse {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            responses: Vec::new(),
            failed: false,
        }
    }

    /// Append a response, folding its failure state into the batch.
    pub fn record(&mut self, response: Response) {
        self.failed |= response.is_failed();
        self.responses.push(response);
    }

    /// Whether any recorded response classified as failed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Joined results of all responses.
    pub fn joined_result(&self) -> String {
        self.responses
            .iter()
            .map(|r| r.result.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_classifies_failure_from_substrings() {
        let mut response = Response::new(
            "router1",
            22,
            "show bogus",
            vec!["% Invalid input detected".to_string()],
        );
        response.record(
            b"% Invalid input detected at '^' marker.".to_vec(),
            "% Invalid input detected at '^' marker.".to_string(),
        );

        assert!(response.is_failed());
        assert!(response.end_time >= response.start_time);
    }

    #[test]
    fn multi_response_aggregates_failure() {
        let mut multi = MultiResponse::new("router1");

        let mut ok = Response::new("router1", 22, "show version", vec!["% Error".to_string()]);
        ok.record(b"fine".to_vec(), "fine".to_string());
        multi.record(ok);
        assert!(!multi.is_failed());

        let mut bad = Response::new("router1", 22, "show bogus", vec!["% Error".to_string()]);
        bad.record(b"% Error".to_vec(), "% Error".to_string());
        multi.record(bad);
        assert!(multi.is_failed());
    }
}
