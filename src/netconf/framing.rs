//! NETCONF message framing: 1.0 delimiter-based and 1.1 chunked.

use log::warn;
use serde::Serialize;

/// XML declaration prepended to every outbound message.
pub const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>";

/// NETCONF 1.0 end-of-message delimiter.
pub const DELIMITER_1_0: &str = "]]>]]>";

/// Base capability URN for NETCONF 1.0.
pub const CAPABILITY_1_0: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// Base capability URN for NETCONF 1.1.
pub const CAPABILITY_1_1: &str = "urn:ietf:params:xml:ns:netconf:base:1.1";

/// Negotiated NETCONF protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NetconfVersion {
    /// RFC 4741 framing: messages end with `]]>]]>`.
    V1_0,

    /// RFC 6242 chunked framing: `#<len>` prefixed chunks ending `##`.
    V1_1,
}

impl NetconfVersion {
    /// The base capability URN advertising this version.
    pub fn capability(&self) -> &'static str {
        match self {
            Self::V1_0 => CAPABILITY_1_0,
            Self::V1_1 => CAPABILITY_1_1,
        }
    }
}

/// Patterns used for framing and capability extraction, compiled once
/// per NETCONF session.
#[derive(Debug)]
pub(crate) struct FramingPatterns {
    /// 1.1 chunk matcher: declared size, then the chunk body.
    pub chunk: regex::Regex,

    /// Capability element scanner for the `<hello>` exchange.
    pub capability: regex::Regex,

    /// 1.1 end-of-message marker: `##` on its own line.
    pub terminator_1_1: regex::bytes::Regex,
}

impl FramingPatterns {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            chunk: regex::Regex::new(r"(?s)(\d+)\n(.*?)#")?,
            capability: regex::Regex::new(r"<capability>\s*(\S+?)\s*</capability>")?,
            terminator_1_1: regex::bytes::Regex::new(r"(?m)^##\s*$")?,
        })
    }

    /// Extract capability URN strings from a server `<hello>` without a
    /// general XML parser.
    pub fn extract_capabilities(&self, hello: &str) -> Vec<String> {
        self.capability
            .captures_iter(hello)
            .map(|cap| cap[1].to_string())
            .collect()
    }

    /// Decode a 1.1 chunked message. Returns the joined body and whether
    /// every chunk's declared size matched its actual size. A mismatch is
    /// a framing integrity failure recorded on the response, not a hard
    /// error.
    pub fn decode_1_1(&self, raw: &str) -> (String, bool) {
        let mut sizes_ok = true;
        let mut joined = String::new();

        for cap in self.chunk.captures_iter(raw) {
            let declared: usize = cap[1].parse().unwrap_or(0);
            let body = &cap[2];
            let actual = body.len().saturating_sub(1);

            if declared != actual {
                warn!(
                    "netconf 1.1 chunk size mismatch: declared {} actual {}",
                    declared, actual
                );
                sizes_ok = false;
            }

            joined.push_str(body.strip_suffix('\n').unwrap_or(body));
        }

        (strip_header(&joined), sizes_ok)
    }
}

/// Wrap an XML payload in an `<rpc>` element with a message id.
pub fn wrap_rpc(payload: &str, message_id: u64) -> String {
    format!(
        "<rpc message-id=\"{}\" xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">{}</rpc>",
        message_id, payload
    )
}

/// Build the client `<hello>` advertising exactly the negotiated version.
pub fn client_hello(version: NetconfVersion) -> String {
    format!(
        "<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"><capabilities><capability>{}</capability></capabilities></hello>",
        version.capability()
    )
}

/// Frame an XML message for the wire.
pub fn encode(payload: &str, version: NetconfVersion) -> String {
    let message = format!("{}\n{}", XML_HEADER, payload);
    match version {
        NetconfVersion::V1_0 => format!("{}\n{}", message, DELIMITER_1_0),
        NetconfVersion::V1_1 => format!("#{}\n{}\n##", message.len(), message),
    }
}

/// Decode a 1.0 delimiter-framed message.
pub fn decode_1_0(raw: &str) -> String {
    let body = raw.trim_end();
    let body = body.strip_suffix(DELIMITER_1_0).unwrap_or(body);
    strip_header(body.trim())
}

/// Drop a leading XML declaration, if present.
fn strip_header(message: &str) -> String {
    if let Some(rest) = message.strip_prefix("<?xml") {
        if let Some(end) = rest.find("?>") {
            return rest[end + 2..].trim_start_matches(['\r', '\n']).to_string();
        }
    }
    message.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunked_round_trip_is_lossless() {
        let patterns = FramingPatterns::new().unwrap();
        let payload = "<rpc message-id=\"101\" xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"><get-config><source><running/></source></get-config></rpc>";

        let wire = encode(payload, NetconfVersion::V1_1);
        let (decoded, sizes_ok) = patterns.decode_1_1(&wire);

        assert!(sizes_ok);
        assert_eq!(decoded, payload);
    }

    #[test]
    fn delimiter_round_trip_is_lossless() {
        let payload = "<rpc message-id=\"101\" xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"><get/></rpc>";

        let wire = encode(payload, NetconfVersion::V1_0);
        assert!(wire.ends_with("]]>]]>"));
        assert_eq!(decode_1_0(&wire), payload);
    }

    #[test]
    fn multi_chunk_messages_join_in_order() {
        let patterns = FramingPatterns::new().unwrap();
        let raw = "#4\n<rpc\n#6\n-reply\n##";
        let (decoded, sizes_ok) = patterns.decode_1_1(raw);

        assert!(sizes_ok);
        assert_eq!(decoded, "<rpc-reply");
    }

    #[test]
    fn chunk_size_mismatch_is_detected() {
        let patterns = FramingPatterns::new().unwrap();
        // Declared 99 bytes, actual 4
        let raw = "#99\ndata\n##";
        let (decoded, sizes_ok) = patterns.decode_1_1(raw);

        assert!(!sizes_ok);
        assert_eq!(decoded, "data");
    }

    #[test]
    fn capabilities_are_extracted_without_xml_parsing() {
        let patterns = FramingPatterns::new().unwrap();
        let hello = "<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"><capabilities>\
                     <capability>urn:ietf:params:xml:ns:netconf:base:1.0</capability>\
                     <capability> urn:ietf:params:xml:ns:netconf:base:1.1 </capability>\
                     <capability>urn:ietf:params:netconf:capability:candidate:1.0</capability>\
                     </capabilities><session-id>17</session-id></hello>]]>]]>";

        let caps = patterns.extract_capabilities(hello);
        assert_eq!(caps.len(), 3);
        assert!(caps.contains(&CAPABILITY_1_1.to_string()));
    }

    #[test]
    fn rpc_wrapper_carries_message_id() {
        let rpc = wrap_rpc("<get/>", 101);
        assert!(rpc.contains("message-id=\"101\""));
        assert!(rpc.ends_with("</rpc>"));
    }
}
