//! NETCONF session support: capability exchange, version negotiation,
//! and 1.0/1.1 message framing over a session channel.
//!
//! NETCONF has no privilege levels; this module shares only the session
//! channel's read/write/timeout machinery with the CLI driver.

mod builder;
mod channel;
pub mod framing;
mod response;

pub use builder::NetconfBuilder;
pub use channel::{DEFAULT_ECHO_PROBE_TIMEOUT, MESSAGE_ID_BASE, NetconfChannel};
pub use framing::NetconfVersion;
pub use response::NetconfResponse;
