//! # Promptwire
//!
//! Async SSH/Telnet CLI and NETCONF scraper library for network device
//! automation.
//!
//! Promptwire drives interactive sessions against routers and switches:
//! it recognizes "the device is done responding" on an unstructured byte
//! stream, walks multi-step authentication and privilege changes, and
//! frames/deframes NETCONF RPCs (1.0 delimiter and 1.1 chunked).
//!
//! ## Features
//!
//! - Async SSH (russh) and telnet transports behind one trait, plus a
//!   replay transport for tests
//! - Tail-window prompt matching that stays fast on multi-megabyte output
//! - In-channel authentication with a credential-prompt retry ceiling
//! - Privilege level navigation over a configured level tree
//! - NETCONF capability exchange, version negotiation, and chunk framing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use promptwire::DriverBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), promptwire::Error> {
//!     let mut driver = DriverBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .platform("cisco_iosxe")
//!         .build()?;
//!
//!     driver.open().await?;
//!
//!     let response = driver.send_command("show version").await?;
//!     println!("{}", response.result);
//!
//!     driver.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod netconf;
pub mod platform;
pub mod transport;

// Re-export main types for convenience
pub use channel::{
    ChannelConfig, EchoCheck, InChannelAuthOptions, InteractiveEvent, SendOptions, SessionChannel,
};
pub use driver::{DriverBuilder, MultiResponse, NetworkDriver, Response};
pub use error::Error;
pub use netconf::{NetconfBuilder, NetconfChannel, NetconfResponse, NetconfVersion};
pub use platform::{PlatformDefinition, PrivilegeLevel};
pub use transport::{AuthMethod, ReplayTransport, SshConfig, TelnetConfig, Transport};
