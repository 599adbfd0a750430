//! Error types for promptwire.

use std::io;
use thiserror::Error;

/// Main error type for promptwire operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level errors (SSH/Telnet connection, I/O)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// NETCONF session errors
    #[error("NETCONF error: {0}")]
    Netconf(#[from] NetconfError),

    /// Platform/vendor errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

/// Transport layer errors (connection setup, raw reads/writes).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Transport-level authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Connection was closed unexpectedly (EOF on the byte stream)
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (pattern matching, in-channel authentication).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// A blocking read did not see its pattern before the timeout fired
    #[error("Pattern not found within {0:?}")]
    OperationTimeout(std::time::Duration),

    /// A credential prompt was seen beyond the retry ceiling
    #[error("In-channel authentication failed: '{prompt_kind}' prompt seen {seen} times")]
    AuthenticationFailed { prompt_kind: String, seen: u32 },

    /// In-channel authentication did not complete before the timeout
    #[error("In-channel authentication timed out after {0:?}")]
    AuthenticationTimeout(std::time::Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// Channel is not open
    #[error("Channel not open - call open() first")]
    NotOpen,

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Driver layer errors (command execution, privilege escalation).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not connected
    #[error("Driver not connected - call open() first")]
    NotConnected,

    /// Driver already connected
    #[error("Driver already connected")]
    AlreadyConnected,

    /// The requested privilege level is not a configured level name
    #[error("Invalid desired privilege level '{name}'")]
    InvalidDesiredPrivilegeLevel { name: String },

    /// The prompt text matched no configured privilege level
    #[error("Could not determine current privilege level from prompt: '{prompt}'")]
    UnknownCurrentPrivilegeLevel { prompt: String },

    /// Transition-count ceiling exceeded while navigating privilege levels
    #[error("Failed to acquire requested privilege level '{target}'")]
    PrivilegeAcquisitionFailed { target: String },

    /// No path found between privilege levels
    #[error("No path from privilege '{from}' to '{to}'")]
    NoPrivilegePath { from: String, to: String },
}

/// NETCONF session errors (capabilities exchange, framing negotiation).
#[derive(Error, Debug)]
pub enum NetconfError {
    /// No common protocol version, or malformed/missing server `<hello>`
    #[error("Capabilities exchange failed: {reason}")]
    CapabilitiesExchangeFailed { reason: String },

    /// Session not open
    #[error("NETCONF session not open - call open() first")]
    NotOpen,
}

/// Platform/vendor definition errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Invalid platform definition
    #[error("Invalid platform definition: {message}")]
    InvalidDefinition { message: String },

    /// Platform name is not registered
    #[error("Unknown platform '{name}'")]
    UnknownPlatform { name: String },

    /// Platform name is already registered
    #[error("Platform '{name}' already registered")]
    AlreadyRegistered { name: String },
}

/// Result type alias using promptwire's Error.
pub type Result<T> = std::result::Result<T, Error>;
