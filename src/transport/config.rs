//! Transport connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// PTY dimensions requested on interactive channels.
#[derive(Debug, Clone, Copy)]
pub struct PtyOptions {
    /// Terminal width in columns.
    pub width: u32,

    /// Terminal height in rows.
    pub height: u32,
}

impl Default for PtyOptions {
    fn default() -> Self {
        Self {
            width: 511,
            height: 24,
        }
    }
}

/// SSH connection configuration.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Authentication method.
    pub auth: AuthMethod,

    /// Connection timeout.
    pub timeout: Duration,

    /// PTY dimensions.
    pub pty: PtyOptions,

    /// SSH subsystem to request instead of a PTY + shell (e.g. "netconf").
    pub subsystem: Option<String>,

    /// Verify the server host key against known_hosts, learning new keys.
    /// When false all host keys are accepted (lab use).
    pub verify_host_key: bool,

    /// Path to known_hosts file. `None` uses the user default.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// Create a config for `host` with defaults.
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            auth: AuthMethod::None,
            timeout: Duration::from_secs(30),
            pty: PtyOptions::default(),
            subsystem: None,
            verify_host_key: false,
            known_hosts_path: None,
        }
    }
}

/// Authentication method for SSH connections.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// No transport-level authentication. Use this for devices that
    /// authenticate in-channel (login prompt on the byte stream).
    None,

    /// Password authentication.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },
}

/// Telnet connection configuration.
#[derive(Debug, Clone)]
pub struct TelnetConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// Telnet port (default: 23).
    pub port: u16,

    /// Connection timeout.
    pub timeout: Duration,
}

impl TelnetConfig {
    /// Create a config for `host` with defaults.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 23,
            timeout: Duration::from_secs(30),
        }
    }
}
