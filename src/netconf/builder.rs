//! Builder for NETCONF channels.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::channel::NetconfChannel;
use super::framing::DELIMITER_1_0;
use crate::channel::{ChannelConfig, EchoCheck, SessionChannel};
use crate::error::{PlatformError, Result};
use crate::transport::{AuthMethod, SshConfig, SshTransport, Transport};

/// Builder for [`NetconfChannel`] sessions.
///
/// # Example
///
/// ```rust,no_run
/// use promptwire::netconf::NetconfBuilder;
///
/// # async fn example() -> Result<(), promptwire::Error> {
/// let mut session = NetconfBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .build()?;
///
/// session.open(None).await?;
/// let reply = session.get_config("running").await?;
/// println!("{}", reply.result);
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct NetconfBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<SecretString>,
    private_key: Option<(PathBuf, Option<SecretString>)>,
    timeout: Duration,
    timeout_ops: Option<Duration>,
    transport: Option<Box<dyn Transport>>,
}

impl NetconfBuilder {
    /// Create a builder for the specified host. The session runs over
    /// the SSH "netconf" subsystem on port 830 unless overridden.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 830,
            username: None,
            password: None,
            private_key: None,
            timeout: Duration::from_secs(30),
            timeout_ops: None,
            transport: None,
        }
    }

    /// Set the port (default: 830).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<SecretString>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Use private key authentication.
    pub fn private_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_key = Some((path.into(), None));
        self
    }

    /// Set the connection timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the default timeout for channel operations.
    pub fn timeout_ops(mut self, timeout: Duration) -> Self {
        self.timeout_ops = Some(timeout);
        self
    }

    /// Use a custom transport (testing, replay).
    pub fn custom_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the NETCONF channel. No connection is made until `open()`.
    pub fn build(self) -> Result<NetconfChannel> {
        let mut config = ChannelConfig {
            // The channel prompt is the 1.0 delimiter; RPC reads switch to
            // the negotiated end-of-message pattern explicitly
            prompt_pattern: regex::escape(DELIMITER_1_0),
            echo: EchoCheck::None,
            ..ChannelConfig::default()
        };
        if let Some(timeout_ops) = self.timeout_ops {
            config.timeout_ops = timeout_ops;
        }

        let transport: Box<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                let username = self.username.clone().ok_or_else(|| {
                    PlatformError::InvalidDefinition {
                        message: "username is required for SSH".to_string(),
                    }
                })?;

                let auth = match (&self.private_key, &self.password) {
                    (Some((path, passphrase)), _) => AuthMethod::PrivateKey {
                        path: path.clone(),
                        passphrase: passphrase.clone(),
                    },
                    (None, Some(password)) => AuthMethod::Password(password.clone()),
                    (None, None) => AuthMethod::None,
                };

                let mut ssh = SshConfig::new(self.host.clone(), username);
                ssh.port = self.port;
                ssh.auth = auth;
                ssh.timeout = self.timeout;
                ssh.subsystem = Some("netconf".to_string());
                Box::new(SshTransport::new(ssh))
            }
        };

        let channel = SessionChannel::new(transport, config)?;
        NetconfChannel::new(channel, self.host, self.port)
    }
}
