//! Builder for network drivers.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::network::NetworkDriver;
use crate::channel::{ChannelConfig, InChannelAuthOptions, SessionChannel};
use crate::error::{PlatformError, Result};
use crate::platform::{PlatformDefinition, PlatformRegistry};
use crate::transport::{
    AuthMethod, SshConfig, SshTransport, TelnetConfig, TelnetTransport, Transport,
};

enum TransportChoice {
    Ssh,
    Telnet,
    Custom(Box<dyn Transport>),
}

/// Builder for [`NetworkDriver`].
///
/// # Example
///
/// ```rust,no_run
/// use promptwire::DriverBuilder;
///
/// # async fn example() -> Result<(), promptwire::Error> {
/// let mut driver = DriverBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .platform("cisco_iosxe")
///     .build()?;
///
/// driver.open().await?;
/// let response = driver.send_command("show version").await?;
/// println!("{}", response.result);
/// driver.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct DriverBuilder {
    host: String,
    port: Option<u16>,
    username: Option<String>,
    password: Option<SecretString>,
    private_key: Option<(PathBuf, Option<SecretString>)>,
    auth_secondary: Option<SecretString>,
    in_channel_auth: Option<bool>,
    platform_name: Option<String>,
    custom_platform: Option<PlatformDefinition>,
    transport: TransportChoice,
    timeout: Duration,
    timeout_ops: Option<Duration>,
    read_delay: Option<Duration>,
    search_depth: Option<usize>,
}

impl DriverBuilder {
    /// Create a builder for the specified host. SSH is the default
    /// transport.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            username: None,
            password: None,
            private_key: None,
            auth_secondary: None,
            in_channel_auth: None,
            platform_name: None,
            custom_platform: None,
            transport: TransportChoice::Ssh,
            timeout: Duration::from_secs(30),
            timeout_ops: None,
            read_delay: None,
            search_depth: None,
        }
    }

    /// Set the port (defaults: 22 for SSH, 23 for telnet).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
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

    /// Use private key authentication with a passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        path: impl Into<PathBuf>,
        passphrase: impl Into<SecretString>,
    ) -> Self {
        self.private_key = Some((path.into(), Some(passphrase.into())));
        self
    }

    /// Set the secondary credential used for privilege escalation
    /// (e.g. an enable secret).
    pub fn auth_secondary(mut self, secret: impl Into<SecretString>) -> Self {
        self.auth_secondary = Some(secret.into());
        self
    }

    /// Force in-channel authentication on or off. Defaults to on for
    /// telnet, off for SSH (where the transport authenticates).
    pub fn in_channel_auth(mut self, enabled: bool) -> Self {
        self.in_channel_auth = Some(enabled);
        self
    }

    /// Select a registered platform by name.
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform_name = Some(platform.into());
        self
    }

    /// Use a custom platform definition.
    pub fn custom_platform(mut self, platform: PlatformDefinition) -> Self {
        self.custom_platform = Some(platform);
        self
    }

    /// Use telnet instead of SSH.
    pub fn telnet(mut self) -> Self {
        self.transport = TransportChoice::Telnet;
        self
    }

    /// Use a custom transport (testing, replay, exec).
    pub fn custom_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = TransportChoice::Custom(transport);
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

    /// Set the pump's read delay.
    pub fn read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Set the prompt search depth.
    pub fn search_depth(mut self, depth: usize) -> Self {
        self.search_depth = Some(depth);
        self
    }

    /// Build the driver. No connection is made until `open()`.
    pub fn build(self) -> Result<NetworkDriver> {
        let platform = match (self.custom_platform, &self.platform_name) {
            (Some(custom), _) => custom,
            (None, Some(name)) => PlatformRegistry::global()
                .read()
                .map_err(|_| PlatformError::InvalidDefinition {
                    message: "failed to acquire registry lock".to_string(),
                })?
                .get(name)
                .cloned()
                .ok_or_else(|| PlatformError::UnknownPlatform { name: name.clone() })?,
            (None, None) => {
                return Err(PlatformError::InvalidDefinition {
                    message: "platform must be specified".to_string(),
                }
                .into());
            }
        };

        let mut config = ChannelConfig {
            prompt_pattern: platform.combined_prompt_pattern(),
            return_char: platform.return_char.clone(),
            ..ChannelConfig::default()
        };
        if let Some(timeout_ops) = self.timeout_ops {
            config.timeout_ops = timeout_ops;
        }
        if let Some(read_delay) = self.read_delay {
            config.read_delay = read_delay;
        }
        if let Some(search_depth) = self.search_depth {
            config.search_depth = search_depth;
        }

        let is_telnet = matches!(self.transport, TransportChoice::Telnet);
        let port = self.port.unwrap_or(if is_telnet { 23 } else { 22 });

        let transport: Box<dyn Transport> = match self.transport {
            TransportChoice::Custom(transport) => transport,
            TransportChoice::Telnet => Box::new(TelnetTransport::new(TelnetConfig {
                host: self.host.clone(),
                port,
                timeout: self.timeout,
            })),
            TransportChoice::Ssh => {
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

                Box::new(SshTransport::new(SshConfig {
                    host: self.host.clone(),
                    port,
                    username,
                    auth,
                    timeout: self.timeout,
                    ..SshConfig::new("", "")
                }))
            }
        };

        // Telnet (and custom transports that ask for it) authenticate on
        // the byte stream itself
        let wants_in_channel = self.in_channel_auth.unwrap_or(is_telnet);
        let in_channel_auth = if wants_in_channel {
            Some(InChannelAuthOptions {
                username: self.username.clone().unwrap_or_default(),
                password: self
                    .password
                    .clone()
                    .unwrap_or_else(|| SecretString::from(String::new())),
                passphrase: None,
                timeout: None,
            })
        } else {
            None
        };

        let channel = SessionChannel::new(transport, config)?;

        Ok(NetworkDriver::new(
            self.host,
            port,
            channel,
            platform,
            in_channel_auth,
            self.auth_secondary,
        ))
    }
}
