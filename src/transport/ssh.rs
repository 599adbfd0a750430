//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use russh::client::{self, Handle};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, SshConfig};
use super::{StreamRead, StreamWrite, Transport, TransportRead, TransportWrite};
use crate::error::{Result, TransportError};

/// SSH transport wrapping a russh client session.
///
/// `open()` connects, authenticates, requests a PTY and shell, and splits
/// the shell channel into read/write halves for the session channel.
pub struct SshTransport {
    config: SshConfig,
    session: Option<Handle<SshHandler>>,
}

impl SshTransport {
    /// Create a transport for the given configuration. No I/O happens
    /// until `open()`.
    pub fn new(config: SshConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    async fn authenticate(session: &mut Handle<SshHandler>, config: &SshConfig) -> Result<()> {
        let success = match &config.auth {
            AuthMethod::None => session
                .authenticate_none(&config.username)
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::Password(password) => session
                .authenticate_password(&config.username, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::PrivateKey { path, passphrase } => {
                let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                    .map_err(|e| TransportError::Key(e.to_string()))?;

                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                session
                    .authenticate_publickey(
                        &config.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn open(&mut self) -> Result<(Box<dyn TransportRead>, Box<dyn TransportWrite>)> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });

        let handler = SshHandler {
            host: self.config.host.clone(),
            port: self.config.port,
            verify_host_key: self.config.verify_host_key,
            known_hosts_path: self.config.known_hosts_path.clone(),
        };

        let mut session = tokio::time::timeout(
            self.config.timeout,
            client::connect(
                ssh_config,
                (self.config.host.as_str(), self.config.port),
                handler,
            ),
        )
        .await
        .map_err(|_| TransportError::Timeout(self.config.timeout))?
        .map_err(TransportError::Ssh)?;

        Self::authenticate(&mut session, &self.config).await?;

        let channel = session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        match &self.config.subsystem {
            Some(subsystem) => {
                channel
                    .request_subsystem(true, subsystem)
                    .await
                    .map_err(TransportError::Ssh)?;
            }
            None => {
                channel
                    .request_pty(
                        true,
                        "xterm",
                        self.config.pty.width,
                        self.config.pty.height,
                        0,
                        0,
                        &[],
                    )
                    .await
                    .map_err(TransportError::Ssh)?;

                channel
                    .request_shell(true)
                    .await
                    .map_err(TransportError::Ssh)?;
            }
        }

        let (reader, writer) = tokio::io::split(channel.into_stream());
        self.session = Some(session);

        Ok((
            Box::new(StreamRead::new(reader)),
            Box::new(StreamWrite::new(writer)),
        ))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            session
                .disconnect(russh::Disconnect::ByApplication, "", "en")
                .await
                .map_err(TransportError::Ssh)?;
        }
        Ok(())
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    verify_host_key: bool,
    known_hosts_path: Option<PathBuf>,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        if !self.verify_host_key {
            return Ok(true);
        }

        let known = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, server_public_key, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, server_public_key)
        };

        match known {
            Ok(true) => Ok(true),
            Ok(false) => {
                // Unknown host: learn the key
                let learned = if let Some(ref path) = self.known_hosts_path {
                    russh::keys::known_hosts::learn_known_hosts_path(
                        &self.host,
                        self.port,
                        server_public_key,
                        path,
                    )
                } else {
                    russh::keys::known_hosts::learn_known_hosts(
                        &self.host,
                        self.port,
                        server_public_key,
                    )
                };
                if let Err(e) = learned {
                    warn!("failed to save host key for {}: {}", self.host, e);
                }
                Ok(true)
            }
            Err(e) => {
                warn!("host key verification failed for {}: {}", self.host, e);
                Ok(false)
            }
        }
    }
}
