//! Network driver: operation-level CLI interaction over a session
//! channel.

use log::{debug, info};
use secrecy::SecretString;

use super::privilege::PrivilegeManager;
use super::response::{MultiResponse, Response};
use crate::channel::{
    self, EchoCheck, InChannelAuthOptions, InteractiveEvent, SendOptions, SessionChannel,
};
use crate::error::{DriverError, Error, Result};
use crate::platform::PlatformDefinition;

/// Driver for CLI sessions against network devices.
///
/// Owns the session channel, the platform configuration, and the
/// privilege engine. One logical operation is in flight at a time;
/// `&mut self` enforces the contract at compile time.
pub struct NetworkDriver {
    host: String,
    port: u16,
    channel: SessionChannel,
    platform: PlatformDefinition,
    privileges: PrivilegeManager,
    in_channel_auth: Option<InChannelAuthOptions>,
    auth_secondary: Option<SecretString>,
    open: bool,
}

impl NetworkDriver {
    pub(crate) fn new(
        host: String,
        port: u16,
        channel: SessionChannel,
        platform: PlatformDefinition,
        in_channel_auth: Option<InChannelAuthOptions>,
        auth_secondary: Option<SecretString>,
    ) -> Self {
        let privileges = PrivilegeManager::new(platform.privilege_levels.clone());
        Self {
            host,
            port,
            channel,
            platform,
            privileges,
            in_channel_auth,
            auth_secondary,
            open: false,
        }
    }

    /// Open the connection: transport + pump, in-channel authentication
    /// when configured, default privilege acquisition, then the
    /// platform's on-open commands.
    pub async fn open(&mut self) -> Result<()> {
        if self.open {
            return Err(DriverError::AlreadyConnected.into());
        }

        info!("opening connection to {}:{}", self.host, self.port);
        self.channel.open().await?;

        if let Some(auth) = self.in_channel_auth.clone() {
            channel::auth::authenticate(&mut self.channel, &auth).await?;
        }

        self.open = true;

        let default = self.platform.default_privilege.clone();
        if !default.is_empty() {
            self.acquire_privilege(&default).await?;
        }

        for command in self.platform.on_open_commands.clone() {
            self.send_command(&command).await?;
        }

        Ok(())
    }

    /// Close the connection, running the platform's on-close commands
    /// best-effort first.
    pub async fn close(&mut self) -> Result<()> {
        if self.open {
            debug!("closing connection to {}:{}", self.host, self.port);
            // Fire-and-forget: the device may not echo or prompt again
            let eager = SendOptions {
                eager: Some(true),
                echo: Some(EchoCheck::None),
                ..SendOptions::default()
            };
            for command in self.platform.on_close_commands.clone() {
                // The device may drop the connection mid-list
                if self.channel.send_input(&command, &eager).await.is_err() {
                    break;
                }
            }
            self.open = false;
        }

        self.privileges.clear_current();
        self.channel.close().await
    }

    /// Whether the driver is connected.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The tracked current privilege level name, if known.
    pub fn current_privilege(&self) -> Option<&str> {
        self.privileges.current()
    }

    /// The platform definition this driver runs with.
    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// Send the return sequence and read the resulting prompt text.
    pub async fn get_prompt(&mut self) -> Result<String> {
        self.ensure_open()?;
        self.channel.get_prompt().await
    }

    /// Drive the session to the named privilege level.
    pub async fn acquire_privilege(&mut self, name: &str) -> Result<()> {
        self.ensure_open()?;
        self.privileges
            .acquire(&mut self.channel, name, self.auth_secondary.as_ref())
            .await
    }

    /// Send a command at the platform's default privilege level and wait
    /// for the prompt.
    pub async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.ensure_open()?;

        let default = self.platform.default_privilege.clone();
        if !default.is_empty() && self.privileges.current() != Some(default.as_str()) {
            self.privileges
                .acquire(&mut self.channel, &default, self.auth_secondary.as_ref())
                .await?;
        }

        self.execute(command).await
    }

    /// Send commands sequentially. Partial results accumulated before an
    /// error are returned alongside it, so nothing already obtained is
    /// discarded.
    pub async fn send_commands(&mut self, commands: &[&str]) -> (MultiResponse, Option<Error>) {
        let mut multi = MultiResponse::new(&self.host);

        for command in commands {
            match self.send_command(command).await {
                Ok(response) => multi.record(response),
                Err(e) => return (multi, Some(e)),
            }
        }

        (multi, None)
    }

    /// Send configuration commands: acquire the platform's configuration
    /// privilege, send each command, then return to the previous level.
    /// Partial results are returned alongside any error.
    pub async fn send_configs(&mut self, configs: &[&str]) -> (MultiResponse, Option<Error>) {
        let mut multi = MultiResponse::new(&self.host);

        if let Err(e) = self.ensure_open() {
            return (multi, Some(e));
        }

        let restore = self
            .privileges
            .current()
            .unwrap_or(&self.platform.default_privilege)
            .to_string();
        let config_priv = self.platform.config_privilege.clone();

        if let Err(e) = self
            .privileges
            .acquire(&mut self.channel, &config_priv, self.auth_secondary.as_ref())
            .await
        {
            return (multi, Some(e));
        }

        for config in configs {
            match self.execute(config).await {
                Ok(response) => multi.record(response),
                Err(e) => return (multi, Some(e)),
            }
        }

        if !restore.is_empty() && restore != config_priv {
            if let Err(e) = self
                .privileges
                .acquire(&mut self.channel, &restore, self.auth_secondary.as_ref())
                .await
            {
                return (multi, Some(e));
            }
        }

        (multi, None)
    }

    /// Send a single configuration command.
    pub async fn send_config(&mut self, config: &str) -> Result<Response> {
        let (mut multi, err) = self.send_configs(&[config]).await;
        if let Some(e) = err {
            return Err(e);
        }
        Ok(multi.responses.remove(0))
    }

    /// Drive an interactive exchange (`reload`, `copy`, and similar
    /// multi-prompt commands).
    pub async fn send_interactive(&mut self, events: &[InteractiveEvent]) -> Result<Response> {
        self.ensure_open()?;

        let shown_input = events
            .iter()
            .map(|e| if e.hidden { "<redacted>" } else { e.input.as_str() })
            .collect::<Vec<_>>()
            .join(", ");

        let mut response = Response::new(
            &self.host,
            self.port,
            shown_input,
            self.platform.failed_when_contains.clone(),
        );

        let raw = self.channel.send_interactive(events, &[], None).await?;
        let text = String::from_utf8_lossy(&raw).to_string();
        response.record(raw, text);
        Ok(response)
    }

    async fn execute(&mut self, command: &str) -> Result<Response> {
        let mut response = Response::new(
            &self.host,
            self.port,
            command,
            self.platform.failed_when_contains.clone(),
        );

        let out = self
            .channel
            .send_input(command, &SendOptions::default())
            .await?;
        response.record(out.raw, out.processed);

        debug!(
            "command {:?} completed in {:?} (failed={})",
            command,
            response.elapsed,
            response.is_failed()
        );
        Ok(response)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(DriverError::NotConnected.into())
        }
    }
}
