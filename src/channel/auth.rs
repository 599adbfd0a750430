//! In-channel authentication: driving login prompts that appear on the
//! byte stream itself (telnet login, SSH keyboard-interactive fallbacks).
//!
//! The state machine repeatedly reads until one of {session prompt,
//! username prompt, password prompt, passphrase prompt} matches and
//! answers credential prompts as they appear. Seeing any single
//! credential prompt more than the configured ceiling means the device is
//! rejecting the credential and re-asking; that is the only defense
//! against an infinite retry loop, and it fails authentication hard.

use std::time::Duration;

use log::debug;
use secrecy::{ExposeSecret, SecretString};

use super::session::SessionChannel;
use crate::error::{ChannelError, Error, Result};

/// Credentials and limits for in-channel authentication.
#[derive(Debug, Clone)]
pub struct InChannelAuthOptions {
    /// Username sent at a username/login prompt.
    pub username: String,

    /// Password sent at a password prompt.
    pub password: SecretString,

    /// Passphrase sent at a key passphrase prompt, if one is configured.
    pub passphrase: Option<SecretString>,

    /// Overall timeout for the whole authentication exchange. `None`
    /// falls back to the channel's operation timeout.
    pub timeout: Option<Duration>,
}

impl InChannelAuthOptions {
    pub fn new(username: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            passphrase: None,
            timeout: None,
        }
    }
}

/// Indices into the pattern list handed to `read_until_any_prompt`.
const IDX_PROMPT: usize = 0;
const IDX_USERNAME: usize = 1;
const IDX_PASSWORD: usize = 2;
const IDX_PASSPHRASE: usize = 3;

const PROMPT_KINDS: [&str; 3] = ["username", "password", "passphrase"];

/// Complete in-channel authentication, returning all bytes consumed on
/// the way to the session prompt.
///
/// The whole exchange runs under a single deadline; expiry is reported as
/// [`ChannelError::AuthenticationTimeout`] rather than a generic
/// operation timeout.
pub async fn authenticate(
    channel: &mut SessionChannel,
    opts: &InChannelAuthOptions,
) -> Result<Vec<u8>> {
    let overall = opts.timeout.unwrap_or(channel.config().timeout_ops);
    let deadline = tokio::time::Instant::now() + overall;

    let patterns = [
        channel.patterns().prompt().clone(),
        channel.patterns().username_prompt().clone(),
        channel.patterns().password_prompt().clone(),
        channel.patterns().passphrase_prompt().clone(),
    ];
    let seen_max = channel.config().auth.prompt_seen_max;

    let mut seen = [0u32; 3];
    let mut consumed = Vec::new();

    loop {
        let remaining = deadline
            .checked_duration_since(tokio::time::Instant::now())
            .filter(|d| !d.is_zero())
            .ok_or(ChannelError::AuthenticationTimeout(overall))?;

        let (bytes, idx) = channel
            .read_until_any_prompt(&patterns, Some(remaining))
            .await
            .map_err(|e| match e {
                Error::Channel(ChannelError::OperationTimeout(_)) => {
                    Error::Channel(ChannelError::AuthenticationTimeout(overall))
                }
                other => other,
            })?;
        consumed.extend(bytes);

        if idx == IDX_PROMPT {
            debug!("in-channel authentication complete");
            return Ok(consumed);
        }

        let kind = PROMPT_KINDS[idx - 1];
        seen[idx - 1] += 1;
        if seen[idx - 1] > seen_max {
            return Err(ChannelError::AuthenticationFailed {
                prompt_kind: kind.to_string(),
                seen: seen[idx - 1],
            }
            .into());
        }
        debug!("answering {} prompt (sighting {})", kind, seen[idx - 1]);

        match idx {
            IDX_USERNAME => {
                let username = opts.username.clone();
                channel.write_and_return(username.as_bytes(), false).await?;
            }
            IDX_PASSWORD => {
                let password = opts.password.expose_secret().to_string();
                channel.write_and_return(password.as_bytes(), true).await?;
            }
            IDX_PASSPHRASE => match &opts.passphrase {
                Some(passphrase) => {
                    let passphrase = passphrase.expose_secret().to_string();
                    channel.write_and_return(passphrase.as_bytes(), true).await?;
                }
                None => {
                    return Err(ChannelError::AuthenticationFailed {
                        prompt_kind: kind.to_string(),
                        seen: seen[idx - 1],
                    }
                    .into());
                }
            },
            _ => unreachable!("pattern index out of range"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::config::ChannelConfig;
    use crate::transport::ReplayTransport;

    fn test_config() -> ChannelConfig {
        ChannelConfig {
            prompt_pattern: r"(?m)^router[#>]\s?$".to_string(),
            timeout_ops: Duration::from_millis(500),
            ..ChannelConfig::default()
        }
    }

    #[tokio::test]
    async fn authenticates_through_username_and_password() {
        let transport = ReplayTransport::new()
            .feed(&b"login: "[..])
            .feed_after(Duration::from_millis(20), &b"Password: "[..])
            .feed_after(Duration::from_millis(20), &b"\nrouter>"[..]);
        let writes = transport.writes();

        let mut channel = SessionChannel::new(Box::new(transport), test_config()).unwrap();
        channel.open().await.unwrap();

        let opts = InChannelAuthOptions::new("admin", "secret");
        authenticate(&mut channel, &opts).await.unwrap();

        let writes = writes.lock().unwrap();
        // username, return, password, return
        assert_eq!(writes[0], b"admin");
        assert_eq!(writes[2], b"secret");
        channel.close().await.unwrap();
    }

    #[tokio::test]
    async fn fails_after_password_retry_ceiling() {
        // A device that rejects the password forever: every read yields
        // another password prompt.
        let transport = ReplayTransport::new()
            .feed(&b"\nPassword: "[..])
            .repeat_last(true);
        let writes = transport.writes();

        let mut channel = SessionChannel::new(Box::new(transport), test_config()).unwrap();
        channel.open().await.unwrap();

        let opts = InChannelAuthOptions::new("admin", "badpass");
        let err = authenticate(&mut channel, &opts).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Channel(ChannelError::AuthenticationFailed { seen: 3, .. })
        ));

        // The password was sent exactly twice before the third sighting
        // aborted the exchange.
        let writes = writes.lock().unwrap();
        let password_writes = writes.iter().filter(|w| w.as_slice() == b"badpass").count();
        assert_eq!(password_writes, 2);
        channel.close().await.unwrap();
    }

    #[tokio::test]
    async fn silent_device_reports_authentication_timeout() {
        let transport = ReplayTransport::new();
        let mut channel = SessionChannel::new(Box::new(transport), test_config()).unwrap();
        channel.open().await.unwrap();

        let mut opts = InChannelAuthOptions::new("admin", "secret");
        opts.timeout = Some(Duration::from_millis(50));
        let err = authenticate(&mut channel, &opts).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Channel(ChannelError::AuthenticationTimeout(_))
        ));
        channel.close().await.unwrap();
    }
}
