//! Session channel configuration.
//!
//! Every recognized option is an explicit field with a documented default;
//! there is no hidden global state and no option functions.

use std::time::Duration;

/// Default timeout for blocking channel operations.
pub const DEFAULT_TIMEOUT_OPS: Duration = Duration::from_secs(30);

/// Hard ceiling applied when a caller requests "no timeout"
/// (a zero duration).
pub const MAX_TIMEOUT_OPS: Duration = Duration::from_secs(86_400);

/// Default sleep between transport reads in the background pump.
pub const DEFAULT_READ_DELAY: Duration = Duration::from_millis(1);

/// Default tail-window size for prompt matching.
pub const DEFAULT_SEARCH_DEPTH: usize = 1000;

/// Default return-character sequence.
pub const DEFAULT_RETURN_CHAR: &str = "\n";

/// Default ceiling on how many times any single credential prompt may be
/// seen during in-channel authentication.
pub const DEFAULT_PROMPT_SEEN_MAX: u32 = 2;

/// Default username prompt pattern for in-channel authentication.
pub const DEFAULT_USERNAME_PATTERN: &str = r"(?im)^(.*username:)|(.*login:)\s?$";

/// Default password prompt pattern for in-channel authentication.
pub const DEFAULT_PASSWORD_PATTERN: &str = r"(?im)^(.*@.*)?password:\s?$";

/// Default key passphrase prompt pattern for in-channel authentication.
pub const DEFAULT_PASSPHRASE_PATTERN: &str = r"(?i)enter passphrase for key";

/// How `send_input` waits for the device to echo the written input before
/// sending the return sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EchoCheck {
    /// Do not wait for an echo.
    None,

    /// Wait for the exact input bytes.
    Exact,

    /// Wait until all input bytes appear in order, tolerating interleaved
    /// control characters.
    #[default]
    Fuzzy,
}

/// Configuration for a session channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Regex identifying the device's command-line prompt.
    pub prompt_pattern: String,

    /// Return-character sequence sent after inputs.
    pub return_char: String,

    /// Default timeout for blocking operations. Zero means "no timeout"
    /// and is clamped to [`MAX_TIMEOUT_OPS`].
    pub timeout_ops: Duration,

    /// Sleep between transport reads in the background pump.
    pub read_delay: Duration,

    /// Tail-window size for prompt matching.
    pub search_depth: usize,

    /// Default echo handling for `send_input`.
    pub echo: EchoCheck,

    /// Strip the trailing prompt line from `send_input` output by default.
    pub strip_prompt: bool,

    /// Return from `send_input` without waiting for the prompt by default.
    pub eager: bool,

    /// In-channel authentication prompt patterns and retry ceiling.
    pub auth: AuthPatternConfig,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            prompt_pattern: r"(?m)^[\w.\-@()/:]{1,63}[#$>]\s?$".to_string(),
            return_char: DEFAULT_RETURN_CHAR.to_string(),
            timeout_ops: DEFAULT_TIMEOUT_OPS,
            read_delay: DEFAULT_READ_DELAY,
            search_depth: DEFAULT_SEARCH_DEPTH,
            echo: EchoCheck::default(),
            strip_prompt: true,
            eager: false,
            auth: AuthPatternConfig::default(),
        }
    }
}

/// Prompt patterns and limits for in-channel authentication.
#[derive(Debug, Clone)]
pub struct AuthPatternConfig {
    /// Username/login prompt pattern.
    pub username_pattern: String,

    /// Password prompt pattern.
    pub password_pattern: String,

    /// Key passphrase prompt pattern.
    pub passphrase_pattern: String,

    /// Ceiling on sightings of any single credential prompt before
    /// authentication is declared failed.
    pub prompt_seen_max: u32,
}

impl Default for AuthPatternConfig {
    fn default() -> Self {
        Self {
            username_pattern: DEFAULT_USERNAME_PATTERN.to_string(),
            password_pattern: DEFAULT_PASSWORD_PATTERN.to_string(),
            passphrase_pattern: DEFAULT_PASSPHRASE_PATTERN.to_string(),
            prompt_seen_max: DEFAULT_PROMPT_SEEN_MAX,
        }
    }
}

/// Per-call overrides for `send_input`. `None` fields fall back to the
/// channel configuration.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Operation timeout override.
    pub timeout: Option<Duration>,

    /// Echo handling override.
    pub echo: Option<EchoCheck>,

    /// Strip-prompt override.
    pub strip_prompt: Option<bool>,

    /// Eager-mode override.
    pub eager: Option<bool>,

    /// Exclude the input value from diagnostic logs.
    pub redacted: bool,
}

impl SendOptions {
    /// Options for a hidden input (passwords, secrets).
    pub fn redacted() -> Self {
        Self {
            redacted: true,
            ..Self::default()
        }
    }
}
