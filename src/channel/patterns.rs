//! Compiled pattern table for a session channel.
//!
//! All patterns a channel matches against are compiled once, at channel
//! creation, into an immutable table. Nothing here is global: two channels
//! with different platform conventions carry independent tables.

use regex::bytes::Regex;

use super::config::{AuthPatternConfig, ChannelConfig};

/// Immutable, per-channel compiled patterns.
#[derive(Debug)]
pub struct PatternTable {
    prompt: Regex,
    username_prompt: Regex,
    password_prompt: Regex,
    passphrase_prompt: Regex,
}

impl PatternTable {
    /// Compile the table from a channel configuration.
    pub fn new(config: &ChannelConfig) -> Result<Self, regex::Error> {
        Self::compile(&config.prompt_pattern, &config.auth)
    }

    fn compile(prompt_pattern: &str, auth: &AuthPatternConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            prompt: compile_prompt_pattern(prompt_pattern)?,
            username_prompt: Regex::new(&auth.username_pattern)?,
            password_prompt: Regex::new(&auth.password_pattern)?,
            passphrase_prompt: Regex::new(&auth.passphrase_pattern)?,
        })
    }

    /// The device's command-line prompt pattern.
    pub fn prompt(&self) -> &Regex {
        &self.prompt
    }

    /// Username/login prompt pattern.
    pub fn username_prompt(&self) -> &Regex {
        &self.username_prompt
    }

    /// Password prompt pattern.
    pub fn password_prompt(&self) -> &Regex {
        &self.password_prompt
    }

    /// Key passphrase prompt pattern.
    pub fn passphrase_prompt(&self) -> &Regex {
        &self.passphrase_prompt
    }
}

/// Compile a prompt pattern string, anchoring it to end-of-input if the
/// pattern does not already carry an end anchor.
pub fn compile_prompt_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let pattern = if pattern.ends_with('$') {
        pattern.to_string()
    } else {
        format!("{}\\s*$", pattern)
    };

    Regex::new(&pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_pattern_gets_anchor() {
        let pattern = compile_prompt_pattern(r"router#").unwrap();
        assert!(pattern.is_match(b"router# "));
        assert!(pattern.is_match(b"output\nrouter#"));

        let anchored = compile_prompt_pattern(r"router#$").unwrap();
        assert!(anchored.is_match(b"router#"));
        assert!(!anchored.is_match(b"router# "));
    }

    #[test]
    fn default_auth_patterns_match_common_prompts() {
        let table = PatternTable::new(&ChannelConfig::default()).unwrap();

        assert!(table.username_prompt().is_match(b"Username:"));
        assert!(table.username_prompt().is_match(b"login:"));
        assert!(table.password_prompt().is_match(b"Password:"));
        assert!(table.password_prompt().is_match(b"admin@10.0.0.1's password:"));
        assert!(
            table
                .passphrase_prompt()
                .is_match(b"Enter passphrase for key '/home/u/.ssh/id_ed25519':")
        );
    }
}
