//! Privilege level definition.

use regex::bytes::Regex;

/// A named device operating mode with its own prompt and transition
/// commands.
///
/// Privilege levels form a tree rooted at the lowest level: each level
/// names its parent (`previous_priv`) and the commands that move between
/// the two. Levels are immutable once loaded; they are configuration
/// data supplied per platform.
#[derive(Debug, Clone)]
pub struct PrivilegeLevel {
    /// Name of this privilege level (e.g. "exec", "configuration").
    pub name: String,

    /// Pattern matching this level's prompt.
    pub pattern: Regex,

    /// Name of the parent privilege level (`None` for the root level).
    pub previous_priv: Option<String>,

    /// Command to escalate TO this level from the parent.
    pub escalate_command: Option<String>,

    /// Command to de-escalate FROM this level to the parent.
    pub deescalate_command: Option<String>,

    /// Whether escalation requires secondary authentication.
    pub escalate_auth: bool,

    /// Pattern matching the secondary-auth prompt during escalation.
    pub escalate_prompt: Option<Regex>,

    /// Substrings that must NOT be in the prompt for this level to match.
    /// Disambiguates visually-similar prompts (a config sub-mode vs
    /// top-level config mode).
    pub not_contains: Vec<String>,
}

impl PrivilegeLevel {
    /// Create a new privilege level with minimal required fields.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            previous_priv: None,
            escalate_command: None,
            deescalate_command: None,
            escalate_auth: false,
            escalate_prompt: None,
            not_contains: vec![],
        })
    }

    /// Set the parent privilege level.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.previous_priv = Some(parent.into());
        self
    }

    /// Set the escalation command.
    pub fn with_escalate(mut self, command: impl Into<String>) -> Self {
        self.escalate_command = Some(command.into());
        self
    }

    /// Set the de-escalation command.
    pub fn with_deescalate(mut self, command: impl Into<String>) -> Self {
        self.deescalate_command = Some(command.into());
        self
    }

    /// Require secondary authentication on escalation, expecting this
    /// prompt.
    pub fn with_auth(mut self, prompt_pattern: &str) -> Result<Self, regex::Error> {
        self.escalate_auth = true;
        self.escalate_prompt = Some(Regex::new(prompt_pattern)?);
        Ok(self)
    }

    /// Add a not_contains exclusion substring.
    pub fn with_not_contains(mut self, substring: impl Into<String>) -> Self {
        self.not_contains.push(substring.into());
        self
    }

    /// Check if this privilege level matches a prompt: the pattern must
    /// match and every exclusion substring must be absent.
    pub fn matches(&self, prompt: &str) -> bool {
        for nc in &self.not_contains {
            if prompt.contains(nc) {
                return false;
            }
        }

        self.pattern.is_match(prompt.as_bytes())
    }
}
