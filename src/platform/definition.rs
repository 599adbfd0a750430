//! Platform definition for vendor-specific configuration.

use indexmap::IndexMap;

use super::privilege_level::PrivilegeLevel;

/// Platform definition: everything the engine consumes as configuration
/// data for one device family.
///
/// The engine never hard-codes commands or prompts; platforms supply
/// them. Insertion order of privilege levels is significant — it is the
/// deterministic "first match" order during prompt disambiguation.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g. "linux", "cisco_iosxe").
    pub name: String,

    /// Privilege levels for this platform, in declaration order.
    pub privilege_levels: IndexMap<String, PrivilegeLevel>,

    /// Privilege level acquired after connection and before commands.
    pub default_privilege: String,

    /// Privilege level used for configuration commands.
    pub config_privilege: String,

    /// Substrings that mark command output as failed.
    pub failed_when_contains: Vec<String>,

    /// Commands to run when the connection is established.
    pub on_open_commands: Vec<String>,

    /// Commands to run before the connection is closed.
    pub on_close_commands: Vec<String>,

    /// Return-character sequence for this platform.
    pub return_char: String,
}

impl PlatformDefinition {
    /// Create a new platform definition with minimal required fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            privilege_levels: IndexMap::new(),
            default_privilege: String::new(),
            config_privilege: "configuration".to_string(),
            failed_when_contains: vec![],
            on_open_commands: vec![],
            on_close_commands: vec![],
            return_char: crate::channel::config::DEFAULT_RETURN_CHAR.to_string(),
        }
    }

    /// Add a privilege level.
    pub fn with_privilege(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_levels.insert(level.name.clone(), level);
        self
    }

    /// Set the default privilege level.
    pub fn with_default_privilege(mut self, name: impl Into<String>) -> Self {
        self.default_privilege = name.into();
        self
    }

    /// Set the privilege level used for configuration commands.
    pub fn with_config_privilege(mut self, name: impl Into<String>) -> Self {
        self.config_privilege = name.into();
        self
    }

    /// Add a failure substring.
    pub fn with_failure_pattern(mut self, substring: impl Into<String>) -> Self {
        self.failed_when_contains.push(substring.into());
        self
    }

    /// Add an on-open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Add an on-close command.
    pub fn with_on_close_command(mut self, command: impl Into<String>) -> Self {
        self.on_close_commands.push(command.into());
        self
    }

    /// Set the return-character sequence.
    pub fn with_return_char(mut self, return_char: impl Into<String>) -> Self {
        self.return_char = return_char.into();
        self
    }

    /// Get a privilege level by name.
    pub fn get_privilege(&self, name: &str) -> Option<&PrivilegeLevel> {
        self.privilege_levels.get(name)
    }

    /// Build a combined pattern string matching any privilege level's
    /// prompt, for the session channel's prompt pattern.
    pub fn combined_prompt_pattern(&self) -> String {
        self.privilege_levels
            .values()
            .map(|level| format!("(?:{})", level.pattern.as_str()))
            .collect::<Vec<_>>()
            .join("|")
    }
}
