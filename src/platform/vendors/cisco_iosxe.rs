//! Cisco IOS-XE platform definition.
//!
//! Privilege levels:
//! - `exec` - User EXEC mode with `>` prompt
//! - `privilege_exec` - Privileged EXEC mode with `#` prompt (escalation
//!   may ask for an enable secret)
//! - `configuration` - Configuration mode with `(config*)#` prompt
//!
//! # Prompt Examples
//!
//! ```text
//! router>                            # exec mode
//! router#                            # privilege_exec mode
//! router(config)#                    # configuration mode
//! router(config-if)#                 # config sub-mode (interface)
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Create the Cisco IOS-XE platform definition.
pub fn platform() -> PlatformDefinition {
    // Exec mode - ">" prompt
    let exec = PrivilegeLevel::new("exec", r"(?mi)^[\w.\-@()/: ]{1,63}>\s?$").unwrap();

    // Privileged EXEC mode - "#" prompt
    // not_contains "(config" keeps config-mode prompts from matching
    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?mi)^[\w.\-@()/: ]{1,63}#\s?$")
        .unwrap()
        .with_parent("exec")
        .with_escalate("enable")
        .with_deescalate("disable")
        .with_auth(r"(?mi)^(.*)?password:\s?$")
        .unwrap()
        .with_not_contains("(config");

    // Configuration mode - "(config*)" prompt; sub-modes included
    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^[\w.\-@()/: ]{1,63}\(config[\w.\-@/:+]{0,32}\)#\s?$",
    )
    .unwrap()
    .with_parent("privilege_exec")
    .with_escalate("configure terminal")
    .with_deescalate("end")
    .with_not_contains("(config-pki)");

    PlatformDefinition::new("cisco_iosxe")
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_config_privilege("configuration")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input detected")
        .with_failure_pattern("% Unknown command")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 512")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_prompt_match() {
        let platform = platform();
        let exec = platform.get_privilege("exec").unwrap();

        assert!(exec.matches("router>"));
        assert!(exec.matches("router> "));
        assert!(exec.matches("admin@router>"));
        assert!(!exec.matches("router#"));
        assert!(!exec.matches("router(config)#"));
    }

    #[test]
    fn privilege_exec_prompt_match() {
        let platform = platform();
        let priv_exec = platform.get_privilege("privilege_exec").unwrap();

        assert!(priv_exec.matches("router#"));
        assert!(priv_exec.matches("router# "));
        // Raw pattern matches config prompts too; not_contains filters them
        assert!(!priv_exec.matches("router(config)#"));
        assert!(!priv_exec.matches("router(config-if)#"));
        assert!(!priv_exec.matches("router>"));
    }

    #[test]
    fn configuration_prompt_match() {
        let platform = platform();
        let config = platform.get_privilege("configuration").unwrap();

        assert!(config.matches("router(config)#"));
        assert!(config.matches("router(config-if)#"));
        assert!(config.matches("router(config-router)#"));
        assert!(!config.matches("router#"));
        assert!(!config.matches("router>"));
    }

    #[test]
    fn privilege_tree_shape() {
        let platform = platform();

        assert!(platform.get_privilege("exec").unwrap().previous_priv.is_none());
        assert_eq!(
            platform
                .get_privilege("privilege_exec")
                .unwrap()
                .previous_priv
                .as_deref(),
            Some("exec")
        );
        assert_eq!(
            platform
                .get_privilege("configuration")
                .unwrap()
                .previous_priv
                .as_deref(),
            Some("privilege_exec")
        );
        assert!(platform.get_privilege("privilege_exec").unwrap().escalate_auth);
    }
}
