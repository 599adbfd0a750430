//! Privilege level engine: graph-based navigation between device modes.
//!
//! Privilege levels form a tree rooted at the lowest level; the engine
//! reads the current prompt, resolves it against all configured levels,
//! and walks one escalate/deescalate step at a time toward the desired
//! level. Path search is breadth-first over a `BTreeMap` adjacency, so
//! when more than one next hop is valid the lexicographically smallest
//! level name wins — escalation behavior is deterministic and
//! reproducible.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use indexmap::IndexMap;
use log::debug;
use secrecy::{ExposeSecret, SecretString};

use crate::channel::{SendOptions, SessionChannel};
use crate::error::{DriverError, Result};
use crate::platform::PrivilegeLevel;

/// Tracks the session's privilege state and drives transitions.
#[derive(Debug)]
pub struct PrivilegeManager {
    /// All defined privilege levels, in declaration order.
    levels: IndexMap<String, PrivilegeLevel>,

    /// Symmetric adjacency over the levels (level <-> previous level).
    graph: BTreeMap<String, BTreeSet<String>>,

    /// Current privilege level name. `None` means unknown — set while a
    /// transition is in flight, when the prompt cannot be trusted.
    current: Option<String>,
}

impl PrivilegeManager {
    /// Create a manager from privilege level definitions.
    pub fn new(levels: IndexMap<String, PrivilegeLevel>) -> Self {
        let graph = Self::build_graph(&levels);
        Self {
            levels,
            graph,
            current: None,
        }
    }

    /// Build the symmetric adjacency map from the level set.
    fn build_graph(levels: &IndexMap<String, PrivilegeLevel>) -> BTreeMap<String, BTreeSet<String>> {
        let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (name, level) in levels {
            graph.entry(name.clone()).or_default();

            if let Some(parent) = &level.previous_priv {
                graph
                    .entry(name.clone())
                    .or_default()
                    .insert(parent.clone());
                graph
                    .entry(parent.clone())
                    .or_default()
                    .insert(name.clone());
            }
        }

        graph
    }

    /// The tracked current privilege level name, if known.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Forget the tracked level (a transition is in flight, or the caller
    /// knows the session moved underneath us).
    pub fn clear_current(&mut self) {
        self.current = None;
    }

    /// Get a privilege level by name.
    pub fn get(&self, name: &str) -> Option<&PrivilegeLevel> {
        self.levels.get(name)
    }

    /// All levels whose pattern matches the prompt and whose exclusion
    /// substrings are absent, in declaration order. Ambiguity is
    /// expected: config sub-modes can look identical by pattern alone.
    pub fn matching_levels(&self, prompt: &str) -> Vec<&str> {
        self.levels
            .values()
            .filter(|level| level.matches(prompt))
            .map(|level| level.name.as_str())
            .collect()
    }

    /// Resolve a prompt to a single level name: prefer the tracked
    /// current level, then the desired level, then the first match.
    pub fn resolve_prompt(&self, prompt: &str, desired: Option<&str>) -> Result<String> {
        let matches = self.matching_levels(prompt);

        if matches.is_empty() {
            return Err(DriverError::UnknownCurrentPrivilegeLevel {
                prompt: prompt.to_string(),
            }
            .into());
        }

        if let Some(current) = self.current.as_deref() {
            if matches.contains(&current) {
                return Ok(current.to_string());
            }
        }
        if let Some(desired) = desired {
            if matches.contains(&desired) {
                return Ok(desired.to_string());
            }
        }

        Ok(matches[0].to_string())
    }

    /// Shortest path between two levels, both endpoints included.
    /// Breadth-first over the sorted adjacency: deterministic under ties.
    pub fn find_path(&self, from: &str, to: &str) -> Result<Vec<String>> {
        if from == to {
            return Ok(vec![from.to_string()]);
        }

        let mut queue = VecDeque::new();
        let mut visited = BTreeSet::new();
        let mut parent: BTreeMap<String, String> = BTreeMap::new();

        queue.push_back(from.to_string());
        visited.insert(from.to_string());

        while let Some(node) = queue.pop_front() {
            if node == to {
                let mut path = vec![to.to_string()];
                let mut cursor = to.to_string();
                while let Some(prev) = parent.get(&cursor) {
                    path.push(prev.clone());
                    cursor = prev.clone();
                }
                path.reverse();
                return Ok(path);
            }

            if let Some(neighbors) = self.graph.get(&node) {
                for neighbor in neighbors {
                    if visited.insert(neighbor.clone()) {
                        parent.insert(neighbor.clone(), node.clone());
                        queue.push_back(neighbor.clone());
                    }
                }
            }
        }

        Err(DriverError::NoPrivilegePath {
            from: from.to_string(),
            to: to.to_string(),
        }
        .into())
    }

    /// Drive the session to `desired`, one transition at a time.
    ///
    /// Reads the prompt, resolves the current level, and sends one
    /// escalate or deescalate command per iteration. The loop is bounded
    /// by twice the level count; exceeding it means the device is
    /// oscillating and the acquisition fails.
    pub async fn acquire(
        &mut self,
        channel: &mut SessionChannel,
        desired: &str,
        auth_secondary: Option<&SecretString>,
    ) -> Result<()> {
        if !self.levels.contains_key(desired) {
            return Err(DriverError::InvalidDesiredPrivilegeLevel {
                name: desired.to_string(),
            }
            .into());
        }

        let max_transitions = 2 * self.levels.len();

        for _ in 0..max_transitions {
            let prompt = channel.get_prompt().await?;
            let resolved = self.resolve_prompt(&prompt, Some(desired))?;

            if resolved == desired {
                debug!("privilege level '{}' acquired", desired);
                self.current = Some(desired.to_string());
                return Ok(());
            }

            // A transition is about to make the prompt momentarily
            // untrustworthy
            self.current = None;

            let path = self.find_path(&resolved, desired)?;
            let next = path[1].clone();
            debug!(
                "privilege transition: '{}' -> '{}' (target '{}')",
                resolved, next, desired
            );

            let next_level = &self.levels[&next];
            if next_level.previous_priv.as_deref() != Some(resolved.as_str()) {
                self.deescalate(channel, &resolved, &next).await?;
            } else {
                self.escalate(channel, &next, auth_secondary).await?;
            }
        }

        Err(DriverError::PrivilegeAcquisitionFailed {
            target: desired.to_string(),
        }
        .into())
    }

    /// Send the current level's deescalate command, consuming its output
    /// so the next prompt read reflects the new mode.
    async fn deescalate(
        &self,
        channel: &mut SessionChannel,
        from: &str,
        to: &str,
    ) -> Result<()> {
        let command = self.levels[from]
            .deescalate_command
            .clone()
            .ok_or_else(|| DriverError::NoPrivilegePath {
                from: from.to_string(),
                to: to.to_string(),
            })?;

        channel
            .send_input(&command, &SendOptions::default())
            .await?;
        Ok(())
    }

    /// Send the target level's escalate command, consuming its output.
    /// With secondary auth the command becomes an interactive exchange:
    /// expect the escalation prompt, answer it with the secondary
    /// credential, then wait for the target pattern.
    async fn escalate(
        &self,
        channel: &mut SessionChannel,
        to: &str,
        auth_secondary: Option<&SecretString>,
    ) -> Result<()> {
        let level = &self.levels[to];
        let command = level
            .escalate_command
            .clone()
            .ok_or_else(|| DriverError::NoPrivilegePath {
                from: level.previous_priv.clone().unwrap_or_default(),
                to: to.to_string(),
            })?;

        let auth = (level.escalate_auth)
            .then(|| level.escalate_prompt.clone().zip(auth_secondary))
            .flatten();

        let Some((auth_prompt, secret)) = auth else {
            // Plain escalation, or no credential configured: send the
            // command and let the acquisition loop classify whatever
            // prompt comes back
            channel
                .send_input(&command, &SendOptions::default())
                .await?;
            return Ok(());
        };

        channel.write_and_return(command.as_bytes(), false).await?;

        // Devices that recently authenticated may skip the secondary
        // prompt and land straight on the target prompt
        let patterns = [level.pattern.clone(), auth_prompt];
        let (_, idx) = channel.read_until_any_prompt(&patterns, None).await?;

        if idx == 1 {
            let secret = secret.expose_secret().to_string();
            channel.write_and_return(secret.as_bytes(), true).await?;
            channel.read_until_pattern(&patterns[0], None).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::vendors::cisco_iosxe;

    fn manager() -> PrivilegeManager {
        PrivilegeManager::new(cisco_iosxe::platform().privilege_levels)
    }

    #[test]
    fn matching_levels_reports_all_candidates() {
        let manager = manager();
        assert_eq!(manager.matching_levels("router>"), vec!["exec"]);
        assert_eq!(manager.matching_levels("router#"), vec!["privilege_exec"]);
        assert_eq!(
            manager.matching_levels("router(config)#"),
            vec!["configuration"]
        );
        assert!(manager.matching_levels("% odd banner").is_empty());
    }

    #[test]
    fn resolve_prefers_tracked_current_then_desired() {
        let mut manager = manager();

        // With no tracked level, the desired level wins among matches
        let resolved = manager
            .resolve_prompt("router(config)#", Some("configuration"))
            .unwrap();
        assert_eq!(resolved, "configuration");

        // A tracked current level takes precedence when it matches
        manager.current = Some("configuration".to_string());
        let resolved = manager.resolve_prompt("router(config)#", None).unwrap();
        assert_eq!(resolved, "configuration");
    }

    #[test]
    fn unknown_prompt_is_an_error() {
        let manager = manager();
        let err = manager.resolve_prompt("strange banner text", None).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Driver(DriverError::UnknownCurrentPrivilegeLevel { .. })
        ));
    }

    #[test]
    fn find_path_walks_the_tree_both_ways() {
        let manager = manager();

        let path = manager.find_path("exec", "configuration").unwrap();
        assert_eq!(path, vec!["exec", "privilege_exec", "configuration"]);

        let path = manager.find_path("configuration", "exec").unwrap();
        assert_eq!(path, vec!["configuration", "privilege_exec", "exec"]);

        let path = manager.find_path("exec", "exec").unwrap();
        assert_eq!(path, vec!["exec"]);
    }

    #[test]
    fn find_path_unreachable_level_is_an_error() {
        let mut levels = cisco_iosxe::platform().privilege_levels;
        levels.insert(
            "island".to_string(),
            PrivilegeLevel::new("island", r"island#\s?$").unwrap(),
        );
        let manager = PrivilegeManager::new(levels);

        let err = manager.find_path("exec", "island").unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Driver(DriverError::NoPrivilegePath { .. })
        ));
    }
}
