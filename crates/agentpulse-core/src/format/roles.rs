//! Role labels and badge tones
//!
//! Maps agent role identifiers to human labels. The set of roles is open:
//! anything not in the table falls back to the identifier's first segment.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Label shown when an event carries no role
pub const SYSTEM_LABEL: &str = "System";

/// Separator used by agent role identifiers (`qa-security-sabine`)
const ROLE_SEPARATOR: char = '-';

/// Badge tone for a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoleTone {
    /// Orchestrator
    Violet,
    /// Backend
    Blue,
    /// Frontend / ops
    Emerald,
    /// Data / AI
    Amber,
    /// Product
    Pink,
    /// QA / security
    Red,
    /// Unknown roles and the system
    #[default]
    Neutral,
}

/// Display information for a known role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInfo {
    /// Human label
    pub label: String,
    /// Badge tone
    pub tone: RoleTone,
}

const KNOWN_ROLES: &[(&str, &str, RoleTone)] = &[
    ("SABINE_ARCHITECT", "Sabine Architect", RoleTone::Violet),
    ("backend-architect-sabine", "Backend Architect", RoleTone::Blue),
    ("frontend-ops-sabine", "Frontend Ops", RoleTone::Emerald),
    ("data-ai-engineer-sabine", "Data/AI Engineer", RoleTone::Amber),
    ("product-manager-sabine", "Product Manager", RoleTone::Pink),
    ("qa-security-sabine", "QA & Security", RoleTone::Red),
];

fn known(role: &str) -> Option<&'static (&'static str, &'static str, RoleTone)> {
    KNOWN_ROLES.iter().find(|(id, _, _)| *id == role)
}

fn fallback_label(role: &str) -> &str {
    role.split(ROLE_SEPARATOR).next().unwrap_or(role)
}

/// Resolve a role identifier to its label using the built-in table.
///
/// Absent or empty roles are the system; unknown roles use the text before
/// the first `-`.
pub fn get_role_display(role: Option<&str>) -> String {
    match role.filter(|r| !r.is_empty()) {
        None => SYSTEM_LABEL.to_string(),
        Some(role) => known(role).map_or_else(
            || fallback_label(role).to_string(),
            |(_, label, _)| (*label).to_string(),
        ),
    }
}

/// Badge tone for a role using the built-in table
pub fn role_tone(role: Option<&str>) -> RoleTone {
    role.and_then(known).map_or(RoleTone::Neutral, |(_, _, tone)| *tone)
}

/// Role table that can be extended from configuration.
///
/// Starts from the built-in roles; overrides replace labels but keep the
/// tone of a built-in role.
#[derive(Debug, Clone)]
pub struct RoleDirectory {
    roles: HashMap<String, RoleInfo>,
}

impl Default for RoleDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleDirectory {
    /// Create a directory holding the built-in roles
    pub fn new() -> Self {
        let roles = KNOWN_ROLES
            .iter()
            .map(|(id, label, tone)| {
                (
                    (*id).to_string(),
                    RoleInfo {
                        label: (*label).to_string(),
                        tone: *tone,
                    },
                )
            })
            .collect();

        Self { roles }
    }

    /// Create a directory with configured label overrides applied
    pub fn with_labels(labels: &HashMap<String, String>) -> Self {
        let mut directory = Self::new();
        for (role, label) in labels {
            directory.set_label(role.clone(), label.clone());
        }
        directory
    }

    /// Add or relabel a role
    pub fn set_label(&mut self, role: String, label: String) {
        self.roles
            .entry(role)
            .and_modify(|info| info.label.clone_from(&label))
            .or_insert(RoleInfo {
                label,
                tone: RoleTone::Neutral,
            });
    }

    /// Look up a known role
    pub fn get(&self, role: &str) -> Option<&RoleInfo> {
        self.roles.get(role)
    }

    /// Resolve a role to its label
    pub fn display(&self, role: Option<&str>) -> String {
        match role.filter(|r| !r.is_empty()) {
            None => SYSTEM_LABEL.to_string(),
            Some(role) => self
                .roles
                .get(role)
                .map_or_else(|| fallback_label(role).to_string(), |info| info.label.clone()),
        }
    }

    /// Badge tone for a role
    pub fn tone(&self, role: Option<&str>) -> RoleTone {
        role.and_then(|r| self.roles.get(r))
            .map_or(RoleTone::Neutral, |info| info.tone)
    }

    /// Number of known roles
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Whether the directory is empty
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_role_is_system() {
        assert_eq!(get_role_display(None), "System");
        assert_eq!(get_role_display(Some("")), "System");
    }

    #[test]
    fn test_known_role_label() {
        assert_eq!(get_role_display(Some("SABINE_ARCHITECT")), "Sabine Architect");
        assert_eq!(get_role_display(Some("qa-security-sabine")), "QA & Security");
    }

    #[test]
    fn test_unknown_role_uses_first_segment() {
        assert_eq!(get_role_display(Some("unknown-role-xyz")), "unknown");
        assert_eq!(get_role_display(Some("solo")), "solo");
        assert_eq!(get_role_display(Some("OTHER_AGENT")), "OTHER_AGENT");
    }

    #[test]
    fn test_tones() {
        assert_eq!(role_tone(Some("SABINE_ARCHITECT")), RoleTone::Violet);
        assert_eq!(role_tone(Some("qa-security-sabine")), RoleTone::Red);
        assert_eq!(role_tone(Some("unknown-role-xyz")), RoleTone::Neutral);
        assert_eq!(role_tone(None), RoleTone::Neutral);
    }

    #[test]
    fn test_directory_overrides() {
        let mut labels = HashMap::new();
        labels.insert("qa-security-sabine".to_string(), "QA".to_string());
        labels.insert("release-bot".to_string(), "Release Bot".to_string());

        let directory = RoleDirectory::with_labels(&labels);

        assert_eq!(directory.display(Some("qa-security-sabine")), "QA");
        assert_eq!(directory.tone(Some("qa-security-sabine")), RoleTone::Red);
        assert_eq!(directory.display(Some("release-bot")), "Release Bot");
        assert_eq!(directory.tone(Some("release-bot")), RoleTone::Neutral);
        assert_eq!(directory.display(Some("unknown-role-xyz")), "unknown");
        assert_eq!(directory.display(None), "System");
        assert_eq!(directory.len(), KNOWN_ROLES.len() + 1);
    }

    #[test]
    fn test_directory_matches_builtin_helpers() {
        let directory = RoleDirectory::new();
        for (id, _, _) in KNOWN_ROLES {
            assert_eq!(directory.display(Some(id)), get_role_display(Some(id)));
            assert_eq!(directory.tone(Some(id)), role_tone(Some(id)));
        }
    }
}
