//! Owner classification.
//!
//! Maps a transcript's meeting series (its parent directory) or file name
//! to the client entity it belongs to. All rules come from explicit
//! configuration passed at construction; classification is total — unknown
//! input falls back to the configured default owner, never an error.

use std::collections::HashMap;

use transync_shared::MappingConfig;

/// Deterministic owner resolution from configured mapping rules.
#[derive(Debug, Clone)]
pub struct Classifier {
    groups: HashMap<String, String>,
    /// Ordered `(lowercased pattern, owner)` rules; earlier entries win.
    patterns: Vec<(String, String)>,
    default_owner: String,
}

impl Classifier {
    pub fn new(config: &MappingConfig) -> Self {
        Self {
            groups: config.groups.clone(),
            patterns: config
                .patterns
                .iter()
                .map(|rule| (rule.pattern.to_lowercase(), rule.owner.clone()))
                .collect(),
            default_owner: config.default_owner.clone(),
        }
    }

    /// Owner for a meeting-series label: exact lookup, default on miss.
    pub fn owner_for_group(&self, group: &str) -> &str {
        self.groups
            .get(group)
            .map(String::as_str)
            .unwrap_or(&self.default_owner)
    }

    /// Owner for a file name: first case-insensitive substring rule that
    /// matches wins; default when none do.
    pub fn owner_for_name(&self, name: &str) -> &str {
        let lowered = name.to_lowercase();
        self.patterns
            .iter()
            .find(|(pattern, _)| lowered.contains(pattern))
            .map(|(_, owner)| owner.as_str())
            .unwrap_or(&self.default_owner)
    }

    /// Resolution policy: the series mapping first; if that only yields the
    /// default, retry against the file name before settling.
    pub fn resolve(&self, group: &str, name: &str) -> String {
        let owner = self.owner_for_group(group);
        if owner == self.default_owner {
            self.owner_for_name(name).to_string()
        } else {
            owner.to_string()
        }
    }

    pub fn default_owner(&self) -> &str {
        &self.default_owner
    }
}
