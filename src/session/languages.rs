use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Server-provided set of available languages.
///
/// Keyed by display name for UI lookup; codes are expected to be
/// unique within the set.
#[derive(Debug, Clone, Default)]
pub struct LanguageSet {
    by_name: HashMap<String, String>,
}

impl LanguageSet {
    /// Replace the set with a fresh server-provided mapping.
    pub fn update(&mut self, mapping: HashMap<String, String>) {
        let mut seen = HashSet::new();
        for code in mapping.values() {
            if !seen.insert(code.as_str()) {
                warn!("Duplicate language code in server mapping: {}", code);
            }
        }

        self.by_name = mapping;
    }

    pub fn code_for(&self, display_name: &str) -> Option<&str> {
        self.by_name.get(display_name).map(String::as_str)
    }

    /// Reverse lookup from code to display name.
    ///
    /// Returns the code unchanged when no display name is known.
    pub fn display_name_for(&self, code: &str) -> String {
        self.by_name
            .iter()
            .find(|(_, c)| c.as_str() == code)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| code.to_string())
    }

    pub fn contains_code(&self, code: &str) -> bool {
        self.by_name.values().any(|c| c == code)
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// (display name, code) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_name
            .iter()
            .map(|(name, code)| (name.as_str(), code.as_str()))
    }
}
