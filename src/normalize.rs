// 🔤 Identity Normalizer - canonical (name, position, organization) keys
// Stable under case, whitespace and honorific variation

use crate::appointment::AppointmentRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// IDENTITY KEY
// ============================================================================

/// Grouping key for repeat-appointment detection. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey {
    pub name: String,
    pub position: String,
    pub organization: String,
}

impl IdentityKey {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.position.is_empty() && self.organization.is_empty()
    }
}

// ============================================================================
// NORMALIZER
// ============================================================================

pub struct IdentityNormalizer {
    honorifics: HashSet<String>,
}

impl IdentityNormalizer {
    /// Create normalizer with the default honorific list
    pub fn new() -> Self {
        Self::with_honorifics(&["dr", "mr", "mrs", "ms", "miss", "prof", "hon", "jr", "sr"])
    }

    pub fn with_honorifics<S: AsRef<str>>(honorifics: &[S]) -> Self {
        IdentityNormalizer {
            honorifics: honorifics
                .iter()
                .map(|h| h.as_ref().trim().to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Key for a record, or `None` when all three fields normalize to empty
    pub fn key_for(&self, record: &AppointmentRecord) -> Option<IdentityKey> {
        let key = self.normalize(
            record.person_name.as_deref(),
            record.position.as_deref(),
            record.organization.as_deref(),
        );
        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }

    pub fn normalize(
        &self,
        name: Option<&str>,
        position: Option<&str>,
        organization: Option<&str>,
    ) -> IdentityKey {
        IdentityKey {
            name: self.normalize_name(name.unwrap_or("")),
            position: normalize_text(position.unwrap_or("")),
            organization: normalize_text(organization.unwrap_or("")),
        }
    }

    /// Lower-case, collapse whitespace and drop honorific tokens.
    /// "Dr." and "dr" both match; "Drake" does not.
    pub fn normalize_name(&self, name: &str) -> String {
        let lowered = name.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split_whitespace()
            .filter(|token| {
                let bare = token.trim_matches(|c: char| c == '.' || c == ',');
                !self.honorifics.contains(bare)
            })
            .collect();
        tokens.join(" ")
    }
}

impl Default for IdentityNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lower-case and collapse internal whitespace runs
pub fn normalize_text(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trim and collapse whitespace, keeping case (display form)
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// TESTS
// ============================================================================
