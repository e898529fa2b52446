// 📋 Appointment Records - the immutable input of every run
// One row per appointment as delivered by the ingestion layer

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// ============================================================================
// REAPPOINTED FLAG (tri-state)
// ============================================================================

/// Source reappointment marker. Decided once at ingestion; unrecognised
/// encodings are `Unknown`, never `False`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReappointedFlag {
    True,
    False,
    #[default]
    Unknown,
}

impl ReappointedFlag {
    /// Parse a raw cell value (case-insensitive, surrounding whitespace ignored)
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" | "1.0" => ReappointedFlag::True,
            "false" | "f" | "no" | "n" | "0" | "0.0" => ReappointedFlag::False,
            _ => ReappointedFlag::Unknown,
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, ReappointedFlag::True)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReappointedFlag::True => "true",
            ReappointedFlag::False => "false",
            ReappointedFlag::Unknown => "unknown",
        }
    }
}

impl From<bool> for ReappointedFlag {
    fn from(value: bool) -> Self {
        if value {
            ReappointedFlag::True
        } else {
            ReappointedFlag::False
        }
    }
}

impl fmt::Display for ReappointedFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a year cell. Accepts "2015" and integral decimals like "2015.0".
pub fn parse_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(year) = trimmed.parse::<i32>() {
        return Some(year);
    }
    let value = trimmed.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i32::MAX as f64 {
        Some(value as i32)
    } else {
        None
    }
}

// ============================================================================
// APPOINTMENT RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub person_name: Option<String>,
    pub position: Option<String>,
    pub organization: Option<String>,

    /// `None` when the source year was missing or unparseable
    pub year: Option<i32>,

    pub reappointed: ReappointedFlag,

    // ========================================================================
    // PROVENANCE
    // ========================================================================
    #[serde(default)]
    pub source_file: String,

    /// 1-indexed data row within `source_file` (0 when built in memory)
    #[serde(default)]
    pub line_number: usize,
}

impl AppointmentRecord {
    pub fn new(
        person_name: &str,
        position: &str,
        organization: &str,
        year: Option<i32>,
        reappointed: ReappointedFlag,
    ) -> Self {
        AppointmentRecord {
            person_name: Some(person_name.to_string()),
            position: Some(position.to_string()),
            organization: Some(organization.to_string()),
            year,
            reappointed,
            source_file: String::new(),
            line_number: 0,
        }
    }

    pub fn with_source(mut self, source_file: &str, line_number: usize) -> Self {
        self.source_file = source_file.to_string();
        self.line_number = line_number;
        self
    }

    pub fn with_flag(mut self, reappointed: ReappointedFlag) -> Self {
        self.reappointed = reappointed;
        self
    }

    /// Content hash used by the store to spot re-imported rows
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}|{}",
            self.person_name.as_deref().unwrap_or(""),
            self.position.as_deref().unwrap_or(""),
            self.organization.as_deref().unwrap_or(""),
            self.year.map(|y| y.to_string()).unwrap_or_default(),
            self.reappointed.as_str(),
        ));
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_true_encodings() {
        for raw in ["true", "TRUE", " Yes ", "y", "1", "1.0", "T"] {
            assert_eq!(ReappointedFlag::parse(raw), ReappointedFlag::True, "{raw}");
        }
    }

    #[test]
    fn test_flag_false_encodings() {
        for raw in ["false", "No", "N", "0", "0.0", "f"] {
            assert_eq!(ReappointedFlag::parse(raw), ReappointedFlag::False, "{raw}");
        }
    }

    #[test]
    fn test_flag_unrecognised_is_unknown() {
        for raw in ["", "maybe", "2", "nan", "reappointed"] {
            assert_eq!(ReappointedFlag::parse(raw), ReappointedFlag::Unknown, "{raw}");
        }
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2015"), Some(2015));
        assert_eq!(parse_year(" 2015.0 "), Some(2015));
        assert_eq!(parse_year("2015.5"), None);
        assert_eq!(parse_year(""), None);
        assert_eq!(parse_year("twenty"), None);
    }

    #[test]
    fn test_content_hash_stable() {
        let a = AppointmentRecord::new("Jane Doe", "Chair", "Board", Some(2020), ReappointedFlag::False);
        let b = a.clone().with_source("other.csv", 12);
        let c = a.clone().with_flag(ReappointedFlag::True);

        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }
}
