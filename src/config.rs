// ⚙️ Analysis Configuration - Settings as Data
// Year range, leader threshold, honorific list and diagnostic cut-offs

use crate::error::AnalysisError;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// CONFIG DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// First year of the analysed range (inclusive)
    pub year_start: i32,

    /// Last year of the analysed range (inclusive)
    pub year_end: i32,

    /// Organizations below this many appointments in a year cannot lead it
    pub min_appointments: u64,

    /// Whole-word tokens stripped from person names before matching
    pub honorifics: Vec<String>,

    /// Label substituted for a missing organization
    pub unknown_organization_label: String,

    /// |residual / regression standard error| above this marks an outlier year
    pub outlier_threshold: f64,

    /// Confidence level for the slope interval (e.g. 0.95)
    pub confidence_level: f64,

    /// Shapiro-Wilk p-values below this raise a normality warning
    pub normality_alpha: f64,

    /// Durbin-Watson values outside (low, high) raise an autocorrelation warning
    pub durbin_watson_bounds: (f64, f64),
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            year_start: 2013,
            year_end: 2024,
            min_appointments: 5,
            honorifics: ["dr", "mr", "mrs", "ms", "miss", "prof", "hon", "jr", "sr"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            unknown_organization_label: "Unknown Organization".to_string(),
            outlier_threshold: 2.0,
            confidence_level: 0.95,
            normality_alpha: 0.05,
            durbin_watson_bounds: (1.5, 2.5),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a JSON file; missing keys take defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: AnalysisConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        config.validate()?;
        Ok(config)
    }

    /// Every year in the configured range, ascending
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.year_start..=self.year_end
    }

    pub fn contains_year(&self, year: i32) -> bool {
        (self.year_start..=self.year_end).contains(&year)
    }

    pub fn validate(&self) -> std::result::Result<(), AnalysisError> {
        if self.year_start > self.year_end {
            return Err(AnalysisError::InvalidYearRange {
                start: self.year_start,
                end: self.year_end,
            });
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if !(self.outlier_threshold > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "outlier_threshold must be positive, got {}",
                self.outlier_threshold
            )));
        }
        let (low, high) = self.durbin_watson_bounds;
        if low > high {
            return Err(AnalysisError::InvalidConfig(format!(
                "durbin_watson_bounds ({}, {}) are reversed",
                low, high
            )));
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
