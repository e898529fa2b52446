// 📈 Trend Analyzer - is the reappointment proportion rising or falling?
// Ordinary least squares of proportion on year, with significance,
// slope interval and advisory residual diagnostics.
//
//   slope     = Sxy / Sxx
//   intercept = mean(y) - slope * mean(x)
//   SE(slope) = sqrt(SSE / (n - 2)) / sqrt(Sxx)
//
// Diagnostics (Durbin-Watson, Shapiro-Wilk, outliers) never abort the fit.

use crate::annual::AnnualProportion;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::stats::{shapiro_wilk, t_critical, t_two_sided_p};
use crate::warnings::RunWarning;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub const MIN_POINTS: usize = 3;

/// Residual standard error below this (relative to the data scale) is an exact fit
const EXACT_FIT_TOLERANCE: f64 = 1e-10;

// ============================================================================
// REGRESSION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,

    /// Two-sided t-test of slope = 0 on n - 2 degrees of freedom
    pub p_value: f64,

    /// Standard error of the slope
    pub standard_error: f64,

    pub confidence_level: f64,
    pub confidence_interval: (f64, f64),

    /// sqrt(SSE / (n - 2))
    pub residual_standard_error: f64,

    /// `None` when the residuals are identically zero
    pub durbin_watson: Option<f64>,

    pub shapiro_w: Option<f64>,
    pub shapiro_p: Option<f64>,

    pub outlier_years: Vec<i32>,

    pub years: Vec<i32>,
    pub residuals: Vec<f64>,
    pub degrees_of_freedom: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    NoSignificantTrend,
}

impl RegressionResult {
    pub fn predict(&self, year: i32) -> f64 {
        self.intercept + self.slope * year as f64
    }

    pub fn is_significant(&self) -> bool {
        self.p_value < 1.0 - self.confidence_level
    }

    pub fn direction(&self) -> TrendDirection {
        if !self.is_significant() {
            TrendDirection::NoSignificantTrend
        } else if self.slope > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        }
    }

    /// Fitted change between the first and last year, in proportion units
    pub fn total_change(&self) -> f64 {
        match (self.years.first(), self.years.last()) {
            (Some(first), Some(last)) => self.slope * (last - first) as f64,
            _ => 0.0,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "slope {:+.5}/yr ({:.1}% CI {:+.5} to {:+.5}), R² {:.3}, p = {:.4} → {:?}",
            self.slope,
            self.confidence_level * 100.0,
            self.confidence_interval.0,
            self.confidence_interval.1,
            self.r_squared,
            self.p_value,
            self.direction()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub result: RegressionResult,
    pub warnings: Vec<RunWarning>,
}

// ============================================================================
// TREND ANALYZER
// ============================================================================

pub struct TrendAnalyzer {
    /// Slope interval confidence (default: 0.95)
    pub confidence_level: f64,

    /// Outlier cut-off on |residual / residual standard error| (default: 2.0)
    pub outlier_threshold: f64,

    /// Shapiro-Wilk significance level (default: 0.05)
    pub normality_alpha: f64,

    /// Acceptable Durbin-Watson band (default: 1.5 - 2.5)
    pub durbin_watson_bounds: (f64, f64),
}

impl TrendAnalyzer {
    pub fn new() -> Self {
        TrendAnalyzer {
            confidence_level: 0.95,
            outlier_threshold: 2.0,
            normality_alpha: 0.05,
            durbin_watson_bounds: (1.5, 2.5),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        TrendAnalyzer {
            confidence_level: config.confidence_level,
            outlier_threshold: config.outlier_threshold,
            normality_alpha: config.normality_alpha,
            durbin_watson_bounds: config.durbin_watson_bounds,
        }
    }

    pub fn analyze(&self, series: &[AnnualProportion]) -> Result<TrendAnalysis> {
        let points: Vec<(i32, f64)> = series.iter().map(|p| (p.year, p.proportion)).collect();
        self.fit(&points)
    }

    /// Fit proportion = slope * year + intercept
    pub fn fit(&self, points: &[(i32, f64)]) -> Result<TrendAnalysis> {
        let distinct: BTreeSet<i32> = points.iter().map(|&(year, _)| year).collect();
        if points.len() < MIN_POINTS || distinct.len() < 2 {
            return Err(AnalysisError::InsufficientData {
                points: points.len(),
                required: MIN_POINTS,
            });
        }

        let n = points.len() as f64;
        let df = points.len() - 2;
        let mean_x = points.iter().map(|&(x, _)| x as f64).sum::<f64>() / n;
        let mean_y = points.iter().map(|&(_, y)| y).sum::<f64>() / n;

        let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
        for &(x, y) in points {
            let dx = x as f64 - mean_x;
            let dy = y - mean_y;
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        let r_squared = if syy > 0.0 {
            (sxy * sxy / (sxx * syy)).min(1.0)
        } else {
            0.0
        };

        let residuals: Vec<f64> = points
            .iter()
            .map(|&(x, y)| y - (intercept + slope * x as f64))
            .collect();
        let sse: f64 = residuals.iter().map(|e| e * e).sum();
        let residual_standard_error = (sse / df as f64).sqrt();
        let standard_error = residual_standard_error / sxx.sqrt();

        let y_scale = points
            .iter()
            .map(|&(_, y)| y.abs())
            .fold(0.0_f64, f64::max)
            .max(f64::MIN_POSITIVE);
        let exact_fit = residual_standard_error <= EXACT_FIT_TOLERANCE * y_scale;

        let p_value = if exact_fit || standard_error == 0.0 {
            if slope.abs() > EXACT_FIT_TOLERANCE * y_scale {
                0.0
            } else {
                1.0
            }
        } else {
            t_two_sided_p(slope / standard_error, df as f64)
        };

        let t_crit = t_critical(self.confidence_level, df as f64);
        let half_width = t_crit * standard_error;
        let confidence_interval = (slope - half_width, slope + half_width);

        let mut warnings = Vec::new();
        let years: Vec<i32> = points.iter().map(|&(year, _)| year).collect();

        // Durbin-Watson
        let durbin_watson = if exact_fit {
            None
        } else {
            let num: f64 = residuals.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
            Some(num / sse)
        };
        if let Some(dw) = durbin_watson {
            let (low, high) = self.durbin_watson_bounds;
            if dw < low || dw > high {
                warn!(durbin_watson = dw, "residual autocorrelation suspected");
                warnings.push(RunWarning::ResidualAutocorrelation {
                    durbin_watson: dw,
                    low,
                    high,
                });
            }
        }

        // Shapiro-Wilk on residuals
        let (shapiro_w, shapiro_p) = if exact_fit {
            info!("exact fit, normality test skipped");
            warnings.push(RunWarning::NormalityTestUnavailable {
                reason: "residuals are identically zero".to_string(),
            });
            (None, None)
        } else {
            match shapiro_wilk(&residuals) {
                Ok(sw) => {
                    if sw.p_value < self.normality_alpha {
                        warn!(p_value = sw.p_value, "residuals fail normality check");
                        warnings.push(RunWarning::NonNormalResiduals {
                            p_value: sw.p_value,
                            alpha: self.normality_alpha,
                        });
                    }
                    (Some(sw.w), Some(sw.p_value))
                }
                Err(e) => {
                    warn!(error = %e, "normality test unavailable");
                    warnings.push(RunWarning::NormalityTestUnavailable {
                        reason: e.to_string(),
                    });
                    (None, None)
                }
            }
        };

        // Outliers by standardized residual
        let outlier_years: Vec<i32> = if exact_fit {
            Vec::new()
        } else {
            years
                .iter()
                .zip(&residuals)
                .filter(|(_, e)| (*e / residual_standard_error).abs() > self.outlier_threshold)
                .map(|(year, _)| *year)
                .collect()
        };
        if !outlier_years.is_empty() {
            warn!(years = ?outlier_years, "outlier years in trend residuals");
            warnings.push(RunWarning::OutlierYears {
                years: outlier_years.clone(),
                threshold: self.outlier_threshold,
            });
        }

        let result = RegressionResult {
            slope,
            intercept,
            r_squared,
            p_value,
            standard_error,
            confidence_level: self.confidence_level,
            confidence_interval,
            residual_standard_error,
            durbin_watson,
            shapiro_w,
            shapiro_p,
            outlier_years,
            years,
            residuals,
            degrees_of_freedom: df,
        };

        debug!(n = points.len(), slope, p_value, "trend fitted");
        info!("{}", result.summary());

        Ok(TrendAnalysis { result, warnings })
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
