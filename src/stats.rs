//! Distribution helpers for the trend analysis.
//!
//! Student-t tail probabilities and critical values come from `statrs`.
//! The Shapiro-Wilk normality test (Royston 1995, AS R94) is implemented
//! here on top of the `statrs` standard normal, since `statrs` has none.

use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use std::f64::consts::PI;

// ============================================================================
// STUDENT-T
// ============================================================================

/// P(|T| >= |t|) for T ~ t(df); NaN when df is not positive
pub fn t_two_sided_p(t: f64, df: f64) -> f64 {
    if t.is_nan() {
        return f64::NAN;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}

/// Two-sided critical value t_((1 + confidence) / 2, df)
pub fn t_critical(confidence: f64, df: f64) -> f64 {
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => dist.inverse_cdf(0.5 + confidence / 2.0),
        Err(_) => f64::NAN,
    }
}

// ============================================================================
// SHAPIRO-WILK
// ============================================================================

pub const SHAPIRO_MIN_N: usize = 3;
pub const SHAPIRO_MAX_N: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapiroWilk {
    pub w: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapiroError {
    SampleSize(usize),
    ZeroRange,
    Distribution(String),
}

impl std::fmt::Display for ShapiroError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapiroError::SampleSize(n) => write!(
                f,
                "sample size {} outside {}..={}",
                n, SHAPIRO_MIN_N, SHAPIRO_MAX_N
            ),
            ShapiroError::ZeroRange => write!(f, "all values are identical"),
            ShapiroError::Distribution(e) => write!(f, "normal distribution unavailable: {}", e),
        }
    }
}

/// c0 + c1*x + c2*x^2 + ...
fn poly(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Shapiro-Wilk W and its p-value for 3 <= n <= 5000
pub fn shapiro_wilk(sample: &[f64]) -> Result<ShapiroWilk, ShapiroError> {
    const G: [f64; 2] = [-2.273, 0.459];
    const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
    const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
    const C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
    const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
    const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
    const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
    const SMALL: f64 = 1e-19;

    let n = sample.len();
    if !(SHAPIRO_MIN_N..=SHAPIRO_MAX_N).contains(&n) {
        return Err(ShapiroError::SampleSize(n));
    }

    let normal = Normal::new(0.0, 1.0).map_err(|e| ShapiroError::Distribution(e.to_string()))?;

    let mut x = sample.to_vec();
    x.sort_by(f64::total_cmp);
    let range = x[n - 1] - x[0];
    if !(range >= SMALL) {
        return Err(ShapiroError::ZeroRange);
    }

    // Coefficients for the lower half, a[0] being the most extreme
    let half = n / 2;
    let an = n as f64;
    let mut a = vec![0.0; half];
    if n == 3 {
        a[0] = 0.5_f64.sqrt();
    } else {
        let m: Vec<f64> = (1..=half)
            .map(|i| normal.inverse_cdf((i as f64 - 0.375) / (an + 0.25)))
            .collect();
        let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
        let ssumm2 = summ2.sqrt();
        let rsn = 1.0 / an.sqrt();
        let a1 = poly(&C1, rsn) - m[0] / ssumm2;

        let (first_scaled, fac) = if n > 5 {
            let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
            let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
                / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
                .sqrt();
            a[1] = a2;
            (2, fac)
        } else {
            let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
            (1, fac)
        };
        a[0] = a1;
        for i in first_scaled..half {
            a[i] = -m[i] / fac;
        }
    }

    // Antisymmetric weight vector over the sorted sample
    let mut weights = vec![0.0; n];
    for (i, coeff) in a.iter().enumerate() {
        weights[i] = -coeff;
        weights[n - 1 - i] = *coeff;
    }

    let scaled: Vec<f64> = x.iter().map(|v| v / range).collect();
    let mean_w = weights.iter().sum::<f64>() / an;
    let mean_x = scaled.iter().sum::<f64>() / an;
    let (mut ssa, mut ssx, mut sax) = (0.0, 0.0, 0.0);
    for (w, v) in weights.iter().zip(&scaled) {
        let dw = w - mean_w;
        let dx = v - mean_x;
        ssa += dw * dw;
        ssx += dx * dx;
        sax += dw * dx;
    }

    // 1 - W, computed this way to avoid rounding when W is close to 1
    let ssassx = (ssa * ssx).sqrt();
    let w1 = ((ssassx - sax) * (ssassx + sax) / (ssa * ssx)).max(0.0);
    let w = 1.0 - w1;

    if n == 3 {
        const PI6: f64 = 6.0 / PI;
        const STQR: f64 = PI / 3.0;
        let p_value = (PI6 * (w.sqrt().asin() - STQR)).clamp(0.0, 1.0);
        return Ok(ShapiroWilk { w, p_value });
    }
    if w1 == 0.0 {
        return Ok(ShapiroWilk { w, p_value: 1.0 });
    }

    let mut y = w1.ln();
    let (mean, sd) = if n <= 11 {
        let gamma = poly(&G, an);
        if y >= gamma {
            return Ok(ShapiroWilk { w, p_value: 1e-99 });
        }
        y = -(gamma - y).ln();
        (poly(&C3, an), poly(&C4, an).exp())
    } else {
        let ln_n = an.ln();
        (poly(&C5, ln_n), poly(&C6, ln_n).exp())
    };

    Ok(ShapiroWilk {
        w,
        p_value: normal.sf((y - mean) / sd),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn t_two_sided_known_values() {
        // t = 2.228139 is the 97.5% point of t(10)
        assert!(approx_eq(t_two_sided_p(2.228139, 10.0), 0.05, 1e-5));
        assert!(approx_eq(t_two_sided_p(-2.228139, 10.0), 0.05, 1e-5));
        // t(1) is Cauchy: P(|T| > 1) = 0.5
        assert!(approx_eq(t_two_sided_p(1.0, 1.0), 0.5, 1e-8));
        assert!(approx_eq(t_two_sided_p(0.0, 5.0), 1.0, 1e-12));
        assert!(t_two_sided_p(1.0, 0.0).is_nan());
    }

    #[test]
    fn t_critical_known_values() {
        assert!(approx_eq(t_critical(0.95, 10.0), 2.228139, 1e-4));
        assert!(approx_eq(t_critical(0.95, 3.0), 3.182446, 1e-4));
        assert!(approx_eq(t_critical(0.95, 1.0), 12.706205, 1e-3));
        assert!(approx_eq(t_critical(0.99, 1000.0), 2.580755, 1e-3));
        assert!(t_critical(0.95, -1.0).is_nan());
    }

    #[test]
    fn shapiro_rejects_bad_sizes_and_constant_samples() {
        assert_eq!(shapiro_wilk(&[1.0, 2.0]), Err(ShapiroError::SampleSize(2)));
        assert_eq!(
            shapiro_wilk(&[3.0, 3.0, 3.0, 3.0]),
            Err(ShapiroError::ZeroRange)
        );
    }

    #[test]
    fn shapiro_three_points_exact() {
        // Evenly spaced triple gives W = 1 and p = 1
        let result = shapiro_wilk(&[1.0, 2.0, 3.0]).unwrap();
        assert!(approx_eq(result.w, 1.0, 1e-10));
        assert!(approx_eq(result.p_value, 1.0, 1e-6));
    }

    #[test]
    fn shapiro_accepts_normal_looking_sample() {
        // Normal scores are as normal as a sample gets
        let normal = Normal::new(0.0, 1.0).unwrap();
        let n = 20;
        let sample: Vec<f64> = (1..=n)
            .map(|i| normal.inverse_cdf((i as f64 - 0.375) / (n as f64 + 0.25)))
            .collect();
        let result = shapiro_wilk(&sample).unwrap();
        assert!(result.w > 0.98);
        assert!(result.p_value > 0.5);
    }

    #[test]
    fn shapiro_rejects_heavy_outlier() {
        let mut sample = vec![0.1, -0.2, 0.05, 0.0, -0.1, 0.15, -0.05, 0.2, -0.15, 0.1, 0.0];
        sample.push(25.0);
        let result = shapiro_wilk(&sample).unwrap();
        assert!(result.w < 0.6);
        assert!(result.p_value < 0.001);
    }

    #[test]
    fn shapiro_input_order_irrelevant() {
        let a = shapiro_wilk(&[2.1, 0.4, 3.3, 1.0, 5.8, 2.2]).unwrap();
        let b = shapiro_wilk(&[5.8, 2.2, 1.0, 3.3, 0.4, 2.1]).unwrap();
        assert_eq!(a, b);
    }
}
