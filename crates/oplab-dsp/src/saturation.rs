//! Op-amp output saturation -- hard clip to the supply-limited rails.
//!
//! Every evaluator ends here. The ideal op-amp has unlimited swing; a real
//! one on a +/-15 V supply stops at the rails, so the ideal output is
//! clamped sample by sample and the result is flagged as clipped.
//!
//! Non-finite samples never leave this module: NaN becomes 0 V and +/-inf
//! lands on the matching rail (and counts as clipping).

use serde::Deserialize;

/// Default rail voltage for the lab's +/-15 V supply.
pub const DEFAULT_V_SAT: f64 = 15.0;

/// How close the clipped peak must sit to a rail to count as "touching" it.
pub const DEFAULT_CLIP_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SaturationLimits {
    pub v_sat_plus: f64,
    pub v_sat_minus: f64,
}

impl SaturationLimits {
    pub fn symmetric(v_sat: f64) -> Self {
        Self {
            v_sat_plus: v_sat.abs(),
            v_sat_minus: -v_sat.abs(),
        }
    }

    pub fn clamp(&self, v: f64) -> f64 {
        if v.is_nan() {
            0.0
        } else {
            v.clamp(self.v_sat_minus, self.v_sat_plus)
        }
    }
}

impl Default for SaturationLimits {
    fn default() -> Self {
        Self::symmetric(DEFAULT_V_SAT)
    }
}

/// Output of the clip step.
#[derive(Debug, Clone, PartialEq)]
pub struct Clipped {
    pub values: Vec<f64>,
    pub is_clipped: bool,
}

/// Clamp an ideal output trace to the rails.
///
/// `is_clipped` is set when a raw sample went past a rail and the clamped
/// trace touches that same rail within `tolerance`.
pub fn clip(raw: &[f64], limits: &SaturationLimits, tolerance: f64) -> Clipped {
    let mut over_plus = false;
    let mut over_minus = false;
    let mut hi = f64::NEG_INFINITY;
    let mut lo = f64::INFINITY;

    let values: Vec<f64> = raw
        .iter()
        .map(|&v| {
            if v > limits.v_sat_plus {
                over_plus = true;
            } else if v < limits.v_sat_minus {
                over_minus = true;
            }
            let c = limits.clamp(v);
            hi = hi.max(c);
            lo = lo.min(c);
            c
        })
        .collect();

    let touches_plus = (hi - limits.v_sat_plus).abs() < tolerance;
    let touches_minus = (lo - limits.v_sat_minus).abs() < tolerance;
    let is_clipped = (over_plus && touches_plus) || (over_minus && touches_minus);

    Clipped { values, is_clipped }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range_untouched() {
        let raw = [0.0, 1.5, -14.9, 15.0, -15.0];
        let out = clip(&raw, &SaturationLimits::default(), DEFAULT_CLIP_TOLERANCE);
        assert_eq!(out.values, raw.to_vec());
        assert!(!out.is_clipped, "signal exactly at the rails is not clipped");
    }

    #[test]
    fn test_overdrive_clamped_exactly() {
        let raw = [20.0, -0.5, -30.0];
        let out = clip(&raw, &SaturationLimits::default(), DEFAULT_CLIP_TOLERANCE);
        assert_eq!(out.values, vec![15.0, -0.5, -15.0]);
        assert!(out.is_clipped);
    }

    #[test]
    fn test_one_sided_overdrive() {
        let raw = [3.0, -16.0];
        let out = clip(&raw, &SaturationLimits::default(), DEFAULT_CLIP_TOLERANCE);
        assert!(out.is_clipped);
        assert_eq!(out.values[1], -15.0);
    }

    #[test]
    fn test_non_finite_scrubbed() {
        let raw = [f64::NAN, f64::INFINITY, f64::NEG_INFINITY];
        let out = clip(&raw, &SaturationLimits::default(), DEFAULT_CLIP_TOLERANCE);
        assert_eq!(out.values, vec![0.0, 15.0, -15.0]);
        assert!(out.values.iter().all(|v| v.is_finite()));
        assert!(out.is_clipped);
    }

    #[test]
    fn test_asymmetric_rails() {
        let limits = SaturationLimits {
            v_sat_plus: 12.0,
            v_sat_minus: -10.0,
        };
        let out = clip(&[11.0, -11.0], &limits, DEFAULT_CLIP_TOLERANCE);
        assert_eq!(out.values, vec![11.0, -10.0]);
        assert!(out.is_clipped);
    }
}
