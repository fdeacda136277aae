//! Self-exciting event arrivals with exponentially decaying intensity.
//!
//! Each step runs one iteration of the exact-simulation recursion for a
//! Hawkes process and reads the sign of the inter-arrival statistic `S` as a
//! per-step trigger: `S < 0` means a random trade fires this step. `S` is not
//! used as a waiting time.

use crate::random::UniformSource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HawkesParams {
    /// Baseline intensity `a`.
    pub baseline: f64,
    /// Decay rate `delta`.
    pub decay: f64,
    /// Jump added to the intensity every step.
    pub jump: f64,
}

impl Default for HawkesParams {
    fn default() -> Self {
        Self {
            baseline: 1.0,
            decay: 0.5,
            jump: 0.22,
        }
    }
}

/// Intensity right after the last jump and right before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intensity {
    pub post_jump: f64,
    pub pre_jump: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrivalSample {
    pub statistic: f64,
    pub triggered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HawkesProcess {
    params: HawkesParams,
    intensity: Intensity,
}

impl HawkesProcess {
    pub fn new(params: HawkesParams) -> Self {
        let a = params.baseline;
        Self {
            params,
            intensity: Intensity {
                post_jump: a,
                pre_jump: a,
            },
        }
    }

    pub fn intensity(&self) -> Intensity {
        self.intensity
    }

    pub fn params(&self) -> &HawkesParams {
        &self.params
    }

    /// One recursion step. Always consumes exactly two draws, `u` then `u2`.
    pub fn sample<R: UniformSource + ?Sized>(&mut self, source: &mut R) -> ArrivalSample {
        let a = self.params.baseline;
        let delta = self.params.decay;

        let u = source.next_uniform();
        // lambda+ == a on the first step: ln(u) / 0 is -inf and the else branch runs
        let d = 1.0 + delta * u.ln() / (self.intensity.post_jump - a);

        let u2 = source.next_uniform();
        let waiting = -(1.0 / a) * u2.ln();
        let statistic = if d > 0.0 {
            (1.0 + delta * u.ln()).min(waiting)
        } else {
            waiting
        };

        let pre_jump = (self.intensity.post_jump - a) * (-delta * statistic).exp() + a;
        // guards a NaN statistic; the recursion itself never goes below a
        let pre_jump = if pre_jump.is_nan() { a } else { pre_jump.max(a) };
        self.intensity = Intensity {
            pre_jump,
            post_jump: pre_jump + self.params.jump,
        };

        ArrivalSample {
            statistic,
            triggered: statistic < 0.0,
        }
    }
}
