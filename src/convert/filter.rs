//! Double-exponential orientation smoothing.
//!
//! Per-joint quaternion filter that rejects camera jitter below a noise
//! radius, smooths with an exponential term, and compensates latency by
//! predicting along a linear rotation trend. State lives in the converter's
//! double-buffered joint storage; each call consumes the previous frame's
//! state and returns the next.

use glam::Quat;

use super::math::{angle_between, rotation_between, slerp};

/// Exponential smoothing factor.
const SMOOTHING: f32 = 0.75;
/// Trend correction factor.
const CORRECTION: f32 = 0.75;
/// How far along the trend to predict.
const PREDICTION: f32 = 0.75;
/// Angular noise floor in radians; deltas below this are treated as jitter.
const JITTER_RADIUS: f32 = 0.10;
/// Maximum angular deviation of the prediction from the filtered value.
const MAX_DEVIATION_RADIUS: f32 = 0.10;

/// Per-joint filter state, persisted frame-to-frame while filtering is
/// enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    /// Smoothed rotation.
    pub filtered: Quat,
    /// Linear rotation trend (delta per frame).
    pub trend: Quat,
    /// Warm-up counter: 0 = cold, 1 = one sample seen, 2+ = steady state.
    pub started: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            filtered: Quat::IDENTITY,
            trend: Quat::IDENTITY,
            started: 0,
        }
    }
}

impl FilterState {
    /// Feed one raw local rotation through the filter.
    ///
    /// Returns the latency-compensated prediction (which replaces the joint's
    /// local rotation) and the state to persist for the next frame.
    pub fn step(&self, raw: Quat) -> (Quat, FilterState) {
        let (filtered, trend) = match self.started {
            0 => (raw, Quat::IDENTITY),
            1 => {
                let filtered = slerp(self.filtered, raw, 0.5);
                let diff = rotation_between(self.filtered, filtered);
                (filtered, slerp(self.trend, diff, CORRECTION))
            }
            _ => {
                // Jitter rejection: small deltas get a soft pull toward the
                // raw sample proportional to how close they sit to the noise
                // floor; large deltas are real motion and taken as-is.
                let delta = angle_between(raw, self.filtered);
                let corrected = if delta <= JITTER_RADIUS {
                    slerp(self.filtered, raw, delta / JITTER_RADIUS)
                } else {
                    raw
                };

                let filtered = slerp(corrected, self.trend * self.filtered, SMOOTHING);
                let trend = slerp(
                    self.trend,
                    rotation_between(self.filtered, filtered),
                    CORRECTION,
                );
                (filtered, trend)
            }
        };

        let mut predicted = slerp(Quat::IDENTITY, trend, PREDICTION) * filtered;

        // Clamp the prediction back toward the filtered value if the trend
        // overshoots.
        let deviation = angle_between(predicted, filtered);
        if deviation > MAX_DEVIATION_RADIUS {
            predicted = slerp(filtered, predicted, MAX_DEVIATION_RADIUS / deviation);
        }

        let next = FilterState {
            filtered: filtered.normalize(),
            trend: trend.normalize(),
            started: self.started.saturating_add(1),
        };
        (predicted.normalize(), next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_cold_start_passes_raw_through() {
        let raw = Quat::from_rotation_y(0.8);
        let (predicted, next) = FilterState::default().step(raw);
        assert!(angle_between(predicted, raw) < 1e-5);
        assert_eq!(next.started, 1);
        assert!(angle_between(next.trend, Quat::IDENTITY) < 1e-5);
    }

    #[test]
    fn test_constant_input_converges() {
        // Feeding a constant rotation must converge the prediction to
        // within the deviation radius and never exceed it after warm-up
        let target = Quat::from_axis_angle(Vec3::new(0.2, 1.0, 0.1).normalize(), 0.9);
        let mut state = FilterState::default();
        for frame in 0..8 {
            let (predicted, next) = state.step(target);
            state = next;
            if frame >= 2 {
                let dev = angle_between(predicted, target);
                assert!(
                    dev <= MAX_DEVIATION_RADIUS + 1e-4,
                    "frame {frame}: deviation {dev}"
                );
            }
        }
        let (predicted, _) = state.step(target);
        assert!(angle_between(predicted, target) < 0.01);
    }

    #[test]
    fn test_jitter_is_damped() {
        let base = Quat::from_rotation_x(0.5);
        let mut state = FilterState::default();
        for _ in 0..5 {
            state = state.step(base).1;
        }
        // A delta well inside the jitter radius barely moves the output
        let noisy = Quat::from_rotation_x(0.5 + 0.02);
        let (predicted, _) = state.step(noisy);
        assert!(
            angle_between(predicted, base) < 0.01,
            "jitter leaked through: {}",
            angle_between(predicted, base)
        );
    }

    #[test]
    fn test_large_motion_is_followed() {
        let mut state = FilterState::default();
        for _ in 0..5 {
            state = state.step(Quat::IDENTITY).1;
        }
        let target = Quat::from_rotation_y(1.2);
        let mut predicted = Quat::IDENTITY;
        for _ in 0..30 {
            let (p, next) = state.step(target);
            predicted = p;
            state = next;
        }
        assert!(
            angle_between(predicted, target) < 0.05,
            "filter failed to track large motion: {}",
            angle_between(predicted, target)
        );
    }

    #[test]
    fn test_prediction_deviation_is_clamped() {
        // Drive a fast constant angular velocity so the trend saturates, then
        // verify the prediction never strays past the clamp
        let mut state = FilterState::default();
        for frame in 0..20 {
            let raw = Quat::from_rotation_z(0.3 * frame as f32);
            let (predicted, next) = state.step(raw);
            let dev = angle_between(predicted, next.filtered);
            assert!(
                dev <= MAX_DEVIATION_RADIUS + 1e-4,
                "frame {frame}: deviation {dev}"
            );
            state = next;
        }
    }

    #[test]
    fn test_outputs_stay_normalized() {
        let mut state = FilterState::default();
        for frame in 0..50 {
            let raw = Quat::from_axis_angle(Vec3::new(0.3, 0.5, 0.8).normalize(), 0.07 * frame as f32);
            let (predicted, next) = state.step(raw);
            assert!((predicted.length() - 1.0).abs() < 1e-4);
            assert!((next.filtered.length() - 1.0).abs() < 1e-4);
            assert!((next.trend.length() - 1.0).abs() < 1e-4);
            state = next;
        }
    }
}
