//! Gain providers
//!
//! The controller polls its gains once per tick through [`GainProvider`].
//! [`FixedGains`] holds constants; [`SliderGains`] models a pair of bounded,
//! stepped sliders a user can drag while the simulation runs.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// Source of the proportional and derivative gains
pub trait GainProvider {
    /// Proportional gain (force per radian)
    fn kp(&self) -> f64;

    /// Derivative gain (force per radian per unit time)
    fn kd(&self) -> f64;
}

/// Constant gains
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedGains {
    pub kp: f64,
    pub kd: f64,
}

impl FixedGains {
    pub const DEFAULT_KP: f64 = 0.006;
    pub const DEFAULT_KD: f64 = 0.2;

    pub fn new(kp: f64, kd: f64) -> Self {
        Self { kp, kd }
    }
}

impl Default for FixedGains {
    fn default() -> Self {
        Self::new(Self::DEFAULT_KP, Self::DEFAULT_KD)
    }
}

impl GainProvider for FixedGains {
    fn kp(&self) -> f64 {
        self.kp
    }

    fn kd(&self) -> f64 {
        self.kd
    }
}

/// A bounded scalar input with a fixed step
#[derive(Debug, Clone, PartialEq)]
pub struct GainSlider {
    name: String,
    min: f64,
    max: f64,
    step: f64,
    default: f64,
    value: f64,
}

impl GainSlider {
    /// Create a slider positioned at its default
    pub fn new(
        name: impl Into<String>,
        min: f64,
        max: f64,
        step: f64,
        default: f64,
    ) -> ControlResult<Self> {
        let name = name.into();
        let invalid = |reason: &str| ControlError::InvalidSlider {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if !(min.is_finite() && max.is_finite() && step.is_finite() && default.is_finite()) {
            return Err(invalid("bounds, step and default must be finite"));
        }
        if min > max {
            return Err(invalid("min is greater than max"));
        }
        if step <= 0.0 {
            return Err(invalid("step must be positive"));
        }
        if default < min || default > max {
            return Err(invalid("default lies outside [min, max]"));
        }

        Ok(Self {
            name,
            min,
            max,
            step,
            default,
            value: default,
        })
    }

    /// Move the slider, clamping into range and snapping to the step grid
    pub fn set(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        let steps = ((value - self.min) / self.step).round();
        self.value = (self.min + steps * self.step).clamp(self.min, self.max);
    }

    /// Move to a starting position, rejecting values outside the range
    pub fn start_at(&mut self, value: f64) -> ControlResult<()> {
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(ControlError::InvalidSlider {
                name: self.name.clone(),
                reason: format!(
                    "start value {} lies outside [{}, {}]",
                    value, self.min, self.max
                ),
            });
        }
        self.set(value);
        Ok(())
    }

    /// Move the slider by a whole number of steps
    pub fn nudge(&mut self, steps: i32) {
        self.set(self.value + steps as f64 * self.step);
    }

    /// Return the slider to its default
    pub fn reset(&mut self) {
        self.value = self.default;
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> f64 {
        self.default
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Position within the range, 0.0 at min and 1.0 at max
    pub fn ratio(&self) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.value - self.min) / span).clamp(0.0, 1.0)
    }
}

/// Kp and Kd sliders
#[derive(Debug, Clone, PartialEq)]
pub struct SliderGains {
    pub kp: GainSlider,
    pub kd: GainSlider,
}

impl SliderGains {
    pub const DEFAULT_KP: f64 = 0.005;
    pub const DEFAULT_KD: f64 = 0.200;
    pub const KP_RANGE: (f64, f64) = (0.0, 0.007);
    pub const KD_RANGE: (f64, f64) = (0.0, 0.500);
    pub const STEP: f64 = 0.001;

    /// Standard sliders moved to the given starting values
    ///
    /// The defaults stay at 0.005 / 0.200, so a reset returns there.
    pub fn starting_at(kp: f64, kd: f64) -> ControlResult<Self> {
        let mut gains = Self::default();
        gains.kp.start_at(kp)?;
        gains.kd.start_at(kd)?;
        Ok(gains)
    }

    /// Return both sliders to their defaults
    pub fn reset(&mut self) {
        self.kp.reset();
        self.kd.reset();
    }
}

impl Default for SliderGains {
    fn default() -> Self {
        let kp = GainSlider {
            name: "kp".to_string(),
            min: Self::KP_RANGE.0,
            max: Self::KP_RANGE.1,
            step: Self::STEP,
            default: Self::DEFAULT_KP,
            value: Self::DEFAULT_KP,
        };
        let kd = GainSlider {
            name: "kd".to_string(),
            min: Self::KD_RANGE.0,
            max: Self::KD_RANGE.1,
            step: Self::STEP,
            default: Self::DEFAULT_KD,
            value: Self::DEFAULT_KD,
        };
        Self { kp, kd }
    }
}

impl GainProvider for SliderGains {
    fn kp(&self) -> f64 {
        self.kp.value()
    }

    fn kd(&self) -> f64 {
        self.kd.value()
    }
}
