//! Per-sample parameter glides.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutomationMode {
    /// Constant additive step per sample.
    #[default]
    Linear,
    /// Constant multiplicative step per sample. Cannot cross or touch zero.
    Exponential,
    /// Hold the current value, jump to the target when the time is up.
    Step,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationError {
    /// An exponential ramp from `from` to `to` would have to pass through 0.
    CrossesZero { from: f32, to: f32 },
}

impl fmt::Display for AutomationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomationError::CrossesZero { from, to } => {
                write!(f, "exponential ramp from {from} to {to} crosses zero")
            }
        }
    }
}

impl std::error::Error for AutomationError {}

/// A value gliding towards a target.
///
/// Retargeting mid-ramp starts the new ramp from wherever the value currently
/// is. Once the remaining time runs out the value is exactly the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutomatedValue {
    value: f32,
    target: f32,
    remaining: f32,
    /// Additive step (linear) or multiplicative factor (exponential).
    step: f32,
    mode: AutomationMode,
}

impl AutomatedValue {
    pub fn new(value: f32, mode: AutomationMode) -> Self {
        Self {
            value,
            target: value,
            remaining: 0.0,
            step: 0.0,
            mode,
        }
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn mode(&self) -> AutomationMode {
        self.mode
    }

    pub fn is_settled(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Start a glide to `target` over `duration` seconds, ticking every `dt`.
    ///
    /// A non-positive duration jumps immediately. On error nothing changes.
    pub fn goto(&mut self, target: f32, dt: f32, duration: f32) -> Result<(), AutomationError> {
        if duration <= 0.0 {
            self.value = target;
            self.target = target;
            self.remaining = 0.0;
            return Ok(());
        }
        let step = match self.mode {
            AutomationMode::Linear => dt * (target - self.value) / duration,
            AutomationMode::Exponential => {
                if self.value * target <= 0.0 {
                    return Err(AutomationError::CrossesZero {
                        from: self.value,
                        to: target,
                    });
                }
                (target / self.value).powf(dt / duration)
            }
            AutomationMode::Step => 0.0,
        };
        self.target = target;
        self.remaining = duration;
        self.step = step;
        Ok(())
    }

    /// Advance one tick of `dt` seconds and return the new value.
    #[inline]
    pub fn update(&mut self, dt: f32) -> f32 {
        if self.remaining <= 0.0 {
            return self.value;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            self.value = self.target;
        } else {
            match self.mode {
                AutomationMode::Linear => self.value += self.step,
                AutomationMode::Exponential => self.value *= self.step,
                AutomationMode::Step => {}
            }
        }
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 48_000.0;

    #[test]
    fn linear_ramp_reaches_target_exactly() {
        let mut v = AutomatedValue::new(0.0, AutomationMode::Linear);
        v.goto(1.0, 0.25, 1.0).unwrap();
        assert_eq!(v.update(0.25), 0.25);
        assert_eq!(v.update(0.25), 0.5);
        assert_eq!(v.update(0.25), 0.75);
        assert_eq!(v.update(0.25), 1.0);
        assert_eq!(v.update(0.25), 1.0);
        assert!(v.is_settled());
    }

    #[test]
    fn exponential_ramp_doubles_per_period() {
        let mut v = AutomatedValue::new(100.0, AutomationMode::Exponential);
        v.goto(400.0, 0.5, 1.0).unwrap();
        let halfway = v.update(0.5 - 1e-6);
        assert!((halfway - 200.0).abs() < 1e-3, "{halfway}");
        assert_eq!(v.update(1.0), 400.0);
    }

    #[test]
    fn step_holds_then_jumps() {
        let mut v = AutomatedValue::new(1.0, AutomationMode::Step);
        v.goto(5.0, DT, 2.0 * DT + DT / 2.0).unwrap();
        assert_eq!(v.update(DT), 1.0);
        assert_eq!(v.update(DT), 1.0);
        assert_eq!(v.update(DT), 5.0);
    }

    #[test]
    fn zero_duration_snaps_in_every_mode() {
        for mode in [
            AutomationMode::Linear,
            AutomationMode::Exponential,
            AutomationMode::Step,
        ] {
            let mut v = AutomatedValue::new(5.0, mode);
            v.goto(-3.0, DT, 0.0).unwrap();
            assert_eq!(v.update(DT), -3.0);
        }
    }

    #[test]
    fn exponential_refuses_to_cross_zero() {
        let mut v = AutomatedValue::new(5.0, AutomationMode::Exponential);
        let before = v;
        assert_eq!(
            v.goto(-3.0, DT, 1.0),
            Err(AutomationError::CrossesZero { from: 5.0, to: -3.0 })
        );
        assert_eq!(v, before);
        assert!(v.goto(0.0, DT, 1.0).is_err());
    }

    #[test]
    fn retarget_continues_from_current_value() {
        let mut v = AutomatedValue::new(0.0, AutomationMode::Linear);
        v.goto(10.0, 1.0, 10.0).unwrap();
        v.update(1.0);
        v.update(1.0);
        assert_eq!(v.value(), 2.0);
        v.goto(0.0, 1.0, 2.0).unwrap();
        assert_eq!(v.update(1.0), 1.0);
        assert_eq!(v.update(1.0), 0.0);
    }
}
