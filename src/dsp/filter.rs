use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
| type              | passes          | rejects      |
| ----------------- | --------------- | ------------ |
| low-pass          | below cutoff    | above cutoff |
| high-pass         | above cutoff    | below cutoff |
| band-pass         | around cutoff   | elsewhere    |
| notch             | elsewhere       | around cutoff|

Trapezoidal state-variable filter. All four responses fall out of the same
two integrators, so switching type never resets state.

Coefficients depend only on cutoff, resonance and sample rate. They are
computed at control rate and reused for every sample of the block.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    #[default]
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

impl FilterType {
    /// Mode selector as carried on a graph wire: 0 low, 1 high, 2 band,
    /// 3 notch. Anything else rounds into range.
    pub fn from_selector(value: f32) -> Self {
        match value.round().clamp(0.0, 3.0) as u8 {
            0 => FilterType::LowPass,
            1 => FilterType::HighPass,
            2 => FilterType::BandPass,
            _ => FilterType::Notch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvfCoefficients {
    g: f32,
    k: f32,
}

impl SvfCoefficients {
    /// `resonance` in `[0, 1)`; values near 1 ring.
    pub fn new(cutoff_hz: f32, resonance: f32, sample_rate: f32) -> Self {
        let nyquist_guard = sample_rate * 0.49;
        let cutoff = cutoff_hz.clamp(1.0, nyquist_guard);
        let g = (TAU * cutoff / (2.0 * sample_rate)).tan();
        let k = 2.0 - 2.0 * resonance.clamp(0.0, 0.99);
        Self { g, k }
    }
}

impl Default for SvfCoefficients {
    fn default() -> Self {
        Self::new(1000.0, 0.0, 48_000.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SvFilter {
    ic1eq: f32,
    ic2eq: f32,
}

impl SvFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn tick(&mut self, sample: f32, c: &SvfCoefficients, filter_type: FilterType) -> f32 {
        let SvfCoefficients { g, k } = *c;
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;
        match filter_type {
            FilterType::LowPass => v2,
            FilterType::BandPass => v1,
            FilterType::HighPass => sample - k * v1 - v2,
            FilterType::Notch => sample - k * v1,
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}
