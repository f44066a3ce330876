use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Naive (non band-limited) shapes over a normalized phase in [0, 1):

    sine      sin(2π·p)
    saw       2p - 1
    square    +1 below p = 0.5, -1 above
    triangle  1 - 4|p - 0.5|, peaks at p = 0.5

Fine for control signals and low notes. Wavetable playback covers the rest.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Saw,
    Square,
    Triangle,
}

impl Waveform {
    #[inline]
    pub fn at(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Saw => 2.0 * phase - 1.0,
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

/// Normalized phase accumulator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Phase {
    value: f32,
}

impl Phase {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Return the current phase, then advance by `frequency * dt` cycles.
    #[inline]
    pub fn advance(&mut self, frequency: f32, dt: f32) -> f32 {
        let current = self.value;
        self.value = (self.value + frequency * dt).rem_euclid(1.0);
        current
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}
