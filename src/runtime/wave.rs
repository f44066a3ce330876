//! Loaded wavetables.
//!
//! Graphs refer to waves by name; the compiled program pushes a wave *number*
//! and oscillators look the table up through the bank on every sample. A slot
//! can be reserved before its samples arrive, in which case it reads as
//! silence.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Wave {
    pub samples: Vec<f32>,
    pub sample_rate: f32,
    /// Frequency at which playing the table at its own rate sounds.
    pub base_pitch: f32,
}

impl Wave {
    pub fn new(samples: Vec<f32>, sample_rate: f32, base_pitch: Option<f32>) -> Self {
        let base_pitch = base_pitch.unwrap_or_else(|| {
            if samples.is_empty() {
                0.0
            } else {
                sample_rate / samples.len() as f32
            }
        });
        Self {
            samples,
            sample_rate,
            base_pitch,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Linearly interpolated read at fractional position `phase` in `[0, 1)`.
    #[inline]
    pub fn read(&self, phase: f32) -> f32 {
        let len = self.samples.len();
        if len == 0 {
            return 0.0;
        }
        let pos = phase.rem_euclid(1.0) * len as f32;
        let i = (pos as usize).min(len - 1);
        let frac = pos - i as f32;
        let a = self.samples[i];
        let b = self.samples[(i + 1) % len];
        a + (b - a) * frac
    }
}

#[derive(Debug, Clone, Default)]
pub struct WaveBank {
    waves: Vec<Option<Wave>>,
    by_name: HashMap<String, usize>,
}

impl WaveBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or replace) `name`. Returns its wave number.
    pub fn set(
        &mut self,
        name: &str,
        samples: Vec<f32>,
        sample_rate: f32,
        base_pitch: Option<f32>,
    ) -> usize {
        let index = self.slot(name);
        self.waves[index] = Some(Wave::new(samples, sample_rate, base_pitch));
        index
    }

    /// Wave number for `name`, reserving an empty slot if it is unknown.
    pub fn slot(&mut self, name: &str) -> usize {
        if let Some(&index) = self.by_name.get(name) {
            return index;
        }
        let index = self.waves.len();
        self.waves.push(None);
        self.by_name.insert(name.to_string(), index);
        index
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Wave> {
        self.waves.get(index).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.waves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    /// Drop all samples. Wave numbers handed out earlier stay reserved.
    pub fn clear(&mut self) {
        for wave in &mut self.waves {
            *wave = None;
        }
    }
}
