/*
Oscillators
===========

Two families:

  shape   sine / saw / square / triangle computed from a phase accumulator.
          Inputs: frequency (Hz).

  osc     wavetable playback. Inputs: frequency (Hz), wave number (from a
          UseWavetable node), phase offset in cycles. A table played at
          frequency == its base pitch runs at its own sample rate. An empty
          or unknown wave number plays silence.

Phase is per voice, so two notes of the same instrument never share it.
*/

use crate::{
    dsp::oscillator::{Phase, Waveform},
    graph::node::{AudioProcessor, ProcessCtx},
    matrix::Matrix,
};

#[derive(Debug, Clone, Copy)]
pub struct ShapeOsc {
    waveform: Waveform,
    phase: Phase,
}

impl ShapeOsc {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            phase: Phase::new(),
        }
    }
}

impl AudioProcessor for ShapeOsc {
    #[inline]
    fn update_sample(&mut self, args: &[Matrix], ctx: &ProcessCtx, out: &mut Matrix) {
        let p = self.phase.advance(args[0].to_scalar(), ctx.dt);
        out.set_scalar(self.waveform.at(p));
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WavetableOsc {
    /// Position in table cycles.
    position: f32,
}

impl AudioProcessor for WavetableOsc {
    #[inline]
    fn update_sample(&mut self, args: &[Matrix], ctx: &ProcessCtx, out: &mut Matrix) {
        let frequency = args[0].to_scalar();
        let number = args[1].to_scalar();
        let offset = args[2].to_scalar();

        let sample = match ctx.waves.get(number.max(0.0) as usize) {
            Some(wave) if !wave.is_empty() && wave.base_pitch > 0.0 => {
                let value = wave.read(self.position + offset);
                let table_hz = wave.sample_rate / wave.len() as f32;
                let step = frequency / wave.base_pitch * table_hz * ctx.dt;
                self.position = (self.position + step).rem_euclid(1.0);
                value
            }
            _ => 0.0,
        };
        out.set_scalar(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::wave::WaveBank;

    #[test]
    fn sine_starts_at_zero_and_peaks_a_quarter_in() {
        let waves = WaveBank::new();
        let ctx = ProcessCtx::new(1.0 / 8.0, &waves);
        let mut osc = ShapeOsc::new(Waveform::Sine);
        let mut out = Matrix::default();
        let freq = [Matrix::scalar(1.0)];
        osc.update_sample(&freq, &ctx, &mut out);
        assert_eq!(out.to_scalar(), 0.0);
        osc.update_sample(&freq, &ctx, &mut out);
        osc.update_sample(&freq, &ctx, &mut out);
        assert!((out.to_scalar() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn wavetable_steps_through_samples_at_base_pitch() {
        let mut waves = WaveBank::new();
        let n = waves.set("ramp", vec![0.0, 1.0, 2.0, 3.0], 4.0, None);
        let ctx = ProcessCtx::new(1.0 / 4.0, &waves);
        let mut osc = WavetableOsc::default();
        let args = [Matrix::scalar(1.0), Matrix::scalar(n as f32), Matrix::scalar(0.0)];
        let mut out = Matrix::default();
        let mut seen = Vec::new();
        for _ in 0..5 {
            osc.update_sample(&args, &ctx, &mut out);
            seen.push(out.to_scalar());
        }
        assert_eq!(seen, vec![0.0, 1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn missing_wave_is_silent() {
        let waves = WaveBank::new();
        let ctx = ProcessCtx::new(1.0 / 48_000.0, &waves);
        let mut osc = WavetableOsc::default();
        let args = [Matrix::scalar(440.0), Matrix::scalar(3.0), Matrix::scalar(0.0)];
        let mut out = Matrix::scalar(9.0);
        osc.update_sample(&args, &ctx, &mut out);
        assert_eq!(out.to_scalar(), 0.0);
    }
}
