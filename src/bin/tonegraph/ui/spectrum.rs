//! Log-frequency spectrum of the output, with peak decay

use std::sync::Arc;

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

const BANDS: usize = 64;
const FLOOR_DB: f64 = -100.0;
/// How far a band may fall per update, in dB.
const FALL_DB: f64 = 3.0;

pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    /// FFT bin for each band.
    bins: Vec<usize>,
    /// `(log10 Hz, dB)` per band, ready to plot.
    bands: Vec<(f64, f64)>,
}

impl SpectrumAnalyzer {
    pub fn new(fft_len: usize, sample_rate: f32) -> Self {
        let fft_len = fft_len.max(2);
        let fft = FftPlanner::new().plan_fft_forward(fft_len);

        // Hann
        let denom = (fft_len - 1) as f32;
        let window = (0..fft_len)
            .map(|i| 0.5 * (1.0 - (std::f32::consts::TAU * i as f32 / denom).cos()))
            .collect();

        let nyquist = (sample_rate as f64 / 2.0).clamp(40.0, 20_000.0);
        let (lo, hi) = (20f64.log10(), nyquist.log10());
        let last_bin = fft_len / 2 - 1;
        let (bins, bands) = (0..BANDS)
            .map(|b| {
                let log_hz = lo + (hi - lo) * b as f64 / (BANDS - 1) as f64;
                let hz = 10f64.powf(log_hz);
                let bin = ((hz * fft_len as f64 / sample_rate as f64).round() as usize).min(last_bin);
                (bin, (log_hz, FLOOR_DB))
            })
            .unzip();

        Self {
            fft,
            window,
            scratch: vec![Complex::default(); fft_len],
            bins,
            bands,
        }
    }

    /// Analyse the newest window of `samples`. Shorter input is ignored.
    pub fn update(&mut self, samples: &[f32]) {
        let n = self.window.len();
        if samples.len() < n {
            return;
        }
        let recent = &samples[samples.len() - n..];
        for ((slot, &s), &w) in self.scratch.iter_mut().zip(recent).zip(&self.window) {
            *slot = Complex::new(s * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let norm = 2.0 / n as f32;
        for (band, &bin) in self.bands.iter_mut().zip(&self.bins) {
            let magnitude = (self.scratch[bin].norm() * norm).max(1e-6);
            let db = (20.0 * magnitude.log10()) as f64;
            band.1 = db.max(band.1 - FALL_DB).max(FLOOR_DB);
        }
    }

    pub fn data(&self) -> &[(f64, f64)] {
        &self.bands
    }
}

pub fn render_spectrum(frame: &mut Frame, area: Rect, bands: &[(f64, f64)]) {
    let x_min = bands.first().map_or(0.0, |b| b.0);
    let x_max = bands.last().map_or(1.0, |b| b.0).max(x_min + 1e-3);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(bands);

    let chart = Chart::new(vec![dataset])
        .block(Block::default().title(" Spectrum ").borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .bounds([x_min, x_max])
                .labels(vec!["20", "200", "2k", "20k"])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([FLOOR_DB, 0.0])
                .labels(vec!["-100", "-50", "0"])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_peaks_near_its_band() {
        let sr = 48_000.0;
        let mut analyzer = SpectrumAnalyzer::new(1024, sr);
        let tone: Vec<f32> = (0..1024)
            .map(|i| (std::f32::consts::TAU * 1_000.0 * i as f32 / sr).sin())
            .collect();
        analyzer.update(&tone);
        let loudest = analyzer
            .data()
            .iter()
            .copied()
            .fold((0.0, f64::MIN), |a, b| if b.1 > a.1 { b } else { a });
        let hz = 10f64.powf(loudest.0);
        assert!((700.0..1_400.0).contains(&hz), "{hz}");
    }
}
