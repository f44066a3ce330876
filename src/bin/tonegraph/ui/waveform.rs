//! Oscilloscope over the most recent output samples

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

/// Vertical range never shrinks below this, so silence stays flat.
const MIN_SCALE: f64 = 0.25;

pub fn render_waveform(frame: &mut Frame, area: Rect, samples: &[f32]) {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    let scale = (peak as f64).max(MIN_SCALE);

    let len = samples.len().max(1) as f64;
    let points: Vec<(f64, f64)> = samples
        .iter()
        .enumerate()
        .map(|(i, &s)| (i as f64 / len, s as f64))
        .collect();

    // Anything past full scale is clipping at the device.
    let color = if peak > 1.0 { Color::Red } else { Color::Cyan };
    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .title(format!(" Output  peak {peak:.2} "))
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .bounds([0.0, 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([-scale, scale])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
