//! TUI for tonegraph
//!
//! A computer-keyboard piano on top of an oscilloscope and a spectrum view.
//! Key presses become [`SynthMessage`]s pushed to the audio thread.

mod spectrum;
mod waveform;

use std::time::{Duration, Instant};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    DefaultTerminal, Frame,
};
use rtrb::{Consumer, Producer};
use tonegraph::{synth::NoteId, SynthMessage};

use super::app::INSTRUMENTS;
use spectrum::{render_spectrum, SpectrumAnalyzer};
use waveform::render_waveform;

/// Audio visualization buffer size
const VIS_BUFFER_SIZE: usize = 1024;

/// Terminals report presses but not releases, so notes are held this long.
const NOTE_LENGTH: Duration = Duration::from_millis(350);

/// Piano row, one semitone per key starting at C.
const PIANO_KEYS: &str = "awsedftgyhujk";

/// Glide time for automation changes, in seconds.
const GLIDE: f32 = 0.05;

fn midi_to_hz(note: i32) -> f32 {
    440.0 * 2f32.powf((note - 69) as f32 / 12.0)
}

pub struct UiApp {
    /// Control messages to the audio thread
    msg_tx: Producer<SynthMessage>,
    /// Ring buffer receiver for audio samples
    audio_rx: Consumer<f32>,
    audio_buffer: Vec<f32>,
    spectrum: SpectrumAnalyzer,
    instrument: usize,
    octave: i32,
    /// Post-FX cutoff in Hz
    tone: f32,
    next_id: NoteId,
    held: Vec<(NoteId, Instant)>,
    dropped: usize,
    should_quit: bool,
}

impl UiApp {
    pub fn new(msg_tx: Producer<SynthMessage>, audio_rx: Consumer<f32>, sample_rate: f32) -> Self {
        Self {
            msg_tx,
            audio_rx,
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            spectrum: SpectrumAnalyzer::new(VIS_BUFFER_SIZE, sample_rate),
            instrument: 0,
            octave: 4,
            tone: 9_000.0,
            next_id: 0,
            held: Vec::new(),
            dropped: 0,
            should_quit: false,
        }
    }

    /// Run the UI event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_audio();
            self.release_expired();

            terminal.draw(|frame| self.render(frame))?;

            // Handle keyboard input (non-blocking, ~60fps)
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        self.send(SynthMessage::AllNotesOff);
        Ok(())
    }

    fn send(&mut self, message: SynthMessage) {
        if self.msg_tx.push(message).is_err() {
            self.dropped += 1;
        }
    }

    fn poll_audio(&mut self) {
        let mut fresh = false;
        while let Ok(sample) = self.audio_rx.pop() {
            self.audio_buffer.push(sample);
            fresh = true;
        }
        if self.audio_buffer.len() > VIS_BUFFER_SIZE {
            let excess = self.audio_buffer.len() - VIS_BUFFER_SIZE;
            self.audio_buffer.drain(0..excess);
        }
        if fresh {
            self.spectrum.update(&self.audio_buffer);
        }
    }

    fn release_expired(&mut self) {
        let now = Instant::now();
        let (expired, held): (Vec<_>, Vec<_>) = self
            .held
            .drain(..)
            .partition(|(_, at)| now.duration_since(*at) >= NOTE_LENGTH);
        self.held = held;
        for (id, _) in expired {
            self.send(SynthMessage::NoteOff { id });
        }
    }

    fn play(&mut self, semitone: usize) {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        let note = 12 * (self.octave + 1) + semitone as i32;
        self.send(SynthMessage::NoteOn {
            id,
            instrument: self.instrument,
            pitch: midi_to_hz(note),
            expression: 1.0,
        });
        self.held.push((id, Instant::now()));
    }

    fn set_tone(&mut self, factor: f32) {
        self.tone = (self.tone * factor).clamp(200.0, 18_000.0);
        self.send(SynthMessage::Automate {
            name: "tone".into(),
            value: self.tone,
            time: GLIDE,
            note: None,
        });
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('z') => self.octave = (self.octave - 1).max(0),
            KeyCode::Char('x') => self.octave = (self.octave + 1).min(8),
            KeyCode::Char('-') => self.set_tone(0.8),
            KeyCode::Char('=') => self.set_tone(1.25),
            KeyCode::Tab => self.instrument = (self.instrument + 1) % INSTRUMENTS.len(),
            KeyCode::Char(' ') => {
                self.held.clear();
                self.send(SynthMessage::AllNotesOff);
            }
            KeyCode::Char(c) => {
                if let Some(semitone) = PIANO_KEYS.find(c) {
                    self.play(semitone);
                }
            }
            _ => {}
        }
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Status
                Constraint::Min(8),    // Waveform
                Constraint::Min(8),    // Spectrum
                Constraint::Length(1), // Help bar
            ])
            .split(frame.area());

        let status = Paragraph::new(format!(
            " {:?}  octave {}  tone {:.0} Hz  notes {}  dropped {}",
            INSTRUMENTS[self.instrument],
            self.octave,
            self.tone,
            self.held.len(),
            self.dropped,
        ))
        .block(Block::default().title(" tonegraph ").borders(Borders::ALL));
        frame.render_widget(status, chunks[0]);

        render_waveform(frame, chunks[1], &self.audio_buffer);
        render_spectrum(frame, chunks[2], self.spectrum.data());

        let help = Paragraph::new(
            " [A-K] Play  [Z/X] Octave  [Tab] Instrument  [-/=] Tone  [Space] Silence  [Q] Quit",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_440() {
        assert_eq!(midi_to_hz(69), 440.0);
        assert!((midi_to_hz(81) - 880.0).abs() < 1e-3);
    }
}
