//! Audio device setup and the realtime render callback

use std::sync::Arc;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;
use tracing::{info, warn};

use super::{
    patches::{self, PatchName},
    ui::UiApp,
};
use tonegraph::{compile, CompiledGraph, NodeGraph, Synth, SynthConfig, SynthMessage, MAX_BLOCK_SIZE};

/// Control messages in flight from the UI to the audio thread.
const MESSAGE_CAPACITY: usize = 1024;
/// Mono samples in flight from the audio thread to the scopes.
const SCOPE_CAPACITY: usize = 16_384;

/// Instruments loaded at startup, by slot.
pub const INSTRUMENTS: [PatchName; 2] = [PatchName::Lead, PatchName::Bell];

pub struct App {
    volume: f32,
}

impl App {
    pub fn new(volume: f32) -> Self {
        Self { volume }
    }

    /// Take over the terminal and play until the user quits.
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        info!(sample_rate, channels, "audio device opened");

        let mut synth = Synth::new(SynthConfig {
            sample_rate,
            volume: self.volume,
            ..SynthConfig::default()
        });
        synth.set_wave(patches::BELL_WAVE, patches::bell_wave(2048), sample_rate, None);
        for (slot, name) in INSTRUMENTS.into_iter().enumerate() {
            let graph = compile_patch(&synth, &name.graph())?;
            synth.set_instrument(slot, &format!("{name:?}").to_lowercase(), graph)?;
        }
        synth.set_post_fx(compile_patch(&synth, &PatchName::Master.graph())?)?;

        let (msg_tx, mut msg_rx) = RingBuffer::<SynthMessage>::new(MESSAGE_CAPACITY);
        let (mut scope_tx, scope_rx) = RingBuffer::<f32>::new(SCOPE_CAPACITY);

        let mut left = vec![0.0f32; MAX_BLOCK_SIZE];
        let mut right = vec![0.0f32; MAX_BLOCK_SIZE];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                    let (l, r) = (&mut left[..frames], &mut right[..frames]);
                    synth.process_with(&mut msg_rx, l, r);

                    let out_off = frames_written * channels;
                    for (i, (&ls, &rs)) in l.iter().zip(r.iter()).enumerate() {
                        let frame = &mut data[out_off + i * channels..out_off + (i + 1) * channels];
                        match frame {
                            [mono] => *mono = 0.5 * (ls + rs),
                            [fl, fr, rest @ ..] => {
                                *fl = ls;
                                *fr = rs;
                                rest.fill(0.0);
                            }
                            [] => {}
                        }
                        // Scope is best effort; drop samples when the UI lags.
                        let _ = scope_tx.push(0.5 * (ls + rs));
                    }

                    frames_written += frames;
                }
            },
            |err| warn!("audio stream error: {err}"),
            None,
        )?;

        stream.play()?;

        let mut terminal = ratatui::init();
        let result = UiApp::new(msg_tx, scope_rx, sample_rate).run(&mut terminal);
        ratatui::restore();
        result
    }
}

fn compile_patch(synth: &Synth, graph: &NodeGraph) -> EyreResult<Arc<CompiledGraph>> {
    let (compiled, diagnostics) = compile(graph, synth.registry())?;
    for d in &diagnostics {
        warn!("{d}");
    }
    Ok(Arc::new(compiled))
}
