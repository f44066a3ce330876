//! tonegraph - compile node graphs and play them from the terminal
//!
//! Run with: cargo run -- play

mod app;
mod patches;
mod ui;

use std::collections::VecDeque;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result as EyreResult;
use tracing_subscriber::EnvFilter;

use app::App;
use patches::PatchName;
use tonegraph::{compile, nodes::builtin_registry, Synth, SynthConfig, SynthMessage};

#[derive(Debug, Parser)]
#[command(name = "tonegraph", version, about = "Node-graph synthesizer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the audio device and play the demo instruments from the keyboard
    Play {
        #[arg(long, default_value_t = 0.8)]
        volume: f32,
    },
    /// Compile a demo patch and print its bytecode
    Dump {
        #[arg(value_enum, default_value_t = PatchName::Lead)]
        patch: PatchName,
    },
    /// Render a chord offline and print level statistics
    Render {
        #[arg(value_enum, default_value_t = PatchName::Lead)]
        patch: PatchName,
        #[arg(long, default_value_t = 1.0)]
        seconds: f32,
        #[arg(long, default_value_t = 48_000.0)]
        sample_rate: f32,
    },
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Play { volume: 0.8 });

    // The TUI owns the terminal while playing, so stay quiet unless asked.
    let default_filter = match command {
        Command::Play { .. } => "off",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match command {
        Command::Play { volume } => App::new(volume).run(),
        Command::Dump { patch } => dump(patch),
        Command::Render {
            patch,
            seconds,
            sample_rate,
        } => render(patch, seconds, sample_rate),
    }
}

fn dump(patch: PatchName) -> EyreResult<()> {
    let registry = builtin_registry();
    let (compiled, diagnostics) = compile(&patch.graph(), &registry)?;

    println!("=== {patch:?} ===");
    println!("max stack: {}", compiled.max_stack);
    println!();
    println!("program:");
    for (pc, command) in compiled.program.commands().iter().enumerate() {
        println!("  {pc:>3}  {command}");
    }
    println!();
    println!("constants:");
    for (k, constant) in compiled.constants.iter().enumerate() {
        println!("  {k:>3}  {constant}");
    }
    if !compiled.registers.is_empty() {
        println!();
        println!("registers:");
        for (r, register) in compiled.registers.iter().enumerate() {
            println!("  {r:>3}  {}x{}", register.rows(), register.cols());
        }
    }
    println!();
    println!("nodes:");
    for (n, node) in compiled.nodes.iter().enumerate() {
        println!("  {n:>3}  {} {:?}", node.processor, node.dims);
    }
    if !diagnostics.is_empty() {
        println!();
        println!("diagnostics:");
        for d in &diagnostics {
            println!("  {d}");
        }
    }
    Ok(())
}

fn render(patch: PatchName, seconds: f32, sample_rate: f32) -> EyreResult<()> {
    let registry = builtin_registry();
    let mut synth = Synth::new(SynthConfig {
        sample_rate,
        ..SynthConfig::default()
    });
    synth.set_wave(patches::BELL_WAVE, patches::bell_wave(2048), sample_rate, None);
    let (compiled, _) = compile(&patch.graph(), &registry)?;
    synth.set_instrument(0, &format!("{patch:?}").to_lowercase(), compiled.into())?;

    // C major triad, released halfway through.
    let mut queue: VecDeque<SynthMessage> = [261.63, 329.63, 392.0]
        .into_iter()
        .enumerate()
        .map(|(id, pitch)| SynthMessage::NoteOn {
            id: id as u32,
            instrument: 0,
            pitch,
            expression: 1.0,
        })
        .collect();

    let total = (seconds.max(0.0) * sample_rate) as usize;
    let mut left = vec![0.0f32; total];
    let mut right = vec![0.0f32; total];
    let half = total / 2;
    synth.process_with(&mut queue, &mut left[..half], &mut right[..half]);
    queue.push_back(SynthMessage::AllNotesOff);
    synth.process_with(&mut queue, &mut left[half..], &mut right[half..]);

    let peak = left
        .iter()
        .chain(&right)
        .fold(0.0f32, |acc, s| acc.max(s.abs()));
    let rms = if total == 0 {
        0.0
    } else {
        (left.iter().chain(&right).map(|s| s * s).sum::<f32>() / (2 * total) as f32).sqrt()
    };
    let sounding = synth.instrument(0).map_or(0, |i| i.live_count() + i.draining_count());

    println!("=== {patch:?}: {total} samples at {sample_rate} Hz ===");
    println!("peak:     {peak:.4}");
    println!("rms:      {rms:.4}");
    println!("sounding: {sounding} tones at end");
    Ok(())
}
