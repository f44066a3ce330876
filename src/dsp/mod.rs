//! Low-level DSP primitives used by the built-in processors.
//!
//! These components are allocation-free and realtime-safe, so a processor can
//! embed them directly in its per-voice state. They stay focused on the signal
//! math; reading arguments off the graph wires is the processor's job.

/// Gate-driven attack/decay/sustain/release envelope generator.
pub mod envelope;
/// State-variable filter with multiple responses.
pub mod filter;
/// Phase accumulator and basic waveforms.
pub mod oscillator;

pub use envelope::{AdsrParams, Envelope, EnvelopeState};
pub use filter::{FilterType, SvFilter, SvfCoefficients};
pub use oscillator::{Phase, Waveform};
