// Purpose: Voice management, polyphony, control messages
// This layer sits above the VM: Tones run compiled graphs, Instruments pool
// them, the Synth mixes instruments through the post-FX chain.

pub mod engine;
pub mod instrument;
pub mod message;
pub mod tone;

use std::fmt;

use crate::runtime::automation::AutomationError;

pub use engine::{Synth, SynthConfig};
pub use instrument::{gain_for_chord, Instrument};
pub use message::{MessageReceiver, SynthMessage, WatchReport, WatchSink};
pub use tone::{Patch, Tone};

/// Host-assigned note identifier.
pub type NoteId = u32;

/// Instrument slot number.
pub type InstrumentId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum SynthError {
    UnknownInstrument(InstrumentId),
    UnknownNote(NoteId),
    /// A compiled graph names a processor the synth's registry lacks.
    UnknownProcessor(String),
    Automation(AutomationError),
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthError::UnknownInstrument(i) => write!(f, "no instrument in slot {i}"),
            SynthError::UnknownNote(id) => write!(f, "note {id} is not playing"),
            SynthError::UnknownProcessor(name) => write!(f, "unknown processor '{name}'"),
            SynthError::Automation(e) => write!(f, "automation rejected: {e}"),
        }
    }
}

impl std::error::Error for SynthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SynthError::Automation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AutomationError> for SynthError {
    fn from(e: AutomationError) -> Self {
        SynthError::Automation(e)
    }
}
