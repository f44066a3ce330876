#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    matrix::Matrix,
    synth::{InstrumentId, NoteId},
};

/// Control-plane change, applied between render blocks.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum SynthMessage {
    NoteOn {
        id: NoteId,
        instrument: InstrumentId,
        pitch: f32,
        expression: f32,
    },
    NoteOff {
        id: NoteId,
    },
    PitchBend {
        id: NoteId,
        pitch: f32,
        time: f32,
    },
    ExpressionBend {
        id: NoteId,
        expression: f32,
        time: f32,
    },
    /// Without a note, targets the post-FX chain.
    Automate {
        name: String,
        value: f32,
        time: f32,
        note: Option<NoteId>,
    },
    SetVolume(f32),
    WatchChannel(String),
    UnwatchChannel(String),
    ClearWatchedChannels,
    AllNotesOff,
    Suspend,
    Resume,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

/// Plain queue, for offline rendering and tests.
impl MessageReceiver for std::collections::VecDeque<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        self.pop_front()
    }
}

/// Values of the watched channels at the end of one `process` call.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct WatchReport {
    /// Seconds of audio the call rendered.
    pub dt: f32,
    /// `(channel name, value)` in name order.
    pub values: Vec<(String, Matrix)>,
}

/// Where watch reports go. Called from the render thread.
pub trait WatchSink: Send {
    fn send(&mut self, report: WatchReport);
}

/// Full queue: the report is dropped, the next block sends a fresh one.
#[cfg(feature = "rtrb")]
impl WatchSink for Producer<WatchReport> {
    fn send(&mut self, report: WatchReport) {
        let _ = self.push(report);
    }
}
