use crate::{
    graph::node::ProcessCtx,
    runtime::{automation::AutomationError, channels::Channels},
    synth::{
        tone::{Patch, Tone},
        NoteId,
    },
};

/// Per-voice gain for `voices` simultaneous live notes.
///
/// Every four extra voices add one unit of headroom, so a chord gets louder
/// than a single note but not proportionally.
#[inline]
pub fn gain_for_chord(voices: usize) -> f32 {
    1.0 / ((voices as f32 - 1.0) / 4.0 + 1.0)
}

/// Pool of Tones playing one patch.
///
/// Live tones are mixed at the chord gain of the current live count. A
/// released tone moves to the drain list with the gain it had at release and
/// keeps that gain until it reports itself dead.
#[derive(Debug)]
pub struct Instrument {
    name: String,
    patch: Patch,
    /// Sticky channel carrying this instrument's mix.
    channel: usize,
    dt: f32,
    live: Vec<(NoteId, Tone)>,
    draining: Vec<(Tone, f32)>,
}

impl Instrument {
    pub fn new(name: &str, patch: Patch, dt: f32, channels: &mut Channels) -> Self {
        Self {
            name: name.to_string(),
            patch,
            channel: channels.setup(name, true),
            dt,
            live: Vec::new(),
            draining: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn draining_count(&self) -> usize {
        self.draining.len()
    }

    pub fn is_playing(&self, id: NoteId) -> bool {
        self.live.iter().any(|(n, _)| *n == id)
    }

    /// Start note `id`. An id that is already sounding is released first.
    pub fn note_on(&mut self, id: NoteId, pitch: f32, expression: f32) {
        self.note_off(id);
        self.live
            .push((id, Tone::new(&self.patch, self.dt, pitch, expression)));
    }

    /// Release note `id`. Returns false if it was not live.
    pub fn note_off(&mut self, id: NoteId) -> bool {
        let Some(index) = self.live.iter().position(|(n, _)| *n == id) else {
            return false;
        };
        let gain = gain_for_chord(self.live.len());
        let (_, tone) = self.live.swap_remove(index);
        self.draining.push((tone, gain));
        true
    }

    fn tone_mut(&mut self, id: NoteId) -> Option<&mut Tone> {
        self.live
            .iter_mut()
            .find(|(n, _)| *n == id)
            .map(|(_, tone)| tone)
    }

    /// `Ok(false)` when `id` is not live.
    pub fn pitch_bend(&mut self, id: NoteId, pitch: f32, time: f32) -> Result<bool, AutomationError> {
        match self.tone_mut(id) {
            Some(tone) => tone.pitch_bend(pitch, time).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn expression_bend(
        &mut self,
        id: NoteId,
        expression: f32,
        time: f32,
    ) -> Result<bool, AutomationError> {
        match self.tone_mut(id) {
            Some(tone) => tone.expression_bend(expression, time).map(|()| true),
            None => Ok(false),
        }
    }

    /// Automate mod `name` on live note `id`. `Ok(false)` when the note is
    /// not live or has no such mod.
    pub fn automate(
        &mut self,
        id: NoteId,
        name: &str,
        value: f32,
        time: f32,
    ) -> Result<bool, AutomationError> {
        match self.tone_mut(id) {
            Some(tone) => tone.automate(name, value, time),
            None => Ok(false),
        }
    }

    /// Drop every tone, live or draining.
    pub fn clear(&mut self) {
        self.live.clear();
        self.draining.clear();
    }

    /// Mix one sample of every tone and publish it on the instrument's
    /// channel. Dead draining tones are dropped in the same call.
    #[inline]
    pub fn process_sample(&mut self, channels: &mut Channels, ctx: &ProcessCtx) -> [f32; 2] {
        let mut mix = [0.0f32; 2];
        let gain = gain_for_chord(self.live.len());
        for (_, tone) in &mut self.live {
            let [l, r] = tone.process_sample(false, gain, [0.0; 2], channels, ctx);
            mix[0] += l;
            mix[1] += r;
        }

        let mut i = 0;
        while i < self.draining.len() {
            let (tone, gain) = &mut self.draining[i];
            let [l, r] = tone.process_sample(true, *gain, [0.0; 2], channels, ctx);
            mix[0] += l;
            mix[1] += r;
            if tone.is_alive() {
                i += 1;
            } else {
                self.draining.swap_remove(i);
            }
        }

        channels.put_stereo(self.channel, mix);
        mix
    }
}
