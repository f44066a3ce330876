use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    compiler::{CompiledGraph, ProcessorRegistry},
    graph::node::ProcessCtx,
    nodes::builtin_registry,
    runtime::{channels::Channels, wave::WaveBank},
    synth::{
        instrument::Instrument,
        message::{MessageReceiver, SynthMessage, WatchReport, WatchSink},
        tone::{Patch, Tone},
        InstrumentId, NoteId, SynthError,
    },
    MAX_BLOCK_SIZE,
};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthConfig {
    pub sample_rate: f32,
    /// Master gain applied after the post-FX chain.
    pub volume: f32,
    /// Longest run of samples treated as one control block.
    pub max_block_size: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            volume: 0.8,
            max_block_size: MAX_BLOCK_SIZE,
        }
    }
}

/*
Signal flow, per sample:

    channels.update()                     non-sticky channels -> 0
    for each instrument:
        mix its tones                     -> channel "<instrument name>"
    sum of instrument mixes               -> post-FX InputSamples
    post-FX output * volume               -> left[i], right[i]

After the last sample of a `process` call, if any channel is watched and a
sink is installed, the sink gets the call's duration and every watched
channel's value.

Control changes (notes, bends, automation) land between blocks only:
either called directly between `process` calls, or queued and drained by
`process_with`.
*/

pub struct Synth {
    config: SynthConfig,
    dt: f32,
    registry: ProcessorRegistry,
    instruments: Vec<Option<Instrument>>,
    /// Which instrument each sounding note belongs to.
    notes: HashMap<NoteId, InstrumentId>,
    post_fx: Tone,
    channels: Channels,
    waves: WaveBank,
    /// Watched channel names and their resolved ids.
    watched: BTreeMap<String, usize>,
    watch_sink: Option<Box<dyn WatchSink>>,
    suspended: bool,
}

impl Synth {
    /// Synth using the built-in processor library.
    pub fn new(config: SynthConfig) -> Self {
        Self::with_registry(config, builtin_registry())
    }

    pub fn with_registry(config: SynthConfig, registry: ProcessorRegistry) -> Self {
        let dt = 1.0 / config.sample_rate;
        Self {
            config,
            dt,
            registry,
            instruments: Vec::new(),
            notes: HashMap::new(),
            post_fx: passthrough(dt),
            channels: Channels::new(),
            waves: WaveBank::new(),
            watched: BTreeMap::new(),
            watch_sink: None,
            suspended: false,
        }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    pub fn channels(&self) -> &Channels {
        &self.channels
    }

    pub fn waves(&self) -> &WaveBank {
        &self.waves
    }

    pub fn instrument(&self, slot: InstrumentId) -> Option<&Instrument> {
        self.instruments.get(slot).and_then(Option::as_ref)
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn patch(&mut self, graph: Arc<CompiledGraph>) -> Result<Patch, SynthError> {
        Patch::new(graph, &self.registry, &mut self.channels, &mut self.waves)
    }

    /// Install `graph` as instrument `slot`, replacing whatever was there.
    /// Its mix is published on a sticky channel called `name`.
    pub fn set_instrument(
        &mut self,
        slot: InstrumentId,
        name: &str,
        graph: Arc<CompiledGraph>,
    ) -> Result<(), SynthError> {
        let patch = self.patch(graph)?;
        if self.instruments.len() <= slot {
            self.instruments.resize_with(slot + 1, || None);
        }
        self.notes.retain(|_, owner| *owner != slot);
        self.instruments[slot] = Some(Instrument::new(name, patch, self.dt, &mut self.channels));
        info!(slot, name, "instrument set");
        Ok(())
    }

    pub fn clear_instrument(&mut self, slot: InstrumentId) {
        if let Some(inst) = self.instruments.get_mut(slot) {
            *inst = None;
            self.notes.retain(|_, owner| *owner != slot);
            debug!(slot, "instrument cleared");
        }
    }

    pub fn clear_instruments(&mut self) {
        self.instruments.clear();
        self.notes.clear();
    }

    pub fn set_post_fx(&mut self, graph: Arc<CompiledGraph>) -> Result<(), SynthError> {
        let patch = self.patch(graph)?;
        self.post_fx = Tone::new(&patch, self.dt, 1.0, 1.0);
        info!("post-fx set");
        Ok(())
    }

    /// Back to the passthrough chain.
    pub fn clear_post_fx(&mut self) {
        self.post_fx = passthrough(self.dt);
    }

    /// Drop every instrument, tone, channel value, wave and watch.
    pub fn clear_all(&mut self) {
        self.clear_instruments();
        self.clear_post_fx();
        self.clear_watched_channels();
        self.channels.clear();
        self.waves.clear();
        info!("synth cleared");
    }

    /// Load a wavetable. `base_pitch` defaults to one table per cycle.
    pub fn set_wave(&mut self, name: &str, samples: Vec<f32>, sample_rate: f32, base_pitch: Option<f32>) {
        let len = samples.len();
        let number = self.waves.set(name, samples, sample_rate, base_pitch);
        debug!(name, number, len, "wave loaded");
    }

    pub fn setup_channel(&mut self, name: &str, sticky: bool) {
        self.channels.setup(name, sticky);
    }

    /// Report `name` after every `process` call. Creates the channel if
    /// nothing has declared it yet.
    pub fn watch_channel(&mut self, name: &str) {
        let id = self.channels.resolve(name);
        self.watched.insert(name.to_string(), id);
    }

    pub fn unwatch_channel(&mut self, name: &str) {
        self.watched.remove(name);
    }

    pub fn clear_watched_channels(&mut self) {
        self.watched.clear();
    }

    pub fn watched_channels(&self) -> impl Iterator<Item = &str> {
        self.watched.keys().map(String::as_str)
    }

    /// Destination for watch reports, replacing any previous one.
    pub fn set_watch_sink(&mut self, sink: impl WatchSink + 'static) {
        self.watch_sink = Some(Box::new(sink));
    }

    /// Current values of the watched channels, as reported after a call
    /// that rendered `samples` samples.
    pub fn watch_report(&self, samples: usize) -> WatchReport {
        WatchReport {
            dt: self.dt * samples as f32,
            values: self
                .watched
                .iter()
                .map(|(name, &id)| (name.clone(), self.channels.get(id).clone()))
                .collect(),
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.config.volume = volume;
    }

    /// Output silence until `resume`. Tones are kept but not advanced.
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn resume(&mut self) {
        self.suspended = false;
    }

    pub fn note_on(
        &mut self,
        id: NoteId,
        slot: InstrumentId,
        pitch: f32,
        expression: f32,
    ) -> Result<(), SynthError> {
        // The id is released wherever it was sounding, even if the new
        // target does not exist.
        if let Some(previous) = self.notes.remove(&id) {
            if let Some(inst) = self.instruments[previous].as_mut() {
                inst.note_off(id);
            }
        }
        let inst = self
            .instruments
            .get_mut(slot)
            .and_then(Option::as_mut)
            .ok_or(SynthError::UnknownInstrument(slot))?;
        inst.note_on(id, pitch, expression);
        self.notes.insert(id, slot);
        Ok(())
    }

    pub fn note_off(&mut self, id: NoteId) -> Result<(), SynthError> {
        let slot = self.notes.remove(&id).ok_or(SynthError::UnknownNote(id))?;
        if let Some(inst) = self.instruments[slot].as_mut() {
            inst.note_off(id);
        }
        Ok(())
    }

    pub fn all_notes_off(&mut self) {
        for (id, slot) in self.notes.drain() {
            if let Some(inst) = self.instruments[slot].as_mut() {
                inst.note_off(id);
            }
        }
    }

    fn owner(&mut self, id: NoteId) -> Result<&mut Instrument, SynthError> {
        let slot = *self.notes.get(&id).ok_or(SynthError::UnknownNote(id))?;
        self.instruments[slot]
            .as_mut()
            .ok_or(SynthError::UnknownInstrument(slot))
    }

    pub fn pitch_bend(&mut self, id: NoteId, pitch: f32, time: f32) -> Result<(), SynthError> {
        self.owner(id)?.pitch_bend(id, pitch, time)?;
        Ok(())
    }

    pub fn expression_bend(&mut self, id: NoteId, expression: f32, time: f32) -> Result<(), SynthError> {
        self.owner(id)?.expression_bend(id, expression, time)?;
        Ok(())
    }

    /// Glide mod `name`. With a note, on that voice; without, on the
    /// post-FX chain. Unknown mod names are ignored.
    pub fn automate(
        &mut self,
        name: &str,
        value: f32,
        time: f32,
        note: Option<NoteId>,
    ) -> Result<(), SynthError> {
        let found = match note {
            Some(id) => self.owner(id)?.automate(id, name, value, time)?,
            None => self.post_fx.automate(name, value, time)?,
        };
        if !found {
            debug!(name, ?note, "automation target has no such mod");
        }
        Ok(())
    }

    /// Apply one queued change. Failures are logged and dropped.
    pub fn apply(&mut self, message: SynthMessage) {
        let result = match message {
            SynthMessage::NoteOn {
                id,
                instrument,
                pitch,
                expression,
            } => self.note_on(id, instrument, pitch, expression),
            SynthMessage::NoteOff { id } => self.note_off(id),
            SynthMessage::PitchBend { id, pitch, time } => self.pitch_bend(id, pitch, time),
            SynthMessage::ExpressionBend {
                id,
                expression,
                time,
            } => self.expression_bend(id, expression, time),
            SynthMessage::Automate {
                name,
                value,
                time,
                note,
            } => self.automate(&name, value, time, note),
            SynthMessage::SetVolume(volume) => {
                self.set_volume(volume);
                Ok(())
            }
            SynthMessage::WatchChannel(name) => {
                self.watch_channel(&name);
                Ok(())
            }
            SynthMessage::UnwatchChannel(name) => {
                self.unwatch_channel(&name);
                Ok(())
            }
            SynthMessage::ClearWatchedChannels => {
                self.clear_watched_channels();
                Ok(())
            }
            SynthMessage::AllNotesOff => {
                self.all_notes_off();
                Ok(())
            }
            SynthMessage::Suspend => {
                self.suspend();
                Ok(())
            }
            SynthMessage::Resume => {
                self.resume();
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!("dropped control message: {e}");
        }
    }

    /// Drain `rx`, then render.
    pub fn process_with<R: MessageReceiver>(&mut self, rx: &mut R, left: &mut [f32], right: &mut [f32]) {
        while let Some(message) = rx.pop() {
            self.apply(message);
        }
        self.process(left, right);
    }

    /// Render `left.len()` samples into both buffers.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        if self.suspended {
            left.fill(0.0);
            right.fill(0.0);
            return;
        }
        let block = self.config.max_block_size.max(1);
        for (l, r) in left.chunks_mut(block).zip(right.chunks_mut(block)) {
            self.process_block(l, r);
        }
        if !self.watched.is_empty() && self.watch_sink.is_some() {
            let report = self.watch_report(left.len());
            if let Some(sink) = self.watch_sink.as_mut() {
                sink.send(report);
            }
        }
    }

    fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let len = left.len();
        let volume = self.config.volume;
        let mut ctx = ProcessCtx::new(self.dt, &self.waves);

        for (i, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            ctx.start_of_block = i == 0;
            ctx.block_progress = i as f32 / len as f32;

            self.channels.update();
            let mut mix = [0.0f32; 2];
            for inst in self.instruments.iter_mut().flatten() {
                let [il, ir] = inst.process_sample(&mut self.channels, &ctx);
                mix[0] += il;
                mix[1] += ir;
            }
            let [ol, or] = self
                .post_fx
                .process_sample(false, volume, mix, &mut self.channels, &ctx);
            *l = ol;
            *r = or;
        }
    }
}

fn passthrough(dt: f32) -> Tone {
    let graph = Arc::new(CompiledGraph::passthrough());
    let patch = match Patch::new(graph, &ProcessorRegistry::new(), &mut Channels::new(), &mut WaveBank::new()) {
        Ok(patch) => patch,
        Err(e) => unreachable!("passthrough graph has no processors: {e}"),
    };
    Tone::new(&patch, dt, 1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use crate::{
        compiler::compile,
        graph::{GraphNode, ModDef, NodeGraph, NodeInput, NodeKind},
        runtime::automation::AutomationMode,
    };

    fn compiled(graph: NodeGraph) -> Arc<CompiledGraph> {
        let (compiled, diags) = compile(&graph, &builtin_registry()).unwrap();
        assert!(diags.is_empty(), "{diags:?}");
        Arc::new(compiled)
    }

    fn dc(level: f32) -> Arc<CompiledGraph> {
        compiled(NodeGraph::new(
            vec![GraphNode::processor(
                "add",
                vec![NodeInput::Constant(level), NodeInput::Constant(0.0)],
            )],
            0,
        ))
    }

    fn render(synth: &mut Synth, n: usize) -> (Vec<f32>, Vec<f32>) {
        let mut left = vec![0.0; n];
        let mut right = vec![0.0; n];
        synth.process(&mut left, &mut right);
        (left, right)
    }

    fn config() -> SynthConfig {
        SynthConfig {
            volume: 1.0,
            ..SynthConfig::default()
        }
    }

    #[test]
    fn silent_without_notes() {
        let mut synth = Synth::new(SynthConfig::default());
        synth.set_instrument(0, "lead", dc(0.5)).unwrap();
        let (left, right) = render(&mut synth, 64);
        assert!(left.iter().chain(&right).all(|&s| s == 0.0));
    }

    #[test]
    fn volume_scales_output() {
        let mut synth = Synth::new(SynthConfig::default());
        synth.set_instrument(0, "lead", dc(0.5)).unwrap();
        synth.note_on(1, 0, 440.0, 1.0).unwrap();
        let (left, _) = render(&mut synth, 4);
        assert_eq!(left, vec![0.4; 4]);
    }

    #[test]
    fn post_fx_reads_instrument_channel() {
        let mut synth = Synth::new(config());
        synth.set_instrument(0, "lead", dc(0.5)).unwrap();
        // doubles the lead channel, ignores InputSamples
        let fx = compiled(NodeGraph::new(
            vec![GraphNode::processor(
                "mul",
                vec![NodeInput::Channel("lead".into()), NodeInput::Constant(2.0)],
            )],
            0,
        ));
        synth.set_post_fx(fx).unwrap();
        synth.note_on(1, 0, 440.0, 1.0).unwrap();
        let (left, right) = render(&mut synth, 2);
        assert_eq!(left, vec![1.0, 1.0]);
        assert_eq!(right, vec![1.0, 1.0]);

        synth.clear_post_fx();
        let (left, _) = render(&mut synth, 1);
        assert_eq!(left, vec![0.5]);
    }

    #[test]
    fn automate_without_note_targets_post_fx() {
        let mut synth = Synth::new(config());
        let fx = compiled(
            NodeGraph::new(
                vec![GraphNode::processor(
                    "add",
                    vec![NodeInput::InputSamples, NodeInput::Mod("offset".into())],
                )],
                0,
            )
            .with_mod(ModDef::new("offset", 0.0, AutomationMode::Linear)),
        );
        synth.set_post_fx(fx).unwrap();
        synth.automate("offset", 0.25, 0.0, None).unwrap();
        let (left, right) = render(&mut synth, 1);
        assert_eq!((left[0], right[0]), (0.25, 0.25));
    }

    #[test]
    fn unknown_targets_are_errors() {
        let mut synth = Synth::new(config());
        assert_eq!(
            synth.note_on(1, 3, 440.0, 1.0),
            Err(SynthError::UnknownInstrument(3))
        );
        assert_eq!(synth.note_off(9), Err(SynthError::UnknownNote(9)));
        assert_eq!(
            synth.pitch_bend(9, 100.0, 0.1),
            Err(SynthError::UnknownNote(9))
        );
    }

    #[test]
    fn retrigger_onto_missing_instrument_releases_the_old_note() {
        let mut synth = Synth::new(config());
        synth.set_instrument(0, "lead", dc(0.5)).unwrap();
        synth.note_on(1, 0, 440.0, 1.0).unwrap();
        assert_eq!(
            synth.note_on(1, 5, 440.0, 1.0),
            Err(SynthError::UnknownInstrument(5))
        );
        let lead = synth.instrument(0).unwrap();
        assert!(!lead.is_playing(1));
        assert_eq!(lead.live_count(), 0);
        assert_eq!(lead.draining_count(), 1);
        assert_eq!(synth.note_off(1), Err(SynthError::UnknownNote(1)));
    }

    #[derive(Clone, Default)]
    struct Collect(Arc<std::sync::Mutex<Vec<WatchReport>>>);

    impl WatchSink for Collect {
        fn send(&mut self, report: WatchReport) {
            self.0.lock().unwrap().push(report);
        }
    }

    #[test]
    fn watched_channels_are_reported_after_process() {
        let mut synth = Synth::new(config());
        let reports = Collect::default();
        synth.set_watch_sink(reports.clone());
        synth.setup_channel("level", true);

        // nothing watched, nothing sent
        render(&mut synth, 4);
        assert!(reports.0.lock().unwrap().is_empty());

        synth.watch_channel("level");
        synth.watch_channel("level");
        render(&mut synth, 4);
        {
            let sent = reports.0.lock().unwrap();
            assert_eq!(sent.len(), 1);
            assert!((sent[0].dt - 4.0 / config().sample_rate).abs() < 1e-9);
            assert_eq!(sent[0].values.len(), 1);
            assert_eq!(sent[0].values[0].0, "level");
        }

        synth.suspend();
        render(&mut synth, 4);
        synth.resume();
        assert_eq!(reports.0.lock().unwrap().len(), 1);

        synth.apply(SynthMessage::UnwatchChannel("level".into()));
        render(&mut synth, 4);
        assert_eq!(reports.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn clear_all_forgets_watches() {
        let mut synth = Synth::new(config());
        synth.apply(SynthMessage::WatchChannel("a".into()));
        synth.watch_channel("b");
        assert_eq!(synth.watched_channels().collect::<Vec<_>>(), ["a", "b"]);
        synth.clear_all();
        assert_eq!(synth.watched_channels().count(), 0);
    }

    #[test]
    fn unknown_processor_is_rejected_at_setup() {
        let mut synth = Synth::with_registry(config(), ProcessorRegistry::new());
        assert_eq!(
            synth.set_instrument(0, "lead", dc(1.0)),
            Err(SynthError::UnknownProcessor("add".into()))
        );
    }

    #[test]
    fn queued_messages_land_before_the_block() {
        let mut synth = Synth::new(config());
        synth.set_instrument(0, "lead", dc(0.5)).unwrap();
        let mut queue = VecDeque::from([
            SynthMessage::NoteOn {
                id: 1,
                instrument: 0,
                pitch: 440.0,
                expression: 1.0,
            },
            SynthMessage::SetVolume(0.5),
        ]);
        let mut left = [0.0; 2];
        let mut right = [0.0; 2];
        synth.process_with(&mut queue, &mut left, &mut right);
        assert!(queue.is_empty());
        assert_eq!(left, [0.25, 0.25]);
    }

    #[test]
    fn suspend_outputs_silence() {
        let mut synth = Synth::new(config());
        synth.set_instrument(0, "lead", dc(0.5)).unwrap();
        synth.note_on(1, 0, 440.0, 1.0).unwrap();
        synth.suspend();
        assert_eq!(render(&mut synth, 3).0, vec![0.0; 3]);
        synth.resume();
        assert_eq!(render(&mut synth, 1).0, vec![0.5]);
    }

    #[test]
    fn channel_written_by_voice_is_visible_to_post_fx() {
        let mut synth = Synth::new(config());
        synth.setup_channel("send", false);
        let voice = compiled(NodeGraph::new(
            vec![
                GraphNode::processor("add", vec![NodeInput::Constant(0.0), NodeInput::Constant(0.0)]),
                GraphNode::intrinsic(
                    NodeKind::SaveToChannel("send".into()),
                    vec![NodeInput::Constant(0.75), NodeInput::Constant(1.0)],
                ),
            ],
            0,
        ));
        let fx = compiled(NodeGraph::new(
            vec![GraphNode::processor(
                "add",
                vec![NodeInput::Channel("send".into()), NodeInput::Constant(0.0)],
            )],
            0,
        ));
        synth.set_instrument(0, "lead", voice).unwrap();
        synth.set_post_fx(fx).unwrap();
        synth.note_on(1, 0, 440.0, 1.0).unwrap();
        assert_eq!(render(&mut synth, 2).0, vec![0.75, 0.75]);
    }
}
