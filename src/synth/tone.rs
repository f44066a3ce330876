use std::{fmt, sync::Arc};

use crate::{
    compiler::{CompiledGraph, ProcessorFactory, ProcessorRegistry},
    graph::node::{AudioProcessor, ProcessCtx},
    runtime::{
        automation::{AutomatedValue, AutomationError, AutomationMode},
        channels::Channels,
        vm::{Frame, ProgramState},
        wave::WaveBank,
    },
    synth::SynthError,
};

/// A compiled graph bound to one synth: processor factories, channel ids and
/// wave numbers are resolved here once, so starting a note is just
/// allocation.
#[derive(Clone)]
pub struct Patch {
    graph: Arc<CompiledGraph>,
    factories: Vec<Arc<dyn ProcessorFactory>>,
    /// For each `GetMod` slot, the index of the declared mod, if any.
    mod_slots: Vec<Option<usize>>,
    channel_ids: Vec<usize>,
    wave_numbers: Vec<f32>,
}

impl Patch {
    pub fn new(
        graph: Arc<CompiledGraph>,
        registry: &ProcessorRegistry,
        channels: &mut Channels,
        waves: &mut WaveBank,
    ) -> Result<Self, SynthError> {
        let factories = graph
            .nodes
            .iter()
            .map(|inst| {
                registry
                    .get(&inst.processor)
                    .map(|def| Arc::clone(&def.factory))
                    .ok_or_else(|| SynthError::UnknownProcessor(inst.processor.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mod_slots = graph
            .mod_refs
            .iter()
            .map(|name| graph.mods.iter().position(|m| &m.name == name))
            .collect();
        let channel_ids = graph.channel_refs.iter().map(|n| channels.resolve(n)).collect();
        let wave_numbers = graph.wave_refs.iter().map(|n| waves.slot(n) as f32).collect();
        Ok(Self {
            graph,
            factories,
            mod_slots,
            channel_ids,
            wave_numbers,
        })
    }

    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }
}

impl fmt::Debug for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Patch")
            .field("commands", &self.graph.program.len())
            .field("nodes", &self.graph.nodes.len())
            .field("channel_ids", &self.channel_ids)
            .field("wave_numbers", &self.wave_numbers)
            .finish_non_exhaustive()
    }
}

/// One sounding instance of a [`Patch`]: a note, or the post-FX chain.
///
/// Registers and processor state are private to the Tone.
pub struct Tone {
    patch: Patch,
    state: ProgramState,
    processors: Vec<Box<dyn AudioProcessor>>,
    pitch: AutomatedValue,
    expression: AutomatedValue,
    mods: Vec<AutomatedValue>,
    /// Per `GetMod` slot, refreshed every sample.
    mod_values: Vec<f32>,
    dt: f32,
    alive: bool,
}

impl Tone {
    pub fn new(patch: &Patch, dt: f32, pitch: f32, expression: f32) -> Self {
        let graph = &patch.graph;
        let processors = graph
            .nodes
            .iter()
            .zip(&patch.factories)
            .map(|(inst, factory)| factory.make(&inst.dims, dt))
            .collect();
        Self {
            patch: patch.clone(),
            state: ProgramState::new(graph),
            processors,
            pitch: AutomatedValue::new(pitch, AutomationMode::Exponential),
            expression: AutomatedValue::new(expression, AutomationMode::Exponential),
            mods: graph
                .mods
                .iter()
                .map(|m| AutomatedValue::new(m.initial, m.mode))
                .collect(),
            mod_values: vec![0.0; patch.mod_slots.len()],
            dt,
            alive: true,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn pitch(&self) -> f32 {
        self.pitch.value()
    }

    pub fn expression(&self) -> f32 {
        self.expression.value()
    }

    /// Current value of the declared mod `name`.
    pub fn mod_value(&self, name: &str) -> Option<f32> {
        let i = self.patch.graph.mods.iter().position(|m| m.name == name)?;
        Some(self.mods[i].value())
    }

    pub fn pitch_bend(&mut self, pitch: f32, time: f32) -> Result<(), AutomationError> {
        self.pitch.goto(pitch, self.dt, time)
    }

    pub fn expression_bend(&mut self, expression: f32, time: f32) -> Result<(), AutomationError> {
        self.expression.goto(expression, self.dt, time)
    }

    /// Glide mod `name` to `value` (clamped to its range) over `time`
    /// seconds. Returns `Ok(false)` if the graph declares no such mod.
    pub fn automate(&mut self, name: &str, value: f32, time: f32) -> Result<bool, AutomationError> {
        let Some(i) = self.patch.graph.mods.iter().position(|m| m.name == name) else {
            return Ok(false);
        };
        let (min, max) = self.patch.graph.mods[i].range;
        self.mods[i].goto(value.clamp(min, max), self.dt, time)?;
        Ok(true)
    }

    /// Render one sample and return it scaled by `gain`.
    ///
    /// A released Tone runs with the gate low and enters the program with
    /// alive = false; only a `MarkAlive` node reporting a non-zero value
    /// keeps it going. Once dead it stays dead.
    #[inline]
    pub fn process_sample(
        &mut self,
        released: bool,
        gain: f32,
        input: [f32; 2],
        channels: &mut Channels,
        ctx: &ProcessCtx,
    ) -> [f32; 2] {
        let dt = self.dt;
        for m in &mut self.mods {
            m.update(dt);
        }
        for (value, slot) in self.mod_values.iter_mut().zip(&self.patch.mod_slots) {
            *value = slot.map_or(0.0, |i| self.mods[i].value());
        }
        let pitch = self.pitch.update(dt);
        let expression = self.expression.update(dt);

        let frame = Frame {
            pitch,
            expression,
            gate: if released { 0.0 } else { 1.0 },
            input,
            mods: &self.mod_values,
            channels: &self.patch.channel_ids,
            waves: &self.patch.wave_numbers,
        };
        let reported = self.state.run(
            &self.patch.graph,
            &mut self.processors,
            &frame,
            channels,
            ctx,
            self.alive && !released,
        );
        self.alive = self.alive && reported;

        let [l, r] = self.state.output().as_stereo();
        [l * gain, r * gain]
    }
}

impl fmt::Debug for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tone")
            .field("pitch", &self.pitch.value())
            .field("expression", &self.expression.value())
            .field("alive", &self.alive)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::compile,
        graph::{GraphNode, ModDef, NodeGraph, NodeInput, NodeKind},
        nodes::builtin_registry,
    };

    const DT: f32 = 1.0 / 48_000.0;

    fn patch(graph: NodeGraph) -> (Patch, Channels, WaveBank) {
        let registry = builtin_registry();
        let (compiled, _) = compile(&graph, &registry).unwrap();
        let mut channels = Channels::new();
        let mut waves = WaveBank::new();
        let patch = Patch::new(Arc::new(compiled), &registry, &mut channels, &mut waves).unwrap();
        (patch, channels, waves)
    }

    #[test]
    fn constant_output_is_scaled_by_gain() {
        let graph = NodeGraph::new(
            vec![GraphNode::processor(
                "add",
                vec![NodeInput::Constant(0.25), NodeInput::Constant(0.0)],
            )],
            0,
        );
        let (patch, mut channels, waves) = patch(graph);
        let mut tone = Tone::new(&patch, DT, 440.0, 1.0);
        let ctx = ProcessCtx::new(DT, &waves);
        assert_eq!(
            tone.process_sample(false, 2.0, [0.0; 2], &mut channels, &ctx),
            [0.5, 0.5]
        );
    }

    #[test]
    fn released_tone_without_mark_alive_dies_at_once() {
        let graph = NodeGraph::new(vec![GraphNode::processor("sine", vec![NodeInput::Pitch])], 0);
        let (patch, mut channels, waves) = patch(graph);
        let mut tone = Tone::new(&patch, DT, 440.0, 1.0);
        let ctx = ProcessCtx::new(DT, &waves);
        tone.process_sample(false, 1.0, [0.0; 2], &mut channels, &ctx);
        assert!(tone.is_alive());
        tone.process_sample(true, 1.0, [0.0; 2], &mut channels, &ctx);
        assert!(!tone.is_alive());
    }

    #[test]
    fn mark_alive_keeps_released_tone_until_it_reports_zero() {
        // alive while expression > 0
        let graph = NodeGraph::new(
            vec![GraphNode::intrinsic(NodeKind::MarkAlive, vec![NodeInput::Expression])],
            0,
        );
        let (patch, mut channels, waves) = patch(graph);
        let mut tone = Tone::new(&patch, DT, 440.0, 1.0);
        let ctx = ProcessCtx::new(DT, &waves);
        tone.process_sample(true, 1.0, [0.0; 2], &mut channels, &ctx);
        assert!(tone.is_alive());

        let mut linear = AutomatedValue::new(1.0, AutomationMode::Linear);
        linear.goto(0.0, DT, 0.0).unwrap();
        tone.expression = linear;
        tone.process_sample(true, 1.0, [0.0; 2], &mut channels, &ctx);
        assert!(!tone.is_alive());

        tone.expression = AutomatedValue::new(1.0, AutomationMode::Linear);
        tone.process_sample(false, 1.0, [0.0; 2], &mut channels, &ctx);
        assert!(!tone.is_alive(), "alive must be sticky");
    }

    #[test]
    fn automate_clamps_to_range_and_ignores_unknown() {
        let graph = NodeGraph::new(
            vec![GraphNode::processor(
                "add",
                vec![NodeInput::Mod("level".into()), NodeInput::Mod("missing".into())],
            )],
            0,
        )
        .with_mod(ModDef::new("level", 0.5, AutomationMode::Linear).with_range(0.0, 1.0));
        let (patch, mut channels, waves) = patch(graph);
        let mut tone = Tone::new(&patch, DT, 440.0, 1.0);
        let ctx = ProcessCtx::new(DT, &waves);

        assert_eq!(tone.automate("level", 3.0, 0.0), Ok(true));
        assert_eq!(tone.mod_value("level"), Some(1.0));
        assert_eq!(tone.automate("nope", 3.0, 0.0), Ok(false));

        let out = tone.process_sample(false, 1.0, [0.0; 2], &mut channels, &ctx);
        assert_eq!(out, [1.0, 1.0]);
    }

    #[test]
    fn pitch_bend_is_exponential() {
        let graph = NodeGraph::new(vec![GraphNode::processor("sine", vec![NodeInput::Pitch])], 0);
        let (patch, _, _) = patch(graph);
        let mut tone = Tone::new(&patch, DT, 440.0, 1.0);
        assert!(tone.pitch_bend(-440.0, 0.1).is_err());
        assert_eq!(tone.pitch(), 440.0);
        assert!(tone.pitch_bend(880.0, 0.1).is_ok());
    }
}
