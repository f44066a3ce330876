//! Built-in processor library.
//!
//! | name       | inputs                                         | output  |
//! |------------|------------------------------------------------|---------|
//! | `add`      | a `[M,N]`, b `[M,N]`                           | `[M,N]` |
//! | `mul`      | a `[M,N]`, b `[M,N]`                           | `[M,N]` |
//! | `pan`      | signal, pan                                    | `[2,1]` |
//! | `sine`     | frequency                                      | `[1,1]` |
//! | `saw`      | frequency                                      | `[1,1]` |
//! | `square`   | frequency                                      | `[1,1]` |
//! | `triangle` | frequency                                      | `[1,1]` |
//! | `osc`      | frequency, wave, phase                         | `[1,1]` |
//! | `envelope` | gate, attack, decay, sustain, release          | `[1,1]` |
//! | `filter`   | signal `[M,N]`, cutoff, resonance, mode        | `[M,N]` |

pub mod envelope;
pub mod filter;
pub mod math;
pub mod oscillator;

use crate::{
    compiler::registry::{
        scalar_dims, var_dims, Dim, DimBindings, NodeInputDef, ProcessorDef, ProcessorRegistry,
    },
    dsp::oscillator::Waveform,
    graph::node::AudioProcessor,
};

use envelope::EnvelopeNode;
use filter::FilterNode;
use math::{BinaryOp, Elementwise, Pan};
use oscillator::{ShapeOsc, WavetableOsc};

fn elements(dims: &DimBindings) -> usize {
    dims.values().map(|&v| v.max(1) as usize).product()
}

fn binary(name: &str, op: BinaryOp, default: f32) -> ProcessorDef {
    ProcessorDef::new(
        name,
        vec![
            NodeInputDef::new("a", var_dims("M", "N"), default),
            NodeInputDef::new("b", var_dims("M", "N"), default),
        ],
        var_dims("M", "N"),
        move |_: &DimBindings, _: f32| -> Box<dyn AudioProcessor> { Box::new(Elementwise::new(op)) },
    )
}

fn shape(name: &str, waveform: Waveform) -> ProcessorDef {
    ProcessorDef::new(
        name,
        vec![NodeInputDef::scalar("frequency", 440.0)],
        scalar_dims(),
        move |_: &DimBindings, _: f32| -> Box<dyn AudioProcessor> { Box::new(ShapeOsc::new(waveform)) },
    )
}

/// Registry holding every built-in processor.
pub fn builtin_registry() -> ProcessorRegistry {
    ProcessorRegistry::new()
        .with(binary("add", BinaryOp::Add, 0.0))
        .with(binary("mul", BinaryOp::Mul, 1.0))
        .with(ProcessorDef::new(
            "pan",
            vec![
                NodeInputDef::scalar("signal", 0.0),
                NodeInputDef::scalar("pan", 0.0),
            ],
            [Dim::Fixed(2), Dim::Fixed(1)],
            |_: &DimBindings, _: f32| -> Box<dyn AudioProcessor> { Box::new(Pan) },
        ))
        .with(shape("sine", Waveform::Sine))
        .with(shape("saw", Waveform::Saw))
        .with(shape("square", Waveform::Square))
        .with(shape("triangle", Waveform::Triangle))
        .with(ProcessorDef::new(
            "osc",
            vec![
                NodeInputDef::scalar("frequency", 440.0),
                NodeInputDef::scalar("wave", 0.0),
                NodeInputDef::scalar("phase", 0.0),
            ],
            scalar_dims(),
            |_: &DimBindings, _: f32| -> Box<dyn AudioProcessor> {
                Box::new(WavetableOsc::default())
            },
        ))
        .with(ProcessorDef::new(
            "envelope",
            vec![
                NodeInputDef::scalar("gate", 0.0),
                NodeInputDef::scalar("attack", 0.01),
                NodeInputDef::scalar("decay", 0.1),
                NodeInputDef::scalar("sustain", 0.7),
                NodeInputDef::scalar("release", 0.3),
            ],
            scalar_dims(),
            |_: &DimBindings, _: f32| -> Box<dyn AudioProcessor> {
                Box::new(EnvelopeNode::default())
            },
        ))
        .with(ProcessorDef::new(
            "filter",
            vec![
                NodeInputDef::new("signal", var_dims("M", "N"), 0.0),
                NodeInputDef::scalar("cutoff", 1000.0),
                NodeInputDef::scalar("resonance", 0.0),
                NodeInputDef::scalar("mode", 0.0),
            ],
            var_dims("M", "N"),
            |dims: &DimBindings, _: f32| -> Box<dyn AudioProcessor> {
                Box::new(FilterNode::new(elements(dims)))
            },
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_is_registered_once() {
        let registry = builtin_registry();
        let names: Vec<_> = registry.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "add", "mul", "pan", "sine", "saw", "square", "triangle", "osc", "envelope",
                "filter"
            ]
        );
    }

    #[test]
    fn filter_state_matches_element_count() {
        let dims: DimBindings = [("M".to_string(), 2), ("N".to_string(), 3)].into();
        assert_eq!(elements(&dims), 6);
        assert_eq!(elements(&DimBindings::new()), 1);
    }
}
