//! Processor-type registry.
//!
//! The node library declares every processor type once: its inputs with their
//! symbolic shapes and defaults, its output shape, and a factory that builds
//! per-voice state. The compiler reads the declarations; Tones call the
//! factories.

use std::{collections::BTreeMap, collections::HashMap, fmt, sync::Arc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::graph::node::AudioProcessor;

/// One axis of a declared shape.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dim {
    Fixed(u32),
    /// Named size variable, local to one node instance.
    Var(String),
}

impl Dim {
    pub fn var(name: &str) -> Self {
        Dim::Var(name.to_string())
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(n) => write!(f, "{n}"),
            Dim::Var(name) => write!(f, "{name}"),
        }
    }
}

/// `[rows, cols]`
pub type Dims = [Dim; 2];

pub const SCALAR_DIMS: [u32; 2] = [1, 1];

pub fn scalar_dims() -> Dims {
    [Dim::Fixed(1), Dim::Fixed(1)]
}

/// `[M, N]` style shape built from two variable names.
pub fn var_dims(rows: &str, cols: &str) -> Dims {
    [Dim::var(rows), Dim::var(cols)]
}

/// Concrete values of a node instance's size variables.
pub type DimBindings = BTreeMap<String, u32>;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeInputDef {
    pub name: String,
    pub dims: Dims,
    pub default: f32,
}

impl NodeInputDef {
    pub fn new(name: &str, dims: Dims, default: f32) -> Self {
        Self {
            name: name.to_string(),
            dims,
            default,
        }
    }

    pub fn scalar(name: &str, default: f32) -> Self {
        Self::new(name, scalar_dims(), default)
    }
}

/// Builds the per-voice state for one processor type
///
/// Implemented for any `Fn(&DimBindings, f32) -> Box<dyn AudioProcessor>`, so
/// closures can be registered directly. The `f32` is the sample period.
pub trait ProcessorFactory: Send + Sync {
    fn make(&self, dims: &DimBindings, dt: f32) -> Box<dyn AudioProcessor>;
}

impl<F> ProcessorFactory for F
where
    F: Fn(&DimBindings, f32) -> Box<dyn AudioProcessor> + Send + Sync,
{
    fn make(&self, dims: &DimBindings, dt: f32) -> Box<dyn AudioProcessor> {
        self(dims, dt)
    }
}

#[derive(Clone)]
pub struct ProcessorDef {
    pub name: String,
    pub inputs: Vec<NodeInputDef>,
    pub output: Dims,
    pub factory: Arc<dyn ProcessorFactory>,
}

impl ProcessorDef {
    pub fn new(
        name: &str,
        inputs: Vec<NodeInputDef>,
        output: Dims,
        factory: impl ProcessorFactory + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            inputs,
            output,
            factory: Arc::new(factory),
        }
    }
}

impl fmt::Debug for ProcessorDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorDef")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// Name-indexed set of processor definitions. Later registrations replace
/// earlier ones with the same name.
#[derive(Debug, Clone, Default)]
pub struct ProcessorRegistry {
    defs: Vec<ProcessorDef>,
    index: HashMap<String, usize>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: ProcessorDef) -> &mut Self {
        match self.index.get(&def.name) {
            Some(&i) => self.defs[i] = def,
            None => {
                self.index.insert(def.name.clone(), self.defs.len());
                self.defs.push(def);
            }
        }
        self
    }

    pub fn with(mut self, def: ProcessorDef) -> Self {
        self.register(def);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ProcessorDef> {
        self.index.get(name).map(|&i| &self.defs[i])
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessorDef> {
        self.defs.iter()
    }
}

impl FromIterator<ProcessorDef> for ProcessorRegistry {
    fn from_iter<T: IntoIterator<Item = ProcessorDef>>(iter: T) -> Self {
        let mut registry = Self::new();
        for def in iter {
            registry.register(def);
        }
        registry
    }
}
