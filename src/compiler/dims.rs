//! Matrix-dimension resolution.

/*
Dimension Unification
=====================

Every node declares the shape of each input and of its output, using either
literal sizes or per-node size variables:

    mul:  a [M, N]   b [M, N]   ->  [M, N]
    b:                          ->  [2, 3]

Every edge `source -> consumer.input[i]` yields two equalities, one per axis,
between the source's declared output size and the consumer's declared input
size. External and constant inputs are fixed 1x1 (input samples are 2x1).

The equalities are solved by substitution until nothing changes:

    literal = literal     retired. Equal: fine. Actual 1, expected larger:
                          the slot is broadcast ("smeared"). Actual > 1 and
                          different: DIM_MISMATCH, ignored otherwise.
    var     = literal     bind the variable, substitute it everywhere.
    var     = var         wait for more evidence.

Evidence from literals larger than 1 is applied before evidence from a 1, so
a scalar operand never pins a variable that a wider operand also
constrains. Whatever is still var = var at the fixpoint is bound to 1 and
reported as UNBOUND.
*/

use crate::{
    compiler::{
        diag::{Axis, Diagnostic, ErrorReason},
        registry::{Dim, DimBindings, Dims},
        Signature,
    },
    graph::NodeInput,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Lit(u32),
    Sym(usize, String),
}

impl Term {
    fn of(node: usize, dim: &Dim) -> Self {
        match dim {
            Dim::Fixed(n) => Term::Lit(*n),
            Dim::Var(name) => Term::Sym(node, name.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct Equality {
    /// What the source produces.
    actual: Term,
    /// What the consumer declares.
    expected: Term,
    node: usize,
    input: usize,
    axis: Axis,
}

/// Outcome of resolution for a whole graph.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Resolution {
    /// Concrete size variables per node.
    pub bindings: Vec<DimBindings>,
    /// Per node, per input slot: axes that must be broadcast.
    pub smears: Vec<Vec<[bool; 2]>>,
}

impl Resolution {
    /// Concrete `[rows, cols]` of `dims` in the scope of `node`.
    pub fn concrete(&self, node: usize, dims: &Dims) -> [usize; 2] {
        let bindings = &self.bindings[node];
        let axis = |d: &Dim| match d {
            Dim::Fixed(n) => (*n).max(1) as usize,
            Dim::Var(name) => bindings.get(name).copied().unwrap_or(1).max(1) as usize,
        };
        [axis(&dims[0]), axis(&dims[1])]
    }

    pub fn needs_smear(&self, node: usize, input: usize) -> bool {
        self.smears[node]
            .get(input)
            .is_some_and(|axes| axes[0] || axes[1])
    }
}

/// Shape of a non-node input.
pub(crate) fn external_dims(input: &NodeInput) -> [u32; 2] {
    match input {
        NodeInput::InputSamples => [2, 1],
        _ => [1, 1],
    }
}

pub(crate) fn resolve_dimensions(
    signatures: &[Signature],
    inputs: &[Vec<NodeInput>],
    diagnostics: &mut Vec<Diagnostic>,
) -> Resolution {
    let count = signatures.len();
    let mut equalities = Vec::new();
    for (node, sig) in signatures.iter().enumerate() {
        for (slot, (input, def)) in inputs[node].iter().zip(&sig.inputs).enumerate() {
            for axis in Axis::BOTH {
                let actual = match input {
                    NodeInput::Node(source) => {
                        Term::of(*source, &signatures[*source].output[axis.index()])
                    }
                    other => Term::Lit(external_dims(other)[axis.index()]),
                };
                equalities.push(Equality {
                    actual,
                    expected: Term::of(node, &def.dims[axis.index()]),
                    node,
                    input: slot,
                    axis,
                });
            }
        }
    }

    let mut resolution = Resolution {
        bindings: vec![DimBindings::new(); count],
        smears: inputs.iter().map(|i| vec![[false; 2]; i.len()]).collect(),
    };

    loop {
        equalities.retain(|eq| match (&eq.actual, &eq.expected) {
            (Term::Lit(actual), Term::Lit(expected)) => {
                if actual != expected {
                    if *actual > 1 {
                        diagnostics.push(Diagnostic::new(
                            eq.node,
                            eq.input,
                            eq.axis,
                            ErrorReason::DimMismatch,
                        ));
                    } else {
                        resolution.smears[eq.node][eq.input][eq.axis.index()] = true;
                    }
                }
                false
            }
            _ => true,
        });

        let pick = equalities
            .iter()
            .find_map(|eq| binding_from(eq, |v| v > 1))
            .or_else(|| equalities.iter().find_map(|eq| binding_from(eq, |_| true)));
        let Some((node, name, value)) = pick else {
            break;
        };
        substitute(&mut equalities, node, &name, value);
        resolution.bindings[node].insert(name, value);
    }

    // Only var = var pairs are left. Each symbol is reported once, at the
    // first equality that mentions it.
    for eq in &equalities {
        let mut fresh = false;
        for term in [&eq.actual, &eq.expected] {
            if let Term::Sym(node, name) = term {
                if !resolution.bindings[*node].contains_key(name) {
                    resolution.bindings[*node].insert(name.clone(), 1);
                    fresh = true;
                }
            }
        }
        if fresh {
            diagnostics.push(Diagnostic::new(eq.node, eq.input, eq.axis, ErrorReason::Unbound));
        }
    }

    // Output variables nobody constrained.
    for (node, sig) in signatures.iter().enumerate() {
        for axis in Axis::BOTH {
            if let Dim::Var(name) = &sig.output[axis.index()] {
                if !resolution.bindings[node].contains_key(name) {
                    resolution.bindings[node].insert(name.clone(), 1);
                    diagnostics.push(Diagnostic::on_output(node, axis, ErrorReason::Unbound));
                }
            }
        }
    }

    resolution
}

#[cfg(test)]
impl Resolution {
    /// `signatures` with every size variable replaced by its binding.
    pub fn pin(&self, signatures: &[Signature]) -> Vec<Signature> {
        signatures
            .iter()
            .enumerate()
            .map(|(node, sig)| {
                let pin = |dims: &Dims| {
                    let [rows, cols] = self.concrete(node, dims);
                    [Dim::Fixed(rows as u32), Dim::Fixed(cols as u32)]
                };
                Signature {
                    inputs: sig
                        .inputs
                        .iter()
                        .map(|def| crate::compiler::registry::NodeInputDef {
                            dims: pin(&def.dims),
                            ..def.clone()
                        })
                        .collect(),
                    output: pin(&sig.output),
                }
            })
            .collect()
    }
}

fn binding_from(eq: &Equality, accept: impl Fn(u32) -> bool) -> Option<(usize, String, u32)> {
    match (&eq.actual, &eq.expected) {
        (Term::Sym(node, name), Term::Lit(v)) | (Term::Lit(v), Term::Sym(node, name))
            if accept(*v) =>
        {
            Some((*node, name.clone(), *v))
        }
        _ => None,
    }
}

fn substitute(equalities: &mut [Equality], node: usize, name: &str, value: u32) {
    for eq in equalities {
        for term in [&mut eq.actual, &mut eq.expected] {
            if matches!(term, Term::Sym(n, v) if *n == node && v.as_str() == name) {
                *term = Term::Lit(value);
            }
        }
    }
}
