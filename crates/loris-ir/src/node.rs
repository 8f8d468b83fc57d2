//! The elaborated node records: the artifact consumed by the SMT encoder
//! and the unsat-core machinery.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::errors::ElabDiagnostic;
use crate::flat_expr::FlatExpr;
use crate::ident::{Ident, Symbol};
use crate::ty::Type;

/// A flattened input: source name, scalar leaves in index order, const flag.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatInput {
    pub name: Symbol,
    pub leaves: Vec<(Ident, Type)>,
    pub is_const: bool,
}

/// A flattened output: source name and scalar leaves in index order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatOutput {
    pub name: Symbol,
    pub leaves: Vec<(Ident, Type)>,
}

/// One flat equation, `lhs = rhs`, with a scalar-typed right-hand side.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub lhs: Ident,
    pub rhs: FlatExpr,
}

/// One extracted call site.
///
/// For a plain call the activation is `true` and `defaults` is empty; for a
/// condact the activation is the evaluated condition and `defaults` holds
/// the initial-tick values, one per bound output.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    /// Bound output leaves (`callee.__returns.k.<leaf>`) with their types,
    /// in the callee's output leaf order.
    pub outputs: Vec<(Ident, Type)>,
    pub activation: FlatExpr,
    pub callee: Symbol,
    /// Flattened input expressions in the callee's input leaf order.
    pub inputs: Vec<FlatExpr>,
    pub defaults: Vec<FlatExpr>,
}

/// The elaborated record of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatNode {
    pub name: Symbol,
    pub inputs: Vec<FlatInput>,
    pub outputs: Vec<FlatOutput>,
    /// Locals, including elaborator-introduced auxiliaries and call-bound
    /// outputs.
    pub locals: IndexMap<Ident, Type>,
    pub asserts: Vec<FlatExpr>,
    /// Properties, optionally named; includes injected range properties.
    pub properties: Vec<(Option<String>, FlatExpr)>,
    pub requires: Vec<FlatExpr>,
    pub ensures: Vec<FlatExpr>,
    /// Equations in dependency order.
    pub equations: Vec<Equation>,
    pub calls: Vec<CallSite>,
    /// Verification entry point.
    pub is_main: bool,
    /// For each output leaf (in order), the positions of the input leaves
    /// it transitively depends on.
    pub output_input_dep: Vec<BTreeSet<usize>>,
}

impl FlatNode {
    pub fn new(name: Symbol) -> Self {
        Self {
            name,
            inputs: Vec::new(),
            outputs: Vec::new(),
            locals: IndexMap::new(),
            asserts: Vec::new(),
            properties: Vec::new(),
            requires: Vec::new(),
            ensures: Vec::new(),
            equations: Vec::new(),
            calls: Vec::new(),
            is_main: false,
            output_input_dep: Vec::new(),
        }
    }

    /// Input leaves in positional order across all inputs.
    pub fn input_leaves(&self) -> impl Iterator<Item = &(Ident, Type)> {
        self.inputs.iter().flat_map(|i| i.leaves.iter())
    }

    /// Output leaves in positional order across all outputs.
    pub fn output_leaves(&self) -> impl Iterator<Item = &(Ident, Type)> {
        self.outputs.iter().flat_map(|o| o.leaves.iter())
    }

    /// The equation defining `ident`, if any.
    pub fn equation_for(&self, ident: &Ident) -> Option<&Equation> {
        self.equations.iter().find(|eq| eq.lhs == *ident)
    }
}

/// The elaborated program: each node's record keyed by name, in declaration
/// order, plus the non-fatal diagnostics collected along the way.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatProgram {
    pub nodes: IndexMap<Symbol, FlatNode>,
    pub diagnostics: Vec<ElabDiagnostic>,
}

impl FlatProgram {
    /// The node marked as the verification entry, if any.
    pub fn main_node(&self) -> Option<&FlatNode> {
        self.nodes.values().find(|n| n.is_main)
    }
}
