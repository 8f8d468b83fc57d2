//! Dependency analysis inside a node: cycle rejection, stable topological
//! ordering of equations, and the per-output input-dependency vectors.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use loris_dsl::ast::Span;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::errors::ElabError;
use crate::ident::{Ident, Symbol};
use crate::node::FlatNode;

/// Analyzes the finished node: builds the variable-dependency relation,
/// rejects cycles outside `pre`, sorts the equations topologically with a
/// stable identifier tie-break, and computes `output_input_dep`.
pub(super) fn analyze(
    node: &mut FlatNode,
    eq_spans: &IndexMap<Ident, Span>,
    node_span: Span,
    nodes: &IndexMap<Symbol, FlatNode>,
) -> Result<(), ElabError> {
    // Current-instant reads of every defined variable. An equation's
    // left-hand side depends on the variables of its step term outside any
    // `pre`; a call-bound output depends on the activation condition and on
    // the input positions its callee's dependency vector identifies.
    let mut deps: IndexMap<Ident, BTreeSet<Ident>> = IndexMap::new();
    for eq in &node.equations {
        deps.insert(eq.lhs.clone(), eq.rhs.step_current_vars());
    }
    for call in &node.calls {
        let callee = &nodes[&call.callee];
        let activation_vars = call.activation.step_current_vars();
        for (i, (out_id, _)) in call.outputs.iter().enumerate() {
            let mut set = activation_vars.clone();
            if let Some(positions) = callee.output_input_dep.get(i) {
                for &j in positions {
                    if let Some(fe) = call.inputs.get(j) {
                        set.extend(fe.step_current_vars());
                    }
                }
            }
            deps.insert(out_id.clone(), set);
        }
    }

    check_cycles(&deps, eq_spans, node_span)?;

    // Stable topological order over the defined variables: repeatedly emit
    // the smallest variable whose dependencies are all resolved.
    let defined: BTreeSet<Ident> = deps.keys().cloned().collect();
    let mut pending: BTreeMap<Ident, BTreeSet<Ident>> = deps
        .iter()
        .map(|(k, ds)| {
            let ds = ds.intersection(&defined).cloned().collect();
            (k.clone(), ds)
        })
        .collect();
    let mut resolved: BTreeSet<Ident> = BTreeSet::new();
    let mut position: IndexMap<Ident, usize> = IndexMap::new();
    while !pending.is_empty() {
        let next = pending
            .iter()
            .find(|(_, ds)| ds.is_subset(&resolved))
            .map(|(k, _)| k.clone());
        match next {
            Some(v) => {
                pending.remove(&v);
                resolved.insert(v.clone());
                position.insert(v, position.len());
            }
            None => {
                return Err(ElabError::cyclic(
                    node_span,
                    "unresolvable dependency order".to_string(),
                ))
            }
        }
    }
    node.equations.sort_by_key(|eq| position[&eq.lhs]);

    // For each output leaf, the input leaf positions it transitively
    // depends on.
    let input_pos: IndexMap<Ident, usize> = node
        .input_leaves()
        .enumerate()
        .map(|(i, (id, _))| (id.clone(), i))
        .collect();
    let output_leaves: Vec<Ident> = node.output_leaves().map(|(id, _)| id.clone()).collect();
    node.output_input_dep = output_leaves
        .iter()
        .map(|out| reachable_inputs(out, &deps, &input_pos))
        .collect();
    Ok(())
}

/// Rejects strongly connected components of size > 1 and self-loops.
fn check_cycles(
    deps: &IndexMap<Ident, BTreeSet<Ident>>,
    eq_spans: &IndexMap<Ident, Span>,
    node_span: Span,
) -> Result<(), ElabError> {
    for (v, ds) in deps {
        if ds.contains(v) {
            let span = eq_spans.get(v).copied().unwrap_or(node_span);
            return Err(ElabError::cyclic(span, format!("'{v}' depends on itself")));
        }
    }

    let mut graph: DiGraph<Ident, ()> = DiGraph::new();
    let mut indices: IndexMap<Ident, NodeIndex> = IndexMap::new();
    for v in deps.keys() {
        let ix = graph.add_node(v.clone());
        indices.insert(v.clone(), ix);
    }
    for (v, ds) in deps {
        let from = indices[v];
        for d in ds {
            // Undefined variables (inputs, constants) are terminal.
            if let Some(&to) = indices.get(d) {
                graph.add_edge(from, to, ());
            }
        }
    }
    for scc in petgraph::algo::tarjan_scc(&graph) {
        if scc.len() > 1 {
            let mut members: Vec<String> =
                scc.iter().map(|&ix| graph[ix].to_string()).collect();
            members.sort();
            let span = scc
                .iter()
                .filter_map(|&ix| eq_spans.get(&graph[ix]))
                .next()
                .copied()
                .unwrap_or(node_span);
            return Err(ElabError::cyclic(span, members.join(", ")));
        }
    }
    Ok(())
}

/// Transitive closure from `start` down the dependency relation, collecting
/// the positions of reached input leaves.
fn reachable_inputs(
    start: &Ident,
    deps: &IndexMap<Ident, BTreeSet<Ident>>,
    input_pos: &IndexMap<Ident, usize>,
) -> BTreeSet<usize> {
    let mut out = BTreeSet::new();
    let mut visited: BTreeSet<Ident> = BTreeSet::new();
    let mut stack: Vec<Ident> = vec![start.clone()];
    while let Some(v) = stack.pop() {
        if !visited.insert(v.clone()) {
            continue;
        }
        if let Some(&pos) = input_pos.get(&v) {
            out.insert(pos);
        }
        if let Some(ds) = deps.get(&v) {
            for d in ds {
                if !visited.contains(d) {
                    stack.push(d.clone());
                }
            }
        }
    }
    out
}
