//! Node-call and condact elaboration: argument checking, fresh `__returns`
//! binding, and call-site extraction.

use loris_dsl::ast::{self, Expr};

use super::eval::{ExprEvaluator, IndexedExprs};
use crate::errors::ElabError;
use crate::flat_expr::FlatExpr;
use crate::ident::{Ident, IndexPath, IndexStep, Symbol};
use crate::node::CallSite;
use crate::ty::Type;

/// Elaborates a call to `name`. For a condact, `condact` carries the
/// evaluated activation condition and the default expressions.
///
/// Returns the bound-output variable references, indexed to match the
/// caller's expected aggregate shape; the call record itself goes into the
/// evaluator's residue.
pub(super) fn elaborate_call(
    ev: &mut ExprEvaluator<'_>,
    name: &ast::Spanned<String>,
    args: &[Expr],
    condact: Option<(FlatExpr, &[Expr])>,
    span: ast::Span,
) -> Result<IndexedExprs, ElabError> {
    let callee_sym = Symbol::from(&name.node);
    let nodes = ev.nodes;
    let callee = nodes
        .get(&callee_sym)
        .ok_or_else(|| ElabError::forward_reference(name.span, &name.node))?;

    if ev.fresh.is_none() {
        return Err(ElabError::constant_required(
            span,
            format!("call to node '{}' is not a constant", name.node),
        ));
    }

    if args.len() != callee.inputs.len() {
        return Err(ElabError::type_mismatch(
            span,
            format!(
                "node '{}' expects {} inputs, got {}",
                name.node,
                callee.inputs.len(),
                args.len()
            ),
        ));
    }

    // Arguments, flattened and matched index-exact against the input leaves.
    let mut input_exprs = Vec::new();
    for (arg, input) in args.iter().zip(&callee.inputs) {
        let flat = check_against_leaves(ev, arg, &input.leaves, "input", &input.name)?;
        input_exprs.extend(flat);
    }

    // Condact activation and defaults; a plain call activates unconditionally.
    let (activation, defaults) = match condact {
        None => (FlatExpr::bool_lit(true), Vec::new()),
        Some((activation, default_exprs)) => {
            if default_exprs.len() != callee.outputs.len() {
                return Err(ElabError::type_mismatch(
                    span,
                    format!(
                        "condact of '{}' expects {} defaults, got {}",
                        name.node,
                        callee.outputs.len(),
                        default_exprs.len()
                    ),
                ));
            }
            let mut defaults = Vec::new();
            for (dexpr, output) in default_exprs.iter().zip(&callee.outputs) {
                let flat = check_against_leaves(ev, dexpr, &output.leaves, "default for output", &output.name)?;
                defaults.extend(flat);
            }
            (activation, defaults)
        }
    };

    let fresh = match &mut ev.fresh {
        Some(f) => f,
        None => {
            return Err(ElabError::constant_required(
                span,
                format!("call to node '{}' is not a constant", name.node),
            ))
        }
    };
    let call_id = fresh.fresh_call(&callee_sym);

    // Bound outputs and the caller-facing result shape.
    let multi = callee.outputs.len() > 1;
    let mut bound = Vec::new();
    let mut result = Vec::new();
    for (j, output) in callee.outputs.iter().enumerate() {
        for (leaf_id, leaf_ty) in &output.leaves {
            let bound_id = call_id.push(IndexStep::Nested(leaf_id.clone()));
            bound.push((bound_id.clone(), leaf_ty.clone()));
            let idx = if multi {
                IndexPath::from(vec![IndexStep::Position(j as u64)]).join(leaf_id.path())
            } else {
                leaf_id.path().clone()
            };
            result.push((idx, FlatExpr::var(bound_id, leaf_ty.clone())));
        }
    }

    ev.residue.new_calls.push(CallSite {
        outputs: bound,
        activation,
        callee: callee_sym,
        inputs: input_exprs,
        defaults,
    });
    Ok(result)
}

/// Evaluates `expr` and checks its leaves index-exact against `leaves`,
/// returning the flat expressions in leaf order.
fn check_against_leaves(
    ev: &mut ExprEvaluator<'_>,
    expr: &Expr,
    leaves: &[(Ident, Type)],
    what: &str,
    owner: &Symbol,
) -> Result<Vec<FlatExpr>, ElabError> {
    let flat = ev.eval(expr)?;
    if flat.len() != leaves.len() {
        return Err(ElabError::type_mismatch(
            expr.span,
            format!(
                "{what} '{owner}' has {} leaves, expression provides {}",
                leaves.len(),
                flat.len()
            ),
        ));
    }
    let mut out = Vec::with_capacity(flat.len());
    for ((idx, fe), (leaf_id, leaf_ty)) in flat.into_iter().zip(leaves) {
        if idx != *leaf_id.path() {
            return Err(ElabError::type_mismatch(
                expr.span,
                format!(
                    "{what} '{owner}' shape mismatch: expression component '{idx}' versus '{}'",
                    leaf_id.path()
                ),
            ));
        }
        if !fe.ty.check_type(leaf_ty) {
            return Err(ElabError::type_mismatch(
                expr.span,
                format!(
                    "{what} '{leaf_id}' expects {leaf_ty}, got {}",
                    fe.ty
                ),
            ));
        }
        out.push(fe);
    }
    Ok(out)
}
