//! The node assembler: orchestrates input/output/contract/local/equation
//! elaboration and maintains the per-node state.

use indexmap::IndexMap;
use loris_dsl::ast::{self, Span};

use super::deps;
use super::eval::{ExprEvaluator, Residue};
use super::type_expand::expand_type;
use crate::context::TypingContext;
use crate::errors::{ElabDiagnostic, ElabError};
use crate::flat_expr::{BinOp, FlatExpr};
use crate::ident::{FreshVars, Ident, IndexPath, IndexStep, Symbol, RETURNS_FIELD};
use crate::node::{Equation, FlatInput, FlatNode, FlatOutput};
use crate::ty::Type;

/// Elaborates one node declaration against the global context and the
/// registry of already-elaborated nodes.
pub(super) fn elaborate_node(
    global: &TypingContext,
    nodes: &IndexMap<Symbol, FlatNode>,
    decl: &ast::NodeDecl,
    span: Span,
    diagnostics: &mut Vec<ElabDiagnostic>,
) -> Result<FlatNode, ElabError> {
    if let Some(param) = decl.static_params.first() {
        return Err(ElabError::unsupported(
            param.span,
            "Parametric nodes are not implemented",
        ));
    }
    tracing::debug!(node = %decl.name, "elaborating node");

    let mut asm = NodeAssembler {
        ctx: global.clone(),
        nodes,
        fresh: FreshVars::new(),
        node: FlatNode::new(Symbol::from(&decl.name)),
        eq_spans: IndexMap::new(),
        diagnostics,
    };

    for group in &decl.inputs {
        asm.declare_io(group, IoKind::Input)?;
    }
    for group in &decl.outputs {
        asm.declare_io(group, IoKind::Output)?;
    }

    // Contracts are evaluated before locals are declared, which enforces
    // the inputs-and-outputs-only visibility rule.
    for req in &decl.contract.requires {
        let fe = asm.eval_statement(req, |ev, e| ev.eval_bool(e, "assumption"))?;
        asm.node.requires.push(fe);
    }
    for ens in &decl.contract.ensures {
        let fe = asm.eval_statement(ens, |ev, e| ev.eval_bool(e, "guarantee"))?;
        asm.node.ensures.push(fe);
    }

    for local in &decl.locals {
        match local {
            ast::LocalDecl::Var(group) => asm.declare_io(group, IoKind::Local)?,
            ast::LocalDecl::Const(cd) => super::declare_const(&mut asm.ctx, cd)?,
        }
    }

    for stmt in &decl.body {
        match &stmt.node {
            ast::Statement::Main => asm.node.is_main = true,
            ast::Statement::Assert(e) => {
                let fe = asm.eval_statement(e, |ev, e| ev.eval_bool(e, "assertion"))?;
                asm.node.asserts.push(fe);
            }
            ast::Statement::Property { name, expr } => {
                let fe = asm.eval_statement(expr, |ev, e| ev.eval_bool(e, "property"))?;
                asm.node.properties.push((name.clone(), fe));
            }
            ast::Statement::Equation { targets, rhs } => {
                asm.elaborate_equation(targets, rhs, stmt.span)?;
            }
        }
    }

    let NodeAssembler {
        mut node, eq_spans, ..
    } = asm;
    deps::analyze(&mut node, &eq_spans, span, nodes)?;
    Ok(node)
}

#[derive(Clone, Copy, PartialEq)]
enum IoKind {
    Input,
    Output,
    Local,
}

struct NodeAssembler<'a> {
    ctx: TypingContext,
    nodes: &'a IndexMap<Symbol, FlatNode>,
    fresh: FreshVars,
    node: FlatNode,
    /// Span of the statement defining each leaf; doubles as the
    /// defined-leaves set for duplicate-definition checks.
    eq_spans: IndexMap<Ident, Span>,
    diagnostics: &'a mut Vec<ElabDiagnostic>,
}

impl NodeAssembler<'_> {
    /// Declares one input/output/local group: base clock only, no
    /// redeclaration, leaves registered in the node context.
    fn declare_io(&mut self, group: &ast::VarGroup, kind: IoKind) -> Result<(), ElabError> {
        if let Some(clock) = &group.clock {
            return Err(ElabError::unsupported(
                clock.span,
                "Clocked declarations are not implemented",
            ));
        }
        let leaves_ty = expand_type(&mut self.ctx, &group.ty, group.span)?;
        for name in &group.names {
            self.ctx.check_declarable(&name.node, name.span)?;
            let base = Ident::new(name.node.as_str());
            if self.ctx.ident_in_context(&base) {
                return Err(ElabError::redeclaration(
                    name.span,
                    format!("identifier '{}' is already declared", name.node),
                ));
            }
            let mut leaves = Vec::with_capacity(leaves_ty.len());
            for (suffix, ty) in &leaves_ty {
                let full = base.with_suffix(suffix);
                self.ctx.bind_value(full.clone(), ty.clone());
                leaves.push((full, ty.clone()));
            }
            match kind {
                IoKind::Input => self.node.inputs.push(FlatInput {
                    name: Symbol::from(&name.node),
                    leaves,
                    is_const: group.is_const,
                }),
                IoKind::Output => self.node.outputs.push(FlatOutput {
                    name: Symbol::from(&name.node),
                    leaves,
                }),
                IoKind::Local => {
                    for (full, ty) in leaves {
                        self.node.locals.insert(full, ty);
                    }
                }
            }
        }
        Ok(())
    }

    /// Runs one evaluator pass and folds its abstraction residue into the
    /// node afterwards, so the evaluator never observes itself.
    fn eval_statement<T>(
        &mut self,
        expr: &ast::Expr,
        f: impl FnOnce(&mut ExprEvaluator<'_>, &ast::Expr) -> Result<T, ElabError>,
    ) -> Result<T, ElabError> {
        let (result, residue) = {
            let mut ev = ExprEvaluator::new(
                &self.ctx,
                self.nodes,
                Some(&mut self.fresh),
                self.diagnostics,
            );
            let result = f(&mut ev, expr)?;
            (result, ev.residue)
        };
        self.fold_residue(residue, expr.span);
        Ok(result)
    }

    /// Appends fresh auxiliary variables and extracted call sites to the
    /// node's locals, equations, and call list.
    fn fold_residue(&mut self, residue: Residue, span: Span) {
        for (v, ty, def) in residue.new_vars {
            self.ctx.bind_value(v.clone(), ty.clone());
            self.node.locals.insert(v.clone(), ty);
            self.eq_spans.insert(v.clone(), span);
            self.node.equations.push(Equation { lhs: v, rhs: def });
        }
        for call in residue.new_calls {
            for (out, ty) in &call.outputs {
                self.ctx.bind_value(out.clone(), ty.clone());
                self.node.locals.insert(out.clone(), ty.clone());
            }
            self.node.calls.push(call);
        }
    }

    /// The declared leaves of an equation target, resolved through outputs
    /// first, then locals.
    fn resolve_target(&mut self, target: &ast::Spanned<String>) -> Result<Vec<(Ident, Type)>, ElabError> {
        if let Some(output) = self
            .node
            .outputs
            .iter()
            .find(|o| o.name == target.node.as_str())
        {
            return Ok(output.leaves.clone());
        }
        // Call-bound outputs share the callee's base name; they are never
        // equation targets.
        let mut local_leaves: Vec<(Ident, Type)> = self
            .node
            .locals
            .iter()
            .filter(|(id, _)| {
                *id.base() == target.node.as_str()
                    && !matches!(id.path().steps().first(),
                        Some(IndexStep::Field(f)) if *f == RETURNS_FIELD)
            })
            .map(|(id, ty)| (id.clone(), ty.clone()))
            .collect();
        local_leaves.sort_by(|a, b| a.0.cmp(&b.0));
        if !local_leaves.is_empty() {
            return Ok(local_leaves);
        }
        if self.node.inputs.iter().any(|i| i.name == target.node.as_str()) {
            return Err(ElabError::type_mismatch(
                target.span,
                format!("equation defines input '{}'", target.node),
            ));
        }
        Err(ElabError::undeclared(
            target.span,
            "identifier",
            &target.node,
        ))
    }

    fn elaborate_equation(
        &mut self,
        targets: &[ast::Spanned<String>],
        rhs: &ast::Expr,
        stmt_span: Span,
    ) -> Result<(), ElabError> {
        // Left pattern leaves, with the positional prefix expected of the
        // right-hand side for multi-target equations.
        let multi = targets.len() > 1;
        let mut lhs_leaves = Vec::new();
        for (j, target) in targets.iter().enumerate() {
            for (leaf, ty) in self.resolve_target(target)? {
                if self.eq_spans.contains_key(&leaf) {
                    return Err(ElabError::redeclaration(
                        target.span,
                        format!("'{leaf}' is defined by more than one equation"),
                    ));
                }
                let expected_idx = if multi {
                    IndexPath::from(vec![IndexStep::Position(j as u64)]).join(leaf.path())
                } else {
                    leaf.path().clone()
                };
                lhs_leaves.push((expected_idx, leaf, ty));
            }
        }

        let rhs_list = self.eval_statement(rhs, |ev, e| ev.eval(e))?;

        if rhs_list.len() != lhs_leaves.len() {
            return Err(ElabError::type_mismatch(
                rhs.span,
                format!(
                    "equation defines {} leaves but its right-hand side has {}",
                    lhs_leaves.len(),
                    rhs_list.len()
                ),
            ));
        }

        for ((expected_idx, leaf, declared_ty), (idx, fe)) in
            lhs_leaves.into_iter().zip(rhs_list)
        {
            if idx != expected_idx {
                return Err(ElabError::type_mismatch(
                    rhs.span,
                    format!(
                        "equation component mismatch: '{leaf}' expects index '{expected_idx}', right-hand side provides '{idx}'"
                    ),
                ));
            }
            if fe.ty.check_type(&declared_ty) {
                self.push_equation(leaf, fe, stmt_span);
            } else if fe.ty == Type::Int && matches!(declared_ty, Type::IntRange(_, _)) {
                self.relax_range(leaf, declared_ty, fe, stmt_span, rhs.span)?;
            } else {
                return Err(ElabError::type_mismatch(
                    rhs.span,
                    format!(
                        "cannot assign {} to '{leaf}' of type {declared_ty}",
                        fe.ty
                    ),
                ));
            }
        }
        Ok(())
    }

    fn push_equation(&mut self, lhs: Ident, rhs: FlatExpr, span: Span) {
        self.eq_spans.insert(lhs.clone(), span);
        self.node.equations.push(Equation { lhs, rhs });
    }

    /// The `Int ≤ IntRange` recovery: the target's recorded type widens to
    /// `Int` and a range property `lo ≤ v ∧ v ≤ hi` is appended.
    fn relax_range(
        &mut self,
        leaf: Ident,
        declared_ty: Type,
        fe: FlatExpr,
        stmt_span: Span,
        rhs_span: Span,
    ) -> Result<(), ElabError> {
        let Type::IntRange(lo, hi) = declared_ty else {
            return Err(ElabError::type_mismatch(
                rhs_span,
                format!("cannot relax '{leaf}': not a subrange"),
            ));
        };
        for output in &mut self.node.outputs {
            for (id, ty) in &mut output.leaves {
                if *id == leaf {
                    *ty = Type::Int;
                }
            }
        }
        if let Some(ty) = self.node.locals.get_mut(&leaf) {
            *ty = Type::Int;
        }
        self.ctx.retype_value(&leaf, Type::Int);

        let v = FlatExpr::var(leaf.clone(), Type::Int);
        let lower = FlatExpr::binary(BinOp::Le, FlatExpr::int_lit(lo.clone()), v.clone())
            .map_err(|k| ElabError::new(k, rhs_span))?;
        let upper = FlatExpr::binary(BinOp::Le, v, FlatExpr::int_lit(hi.clone()))
            .map_err(|k| ElabError::new(k, rhs_span))?;
        let prop = FlatExpr::binary(BinOp::And, lower, upper)
            .map_err(|k| ElabError::new(k, rhs_span))?;
        self.node
            .properties
            .push((Some(format!("{leaf} in [{lo}, {hi}]")), prop));

        self.push_equation(leaf, fe, stmt_span);
        Ok(())
    }
}
