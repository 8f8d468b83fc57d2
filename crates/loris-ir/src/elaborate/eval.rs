//! The expression evaluator: consumes AST expressions and produces indexed
//! flat expressions plus the abstraction residue (fresh variables and call
//! sites) they generate.

use indexmap::IndexMap;
use loris_dsl::ast::{self, Expr, ExprKind};
use num::BigInt;

use super::call;
use crate::context::TypingContext;
use crate::errors::{ElabDiagnostic, ElabError};
use crate::flat_expr::{BinOp, FlatExpr, Term, UnOp};
use crate::ident::{FreshVars, Ident, IndexPath, IndexStep, Symbol};
use crate::node::{CallSite, FlatNode};
use crate::ty::Type;

/// Indexed flat expressions: one entry per scalar leaf, sorted by index.
pub(crate) type IndexedExprs = Vec<(IndexPath, FlatExpr)>;

/// Abstraction residue produced while evaluating one statement.
#[derive(Debug, Default)]
pub(crate) struct Residue {
    /// Fresh auxiliary variables with their type and defining expression.
    pub new_vars: Vec<(Ident, Type, FlatExpr)>,
    /// Extracted call sites.
    pub new_calls: Vec<CallSite>,
}

/// The recursive traversal over AST expressions.
///
/// With `fresh = None` the evaluator runs in constants-only mode: any
/// attempt to introduce an auxiliary variable or a call site is fatal.
pub(crate) struct ExprEvaluator<'a> {
    pub(super) ctx: &'a TypingContext,
    pub(super) nodes: &'a IndexMap<Symbol, FlatNode>,
    pub(super) fresh: Option<&'a mut FreshVars>,
    pub(super) residue: Residue,
    pub(super) warnings: &'a mut Vec<ElabDiagnostic>,
    arrow_depth: usize,
}

impl<'a> ExprEvaluator<'a> {
    pub(crate) fn new(
        ctx: &'a TypingContext,
        nodes: &'a IndexMap<Symbol, FlatNode>,
        fresh: Option<&'a mut FreshVars>,
        warnings: &'a mut Vec<ElabDiagnostic>,
    ) -> Self {
        Self {
            ctx,
            nodes,
            fresh,
            residue: Residue::default(),
            warnings,
            arrow_depth: 0,
        }
    }

    /// Evaluates `expr` to its indexed flat leaves, sorted by index.
    pub(crate) fn eval(&mut self, expr: &Expr) -> Result<IndexedExprs, ElabError> {
        let mut results = self.eval_inner(expr)?;
        results.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(results)
    }

    /// Evaluates `expr` and demands a single scalar result.
    pub(crate) fn eval_scalar(&mut self, expr: &Expr) -> Result<FlatExpr, ElabError> {
        let mut results = self.eval(expr)?;
        if results.len() == 1 {
            if let Some((idx, fe)) = results.pop() {
                if idx.is_empty() {
                    return Ok(fe);
                }
            }
        }
        Err(ElabError::type_mismatch(
            expr.span,
            "expected a scalar expression".to_string(),
        ))
    }

    /// Evaluates `expr` and demands a single scalar Boolean.
    pub(crate) fn eval_bool(&mut self, expr: &Expr, what: &str) -> Result<FlatExpr, ElabError> {
        let fe = self.eval_scalar(expr)?;
        if fe.ty != Type::Bool {
            return Err(ElabError::type_mismatch(
                expr.span,
                format!("{what} must be bool, got {}", fe.ty),
            ));
        }
        Ok(fe)
    }

    fn eval_inner(&mut self, expr: &Expr) -> Result<IndexedExprs, ElabError> {
        match &expr.node {
            ExprKind::BoolLit(b) => Ok(scalar(FlatExpr::bool_lit(*b))),
            ExprKind::IntLit(n) => Ok(scalar(FlatExpr::int_lit(n.clone()))),
            ExprKind::RealLit(r) => Ok(scalar(FlatExpr::real_lit(r.clone()))),

            ExprKind::Ident(name) => self.eval_ident(name, expr.span),

            ExprKind::RecordProj { record, field } => {
                let inner = self.eval(record)?;
                let mut out = Vec::new();
                for (idx, fe) in inner {
                    if let Some((IndexStep::Field(f), rest)) = idx.split_first() {
                        if *f == field.node.as_str() {
                            out.push((rest, fe));
                        }
                    }
                }
                if out.is_empty() {
                    return Err(ElabError::type_mismatch(
                        field.span,
                        format!("no field '{}' to project", field.node),
                    ));
                }
                Ok(out)
            }

            ExprKind::IndexProj { target, index } => {
                let n = eval_const_bigint(self.ctx, index)?;
                let inner = self.eval(target)?;
                let mut out = Vec::new();
                for (idx, fe) in inner {
                    if let Some((IndexStep::Position(p), rest)) = idx.split_first() {
                        if BigInt::from(*p) == n {
                            out.push((rest, fe));
                        }
                    }
                }
                if out.is_empty() {
                    return Err(ElabError::type_mismatch(
                        index.span,
                        format!("no component at position {n}"),
                    ));
                }
                Ok(out)
            }

            ExprKind::ToInt(inner) => self.eval_conversion(UnOp::ToInt, inner, expr.span),
            ExprKind::ToReal(inner) => self.eval_conversion(UnOp::ToReal, inner, expr.span),

            ExprKind::List(elems) => {
                let mut flat = Vec::new();
                flatten_list(elems, &mut flat);
                if flat.len() == 1 {
                    // A parenthesized expression, not a tuple.
                    return self.eval_inner(flat[0]);
                }
                self.eval_tuple(&flat)
            }
            ExprKind::Tuple(elems) => {
                let refs: Vec<&Expr> = elems.iter().collect();
                self.eval_tuple(&refs)
            }

            ExprKind::ArrayInit { elem, size } => {
                let n = eval_const_bigint(self.ctx, size)?;
                let n = num::ToPrimitive::to_u64(&n).filter(|&n| n >= 1).ok_or_else(|| {
                    ElabError::type_mismatch(
                        size.span,
                        format!("array size must be positive, got {n}"),
                    )
                })?;
                let sub = self.eval(elem)?;
                let mut out = Vec::with_capacity(sub.len() * n as usize);
                for i in 0..n {
                    for (idx, fe) in &sub {
                        let prefixed = IndexPath::from(vec![IndexStep::Position(i)]).join(idx);
                        out.push((prefixed, fe.clone()));
                    }
                }
                Ok(out)
            }

            ExprKind::RecordCtor { name, fields } => self.eval_record_ctor(name, fields, expr.span),

            ExprKind::Unary { op, operand } => {
                let inner = self.eval(operand)?;
                let op = match op {
                    ast::UnaryOp::Neg => UnOp::Neg,
                    ast::UnaryOp::Not => UnOp::Not,
                };
                inner
                    .into_iter()
                    .map(|(idx, fe)| {
                        FlatExpr::unary(op, fe)
                            .map(|fe| (idx, fe))
                            .map_err(|k| ElabError::new(k, expr.span))
                    })
                    .collect()
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs)?;
                let r = self.eval(rhs)?;
                let pairs = zip_exact(l, r, expr.span, &format!("operator '{op}'"))?;
                let op = lower_binop(*op);
                pairs
                    .into_iter()
                    .map(|(idx, le, re)| {
                        FlatExpr::binary(op, le, re)
                            .map(|fe| (idx, fe))
                            .map_err(|k| ElabError::new(k, expr.span))
                    })
                    .collect()
            }

            ExprKind::Ite {
                cond,
                then_branch,
                else_branch,
            } => {
                let c = self.eval_bool(cond, "condition of if-then-else")?;
                let t = self.eval(then_branch)?;
                let e = self.eval(else_branch)?;
                let pairs = zip_exact(t, e, expr.span, "if-then-else")?;
                pairs
                    .into_iter()
                    .map(|(idx, te, ee)| {
                        FlatExpr::ite(c.clone(), te, ee)
                            .map(|fe| (idx, fe))
                            .map_err(|k| ElabError::new(k, expr.span))
                    })
                    .collect()
            }

            ExprKind::Pre(inner) => self.eval_pre(inner, expr.span),

            ExprKind::Arrow { init, step } => {
                let a = self.eval(init)?;
                self.arrow_depth += 1;
                let b = self.eval(step);
                self.arrow_depth -= 1;
                let pairs = zip_exact(a, b?, expr.span, "operator '->'")?;
                pairs
                    .into_iter()
                    .map(|(idx, ae, be)| {
                        FlatExpr::arrow(ae, be)
                            .map(|fe| (idx, fe))
                            .map_err(|k| ElabError::new(k, expr.span))
                    })
                    .collect()
            }

            ExprKind::Call { node, args } => call::elaborate_call(self, node, args, None, expr.span),

            ExprKind::Condact {
                clock,
                node,
                args,
                defaults,
            } => {
                let activation = self.eval_bool(clock, "condact activation")?;
                call::elaborate_call(self, node, args, Some((activation, defaults.as_slice())), expr.span)
            }

            ExprKind::Fby(_) => Err(ElabError::unsupported(
                expr.span,
                "Fby operator not implemented",
            )),
            ExprKind::When { .. } => Err(ElabError::unsupported(
                expr.span,
                "When operator not implemented",
            )),
            ExprKind::Current(_) => Err(ElabError::unsupported(
                expr.span,
                "Current operator not implemented",
            )),
            ExprKind::ArraySlice { .. } => Err(ElabError::unsupported(
                expr.span,
                "Array slices are not implemented",
            )),
            ExprKind::ArrayConcat { .. } => Err(ElabError::unsupported(
                expr.span,
                "Array concatenation is not implemented",
            )),
            ExprKind::OneHot(_) => Err(ElabError::unsupported(
                expr.span,
                "One-hot operator not implemented",
            )),
            ExprKind::With { .. } => Err(ElabError::unsupported(
                expr.span,
                "Recursive with expressions are not implemented",
            )),
            ExprKind::ParametricCall { .. } => Err(ElabError::unsupported(
                expr.span,
                "Parametric node instantiation is not implemented",
            )),
        }
    }

    fn eval_ident(&mut self, name: &str, span: ast::Span) -> Result<IndexedExprs, ElabError> {
        let leaf = Ident::new(name);
        if let Some(fe) = self.ctx.consts.get(&leaf) {
            return Ok(scalar(fe.clone()));
        }
        if let Some(ty) = self.ctx.type_ctx.get(&leaf) {
            return Ok(scalar(FlatExpr::var(leaf, ty.clone())));
        }
        if let Some(suffixes) = self.ctx.index_ctx.get(&leaf) {
            let mut out = Vec::with_capacity(suffixes.len());
            for (suffix, ty) in suffixes.clone() {
                let full = leaf.with_suffix(&suffix);
                let fe = match self.ctx.consts.get(&full) {
                    Some(c) => c.clone(),
                    None => FlatExpr::var(full, ty),
                };
                out.push((suffix, fe));
            }
            return Ok(out);
        }
        Err(ElabError::undeclared(span, "identifier", name))
    }

    fn eval_conversion(
        &mut self,
        op: UnOp,
        inner: &Expr,
        span: ast::Span,
    ) -> Result<IndexedExprs, ElabError> {
        let results = self.eval(inner)?;
        results
            .into_iter()
            .map(|(idx, fe)| {
                FlatExpr::unary(op, fe)
                    .map(|fe| (idx, fe))
                    .map_err(|k| ElabError::new(k, span))
            })
            .collect()
    }

    fn eval_tuple(&mut self, elems: &[&Expr]) -> Result<IndexedExprs, ElabError> {
        let mut out = Vec::new();
        for (j, elem) in elems.iter().enumerate() {
            let sub = self.eval(elem)?;
            for (idx, fe) in sub {
                let prefixed = IndexPath::from(vec![IndexStep::Position(j as u64)]).join(&idx);
                out.push((prefixed, fe));
            }
        }
        Ok(out)
    }

    fn eval_record_ctor(
        &mut self,
        name: &ast::Spanned<String>,
        fields: &[(ast::Spanned<String>, Expr)],
        span: ast::Span,
    ) -> Result<IndexedExprs, ElabError> {
        let bare = Ident::new(name.node.as_str());
        let declared = match self.ctx.indexed_types.get(&bare) {
            Some(leaves) => {
                let mut leaves = leaves.clone();
                leaves.sort_by(|a, b| a.0.cmp(&b.0));
                leaves
            }
            None => {
                if self.ctx.basic_types.contains_key(&bare)
                    || self.ctx.free_types.contains(&Symbol::from(&name.node))
                {
                    return Err(ElabError::type_mismatch(
                        name.span,
                        format!("'{}' is not a record type", name.node),
                    ));
                }
                return Err(ElabError::undeclared(name.span, "type", &name.node));
            }
        };

        let mut given = Vec::new();
        for (fname, fexpr) in fields {
            let sub = self.eval(fexpr)?;
            for (idx, fe) in sub {
                let prefixed =
                    IndexPath::from(vec![IndexStep::Field(Symbol::from(&fname.node))]).join(&idx);
                given.push((prefixed, fe));
            }
        }
        given.sort_by(|a, b| a.0.cmp(&b.0));

        if given.len() != declared.len() {
            return Err(ElabError::type_mismatch(
                span,
                format!(
                    "record '{}' has {} leaves, constructor provides {}",
                    name.node,
                    declared.len(),
                    given.len()
                ),
            ));
        }
        let mut out = Vec::with_capacity(given.len());
        for ((gidx, fe), (didx, dty)) in given.into_iter().zip(declared) {
            if gidx != didx {
                return Err(ElabError::type_mismatch(
                    span,
                    format!(
                        "record '{}' constructor shape mismatch: '{gidx}' versus '{didx}'",
                        name.node
                    ),
                ));
            }
            if !fe.ty.check_type(&dty) {
                return Err(ElabError::type_mismatch(
                    span,
                    format!(
                        "record '{}' component '{gidx}' has type {}, expected {dty}",
                        name.node, fe.ty
                    ),
                ));
            }
            out.push((gidx, fe));
        }
        Ok(out)
    }

    fn eval_pre(&mut self, inner: &Expr, span: ast::Span) -> Result<IndexedExprs, ElabError> {
        if self.arrow_depth == 0 {
            tracing::warn!("unguarded 'pre' at {}..{}", span.start, span.end);
            self.warnings.push(ElabDiagnostic::warning(
                "unguarded_pre",
                "'pre' is not guarded by an initialization arrow",
                span,
            ));
        }
        let results = self.eval(inner)?;
        let mut out = Vec::with_capacity(results.len());
        for (idx, fe) in results {
            let var_expr = if fe.as_var_ref().is_some() {
                fe
            } else {
                let fresh = match &mut self.fresh {
                    Some(f) => f,
                    None => {
                        return Err(ElabError::constant_required(
                            span,
                            "'pre' of a compound expression is not a constant".to_string(),
                        ))
                    }
                };
                let v = fresh.fresh_abs();
                let ty = fe.ty.clone();
                self.residue.new_vars.push((v.clone(), ty.clone(), fe));
                FlatExpr::var(v, ty)
            };
            let p = FlatExpr::pre(var_expr).map_err(|k| ElabError::new(k, span))?;
            out.push((idx, p));
        }
        Ok(out)
    }
}

/// Evaluates `expr` as a compile-time integer constant: abstraction is
/// suppressed and the result must be a single scalar with an empty
/// pre-variable set and identical `init`/`step` integer literals.
pub(crate) fn eval_const_bigint(ctx: &TypingContext, expr: &Expr) -> Result<BigInt, ElabError> {
    let empty = IndexMap::new();
    let mut warnings = Vec::new();
    let mut ev = ExprEvaluator::new(ctx, &empty, None, &mut warnings);
    let fe = ev.eval_scalar(expr)?;
    match (&fe.init, &fe.step) {
        (Term::Int(a), Term::Int(b)) if a == b && fe.pre_vars.is_empty() => Ok(a.clone()),
        _ => Err(ElabError::constant_required(
            expr.span,
            format!("got '{fe}'"),
        )),
    }
}

fn scalar(fe: FlatExpr) -> IndexedExprs {
    vec![(IndexPath::empty(), fe)]
}

fn flatten_list<'e>(elems: &'e [Expr], out: &mut Vec<&'e Expr>) {
    for e in elems {
        match &e.node {
            ExprKind::List(inner) => flatten_list(inner, out),
            _ => out.push(e),
        }
    }
}

fn lower_binop(op: ast::BinaryOp) -> BinOp {
    match op {
        ast::BinaryOp::Add => BinOp::Add,
        ast::BinaryOp::Sub => BinOp::Sub,
        ast::BinaryOp::Mul => BinOp::Mul,
        ast::BinaryOp::Div => BinOp::Div,
        ast::BinaryOp::Mod => BinOp::Mod,
        ast::BinaryOp::And => BinOp::And,
        ast::BinaryOp::Or => BinOp::Or,
        ast::BinaryOp::Xor => BinOp::Xor,
        ast::BinaryOp::Implies => BinOp::Implies,
        ast::BinaryOp::Eq => BinOp::Eq,
        ast::BinaryOp::Ne => BinOp::Ne,
        ast::BinaryOp::Lt => BinOp::Lt,
        ast::BinaryOp::Le => BinOp::Le,
        ast::BinaryOp::Gt => BinOp::Gt,
        ast::BinaryOp::Ge => BinOp::Ge,
    }
}

/// Zips two indexed result lists, requiring indexes to align elementwise.
fn zip_exact(
    l: IndexedExprs,
    r: IndexedExprs,
    span: ast::Span,
    what: &str,
) -> Result<Vec<(IndexPath, FlatExpr, FlatExpr)>, ElabError> {
    if l.len() != r.len() {
        return Err(ElabError::type_mismatch(
            span,
            format!(
                "{what} applied to values of mismatched shape ({} versus {} components)",
                l.len(),
                r.len()
            ),
        ));
    }
    l.into_iter()
        .zip(r)
        .map(|((li, le), (ri, re))| {
            if li != ri {
                Err(ElabError::type_mismatch(
                    span,
                    format!("{what} applied to values of mismatched shape ('{li}' versus '{ri}')"),
                ))
            } else {
                Ok((li, le, re))
            }
        })
        .collect()
}
