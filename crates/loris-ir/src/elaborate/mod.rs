//! The elaboration pipeline: processes top-level declarations in order,
//! growing the typing context, and produces the flat program.

mod assemble;
mod call;
mod deps;
mod eval;
mod type_expand;

use indexmap::IndexMap;
use loris_dsl::ast;

use crate::context::TypingContext;
use crate::errors::{ElabError, ElabErrorKind, SpannedElabError};
use crate::flat_expr::FlatExpr;
use crate::ident::{Ident, Symbol};
use crate::node::{FlatNode, FlatProgram};
use crate::ty::Type;

use eval::ExprEvaluator;
use type_expand::expand_type;

/// Elaborates a parsed program into its flat form.
///
/// Declarations are processed in source order; a node may only call nodes
/// declared before it. A call to a node declared later fails with a
/// forward-reference diagnostic, a call to an unknown node with an
/// undeclared-node diagnostic.
pub fn elaborate(program: &ast::Program) -> Result<FlatProgram, ElabError> {
    let mut ctx = TypingContext::new();
    let mut nodes: IndexMap<Symbol, FlatNode> = IndexMap::new();
    let mut diagnostics = Vec::new();

    for (i, decl) in program.decls.iter().enumerate() {
        match &decl.node {
            ast::Decl::Type(td) => declare_type(&mut ctx, td)?,
            ast::Decl::Const(cd) => declare_const(&mut ctx, cd)?,
            ast::Decl::Node(nd) => {
                let sym = Symbol::from(&nd.name);
                if nodes.contains_key(&sym) {
                    return Err(ElabError::redeclaration(
                        decl.span,
                        format!("node '{}' is already declared", nd.name),
                    ));
                }
                let flat =
                    assemble::elaborate_node(&ctx, &nodes, nd, decl.span, &mut diagnostics)
                        .map_err(|err| refine_forward_reference(err, &program.decls[i + 1..]))?;
                tracing::debug!(node = %nd.name, equations = flat.equations.len(), "node elaborated");
                nodes.insert(sym, flat);
            }
        }
    }
    Ok(FlatProgram { nodes, diagnostics })
}

/// Elaborates a program and attaches source text to any failure, for
/// miette-rendered reporting.
pub fn elaborate_with_source(
    program: &ast::Program,
    source: &str,
    filename: &str,
) -> Result<FlatProgram, SpannedElabError> {
    elaborate(program).map_err(|err| err.with_source_context(source, filename))
}

/// A forward reference to a callee that never appears later in the program
/// is an undeclared node, not a forward reference.
fn refine_forward_reference(err: ElabError, rest: &[ast::Spanned<ast::Decl>]) -> ElabError {
    if let ElabErrorKind::ForwardReference { callee } = &err.kind {
        let declared_later = rest
            .iter()
            .any(|d| matches!(&d.node, ast::Decl::Node(n) if n.name == *callee));
        if !declared_later {
            return ElabError::undeclared(err.span, "node", callee.clone());
        }
    }
    err
}

fn declare_type(ctx: &mut TypingContext, td: &ast::TypeDecl) -> Result<(), ElabError> {
    ctx.check_declarable(&td.name, td.span)?;
    let sym = Symbol::from(&td.name);
    if ctx.type_in_context(&sym) {
        return Err(ElabError::redeclaration(
            td.span,
            format!("type '{}' is already declared", td.name),
        ));
    }
    match &td.def {
        None => {
            ctx.free_types.insert(sym);
        }
        Some(texpr) => {
            let leaves = expand_type(ctx, texpr, td.span)?;
            let base = Ident::new(sym);
            for (suffix, ty) in leaves {
                ctx.bind_type_leaf(base.with_suffix(&suffix), ty);
            }
        }
    }
    Ok(())
}

/// Processes a constant declaration in any of its three forms: typed with a
/// value, untyped with a value, or free (typed, no value).
pub(crate) fn declare_const(ctx: &mut TypingContext, cd: &ast::ConstDecl) -> Result<(), ElabError> {
    ctx.check_declarable(&cd.name, cd.span)?;
    let base = Ident::new(cd.name.as_str());
    if ctx.ident_in_context(&base) {
        return Err(ElabError::redeclaration(
            cd.span,
            format!("identifier '{}' is already declared", cd.name),
        ));
    }

    let declared = match &cd.ty {
        Some(texpr) => Some(expand_type(ctx, texpr, cd.span)?),
        None => None,
    };

    let Some(value) = &cd.value else {
        // Free constant: an abstract scalar symbol per leaf, no value.
        let Some(declared) = declared else {
            return Err(ElabError::type_mismatch(
                cd.span,
                format!("free constant '{}' must have a type", cd.name),
            ));
        };
        for (suffix, ty) in declared {
            ctx.bind_value(base.with_suffix(&suffix), ty);
        }
        return Ok(());
    };

    let values = {
        let empty = IndexMap::new();
        let mut warnings = Vec::new();
        let mut ev = ExprEvaluator::new(ctx, &empty, None, &mut warnings);
        ev.eval(value)?
    };
    for (_, fe) in &values {
        if fe.init != fe.step || !fe.pre_vars.is_empty() {
            return Err(ElabError::constant_required(
                value.span,
                format!("constant '{}' has a non-constant value", cd.name),
            ));
        }
    }

    match declared {
        Some(declared) => {
            if values.len() != declared.len() {
                return Err(ElabError::type_mismatch(
                    value.span,
                    format!(
                        "constant '{}' has {} leaves, its value provides {}",
                        cd.name,
                        declared.len(),
                        values.len()
                    ),
                ));
            }
            for ((didx, dty), (vidx, fe)) in declared.into_iter().zip(values) {
                if didx != vidx {
                    return Err(ElabError::type_mismatch(
                        value.span,
                        format!(
                            "constant '{}' shape mismatch: '{didx}' versus '{vidx}'",
                            cd.name
                        ),
                    ));
                }
                let fe = coerce_const(fe, &dty).ok_or_else(|| {
                    ElabError::type_mismatch(
                        value.span,
                        format!("constant '{}{didx}' expects {dty}", cd.name),
                    )
                })?;
                let full = base.with_suffix(&didx);
                ctx.bind_value(full.clone(), dty);
                ctx.consts.insert(full, fe);
            }
        }
        None => {
            for (suffix, fe) in values {
                let full = base.with_suffix(&suffix);
                ctx.bind_value(full.clone(), fe.ty.clone());
                ctx.consts.insert(full, fe);
            }
        }
    }
    Ok(())
}

/// Checks a constant value against its declared leaf type. An integer
/// literal narrows into a declared subrange when it lies within bounds.
fn coerce_const(fe: FlatExpr, declared: &Type) -> Option<FlatExpr> {
    if fe.ty.check_type(declared) {
        return Some(fe);
    }
    if let (Type::Int, Type::IntRange(lo, hi)) = (&fe.ty, declared) {
        if let crate::flat_expr::Term::Int(n) = &fe.step {
            if lo <= n && n <= hi {
                return Some(FlatExpr {
                    ty: declared.clone(),
                    ..fe
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ElabSeverity;
    use crate::flat_expr::Term;
    use crate::ident::IndexStep;
    use loris_dsl::ast::{
        BinaryOp, Contract, Decl, Expr, ExprKind, NodeDecl, Program, RecordField, Span, Spanned,
        Statement, TypeDecl, TypeExpr, VarGroup,
    };
    use num::BigInt;

    fn sp(n: usize) -> Span {
        Span::new(n, n + 1)
    }

    fn spanned<T>(node: T) -> Spanned<T> {
        Spanned::new(node, sp(0))
    }

    fn ident(name: &str) -> Expr {
        spanned(ExprKind::Ident(name.to_string()))
    }

    fn int(n: i64) -> Expr {
        spanned(ExprKind::IntLit(BigInt::from(n)))
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        spanned(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn pre(e: Expr) -> Expr {
        spanned(ExprKind::Pre(Box::new(e)))
    }

    fn arrow(init: Expr, step: Expr) -> Expr {
        spanned(ExprKind::Arrow {
            init: Box::new(init),
            step: Box::new(step),
        })
    }

    fn ite(cond: Expr, t: Expr, e: Expr) -> Expr {
        spanned(ExprKind::Ite {
            cond: Box::new(cond),
            then_branch: Box::new(t),
            else_branch: Box::new(e),
        })
    }

    fn var_group(names: &[&str], ty: TypeExpr) -> VarGroup {
        VarGroup {
            names: names.iter().map(|n| spanned(n.to_string())).collect(),
            ty,
            is_const: false,
            clock: None,
            span: sp(0),
        }
    }

    fn equation(targets: &[&str], rhs: Expr) -> Spanned<Statement> {
        spanned(Statement::Equation {
            targets: targets.iter().map(|t| spanned(t.to_string())).collect(),
            rhs,
        })
    }

    fn node_decl(
        name: &str,
        inputs: Vec<VarGroup>,
        outputs: Vec<VarGroup>,
        body: Vec<Spanned<Statement>>,
    ) -> Spanned<Decl> {
        spanned(Decl::Node(NodeDecl {
            name: name.to_string(),
            static_params: Vec::new(),
            inputs,
            outputs,
            contract: Contract::default(),
            locals: Vec::new(),
            body,
        }))
    }

    fn program(decls: Vec<Spanned<Decl>>) -> Program {
        Program { decls }
    }

    fn leaf(base: &str, fields: &[&str]) -> Ident {
        let mut id = Ident::new(base);
        for f in fields {
            id = id.push(IndexStep::Field((*f).into()));
        }
        id
    }

    #[test]
    fn basic_increment() {
        // node d(incr: bool) returns (out: int);
        //   out = 0 -> if incr then pre out + 1 else pre out;
        let body = equation(
            &["out"],
            arrow(
                int(0),
                ite(
                    ident("incr"),
                    binary(BinaryOp::Add, pre(ident("out")), int(1)),
                    pre(ident("out")),
                ),
            ),
        );
        let prog = program(vec![node_decl(
            "d",
            vec![var_group(&["incr"], TypeExpr::Bool)],
            vec![var_group(&["out"], TypeExpr::Int)],
            vec![body],
        )]);
        let flat = elaborate(&prog).unwrap();
        let node = &flat.nodes[&Symbol::from("d")];

        assert_eq!(node.equations.len(), 1);
        let eq = &node.equations[0];
        assert_eq!(eq.lhs, Ident::new("out"));
        assert_eq!(eq.rhs.init, Term::Int(BigInt::from(0)));
        assert!(matches!(eq.rhs.step, Term::Ite(_, _, _)));
        assert!(eq.rhs.pre_vars.contains(&Ident::new("out")));

        // out depends on input 0 (incr) at the current instant.
        assert_eq!(node.output_input_dep.len(), 1);
        assert!(node.output_input_dep[0].contains(&0));
        assert!(flat.diagnostics.is_empty());
    }

    #[test]
    fn record_flattening() {
        // type T = { a: int; b: bool };
        // node f(x: T) returns (y: T); y = x;
        let ty_decl = spanned(Decl::Type(TypeDecl {
            name: "T".to_string(),
            def: Some(TypeExpr::Record(vec![
                RecordField {
                    name: spanned("a".to_string()),
                    ty: TypeExpr::Int,
                },
                RecordField {
                    name: spanned("b".to_string()),
                    ty: TypeExpr::Bool,
                },
            ])),
            span: sp(0),
        }));
        let named_t = TypeExpr::Named(spanned("T".to_string()));
        let prog = program(vec![
            ty_decl,
            node_decl(
                "f",
                vec![var_group(&["x"], named_t.clone())],
                vec![var_group(&["y"], named_t)],
                vec![equation(&["y"], ident("x"))],
            ),
        ]);
        let flat = elaborate(&prog).unwrap();
        let node = &flat.nodes[&Symbol::from("f")];

        let input_leaves: Vec<_> = node.input_leaves().collect();
        assert_eq!(input_leaves.len(), 2);
        assert_eq!(input_leaves[0].0, leaf("x", &["a"]));
        assert_eq!(input_leaves[0].1, Type::Int);
        assert_eq!(input_leaves[1].0, leaf("x", &["b"]));
        assert_eq!(input_leaves[1].1, Type::Bool);

        assert_eq!(node.equations.len(), 2);
        assert_eq!(node.equations[0].lhs, leaf("y", &["a"]));
        assert_eq!(node.equations[0].rhs.step, Term::Var(leaf("x", &["a"])));
        assert_eq!(node.equations[1].lhs, leaf("y", &["b"]));
        assert_eq!(node.equations[1].rhs.step, Term::Var(leaf("x", &["b"])));
    }

    #[test]
    fn subrange_relaxation() {
        // node n(x: int) returns (o: subrange [0, 10] of int); o = x + 1;
        let subrange = TypeExpr::IntRange {
            low: Box::new(int(0)),
            high: Box::new(int(10)),
        };
        let prog = program(vec![node_decl(
            "n",
            vec![var_group(&["x"], TypeExpr::Int)],
            vec![var_group(&["o"], subrange)],
            vec![equation(&["o"], binary(BinaryOp::Add, ident("x"), int(1)))],
        )]);
        let flat = elaborate(&prog).unwrap();
        let node = &flat.nodes[&Symbol::from("n")];

        // o's recorded type is relaxed to Int.
        assert_eq!(node.outputs[0].leaves[0].1, Type::Int);
        // A range property was appended.
        assert_eq!(node.properties.len(), 1);
        let (name, prop) = &node.properties[0];
        assert_eq!(name.as_deref(), Some("o in [0, 10]"));
        assert_eq!(prop.ty, Type::Bool);
        assert!(matches!(prop.step, Term::Binary(crate::flat_expr::BinOp::And, _, _)));
        assert_eq!(node.equations.len(), 1);
    }

    #[test]
    fn pre_on_compound_expression_introduces_abstraction() {
        // node p(a, b: int) returns (y: int); y = pre (a + b);
        let prog = program(vec![node_decl(
            "p",
            vec![var_group(&["a", "b"], TypeExpr::Int)],
            vec![var_group(&["y"], TypeExpr::Int)],
            vec![equation(
                &["y"],
                pre(binary(BinaryOp::Add, ident("a"), ident("b"))),
            )],
        )]);
        let flat = elaborate(&prog).unwrap();
        let node = &flat.nodes[&Symbol::from("p")];

        let abs = Ident::new("__abs").push(IndexStep::Position(0));
        assert_eq!(node.locals.get(&abs), Some(&Type::Int));
        assert_eq!(node.equations.len(), 2);

        let abs_eq = node.equation_for(&abs).unwrap();
        assert!(matches!(abs_eq.rhs.step, Term::Binary(crate::flat_expr::BinOp::Add, _, _)));
        let y_eq = node.equation_for(&Ident::new("y")).unwrap();
        assert_eq!(y_eq.rhs.step, Term::Pre(abs.clone()));
        assert_eq!(y_eq.rhs.init, Term::Undef);

        // The pre is unguarded: a warning, not an error.
        assert_eq!(flat.diagnostics.len(), 1);
        assert_eq!(flat.diagnostics[0].severity, ElabSeverity::Warning);
        assert_eq!(flat.diagnostics[0].code, "unguarded_pre");
    }

    #[test]
    fn forward_reference_is_distinguished() {
        // node top(x: int) returns (z: int); z = lower(x);  -- lower later
        let call = spanned(ExprKind::Call {
            node: Spanned::new("lower".to_string(), sp(7)),
            args: vec![ident("x")],
        });
        let top = node_decl(
            "top",
            vec![var_group(&["x"], TypeExpr::Int)],
            vec![var_group(&["z"], TypeExpr::Int)],
            vec![equation(&["z"], call)],
        );
        let lower = node_decl(
            "lower",
            vec![var_group(&["a"], TypeExpr::Int)],
            vec![var_group(&["r"], TypeExpr::Int)],
            vec![equation(&["r"], ident("a"))],
        );
        let err = elaborate(&program(vec![top.clone(), lower])).unwrap_err();
        assert!(err.is_forward_reference());
        assert_eq!(err.to_string(), "forward reference to node 'lower'");
        assert_eq!(err.span, sp(7));

        // Without the later declaration the same call is an undeclared node.
        let err = elaborate(&program(vec![top])).unwrap_err();
        assert!(!err.is_forward_reference());
        assert_eq!(err.to_string(), "Undeclared node 'lower'");
    }

    #[test]
    fn fby_is_rejected_with_position() {
        let fby = Spanned::new(
            ExprKind::Fby(vec![ident("x"), int(1), int(0)]),
            sp(42),
        );
        let prog = program(vec![node_decl(
            "m",
            vec![var_group(&["x"], TypeExpr::Int)],
            vec![var_group(&["y"], TypeExpr::Int)],
            vec![equation(&["y"], fby)],
        )]);
        let err = elaborate(&prog).unwrap_err();
        assert_eq!(err.to_string(), "Fby operator not implemented");
        assert_eq!(err.span, sp(42));
        assert!(matches!(err.kind, ElabErrorKind::Unsupported { .. }));
    }

    #[test]
    fn calls_are_extracted_with_fresh_returns() {
        // node dbl(v: int) returns (w: int); w = v + v;
        // node use(x: int) returns (y, z: int); y = dbl(x); z = dbl(y);
        let dbl = node_decl(
            "dbl",
            vec![var_group(&["v"], TypeExpr::Int)],
            vec![var_group(&["w"], TypeExpr::Int)],
            vec![equation(&["w"], binary(BinaryOp::Add, ident("v"), ident("v")))],
        );
        let call = |arg: Expr| {
            spanned(ExprKind::Call {
                node: spanned("dbl".to_string()),
                args: vec![arg],
            })
        };
        let user = node_decl(
            "use",
            vec![var_group(&["x"], TypeExpr::Int)],
            vec![var_group(&["y", "z"], TypeExpr::Int)],
            vec![
                equation(&["y"], call(ident("x"))),
                equation(&["z"], call(ident("y"))),
            ],
        );
        let flat = elaborate(&program(vec![dbl, user])).unwrap();
        let node = &flat.nodes[&Symbol::from("use")];

        assert_eq!(node.calls.len(), 2);
        let first = &node.calls[0];
        assert_eq!(first.callee, Symbol::from("dbl"));
        assert_eq!(first.outputs.len(), 1);
        assert_eq!(first.outputs[0].0.to_string(), "dbl.__returns.0.w");
        assert_eq!(first.activation.step, Term::Bool(true));
        assert!(first.defaults.is_empty());
        assert_eq!(node.calls[1].outputs[0].0.to_string(), "dbl.__returns.1.w");

        // Bound outputs are registered as locals.
        assert!(node.locals.contains_key(&first.outputs[0].0));

        // z depends on y's call, which depends on x: both outputs reach input 0.
        assert_eq!(node.output_input_dep.len(), 2);
        assert!(node.output_input_dep[0].contains(&0));
        assert!(node.output_input_dep[1].contains(&0));
    }

    #[test]
    fn condact_records_activation_and_defaults() {
        let dbl = node_decl(
            "dbl",
            vec![var_group(&["v"], TypeExpr::Int)],
            vec![var_group(&["w"], TypeExpr::Int)],
            vec![equation(&["w"], binary(BinaryOp::Add, ident("v"), ident("v")))],
        );
        let condact = spanned(ExprKind::Condact {
            clock: Box::new(ident("c")),
            node: spanned("dbl".to_string()),
            args: vec![ident("x")],
            defaults: vec![int(0)],
        });
        let user = node_decl(
            "u",
            vec![
                var_group(&["c"], TypeExpr::Bool),
                var_group(&["x"], TypeExpr::Int),
            ],
            vec![var_group(&["y"], TypeExpr::Int)],
            vec![equation(&["y"], condact)],
        );
        let flat = elaborate(&program(vec![dbl, user])).unwrap();
        let node = &flat.nodes[&Symbol::from("u")];

        let call = &node.calls[0];
        assert_eq!(call.activation.step, Term::Var(Ident::new("c")));
        assert_eq!(call.defaults.len(), 1);
        assert_eq!(call.defaults[0].step, Term::Int(BigInt::from(0)));

        // The bound output depends on the activation condition.
        assert!(node.output_input_dep[0].contains(&0));
    }

    #[test]
    fn cyclic_dependency_is_fatal() {
        // a = b; b = a;
        let prog = program(vec![node_decl(
            "c",
            vec![],
            vec![var_group(&["a", "b"], TypeExpr::Int)],
            vec![
                equation(&["a"], ident("b")),
                equation(&["b"], ident("a")),
            ],
        )]);
        let err = elaborate(&prog).unwrap_err();
        assert!(matches!(err.kind, ElabErrorKind::CyclicDependency { .. }));
        assert!(err.to_string().contains("a, b"));

        // Breaking the cycle with pre makes it legal.
        let prog = program(vec![node_decl(
            "c",
            vec![],
            vec![var_group(&["a", "b"], TypeExpr::Int)],
            vec![
                equation(&["a"], arrow(int(0), pre(ident("b")))),
                equation(&["b"], ident("a")),
            ],
        )]);
        let flat = elaborate(&prog).unwrap();
        let node = &flat.nodes[&Symbol::from("c")];
        // a's equation no longer depends on b at the current instant, so it
        // sorts first.
        assert_eq!(node.equations[0].lhs, Ident::new("a"));
        assert_eq!(node.equations[1].lhs, Ident::new("b"));
    }

    #[test]
    fn equations_sort_in_dependency_order() {
        // y = z + 1; z = x; (z's equation must come first)
        let prog = program(vec![node_decl(
            "s",
            vec![var_group(&["x"], TypeExpr::Int)],
            vec![var_group(&["y"], TypeExpr::Int)],
            vec![
                equation(&["y"], binary(BinaryOp::Add, ident("z"), int(1))),
                equation(&["z"], ident("x")),
            ],
        )]);
        // z is a local.
        let mut prog = prog;
        if let Decl::Node(n) = &mut prog.decls[0].node {
            n.locals
                .push(ast::LocalDecl::Var(var_group(&["z"], TypeExpr::Int)));
        }
        let flat = elaborate(&prog).unwrap();
        let node = &flat.nodes[&Symbol::from("s")];
        assert_eq!(node.equations[0].lhs, Ident::new("z"));
        assert_eq!(node.equations[1].lhs, Ident::new("y"));
    }

    #[test]
    fn elaboration_is_deterministic() {
        let build = || {
            let ty_decl = spanned(Decl::Type(TypeDecl {
                name: "T".to_string(),
                def: Some(TypeExpr::Record(vec![
                    RecordField {
                        name: spanned("a".to_string()),
                        ty: TypeExpr::Int,
                    },
                    RecordField {
                        name: spanned("b".to_string()),
                        ty: TypeExpr::Bool,
                    },
                ])),
                span: sp(0),
            }));
            let named_t = TypeExpr::Named(spanned("T".to_string()));
            program(vec![
                ty_decl,
                node_decl(
                    "f",
                    vec![var_group(&["x"], named_t.clone())],
                    vec![var_group(&["y"], named_t)],
                    vec![equation(
                        &["y"],
                        pre(ident("x")),
                    )],
                ),
            ])
        };
        let first = elaborate(&build()).unwrap();
        let second = elaborate(&build()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn reserved_identifiers_are_rejected() {
        let prog = program(vec![node_decl(
            "r",
            vec![var_group(&["__abs"], TypeExpr::Int)],
            vec![var_group(&["y"], TypeExpr::Int)],
            vec![equation(&["y"], int(0))],
        )]);
        let err = elaborate(&prog).unwrap_err();
        assert!(matches!(err.kind, ElabErrorKind::Redeclaration { .. }));
    }

    #[test]
    fn clocked_inputs_are_rejected() {
        let mut group = var_group(&["x"], TypeExpr::Int);
        group.clock = Some(spanned("clk".to_string()));
        let prog = program(vec![node_decl(
            "k",
            vec![group],
            vec![var_group(&["y"], TypeExpr::Int)],
            vec![equation(&["y"], int(0))],
        )]);
        let err = elaborate(&prog).unwrap_err();
        assert!(matches!(err.kind, ElabErrorKind::Unsupported { .. }));
    }

    #[test]
    fn parametric_nodes_are_rejected() {
        let mut prog = program(vec![node_decl("g", vec![], vec![], vec![])]);
        if let Decl::Node(n) = &mut prog.decls[0].node {
            n.static_params.push(spanned("N".to_string()));
        }
        let err = elaborate(&prog).unwrap_err();
        assert_eq!(err.to_string(), "Parametric nodes are not implemented");
    }

    #[test]
    fn constants_fold_into_expressions() {
        // const k: int = 3; node c() returns (y: int); y = k + 1;
        let const_decl = spanned(Decl::Const(ast::ConstDecl {
            name: "k".to_string(),
            ty: Some(TypeExpr::Int),
            value: Some(int(3)),
            span: sp(0),
        }));
        let prog = program(vec![
            const_decl,
            node_decl(
                "c",
                vec![],
                vec![var_group(&["y"], TypeExpr::Int)],
                vec![equation(&["y"], binary(BinaryOp::Add, ident("k"), int(1)))],
            ),
        ]);
        let flat = elaborate(&prog).unwrap();
        let node = &flat.nodes[&Symbol::from("c")];
        assert_eq!(node.equations[0].rhs.step, Term::Int(BigInt::from(4)));
    }

    #[test]
    fn free_constants_stay_symbolic() {
        let const_decl = spanned(Decl::Const(ast::ConstDecl {
            name: "limit".to_string(),
            ty: Some(TypeExpr::Int),
            value: None,
            span: sp(0),
        }));
        let prog = program(vec![
            const_decl,
            node_decl(
                "c",
                vec![],
                vec![var_group(&["y"], TypeExpr::Int)],
                vec![equation(&["y"], ident("limit"))],
            ),
        ]);
        let flat = elaborate(&prog).unwrap();
        let node = &flat.nodes[&Symbol::from("c")];
        assert_eq!(node.equations[0].rhs.step, Term::Var(Ident::new("limit")));
    }

    #[test]
    fn array_size_must_be_constant() {
        // node a(n: int) returns (y: int ^ n); -- n is not a constant
        let arr = TypeExpr::Array {
            elem: Box::new(TypeExpr::Int),
            size: Box::new(ident("n")),
        };
        let prog = program(vec![node_decl(
            "a",
            vec![var_group(&["n"], TypeExpr::Int)],
            vec![var_group(&["y"], arr)],
            vec![],
        )]);
        let err = elaborate(&prog).unwrap_err();
        assert!(matches!(err.kind, ElabErrorKind::ConstantRequired { .. }));
    }

    #[test]
    fn guarded_pre_produces_no_warning() {
        let prog = program(vec![node_decl(
            "g",
            vec![],
            vec![var_group(&["y"], TypeExpr::Int)],
            vec![equation(&["y"], arrow(int(0), pre(ident("y"))))],
        )]);
        let flat = elaborate(&prog).unwrap();
        assert!(flat.diagnostics.is_empty());
    }

    #[test]
    fn main_annotation_sets_entry_flag() {
        let prog = program(vec![node_decl(
            "m",
            vec![],
            vec![var_group(&["y"], TypeExpr::Int)],
            vec![spanned(Statement::Main), equation(&["y"], int(1))],
        )]);
        let flat = elaborate(&prog).unwrap();
        assert!(flat.nodes[&Symbol::from("m")].is_main);
        assert_eq!(flat.main_node().map(|n| n.name.clone()), Some("m".into()));
    }

    #[test]
    fn non_boolean_assert_is_a_type_mismatch() {
        let prog = program(vec![node_decl(
            "b",
            vec![],
            vec![var_group(&["y"], TypeExpr::Int)],
            vec![
                spanned(Statement::Assert(int(1))),
                equation(&["y"], int(0)),
            ],
        )]);
        let err = elaborate(&prog).unwrap_err();
        assert!(matches!(err.kind, ElabErrorKind::TypeMismatch { .. }));
    }
}
