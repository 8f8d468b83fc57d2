//! Proptest strategies for generating well-formed expression trees, used by
//! the determinism and constant-folding property tests.

use loris_dsl::ast::{BinaryOp, Expr, ExprKind, Span, Spanned, UnaryOp};
use num::BigInt;
use proptest::prelude::*;

fn spanned(kind: ExprKind) -> Expr {
    Spanned::new(kind, Span::new(0, 0))
}

fn arb_fold_binop() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::Add),
        Just(BinaryOp::Sub),
        Just(BinaryOp::Mul),
    ]
}

/// Integer expression trees over the given variable names (must be
/// non-empty). May contain `pre` and `->`, so generated trees exercise the
/// abstraction machinery.
pub fn arb_int_expr(vars: Vec<String>) -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (-1000i64..1000).prop_map(|n| spanned(ExprKind::IntLit(BigInt::from(n)))),
        proptest::sample::select(vars).prop_map(|v| spanned(ExprKind::Ident(v))),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (arb_fold_binop(), inner.clone(), inner.clone()).prop_map(|(op, l, r)| {
                spanned(ExprKind::Binary {
                    op,
                    lhs: Box::new(l),
                    rhs: Box::new(r),
                })
            }),
            inner.clone().prop_map(|x| spanned(ExprKind::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(x),
            })),
            inner.clone().prop_map(|x| spanned(ExprKind::Pre(Box::new(x)))),
            (inner.clone(), inner).prop_map(|(a, b)| spanned(ExprKind::Arrow {
                init: Box::new(a),
                step: Box::new(b),
            })),
        ]
    })
}

/// Literal-only integer expressions built from operators that always fold.
pub fn arb_const_int_expr() -> impl Strategy<Value = Expr> {
    let leaf = (-1000i64..1000).prop_map(|n| spanned(ExprKind::IntLit(BigInt::from(n))));
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (arb_fold_binop(), inner.clone(), inner.clone()).prop_map(|(op, l, r)| {
                spanned(ExprKind::Binary {
                    op,
                    lhs: Box::new(l),
                    rhs: Box::new(r),
                })
            }),
            inner.prop_map(|x| spanned(ExprKind::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(x),
            })),
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elaborate::elaborate;
    use crate::flat_expr::Term;
    use crate::ident::Symbol;
    use loris_dsl::ast::{Contract, Decl, NodeDecl, Program, Statement, TypeExpr, VarGroup};

    fn int_node_program(rhs: Expr) -> Program {
        let group = |names: &[&str]| VarGroup {
            names: names
                .iter()
                .map(|n| Spanned::new(n.to_string(), Span::new(0, 0)))
                .collect(),
            ty: TypeExpr::Int,
            is_const: false,
            clock: None,
            span: Span::new(0, 0),
        };
        Program {
            decls: vec![Spanned::new(
                Decl::Node(NodeDecl {
                    name: "n".to_string(),
                    static_params: Vec::new(),
                    inputs: vec![group(&["x"])],
                    outputs: vec![group(&["y"])],
                    contract: Contract::default(),
                    locals: Vec::new(),
                    body: vec![Spanned::new(
                        Statement::Equation {
                            targets: vec![Spanned::new("y".to_string(), Span::new(0, 0))],
                            rhs,
                        },
                        Span::new(0, 0),
                    )],
                }),
                Span::new(0, 0),
            )],
        }
    }

    proptest! {
        /// Two elaborations of equal ASTs produce structurally equal
        /// outputs, including fresh-variable numbering and equation order.
        #[test]
        fn elaboration_is_deterministic(expr in arb_int_expr(vec!["x".to_string()])) {
            let first = elaborate(&int_node_program(expr.clone()));
            let second = elaborate(&int_node_program(expr));
            prop_assert_eq!(first, second);
        }

        /// Every equation of an elaborated node is scalar-typed and its
        /// left-hand side is owned by the node.
        #[test]
        fn flatness_and_ownership(expr in arb_int_expr(vec!["x".to_string()])) {
            if let Ok(flat) = elaborate(&int_node_program(expr)) {
                let node = &flat.nodes[&Symbol::from("n")];
                for eq in &node.equations {
                    prop_assert!(eq.rhs.ty.is_scalar());
                    let owned = node.output_leaves().any(|(id, _)| *id == eq.lhs)
                        || node.input_leaves().any(|(id, _)| *id == eq.lhs)
                        || node.locals.contains_key(&eq.lhs);
                    prop_assert!(owned, "unowned equation target {}", eq.lhs);
                }
            }
        }

        /// Literal-only operand trees fold to a single literal with
        /// identical init and step terms.
        #[test]
        fn constant_folding_closure(expr in arb_const_int_expr()) {
            let flat = elaborate(&int_node_program(expr)).unwrap();
            let node = &flat.nodes[&Symbol::from("n")];
            let eq = &node.equations[0];
            prop_assert_eq!(&eq.rhs.init, &eq.rhs.step);
            prop_assert!(matches!(eq.rhs.step, Term::Int(_)));
        }
    }
}
