//! Two-state flat expressions.
//!
//! A [`FlatExpr`] is a scalar-typed expression decomposed into an
//! initial-instant term and a step term over the base clock. Every
//! constructor checks the operator's typing rule and simplifies at
//! construction: literal operands fold, Boolean identity laws apply, and
//! `->` distributes so the result is always `init -> step`.

use std::collections::BTreeSet;
use std::fmt;

use num::{BigInt, BigRational, Zero};

use crate::errors::ElabErrorKind;
use crate::ident::{Ident, Symbol};
use crate::ty::Type;

/// Unary primitive operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    ToInt,
    ToReal,
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Not => write!(f, "not"),
            UnOp::ToInt => write!(f, "int"),
            UnOp::ToReal => write!(f, "real"),
        }
    }
}

/// Binary primitive operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Implies,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    fn is_boolean(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or | BinOp::Xor | BinOp::Implies)
    }

    fn is_ordering(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }

    fn is_equality(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "div"),
            BinOp::Mod => write!(f, "mod"),
            BinOp::And => write!(f, "and"),
            BinOp::Or => write!(f, "or"),
            BinOp::Xor => write!(f, "xor"),
            BinOp::Implies => write!(f, "=>"),
            BinOp::Eq => write!(f, "="),
            BinOp::Ne => write!(f, "<>"),
            BinOp::Lt => write!(f, "<"),
            BinOp::Le => write!(f, "<="),
            BinOp::Gt => write!(f, ">"),
            BinOp::Ge => write!(f, ">="),
        }
    }
}

/// A single instant's term.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Base-clock variable reference.
    Var(Ident),
    /// Previous-instant value of a state variable.
    Pre(Ident),
    Bool(bool),
    Int(BigInt),
    Real(BigRational),
    /// Enum constructor value.
    EnumConst(Symbol),
    /// Undefined first-instant placeholder produced by `pre`.
    Undef,
    Unary(UnOp, Box<Term>),
    Binary(BinOp, Box<Term>, Box<Term>),
    Ite(Box<Term>, Box<Term>, Box<Term>),
}

impl Term {
    fn as_bool(&self) -> Option<bool> {
        match self {
            Term::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn as_int(&self) -> Option<&BigInt> {
        match self {
            Term::Int(n) => Some(n),
            _ => None,
        }
    }

    fn as_real(&self) -> Option<&BigRational> {
        match self {
            Term::Real(r) => Some(r),
            _ => None,
        }
    }

    /// Collects the variables read at the current instant, i.e. every
    /// `Var` occurrence; `Pre` reads are excluded.
    pub fn collect_current_vars(&self, out: &mut BTreeSet<Ident>) {
        match self {
            Term::Var(v) => {
                out.insert(v.clone());
            }
            Term::Pre(_)
            | Term::Bool(_)
            | Term::Int(_)
            | Term::Real(_)
            | Term::EnumConst(_)
            | Term::Undef => {}
            Term::Unary(_, a) => a.collect_current_vars(out),
            Term::Binary(_, a, b) => {
                a.collect_current_vars(out);
                b.collect_current_vars(out);
            }
            Term::Ite(c, t, e) => {
                c.collect_current_vars(out);
                t.collect_current_vars(out);
                e.collect_current_vars(out);
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(v) => write!(f, "{v}"),
            Term::Pre(v) => write!(f, "pre {v}"),
            Term::Bool(b) => write!(f, "{b}"),
            Term::Int(n) => write!(f, "{n}"),
            Term::Real(r) => write!(f, "{r}"),
            Term::EnumConst(c) => write!(f, "{c}"),
            Term::Undef => write!(f, "_"),
            Term::Unary(op, a) => write!(f, "({op} {a})"),
            Term::Binary(op, a, b) => write!(f, "({a} {op} {b})"),
            Term::Ite(c, t, e) => write!(f, "(if {c} then {t} else {e})"),
        }
    }
}

fn mk_unary(op: UnOp, a: Term) -> Term {
    match (op, &a) {
        (UnOp::Neg, Term::Int(n)) => Term::Int(-n.clone()),
        (UnOp::Neg, Term::Real(r)) => Term::Real(-r.clone()),
        (UnOp::Neg, Term::Unary(UnOp::Neg, inner)) => (**inner).clone(),
        (UnOp::Not, Term::Bool(b)) => Term::Bool(!b),
        (UnOp::Not, Term::Unary(UnOp::Not, inner)) => (**inner).clone(),
        (UnOp::ToInt, Term::Real(r)) => Term::Int(r.trunc().to_integer()),
        (UnOp::ToInt, Term::Int(_)) => a,
        (UnOp::ToReal, Term::Int(n)) => Term::Real(BigRational::from_integer(n.clone())),
        (UnOp::ToReal, Term::Real(_)) => a,
        _ => Term::Unary(op, Box::new(a)),
    }
}

fn mk_binary(op: BinOp, a: Term, b: Term) -> Term {
    // Literal folding.
    if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
        match op {
            BinOp::Add => return Term::Int(x + y),
            BinOp::Sub => return Term::Int(x - y),
            BinOp::Mul => return Term::Int(x * y),
            BinOp::Div if !y.is_zero() => return Term::Int(x / y),
            BinOp::Mod if !y.is_zero() => return Term::Int(x % y),
            BinOp::Eq => return Term::Bool(x == y),
            BinOp::Ne => return Term::Bool(x != y),
            BinOp::Lt => return Term::Bool(x < y),
            BinOp::Le => return Term::Bool(x <= y),
            BinOp::Gt => return Term::Bool(x > y),
            BinOp::Ge => return Term::Bool(x >= y),
            _ => {}
        }
    }
    if let (Some(x), Some(y)) = (a.as_real(), b.as_real()) {
        match op {
            BinOp::Add => return Term::Real(x + y),
            BinOp::Sub => return Term::Real(x - y),
            BinOp::Mul => return Term::Real(x * y),
            BinOp::Div if !y.is_zero() => return Term::Real(x / y),
            BinOp::Eq => return Term::Bool(x == y),
            BinOp::Ne => return Term::Bool(x != y),
            BinOp::Lt => return Term::Bool(x < y),
            BinOp::Le => return Term::Bool(x <= y),
            BinOp::Gt => return Term::Bool(x > y),
            BinOp::Ge => return Term::Bool(x >= y),
            _ => {}
        }
    }
    if let (Some(x), Some(y)) = (a.as_bool(), b.as_bool()) {
        match op {
            BinOp::And => return Term::Bool(x && y),
            BinOp::Or => return Term::Bool(x || y),
            BinOp::Xor => return Term::Bool(x ^ y),
            BinOp::Implies => return Term::Bool(!x || y),
            BinOp::Eq => return Term::Bool(x == y),
            BinOp::Ne => return Term::Bool(x != y),
            _ => {}
        }
    }
    if let (Term::EnumConst(x), Term::EnumConst(y)) = (&a, &b) {
        match op {
            BinOp::Eq => return Term::Bool(x == y),
            BinOp::Ne => return Term::Bool(x != y),
            _ => {}
        }
    }

    // Identity and annihilator laws for the Boolean connectives.
    match (op, a.as_bool(), b.as_bool()) {
        (BinOp::And, Some(true), _) => return b,
        (BinOp::And, _, Some(true)) => return a,
        (BinOp::And, Some(false), _) | (BinOp::And, _, Some(false)) => return Term::Bool(false),
        (BinOp::Or, Some(false), _) => return b,
        (BinOp::Or, _, Some(false)) => return a,
        (BinOp::Or, Some(true), _) | (BinOp::Or, _, Some(true)) => return Term::Bool(true),
        (BinOp::Xor, Some(false), _) => return b,
        (BinOp::Xor, _, Some(false)) => return a,
        (BinOp::Xor, Some(true), _) => return mk_unary(UnOp::Not, b),
        (BinOp::Xor, _, Some(true)) => return mk_unary(UnOp::Not, a),
        (BinOp::Implies, Some(true), _) => return b,
        (BinOp::Implies, Some(false), _) => return Term::Bool(true),
        (BinOp::Implies, _, Some(true)) => return Term::Bool(true),
        (BinOp::Implies, _, Some(false)) => return mk_unary(UnOp::Not, a),
        _ => {}
    }

    Term::Binary(op, Box::new(a), Box::new(b))
}

fn mk_ite(c: Term, t: Term, e: Term) -> Term {
    match c.as_bool() {
        Some(true) => return t,
        Some(false) => return e,
        None => {}
    }
    if t == e {
        return t;
    }
    Term::Ite(Box::new(c), Box::new(t), Box::new(e))
}

/// A scalar-typed expression in initial/step normal form.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatExpr {
    pub ty: Type,
    pub init: Term,
    pub step: Term,
    /// State variables this expression reads through `pre`, transitively.
    pub pre_vars: BTreeSet<Ident>,
}

impl FlatExpr {
    /// Base-clock variable reference; `init == step`.
    pub fn var(ident: Ident, ty: Type) -> FlatExpr {
        FlatExpr {
            ty,
            init: Term::Var(ident.clone()),
            step: Term::Var(ident),
            pre_vars: BTreeSet::new(),
        }
    }

    pub fn bool_lit(b: bool) -> FlatExpr {
        FlatExpr {
            ty: Type::Bool,
            init: Term::Bool(b),
            step: Term::Bool(b),
            pre_vars: BTreeSet::new(),
        }
    }

    pub fn int_lit(n: BigInt) -> FlatExpr {
        FlatExpr {
            ty: Type::Int,
            init: Term::Int(n.clone()),
            step: Term::Int(n),
            pre_vars: BTreeSet::new(),
        }
    }

    pub fn real_lit(r: BigRational) -> FlatExpr {
        FlatExpr {
            ty: Type::Real,
            init: Term::Real(r.clone()),
            step: Term::Real(r),
            pre_vars: BTreeSet::new(),
        }
    }

    /// Enum constructor value of the given enum type.
    pub fn enum_lit(ctor: Symbol, ty: Type) -> FlatExpr {
        FlatExpr {
            ty,
            init: Term::EnumConst(ctor.clone()),
            step: Term::EnumConst(ctor),
            pre_vars: BTreeSet::new(),
        }
    }

    /// `Some(v)` iff this expression is exactly a variable reference.
    pub fn as_var_ref(&self) -> Option<&Ident> {
        match (&self.init, &self.step) {
            (Term::Var(a), Term::Var(b)) if a == b => Some(a),
            _ => None,
        }
    }

    /// Variables read by the step term at the current instant.
    pub fn step_current_vars(&self) -> BTreeSet<Ident> {
        let mut out = BTreeSet::new();
        self.step.collect_current_vars(&mut out);
        out
    }

    pub fn unary(op: UnOp, e: FlatExpr) -> Result<FlatExpr, ElabErrorKind> {
        let ty = match op {
            UnOp::Neg => {
                if !e.ty.is_numeric() {
                    return Err(mismatch(format!("operator '-' expects a numeric operand, got {}", e.ty)));
                }
                if e.ty.is_integer() {
                    Type::Int
                } else {
                    Type::Real
                }
            }
            UnOp::Not => {
                if e.ty != Type::Bool {
                    return Err(mismatch(format!("operator 'not' expects bool, got {}", e.ty)));
                }
                Type::Bool
            }
            UnOp::ToInt => {
                if e.ty.is_integer() {
                    return Ok(e);
                }
                if e.ty != Type::Real {
                    return Err(mismatch(format!("'int' conversion expects real, got {}", e.ty)));
                }
                Type::Int
            }
            UnOp::ToReal => {
                if e.ty == Type::Real {
                    return Ok(e);
                }
                if !e.ty.is_integer() {
                    return Err(mismatch(format!("'real' conversion expects int, got {}", e.ty)));
                }
                Type::Real
            }
        };
        Ok(FlatExpr {
            ty,
            init: mk_unary(op, e.init),
            step: mk_unary(op, e.step),
            pre_vars: e.pre_vars,
        })
    }

    pub fn binary(op: BinOp, l: FlatExpr, r: FlatExpr) -> Result<FlatExpr, ElabErrorKind> {
        let ty = if op.is_boolean() {
            if l.ty != Type::Bool || r.ty != Type::Bool {
                return Err(mismatch(format!(
                    "operator '{op}' expects bool operands, got {} and {}",
                    l.ty, r.ty
                )));
            }
            Type::Bool
        } else if op.is_ordering() {
            if !(l.ty.is_integer() && r.ty.is_integer()) && !(l.ty == Type::Real && r.ty == Type::Real)
            {
                return Err(mismatch(format!(
                    "operator '{op}' expects numeric operands of the same kind, got {} and {}",
                    l.ty, r.ty
                )));
            }
            Type::Bool
        } else if op.is_equality() {
            let compatible = l.ty == r.ty || (l.ty.is_integer() && r.ty.is_integer());
            if !compatible {
                return Err(mismatch(format!(
                    "operator '{op}' expects operands of the same type, got {} and {}",
                    l.ty, r.ty
                )));
            }
            Type::Bool
        } else if op == BinOp::Mod {
            if !(l.ty.is_integer() && r.ty.is_integer()) {
                return Err(mismatch(format!(
                    "operator 'mod' expects integer operands, got {} and {}",
                    l.ty, r.ty
                )));
            }
            Type::Int
        } else {
            // Add, Sub, Mul, Div.
            if l.ty.is_integer() && r.ty.is_integer() {
                Type::Int
            } else if l.ty == Type::Real && r.ty == Type::Real {
                Type::Real
            } else {
                return Err(mismatch(format!(
                    "operator '{op}' expects numeric operands of the same kind, got {} and {}",
                    l.ty, r.ty
                )));
            }
        };
        let mut pre_vars = l.pre_vars;
        pre_vars.extend(r.pre_vars);
        Ok(FlatExpr {
            ty,
            init: mk_binary(op, l.init, r.init),
            step: mk_binary(op, l.step, r.step),
            pre_vars,
        })
    }

    pub fn ite(c: FlatExpr, t: FlatExpr, e: FlatExpr) -> Result<FlatExpr, ElabErrorKind> {
        if c.ty != Type::Bool {
            return Err(mismatch(format!(
                "condition of if-then-else must be bool, got {}",
                c.ty
            )));
        }
        let ty = t.ty.widen(&e.ty).ok_or_else(|| {
            mismatch(format!(
                "branches of if-then-else have incompatible types {} and {}",
                t.ty, e.ty
            ))
        })?;
        let mut pre_vars = c.pre_vars;
        pre_vars.extend(t.pre_vars);
        pre_vars.extend(e.pre_vars);
        Ok(FlatExpr {
            ty,
            init: mk_ite(c.init, t.init, e.init),
            step: mk_ite(c.step, t.step, e.step),
            pre_vars,
        })
    }

    /// `pre v`. Accepts only a flat variable reference; the evaluator
    /// abstracts any other argument to a fresh variable first.
    pub fn pre(e: FlatExpr) -> Result<FlatExpr, ElabErrorKind> {
        let v = e
            .as_var_ref()
            .ok_or_else(|| mismatch("'pre' expects a variable reference".to_string()))?
            .clone();
        let mut pre_vars = e.pre_vars;
        pre_vars.insert(v.clone());
        Ok(FlatExpr {
            ty: e.ty,
            init: Term::Undef,
            step: Term::Pre(v),
            pre_vars,
        })
    }

    /// `a -> b`: the initial instant of `a`, the steps of `b`.
    pub fn arrow(a: FlatExpr, b: FlatExpr) -> Result<FlatExpr, ElabErrorKind> {
        let ty = a.ty.widen(&b.ty).ok_or_else(|| {
            mismatch(format!(
                "operands of '->' have incompatible types {} and {}",
                a.ty, b.ty
            ))
        })?;
        let mut pre_vars = a.pre_vars;
        pre_vars.extend(b.pre_vars);
        Ok(FlatExpr {
            ty,
            init: a.init,
            step: b.step,
            pre_vars,
        })
    }
}

impl fmt::Display for FlatExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.init == self.step {
            write!(f, "{}", self.step)
        } else {
            write!(f, "{} -> {}", self.init, self.step)
        }
    }
}

fn mismatch(message: String) -> ElabErrorKind {
    ElabErrorKind::TypeMismatch { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::Ident;
    use num::Signed;

    /// The remainder folded here matches the sign of the dividend, which is
    /// what `num::BigInt` guarantees.
    fn mod_matches_dividend_sign(a: i64, b: i64) -> bool {
        let r = BigInt::from(a) % BigInt::from(b);
        r.is_zero() || (r.is_negative() == (a < 0))
    }

    fn int(n: i64) -> FlatExpr {
        FlatExpr::int_lit(BigInt::from(n))
    }

    fn var(name: &str, ty: Type) -> FlatExpr {
        FlatExpr::var(Ident::new(name), ty)
    }

    #[test]
    fn literals_have_equal_init_and_step() {
        let e = int(42);
        assert_eq!(e.init, e.step);
        let e = FlatExpr::bool_lit(true);
        assert_eq!(e.init, e.step);
    }

    #[test]
    fn constant_folding_arithmetic() {
        let e = FlatExpr::binary(BinOp::Add, int(2), int(3)).unwrap();
        assert_eq!(e.step, Term::Int(BigInt::from(5)));
        assert_eq!(e.init, e.step);

        let e = FlatExpr::binary(BinOp::Mul, int(-4), int(6)).unwrap();
        assert_eq!(e.step, Term::Int(BigInt::from(-24)));

        let e = FlatExpr::binary(BinOp::Lt, int(1), int(2)).unwrap();
        assert_eq!(e.step, Term::Bool(true));
        assert_eq!(e.ty, Type::Bool);
    }

    #[test]
    fn division_by_zero_is_left_symbolic() {
        let e = FlatExpr::binary(BinOp::Div, int(1), int(0)).unwrap();
        assert!(matches!(e.step, Term::Binary(BinOp::Div, _, _)));
    }

    #[test]
    fn folded_modulo_follows_dividend_sign() {
        assert!(mod_matches_dividend_sign(7, 3));
        assert!(mod_matches_dividend_sign(-7, 3));
        assert!(mod_matches_dividend_sign(7, -3));
    }

    #[test]
    fn boolean_identity_laws() {
        let x = var("x", Type::Bool);

        let e = FlatExpr::binary(BinOp::And, FlatExpr::bool_lit(true), x.clone()).unwrap();
        assert_eq!(e.step, x.step);

        let e = FlatExpr::binary(BinOp::And, x.clone(), FlatExpr::bool_lit(false)).unwrap();
        assert_eq!(e.step, Term::Bool(false));

        let e = FlatExpr::binary(BinOp::Or, FlatExpr::bool_lit(false), x.clone()).unwrap();
        assert_eq!(e.step, x.step);

        let e = FlatExpr::binary(BinOp::Implies, FlatExpr::bool_lit(false), x.clone()).unwrap();
        assert_eq!(e.step, Term::Bool(true));

        let e = FlatExpr::binary(BinOp::Implies, x.clone(), FlatExpr::bool_lit(false)).unwrap();
        assert_eq!(e.step, Term::Unary(UnOp::Not, Box::new(x.step.clone())));

        let e = FlatExpr::binary(BinOp::Xor, FlatExpr::bool_lit(false), x.clone()).unwrap();
        assert_eq!(e.step, x.step);
    }

    #[test]
    fn ite_folds_on_literal_condition() {
        let t = var("a", Type::Int);
        let e = var("b", Type::Int);
        let folded = FlatExpr::ite(FlatExpr::bool_lit(true), t.clone(), e).unwrap();
        assert_eq!(folded.step, t.step);
    }

    #[test]
    fn ite_requires_bool_condition() {
        let err = FlatExpr::ite(int(1), int(2), int(3)).unwrap_err();
        assert!(matches!(err, ElabErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn ite_widens_ranges() {
        let a = var("a", Type::IntRange(BigInt::from(0), BigInt::from(5)));
        let b = var("b", Type::IntRange(BigInt::from(3), BigInt::from(9)));
        let c = var("c", Type::Bool);
        let e = FlatExpr::ite(c, a, b).unwrap();
        assert_eq!(e.ty, Type::IntRange(BigInt::from(0), BigInt::from(9)));
    }

    #[test]
    fn pre_accepts_only_variables() {
        let v = var("x", Type::Int);
        let p = FlatExpr::pre(v).unwrap();
        assert_eq!(p.init, Term::Undef);
        assert_eq!(p.step, Term::Pre(Ident::new("x")));
        assert!(p.pre_vars.contains(&Ident::new("x")));

        let sum = FlatExpr::binary(BinOp::Add, var("a", Type::Int), var("b", Type::Int)).unwrap();
        assert!(FlatExpr::pre(sum).is_err());
    }

    #[test]
    fn arrow_distributes_to_init_step() {
        let a = int(0);
        let x = var("x", Type::Int);
        let e = FlatExpr::arrow(a, x.clone()).unwrap();
        assert_eq!(e.init, Term::Int(BigInt::from(0)));
        assert_eq!(e.step, x.step);

        // Nested arrows keep the outermost initial instant.
        let inner = FlatExpr::arrow(int(1), var("y", Type::Int)).unwrap();
        let outer = FlatExpr::arrow(int(0), inner).unwrap();
        assert_eq!(outer.init, Term::Int(BigInt::from(0)));
        assert_eq!(outer.step, Term::Var(Ident::new("y")));
    }

    #[test]
    fn arrow_over_pre_reads_previous_value() {
        let p = FlatExpr::pre(var("x", Type::Int)).unwrap();
        let e = FlatExpr::arrow(int(0), p).unwrap();
        assert_eq!(e.init, Term::Int(BigInt::from(0)));
        assert_eq!(e.step, Term::Pre(Ident::new("x")));
        assert_eq!(e.to_string(), "0 -> pre x");
    }

    #[test]
    fn pre_vars_propagate_through_operators() {
        let p = FlatExpr::pre(var("x", Type::Int)).unwrap();
        let e = FlatExpr::binary(BinOp::Add, p, int(1)).unwrap();
        assert!(e.pre_vars.contains(&Ident::new("x")));
        let guarded = FlatExpr::arrow(int(0), e).unwrap();
        assert!(guarded.pre_vars.contains(&Ident::new("x")));
    }

    #[test]
    fn step_current_vars_exclude_pre_reads() {
        let p = FlatExpr::pre(var("x", Type::Int)).unwrap();
        let e = FlatExpr::binary(BinOp::Add, p, var("y", Type::Int)).unwrap();
        let vars = e.step_current_vars();
        assert!(!vars.contains(&Ident::new("x")));
        assert!(vars.contains(&Ident::new("y")));
    }

    #[test]
    fn arithmetic_erases_ranges() {
        let a = var("a", Type::IntRange(BigInt::from(0), BigInt::from(5)));
        let e = FlatExpr::binary(BinOp::Add, a, int(1)).unwrap();
        assert_eq!(e.ty, Type::Int);
    }

    #[test]
    fn operator_typing_violations() {
        assert!(FlatExpr::binary(BinOp::And, int(1), int(2)).is_err());
        assert!(FlatExpr::binary(BinOp::Add, int(1), FlatExpr::bool_lit(true)).is_err());
        assert!(FlatExpr::binary(
            BinOp::Add,
            int(1),
            FlatExpr::real_lit(BigRational::from_integer(BigInt::from(1)))
        )
        .is_err());
        assert!(FlatExpr::binary(BinOp::Mod, int(1), FlatExpr::real_lit(BigRational::from_integer(BigInt::from(2)))).is_err());
        assert!(FlatExpr::unary(UnOp::Not, int(1)).is_err());
        assert!(FlatExpr::unary(UnOp::Neg, FlatExpr::bool_lit(false)).is_err());
    }

    #[test]
    fn conversions_fold() {
        let r = FlatExpr::real_lit(BigRational::new(BigInt::from(7), BigInt::from(2)));
        let e = FlatExpr::unary(UnOp::ToInt, r).unwrap();
        assert_eq!(e.step, Term::Int(BigInt::from(3)));

        let i = int(4);
        let e = FlatExpr::unary(UnOp::ToReal, i).unwrap();
        assert_eq!(e.step, Term::Real(BigRational::from_integer(BigInt::from(4))));
    }

    #[test]
    fn equality_on_enums_folds() {
        let ty = Type::Enum(vec!["On".into(), "Off".into()]);
        let on = FlatExpr::enum_lit("On".into(), ty.clone());
        let off = FlatExpr::enum_lit("Off".into(), ty.clone());
        let e = FlatExpr::binary(BinOp::Eq, on.clone(), off).unwrap();
        assert_eq!(e.step, Term::Bool(false));
        let e = FlatExpr::binary(BinOp::Eq, on.clone(), on).unwrap();
        assert_eq!(e.step, Term::Bool(true));
    }

    #[test]
    fn big_literals_do_not_truncate() {
        let huge: BigInt = "340282366920938463463374607431768211456".parse().unwrap();
        let e = FlatExpr::binary(BinOp::Add, FlatExpr::int_lit(huge.clone()), int(1)).unwrap();
        assert_eq!(e.step, Term::Int(huge + 1));
    }
}
