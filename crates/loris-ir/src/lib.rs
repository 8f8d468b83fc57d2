#![doc = include_str!("../README.md")]

//! Loris intermediate representation and elaboration.
//!
//! This crate defines the identifier and type algebras, the two-state flat
//! expression layer, the typing context, the elaborated node records, and
//! the elaboration pass from the DSL AST to the flat IR.

pub mod context;
pub mod elaborate;
pub mod errors;
pub mod flat_expr;
pub mod ident;
pub mod node;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;
pub mod ty;
