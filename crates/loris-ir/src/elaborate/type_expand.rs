//! The type expander: folds a source type expression into scalar leaves.

use loris_dsl::ast::{self, Span};
use num::ToPrimitive;

use super::eval::eval_const_bigint;
use crate::context::TypingContext;
use crate::errors::ElabError;
use crate::ident::{Ident, IndexPath, IndexStep, Symbol};
use crate::ty::Type;

/// Unfolds `ty` into its scalar leaves, sorted by index.
///
/// Range bounds and array sizes are evaluated in constants-only mode. Enum
/// types encountered anywhere in the expansion bind their constructors into
/// the context.
pub(crate) fn expand_type(
    ctx: &mut TypingContext,
    ty: &ast::TypeExpr,
    span: Span,
) -> Result<Vec<(IndexPath, Type)>, ElabError> {
    let mut leaves = Vec::new();
    expand_into(ctx, &IndexPath::empty(), ty, span, &mut leaves)?;
    leaves.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(leaves)
}

fn expand_into(
    ctx: &mut TypingContext,
    prefix: &IndexPath,
    ty: &ast::TypeExpr,
    span: Span,
    out: &mut Vec<(IndexPath, Type)>,
) -> Result<(), ElabError> {
    match ty {
        ast::TypeExpr::Bool => out.push((prefix.clone(), Type::Bool)),
        ast::TypeExpr::Int => out.push((prefix.clone(), Type::Int)),
        ast::TypeExpr::Real => out.push((prefix.clone(), Type::Real)),
        ast::TypeExpr::IntRange { low, high } => {
            let lo = eval_const_bigint(ctx, low)?;
            let hi = eval_const_bigint(ctx, high)?;
            if lo > hi {
                return Err(ElabError::type_mismatch(
                    Span::new(low.span.start, high.span.end),
                    format!("empty subrange [{lo}, {hi}]"),
                ));
            }
            out.push((prefix.clone(), Type::IntRange(lo, hi)));
        }
        ast::TypeExpr::Enum(ctors) => {
            let mut seen: Vec<&str> = Vec::new();
            for c in ctors {
                ctx.check_declarable(&c.node, c.span)?;
                if seen.contains(&c.node.as_str()) {
                    return Err(ElabError::redeclaration(
                        c.span,
                        format!("enum constant '{}' appears twice", c.node),
                    ));
                }
                seen.push(&c.node);
            }
            let enum_ty = Type::Enum(ctors.iter().map(|c| Symbol::from(&c.node)).collect());
            ctx.add_enum_to_context(&enum_ty, span)?;
            out.push((prefix.clone(), enum_ty));
        }
        ast::TypeExpr::Named(name) => {
            let sym = Symbol::from(&name.node);
            let bare = Ident::new(sym.clone());
            if let Some(scalar) = ctx.basic_types.get(&bare) {
                out.push((prefix.clone(), scalar.clone()));
            } else if let Some(leaves) = ctx.indexed_types.get(&bare) {
                for (suffix, leaf_ty) in leaves.clone() {
                    out.push((prefix.join(&suffix), leaf_ty));
                }
            } else if ctx.free_types.contains(&sym) {
                out.push((prefix.clone(), Type::Free(sym)));
            } else {
                return Err(ElabError::undeclared(name.span, "type", &name.node));
            }
        }
        ast::TypeExpr::Record(fields) => {
            let mut seen: Vec<&str> = Vec::new();
            for field in fields {
                if seen.contains(&field.name.node.as_str()) {
                    return Err(ElabError::redeclaration(
                        field.name.span,
                        format!("record field '{}' appears twice", field.name.node),
                    ));
                }
                seen.push(&field.name.node);
                let child = prefix.push(IndexStep::Field(Symbol::from(&field.name.node)));
                expand_into(ctx, &child, &field.ty, field.name.span, out)?;
            }
        }
        ast::TypeExpr::Tuple(elems) => {
            if elems.is_empty() {
                return Err(ElabError::type_mismatch(span, "empty tuple type".to_string()));
            }
            for (j, elem) in elems.iter().enumerate() {
                let child = prefix.push(IndexStep::Position(j as u64));
                expand_into(ctx, &child, elem, span, out)?;
            }
        }
        ast::TypeExpr::Array { elem, size } => {
            let n = eval_const_bigint(ctx, size)?;
            let n = n.to_u64().filter(|&n| n >= 1).ok_or_else(|| {
                ElabError::type_mismatch(size.span, format!("array size must be positive, got {n}"))
            })?;
            for i in 0..n {
                let child = prefix.push(IndexStep::Position(i));
                expand_into(ctx, &child, elem, span, out)?;
            }
        }
    }
    Ok(())
}
