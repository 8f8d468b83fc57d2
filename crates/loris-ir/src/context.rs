//! The typing context: the tables describing what is currently in scope.
//!
//! The context is created empty and grows monotonically as top-level
//! declarations are processed; nothing is ever removed or rewritten. Node
//! elaboration works on a clone, so node-local bindings never leak into the
//! global context. All tables are insertion-ordered for determinism.

use indexmap::{IndexMap, IndexSet};
use loris_dsl::ast::Span;

use crate::errors::ElabError;
use crate::flat_expr::FlatExpr;
use crate::ident::{is_reserved, Ident, IndexPath, Symbol};
use crate::ty::Type;

/// Registers every proper prefix of `leaf` in `map`, mapped to the list of
/// remaining suffixes with their values. The full path itself is excluded.
pub fn add_to_prefix_map<V: Clone>(
    map: &mut IndexMap<Ident, Vec<(IndexPath, V)>>,
    leaf: &Ident,
    value: V,
) {
    let steps = leaf.path().steps();
    let base = Ident::new(leaf.base().clone());
    for depth in 0..steps.len() {
        let mut prefix = base.clone();
        for step in &steps[..depth] {
            prefix = prefix.push(step.clone());
        }
        let suffix = IndexPath::from(steps[depth..].to_vec());
        map.entry(prefix).or_default().push((suffix, value.clone()));
    }
}

/// The six tables of the elaborator's scope.
#[derive(Debug, Clone, Default)]
pub struct TypingContext {
    /// Scalar type of every fully-qualified leaf identifier obtained from a
    /// type declaration.
    pub basic_types: IndexMap<Ident, Type>,
    /// Type-alias prefix → leaves (remaining index, scalar type); allows
    /// whole-aggregate dereference of an alias.
    pub indexed_types: IndexMap<Ident, Vec<(IndexPath, Type)>>,
    /// Abstract type names.
    pub free_types: IndexSet<Symbol>,
    /// Value identifier → scalar type, for every in-scope scalar signal or
    /// enum constant.
    pub type_ctx: IndexMap<Ident, Type>,
    /// Value prefix → remaining suffixes in scope (the projection of
    /// `type_ctx` to the prefix structure, with the leaf types alongside).
    pub index_ctx: IndexMap<Ident, Vec<(IndexPath, Type)>>,
    /// Constant identifier → its flat expression.
    pub consts: IndexMap<Ident, FlatExpr>,
}

impl TypingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `name` names a declared alias or free type.
    pub fn type_in_context(&self, name: &Symbol) -> bool {
        let bare = Ident::new(name.clone());
        self.basic_types.contains_key(&bare)
            || self.indexed_types.contains_key(&bare)
            || self.free_types.contains(name)
    }

    /// True iff `id` is bound as a scalar or has scalar descendants.
    pub fn ident_in_context(&self, id: &Ident) -> bool {
        self.type_ctx.contains_key(id) || self.index_ctx.contains_key(id)
    }

    /// Rejects user declarations of reserved-prefix names.
    pub fn check_declarable(&self, name: &str, span: Span) -> Result<(), ElabError> {
        if is_reserved(name) {
            return Err(ElabError::redeclaration(
                span,
                format!("'{name}' uses the prefix reserved for generated variables"),
            ));
        }
        Ok(())
    }

    /// Binds a scalar value leaf in `type_ctx` and registers its prefixes
    /// in `index_ctx`.
    pub fn bind_value(&mut self, leaf: Ident, ty: Type) {
        add_to_prefix_map(&mut self.index_ctx, &leaf, ty.clone());
        self.type_ctx.insert(leaf, ty);
    }

    /// Binds a scalar type-alias leaf in `basic_types` and registers its
    /// prefixes in `indexed_types`.
    pub fn bind_type_leaf(&mut self, leaf: Ident, ty: Type) {
        add_to_prefix_map(&mut self.indexed_types, &leaf, ty.clone());
        self.basic_types.insert(leaf, ty);
    }

    /// Rewrites the recorded type of a bound value leaf, including the
    /// prefix entries that mirror it. Used by the `Int ≤ IntRange`
    /// relaxation on a node-local context clone.
    pub fn retype_value(&mut self, leaf: &Ident, ty: Type) {
        self.type_ctx.insert(leaf.clone(), ty.clone());
        let steps = leaf.path().steps();
        let base = Ident::new(leaf.base().clone());
        for depth in 0..steps.len() {
            let mut prefix = base.clone();
            for step in &steps[..depth] {
                prefix = prefix.push(step.clone());
            }
            let suffix = IndexPath::from(steps[depth..].to_vec());
            if let Some(entries) = self.index_ctx.get_mut(&prefix) {
                for (s, t) in entries.iter_mut() {
                    if *s == suffix {
                        *t = ty.clone();
                    }
                }
            }
        }
    }

    /// For an enum type, binds each constructor to the enum type in
    /// `type_ctx` and its value in `consts`. Conflicting re-binding of a
    /// constructor is fatal; other types pass through unchanged.
    pub fn add_enum_to_context(&mut self, ty: &Type, span: Span) -> Result<(), ElabError> {
        if let Type::Enum(ctors) = ty {
            for ctor in ctors {
                let leaf = Ident::new(ctor.clone());
                if let Some(existing) = self.type_ctx.get(&leaf) {
                    if existing != ty {
                        return Err(ElabError::redeclaration(
                            span,
                            format!("enum constant '{ctor}' is already bound to {existing}"),
                        ));
                    }
                    continue;
                }
                self.type_ctx.insert(leaf.clone(), ty.clone());
                self.consts
                    .insert(leaf, FlatExpr::enum_lit(ctor.clone(), ty.clone()));
            }
        }
        Ok(())
    }
}
