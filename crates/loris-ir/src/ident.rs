//! Path-structured identifiers and the index algebra.
//!
//! An [`Ident`] is a base symbol plus an ordered index path. Identifiers are
//! value objects: every operation returns a new identifier. All base names
//! share an interned (`Arc<str>`) representation so that clones and
//! comparisons stay cheap across the elaborator's tables.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

/// Base name reserved for auxiliary variables introduced when a `pre` is
/// applied to a non-variable expression.
pub const ABS_BASE: &str = "__abs";

/// Index field reserved for the bound outputs of a node call:
/// `callee.__returns.k`.
pub const RETURNS_FIELD: &str = "__returns";

/// True iff `name` is reserved for elaborator-generated identifiers and may
/// not be declared by the user.
pub fn is_reserved(name: &str) -> bool {
    name.starts_with("__")
}

/// An interned base symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol(Arc::from(s))
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol(Arc::from(s.as_str()))
    }
}

impl From<&String> for Symbol {
    fn from(s: &String) -> Self {
        Symbol(Arc::from(s.as_str()))
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single step of an index path.
///
/// The derived ordering is the documented total order on steps:
/// `Field < Position < Nested`, with fields compared lexicographically,
/// positions numerically, and nested identifiers recursively (base name
/// first, then path elementwise).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexStep {
    /// Named record field.
    Field(Symbol),
    /// Zero-based tuple or array position.
    Position(u64),
    /// An embedded identifier; used for the bound outputs of a call site,
    /// `callee.__returns.k.<output leaf>`.
    Nested(Ident),
}

impl fmt::Display for IndexStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexStep::Field(s) => write!(f, "{s}"),
            IndexStep::Position(p) => write!(f, "{p}"),
            IndexStep::Nested(id) => write!(f, "{id}"),
        }
    }
}

/// An ordered sequence of index steps, compared lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct IndexPath(Vec<IndexStep>);

impl IndexPath {
    pub fn empty() -> Self {
        IndexPath(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> &[IndexStep] {
        &self.0
    }

    /// Returns a new path with `step` appended at the back.
    pub fn push(&self, step: IndexStep) -> IndexPath {
        let mut steps = self.0.clone();
        steps.push(step);
        IndexPath(steps)
    }

    /// Returns a new path `self ++ suffix`.
    pub fn join(&self, suffix: &IndexPath) -> IndexPath {
        let mut steps = self.0.clone();
        steps.extend(suffix.0.iter().cloned());
        IndexPath(steps)
    }

    /// First step and remainder, if any.
    pub fn split_first(&self) -> Option<(&IndexStep, IndexPath)> {
        self.0
            .split_first()
            .map(|(head, tail)| (head, IndexPath(tail.to_vec())))
    }
}

impl From<Vec<IndexStep>> for IndexPath {
    fn from(steps: Vec<IndexStep>) -> Self {
        IndexPath(steps)
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.0 {
            write!(f, ".{step}")?;
        }
        Ok(())
    }
}

/// A path-structured identifier: base symbol plus index path.
///
/// Two identifiers are equal iff their base and full index path coincide
/// elementwise. The derived ordering compares the base first, then the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident {
    base: Symbol,
    path: IndexPath,
}

impl Ident {
    pub fn new(base: impl Into<Symbol>) -> Self {
        Ident {
            base: base.into(),
            path: IndexPath::empty(),
        }
    }

    pub fn base(&self) -> &Symbol {
        &self.base
    }

    pub fn path(&self) -> &IndexPath {
        &self.path
    }

    /// Splits the identifier into its base and suffix path.
    pub fn split(&self) -> (&Symbol, &IndexPath) {
        (&self.base, &self.path)
    }

    /// Returns a new identifier with `step` appended to the path.
    pub fn push(&self, step: IndexStep) -> Ident {
        Ident {
            base: self.base.clone(),
            path: self.path.push(step),
        }
    }

    /// Returns a new identifier with `suffix` appended to the path.
    pub fn with_suffix(&self, suffix: &IndexPath) -> Ident {
        Ident {
            base: self.base.clone(),
            path: self.path.join(suffix),
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.path)
    }
}

/// Generator for elaborator-introduced identifiers.
///
/// The auxiliary counter is monotonic within one node (the generator is
/// created fresh by the node assembler); the call counter is keyed by the
/// callee name, so call sites into the same node receive
/// `callee.__returns.0`, `callee.__returns.1`, and so on.
#[derive(Debug, Default)]
pub struct FreshVars {
    next_abs: u64,
    next_call: IndexMap<Symbol, u64>,
}

impl FreshVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next auxiliary variable, `__abs.k`.
    pub fn fresh_abs(&mut self) -> Ident {
        let k = self.next_abs;
        self.next_abs += 1;
        Ident::new(ABS_BASE).push(IndexStep::Position(k))
    }

    /// Next call identifier for `callee`, `callee.__returns.k`.
    pub fn fresh_call(&mut self, callee: &Symbol) -> Ident {
        let k = self.next_call.entry(callee.clone()).or_insert(0);
        let ident = Ident::new(callee.clone())
            .push(IndexStep::Field(RETURNS_FIELD.into()))
            .push(IndexStep::Position(*k));
        *k += 1;
        ident
    }
}
