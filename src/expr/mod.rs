//! This module contains the logical terms that the operational semantics
//! produces: booleans, fixed-width bit-vectors and arrays from bit-vectors to
//! bit-vectors.
//!
//! Terms are immutable and shared. Equality is structural, and each node
//! caches its structural hash on construction so that hashing a term is
//! constant-time regardless of its size. New terms are built through the
//! [`ExprBuilder`], which folds constants and applies simple rewrites.

pub mod build;
pub mod display;

use std::{
    collections::hash_map::DefaultHasher,
    fmt::{Display, Formatter},
    hash::{Hash, Hasher},
    sync::Arc,
};

pub use build::ExprBuilder;

use crate::vm::value::known::KnownInt;

/// The sort (logical type) of a term.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Sort {
    /// Booleans.
    Bool,

    /// Bit-vectors of the given width.
    Bv(u32),

    /// Total maps from `index`-bit bit-vectors to `element`-bit bit-vectors.
    Array { index: u32, element: u32 },
}

impl Sort {
    /// Gets the width of a bit-vector sort.
    #[must_use]
    pub fn bv_width(self) -> Option<u32> {
        match self {
            Self::Bv(width) => Some(width),
            _ => None,
        }
    }
}

impl Display for Sort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool => write!(f, "Bool"),
            Self::Bv(width) => write!(f, "(_ BitVec {width})"),
            Self::Array { index, element } => {
                write!(f, "(Array (_ BitVec {index}) (_ BitVec {element}))")
            }
        }
    }
}

/// The operators that may head an application term.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Op {
    // Boolean operations
    Not,
    And,
    Or,
    Xor,
    Implies,
    Eq,
    Ite,

    // Bit-vector operations
    BvNot,
    BvNeg,
    BvAdd,
    BvSub,
    BvMul,
    BvUDiv,
    BvSDiv,
    BvURem,
    BvSRem,
    BvShl,
    BvLShr,
    BvAShr,
    BvAnd,
    BvOr,
    BvXor,
    BvUlt,
    BvUle,
    BvSlt,
    BvSle,
    Extract { high: u32, low: u32 },
    ZeroExtend(u32),
    SignExtend(u32),
    Concat,

    // Array operations
    Select,
    Store,
    ConstArray { index: u32 },
}

/// The shape of a term.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Term {
    /// A boolean literal.
    Bool(bool),

    /// A bit-vector literal.
    Bv(KnownInt),

    /// A free variable, such as a register or a fresh symbol.
    Var { name: Arc<str>, sort: Sort },

    /// The application of `op` to `args`.
    App { op: Op, args: Vec<Expr> },
}

/// A node in the term graph.
#[derive(Debug)]
struct Node {
    term: Term,
    sort: Sort,
    hash: u64,
}

/// A shared, immutable logical term.
///
/// Cloning an expression is cheap, and two expressions are equal exactly when
/// they are structurally identical.
#[derive(Clone, Debug)]
pub struct Expr(Arc<Node>);

impl Expr {
    /// Creates a term from its shape and sort, computing its hash.
    ///
    /// Callers must ensure that `sort` is the sort of `term`. Use the
    /// [`ExprBuilder`] rather than calling this directly.
    fn from_parts(term: Term, sort: Sort) -> Self {
        let mut hasher = DefaultHasher::new();
        term.hash(&mut hasher);
        sort.hash(&mut hasher);
        let hash = hasher.finish();
        Self(Arc::new(Node { term, sort, hash }))
    }

    /// Gets the sort of the term.
    #[must_use]
    pub fn sort(&self) -> Sort {
        self.0.sort
    }

    /// Gets the shape of the term.
    #[must_use]
    pub fn term(&self) -> &Term {
        &self.0.term
    }

    /// Gets the width of a bit-vector term.
    #[must_use]
    pub fn bv_width(&self) -> Option<u32> {
        self.sort().bv_width()
    }

    /// Gets the value of a boolean literal.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.term() {
            Term::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Gets the value of a bit-vector literal.
    #[must_use]
    pub fn as_bv(&self) -> Option<KnownInt> {
        match self.term() {
            Term::Bv(value) => Some(*value),
            _ => None,
        }
    }

    /// Checks whether the term is a literal.
    #[must_use]
    pub fn is_const(&self) -> bool {
        matches!(self.term(), Term::Bool(_) | Term::Bv(_))
    }

    /// Checks whether the term is the literal `true`.
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.as_bool() == Some(true)
    }

    /// Checks whether the term is the literal `false`.
    #[must_use]
    pub fn is_false(&self) -> bool {
        self.as_bool() == Some(false)
    }

    /// Gets the name of a variable.
    #[must_use]
    pub fn var_name(&self) -> Option<&str> {
        match self.term() {
            Term::Var { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Gets the operator and arguments of an application.
    #[must_use]
    pub fn as_app(&self) -> Option<(Op, &[Expr])> {
        match self.term() {
            Term::App { op, args } => Some((*op, args)),
            _ => None,
        }
    }

    /// Counts the nodes in the term, counting shared subterms once per
    /// occurrence.
    #[must_use]
    pub fn size(&self) -> usize {
        match self.term() {
            Term::App { args, .. } => 1 + args.iter().map(Expr::size).sum::<usize>(),
            _ => 1,
        }
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.hash == other.0.hash
                && self.0.sort == other.0.sort
                && self.0.term == other.0.term)
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use crate::{
        expr::{ExprBuilder, Sort},
        vm::value::known::KnownInt,
    };

    #[test]
    fn equality_is_structural() {
        let b = ExprBuilder::new(false);
        let x = b.var("x", Sort::Bv(8));
        let one = b.bv(KnownInt::new(8, 1u8));

        let left = b.bvadd(x.clone(), one.clone());
        let right = b.bvadd(b.var("x", Sort::Bv(8)), one);

        assert_eq!(left, right);
        assert_ne!(left, b.bvadd(x.clone(), x));

        let set: HashSet<_> = [left, right].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn variables_of_different_sorts_differ() {
        let b = ExprBuilder::new(false);

        assert_ne!(b.var("x", Sort::Bv(8)), b.var("x", Sort::Bv(16)));
        assert_ne!(b.var("x", Sort::Bool), b.var("x", Sort::Bv(1)));
    }

    #[test]
    fn sorts_display_in_smt_lib_syntax() {
        assert_eq!(Sort::Bool.to_string(), "Bool");
        assert_eq!(Sort::Bv(32).to_string(), "(_ BitVec 32)");
        assert_eq!(
            Sort::Array {
                index:   64,
                element: 8,
            }
            .to_string(),
            "(Array (_ BitVec 64) (_ BitVec 8))"
        );
    }
}
