//! Values and constants of the IR.

use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

use ethnum::{I256, U256};
use itertools::Itertools;

use crate::{
    ir::{
        instruction::{BinaryOp, CastOp, IntPredicate},
        types::Type,
        ValueId,
    },
    vm::value::known::KnownInt,
};

/// An operand of an instruction.
///
/// Values are either the results of instructions and function arguments,
/// which are local to a function and have a symbolic register, or constants
/// which are materialised on every use.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Value {
    Local(Local),
    Constant(Constant),
}

impl Value {
    /// Gets the type of the value.
    #[must_use]
    pub fn ty(&self) -> Type {
        match self {
            Self::Local(local) => local.ty.clone(),
            Self::Constant(constant) => constant.ty(),
        }
    }

    /// Gets the identity of the value if it is not a constant.
    #[must_use]
    pub fn id(&self) -> Option<ValueId> {
        match self {
            Self::Local(local) => Some(local.id),
            Self::Constant(_) => None,
        }
    }

    /// Gets the local value if this is not a constant.
    #[must_use]
    pub fn as_local(&self) -> Option<&Local> {
        match self {
            Self::Local(local) => Some(local),
            Self::Constant(_) => None,
        }
    }

    /// Gets the constant if this is a constant.
    #[must_use]
    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Self::Constant(constant) => Some(constant),
            Self::Local(_) => None,
        }
    }

    /// Gets the value as a concrete integer if it is an integer constant.
    #[must_use]
    pub fn as_known_int(&self) -> Option<KnownInt> {
        match self {
            Self::Constant(Constant::Int(value)) => Some(*value),
            _ => None,
        }
    }
}

impl From<Local> for Value {
    fn from(value: Local) -> Self {
        Self::Local(value)
    }
}

impl From<Constant> for Value {
    fn from(value: Constant) -> Self {
        Self::Constant(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(local) => write!(f, "{local}"),
            Self::Constant(constant) => write!(f, "{constant}"),
        }
    }
}

/// A value local to a function: an argument or the result of an
/// instruction.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Local {
    pub id: ValueId,
    pub ty: Type,
    pub name: Option<Arc<str>>,
}

impl Local {
    /// Gets the name used to refer to the value in text, which is its source
    /// name where one exists.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => self.id.0.to_string(),
        }
    }
}

impl Display for Local {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.display_name())
    }
}

/// A reference to a global variable, which denotes its address.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct GlobalRef {
    pub id: ValueId,
    pub name: Arc<str>,
}

impl Display for GlobalRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.name)
    }
}

/// A compile-time constant.
///
/// Floating-point constants are kept as their IEEE-754 bit patterns so that
/// constants can be compared and hashed exactly.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Constant {
    /// An integer constant.
    Int(KnownInt),

    /// A single-precision float, as its bits.
    Float(u32),

    /// A double-precision float, as its bits.
    Double(u64),

    /// The null pointer.
    Null,

    /// An undefined value of the given type.
    Undef(Type),

    /// The all-zero value of the given type.
    Zero(Type),

    /// An array or structure constant with one element per member.
    Aggregate { ty: Type, elements: Vec<Constant> },

    /// The address of a global variable.
    Global(GlobalRef),

    /// The address of a function.
    Function(Arc<str>),

    /// A constant expression.
    Expr(Box<ConstantExpr>),
}

impl Constant {
    /// Creates an integer constant of `width` bits, truncating `value`.
    #[must_use]
    pub fn int(width: u32, value: impl Into<U256>) -> Self {
        Self::Int(KnownInt::new(width, value))
    }

    /// Creates an integer constant of `width` bits from a signed `value`.
    #[must_use]
    pub fn signed(width: u32, value: impl Into<I256>) -> Self {
        Self::Int(KnownInt::from_signed(width, value))
    }

    /// Creates a boolean constant.
    #[must_use]
    pub fn bool(value: bool) -> Self {
        Self::Int(KnownInt::from_bool(value))
    }

    /// Creates a single-precision float constant.
    #[must_use]
    pub fn float(value: f32) -> Self {
        Self::Float(value.to_bits())
    }

    /// Creates a double-precision float constant.
    #[must_use]
    pub fn double(value: f64) -> Self {
        Self::Double(value.to_bits())
    }

    /// Creates a constant expression.
    #[must_use]
    pub fn expr(expr: ConstantExpr) -> Self {
        Self::Expr(Box::new(expr))
    }

    /// Gets the type of the constant.
    #[must_use]
    pub fn ty(&self) -> Type {
        match self {
            Self::Int(value) => Type::Int(value.width()),
            Self::Float(_) => Type::Float,
            Self::Double(_) => Type::Double,
            Self::Null | Self::Global(_) | Self::Function(_) => Type::Pointer,
            Self::Undef(ty) | Self::Zero(ty) | Self::Aggregate { ty, .. } => ty.clone(),
            Self::Expr(expr) => expr.ty(),
        }
    }

    /// Checks whether the value of the constant depends on the addresses of
    /// globals or functions, which are only fixed once memory is laid out.
    #[must_use]
    pub fn is_relocatable(&self) -> bool {
        match self {
            Self::Global(_) | Self::Function(_) => true,
            Self::Aggregate { elements, .. } => elements.iter().any(Self::is_relocatable),
            Self::Expr(expr) => expr.operands().into_iter().any(Self::is_relocatable),
            _ => false,
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) if value.width() == 1 => write!(f, "{}", !value.is_zero()),
            Self::Int(value) => write!(f, "{}", value.value_signed()),
            Self::Float(bits) => write!(f, "{:?}", f32::from_bits(*bits)),
            Self::Double(bits) => write!(f, "{:?}", f64::from_bits(*bits)),
            Self::Null => write!(f, "null"),
            Self::Undef(_) => write!(f, "undef"),
            Self::Zero(_) => write!(f, "zeroinitializer"),
            Self::Aggregate { ty, elements } => {
                let elements = elements.iter().map(|e| format!("{} {e}", e.ty())).join(", ");
                match ty {
                    Type::Array(..) => write!(f, "[{elements}]"),
                    _ => write!(f, "{{ {elements} }}"),
                }
            }
            Self::Global(global) => write!(f, "{global}"),
            Self::Function(name) => write!(f, "@{name}"),
            Self::Expr(expr) => write!(f, "{expr}"),
        }
    }
}

/// An expression over constants that is evaluated at translation time.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ConstantExpr {
    /// The conversion of `value` to `ty` by `op`.
    Cast {
        op:    CastOp,
        value: Constant,
        ty:    Type,
    },

    /// The binary operation `op` on two constants of the same type.
    Binary {
        op:  BinaryOp,
        lhs: Constant,
        rhs: Constant,
    },

    /// The integer comparison of two constants, which is an `i1`.
    ICmp {
        predicate: IntPredicate,
        lhs:       Constant,
        rhs:       Constant,
    },

    /// The address of the element of the `source`-typed object at `base`
    /// that is selected by `indices`.
    Gep {
        source:  Type,
        base:    Constant,
        indices: Vec<Constant>,
    },
}

impl ConstantExpr {
    /// Gets the type of the expression's result.
    #[must_use]
    pub fn ty(&self) -> Type {
        match self {
            Self::Cast { ty, .. } => ty.clone(),
            Self::Binary { lhs, .. } => lhs.ty(),
            Self::ICmp { .. } => Type::bool(),
            Self::Gep { .. } => Type::Pointer,
        }
    }

    /// Gets the constant operands of the expression.
    #[must_use]
    pub fn operands(&self) -> Vec<&Constant> {
        match self {
            Self::Cast { value, .. } => vec![value],
            Self::Binary { lhs, rhs, .. } | Self::ICmp { lhs, rhs, .. } => vec![lhs, rhs],
            Self::Gep { base, indices, .. } => std::iter::once(base).chain(indices).collect(),
        }
    }
}

impl Display for ConstantExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cast { op, value, ty } => {
                write!(f, "{} ({} {value} to {ty})", op.as_text_code(), value.ty())
            }
            Self::Binary { op, lhs, rhs } => {
                write!(f, "{} ({} {lhs}, {rhs})", op.as_text_code(), lhs.ty())
            }
            Self::ICmp {
                predicate,
                lhs,
                rhs,
            } => write!(
                f,
                "icmp {} ({} {lhs}, {rhs})",
                predicate.as_text_code(),
                lhs.ty()
            ),
            Self::Gep {
                source,
                base,
                indices,
            } => {
                let indices = indices.iter().map(|i| format!(", {} {i}", i.ty())).join("");
                write!(f, "getelementptr ({source}, ptr {base}{indices})")
            }
        }
    }
}
