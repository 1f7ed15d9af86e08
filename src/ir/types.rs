//! The types of values in the IR.

use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

use itertools::Itertools;

/// The type of a value in the IR.
///
/// Types are compared structurally, with the exception of named structures
/// which also compare their names.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Type {
    /// The type of instructions that produce no value.
    Void,

    /// An integer of the given bit-width.
    Int(u32),

    /// An IEEE-754 single-precision float.
    Float,

    /// An IEEE-754 double-precision float.
    Double,

    /// An opaque pointer into the flat address space.
    Pointer,

    /// A fixed-length array of elements.
    Array(Arc<Type>, u64),

    /// A structure with ordered fields.
    Struct(Arc<StructType>),

    /// A fixed-length SIMD vector.
    Vector(Arc<Type>, u32),

    /// The type of basic block labels.
    Label,

    /// The type of metadata operands.
    Metadata,

    /// A named type whose body is unknown.
    Opaque(Arc<str>),
}

impl Type {
    /// Creates the one-bit integer type used for booleans.
    #[must_use]
    pub fn bool() -> Self {
        Self::Int(1)
    }

    /// Creates an array of `count` elements of type `element`.
    #[must_use]
    pub fn array(element: Type, count: u64) -> Self {
        Self::Array(Arc::new(element), count)
    }

    /// Creates a literal (unnamed, unpacked) structure with the given
    /// `fields`.
    #[must_use]
    pub fn structure(fields: impl Into<Vec<Type>>) -> Self {
        Self::Struct(Arc::new(StructType {
            name: None,
            fields: fields.into(),
            packed: false,
        }))
    }

    /// Creates a packed structure with the given `fields`.
    #[must_use]
    pub fn packed_structure(fields: impl Into<Vec<Type>>) -> Self {
        Self::Struct(Arc::new(StructType {
            name: None,
            fields: fields.into(),
            packed: true,
        }))
    }

    /// Creates a vector of `count` lanes of type `element`.
    #[must_use]
    pub fn vector(element: Type, count: u32) -> Self {
        Self::Vector(Arc::new(element), count)
    }

    /// Checks if this is the one-bit integer type.
    #[must_use]
    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Int(1))
    }

    /// Checks if this is an integer type of any width.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    /// Checks if this is the pointer type.
    #[must_use]
    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer)
    }

    /// Checks if this is a floating-point type.
    #[must_use]
    pub fn is_floating_point(&self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    /// Checks if this is an array or structure type.
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::Array(..) | Self::Struct(_))
    }

    /// Checks if this is the void type.
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// Gets the width of an integer type.
    #[must_use]
    pub fn int_width(&self) -> Option<u32> {
        match self {
            Self::Int(width) => Some(*width),
            _ => None,
        }
    }

    /// Gets the structure body if this is a structure type.
    #[must_use]
    pub fn as_struct(&self) -> Option<&StructType> {
        match self {
            Self::Struct(body) => Some(body),
            _ => None,
        }
    }

    /// Gets the type of the element at `index` of an aggregate type.
    ///
    /// Arrays and vectors yield their element type for every index, while
    /// structures yield the type of the corresponding field.
    #[must_use]
    pub fn indexed(&self, index: u64) -> Option<&Type> {
        match self {
            Self::Array(element, _) | Self::Vector(element, _) => Some(element),
            Self::Struct(body) => body.fields.get(usize::try_from(index).ok()?),
            _ => None,
        }
    }

    /// Gets the leaf types of this type in order, flattening arrays and
    /// structures.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Type> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, into: &mut Vec<&'a Type>) {
        match self {
            Self::Array(element, count) => {
                // Every element has the same leaves, so one is enough for
                // classification.
                if *count > 0 {
                    element.collect_leaves(into);
                }
            }
            Self::Struct(body) => body.fields.iter().for_each(|f| f.collect_leaves(into)),
            _ => into.push(self),
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Int(width) => write!(f, "i{width}"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::Pointer => write!(f, "ptr"),
            Self::Array(element, count) => write!(f, "[{count} x {element}]"),
            Self::Struct(body) => write!(f, "{body}"),
            Self::Vector(element, count) => write!(f, "<{count} x {element}>"),
            Self::Label => write!(f, "label"),
            Self::Metadata => write!(f, "metadata"),
            Self::Opaque(name) => write!(f, "%{name}"),
        }
    }
}

/// The body of a structure type.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct StructType {
    /// The name of the structure, if it is not a literal structure.
    pub name: Option<Arc<str>>,

    /// The types of the fields in declaration order.
    pub fields: Vec<Type>,

    /// Whether the fields are laid out without padding.
    pub packed: bool,
}

impl StructType {
    /// Creates a named structure body.
    #[must_use]
    pub fn named(name: &str, fields: impl Into<Vec<Type>>, packed: bool) -> Self {
        Self {
            name: Some(name.into()),
            fields: fields.into(),
            packed,
        }
    }
}

impl Display for StructType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(name) = &self.name {
            return write!(f, "%{name}");
        }
        let fields = self.fields.iter().join(", ");
        if self.packed {
            write!(f, "<{{ {fields} }}>")
        } else {
            write!(f, "{{ {fields} }}")
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::ir::types::{StructType, Type};

    #[test]
    fn displays_like_the_ir() {
        let ty = Type::structure([
            Type::Int(32),
            Type::array(Type::Pointer, 4),
            Type::vector(Type::Float, 2),
        ]);
        assert_eq!(ty.to_string(), "{ i32, [4 x ptr], <2 x float> }");
        assert_eq!(Type::packed_structure([Type::Int(8)]).to_string(), "<{ i8 }>");

        let named = Type::Struct(Arc::new(StructType::named("pair", [Type::Int(8)], false)));
        assert_eq!(named.to_string(), "%pair");
    }

    #[test]
    fn can_index_aggregates() {
        let ty = Type::structure([Type::Int(32), Type::array(Type::Int(8), 3)]);

        assert_eq!(ty.indexed(0), Some(&Type::Int(32)));
        assert_eq!(ty.indexed(1).and_then(|t| t.indexed(2)), Some(&Type::Int(8)));
        assert_eq!(ty.indexed(2), None);
        assert_eq!(Type::Int(8).indexed(0), None);
    }

    #[test]
    fn flattens_leaves() {
        let ty = Type::structure([
            Type::Int(32),
            Type::structure([Type::Pointer, Type::Double]),
            Type::array(Type::Int(8), 0),
        ]);

        assert_eq!(ty.leaves(), vec![&Type::Int(32), &Type::Pointer, &Type::Double]);
    }
}
