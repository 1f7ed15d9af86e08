//! This module contains the concrete values that constant evaluation
//! produces, mirroring the shapes of the IR's first-class types.

use std::fmt::{Display, Formatter};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::vm::value::known::KnownInt;

/// A concrete value of some IR type.
///
/// Aggregates hold one element per member of the structure or array, in
/// order.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum GenericValue {
    /// An integer of any width up to the maximum constant width.
    #[serde(with = "known_int")]
    Int(KnownInt),

    /// A single-precision floating-point number.
    Float(f32),

    /// A double-precision floating-point number.
    Double(f64),

    /// An address.
    Pointer(u64),

    /// An array or structure value.
    Aggregate(Vec<GenericValue>),
}

impl GenericValue {
    /// Gets the integer if this value is one.
    #[must_use]
    pub fn as_int(&self) -> Option<KnownInt> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Gets the address if this value is a pointer.
    #[must_use]
    pub fn as_pointer(&self) -> Option<u64> {
        match self {
            Self::Pointer(address) => Some(*address),
            _ => None,
        }
    }

    /// Gets the elements if this value is an aggregate.
    #[must_use]
    pub fn as_aggregate(&self) -> Option<&[GenericValue]> {
        match self {
            Self::Aggregate(elements) => Some(elements),
            _ => None,
        }
    }
}

impl Display for GenericValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}:float"),
            Self::Double(value) => write!(f, "{value:?}:double"),
            Self::Pointer(address) => write!(f, "{address:#x}:ptr"),
            Self::Aggregate(elements) => write!(f, "{{{}}}", elements.iter().join(", ")),
        }
    }
}

/// Serialises integers as their width and their value as a hexadecimal
/// string, as the full range does not fit in any JSON number.
mod known_int {
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    use crate::vm::value::known::KnownInt;

    #[derive(Deserialize, Serialize)]
    struct Repr {
        width: u32,
        value: String,
    }

    pub fn serialize<S: Serializer>(value: &KnownInt, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = Repr {
            width: value.width(),
            value: hex::encode(value.bytes_be()),
        };
        repr.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<KnownInt, D::Error> {
        let repr = Repr::deserialize(deserializer)?;
        if repr.width == 0 || repr.width > crate::constant::MAX_CONSTANT_WIDTH_BITS {
            return Err(D::Error::custom(format!("invalid integer width {}", repr.width)));
        }
        let mut bytes = hex::decode(&repr.value).map_err(D::Error::custom)?;
        bytes.reverse();
        if bytes.len() > 32 {
            return Err(D::Error::custom("integer value is too wide"));
        }
        Ok(KnownInt::from_le_bytes(repr.width, &bytes))
    }
}
