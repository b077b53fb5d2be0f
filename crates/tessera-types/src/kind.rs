use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kind of a value.
///
/// The discriminant is the one-byte tag written at the front of every
/// encoded value, and the derived `Ord` is the cross-kind sort order: values
/// of different kinds compare by tag alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Kind {
    Bool = 0,
    Int = 1,
    Uint = 2,
    Float = 3,
    String = 4,
    Blob = 5,
    Ref = 6,
    List = 7,
    Map = 8,
    Set = 9,
    Null = 10,
}

impl Kind {
    /// The encoded tag byte.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Parse an encoded tag byte.
    pub fn from_tag(tag: u8) -> Result<Self, TypeError> {
        Ok(match tag {
            0 => Self::Bool,
            1 => Self::Int,
            2 => Self::Uint,
            3 => Self::Float,
            4 => Self::String,
            5 => Self::Blob,
            6 => Self::Ref,
            7 => Self::List,
            8 => Self::Map,
            9 => Self::Set,
            10 => Self::Null,
            other => return Err(TypeError::UnknownKind(other)),
        })
    }

    /// Returns `true` for kinds represented as chunked trees.
    pub const fn is_collection(self) -> bool {
        matches!(self, Self::Blob | Self::List | Self::Map | Self::Set)
    }

    /// Returns `true` for kinds whose payload is stored inline.
    pub const fn is_primitive(self) -> bool {
        !self.is_collection() && !matches!(self, Self::Ref)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "Bool",
            Self::Int => "Int",
            Self::Uint => "Uint",
            Self::Float => "Float",
            Self::String => "String",
            Self::Blob => "Blob",
            Self::Ref => "Ref",
            Self::List => "List",
            Self::Map => "Map",
            Self::Set => "Set",
            Self::Null => "Null",
        };
        f.write_str(name)
    }
}
