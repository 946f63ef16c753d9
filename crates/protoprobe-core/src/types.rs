//! Primitive type names and the wire categories they travel in.
//!
//! Wire types carried in field keys:
//! - 0: VARINT (int, int32, uint32, uint64, sint32, sint64, bool, enum)
//! - 1: I64 (int64, fixed64, sfixed64, double)
//! - 2: LEN (string, bytes, embedded messages)
//! - 3, 4: group markers, never accepted
//! - 5: I32 (fixed32, sfixed32, float)
//!
//! `int64` rides the 64-bit category here, not varint.

use crate::error::DecodeError;
use std::fmt;

/// The encoding a value takes on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireCategory {
    /// Base-128 variable-length integer
    Varint,
    /// 8 little-endian bytes
    Fixed64,
    /// Length prefix followed by raw bytes
    LengthDelimited,
    /// 4 little-endian bytes
    Fixed32,
}

impl fmt::Display for WireCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Varint => "Varint",
            Self::Fixed64 => "64-bit",
            Self::LengthDelimited => "Length-delimited",
            Self::Fixed32 => "32-bit",
        })
    }
}

/// Wire type tag in the low three bits of a field key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    I64 = 1,
    /// Length-delimited
    Len = 2,
    /// Start group (deprecated)
    StartGroup = 3,
    /// End group (deprecated)
    EndGroup = 4,
    /// 32-bit fixed-width
    I32 = 5,
}

impl WireType {
    /// The value category this wire type carries; groups carry none
    pub fn category(self) -> Option<WireCategory> {
        match self {
            Self::Varint => Some(WireCategory::Varint),
            Self::I64 => Some(WireCategory::Fixed64),
            Self::Len => Some(WireCategory::LengthDelimited),
            Self::I32 => Some(WireCategory::Fixed32),
            Self::StartGroup | Self::EndGroup => None,
        }
    }
}

impl TryFrom<u8> for WireType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::I32),
            _ => Err(DecodeError::InvalidWireType(value)),
        }
    }
}

/// One of the closed set of primitive schema types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// `string`, UTF-8 text
    String,
    /// `bytes`, opaque
    Bytes,
    /// `int64`
    Int64,
    /// `fixed64`
    Fixed64,
    /// `sfixed64`
    Sfixed64,
    /// `double`
    Double,
    /// `int`
    Int,
    /// `int32`
    Int32,
    /// `uint32`
    Uint32,
    /// `uint64`
    Uint64,
    /// `sint32`
    Sint32,
    /// `sint64`
    Sint64,
    /// `bool`
    Bool,
    /// `enum`
    Enum,
    /// `fixed32`
    Fixed32,
    /// `sfixed32`
    Sfixed32,
    /// `float`
    Float,
}

impl ScalarType {
    /// Looks up a primitive by its schema keyword
    pub fn from_name(name: &str) -> Option<Self> {
        let scalar = match name {
            "string" => Self::String,
            "bytes" => Self::Bytes,
            "int64" => Self::Int64,
            "fixed64" => Self::Fixed64,
            "sfixed64" => Self::Sfixed64,
            "double" => Self::Double,
            "int" => Self::Int,
            "int32" => Self::Int32,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            "sint32" => Self::Sint32,
            "sint64" => Self::Sint64,
            "bool" => Self::Bool,
            "enum" => Self::Enum,
            "fixed32" => Self::Fixed32,
            "sfixed32" => Self::Sfixed32,
            "float" => Self::Float,
            _ => return None,
        };
        Some(scalar)
    }

    /// The schema keyword for this type
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Int64 => "int64",
            Self::Fixed64 => "fixed64",
            Self::Sfixed64 => "sfixed64",
            Self::Double => "double",
            Self::Int => "int",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Sint32 => "sint32",
            Self::Sint64 => "sint64",
            Self::Bool => "bool",
            Self::Enum => "enum",
            Self::Fixed32 => "fixed32",
            Self::Sfixed32 => "sfixed32",
            Self::Float => "float",
        }
    }

    /// The wire category values of this type are encoded in
    pub fn wire_category(self) -> WireCategory {
        match self {
            Self::String | Self::Bytes => WireCategory::LengthDelimited,
            Self::Int64 | Self::Fixed64 | Self::Sfixed64 | Self::Double => WireCategory::Fixed64,
            Self::Int
            | Self::Int32
            | Self::Uint32
            | Self::Uint64
            | Self::Sint32
            | Self::Sint64
            | Self::Bool
            | Self::Enum => WireCategory::Varint,
            Self::Fixed32 | Self::Sfixed32 | Self::Float => WireCategory::Fixed32,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves a primitive type name to its wire category.
///
/// Returns `None` for anything outside the primitive set, which includes
/// every message type name.
pub fn resolve(type_name: &str) -> Option<WireCategory> {
    ScalarType::from_name(type_name).map(ScalarType::wire_category)
}
