//! Decoded value tree.
//!
//! A [`DecodedMessage`] mirrors the [`MessageDefinition`] it was
//! instantiated from: one [`DecodedField`] per declared field, each holding
//! the values read for it in stream order.

use crate::schema::{Cardinality, MessageDefinition};
use crate::types::ScalarType;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;

/// A single decoded value
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    /// Any integer-like type, as signed 64-bit two's complement
    Int(i64),
    /// `double`
    Double(f64),
    /// `float`
    Float(f32),
    /// `bytes`, or a `string` whose content is not UTF-8
    Bytes(Bytes),
    /// `string`
    Text(String),
    /// A message-typed field
    Message(DecodedMessage),
}

impl DecodedValue {
    /// Returns the integer, if this is one
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the double, if this is one
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float, if this is one
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns raw bytes for `bytes` and `string` values
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            Self::Text(v) => Some(v.as_bytes()),
            _ => None,
        }
    }

    /// Returns the text, if this is a `string` value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the nested message, if this is one
    pub fn as_message(&self) -> Option<&DecodedMessage> {
        match self {
            Self::Message(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{:?}", v),
            Self::Bytes(v) => {
                f.write_str("0x")?;
                for byte in v.iter() {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Self::Message(v) => write!(f, "{}", v),
        }
    }
}

/// Values read for one declared field
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    number: u32,
    name: String,
    type_name: String,
    cardinality: Cardinality,
    scalar: Option<ScalarType>,
    values: Vec<DecodedValue>,
}

impl DecodedField {
    /// Field number
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declared cardinality
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Primitive type resolved from the definition, `None` for message types
    pub fn scalar(&self) -> Option<ScalarType> {
        self.scalar
    }

    /// Values in the order they appeared in the stream
    pub fn values(&self) -> &[DecodedValue] {
        &self.values
    }

    /// Returns true if the value count satisfies the cardinality
    pub fn is_filled(&self) -> bool {
        self.cardinality.accepts(self.values.len())
    }

    pub(crate) fn push(&mut self, value: DecodedValue) {
        self.values.push(value);
    }
}

/// One decoded instance of a message
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    name: String,
    fields: BTreeMap<u32, DecodedField>,
}

impl DecodedMessage {
    /// Creates a holder with an empty value list for every declared field
    pub fn new(definition: &MessageDefinition) -> Self {
        let fields = definition
            .fields()
            .map(|field| {
                let decoded = DecodedField {
                    number: field.number(),
                    name: field.name().to_string(),
                    type_name: field.type_name().to_string(),
                    cardinality: field.cardinality(),
                    scalar: field.scalar(),
                    values: Vec::new(),
                };
                (field.number(), decoded)
            })
            .collect();

        Self {
            name: definition.name().to_string(),
            fields,
        }
    }

    /// Name of the message this was decoded as
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a field by number
    pub fn field(&self, number: u32) -> Option<&DecodedField> {
        self.fields.get(&number)
    }

    /// Looks up a field by name
    pub fn field_by_name(&self, name: &str) -> Option<&DecodedField> {
        self.fields.values().find(|field| field.name == name)
    }

    /// Values of a field, empty if the number is not declared
    pub fn values(&self, number: u32) -> &[DecodedValue] {
        self.field(number).map(DecodedField::values).unwrap_or_default()
    }

    /// Nested messages decoded for a field
    pub fn messages(&self, number: u32) -> impl Iterator<Item = &DecodedMessage> {
        self.values(number).iter().filter_map(DecodedValue::as_message)
    }

    /// Fields in ascending number order
    pub fn fields(&self) -> impl Iterator<Item = &DecodedField> {
        self.fields.values()
    }

    /// Returns true if every required field has exactly one value and every
    /// optional field at most one
    pub fn is_filled(&self) -> bool {
        self.fields.values().all(DecodedField::is_filled)
    }

    /// First field, by number, whose cardinality is not satisfied
    pub fn first_unfilled(&self) -> Option<&DecodedField> {
        self.fields.values().find(|field| !field.is_filled())
    }

    pub(crate) fn field_mut(&mut self, number: u32) -> Option<&mut DecodedField> {
        self.fields.get_mut(&number)
    }
}

impl fmt::Display for DecodedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.name)?;
        let mut first = true;
        for field in self.fields.values() {
            for value in &field.values {
                f.write_str(if first { " " } else { ", " })?;
                write!(f, "{}: {}", field.name, value)?;
                first = false;
            }
        }
        f.write_str(if first { "}" } else { " }" })
    }
}
