//! Message and field definitions, and the registry that holds them.
//!
//! Definitions are produced by the [`SchemaLoader`] and never change once
//! they are in a [`SchemaRegistry`]. Decoding works on a
//! [`DecodedMessage`] instantiated from a definition, so the registry can be
//! shared by any number of decode calls.
//!
//! ## Example
//!
//! ```
//! use protoprobe_core::{SchemaLoader, SchemaRegistry};
//! use std::collections::HashMap;
//!
//! let mut registry = SchemaRegistry::new();
//! let loader = SchemaLoader::new(HashMap::<String, String>::new());
//! let point = loader.load(
//!     "syntax = \"proto2\";\nmessage Point {\n  required int32 x = 1;\n}\n",
//!     &mut registry,
//! )?;
//!
//! assert_eq!(point.name(), "Point");
//! assert!(registry.contains("Point"));
//! # Ok::<(), protoprobe_core::Error>(())
//! ```

mod loader;

use crate::error::{Error, Result};
use crate::types::{ScalarType, WireCategory};
use crate::value::DecodedMessage;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub use loader::{FsResolver, ImportResolver, SchemaLoader};

/// How many values a field may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Exactly one value
    Required,
    /// Zero or one value
    Optional,
    /// Any number of values
    Repeated,
}

impl Cardinality {
    /// Parses the leading keyword of a field line
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "required" => Some(Self::Required),
            "optional" => Some(Self::Optional),
            "repeated" => Some(Self::Repeated),
            _ => None,
        }
    }

    /// The schema keyword for this cardinality
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Optional => "optional",
            Self::Repeated => "repeated",
        }
    }

    /// Returns true if a field holding `count` values satisfies this cardinality
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Required => count == 1,
            Self::Optional => count <= 1,
            Self::Repeated => true,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field line of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    number: u32,
    name: String,
    type_name: String,
    cardinality: Cardinality,
    scalar: Option<ScalarType>,
}

impl FieldDefinition {
    /// Creates a field, resolving its primitive type once
    pub fn new(
        number: u32,
        name: impl Into<String>,
        type_name: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        let type_name = type_name.into();
        let scalar = ScalarType::from_name(&type_name);
        Self {
            number,
            name: name.into(),
            type_name,
            cardinality,
            scalar,
        }
    }

    /// Field number, unique within the message
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type name as written in the schema
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declared cardinality
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// The primitive type, if the type name is one
    pub fn scalar(&self) -> Option<ScalarType> {
        self.scalar
    }

    /// Wire category of a primitive field.
    ///
    /// `None` for message-typed fields, which are always length-delimited but
    /// only known to be messages once the registry is consulted.
    pub fn wire_category(&self) -> Option<WireCategory> {
        self.scalar.map(ScalarType::wire_category)
    }
}

/// A `message` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDefinition {
    name: String,
    fields: BTreeMap<u32, FieldDefinition>,
}

impl MessageDefinition {
    /// Creates a message with no fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field, rejecting a number that is already taken
    pub fn add_field(&mut self, field: FieldDefinition) -> Result<()> {
        if self.fields.contains_key(&field.number) {
            return Err(Error::DuplicateField {
                message: self.name.clone(),
                number: field.number,
            });
        }
        self.fields.insert(field.number, field);
        Ok(())
    }

    /// Message name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a field by number
    pub fn field(&self, number: u32) -> Option<&FieldDefinition> {
        self.fields.get(&number)
    }

    /// Fields in ascending number order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.values()
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the message declares no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Creates an empty value holder for one decode of this message
    pub fn instantiate(&self) -> DecodedMessage {
        DecodedMessage::new(self)
    }
}

/// All messages known to a load, keyed by name
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    messages: HashMap<String, MessageDefinition>,
}

impl SchemaRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a message, returning the definition it replaced
    pub fn insert(&mut self, message: MessageDefinition) -> Option<MessageDefinition> {
        self.messages.insert(message.name.clone(), message)
    }

    /// Looks up a message by name
    pub fn get(&self, name: &str) -> Option<&MessageDefinition> {
        self.messages.get(name)
    }

    /// Returns true if a message with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.messages.contains_key(name)
    }

    /// Number of registered messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if nothing has been loaded
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Registered message names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.messages.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
