//! # protoprobe-core
//!
//! A library for decoding Protocol Buffers wire data against schemas given
//! in a minimal `.proto`-style text format.
//!
//! This crate provides the core functionality for:
//! - Loading message definitions, with imports, into a shared registry
//! - Mapping primitive type names to their wire encodings
//! - Decoding binary data against a message, checking field numbers, wire
//!   types, byte budgets and cardinalities
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`types`]: Primitive type table and wire types
//! - [`schema`]: Schema loading and the message registry
//! - [`wire`]: The wire decoder
//! - [`value`]: Decoded value tree
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use protoprobe_core::{Decoder, SchemaLoader, SchemaRegistry};
//! use std::fs;
//!
//! let mut registry = SchemaRegistry::new();
//! let message = SchemaLoader::from_dir("./proto").load_file("./proto/point.proto", &mut registry)?;
//!
//! let data = fs::read("./pb/sample.bin")?;
//! match Decoder::new(&registry).decode_bytes(&message, &data) {
//!     Some(decoded) => println!("{}", decoded),
//!     None => println!("sample does not match {}", message.name()),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`ImportResolver`]: Supply imported schema sources from somewhere other
//!   than the file system
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod error;
pub mod schema;
pub mod types;
pub mod value;
pub mod wire;

// Re-export primary types for convenience
pub use error::{DecodeError, Error, Result};
pub use schema::{
    Cardinality, FieldDefinition, FsResolver, ImportResolver, MessageDefinition, SchemaLoader,
    SchemaRegistry,
};
pub use types::{resolve, ScalarType, WireCategory, WireType};
pub use value::{DecodedField, DecodedMessage, DecodedValue};
pub use wire::{Decoder, DecoderConfig, LengthPrefix, WHOLE_STREAM};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
