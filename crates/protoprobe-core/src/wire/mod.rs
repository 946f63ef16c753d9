//! Schema-driven wire format decoding.
//!
//! The [`Decoder`] walks a stream of `(key, value)` pairs against a
//! [`MessageDefinition`], checking every key against the declared fields and
//! recursing into message-typed fields with a child byte budget taken from
//! the length prefix.
//!
//! ## Integer policy
//!
//! Every integer-like value is reported as `i64` by plain two's complement
//! reinterpretation at its wire width. There is no zig-zag step for any
//! type, `sint32` and `sint64` included. `sfixed32` is sign-extended,
//! `fixed32` is zero-extended.
//!
//! ## Example
//!
//! ```
//! use protoprobe_core::{Decoder, SchemaLoader, SchemaRegistry};
//! use std::collections::HashMap;
//!
//! let mut registry = SchemaRegistry::new();
//! let point = SchemaLoader::new(HashMap::<String, String>::new()).load(
//!     "syntax = \"proto2\";\nmessage Point {\n  required int32 x = 1;\n  required int32 y = 2;\n}\n",
//!     &mut registry,
//! )?;
//!
//! let decoded = Decoder::new(&registry)
//!     .decode_bytes(&point, &[0x08, 0x02, 0x10, 0x04])
//!     .expect("matches Point");
//! assert_eq!(decoded.values(1)[0].as_int(), Some(2));
//! assert_eq!(decoded.values(2)[0].as_int(), Some(4));
//! # Ok::<(), protoprobe_core::Error>(())
//! ```

mod reader;

use crate::error::DecodeError;
use crate::schema::{MessageDefinition, SchemaRegistry};
use crate::types::{ScalarType, WireCategory, WireType};
use crate::value::{DecodedField, DecodedMessage, DecodedValue};
use bytes::Buf;
use reader::Frame;
use tracing::{debug, trace};

pub use reader::{decode_varint, MAX_VARINT_LEN};

/// Budget for a top-level call that may consume the whole stream
pub const WHOLE_STREAM: usize = usize::MAX;

/// How the length of a length-delimited value is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthPrefix {
    /// One byte, lengths 0 to 255
    #[default]
    SingleByte,
    /// A base-128 varint
    Varint,
}

/// Configuration for the decoder
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Encoding of length prefixes
    pub length_prefix: LengthPrefix,
    /// Deepest message nesting accepted below the top-level message
    pub max_depth: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            length_prefix: LengthPrefix::SingleByte,
            max_depth: 64,
        }
    }
}

impl DecoderConfig {
    /// Creates a new decoder config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the length prefix encoding
    pub fn length_prefix(mut self, prefix: LengthPrefix) -> Self {
        self.length_prefix = prefix;
        self
    }

    /// Sets the nesting limit
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Decodes binary data against messages of a [`SchemaRegistry`]
#[derive(Debug, Clone)]
pub struct Decoder<'r> {
    registry: &'r SchemaRegistry,
    config: DecoderConfig,
}

impl<'r> Decoder<'r> {
    /// Creates a decoder with default configuration
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self::with_config(registry, DecoderConfig::default())
    }

    /// Creates a decoder with custom configuration
    pub fn with_config(registry: &'r SchemaRegistry, config: DecoderConfig) -> Self {
        Self { registry, config }
    }

    /// The active configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes at most `budget` bytes of `buf` into `message`.
    ///
    /// Returns `true` if every key named a declared field with a matching
    /// wire type, every value was read in full, and the cardinalities hold
    /// when the budget or the stream runs out. On `false` the contents of
    /// `message` must not be used.
    pub fn decode<B: Buf>(
        &self,
        message: &mut DecodedMessage,
        buf: &mut B,
        budget: usize,
    ) -> bool {
        match self.try_decode(message, buf, budget) {
            Ok(consumed) => {
                trace!("Decoded {} from {} bytes", message.name(), consumed);
                true
            }
            Err(e) => {
                debug!("Input does not match {}: {}", message.name(), e);
                false
            }
        }
    }

    /// Same as [`decode`](Self::decode), reporting why a decode failed.
    ///
    /// On success returns the number of bytes consumed.
    pub fn try_decode<B: Buf>(
        &self,
        message: &mut DecodedMessage,
        buf: &mut B,
        budget: usize,
    ) -> Result<usize, DecodeError> {
        let mut frame = Frame::new(buf, budget);
        self.decode_frame(message, &mut frame, 0)?;
        Ok(frame.consumed())
    }

    /// Decodes a whole buffer as one instance of `definition`
    pub fn decode_bytes(
        &self,
        definition: &MessageDefinition,
        data: &[u8],
    ) -> Option<DecodedMessage> {
        let mut message = definition.instantiate();
        let mut buf = data;
        self.decode(&mut message, &mut buf, WHOLE_STREAM)
            .then_some(message)
    }

    fn decode_frame<B: Buf>(
        &self,
        message: &mut DecodedMessage,
        frame: &mut Frame<'_, B>,
        depth: usize,
    ) -> Result<(), DecodeError> {
        loop {
            if frame.is_done() {
                return match message.first_unfilled() {
                    None => Ok(()),
                    Some(field) => Err(DecodeError::CardinalityViolation {
                        field: field.name().to_string(),
                        cardinality: field.cardinality().as_str(),
                        count: field.values().len(),
                    }),
                };
            }

            let key = frame.read_varint()?;
            let number = key >> 3;
            let wire_type = WireType::try_from((key & 0x07) as u8)?;

            let field = match u32::try_from(number).ok().and_then(|n| message.field(n)) {
                Some(field) => field,
                None => {
                    return Err(DecodeError::UnknownField {
                        message: message.name().to_string(),
                        number,
                    })
                }
            };

            let value = self.read_value(field, wire_type, frame, depth)?;
            trace!("{}.{} = {}", message.name(), field.name(), value);

            let number = field.number();
            if let Some(field) = message.field_mut(number) {
                field.push(value);
            }
        }
    }

    fn read_value<B: Buf>(
        &self,
        field: &DecodedField,
        wire_type: WireType,
        frame: &mut Frame<'_, B>,
        depth: usize,
    ) -> Result<DecodedValue, DecodeError> {
        if let Some(nested) = self.registry.get(field.type_name()) {
            if wire_type != WireType::Len {
                return Err(mismatch(field, wire_type));
            }
            return self.read_message(nested, frame, depth);
        }

        let scalar = field.scalar().ok_or_else(|| DecodeError::UnknownType {
            field: field.name().to_string(),
            type_name: field.type_name().to_string(),
        })?;
        if wire_type.category() != Some(scalar.wire_category()) {
            return Err(mismatch(field, wire_type));
        }

        let value = match scalar.wire_category() {
            WireCategory::Varint => DecodedValue::Int(frame.read_varint()? as i64),
            WireCategory::Fixed64 => {
                let raw = frame.read_fixed64()?;
                match scalar {
                    ScalarType::Double => DecodedValue::Double(f64::from_bits(raw)),
                    _ => DecodedValue::Int(raw as i64),
                }
            }
            WireCategory::Fixed32 => {
                let raw = frame.read_fixed32()?;
                match scalar {
                    ScalarType::Float => DecodedValue::Float(f32::from_bits(raw)),
                    ScalarType::Sfixed32 => DecodedValue::Int(i64::from(raw as i32)),
                    _ => DecodedValue::Int(i64::from(raw)),
                }
            }
            WireCategory::LengthDelimited => {
                let len = self.read_length(frame)?;
                let bytes = frame.read_bytes(len)?;
                let text = match scalar {
                    ScalarType::String => std::str::from_utf8(&bytes).ok().map(str::to_owned),
                    _ => None,
                };
                // a `string` field with non UTF-8 content still matches, kept as raw bytes
                match text {
                    Some(text) => DecodedValue::Text(text),
                    None => DecodedValue::Bytes(bytes),
                }
            }
        };

        Ok(value)
    }

    fn read_message<B: Buf>(
        &self,
        definition: &MessageDefinition,
        frame: &mut Frame<'_, B>,
        depth: usize,
    ) -> Result<DecodedValue, DecodeError> {
        if depth >= self.config.max_depth {
            return Err(DecodeError::RecursionLimit(self.config.max_depth));
        }

        let len = self.read_length(frame)?;
        let mut child = definition.instantiate();
        frame.nested(len, |child_frame| self.decode_frame(&mut child, child_frame, depth + 1))?;
        Ok(DecodedValue::Message(child))
    }

    fn read_length<B: Buf>(&self, frame: &mut Frame<'_, B>) -> Result<usize, DecodeError> {
        match self.config.length_prefix {
            LengthPrefix::SingleByte => Ok(usize::from(frame.read_u8("length prefix")?)),
            LengthPrefix::Varint => {
                let len = frame.read_varint()?;
                usize::try_from(len).map_err(|_| DecodeError::budget(usize::MAX, frame.remaining()))
            }
        }
    }
}

fn mismatch(field: &DecodedField, wire_type: WireType) -> DecodeError {
    DecodeError::WireTypeMismatch {
        field: field.name().to_string(),
        type_name: field.type_name().to_string(),
        wire_type: wire_type as u8,
    }
}
