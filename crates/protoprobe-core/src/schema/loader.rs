//! Line-oriented parser for the schema language.
//!
//! ```text
//! syntax = "proto2";
//! import "geometry/point.proto";
//! message Segment {
//!   required Point from = 1;
//!   required Point to = 2;
//!   optional string label = 3;
//! }
//! ```
//!
//! The first non-blank line must be the syntax declaration; its value is not
//! interpreted. Every later top-level line is an `import` or opens a
//! `message` block. Anything else aborts the load.

use super::{Cardinality, FieldDefinition, MessageDefinition, SchemaRegistry};
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Origin name used for sources passed in as text
const INLINE_ORIGIN: &str = "<inline>";

/// Supplies the text of imported schema files.
///
/// Import paths are handed over exactly as written between the quotes.
pub trait ImportResolver {
    /// Returns the source text for an import path
    fn resolve(&self, path: &str) -> Result<String>;
}

/// Resolves imports against a root directory on disk
#[derive(Debug, Clone)]
pub struct FsResolver {
    root: PathBuf,
}

impl FsResolver {
    /// Creates a resolver rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory imports are resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImportResolver for FsResolver {
    fn resolve(&self, path: &str) -> Result<String> {
        let full = self.root.join(path);
        std::fs::read_to_string(&full).map_err(|e| Error::file_read(full, e))
    }
}

/// In-memory sources keyed by import path
impl ImportResolver for HashMap<String, String> {
    fn resolve(&self, path: &str) -> Result<String> {
        self.get(path).cloned().ok_or_else(|| {
            Error::file_read(
                path,
                io::Error::new(io::ErrorKind::NotFound, "no such schema source"),
            )
        })
    }
}

/// Parses schema text into a [`SchemaRegistry`]
#[derive(Debug, Clone)]
pub struct SchemaLoader<R> {
    resolver: R,
}

impl SchemaLoader<FsResolver> {
    /// Creates a loader that resolves imports under `root`
    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        Self::new(FsResolver::new(root))
    }
}

/// Import bookkeeping for a single top-level load
#[derive(Default)]
struct ImportState {
    visiting: Vec<String>,
    loaded: HashSet<String>,
}

impl<R: ImportResolver> SchemaLoader<R> {
    /// Creates a loader over a custom import resolver
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    /// The resolver used for `import` lines
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Loads schema text into `registry`.
    ///
    /// Every message declared here or in a transitively imported file is
    /// registered; a name that is already registered is replaced. Returns the
    /// last message declared at the top level of `source`.
    pub fn load(&self, source: &str, registry: &mut SchemaRegistry) -> Result<MessageDefinition> {
        self.load_named(INLINE_ORIGIN, source, registry)
    }

    /// Same as [`load`](Self::load), with `origin` used in error messages
    pub fn load_named(
        &self,
        origin: &str,
        source: &str,
        registry: &mut SchemaRegistry,
    ) -> Result<MessageDefinition> {
        let mut state = ImportState::default();
        self.load_source(origin, source, registry, &mut state)?
            .ok_or_else(|| Error::empty_schema(origin))
    }

    /// Reads a schema file from disk and loads it
    pub fn load_file(
        &self,
        path: impl AsRef<Path>,
        registry: &mut SchemaRegistry,
    ) -> Result<MessageDefinition> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        self.load_named(&path.display().to_string(), &source, registry)
    }

    fn load_source(
        &self,
        origin: &str,
        source: &str,
        registry: &mut SchemaRegistry,
        state: &mut ImportState,
    ) -> Result<Option<MessageDefinition>> {
        let mut lines = schema_lines(source);

        match lines.next() {
            Some((_, line)) if line.starts_with("syntax") => {}
            _ => return Err(Error::missing_syntax(origin)),
        }

        let mut last = None;
        let mut declared = 0usize;

        while let Some((line_no, line)) = lines.next() {
            if let Some(rest) = strip_keyword(line, "import") {
                let path = parse_import(rest)
                    .ok_or_else(|| Error::syntax(origin, line_no, "malformed import line"))?;
                self.import(path, registry, state)?;
            } else if let Some(rest) = strip_keyword(line, "message") {
                let message = parse_message(origin, line_no, rest, &mut lines)?;
                trace!("{}: message {} ({} fields)", origin, message.name(), message.len());
                if registry.insert(message.clone()).is_some() {
                    warn!(
                        "{}: message {} redeclared, replacing earlier definition",
                        origin,
                        message.name()
                    );
                }
                declared += 1;
                last = Some(message);
            } else {
                return Err(Error::syntax(
                    origin,
                    line_no,
                    format!("unrecognized line '{}'", line),
                ));
            }
        }

        debug!("Loaded {}: {} message(s)", origin, declared);
        Ok(last)
    }

    fn import(
        &self,
        path: &str,
        registry: &mut SchemaRegistry,
        state: &mut ImportState,
    ) -> Result<()> {
        if state.visiting.iter().any(|p| p == path) {
            return Err(Error::ImportCycle {
                path: path.to_string(),
            });
        }
        if state.loaded.contains(path) {
            trace!("Skipping already imported {}", path);
            return Ok(());
        }

        let source = self.resolver.resolve(path)?;
        state.visiting.push(path.to_string());
        let loaded = self.load_source(path, &source, registry, state);
        state.visiting.pop();
        loaded?;

        state.loaded.insert(path.to_string());
        Ok(())
    }
}

/// Non-blank lines with comments stripped, paired with 1-based line numbers
fn schema_lines(source: &str) -> impl Iterator<Item = (usize, &str)> {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| {
            let code = line.find("//").map_or(line, |idx| &line[..idx]);
            (i + 1, code.trim())
        })
        .filter(|(_, line)| !line.is_empty())
}

/// Strips `keyword` if it is followed by whitespace or ends the line
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn parse_import(rest: &str) -> Option<&str> {
    let quoted = rest.strip_suffix(';')?.trim_end();
    let path = quoted.strip_prefix('"')?.strip_suffix('"')?;
    (!path.is_empty()).then_some(path)
}

fn parse_message<'a>(
    origin: &str,
    line_no: usize,
    header: &str,
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
) -> Result<MessageDefinition> {
    if let Some(name) = header.strip_suffix("{}") {
        let name = message_name(origin, line_no, name)?;
        return Ok(MessageDefinition::new(name));
    }

    let name = match header.strip_suffix('{') {
        Some(name) => message_name(origin, line_no, name)?,
        None => {
            let name = message_name(origin, line_no, header)?;
            match lines.next() {
                Some((_, "{")) => {}
                Some((brace_line, _)) => {
                    return Err(Error::syntax(origin, brace_line, "expected '{'"));
                }
                None => return Err(Error::syntax(origin, line_no, "expected '{'")),
            }
            name
        }
    };

    let mut message = MessageDefinition::new(name);
    for (field_line, line) in lines.by_ref() {
        if line == "}" {
            return Ok(message);
        }
        let field = parse_field(origin, field_line, line)?;
        message.add_field(field)?;
    }

    Err(Error::syntax(
        origin,
        line_no,
        format!("message '{}' is never closed", message.name()),
    ))
}

fn message_name<'a>(origin: &str, line_no: usize, raw: &'a str) -> Result<&'a str> {
    let name = raw.trim();
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(Error::syntax(
            origin,
            line_no,
            format!("invalid message name '{}'", name),
        ))
    }
}

/// Parses `<cardinality> <type> <name> = <number>;`
fn parse_field(origin: &str, line_no: usize, line: &str) -> Result<FieldDefinition> {
    let body = line
        .strip_suffix(';')
        .ok_or_else(|| Error::syntax(origin, line_no, "field line must end with ';'"))?;
    let (decl, number) = body
        .split_once('=')
        .ok_or_else(|| Error::syntax(origin, line_no, "expected '=' in field line"))?;

    let tokens: Vec<&str> = decl.split_whitespace().collect();
    let [cardinality, type_name, name] = tokens.as_slice() else {
        return Err(Error::syntax(
            origin,
            line_no,
            "expected '<cardinality> <type> <name> = <number>;'",
        ));
    };

    let cardinality = Cardinality::from_keyword(cardinality).ok_or_else(|| {
        Error::syntax(origin, line_no, format!("unknown cardinality '{}'", cardinality))
    })?;
    if !is_type_name(type_name) {
        return Err(Error::syntax(origin, line_no, format!("invalid type '{}'", type_name)));
    }
    if !is_identifier(name) {
        return Err(Error::syntax(origin, line_no, format!("invalid field name '{}'", name)));
    }

    let number = number.trim();
    let number: u32 = number.parse().map_err(|_| {
        Error::syntax(origin, line_no, format!("field number '{}' is not a number", number))
    })?;
    if number == 0 {
        return Err(Error::syntax(origin, line_no, "field number must be positive"));
    }

    Ok(FieldDefinition::new(number, *name, *type_name, cardinality))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Identifiers, optionally dot-qualified
fn is_type_name(s: &str) -> bool {
    s.split('.').all(is_identifier)
}
