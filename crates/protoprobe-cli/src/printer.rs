//! Indented text rendering of decoded messages.

use protoprobe_core::{DecodedMessage, DecodedValue};
use std::fmt::Write as FmtWrite;

const INDENT: &str = "  ";

/// Render a decoded message, one `name: value` line per scalar value
pub(crate) fn render(message: &DecodedMessage) -> String {
    let mut output = String::new();
    write_to(&mut output, message).expect("String write cannot fail");
    output
}

/// Write a decoded message to a writer
pub(crate) fn write_to(w: &mut impl FmtWrite, message: &DecodedMessage) -> std::fmt::Result {
    TreePrinter::new(w).write_message(message)
}

struct TreePrinter<'a, W: FmtWrite> {
    writer: &'a mut W,
    indent_level: usize,
}

impl<'a, W: FmtWrite> TreePrinter<'a, W> {
    fn new(writer: &'a mut W) -> Self {
        Self {
            writer,
            indent_level: 0,
        }
    }

    fn write_indent(&mut self) -> std::fmt::Result {
        for _ in 0..self.indent_level {
            self.writer.write_str(INDENT)?;
        }
        Ok(())
    }

    fn write_message(&mut self, message: &DecodedMessage) -> std::fmt::Result {
        for field in message.fields() {
            for value in field.values() {
                self.write_indent()?;
                match value {
                    DecodedValue::Message(nested) => {
                        writeln!(self.writer, "{} {{", field.name())?;
                        self.indent_level += 1;
                        self.write_message(nested)?;
                        self.indent_level -= 1;
                        self.write_indent()?;
                        writeln!(self.writer, "}}")?;
                    }
                    scalar => writeln!(self.writer, "{}: {}", field.name(), scalar)?,
                }
            }
        }
        Ok(())
    }
}
