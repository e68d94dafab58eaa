//! String-literal globals.
//!
//! String literals become private null-terminated byte array constants,
//! deduplicated by content. With opaque pointers the global name itself is
//! the `ptr` value handed around.

use super::{CodeGenError, IRGenerator};
use std::fmt::Write as _;

impl IRGenerator<'_> {
    /// Get or create the global for a string literal, returning its name.
    pub(super) fn string_global(&mut self, content: &str) -> Result<String, CodeGenError> {
        if let Some(name) = self.string_constants.get(content) {
            return Ok(name.clone());
        }
        let name = format!("@.str.{}", self.string_counter);
        self.string_counter += 1;

        let escaped = escape_string(content)?;
        let len = content.len() + 1;
        writeln!(
            self.string_globals,
            "{} = private unnamed_addr constant [{} x i8] c\"{}\\00\"",
            name, len, escaped
        )?;
        self.string_constants
            .insert(content.to_string(), name.clone());
        Ok(name)
    }
}

/// Escape a string for an LLVM `c"..."` constant: printable ASCII stays,
/// everything else becomes `\XX` byte escapes.
fn escape_string(content: &str) -> Result<String, std::fmt::Error> {
    let mut escaped = String::with_capacity(content.len());
    for byte in content.bytes() {
        match byte {
            b'\\' => escaped.push_str(r"\\"),
            b'"' => escaped.push_str(r"\22"),
            0x20..=0x7e => escaped.push(byte as char),
            _ => write!(escaped, r"\{:02X}", byte)?,
        }
    }
    Ok(escaped)
}
