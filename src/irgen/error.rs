//! IR generation error type.

/// Errors out of the IR generator.
///
/// `Logic` covers broken invariants (an undefined type, an unterminated
/// block) — these indicate a bug upstream, not a user mistake, since the
/// earlier passes reject every invalid program. `Format` carries the
/// write failures of the text emitters so `?` works throughout.
#[derive(Debug)]
pub enum CodeGenError {
    Logic(String),
    Format(std::fmt::Error),
}

impl std::fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeGenError::Logic(message) => write!(f, "{}", message),
            CodeGenError::Format(e) => write!(f, "IR emission error: {}", e),
        }
    }
}

impl std::error::Error for CodeGenError {}

impl From<std::fmt::Error> for CodeGenError {
    fn from(e: std::fmt::Error) -> CodeGenError {
        CodeGenError::Format(e)
    }
}

impl From<String> for CodeGenError {
    fn from(message: String) -> CodeGenError {
        CodeGenError::Logic(message)
    }
}
