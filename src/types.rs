//! Value types of the Vela language.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of Vela types.
///
/// `Undefined` marks "not yet inferred" while the type checker runs; it is
/// never observable after a successful check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Ty {
    Int,
    String,
    Void,
    #[default]
    Undefined,
}

impl Ty {
    /// The source-level name of this type.
    pub fn name(self) -> &'static str {
        match self {
            Ty::Int => "int",
            Ty::String => "string",
            Ty::Void => "void",
            Ty::Undefined => "undefined",
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
