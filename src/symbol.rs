//! Interned names.
//!
//! Identifiers, type names and function names are interned once and then
//! passed around as a `Copy` id. Two symbols compare equal exactly when
//! their textual names match, which makes scope maps and external-name
//! sets cheap. Interned storage lives for the whole process.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, OnceLock};

/// An interned name. 4 bytes, `Copy`, order-independent equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

struct Interner {
    names: Vec<&'static str>,
    ids: HashMap<&'static str, u32>,
}

static INTERNER: OnceLock<Mutex<Interner>> = OnceLock::new();

fn interner() -> &'static Mutex<Interner> {
    INTERNER.get_or_init(|| {
        Mutex::new(Interner {
            names: Vec::new(),
            ids: HashMap::new(),
        })
    })
}

impl Symbol {
    /// Intern a name, returning its id. Re-interning the same text
    /// returns the same id.
    pub fn new(name: &str) -> Symbol {
        let mut interner = interner().lock().expect("symbol interner poisoned");
        if let Some(&id) = interner.ids.get(name) {
            return Symbol(id);
        }
        // Leak to get a 'static reference; symbols live for the process.
        let stored: &'static str = Box::leak(name.to_string().into_boxed_str());
        let id = interner.names.len() as u32;
        interner.names.push(stored);
        interner.ids.insert(stored, id);
        Symbol(id)
    }

    /// The interned text.
    pub fn as_str(self) -> &'static str {
        let interner = interner().lock().expect("symbol interner poisoned");
        interner.names[self.0 as usize]
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

// Symbols travel through the AST interchange format as plain strings.

impl serde::Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Symbol, D::Error> {
        let name = <String as serde::Deserialize>::deserialize(deserializer)?;
        Ok(Symbol::new(&name))
    }
}
