//! The name table shared between host and compiled code.

/// How a symbol's value may be used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    /// Native code following the parameter-stack convention.
    Function,
    /// Like `Function`, but invoked at compile time.
    Macro,
    /// An address or immediate pushed verbatim.
    Value,
}

struct Entry {
    name: String,
    value: *const u8,
    kind: SymbolKind,
}

/// Insertion-ordered symbol table. New entries shadow old ones and
/// nothing is ever removed, so lookup is a newest-first linear scan —
/// n stays small and this is nowhere near a hot path.
#[derive(Default)]
pub struct SymbolTable {
    entries: Vec<Entry>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, value: *const u8, kind: SymbolKind) {
        self.entries.push(Entry {
            name: name.to_owned(),
            value,
            kind,
        });
    }

    pub fn lookup(&self, name: &str) -> Option<(*const u8, SymbolKind)> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.name == name)
            .map(|e| (e.value, e.kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_registered_names() {
        let mut tab = SymbolTable::new();
        tab.add("DUP", 0x1000 as *const u8, SymbolKind::Function);
        tab.add("PTRSIZE", 8 as *const u8, SymbolKind::Value);

        assert_eq!(
            tab.lookup("DUP"),
            Some((0x1000 as *const u8, SymbolKind::Function))
        );
        assert_eq!(tab.lookup("NOPE"), None);
    }

    #[test]
    fn newer_entries_shadow_older_ones() {
        let mut tab = SymbolTable::new();
        tab.add("F", 0x1000 as *const u8, SymbolKind::Function);
        tab.add("F", 0x2000 as *const u8, SymbolKind::Macro);

        assert_eq!(
            tab.lookup("F"),
            Some((0x2000 as *const u8, SymbolKind::Macro))
        );
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut tab = SymbolTable::new();
        tab.add("DUP", 0x1000 as *const u8, SymbolKind::Function);
        assert_eq!(tab.lookup("dup"), None);
    }
}
