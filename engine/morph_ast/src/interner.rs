//! String interner backing [`Name`].
//!
//! Single-threaded: the engine runs one session per shader job, so the
//! interner needs no locking. O(1) intern for already-seen strings, O(1)
//! lookup by index.

use rustc_hash::FxHashMap;

use crate::Name;

/// String interner.
///
/// Index 0 is the pre-interned empty string ([`Name::EMPTY`]).
pub struct StringInterner {
    map: FxHashMap<String, u32>,
    strings: Vec<String>,
}

impl StringInterner {
    /// Create a new interner with the empty string pre-interned.
    pub fn new() -> Self {
        let mut interner = StringInterner {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(64),
        };
        interner.map.insert(String::new(), 0);
        interner.strings.push(String::new());
        interner
    }

    /// Intern a string, returning its `Name`.
    pub fn intern(&mut self, s: &str) -> Name {
        if let Some(&idx) = self.map.get(s) {
            return Name::from_raw(idx);
        }
        let idx = u32::try_from(self.strings.len()).unwrap_or_else(|_| {
            // 4 billion identifiers exceeds any shader this engine will see.
            panic!("interner capacity exceeded")
        });
        self.strings.push(s.to_owned());
        self.map.insert(s.to_owned(), idx);
        Name::from_raw(idx)
    }

    /// Look up the string for a name.
    ///
    /// # Panics
    /// Panics if the name was not produced by this interner.
    pub fn lookup(&self, name: Name) -> &str {
        &self.strings[name.index()]
    }

    /// Number of interned strings (including the empty string).
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether only the empty string is interned.
    pub fn is_empty(&self) -> bool {
        self.strings.len() == 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let mut interner = StringInterner::new();
        let a = interner.intern("frag_main");
        let b = interner.intern("frag_main");
        assert_eq!(a, b);
        assert_eq!(interner.lookup(a), "frag_main");
    }

    #[test]
    fn test_empty_pre_interned() {
        let mut interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert_eq!(interner.lookup(Name::EMPTY), "");
    }

    #[test]
    fn test_distinct_names() {
        let mut interner = StringInterner::new();
        let x = interner.intern("x");
        let y = interner.intern("y");
        assert_ne!(x, y);
        assert_eq!(interner.lookup(x), "x");
        assert_eq!(interner.lookup(y), "y");
    }
}
