//! Scopes as parent-linked arena nodes.
//!
//! A `ScopeId` is an O(1) snapshot of the environment at one program point.
//! Pushing an entry allocates a child node; lookup walks the parent chain,
//! so inner declarations shadow outer ones for free. The resolver records a
//! snapshot per compound offset, which is exactly what injection passes ask
//! for.

use std::fmt;

use morph_ast::{AccessMode, AddressSpace, Name, StmtId};
use morph_types::Idx;

/// Index into the scope arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The empty scope (no entries).
    pub const EMPTY: ScopeId = ScopeId(u32::MAX);

    #[inline]
    const fn new(index: u32) -> Self {
        ScopeId(index)
    }

    #[inline]
    const fn is_empty_scope(self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty_scope() {
            write!(f, "ScopeId::EMPTY")
        } else {
            write!(f, "ScopeId({})", self.0)
        }
    }
}

/// How a name was declared.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum EntryKind {
    /// Module-scope `var` in the given address space.
    GlobalVar(AddressSpace),
    /// Module-scope `const`.
    GlobalConst,
    /// Pipeline-overridable constant.
    Override,
    /// Function-scope `var`.
    LocalVar,
    /// Function-scope `let`.
    LocalLet,
    /// Function-scope `const`.
    LocalConst,
    /// Formal parameter.
    Parameter,
}

impl EntryKind {
    /// Whether this entry names a storage location (usable as an l-value).
    pub const fn is_storage(self) -> bool {
        matches!(self, EntryKind::GlobalVar(_) | EntryKind::LocalVar)
    }
}

/// One declared name.
#[derive(Copy, Clone, Debug)]
pub struct ScopeEntry {
    pub name: Name,
    /// The VALUE type of the name (the reference view is reconstructed from
    /// `kind` + `access` where needed).
    pub ty: Idx,
    pub kind: EntryKind,
    /// Access mode for storage entries.
    pub access: AccessMode,
    /// The declaring statement (`StmtId::INVALID` for module-scope and
    /// parameter entries).
    pub decl: StmtId,
}

struct ScopeNode {
    parent: ScopeId,
    entry: ScopeEntry,
}

/// Arena of scope nodes for one resolved module.
#[derive(Default)]
pub struct ScopeArena {
    nodes: Vec<ScopeNode>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend `parent` with one entry, returning the child scope.
    pub fn push(&mut self, parent: ScopeId, entry: ScopeEntry) -> ScopeId {
        let id = ScopeId::new(
            u32::try_from(self.nodes.len()).unwrap_or_else(|_| panic!("scope arena overflow")),
        );
        self.nodes.push(ScopeNode { parent, entry });
        id
    }

    /// Innermost entry for `name`, if any.
    pub fn entry(&self, scope: ScopeId, name: Name) -> Option<ScopeEntry> {
        self.iter(scope).find(|entry| entry.name == name)
    }

    /// Iterate entries innermost-first. Shadowed entries appear after the
    /// entries shadowing them; callers that want "all visible names" should
    /// de-duplicate by name, keeping the first occurrence.
    pub fn iter(&self, scope: ScopeId) -> ScopeIter<'_> {
        ScopeIter { arena: self, cursor: scope }
    }

    /// All visible entries, innermost-first, shadowed names removed.
    pub fn visible_entries(&self, scope: ScopeId) -> Vec<ScopeEntry> {
        let mut seen = rustc_hash::FxHashSet::default();
        self.iter(scope)
            .filter(|entry| seen.insert(entry.name))
            .collect()
    }
}

/// Iterator over a scope chain.
pub struct ScopeIter<'a> {
    arena: &'a ScopeArena,
    cursor: ScopeId,
}

impl Iterator for ScopeIter<'_> {
    type Item = ScopeEntry;

    fn next(&mut self) -> Option<ScopeEntry> {
        if self.cursor.is_empty_scope() {
            return None;
        }
        let node = &self.arena.nodes[self.cursor.0 as usize];
        self.cursor = node.parent;
        Some(node.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: Name, ty: Idx) -> ScopeEntry {
        ScopeEntry {
            name,
            ty,
            kind: EntryKind::LocalLet,
            access: AccessMode::Read,
            decl: StmtId::INVALID,
        }
    }

    #[test]
    fn test_lookup_and_shadowing() {
        let mut arena = ScopeArena::new();
        let x = Name::from_raw(1);
        let y = Name::from_raw(2);

        let s1 = arena.push(ScopeId::EMPTY, entry(x, Idx::I32));
        let s2 = arena.push(s1, entry(y, Idx::F32));
        let s3 = arena.push(s2, entry(x, Idx::BOOL));

        assert_eq!(arena.entry(s1, x).map(|e| e.ty), Some(Idx::I32));
        assert_eq!(arena.entry(s2, x).map(|e| e.ty), Some(Idx::I32));
        // Inner declaration shadows.
        assert_eq!(arena.entry(s3, x).map(|e| e.ty), Some(Idx::BOOL));
        assert_eq!(arena.entry(s3, y).map(|e| e.ty), Some(Idx::F32));
        assert!(arena.entry(ScopeId::EMPTY, x).is_none());
    }

    #[test]
    fn test_snapshots_are_independent() {
        let mut arena = ScopeArena::new();
        let x = Name::from_raw(1);
        let s1 = arena.push(ScopeId::EMPTY, entry(x, Idx::I32));
        // Extending s1 does not disturb the s1 snapshot.
        let _s2 = arena.push(s1, entry(Name::from_raw(2), Idx::F32));
        assert_eq!(arena.visible_entries(s1).len(), 1);
    }

    #[test]
    fn test_visible_entries_dedup() {
        let mut arena = ScopeArena::new();
        let x = Name::from_raw(1);
        let s1 = arena.push(ScopeId::EMPTY, entry(x, Idx::I32));
        let s2 = arena.push(s1, entry(x, Idx::BOOL));
        let visible = arena.visible_entries(s2);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].ty, Idx::BOOL);
    }
}
