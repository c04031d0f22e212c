//! Semantic types for wgslmorph.
//!
//! `Idx` is THE canonical type representation: all types are stored in a
//! unified [`TypePool`] and referenced by their 32-bit index. Scalars are
//! pre-interned at fixed indices for O(1) access; type equality is O(1)
//! index comparison.
//!
//! Syntactic `TypeDecl`s (how a type is spelled in source) live in
//! `morph_ast`; the resolver maps between the two.

mod idx;
mod pool;

pub use idx::Idx;
pub use pool::{ScalarKind, StructField, TypeKind, TypePool};
