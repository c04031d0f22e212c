//! AST node types.
//!
//! The hierarchy is closed: global declarations, statements, expressions,
//! l-value expressions and syntactic types are each a single exhaustive enum.
//! Augmented variants (`KnownValue`, `DeadCodeFragment`, …) carry the
//! provenance the transformation passes rely on; they are first-class nodes
//! so passes compose without re-deriving proofs.

mod decl;
mod expr;
mod operators;
mod stmt;
mod types;

pub use decl::{
    Function, GlobalDecl, GlobalValue, GlobalValueKind, GlobalVar, Module, Param, ShaderStage,
    StructDecl, StructMember, TypeAlias,
};
pub use expr::{ExprKind, FloatSuffix, IntSuffix, LhsExprKind};
pub use operators::{AssignOp, BinaryOp, UnaryOp};
pub use stmt::{LocalKind, StmtKind, SwitchCase};
pub use types::{
    AccessMode, AddressSpace, AttrKind, Attribute, BuiltinValue, TypeDecl, VecSize,
};

#[cfg(test)]
mod tests;
