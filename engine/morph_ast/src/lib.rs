//! wgslmorph AST - shader tree representation
//!
//! This crate contains the core data structures of the transformation engine:
//! - Interned `Name`s for identifiers
//! - AST nodes (global declarations, statements, expressions, l-values,
//!   syntactic types, attributes)
//! - Arena allocation for all tree nodes
//! - Visitor and rewrite frameworks
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: Strings → `Name(u32)`
//! - **Flatten Everything**: No `Box<Expr>`, use `ExprId(u32)` indices
//! - **Never Mutate**: the arena is append-only; a transformation returns a
//!   new root id that structurally shares every untouched subtree with its
//!   input. Node identity is the arena id, never structural equality.
//!
//! Types that contain floats store them as u64 bits for Hash compatibility.

/// Compile-time assertion that a type has a specific size.
///
/// Used to prevent accidental size regressions in frequently-allocated types.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod arena;
pub mod ast;
mod ids;
mod interner;
mod name;
pub mod rewrite;
pub mod visitor;

pub use arena::ModuleArena;
pub use ast::{
    AccessMode,
    AddressSpace,
    AssignOp,
    Attribute,
    AttrKind,
    BinaryOp,
    BuiltinValue,
    ExprKind,
    FloatSuffix,
    Function,
    GlobalDecl,
    GlobalValue,
    GlobalValueKind,
    GlobalVar,
    IntSuffix,
    LhsExprKind,
    LocalKind,
    Module,
    Param,
    ShaderStage,
    StmtKind,
    StructDecl,
    StructMember,
    SwitchCase,
    TypeAlias,
    TypeDecl,
    UnaryOp,
    VecSize,
};
pub use ids::{CaseRange, ExprId, ExprRange, LhsId, StmtId, StmtRange, TyId, UniqueId};
pub use interner::StringInterner;
pub use name::Name;
