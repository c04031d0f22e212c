//! Shared generation context.
//!
//! Bundles the references every generator needs: the session (settings +
//! RNG + counters), the resolver of the CURRENT input tree, the type pool,
//! uniform values, and the optional donor. The arena is passed separately
//! because the rewrite framework owns it during rebuilds.

use morph_ast::{ExprId, ExprKind, FloatSuffix, IntSuffix, ModuleArena, Name, TyId, TypeDecl};
use morph_resolve::{Resolver, UniformState};
use morph_types::{Idx, ScalarKind, TypeKind, TypePool};

use crate::donor::Donor;
use crate::session::Session;
use crate::MorphError;

/// The function a generator is currently working inside.
#[derive(Copy, Clone, Debug)]
pub struct FunctionCtx {
    pub name: Name,
    /// Return type; `Idx::NONE` for void.
    pub ret: Idx,
}

impl FunctionCtx {
    pub fn none() -> Self {
        FunctionCtx {
            name: Name::EMPTY,
            ret: Idx::NONE,
        }
    }
}

/// Everything a generator consults besides the arena.
pub struct GenCtx<'a> {
    pub session: &'a mut Session,
    pub resolver: &'a Resolver,
    pub pool: &'a mut TypePool,
    pub uniforms: &'a UniformState,
    pub donor: Option<&'a Donor>,
    pub function: FunctionCtx,
}

impl GenCtx<'_> {
    /// Spell a semantic type as a syntactic type declaration.
    pub fn spell_type(&mut self, arena: &mut ModuleArena, idx: Idx) -> Result<TyId, MorphError> {
        match self.pool.kind(idx) {
            TypeKind::Scalar(scalar) => {
                let keyword = scalar.keyword().ok_or(MorphError::UnsupportedType {
                    context: "spelling an abstract type",
                })?;
                let name = self.session.intern(keyword);
                Ok(arena.alloc_ty(TypeDecl::Named(name)))
            }
            TypeKind::Vector { size, elem } => {
                let elem = self.spell_type(arena, elem)?;
                Ok(arena.alloc_ty(TypeDecl::Vector { size, elem }))
            }
            TypeKind::Matrix { cols, rows, elem } => {
                let elem = self.spell_type(arena, elem)?;
                Ok(arena.alloc_ty(TypeDecl::Matrix { cols, rows, elem }))
            }
            TypeKind::Array { elem, count } => {
                let elem = self.spell_type(arena, elem)?;
                let count = match count {
                    Some(n) => arena.alloc_expr(ExprKind::IntLit {
                        value: i64::from(n),
                        suffix: IntSuffix::None,
                    }),
                    None => ExprId::INVALID,
                };
                Ok(arena.alloc_ty(TypeDecl::Array { elem, count }))
            }
            TypeKind::Struct { name } => Ok(arena.alloc_ty(TypeDecl::Named(name))),
            TypeKind::Atomic { elem } => {
                let elem = self.spell_type(arena, elem)?;
                Ok(arena.alloc_ty(TypeDecl::Atomic { elem }))
            }
            TypeKind::Pointer { .. } | TypeKind::Reference { .. } => {
                Err(MorphError::UnsupportedType {
                    context: "spelling an indirection type",
                })
            }
        }
    }
}

/// A literal of a concrete scalar type, with the matching suffix.
pub fn scalar_literal(
    arena: &mut ModuleArena,
    ty: Idx,
    value: i64,
) -> Result<ExprId, MorphError> {
    let kind = match ty {
        Idx::I32 => ExprKind::IntLit {
            value,
            suffix: IntSuffix::I,
        },
        Idx::U32 => ExprKind::IntLit {
            value,
            suffix: IntSuffix::U,
        },
        Idx::F32 => ExprKind::FloatLit {
            bits: (value as f64).to_bits(),
            suffix: FloatSuffix::F,
        },
        _ => {
            return Err(MorphError::UnsupportedType {
                context: "scalar literal",
            })
        }
    };
    Ok(arena.alloc_expr(kind))
}

/// Whether the known-value engine can target this scalar type.
pub fn known_value_scalar(pool: &TypePool, ty: Idx) -> Option<ScalarKind> {
    match ty {
        Idx::I32 | Idx::U32 | Idx::F32 => pool.as_scalar(ty),
        _ => None,
    }
}
