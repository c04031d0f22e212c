//! Arbitrary expression/statement synthesis.
//!
//! Produces a value of a required type with no constraint on WHAT the value
//! is — only that the expression type-checks and passes validation in any
//! position, including when every leaf is a literal and the whole tree is
//! const-evaluated. That last requirement drives the operand guards below:
//! multiply and shift operands are masked small, divisors are forced odd
//! with `| 1`, u32 subtraction is rewritten `(a | b) - b`, so no generated
//! tree can overflow or trap during const evaluation.
//!
//! Booleans and integer scalars get recursive weighted construction over
//! literals, in-scope accesses, operators and builtins; every other type
//! falls back to a constant built from 1 broadcast through the type's
//! shape — an explicit, reproducible incompleteness, not a silent upgrade.

use morph_ast::{
    BinaryOp, ExprId, ExprKind, FloatSuffix, IntSuffix, LocalKind, ModuleArena, StmtId, StmtKind,
    UnaryOp,
};
use morph_resolve::{ScopeEntry, ScopeId};
use morph_types::{Idx, ScalarKind, TypeKind};

use crate::choice::{choose, go_deeper};
use crate::ctx::GenCtx;
use crate::donor;
use crate::MorphError;

#[derive(Copy, Clone, Debug)]
enum ExprRule {
    Literal,
    Variable,
    Unary,
    Binary,
    Builtin,
}

#[derive(Copy, Clone, Debug)]
enum StmtRule {
    FreshVariable,
    EmptyCompound,
    DonorFragment,
    SideEffectFree,
}

/// Synthesize an expression of type `ty` with an unconstrained value,
/// wrapped as `ArbitraryExpression`.
pub fn arbitrary_expr(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    ty: Idx,
    scope: ScopeId,
    depth: u32,
) -> Result<ExprId, MorphError> {
    let inner = match ty {
        Idx::BOOL => arbitrary_bool(ctx, arena, scope, depth)?,
        Idx::I32 | Idx::U32 => arbitrary_int(ctx, arena, ty, scope, depth)?,
        // The deliberate fallback: 1 broadcast through the type's shape.
        _ => constant_one(ctx, arena, ty)?,
    };
    Ok(arena.alloc_expr(ExprKind::ArbitraryExpression(inner)))
}

fn pick_rule(
    ctx: &mut GenCtx<'_>,
    depth: u32,
    has_variable: bool,
) -> Result<ExprRule, MorphError> {
    let max_depth = ctx.session.settings().max_depth;
    if !go_deeper(ctx.session.rng(), depth, max_depth) {
        return Ok(if has_variable {
            // A leaf draw between the two non-recursive rules.
            if ctx.session.rng().flip(0.5) {
                ExprRule::Variable
            } else {
                ExprRule::Literal
            }
        } else {
            ExprRule::Literal
        });
    }
    let weights = ctx.session.settings().arbitrary.clone();
    let options = [
        (weights.literal, ExprRule::Literal),
        (if has_variable { weights.variable } else { 0 }, ExprRule::Variable),
        (weights.unary, ExprRule::Unary),
        (weights.binary, ExprRule::Binary),
        (weights.builtin, ExprRule::Builtin),
    ];
    choose(ctx.session.rng(), "arbitrary expression rule", &options).copied()
}

fn arbitrary_bool(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    scope: ScopeId,
    depth: u32,
) -> Result<ExprId, MorphError> {
    let has_variable = !access_candidates(ctx, Idx::BOOL, scope).is_empty();
    let rule = pick_rule(ctx, depth, has_variable)?;
    match rule {
        ExprRule::Literal => {
            let value = ctx.session.rng().flip(0.5);
            Ok(arena.alloc_expr(ExprKind::BoolLit(value)))
        }
        ExprRule::Variable => variable_access(ctx, arena, Idx::BOOL, scope)
            .map_or_else(|| Ok(arena.alloc_expr(ExprKind::BoolLit(false))), Ok),
        ExprRule::Unary => {
            let operand = arbitrary_bool(ctx, arena, scope, depth + 1)?;
            Ok(arena.alloc_expr(ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            }))
        }
        ExprRule::Binary => {
            let ops = [(1u32, BinaryOp::LogicalAnd), (1, BinaryOp::LogicalOr)];
            let op = *choose(ctx.session.rng(), "bool operator", &ops)?;
            let left = arbitrary_bool(ctx, arena, scope, depth + 1)?;
            let right = arbitrary_bool(ctx, arena, scope, depth + 1)?;
            Ok(arena.alloc_expr(ExprKind::Binary { op, left, right }))
        }
        ExprRule::Builtin => {
            // Comparisons stand in for builtin boolean producers; they take
            // the role `all`/`any` play for vectors without needing one.
            let ops = [
                (1u32, BinaryOp::Equal),
                (1, BinaryOp::NotEqual),
                (1, BinaryOp::LessThan),
                (1, BinaryOp::GreaterEqual),
            ];
            let op = *choose(ctx.session.rng(), "comparison operator", &ops)?;
            let left = arbitrary_int(ctx, arena, Idx::I32, scope, depth + 1)?;
            let right = arbitrary_int(ctx, arena, Idx::I32, scope, depth + 1)?;
            Ok(arena.alloc_expr(ExprKind::Binary { op, left, right }))
        }
    }
}

fn arbitrary_int(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    ty: Idx,
    scope: ScopeId,
    depth: u32,
) -> Result<ExprId, MorphError> {
    let has_variable = !access_candidates(ctx, ty, scope).is_empty();
    let rule = pick_rule(ctx, depth, has_variable)?;
    match rule {
        ExprRule::Literal => int_literal(ctx, arena, ty),
        ExprRule::Variable => match variable_access(ctx, arena, ty, scope) {
            Some(access) => Ok(access),
            None => int_literal(ctx, arena, ty),
        },
        ExprRule::Unary => {
            let operand = arbitrary_int(ctx, arena, ty, scope, depth + 1)?;
            if ty == Idx::I32 && ctx.session.rng().flip(0.5) {
                Ok(arena.alloc_expr(ExprKind::Unary {
                    op: UnaryOp::Negate,
                    operand,
                }))
            } else {
                // Complements explode toward the type's bit width; mask the
                // result back down so const evaluation can never overflow a
                // later arithmetic step.
                let complement = arena.alloc_expr(ExprKind::Unary {
                    op: UnaryOp::BitNot,
                    operand,
                });
                Ok(mask(arena, complement, ty, 0xFFFF))
            }
        }
        ExprRule::Binary => int_binary(ctx, arena, ty, scope, depth),
        ExprRule::Builtin => int_builtin(ctx, arena, ty, scope, depth),
    }
}

#[derive(Copy, Clone, Debug)]
enum IntOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
}

fn int_binary(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    ty: Idx,
    scope: ScopeId,
    depth: u32,
) -> Result<ExprId, MorphError> {
    let ops = [
        (2u32, IntOp::Add),
        (2, IntOp::Subtract),
        (1, IntOp::Multiply),
        (1, IntOp::Divide),
        (1, IntOp::Modulo),
        (1, IntOp::BitAnd),
        (1, IntOp::BitOr),
        (1, IntOp::BitXor),
        (1, IntOp::ShiftLeft),
        (1, IntOp::ShiftRight),
    ];
    let op = *choose(ctx.session.rng(), "int operator", &ops)?;
    let left = arbitrary_int(ctx, arena, ty, scope, depth + 1)?;
    match op {
        IntOp::Add => {
            let right = arbitrary_int(ctx, arena, ty, scope, depth + 1)?;
            Ok(binary(arena, BinaryOp::Add, left, right))
        }
        IntOp::Subtract => {
            let right = arbitrary_int(ctx, arena, ty, scope, depth + 1)?;
            if ty == Idx::U32 {
                // `(a | b) - b` cannot underflow.
                let joined = binary(arena, BinaryOp::BitOr, left, right);
                Ok(binary(arena, BinaryOp::Subtract, joined, right))
            } else {
                Ok(binary(arena, BinaryOp::Subtract, left, right))
            }
        }
        IntOp::Multiply => {
            let right = arbitrary_int(ctx, arena, ty, scope, depth + 1)?;
            let left = mask(arena, left, ty, 0xFF);
            let right = mask(arena, right, ty, 0xFF);
            Ok(binary(arena, BinaryOp::Multiply, left, right))
        }
        IntOp::Divide | IntOp::Modulo => {
            let right = arbitrary_int(ctx, arena, ty, scope, depth + 1)?;
            let one = int_literal_value(arena, ty, 1);
            let nonzero = binary(arena, BinaryOp::BitOr, right, one);
            let wgsl_op = if matches!(op, IntOp::Divide) {
                BinaryOp::Divide
            } else {
                BinaryOp::Modulo
            };
            Ok(binary(arena, wgsl_op, left, nonzero))
        }
        IntOp::BitAnd | IntOp::BitOr | IntOp::BitXor => {
            let right = arbitrary_int(ctx, arena, ty, scope, depth + 1)?;
            let wgsl_op = match op {
                IntOp::BitAnd => BinaryOp::BitAnd,
                IntOp::BitOr => BinaryOp::BitOr,
                _ => BinaryOp::BitXor,
            };
            let masked = binary(arena, wgsl_op, left, right);
            // Xor/complement patterns can set high bits; keep results small.
            Ok(mask(arena, masked, ty, 0xFFFF))
        }
        IntOp::ShiftLeft | IntOp::ShiftRight => {
            // Shift amounts are u32 and masked `% 8u`; the shifted operand
            // is masked so `<< 7` stays far from the bit width.
            let amount = arbitrary_int(ctx, arena, Idx::U32, scope, depth + 1)?;
            let eight = int_literal_value(arena, Idx::U32, 8);
            let amount = binary(arena, BinaryOp::Modulo, amount, eight);
            let left = mask(arena, left, ty, 0xFF);
            let wgsl_op = if matches!(op, IntOp::ShiftLeft) {
                BinaryOp::ShiftLeft
            } else {
                BinaryOp::ShiftRight
            };
            Ok(binary(arena, wgsl_op, left, amount))
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum IntBuiltin {
    Abs,
    Clamp,
    Min,
    Max,
    CountOneBits,
    ReverseBits,
    ExtractBits,
    PackedDot,
}

fn int_builtin(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    ty: Idx,
    scope: ScopeId,
    depth: u32,
) -> Result<ExprId, MorphError> {
    let options = [
        (1u32, IntBuiltin::Abs),
        (1, IntBuiltin::Clamp),
        (1, IntBuiltin::Min),
        (1, IntBuiltin::Max),
        (1, IntBuiltin::CountOneBits),
        (1, IntBuiltin::ReverseBits),
        (1, IntBuiltin::ExtractBits),
        (1, IntBuiltin::PackedDot),
    ];
    let builtin = *choose(ctx.session.rng(), "int builtin", &options)?;
    let first = arbitrary_int(ctx, arena, ty, scope, depth + 1)?;
    let (name, args) = match builtin {
        IntBuiltin::Abs => ("abs", vec![first]),
        IntBuiltin::Clamp => {
            let low = int_literal_value(arena, ty, 0);
            let high = int_literal_value(arena, ty, 255);
            ("clamp", vec![first, low, high])
        }
        IntBuiltin::Min => {
            let second = arbitrary_int(ctx, arena, ty, scope, depth + 1)?;
            ("min", vec![first, second])
        }
        IntBuiltin::Max => {
            let second = arbitrary_int(ctx, arena, ty, scope, depth + 1)?;
            ("max", vec![first, second])
        }
        IntBuiltin::CountOneBits => ("countOneBits", vec![first]),
        IntBuiltin::ReverseBits => {
            // Reversal sets high bits; keep the result bounded.
            let call = call_builtin(ctx, arena, "reverseBits", vec![first]);
            return Ok(mask(arena, call, ty, 0xFFFF));
        }
        IntBuiltin::ExtractBits => {
            let offset = int_literal_value(arena, Idx::U32, 0);
            let count = int_literal_value(arena, Idx::U32, 16);
            ("extractBits", vec![first, offset, count])
        }
        IntBuiltin::PackedDot => {
            let a = arbitrary_int(ctx, arena, Idx::U32, scope, depth + 1)?;
            let b = arbitrary_int(ctx, arena, Idx::U32, scope, depth + 1)?;
            let name = if ty == Idx::I32 {
                "dot4I8Packed"
            } else {
                "dot4U8Packed"
            };
            return Ok(call_builtin(ctx, arena, name, vec![a, b]));
        }
    };
    Ok(call_builtin(ctx, arena, name, args))
}

fn call_builtin(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    name: &str,
    args: Vec<ExprId>,
) -> ExprId {
    let callee = ctx.session.intern(name);
    let args = arena.alloc_expr_list(args);
    arena.alloc_expr(ExprKind::FunctionCall { callee, args })
}

fn binary(arena: &mut ModuleArena, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
    arena.alloc_expr(ExprKind::Binary { op, left, right })
}

fn mask(arena: &mut ModuleArena, expr: ExprId, ty: Idx, bits: i64) -> ExprId {
    let mask_lit = int_literal_value(arena, ty, bits);
    binary(arena, BinaryOp::BitAnd, expr, mask_lit)
}

fn int_literal(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    ty: Idx,
) -> Result<ExprId, MorphError> {
    let value = i64::from(ctx.session.rng().next_below(17));
    Ok(int_literal_value(arena, ty, value))
}

fn int_literal_value(arena: &mut ModuleArena, ty: Idx, value: i64) -> ExprId {
    let suffix = if ty == Idx::U32 {
        IntSuffix::U
    } else {
        IntSuffix::I
    };
    arena.alloc_expr(ExprKind::IntLit { value, suffix })
}

// Variable access chains

/// In-scope entries from which an access chain can reach a value of `ty`.
fn access_candidates(ctx: &GenCtx<'_>, ty: Idx, scope: ScopeId) -> Vec<ScopeEntry> {
    ctx.resolver
        .scopes()
        .visible_entries(scope)
        .into_iter()
        .filter(|entry| {
            // Storage aliased by a live pointer elsewhere in the function
            // must not be read through a second path.
            !(entry.kind.is_storage() && ctx.resolver.is_aliased(ctx.function.name, entry.name))
        })
        .filter(|entry| reaches(ctx, entry.ty, ty))
        .collect()
}

/// Whether `from` contains a component of type `target`.
fn reaches(ctx: &GenCtx<'_>, from: Idx, target: Idx) -> bool {
    if from == target {
        return true;
    }
    match ctx.pool.kind(from) {
        TypeKind::Vector { elem, .. } | TypeKind::Array { elem, .. } => {
            reaches(ctx, elem, target)
        }
        TypeKind::Matrix { elem, .. } => reaches(ctx, elem, target),
        TypeKind::Struct { name } => ctx
            .pool
            .fields_of(name)
            .is_some_and(|fields| fields.iter().any(|field| reaches(ctx, field.ty, target))),
        // Pointers, references and atomics are never navigated.
        _ => false,
    }
}

/// Build a random access chain from an in-scope entry down to a component
/// of type `ty`. Returns `None` when no candidate exists.
fn variable_access(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    ty: Idx,
    scope: ScopeId,
) -> Option<ExprId> {
    let candidates = access_candidates(ctx, ty, scope);
    if candidates.is_empty() {
        return None;
    }
    let pick = ctx
        .session
        .rng()
        .next_below(u32::try_from(candidates.len()).unwrap_or(u32::MAX));
    let entry = candidates[pick as usize];
    let mut expr = arena.alloc_expr(ExprKind::Ident(entry.name));
    let mut current = entry.ty;
    while current != ty {
        match ctx.pool.kind(current) {
            TypeKind::Vector { size, elem } => {
                let index = ctx.session.rng().next_below(size.as_u32());
                expr = index_access(arena, expr, i64::from(index));
                current = elem;
            }
            TypeKind::Array { elem, count } => {
                let bound = count.unwrap_or(1).max(1);
                let index = ctx.session.rng().next_below(bound);
                expr = index_access(arena, expr, i64::from(index));
                current = elem;
            }
            TypeKind::Matrix { cols, rows, elem } => {
                let index = ctx.session.rng().next_below(cols.as_u32());
                expr = index_access(arena, expr, i64::from(index));
                current = ctx.pool.vector(rows, elem);
            }
            TypeKind::Struct { name } => {
                let fields: Vec<(morph_ast::Name, Idx)> = ctx
                    .pool
                    .fields_of(name)?
                    .iter()
                    .filter(|field| reaches(ctx, field.ty, ty))
                    .map(|field| (field.name, field.ty))
                    .collect();
                if fields.is_empty() {
                    return None;
                }
                let pick = ctx
                    .session
                    .rng()
                    .next_below(u32::try_from(fields.len()).unwrap_or(u32::MAX));
                let (member, field_ty) = fields[pick as usize];
                expr = arena.alloc_expr(ExprKind::MemberLookup {
                    receiver: expr,
                    member,
                });
                current = field_ty;
            }
            _ => return None,
        }
    }
    Some(expr)
}

fn index_access(arena: &mut ModuleArena, receiver: ExprId, index: i64) -> ExprId {
    let index = arena.alloc_expr(ExprKind::IntLit {
        value: index,
        suffix: IntSuffix::None,
    });
    arena.alloc_expr(ExprKind::IndexLookup { receiver, index })
}

// The broadcast-1 fallback

/// A constant of type `ty` built from the value 1 broadcast through the
/// type's shape.
pub fn constant_one(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    ty: Idx,
) -> Result<ExprId, MorphError> {
    match ctx.pool.kind(ty) {
        TypeKind::Scalar(scalar) => scalar_one(arena, scalar),
        TypeKind::Vector { size, elem } => {
            let spelled = ctx.spell_type(arena, ty)?;
            let mut args = Vec::with_capacity(size.as_u32() as usize);
            for _ in 0..size.as_u32() {
                args.push(constant_one(ctx, arena, elem)?);
            }
            let args = arena.alloc_expr_list(args);
            Ok(arena.alloc_expr(ExprKind::VectorConstructor { ty: spelled, args }))
        }
        TypeKind::Matrix { cols, rows, elem } => {
            let spelled = ctx.spell_type(arena, ty)?;
            let column_ty = ctx.pool.vector(rows, elem);
            let mut args = Vec::with_capacity(cols.as_u32() as usize);
            for _ in 0..cols.as_u32() {
                args.push(constant_one(ctx, arena, column_ty)?);
            }
            let args = arena.alloc_expr_list(args);
            Ok(arena.alloc_expr(ExprKind::MatrixConstructor { ty: spelled, args }))
        }
        TypeKind::Array { elem, count } => {
            let count = count.ok_or(MorphError::UnsupportedType {
                context: "runtime-sized array constant",
            })?;
            let spelled = ctx.spell_type(arena, ty)?;
            let mut args = Vec::with_capacity(count as usize);
            for _ in 0..count {
                args.push(constant_one(ctx, arena, elem)?);
            }
            let args = arena.alloc_expr_list(args);
            Ok(arena.alloc_expr(ExprKind::ArrayConstructor { ty: spelled, args }))
        }
        TypeKind::Struct { name } => {
            let spelled = ctx.spell_type(arena, ty)?;
            let field_types: Vec<Idx> = ctx
                .pool
                .fields_of(name)
                .ok_or(MorphError::UnsupportedType {
                    context: "unregistered struct constant",
                })?
                .iter()
                .map(|field| field.ty)
                .collect();
            let mut args = Vec::with_capacity(field_types.len());
            for field_ty in field_types {
                args.push(constant_one(ctx, arena, field_ty)?);
            }
            let args = arena.alloc_expr_list(args);
            Ok(arena.alloc_expr(ExprKind::StructConstructor { ty: spelled, args }))
        }
        TypeKind::Pointer { .. } | TypeKind::Reference { .. } | TypeKind::Atomic { .. } => {
            Err(MorphError::UnsupportedType {
                context: "broadcast constant",
            })
        }
    }
}

fn scalar_one(arena: &mut ModuleArena, scalar: ScalarKind) -> Result<ExprId, MorphError> {
    let kind = match scalar {
        ScalarKind::Bool => ExprKind::BoolLit(true),
        ScalarKind::I32 => ExprKind::IntLit {
            value: 1,
            suffix: IntSuffix::I,
        },
        ScalarKind::U32 => ExprKind::IntLit {
            value: 1,
            suffix: IntSuffix::U,
        },
        ScalarKind::F32 => ExprKind::FloatLit {
            bits: 1f64.to_bits(),
            suffix: FloatSuffix::F,
        },
        ScalarKind::F16 => ExprKind::FloatLit {
            bits: 1f64.to_bits(),
            suffix: FloatSuffix::H,
        },
        ScalarKind::AbstractInt | ScalarKind::AbstractFloat => {
            return Err(MorphError::UnsupportedType {
                context: "abstract broadcast constant",
            })
        }
    };
    Ok(arena.alloc_expr(kind))
}

// Arbitrary statements

/// Synthesize one statement whose only observable effect is on bindings it
/// introduces itself.
pub fn arbitrary_statement(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    scope: ScopeId,
    depth: u32,
) -> Result<StmtId, MorphError> {
    let weights = ctx.session.settings().arbitrary_statement.clone();
    let options = [
        (weights.fresh_variable, StmtRule::FreshVariable),
        (weights.empty_compound, StmtRule::EmptyCompound),
        (
            if ctx.donor.is_some() {
                weights.donor_fragment
            } else {
                0
            },
            StmtRule::DonorFragment,
        ),
        (weights.side_effect_free, StmtRule::SideEffectFree),
    ];
    match *choose(ctx.session.rng(), "arbitrary statement", &options)? {
        StmtRule::FreshVariable => fresh_variable(ctx, arena, scope, depth),
        StmtRule::EmptyCompound => {
            let range = arena.alloc_stmt_list([]);
            Ok(arena.alloc_stmt(StmtKind::Compound(range)))
        }
        StmtRule::DonorFragment => donor::splice_compound(ctx, arena, scope, depth),
        StmtRule::SideEffectFree => Err(MorphError::Unimplemented(
            "side-effect-free compound generation",
        )),
    }
}

/// A compound of 0..=2 arbitrary statements (the dead arm of a wrapper).
pub fn arbitrary_compound(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    scope: ScopeId,
    depth: u32,
) -> Result<StmtId, MorphError> {
    let count = ctx.session.rng().next_below(3);
    let mut stmts = Vec::with_capacity(count as usize);
    for _ in 0..count {
        stmts.push(arbitrary_statement(ctx, arena, scope, depth + 1)?);
    }
    let range = arena.alloc_stmt_list(stmts);
    Ok(arena.alloc_stmt(StmtKind::Compound(range)))
}

fn fresh_variable(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    scope: ScopeId,
    depth: u32,
) -> Result<StmtId, MorphError> {
    let types = [(1u32, Idx::I32), (1, Idx::U32), (1, Idx::BOOL)];
    let ty = *choose(ctx.session.rng(), "fresh variable type", &types)?;
    let name = ctx.session.fresh_name("arb");
    let spelled = ctx.spell_type(arena, ty)?;
    let init = arbitrary_expr(ctx, arena, ty, scope, depth + 1)?;
    Ok(arena.alloc_stmt(StmtKind::Variable {
        kind: LocalKind::Var,
        name,
        ty: spelled,
        init,
    }))
}
