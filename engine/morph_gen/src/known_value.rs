//! Known-value synthesis: the opaque-predicate engine.
//!
//! Given a target value V and a scalar type, synthesizes an expression that
//! provably evaluates to V on every execution, paired with the literal it
//! equals (`KnownValue`). Recursion is weighted and depth-bounded; every
//! numeric rule keeps its operands inside `[0, 2^24]` — the largest integer
//! range exactly representable in f32, which is what lets a known value
//! cross the int/float boundary without precision loss.
//!
//! The uniform-derivation rule folds a scalar the harness knows the runtime
//! value of into that range (`abs(x) % 16777216`, truncating float leaves
//! through `i32(...)`), then corrects the folded value up or down to V with
//! a further known value. Host-side folding mirrors the shader's concrete
//! arithmetic (i32 wrapping, f32 rounding) exactly.

use morph_ast::{BinaryOp, ExprId, ExprKind, ModuleArena, Name, UnaryOp};
use morph_resolve::ScopeId;
use morph_types::{Idx, ScalarKind, TypeKind};

use crate::arbitrary::arbitrary_expr;
use crate::choice::{choose, go_deeper};
use crate::ctx::{known_value_scalar, scalar_literal, GenCtx};
use crate::MorphError;

/// Largest representable known value: 2^24.
pub const MAX_KNOWN_VALUE: i64 = 1 << 24;

#[derive(Copy, Clone, Debug)]
enum NumericRule {
    Literal,
    Sum,
    Difference,
    Product,
    FromUniform,
}

#[derive(Copy, Clone, Debug)]
enum BoolRule {
    Literal,
    ArbLeft,
    ArbRight,
    NegatedOpposite,
    UniformComparison,
}

/// One scalar leaf of a uniform binding: how to reach it and what the
/// harness knows it holds.
struct UniformLeaf {
    root: Name,
    steps: Vec<Step>,
    scalar: ScalarKind,
    raw: f64,
}

#[derive(Copy, Clone, Debug)]
enum Step {
    Member(Name),
    Index(u32),
}

/// Synthesize a numeric known value of type `ty` equal to `value`.
pub fn known_int(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    ty: Idx,
    value: i64,
    depth: u32,
) -> Result<ExprId, MorphError> {
    if !(0..=MAX_KNOWN_VALUE).contains(&value) {
        return Err(MorphError::KnownValueRange { value });
    }
    let scalar = known_value_scalar(ctx.pool, ty).ok_or(MorphError::UnsupportedType {
        context: "known value synthesis",
    })?;

    let max_depth = ctx.session.settings().max_depth;
    let deeper = go_deeper(ctx.session.rng(), depth, max_depth);
    let rule = if deeper {
        let weights = ctx.session.settings().known_value.clone();
        let leaves_available = !uniform_leaves(ctx).is_empty();
        let options = [
            (weights.literal, NumericRule::Literal),
            (weights.sum, NumericRule::Sum),
            (weights.difference, NumericRule::Difference),
            (
                if scalar.is_integer() && value >= 1 {
                    weights.product
                } else {
                    0
                },
                NumericRule::Product,
            ),
            (
                if leaves_available { weights.from_uniform } else { 0 },
                NumericRule::FromUniform,
            ),
        ];
        *choose(ctx.session.rng(), "known value rule", &options)?
    } else {
        NumericRule::Literal
    };

    let expr = match rule {
        NumericRule::Literal => scalar_literal(arena, ty, value)?,
        NumericRule::Sum => {
            let r = i64::from(ctx.session.rng().next_below(clamp_u32(value + 1)));
            let left = known_int(ctx, arena, ty, r, depth + 1)?;
            let right = known_int(ctx, arena, ty, value - r, depth + 1)?;
            arena.alloc_expr(ExprKind::Binary {
                op: BinaryOp::Add,
                left,
                right,
            })
        }
        NumericRule::Difference => {
            let r = i64::from(
                ctx.session
                    .rng()
                    .next_below(clamp_u32(MAX_KNOWN_VALUE - value + 1)),
            );
            let left = known_int(ctx, arena, ty, value + r, depth + 1)?;
            let right = known_int(ctx, arena, ty, r, depth + 1)?;
            arena.alloc_expr(ExprKind::Binary {
                op: BinaryOp::Subtract,
                left,
                right,
            })
        }
        NumericRule::Product => {
            let r = 1 + i64::from(ctx.session.rng().next_below(clamp_u32(value)));
            let quotient = value / r;
            let remainder = value % r;
            let left = known_int(ctx, arena, ty, r, depth + 1)?;
            let right = known_int(ctx, arena, ty, quotient, depth + 1)?;
            let product = arena.alloc_expr(ExprKind::Binary {
                op: BinaryOp::Multiply,
                left,
                right,
            });
            // The correction term is appended when required, and sometimes
            // when it is not: extra output diversity, preserved as shipped.
            if remainder != 0 || ctx.session.rng().flip(0.5) {
                let correction = known_int(ctx, arena, ty, remainder, depth + 1)?;
                arena.alloc_expr(ExprKind::Binary {
                    op: BinaryOp::Add,
                    left: product,
                    right: correction,
                })
            } else {
                product
            }
        }
        NumericRule::FromUniform => {
            let leaves = uniform_leaves(ctx);
            let pick = ctx.session.rng().next_below(clamp_u32(leaves.len() as i64));
            let leaf = &leaves[pick as usize];
            let (folded, folded_value) = fold_leaf(ctx, arena, leaf)?;
            let adjusted = cast_scalar(ctx, arena, folded, Idx::I32, ty)?;
            if folded_value <= value {
                let correction = known_int(ctx, arena, ty, value - folded_value, depth + 1)?;
                arena.alloc_expr(ExprKind::Binary {
                    op: BinaryOp::Add,
                    left: adjusted,
                    right: correction,
                })
            } else {
                let correction = known_int(ctx, arena, ty, folded_value - value, depth + 1)?;
                arena.alloc_expr(ExprKind::Binary {
                    op: BinaryOp::Subtract,
                    left: adjusted,
                    right: correction,
                })
            }
        }
    };

    let literal = scalar_literal(arena, ty, value)?;
    Ok(arena.alloc_expr(ExprKind::KnownValue {
        expr,
        value: literal,
    }))
}

/// Synthesize a boolean that provably evaluates to `value`, wrapped as
/// `TrueByConstruction` / `FalseByConstruction`.
pub fn known_bool(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    scope: ScopeId,
    value: bool,
    depth: u32,
) -> Result<ExprId, MorphError> {
    let max_depth = ctx.session.settings().max_depth;
    let deeper = go_deeper(ctx.session.rng(), depth, max_depth);
    let rule = if deeper {
        let weights = ctx.session.settings().known_bool.clone();
        let leaves_available = !uniform_leaves(ctx).is_empty();
        let options = [
            (weights.literal, BoolRule::Literal),
            (weights.or_arbitrary, BoolRule::ArbLeft),
            (weights.or_arbitrary, BoolRule::ArbRight),
            (weights.negated_opposite, BoolRule::NegatedOpposite),
            (
                if leaves_available {
                    weights.uniform_comparison
                } else {
                    0
                },
                BoolRule::UniformComparison,
            ),
        ];
        *choose(ctx.session.rng(), "known bool rule", &options)?
    } else {
        BoolRule::Literal
    };

    // `true` absorbs through ||, `false` through && (the De Morgan dual).
    let absorbing_op = if value {
        BinaryOp::LogicalOr
    } else {
        BinaryOp::LogicalAnd
    };

    let expr = match rule {
        BoolRule::Literal => arena.alloc_expr(ExprKind::BoolLit(value)),
        BoolRule::ArbLeft => {
            let left = arena.alloc_expr(ExprKind::BoolLit(value));
            let right = arbitrary_expr(ctx, arena, Idx::BOOL, scope, depth + 1)?;
            arena.alloc_expr(ExprKind::Binary {
                op: absorbing_op,
                left,
                right,
            })
        }
        BoolRule::ArbRight => {
            let left = arbitrary_expr(ctx, arena, Idx::BOOL, scope, depth + 1)?;
            let right = arena.alloc_expr(ExprKind::BoolLit(value));
            arena.alloc_expr(ExprKind::Binary {
                op: absorbing_op,
                left,
                right,
            })
        }
        BoolRule::NegatedOpposite => {
            let opposite = known_bool(ctx, arena, scope, !value, depth + 1)?;
            arena.alloc_expr(ExprKind::Unary {
                op: UnaryOp::Not,
                operand: opposite,
            })
        }
        BoolRule::UniformComparison => {
            let leaves = uniform_leaves(ctx);
            let pick = ctx.session.rng().next_below(clamp_u32(leaves.len() as i64));
            let leaf = &leaves[pick as usize];
            let (folded, folded_value) = fold_leaf(ctx, arena, leaf)?;
            let relations: [(u32, BinaryOp); 3] = if value {
                // Guaranteed true on equal operands.
                [
                    (1, BinaryOp::Equal),
                    (1, BinaryOp::LessEqual),
                    (1, BinaryOp::GreaterEqual),
                ]
            } else {
                // Guaranteed false on equal operands.
                [
                    (1, BinaryOp::NotEqual),
                    (1, BinaryOp::LessThan),
                    (1, BinaryOp::GreaterThan),
                ]
            };
            let relation = *choose(ctx.session.rng(), "opaque relation", &relations)?;
            let known = known_int(ctx, arena, Idx::I32, folded_value, depth + 1)?;
            arena.alloc_expr(ExprKind::Binary {
                op: relation,
                left: folded,
                right: known,
            })
        }
    };

    let wrapped = if value {
        ExprKind::TrueByConstruction(expr)
    } else {
        ExprKind::FalseByConstruction(expr)
    };
    Ok(arena.alloc_expr(wrapped))
}

fn clamp_u32(value: i64) -> u32 {
    u32::try_from(value.max(1)).unwrap_or(u32::MAX)
}

/// All scalar leaves of all uniforms whose runtime value the harness knows.
fn uniform_leaves(ctx: &GenCtx<'_>) -> Vec<UniformLeaf> {
    let mut leaves = Vec::new();
    for binding in ctx.resolver.uniforms() {
        let Some(value) = ctx.uniforms.value(binding.group, binding.binding) else {
            continue;
        };
        collect_leaves(
            ctx,
            binding.name,
            binding.ty,
            value,
            &mut Vec::new(),
            &mut leaves,
        );
    }
    leaves
}

fn collect_leaves(
    ctx: &GenCtx<'_>,
    root: Name,
    ty: Idx,
    value: &morph_resolve::UniformValue,
    path: &mut Vec<Step>,
    out: &mut Vec<UniformLeaf>,
) {
    use morph_resolve::UniformValue;
    match (ctx.pool.kind(ty), value) {
        (TypeKind::Scalar(scalar), leaf) => {
            if matches!(scalar, ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32) {
                if let Some(raw) = leaf.as_f64() {
                    if raw.is_finite() {
                        out.push(UniformLeaf {
                            root,
                            steps: path.clone(),
                            scalar,
                            raw,
                        });
                    }
                }
            }
        }
        (TypeKind::Vector { size, elem }, UniformValue::Composite(parts)) => {
            for i in 0..size.as_u32().min(parts.len() as u32) {
                path.push(Step::Index(i));
                collect_leaves(ctx, root, elem, &parts[i as usize], path, out);
                path.pop();
            }
        }
        (TypeKind::Array { elem, .. }, UniformValue::Composite(parts)) => {
            for (i, part) in parts.iter().enumerate() {
                path.push(Step::Index(i as u32));
                collect_leaves(ctx, root, elem, part, path, out);
                path.pop();
            }
        }
        (TypeKind::Struct { name }, UniformValue::Composite(parts)) => {
            let Some(fields) = ctx.pool.fields_of(name) else {
                return;
            };
            let fields: Vec<(Name, Idx)> =
                fields.iter().map(|field| (field.name, field.ty)).collect();
            for ((field_name, field_ty), part) in fields.into_iter().zip(parts) {
                path.push(Step::Member(field_name));
                collect_leaves(ctx, root, field_ty, part, path, out);
                path.pop();
            }
        }
        (TypeKind::Matrix { cols, rows, elem }, UniformValue::Composite(parts)) => {
            for i in 0..cols.as_u32().min(parts.len() as u32) {
                path.push(Step::Index(i));
                // One column is a vector.
                if let UniformValue::Composite(column) = &parts[i as usize] {
                    for j in 0..rows.as_u32().min(column.len() as u32) {
                        path.push(Step::Index(j));
                        collect_leaves(ctx, root, elem, &column[j as usize], path, out);
                        path.pop();
                    }
                }
                path.pop();
            }
        }
        _ => {}
    }
}

/// Build the folded shader expression for a leaf and compute, host-side,
/// the exact value it evaluates to. The result expression has type i32.
fn fold_leaf(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    leaf: &UniformLeaf,
) -> Result<(ExprId, i64), MorphError> {
    let abs_name = ctx.session.intern("abs");
    let mut access = arena.alloc_expr(ExprKind::Ident(leaf.root));
    for step in &leaf.steps {
        access = match *step {
            Step::Member(member) => arena.alloc_expr(ExprKind::MemberLookup {
                receiver: access,
                member,
            }),
            Step::Index(index) => {
                let index = arena.alloc_expr(ExprKind::IntLit {
                    value: i64::from(index),
                    suffix: morph_ast::IntSuffix::None,
                });
                arena.alloc_expr(ExprKind::IndexLookup {
                    receiver: access,
                    index,
                })
            }
        };
    }
    let abs_args = arena.alloc_expr_list([access]);
    let abs_call = arena.alloc_expr(ExprKind::FunctionCall {
        callee: abs_name,
        args: abs_args,
    });

    match leaf.scalar {
        ScalarKind::I32 => {
            let modulus = arena.alloc_expr(ExprKind::IntLit {
                value: MAX_KNOWN_VALUE,
                suffix: morph_ast::IntSuffix::I,
            });
            let folded = arena.alloc_expr(ExprKind::Binary {
                op: BinaryOp::Modulo,
                left: abs_call,
                right: modulus,
            });
            // Mirror i32 wrapping abs and remainder exactly.
            let w = leaf.raw as i32;
            let value = i64::from(w.wrapping_abs().wrapping_rem(MAX_KNOWN_VALUE as i32)).max(0);
            Ok((folded, value))
        }
        ScalarKind::U32 => {
            let modulus = arena.alloc_expr(ExprKind::IntLit {
                value: MAX_KNOWN_VALUE,
                suffix: morph_ast::IntSuffix::U,
            });
            let folded = arena.alloc_expr(ExprKind::Binary {
                op: BinaryOp::Modulo,
                left: abs_call,
                right: modulus,
            });
            let w = leaf.raw as u32;
            let value = i64::from(w % (MAX_KNOWN_VALUE as u32));
            // The folded expression is u32; bring it into i32 for the
            // caller's uniform handling.
            let folded = cast_scalar(ctx, arena, folded, Idx::U32, Idx::I32)?;
            Ok((folded, value))
        }
        ScalarKind::F32 => {
            let modulus = arena.alloc_expr(ExprKind::FloatLit {
                bits: (MAX_KNOWN_VALUE as f64).to_bits(),
                suffix: morph_ast::FloatSuffix::F,
            });
            let remainder = arena.alloc_expr(ExprKind::Binary {
                op: BinaryOp::Modulo,
                left: abs_call,
                right: modulus,
            });
            // Truncate through i32, mirroring f32 arithmetic host-side.
            let folded = cast_scalar(ctx, arena, remainder, Idx::F32, Idx::I32)?;
            let w = leaf.raw as f32;
            let value = i64::from((w.abs() % (MAX_KNOWN_VALUE as f32)).trunc() as i32);
            Ok((folded, value))
        }
        _ => Err(MorphError::UnsupportedType {
            context: "uniform leaf fold",
        }),
    }
}

/// Wrap `expr` (of scalar type `from`) in a conversion to `to` when needed.
fn cast_scalar(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    expr: ExprId,
    from: Idx,
    to: Idx,
) -> Result<ExprId, MorphError> {
    if from == to {
        return Ok(expr);
    }
    let ty = ctx.spell_type(arena, to)?;
    let args = arena.alloc_expr_list([expr]);
    Ok(arena.alloc_expr(ExprKind::ScalarConstructor { ty, args }))
}
