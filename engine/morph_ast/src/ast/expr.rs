//! Expression nodes.
//!
//! All children are arena indices, not boxes. Literal floats are stored as
//! bits for Hash/Eq. The augmented variants pair a runtime expression with
//! the provenance a pass needs to reason about it later:
//!
//! - `KnownValue` couples an opaque expression with the literal it provably
//!   evaluates to on every execution.
//! - `TrueByConstruction`/`FalseByConstruction` are the boolean
//!   specializations used to build opaque predicates.
//! - `ArbitraryExpression` marks a value that is deliberately unconstrained.
//! - `IdentityOperation` records the original expression so the rewrite can
//!   be stripped mechanically.

use std::fmt;

use super::operators::{BinaryOp, UnaryOp};
use crate::{ExprId, ExprRange, LhsId, Name, TyId, UniqueId};

/// Suffix of an integer literal.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum IntSuffix {
    /// `7i`
    I,
    /// `7u`
    U,
    /// `7` (abstract int)
    None,
}

/// Suffix of a float literal.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FloatSuffix {
    /// `7.0f`
    F,
    /// `7.0h`
    H,
    /// `7.0` (abstract float)
    None,
}

/// Expression variants.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub enum ExprKind {
    /// Variable or constant reference.
    Ident(Name),

    /// `true` / `false`
    BoolLit(bool),

    /// Integer literal with optional suffix. The value is stored wide
    /// enough for abstract ints.
    IntLit { value: i64, suffix: IntSuffix },

    /// Float literal (stored as f64 bits for Hash).
    FloatLit { bits: u64, suffix: FloatSuffix },

    /// Unary operation.
    Unary { op: UnaryOp, operand: ExprId },

    /// Binary operation.
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },

    /// Parenthesized expression.
    Paren(ExprId),

    /// Builtin or user function call: `clamp(x, lo, hi)`, `helper(a)`.
    FunctionCall { callee: Name, args: ExprRange },

    /// Scalar conversion/construction: `i32(x)`, `f32(1u)`.
    ScalarConstructor { ty: TyId, args: ExprRange },

    /// `vecN<T>(...)`
    VectorConstructor { ty: TyId, args: ExprRange },

    /// `matCxR<T>(...)`
    MatrixConstructor { ty: TyId, args: ExprRange },

    /// `array<T, N>(...)`
    ArrayConstructor { ty: TyId, args: ExprRange },

    /// `MyStruct(...)`
    StructConstructor { ty: TyId, args: ExprRange },

    /// `receiver[index]`
    IndexLookup { receiver: ExprId, index: ExprId },

    /// `receiver.member` (struct field or vector swizzle).
    MemberLookup { receiver: ExprId, member: Name },

    /// Augmented: `expr` provably evaluates to the literal `value` on every
    /// execution. The `value` half is metadata, not runtime code; passes
    /// must never rewrite it.
    KnownValue { expr: ExprId, value: ExprId },

    /// Augmented: boolean expression that always evaluates to `true`.
    TrueByConstruction(ExprId),

    /// Augmented: boolean expression that always evaluates to `false`.
    FalseByConstruction(ExprId),

    /// Augmented: a value that is deliberately unconstrained.
    ArbitraryExpression(ExprId),

    /// Augmented: `replacement` computes the same value as `original`;
    /// `tag` is the session-unique paren tag.
    IdentityOperation {
        replacement: ExprId,
        original: ExprId,
        tag: UniqueId,
    },
}

impl fmt::Debug for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprKind::Ident(n) => write!(f, "Ident({n:?})"),
            ExprKind::BoolLit(b) => write!(f, "BoolLit({b})"),
            ExprKind::IntLit { value, suffix } => write!(f, "IntLit({value}, {suffix:?})"),
            ExprKind::FloatLit { bits, suffix } => {
                write!(f, "FloatLit({}, {suffix:?})", f64::from_bits(*bits))
            }
            ExprKind::Unary { op, operand } => write!(f, "Unary({op:?}, {operand:?})"),
            ExprKind::Binary { op, left, right } => {
                write!(f, "Binary({op:?}, {left:?}, {right:?})")
            }
            ExprKind::Paren(inner) => write!(f, "Paren({inner:?})"),
            ExprKind::FunctionCall { callee, args } => {
                write!(f, "FunctionCall({callee:?}, {args:?})")
            }
            ExprKind::ScalarConstructor { ty, args } => {
                write!(f, "ScalarConstructor({ty:?}, {args:?})")
            }
            ExprKind::VectorConstructor { ty, args } => {
                write!(f, "VectorConstructor({ty:?}, {args:?})")
            }
            ExprKind::MatrixConstructor { ty, args } => {
                write!(f, "MatrixConstructor({ty:?}, {args:?})")
            }
            ExprKind::ArrayConstructor { ty, args } => {
                write!(f, "ArrayConstructor({ty:?}, {args:?})")
            }
            ExprKind::StructConstructor { ty, args } => {
                write!(f, "StructConstructor({ty:?}, {args:?})")
            }
            ExprKind::IndexLookup { receiver, index } => {
                write!(f, "IndexLookup({receiver:?}, {index:?})")
            }
            ExprKind::MemberLookup { receiver, member } => {
                write!(f, "MemberLookup({receiver:?}, {member:?})")
            }
            ExprKind::KnownValue { expr, value } => {
                write!(f, "KnownValue({expr:?} == {value:?})")
            }
            ExprKind::TrueByConstruction(inner) => write!(f, "TrueByConstruction({inner:?})"),
            ExprKind::FalseByConstruction(inner) => {
                write!(f, "FalseByConstruction({inner:?})")
            }
            ExprKind::ArbitraryExpression(inner) => write!(f, "ArbitraryExpression({inner:?})"),
            ExprKind::IdentityOperation {
                replacement,
                original,
                tag,
            } => write!(
                f,
                "IdentityOperation({replacement:?}, original={original:?}, {tag:?})"
            ),
        }
    }
}

/// L-value expression variants, mirroring [`ExprKind`] for assignable
/// positions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LhsExprKind {
    Ident(Name),
    IndexLookup { receiver: LhsId, index: ExprId },
    MemberLookup { receiver: LhsId, member: Name },
    Paren(LhsId),
    /// `*p`
    Deref(LhsId),
    /// `&x`
    AddressOf(LhsId),
}
