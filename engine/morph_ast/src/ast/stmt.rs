//! Statement nodes.

use std::fmt;

use super::operators::AssignOp;
use crate::{CaseRange, ExprId, ExprRange, LhsId, Name, StmtId, StmtRange, TyId, UniqueId};

/// Kind of a local `var`/`let` declaration statement.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LocalKind {
    Var,
    Let,
}

impl LocalKind {
    pub const fn keyword(self) -> &'static str {
        match self {
            LocalKind::Var => "var",
            LocalKind::Let => "let",
        }
    }
}

/// One clause of a `switch` statement.
///
/// `selectors` holds the case const-expressions; a clause with
/// `has_default` set also matches the default (an empty selector list with
/// `has_default` is a plain `default:` clause). `body` is a `Compound`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct SwitchCase {
    pub selectors: ExprRange,
    pub has_default: bool,
    pub body: StmtId,
}

/// Statement variants.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub enum StmtKind {
    /// `{ ... }`
    Compound(StmtRange),

    /// `if (cond) { ... } else ...`; `else_branch` is `StmtId::INVALID`,
    /// another `If` (else-if chain), or a `Compound`.
    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: StmtId,
    },

    /// `for (init; cond; update) { ... }`; any header slot may be INVALID.
    For {
        init: StmtId,
        cond: ExprId,
        update: StmtId,
        body: StmtId,
    },

    /// `while (cond) { ... }`
    While { cond: ExprId, body: StmtId },

    /// `loop { ... continuing { ... } }`; `continuing` is INVALID when
    /// absent.
    Loop { body: StmtId, continuing: StmtId },

    /// `switch (subject) { cases }`
    Switch { subject: ExprId, cases: CaseRange },

    /// `return;` / `return expr;` (`ExprId::INVALID` = no value).
    Return(ExprId),

    /// `break;`
    Break,

    /// `continue;`
    Continue,

    /// `break if cond;` (only valid at the end of a `continuing` block).
    BreakIf(ExprId),

    /// `discard;`
    Discard,

    /// `lhs op rhs;`; `lhs` is `LhsId::INVALID` for the phony form `_ = rhs;`.
    Assignment {
        lhs: LhsId,
        op: AssignOp,
        rhs: ExprId,
    },

    /// `var x: T = init;` / `let x = init;` (`ty`/`init` may be INVALID,
    /// though `let` requires an initializer).
    Variable {
        kind: LocalKind,
        name: Name,
        ty: TyId,
        init: ExprId,
    },

    /// `const x: T = init;`
    Value { name: Name, ty: TyId, init: ExprId },

    /// Call statement: `foo(a, b);`
    FunctionCall { callee: Name, args: ExprRange },

    /// `x++;`
    Increment(LhsId),

    /// `x--;`
    Decrement(LhsId),

    /// `const_assert expr;`
    ConstAssert(ExprId),

    /// `;`
    Empty,

    /// Augmented: `inner` is provably unreachable at runtime.
    DeadCodeFragment(StmtId),

    /// Augmented: `inner` re-expresses a run of statements inside a
    /// single-execution-guaranteed construct. `id` links the wrapper to its
    /// synthesized fallback return, if any.
    ControlFlowWrapper { id: UniqueId, inner: StmtId },

    /// Augmented: the fallback return synthesized for the wrapper sharing
    /// `id`; reachable statically, never executed at runtime.
    ControlFlowWrapReturn { id: UniqueId, inner: StmtId },
}

impl fmt::Debug for StmtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StmtKind::Compound(stmts) => write!(f, "Compound({stmts:?})"),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => write!(f, "If({cond:?}, {then_branch:?}, {else_branch:?})"),
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => write!(f, "For({init:?}, {cond:?}, {update:?}, {body:?})"),
            StmtKind::While { cond, body } => write!(f, "While({cond:?}, {body:?})"),
            StmtKind::Loop { body, continuing } => {
                write!(f, "Loop({body:?}, continuing={continuing:?})")
            }
            StmtKind::Switch { subject, cases } => write!(f, "Switch({subject:?}, {cases:?})"),
            StmtKind::Return(value) => write!(f, "Return({value:?})"),
            StmtKind::Break => write!(f, "Break"),
            StmtKind::Continue => write!(f, "Continue"),
            StmtKind::BreakIf(cond) => write!(f, "BreakIf({cond:?})"),
            StmtKind::Discard => write!(f, "Discard"),
            StmtKind::Assignment { lhs, op, rhs } => {
                write!(f, "Assignment({lhs:?} {} {rhs:?})", op.symbol())
            }
            StmtKind::Variable {
                kind,
                name,
                ty,
                init,
            } => write!(f, "Variable({} {name:?}: {ty:?} = {init:?})", kind.keyword()),
            StmtKind::Value { name, ty, init } => {
                write!(f, "Value({name:?}: {ty:?} = {init:?})")
            }
            StmtKind::FunctionCall { callee, args } => {
                write!(f, "FunctionCall({callee:?}, {args:?})")
            }
            StmtKind::Increment(lhs) => write!(f, "Increment({lhs:?})"),
            StmtKind::Decrement(lhs) => write!(f, "Decrement({lhs:?})"),
            StmtKind::ConstAssert(expr) => write!(f, "ConstAssert({expr:?})"),
            StmtKind::Empty => write!(f, "Empty"),
            StmtKind::DeadCodeFragment(inner) => write!(f, "DeadCodeFragment({inner:?})"),
            StmtKind::ControlFlowWrapper { id, inner } => {
                write!(f, "ControlFlowWrapper({id:?}, {inner:?})")
            }
            StmtKind::ControlFlowWrapReturn { id, inner } => {
                write!(f, "ControlFlowWrapReturn({id:?}, {inner:?})")
            }
        }
    }
}
