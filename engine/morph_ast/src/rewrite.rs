//! Clone-with-replacement: the rewrite framework every pass is built on.
//!
//! `rebuild_*` functions walk a tree bottom-up. At each node the `Rewriter`
//! hooks get first refusal: a hook returning `Some(new_id)` is used verbatim
//! and the framework does NOT descend further (any nested rebuilding is the
//! hook's own responsibility). Otherwise children are rebuilt recursively
//! and the node is reassembled — returning the SAME id when nothing changed,
//! so untouched subtrees are structurally shared between input and output.
//!
//! Passes use this in two phases: a read-only analysis (see
//! [`visitor`](crate::visitor)) produces an edit plan keyed by node id, and
//! a single rebuild pass consults that plan from its hooks. Legality
//! decisions need whole-subtree lookahead that a fused top-down rewrite
//! cannot evaluate, hence the split.

use crate::ast::{
    ExprKind, Function, GlobalDecl, LhsExprKind, Module, StmtKind, SwitchCase,
};
use crate::{ExprId, ExprRange, LhsId, ModuleArena, StmtId};

/// Replacement hooks consulted during a rebuild.
///
/// Default implementations replace nothing, making every rebuild an
/// identity (and id-preserving) transformation.
pub trait Rewriter {
    /// Replace an expression wholesale. Returning `Some` suppresses the
    /// framework's descent into this node.
    fn replace_expr(&mut self, id: ExprId, arena: &mut ModuleArena) -> Option<ExprId> {
        let _ = (id, arena);
        None
    }

    /// Replace a statement wholesale.
    fn replace_stmt(&mut self, id: StmtId, arena: &mut ModuleArena) -> Option<StmtId> {
        let _ = (id, arena);
        None
    }

    /// Edit a compound's (already rebuilt) child list. `id` is the ORIGINAL
    /// compound id — the key the edit plan was recorded under; `children`
    /// is offset-compatible with the original list.
    fn edit_compound(
        &mut self,
        id: StmtId,
        children: &[StmtId],
        arena: &mut ModuleArena,
    ) -> Option<Vec<StmtId>> {
        let _ = (id, children, arena);
        None
    }
}

/// Rebuild an expression.
pub fn rebuild_expr<R: Rewriter + ?Sized>(
    rw: &mut R,
    arena: &mut ModuleArena,
    id: ExprId,
) -> ExprId {
    if let Some(replacement) = rw.replace_expr(id, arena) {
        return replacement;
    }
    match arena.expr(id) {
        ExprKind::Ident(_)
        | ExprKind::BoolLit(_)
        | ExprKind::IntLit { .. }
        | ExprKind::FloatLit { .. } => id,
        ExprKind::Unary { op, operand } => {
            let new_operand = rebuild_expr(rw, arena, operand);
            if new_operand == operand {
                id
            } else {
                arena.alloc_expr(ExprKind::Unary {
                    op,
                    operand: new_operand,
                })
            }
        }
        ExprKind::Binary { op, left, right } => {
            let new_left = rebuild_expr(rw, arena, left);
            let new_right = rebuild_expr(rw, arena, right);
            if new_left == left && new_right == right {
                id
            } else {
                arena.alloc_expr(ExprKind::Binary {
                    op,
                    left: new_left,
                    right: new_right,
                })
            }
        }
        ExprKind::Paren(inner) => {
            rebuild_wrapper(rw, arena, id, inner, ExprKind::Paren)
        }
        ExprKind::TrueByConstruction(inner) => {
            rebuild_wrapper(rw, arena, id, inner, ExprKind::TrueByConstruction)
        }
        ExprKind::FalseByConstruction(inner) => {
            rebuild_wrapper(rw, arena, id, inner, ExprKind::FalseByConstruction)
        }
        ExprKind::ArbitraryExpression(inner) => {
            rebuild_wrapper(rw, arena, id, inner, ExprKind::ArbitraryExpression)
        }
        ExprKind::FunctionCall { callee, args } => {
            let new_args = rebuild_expr_list(rw, arena, args);
            if new_args == args {
                id
            } else {
                arena.alloc_expr(ExprKind::FunctionCall {
                    callee,
                    args: new_args,
                })
            }
        }
        ExprKind::ScalarConstructor { ty, args } => {
            let new_args = rebuild_expr_list(rw, arena, args);
            if new_args == args {
                id
            } else {
                arena.alloc_expr(ExprKind::ScalarConstructor { ty, args: new_args })
            }
        }
        ExprKind::VectorConstructor { ty, args } => {
            let new_args = rebuild_expr_list(rw, arena, args);
            if new_args == args {
                id
            } else {
                arena.alloc_expr(ExprKind::VectorConstructor { ty, args: new_args })
            }
        }
        ExprKind::MatrixConstructor { ty, args } => {
            let new_args = rebuild_expr_list(rw, arena, args);
            if new_args == args {
                id
            } else {
                arena.alloc_expr(ExprKind::MatrixConstructor { ty, args: new_args })
            }
        }
        ExprKind::ArrayConstructor { ty, args } => {
            let new_args = rebuild_expr_list(rw, arena, args);
            if new_args == args {
                id
            } else {
                arena.alloc_expr(ExprKind::ArrayConstructor { ty, args: new_args })
            }
        }
        ExprKind::StructConstructor { ty, args } => {
            let new_args = rebuild_expr_list(rw, arena, args);
            if new_args == args {
                id
            } else {
                arena.alloc_expr(ExprKind::StructConstructor { ty, args: new_args })
            }
        }
        ExprKind::IndexLookup { receiver, index } => {
            let new_receiver = rebuild_expr(rw, arena, receiver);
            let new_index = rebuild_expr(rw, arena, index);
            if new_receiver == receiver && new_index == index {
                id
            } else {
                arena.alloc_expr(ExprKind::IndexLookup {
                    receiver: new_receiver,
                    index: new_index,
                })
            }
        }
        ExprKind::MemberLookup { receiver, member } => {
            let new_receiver = rebuild_expr(rw, arena, receiver);
            if new_receiver == receiver {
                id
            } else {
                arena.alloc_expr(ExprKind::MemberLookup {
                    receiver: new_receiver,
                    member,
                })
            }
        }
        ExprKind::KnownValue { expr, value } => {
            // The literal half is a proof, not runtime code: never rebuilt.
            let new_expr = rebuild_expr(rw, arena, expr);
            if new_expr == expr {
                id
            } else {
                arena.alloc_expr(ExprKind::KnownValue {
                    expr: new_expr,
                    value,
                })
            }
        }
        ExprKind::IdentityOperation {
            replacement,
            original,
            tag,
        } => {
            let new_replacement = rebuild_expr(rw, arena, replacement);
            if new_replacement == replacement {
                id
            } else {
                arena.alloc_expr(ExprKind::IdentityOperation {
                    replacement: new_replacement,
                    original,
                    tag,
                })
            }
        }
    }
}

fn rebuild_wrapper<R: Rewriter + ?Sized>(
    rw: &mut R,
    arena: &mut ModuleArena,
    id: ExprId,
    inner: ExprId,
    make: fn(ExprId) -> ExprKind,
) -> ExprId {
    let new_inner = rebuild_expr(rw, arena, inner);
    if new_inner == inner {
        id
    } else {
        arena.alloc_expr(make(new_inner))
    }
}

/// Rebuild an expression list, reusing the range when every element is
/// unchanged.
pub fn rebuild_expr_list<R: Rewriter + ?Sized>(
    rw: &mut R,
    arena: &mut ModuleArena,
    range: ExprRange,
) -> ExprRange {
    let ids = arena.expr_list(range).to_vec();
    let rebuilt: Vec<ExprId> = ids.iter().map(|&e| rebuild_expr(rw, arena, e)).collect();
    if rebuilt == ids {
        range
    } else {
        arena.alloc_expr_list(rebuilt)
    }
}

/// Rebuild an l-value expression (descending into index expressions).
pub fn rebuild_lhs<R: Rewriter + ?Sized>(rw: &mut R, arena: &mut ModuleArena, id: LhsId) -> LhsId {
    match arena.lhs(id) {
        LhsExprKind::Ident(_) => id,
        LhsExprKind::IndexLookup { receiver, index } => {
            let new_receiver = rebuild_lhs(rw, arena, receiver);
            let new_index = rebuild_expr(rw, arena, index);
            if new_receiver == receiver && new_index == index {
                id
            } else {
                arena.alloc_lhs(LhsExprKind::IndexLookup {
                    receiver: new_receiver,
                    index: new_index,
                })
            }
        }
        LhsExprKind::MemberLookup { receiver, member } => {
            let new_receiver = rebuild_lhs(rw, arena, receiver);
            if new_receiver == receiver {
                id
            } else {
                arena.alloc_lhs(LhsExprKind::MemberLookup {
                    receiver: new_receiver,
                    member,
                })
            }
        }
        LhsExprKind::Paren(inner) => {
            let new_inner = rebuild_lhs(rw, arena, inner);
            if new_inner == inner {
                id
            } else {
                arena.alloc_lhs(LhsExprKind::Paren(new_inner))
            }
        }
        LhsExprKind::Deref(inner) => {
            let new_inner = rebuild_lhs(rw, arena, inner);
            if new_inner == inner {
                id
            } else {
                arena.alloc_lhs(LhsExprKind::Deref(new_inner))
            }
        }
        LhsExprKind::AddressOf(inner) => {
            let new_inner = rebuild_lhs(rw, arena, inner);
            if new_inner == inner {
                id
            } else {
                arena.alloc_lhs(LhsExprKind::AddressOf(new_inner))
            }
        }
    }
}

/// Rebuild a statement.
pub fn rebuild_stmt<R: Rewriter + ?Sized>(
    rw: &mut R,
    arena: &mut ModuleArena,
    id: StmtId,
) -> StmtId {
    if let Some(replacement) = rw.replace_stmt(id, arena) {
        return replacement;
    }
    match arena.stmt(id) {
        StmtKind::Compound(stmts) => {
            let ids = arena.stmt_list(stmts).to_vec();
            let rebuilt: Vec<StmtId> = ids.iter().map(|&s| rebuild_stmt(rw, arena, s)).collect();
            let edited = rw.edit_compound(id, &rebuilt, arena);
            match edited {
                Some(new_children) => {
                    let range = arena.alloc_stmt_list(new_children);
                    arena.alloc_stmt(StmtKind::Compound(range))
                }
                None if rebuilt == ids => id,
                None => {
                    let range = arena.alloc_stmt_list(rebuilt);
                    arena.alloc_stmt(StmtKind::Compound(range))
                }
            }
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let new_cond = rebuild_expr(rw, arena, cond);
            let new_then = rebuild_stmt(rw, arena, then_branch);
            let new_else = if else_branch.is_valid() {
                rebuild_stmt(rw, arena, else_branch)
            } else {
                else_branch
            };
            if new_cond == cond && new_then == then_branch && new_else == else_branch {
                id
            } else {
                arena.alloc_stmt(StmtKind::If {
                    cond: new_cond,
                    then_branch: new_then,
                    else_branch: new_else,
                })
            }
        }
        StmtKind::For {
            init,
            cond,
            update,
            body,
        } => {
            let new_init = if init.is_valid() {
                rebuild_stmt(rw, arena, init)
            } else {
                init
            };
            let new_cond = if cond.is_valid() {
                rebuild_expr(rw, arena, cond)
            } else {
                cond
            };
            let new_update = if update.is_valid() {
                rebuild_stmt(rw, arena, update)
            } else {
                update
            };
            let new_body = rebuild_stmt(rw, arena, body);
            if new_init == init && new_cond == cond && new_update == update && new_body == body {
                id
            } else {
                arena.alloc_stmt(StmtKind::For {
                    init: new_init,
                    cond: new_cond,
                    update: new_update,
                    body: new_body,
                })
            }
        }
        StmtKind::While { cond, body } => {
            let new_cond = rebuild_expr(rw, arena, cond);
            let new_body = rebuild_stmt(rw, arena, body);
            if new_cond == cond && new_body == body {
                id
            } else {
                arena.alloc_stmt(StmtKind::While {
                    cond: new_cond,
                    body: new_body,
                })
            }
        }
        StmtKind::Loop { body, continuing } => {
            let new_body = rebuild_stmt(rw, arena, body);
            let new_continuing = if continuing.is_valid() {
                rebuild_stmt(rw, arena, continuing)
            } else {
                continuing
            };
            if new_body == body && new_continuing == continuing {
                id
            } else {
                arena.alloc_stmt(StmtKind::Loop {
                    body: new_body,
                    continuing: new_continuing,
                })
            }
        }
        StmtKind::Switch { subject, cases } => {
            let new_subject = rebuild_expr(rw, arena, subject);
            let case_vec = arena.case_list(cases).to_vec();
            let rebuilt: Vec<SwitchCase> = case_vec
                .iter()
                .map(|case| {
                    let selectors = rebuild_expr_list(rw, arena, case.selectors);
                    let body = rebuild_stmt(rw, arena, case.body);
                    SwitchCase {
                        selectors,
                        has_default: case.has_default,
                        body,
                    }
                })
                .collect();
            if new_subject == subject && rebuilt == case_vec {
                id
            } else {
                let new_cases = arena.alloc_cases(rebuilt);
                arena.alloc_stmt(StmtKind::Switch {
                    subject: new_subject,
                    cases: new_cases,
                })
            }
        }
        StmtKind::Return(value) => {
            if !value.is_valid() {
                return id;
            }
            let new_value = rebuild_expr(rw, arena, value);
            if new_value == value {
                id
            } else {
                arena.alloc_stmt(StmtKind::Return(new_value))
            }
        }
        StmtKind::BreakIf(cond) => {
            let new_cond = rebuild_expr(rw, arena, cond);
            if new_cond == cond {
                id
            } else {
                arena.alloc_stmt(StmtKind::BreakIf(new_cond))
            }
        }
        StmtKind::ConstAssert(expr) => {
            let new_expr = rebuild_expr(rw, arena, expr);
            if new_expr == expr {
                id
            } else {
                arena.alloc_stmt(StmtKind::ConstAssert(new_expr))
            }
        }
        StmtKind::Assignment { lhs, op, rhs } => {
            let new_lhs = if lhs.is_valid() {
                rebuild_lhs(rw, arena, lhs)
            } else {
                lhs
            };
            let new_rhs = rebuild_expr(rw, arena, rhs);
            if new_lhs == lhs && new_rhs == rhs {
                id
            } else {
                arena.alloc_stmt(StmtKind::Assignment {
                    lhs: new_lhs,
                    op,
                    rhs: new_rhs,
                })
            }
        }
        StmtKind::Variable {
            kind,
            name,
            ty,
            init,
        } => {
            if !init.is_valid() {
                return id;
            }
            let new_init = rebuild_expr(rw, arena, init);
            if new_init == init {
                id
            } else {
                arena.alloc_stmt(StmtKind::Variable {
                    kind,
                    name,
                    ty,
                    init: new_init,
                })
            }
        }
        StmtKind::Value { name, ty, init } => {
            if !init.is_valid() {
                return id;
            }
            let new_init = rebuild_expr(rw, arena, init);
            if new_init == init {
                id
            } else {
                arena.alloc_stmt(StmtKind::Value {
                    name,
                    ty,
                    init: new_init,
                })
            }
        }
        StmtKind::FunctionCall { callee, args } => {
            let new_args = rebuild_expr_list(rw, arena, args);
            if new_args == args {
                id
            } else {
                arena.alloc_stmt(StmtKind::FunctionCall {
                    callee,
                    args: new_args,
                })
            }
        }
        StmtKind::Increment(lhs) => {
            let new_lhs = rebuild_lhs(rw, arena, lhs);
            if new_lhs == lhs {
                id
            } else {
                arena.alloc_stmt(StmtKind::Increment(new_lhs))
            }
        }
        StmtKind::Decrement(lhs) => {
            let new_lhs = rebuild_lhs(rw, arena, lhs);
            if new_lhs == lhs {
                id
            } else {
                arena.alloc_stmt(StmtKind::Decrement(new_lhs))
            }
        }
        StmtKind::DeadCodeFragment(inner) => {
            let new_inner = rebuild_stmt(rw, arena, inner);
            if new_inner == inner {
                id
            } else {
                arena.alloc_stmt(StmtKind::DeadCodeFragment(new_inner))
            }
        }
        StmtKind::ControlFlowWrapper { id: wrap_id, inner } => {
            let new_inner = rebuild_stmt(rw, arena, inner);
            if new_inner == inner {
                id
            } else {
                arena.alloc_stmt(StmtKind::ControlFlowWrapper {
                    id: wrap_id,
                    inner: new_inner,
                })
            }
        }
        StmtKind::ControlFlowWrapReturn { id: wrap_id, inner } => {
            let new_inner = rebuild_stmt(rw, arena, inner);
            if new_inner == inner {
                id
            } else {
                arena.alloc_stmt(StmtKind::ControlFlowWrapReturn {
                    id: wrap_id,
                    inner: new_inner,
                })
            }
        }
        StmtKind::Break | StmtKind::Continue | StmtKind::Discard | StmtKind::Empty => id,
    }
}

/// Rebuild a function (its body only; signatures and attributes are not
/// transformation targets).
pub fn rebuild_function<R: Rewriter + ?Sized>(
    rw: &mut R,
    arena: &mut ModuleArena,
    function: &Function,
) -> Function {
    Function {
        body: rebuild_stmt(rw, arena, function.body),
        ..function.clone()
    }
}

/// Rebuild every function body of a module.
pub fn rebuild_module<R: Rewriter + ?Sized>(
    rw: &mut R,
    arena: &mut ModuleArena,
    module: &Module,
) -> Module {
    let decls = module
        .decls
        .iter()
        .map(|decl| match decl {
            GlobalDecl::Function(function) => {
                GlobalDecl::Function(rebuild_function(rw, arena, function))
            }
            other => other.clone(),
        })
        .collect();
    Module { decls }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, IntSuffix};

    struct NoOp;
    impl Rewriter for NoOp {}

    /// Replaces every integer literal `42` with `7`.
    struct ReplaceFortyTwo;
    impl Rewriter for ReplaceFortyTwo {
        fn replace_expr(&mut self, id: ExprId, arena: &mut ModuleArena) -> Option<ExprId> {
            match arena.expr(id) {
                ExprKind::IntLit { value: 42, suffix } => {
                    Some(arena.alloc_expr(ExprKind::IntLit { value: 7, suffix }))
                }
                _ => None,
            }
        }
    }

    fn int_lit(arena: &mut ModuleArena, value: i64) -> ExprId {
        arena.alloc_expr(ExprKind::IntLit {
            value,
            suffix: IntSuffix::I,
        })
    }

    #[test]
    fn test_noop_rebuild_shares_everything() {
        let mut arena = ModuleArena::new();
        let left = int_lit(&mut arena, 1);
        let right = int_lit(&mut arena, 42);
        let sum = arena.alloc_expr(ExprKind::Binary {
            op: BinaryOp::Add,
            left,
            right,
        });

        let rebuilt = rebuild_expr(&mut NoOp, &mut arena, sum);
        assert_eq!(rebuilt, sum);
    }

    #[test]
    fn test_replacement_rebuilds_spine_only() {
        let mut arena = ModuleArena::new();
        let left = int_lit(&mut arena, 1);
        let right = int_lit(&mut arena, 42);
        let sum = arena.alloc_expr(ExprKind::Binary {
            op: BinaryOp::Add,
            left,
            right,
        });

        let rebuilt = rebuild_expr(&mut ReplaceFortyTwo, &mut arena, sum);
        assert_ne!(rebuilt, sum);
        match arena.expr(rebuilt) {
            ExprKind::Binary {
                left: new_left,
                right: new_right,
                ..
            } => {
                // Untouched child is shared; replaced child is fresh.
                assert_eq!(new_left, left);
                assert_ne!(new_right, right);
                assert_eq!(
                    arena.expr(new_right),
                    ExprKind::IntLit {
                        value: 7,
                        suffix: IntSuffix::I
                    }
                );
            }
            other => panic!("expected Binary, got {other:?}"),
        }
    }

    #[test]
    fn test_known_value_literal_half_is_not_rewritten() {
        let mut arena = ModuleArena::new();
        let expr = int_lit(&mut arena, 42);
        let value = int_lit(&mut arena, 42);
        let known = arena.alloc_expr(ExprKind::KnownValue { expr, value });

        let rebuilt = rebuild_expr(&mut ReplaceFortyTwo, &mut arena, known);
        match arena.expr(rebuilt) {
            ExprKind::KnownValue {
                expr: new_expr,
                value: kept_value,
            } => {
                assert_ne!(new_expr, expr, "runtime half must be rewritten");
                assert_eq!(kept_value, value, "proof half must be untouched");
            }
            other => panic!("expected KnownValue, got {other:?}"),
        }
    }

    /// Inserts a `Discard` at offset 0 of a specific compound.
    struct InsertDiscard {
        target: StmtId,
    }
    impl Rewriter for InsertDiscard {
        fn edit_compound(
            &mut self,
            id: StmtId,
            children: &[StmtId],
            arena: &mut ModuleArena,
        ) -> Option<Vec<StmtId>> {
            if id != self.target {
                return None;
            }
            let discard = arena.alloc_stmt(StmtKind::Discard);
            let mut out = vec![discard];
            out.extend_from_slice(children);
            Some(out)
        }
    }

    #[test]
    fn test_edit_compound_inserts() {
        let mut arena = ModuleArena::new();
        let ret = arena.alloc_stmt(StmtKind::Return(ExprId::INVALID));
        let range = arena.alloc_stmt_list([ret]);
        let body = arena.alloc_stmt(StmtKind::Compound(range));

        let mut rw = InsertDiscard { target: body };
        let rebuilt = rebuild_stmt(&mut rw, &mut arena, body);
        assert_ne!(rebuilt, body);
        match arena.stmt(rebuilt) {
            StmtKind::Compound(new_range) => {
                let children = arena.stmt_list(new_range);
                assert_eq!(children.len(), 2);
                assert_eq!(arena.stmt(children[0]), StmtKind::Discard);
                assert_eq!(children[1], ret);
            }
            other => panic!("expected Compound, got {other:?}"),
        }
    }
}
