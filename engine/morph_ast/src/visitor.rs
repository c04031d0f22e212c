//! Read-only AST traversal.
//!
//! A single `Visitor` trait; default implementations call `walk_*` functions
//! that traverse children depth-first, left-to-right. Override `visit_*`
//! methods to add behavior at specific nodes, and call the matching `walk_*`
//! to continue into children. The visitor may mutate its own state; the AST
//! remains immutable.
//!
//! Traversal deliberately does NOT descend into attribute arguments or the
//! array-size position of syntactic types: those are const-expression
//! positions no transformation is allowed to touch.

use crate::ast::{
    ExprKind, Function, GlobalDecl, GlobalValue, GlobalVar, LhsExprKind, Module, StmtKind,
};
use crate::{ExprId, LhsId, ModuleArena, StmtId};

/// AST visitor trait.
pub trait Visitor {
    /// Visit a module.
    fn visit_module(&mut self, module: &Module, arena: &ModuleArena) {
        walk_module(self, module, arena);
    }

    /// Visit a global declaration.
    fn visit_global(&mut self, decl: &GlobalDecl, arena: &ModuleArena) {
        walk_global(self, decl, arena);
    }

    /// Visit a function declaration.
    fn visit_function(&mut self, function: &Function, arena: &ModuleArena) {
        self.visit_stmt(function.body, arena);
    }

    /// Visit a statement.
    fn visit_stmt(&mut self, id: StmtId, arena: &ModuleArena) {
        walk_stmt(self, id, arena);
    }

    /// Visit an expression.
    fn visit_expr(&mut self, id: ExprId, arena: &ModuleArena) {
        walk_expr(self, id, arena);
    }

    /// Visit an l-value expression.
    fn visit_lhs(&mut self, id: LhsId, arena: &ModuleArena) {
        walk_lhs(self, id, arena);
    }
}

/// Walk a module's children in declaration order.
pub fn walk_module<V: Visitor + ?Sized>(visitor: &mut V, module: &Module, arena: &ModuleArena) {
    for decl in &module.decls {
        visitor.visit_global(decl, arena);
    }
}

/// Walk a global declaration's children.
pub fn walk_global<V: Visitor + ?Sized>(visitor: &mut V, decl: &GlobalDecl, arena: &ModuleArena) {
    match decl {
        GlobalDecl::Function(function) => visitor.visit_function(function, arena),
        GlobalDecl::Variable(GlobalVar { init, .. }) | GlobalDecl::Value(GlobalValue { init, .. }) => {
            if init.is_valid() {
                visitor.visit_expr(*init, arena);
            }
        }
        GlobalDecl::ConstAssert(expr) => visitor.visit_expr(*expr, arena),
        GlobalDecl::Struct(_) | GlobalDecl::TypeAlias(_) | GlobalDecl::Empty => {}
    }
}

/// Walk a statement's children.
pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, id: StmtId, arena: &ModuleArena) {
    match arena.stmt(id) {
        StmtKind::Compound(stmts) => {
            for &child in arena.stmt_list(stmts) {
                visitor.visit_stmt(child, arena);
            }
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expr(cond, arena);
            visitor.visit_stmt(then_branch, arena);
            if else_branch.is_valid() {
                visitor.visit_stmt(else_branch, arena);
            }
        }
        StmtKind::For {
            init,
            cond,
            update,
            body,
        } => {
            if init.is_valid() {
                visitor.visit_stmt(init, arena);
            }
            if cond.is_valid() {
                visitor.visit_expr(cond, arena);
            }
            if update.is_valid() {
                visitor.visit_stmt(update, arena);
            }
            visitor.visit_stmt(body, arena);
        }
        StmtKind::While { cond, body } => {
            visitor.visit_expr(cond, arena);
            visitor.visit_stmt(body, arena);
        }
        StmtKind::Loop { body, continuing } => {
            visitor.visit_stmt(body, arena);
            if continuing.is_valid() {
                visitor.visit_stmt(continuing, arena);
            }
        }
        StmtKind::Switch { subject, cases } => {
            visitor.visit_expr(subject, arena);
            for case in arena.case_list(cases) {
                for &selector in arena.expr_list(case.selectors) {
                    visitor.visit_expr(selector, arena);
                }
                visitor.visit_stmt(case.body, arena);
            }
        }
        StmtKind::Return(value) => {
            if value.is_valid() {
                visitor.visit_expr(value, arena);
            }
        }
        StmtKind::BreakIf(cond) | StmtKind::ConstAssert(cond) => {
            visitor.visit_expr(cond, arena);
        }
        StmtKind::Assignment { lhs, rhs, .. } => {
            if lhs.is_valid() {
                visitor.visit_lhs(lhs, arena);
            }
            visitor.visit_expr(rhs, arena);
        }
        StmtKind::Variable { init, .. } | StmtKind::Value { init, .. } => {
            if init.is_valid() {
                visitor.visit_expr(init, arena);
            }
        }
        StmtKind::FunctionCall { args, .. } => {
            for &arg in arena.expr_list(args) {
                visitor.visit_expr(arg, arena);
            }
        }
        StmtKind::Increment(lhs) | StmtKind::Decrement(lhs) => {
            visitor.visit_lhs(lhs, arena);
        }
        StmtKind::DeadCodeFragment(inner)
        | StmtKind::ControlFlowWrapper { inner, .. }
        | StmtKind::ControlFlowWrapReturn { inner, .. } => {
            visitor.visit_stmt(inner, arena);
        }
        StmtKind::Break | StmtKind::Continue | StmtKind::Discard | StmtKind::Empty => {}
    }
}

/// Walk an expression's children.
///
/// The `value` half of a `KnownValue` is provenance metadata, not runtime
/// code; it is walked like any child here (analyses may want it), but the
/// rewrite framework treats it specially.
pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, id: ExprId, arena: &ModuleArena) {
    match arena.expr(id) {
        ExprKind::Ident(_)
        | ExprKind::BoolLit(_)
        | ExprKind::IntLit { .. }
        | ExprKind::FloatLit { .. } => {}
        ExprKind::Unary { operand, .. } => visitor.visit_expr(operand, arena),
        ExprKind::Binary { left, right, .. } => {
            visitor.visit_expr(left, arena);
            visitor.visit_expr(right, arena);
        }
        ExprKind::Paren(inner)
        | ExprKind::TrueByConstruction(inner)
        | ExprKind::FalseByConstruction(inner)
        | ExprKind::ArbitraryExpression(inner) => visitor.visit_expr(inner, arena),
        ExprKind::FunctionCall { args, .. }
        | ExprKind::ScalarConstructor { args, .. }
        | ExprKind::VectorConstructor { args, .. }
        | ExprKind::MatrixConstructor { args, .. }
        | ExprKind::ArrayConstructor { args, .. }
        | ExprKind::StructConstructor { args, .. } => {
            for &arg in arena.expr_list(args) {
                visitor.visit_expr(arg, arena);
            }
        }
        ExprKind::IndexLookup { receiver, index } => {
            visitor.visit_expr(receiver, arena);
            visitor.visit_expr(index, arena);
        }
        ExprKind::MemberLookup { receiver, .. } => visitor.visit_expr(receiver, arena),
        ExprKind::KnownValue { expr, value } => {
            visitor.visit_expr(expr, arena);
            visitor.visit_expr(value, arena);
        }
        ExprKind::IdentityOperation { replacement, .. } => {
            // `original` is a back-reference into the pre-rewrite tree, not
            // a child of this node.
            visitor.visit_expr(replacement, arena);
        }
    }
}

/// Walk an l-value expression's children.
pub fn walk_lhs<V: Visitor + ?Sized>(visitor: &mut V, id: LhsId, arena: &ModuleArena) {
    match arena.lhs(id) {
        LhsExprKind::Ident(_) => {}
        LhsExprKind::IndexLookup { receiver, index } => {
            visitor.visit_lhs(receiver, arena);
            visitor.visit_expr(index, arena);
        }
        LhsExprKind::MemberLookup { receiver, .. }
        | LhsExprKind::Paren(receiver)
        | LhsExprKind::Deref(receiver)
        | LhsExprKind::AddressOf(receiver) => visitor.visit_lhs(receiver, arena),
    }
}
