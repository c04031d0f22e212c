//! Small read-only analyses shared by passes and donor splicing.

use morph_ast::{visitor, ExprKind, LhsExprKind, ModuleArena, Name, StmtId, StmtKind};
use morph_ast::visitor::Visitor;
use rustc_hash::FxHashSet;

/// Which jump kinds inside a statement run would bind to a construct
/// OUTSIDE the run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EscapingJumps {
    pub breaks: bool,
    pub continues: bool,
}

/// Scan a run of statements for `break`/`continue` that escape it.
///
/// A jump nested inside a loop (or, for `break`, a switch) that is itself
/// part of the run binds within the run and does not count.
pub fn escaping_jumps(arena: &ModuleArena, stmts: &[StmtId]) -> EscapingJumps {
    let mut found = EscapingJumps::default();
    for &stmt in stmts {
        scan_jumps(arena, stmt, false, false, &mut found);
    }
    found
}

fn scan_jumps(
    arena: &ModuleArena,
    id: StmtId,
    in_loop: bool,
    in_switch: bool,
    found: &mut EscapingJumps,
) {
    match arena.stmt(id) {
        StmtKind::Break => {
            if !in_loop && !in_switch {
                found.breaks = true;
            }
        }
        StmtKind::Continue => {
            if !in_loop {
                found.continues = true;
            }
        }
        StmtKind::Compound(range) => {
            for &child in arena.stmt_list(range) {
                scan_jumps(arena, child, in_loop, in_switch, found);
            }
        }
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            scan_jumps(arena, then_branch, in_loop, in_switch, found);
            if else_branch.is_valid() {
                scan_jumps(arena, else_branch, in_loop, in_switch, found);
            }
        }
        StmtKind::For { body, .. } | StmtKind::While { body, .. } => {
            scan_jumps(arena, body, true, false, found);
        }
        StmtKind::Loop { body, continuing } => {
            scan_jumps(arena, body, true, false, found);
            if continuing.is_valid() {
                scan_jumps(arena, continuing, true, false, found);
            }
        }
        StmtKind::Switch { cases, .. } => {
            for case in arena.case_list(cases) {
                scan_jumps(arena, case.body, in_loop, true, found);
            }
        }
        StmtKind::DeadCodeFragment(inner)
        | StmtKind::ControlFlowWrapper { inner, .. }
        | StmtKind::ControlFlowWrapReturn { inner, .. } => {
            scan_jumps(arena, inner, in_loop, in_switch, found);
        }
        _ => {}
    }
}

/// Whether any `return` occurs anywhere inside the statement.
pub fn contains_return(arena: &ModuleArena, id: StmtId) -> bool {
    struct Finder {
        found: bool,
    }
    impl visitor::Visitor for Finder {
        fn visit_stmt(&mut self, id: StmtId, arena: &ModuleArena) {
            if self.found {
                return;
            }
            if matches!(arena.stmt(id), StmtKind::Return(_)) {
                self.found = true;
                return;
            }
            visitor::walk_stmt(self, id, arena);
        }
    }
    let mut finder = Finder { found: false };
    finder.visit_stmt(id, arena);
    finder.found
}

/// Index (within the run) of the last statement containing a `return`.
pub fn last_return_index(arena: &ModuleArena, stmts: &[StmtId]) -> Option<usize> {
    stmts
        .iter()
        .rposition(|&stmt| contains_return(arena, stmt))
}

/// Names declared by the TOP-LEVEL statements of a run (declarations nested
/// in sub-compounds are scoped to those compounds and cannot escape).
pub fn declared_names(arena: &ModuleArena, stmts: &[StmtId]) -> FxHashSet<Name> {
    let mut names = FxHashSet::default();
    for &stmt in stmts {
        match arena.stmt(stmt) {
            StmtKind::Variable { name, .. } | StmtKind::Value { name, .. } => {
                names.insert(name);
            }
            _ => {}
        }
    }
    names
}

/// Every identifier referenced (r-value or l-value) anywhere inside the
/// statements. Function-call callees are not variable references and are
/// excluded.
pub fn referenced_names(arena: &ModuleArena, stmts: &[StmtId]) -> FxHashSet<Name> {
    struct Collector {
        names: FxHashSet<Name>,
    }
    impl visitor::Visitor for Collector {
        fn visit_expr(&mut self, id: morph_ast::ExprId, arena: &ModuleArena) {
            if let ExprKind::Ident(name) = arena.expr(id) {
                self.names.insert(name);
            }
            visitor::walk_expr(self, id, arena);
        }
        fn visit_lhs(&mut self, id: morph_ast::LhsId, arena: &ModuleArena) {
            if let LhsExprKind::Ident(name) = arena.lhs(id) {
                self.names.insert(name);
            }
            visitor::walk_lhs(self, id, arena);
        }
    }
    let mut collector = Collector {
        names: FxHashSet::default(),
    };
    for &stmt in stmts {
        collector.visit_stmt(stmt, arena);
    }
    collector.names
}

#[cfg(test)]
mod tests {
    use super::*;
    use morph_ast::{ExprId, IntSuffix};

    fn compound(arena: &mut ModuleArena, stmts: Vec<StmtId>) -> StmtId {
        let range = arena.alloc_stmt_list(stmts);
        arena.alloc_stmt(StmtKind::Compound(range))
    }

    #[test]
    fn test_escaping_break_at_top_level() {
        let mut arena = ModuleArena::new();
        let brk = arena.alloc_stmt(StmtKind::Break);
        let found = escaping_jumps(&arena, &[brk]);
        assert!(found.breaks);
        assert!(!found.continues);
    }

    #[test]
    fn test_break_inside_inner_loop_does_not_escape() {
        let mut arena = ModuleArena::new();
        let brk = arena.alloc_stmt(StmtKind::Break);
        let body = compound(&mut arena, vec![brk]);
        let cond = arena.alloc_expr(ExprKind::BoolLit(true));
        let while_stmt = arena.alloc_stmt(StmtKind::While { cond, body });
        let found = escaping_jumps(&arena, &[while_stmt]);
        assert_eq!(found, EscapingJumps::default());
    }

    #[test]
    fn test_break_inside_switch_does_not_escape_but_continue_does() {
        let mut arena = ModuleArena::new();
        let brk = arena.alloc_stmt(StmtKind::Break);
        let cont = arena.alloc_stmt(StmtKind::Continue);
        let body = compound(&mut arena, vec![brk, cont]);
        let selector = arena.alloc_expr(ExprKind::IntLit {
            value: 0,
            suffix: IntSuffix::I,
        });
        let selectors = arena.alloc_expr_list([selector]);
        let cases = arena.alloc_cases([morph_ast::SwitchCase {
            selectors,
            has_default: true,
            body,
        }]);
        let subject = arena.alloc_expr(ExprKind::IntLit {
            value: 0,
            suffix: IntSuffix::I,
        });
        let switch_stmt = arena.alloc_stmt(StmtKind::Switch { subject, cases });
        let found = escaping_jumps(&arena, &[switch_stmt]);
        assert!(!found.breaks, "switch captures break");
        assert!(found.continues, "switch passes continue through");
    }

    #[test]
    fn test_last_return_index() {
        let mut arena = ModuleArena::new();
        let ret = arena.alloc_stmt(StmtKind::Return(ExprId::INVALID));
        let empty = arena.alloc_stmt(StmtKind::Empty);
        let stmts = [empty, ret, empty];
        assert_eq!(last_return_index(&arena, &stmts), Some(1));
        assert_eq!(last_return_index(&arena, &[empty]), None);
    }

    #[test]
    fn test_declared_vs_referenced() {
        let mut arena = ModuleArena::new();
        let x = Name::from_raw(1);
        let y = Name::from_raw(2);
        let init = arena.alloc_expr(ExprKind::Ident(y));
        let decl = arena.alloc_stmt(StmtKind::Variable {
            kind: morph_ast::LocalKind::Let,
            name: x,
            ty: morph_ast::TyId::INVALID,
            init,
        });
        let declared = declared_names(&arena, &[decl]);
        assert!(declared.contains(&x));
        assert!(!declared.contains(&y));
        let referenced = referenced_names(&arena, &[decl]);
        assert!(referenced.contains(&y));
        assert!(!referenced.contains(&x));
    }
}
