use pretty_assertions::assert_eq;

use morph_ast::{
    AttrKind, Attribute, BinaryOp, ExprId, ExprKind, Function, GlobalDecl, IntSuffix, LocalKind,
    Module, ModuleArena, StmtId, StmtKind, StringInterner, TyId, TypeDecl,
};

use crate::write_module;

fn one_function_module(
    interner: &mut StringInterner,
    arena: &mut ModuleArena,
    body_stmts: Vec<StmtId>,
    ret_ty: TyId,
) -> Module {
    let f = interner.intern("f");
    let range = arena.alloc_stmt_list(body_stmts);
    let body = arena.alloc_stmt(StmtKind::Compound(range));
    Module {
        decls: vec![GlobalDecl::Function(Function {
            name: f,
            attrs: vec![],
            params: vec![],
            ret_ty,
            ret_attrs: vec![],
            body,
        })],
    }
}

#[test]
fn test_write_return_literal() {
    let mut interner = StringInterner::new();
    let mut arena = ModuleArena::new();
    let seven = arena.alloc_expr(ExprKind::IntLit {
        value: 7,
        suffix: IntSuffix::I,
    });
    let ret = arena.alloc_stmt(StmtKind::Return(seven));
    let i32_name = interner.intern("i32");
    let ret_ty = arena.alloc_ty(TypeDecl::Named(i32_name));
    let module = one_function_module(&mut interner, &mut arena, vec![ret], ret_ty);

    let text = write_module(&module, &arena, &interner);
    assert_eq!(text, "fn f() -> i32 {\n    return 7i;\n}\n");
}

#[test]
fn test_nested_operators_are_parenthesized() {
    let mut interner = StringInterner::new();
    let mut arena = ModuleArena::new();
    let a = arena.alloc_expr(ExprKind::IntLit {
        value: 1,
        suffix: IntSuffix::I,
    });
    let b = arena.alloc_expr(ExprKind::IntLit {
        value: 2,
        suffix: IntSuffix::I,
    });
    let c = arena.alloc_expr(ExprKind::IntLit {
        value: 3,
        suffix: IntSuffix::I,
    });
    let inner = arena.alloc_expr(ExprKind::Binary {
        op: BinaryOp::Add,
        left: a,
        right: b,
    });
    let outer = arena.alloc_expr(ExprKind::Binary {
        op: BinaryOp::ShiftLeft,
        left: inner,
        right: c,
    });
    let x = interner.intern("x");
    let decl = arena.alloc_stmt(StmtKind::Variable {
        kind: LocalKind::Let,
        name: x,
        ty: TyId::INVALID,
        init: outer,
    });
    let module = one_function_module(&mut interner, &mut arena, vec![decl], TyId::INVALID);

    let text = write_module(&module, &arena, &interner);
    assert_eq!(text, "fn f() {\n    let x = (1i + 2i) << 3i;\n}\n");
}

#[test]
fn test_augmented_nodes_print_runtime_form() {
    let mut interner = StringInterner::new();
    let mut arena = ModuleArena::new();

    // KnownValue(3i + 4i, 7i) inside a dead-code if(false) { discard; }.
    let three = arena.alloc_expr(ExprKind::IntLit {
        value: 3,
        suffix: IntSuffix::I,
    });
    let four = arena.alloc_expr(ExprKind::IntLit {
        value: 4,
        suffix: IntSuffix::I,
    });
    let sum = arena.alloc_expr(ExprKind::Binary {
        op: BinaryOp::Add,
        left: three,
        right: four,
    });
    let seven = arena.alloc_expr(ExprKind::IntLit {
        value: 7,
        suffix: IntSuffix::I,
    });
    let known = arena.alloc_expr(ExprKind::KnownValue {
        expr: sum,
        value: seven,
    });
    let x = interner.intern("x");
    let decl = arena.alloc_stmt(StmtKind::Variable {
        kind: LocalKind::Let,
        name: x,
        ty: TyId::INVALID,
        init: known,
    });

    let false_lit = arena.alloc_expr(ExprKind::BoolLit(false));
    let false_bc = arena.alloc_expr(ExprKind::FalseByConstruction(false_lit));
    let discard = arena.alloc_stmt(StmtKind::Discard);
    let then_range = arena.alloc_stmt_list([discard]);
    let then_branch = arena.alloc_stmt(StmtKind::Compound(then_range));
    let if_stmt = arena.alloc_stmt(StmtKind::If {
        cond: false_bc,
        then_branch,
        else_branch: StmtId::INVALID,
    });
    let dead = arena.alloc_stmt(StmtKind::DeadCodeFragment(if_stmt));

    let module = one_function_module(&mut interner, &mut arena, vec![dead, decl], TyId::INVALID);
    let text = write_module(&module, &arena, &interner);
    assert_eq!(
        text,
        "fn f() {\n    if (false) {\n        discard;\n    }\n    let x = 3i + 4i;\n}\n"
    );
}

#[test]
fn test_fragment_attribute_and_struct() {
    let mut interner = StringInterner::new();
    let mut arena = ModuleArena::new();
    let s = interner.intern("S");
    let a = interner.intern("a");
    let i32_name = interner.intern("i32");
    let member_ty = arena.alloc_ty(TypeDecl::Named(i32_name));
    let struct_decl = morph_ast::StructDecl {
        name: s,
        members: vec![morph_ast::StructMember {
            name: a,
            ty: member_ty,
            attrs: vec![],
        }],
    };
    let main = interner.intern("main");
    let range = arena.alloc_stmt_list([]);
    let body = arena.alloc_stmt(StmtKind::Compound(range));
    let module = Module {
        decls: vec![
            GlobalDecl::Struct(struct_decl),
            GlobalDecl::Function(Function {
                name: main,
                attrs: vec![Attribute::marker(AttrKind::Fragment)],
                params: vec![],
                ret_ty: TyId::INVALID,
                ret_attrs: vec![],
                body,
            }),
        ],
    };

    let text = write_module(&module, &arena, &interner);
    assert_eq!(
        text,
        "struct S {\n    a: i32,\n}\n\n@fragment\nfn main() {\n}\n"
    );
}

#[test]
fn test_loop_with_continuing_and_break_if() {
    let mut interner = StringInterner::new();
    let mut arena = ModuleArena::new();

    let true_lit = arena.alloc_expr(ExprKind::BoolLit(true));
    let break_if = arena.alloc_stmt(StmtKind::BreakIf(true_lit));
    let continuing_range = arena.alloc_stmt_list([break_if]);
    let continuing = arena.alloc_stmt(StmtKind::Compound(continuing_range));
    let body_range = arena.alloc_stmt_list([]);
    let body = arena.alloc_stmt(StmtKind::Compound(body_range));
    let loop_stmt = arena.alloc_stmt(StmtKind::Loop { body, continuing });

    let module = one_function_module(&mut interner, &mut arena, vec![loop_stmt], TyId::INVALID);
    let text = write_module(&module, &arena, &interner);
    assert_eq!(
        text,
        "fn f() {\n    loop {\n        continuing {\n            break if true;\n        }\n    }\n}\n"
    );
}

#[test]
fn test_phony_assignment_and_empty_expr_id() {
    let mut interner = StringInterner::new();
    let mut arena = ModuleArena::new();
    let one = arena.alloc_expr(ExprKind::IntLit {
        value: 1,
        suffix: IntSuffix::U,
    });
    let phony = arena.alloc_stmt(StmtKind::Assignment {
        lhs: morph_ast::LhsId::INVALID,
        op: morph_ast::AssignOp::Assign,
        rhs: one,
    });
    let module = one_function_module(&mut interner, &mut arena, vec![phony], TyId::INVALID);
    let text = write_module(&module, &arena, &interner);
    assert_eq!(text, "fn f() {\n    _ = 1u;\n}\n");
}
