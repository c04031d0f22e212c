use pretty_assertions::assert_eq;

use crate::ast::{
    AttrKind, Attribute, ExprKind, Function, GlobalDecl, Module, ShaderStage, StmtKind, TypeDecl,
};
use crate::{ExprId, ModuleArena, StmtId, StringInterner, TyId};

#[test]
fn test_build_minimal_function() {
    let mut interner = StringInterner::new();
    let mut arena = ModuleArena::new();

    let i32_name = interner.intern("i32");
    let x = interner.intern("x");
    let f = interner.intern("f");

    let ret_ty = arena.alloc_ty(TypeDecl::Named(i32_name));
    let x_ref = arena.alloc_expr(ExprKind::Ident(x));
    let ret = arena.alloc_stmt(StmtKind::Return(x_ref));
    let body_range = arena.alloc_stmt_list([ret]);
    let body = arena.alloc_stmt(StmtKind::Compound(body_range));

    let function = Function {
        name: f,
        attrs: vec![],
        params: vec![],
        ret_ty,
        ret_attrs: vec![],
        body,
    };
    let module = Module {
        decls: vec![GlobalDecl::Function(function)],
    };

    let found = module.function(f).expect("function present");
    assert_eq!(found.name, f);
    assert!(found.ret_ty.is_valid());
    assert_eq!(found.stage(), None);
    match arena.stmt(found.body) {
        StmtKind::Compound(range) => assert_eq!(range.len(), 1),
        other => panic!("expected Compound, got {other:?}"),
    }
}

#[test]
fn test_stage_from_attribute() {
    let function = Function {
        name: crate::Name::EMPTY,
        attrs: vec![Attribute::marker(AttrKind::Fragment)],
        params: vec![],
        ret_ty: TyId::INVALID,
        ret_attrs: vec![],
        body: StmtId::INVALID,
    };
    assert_eq!(function.stage(), Some(ShaderStage::Fragment));
}

#[test]
fn test_invalid_sentinels() {
    assert!(!ExprId::INVALID.is_valid());
    assert!(!TyId::INVALID.is_valid());
    let ret = StmtKind::Return(ExprId::INVALID);
    match ret {
        StmtKind::Return(value) => assert!(!value.is_valid()),
        _ => unreachable!(),
    }
}
