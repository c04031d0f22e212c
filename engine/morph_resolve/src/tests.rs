use pretty_assertions::assert_eq;

use morph_ast::{
    AddressSpace, AttrKind, Attribute, BinaryOp, ExprId, ExprKind, Function, GlobalDecl,
    GlobalVar, IntSuffix, LocalKind, Module, ModuleArena, Name, StmtId, StmtKind, StringInterner,
    StructDecl, StructMember, TyId, TypeDecl, UnaryOp, VecSize,
};
use morph_types::{Idx, TypePool};

use crate::{EntryKind, Resolver};

struct Fixture {
    interner: StringInterner,
    arena: ModuleArena,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            interner: StringInterner::new(),
            arena: ModuleArena::new(),
        }
    }

    fn name(&mut self, text: &str) -> Name {
        self.interner.intern(text)
    }

    fn named_ty(&mut self, text: &str) -> TyId {
        let name = self.name(text);
        self.arena.alloc_ty(TypeDecl::Named(name))
    }

    fn int(&mut self, value: i64) -> ExprId {
        self.arena.alloc_expr(ExprKind::IntLit {
            value,
            suffix: IntSuffix::I,
        })
    }

    fn ident(&mut self, text: &str) -> ExprId {
        let name = self.name(text);
        self.arena.alloc_expr(ExprKind::Ident(name))
    }

    fn compound(&mut self, stmts: Vec<StmtId>) -> StmtId {
        let range = self.arena.alloc_stmt_list(stmts);
        self.arena.alloc_stmt(StmtKind::Compound(range))
    }

    fn attr(&mut self, kind: AttrKind, arg: i64) -> Attribute {
        let expr = self.arena.alloc_expr(ExprKind::IntLit {
            value: arg,
            suffix: IntSuffix::None,
        });
        let args = self.arena.alloc_expr_list([expr]);
        Attribute { kind, args }
    }
}

/// struct Params { a: i32, b: f32 }
/// @group(0) @binding(0) var<uniform> params: Params;
/// fn helper(x: i32) -> i32 { let y = x + 1i; return y; }
/// @fragment fn main_frag() { var v: i32 = helper(params.a); }
fn fixture_module(fx: &mut Fixture) -> Module {
    let params_struct = fx.name("Params");
    let a = fx.name("a");
    let b = fx.name("b");
    let i32_ty = fx.named_ty("i32");
    let f32_ty = fx.named_ty("f32");
    let struct_decl = StructDecl {
        name: params_struct,
        members: vec![
            StructMember {
                name: a,
                ty: i32_ty,
                attrs: vec![],
            },
            StructMember {
                name: b,
                ty: f32_ty,
                attrs: vec![],
            },
        ],
    };

    let params = fx.name("params");
    let group = fx.attr(AttrKind::Group, 0);
    let binding = fx.attr(AttrKind::Binding, 0);
    let params_ty = fx.named_ty("Params");
    let uniform_var = GlobalVar {
        name: params,
        space: AddressSpace::Uniform,
        access: None,
        ty: params_ty,
        init: ExprId::INVALID,
        attrs: vec![group, binding],
    };

    // helper
    let helper = fx.name("helper");
    let x = fx.name("x");
    let y = fx.name("y");
    let x_ref = fx.ident("x");
    let one = fx.int(1);
    let sum = fx.arena.alloc_expr(ExprKind::Binary {
        op: BinaryOp::Add,
        left: x_ref,
        right: one,
    });
    let let_y = fx.arena.alloc_stmt(StmtKind::Variable {
        kind: LocalKind::Let,
        name: y,
        ty: TyId::INVALID,
        init: sum,
    });
    let y_ref = fx.ident("y");
    let ret_y = fx.arena.alloc_stmt(StmtKind::Return(y_ref));
    let helper_body = fx.compound(vec![let_y, ret_y]);
    let helper_ret = fx.named_ty("i32");
    let helper_param_ty = fx.named_ty("i32");
    let helper_fn = Function {
        name: helper,
        attrs: vec![],
        params: vec![morph_ast::Param {
            name: x,
            ty: helper_param_ty,
            attrs: vec![],
        }],
        ret_ty: helper_ret,
        ret_attrs: vec![],
        body: helper_body,
    };

    // main_frag
    let main_frag = fx.name("main_frag");
    let v = fx.name("v");
    let params_ref = fx.ident("params");
    let params_a = fx.arena.alloc_expr(ExprKind::MemberLookup {
        receiver: params_ref,
        member: a,
    });
    let call_args = fx.arena.alloc_expr_list([params_a]);
    let call = fx.arena.alloc_expr(ExprKind::FunctionCall {
        callee: helper,
        args: call_args,
    });
    let v_ty = fx.named_ty("i32");
    let var_v = fx.arena.alloc_stmt(StmtKind::Variable {
        kind: LocalKind::Var,
        name: v,
        ty: v_ty,
        init: call,
    });
    let main_body = fx.compound(vec![var_v]);
    let main_fn = Function {
        name: main_frag,
        attrs: vec![Attribute::marker(AttrKind::Fragment)],
        params: vec![],
        ret_ty: TyId::INVALID,
        ret_attrs: vec![],
        body: main_body,
    };

    Module {
        decls: vec![
            GlobalDecl::Struct(struct_decl),
            GlobalDecl::Variable(uniform_var),
            GlobalDecl::Function(helper_fn),
            GlobalDecl::Function(main_fn),
        ],
    }
}

#[test]
fn test_resolves_fixture() {
    let mut fx = Fixture::new();
    let module = fixture_module(&mut fx);
    let mut pool = TypePool::new();
    let resolver =
        Resolver::resolve(&module, &fx.arena, &fx.interner, &mut pool).expect("resolves");

    let helper = fx.interner.intern("helper");
    let sig = resolver.function(helper).expect("signature");
    assert_eq!(sig.params, vec![Idx::I32]);
    assert_eq!(sig.ret, Idx::I32);
}

#[test]
fn test_type_of_inferred_let() {
    let mut fx = Fixture::new();
    let module = fixture_module(&mut fx);
    let mut pool = TypePool::new();
    let resolver =
        Resolver::resolve(&module, &fx.arena, &fx.interner, &mut pool).expect("resolves");

    // `x + 1i` has type i32 (abstract literal leaning on the concrete side).
    let helper = fx.interner.intern("helper");
    let function = module.function(helper).expect("helper exists");
    let StmtKind::Compound(range) = fx.arena.stmt(function.body) else {
        panic!("body is a compound");
    };
    let let_stmt = fx.arena.stmt_list(range)[0];
    let StmtKind::Variable { init, .. } = fx.arena.stmt(let_stmt) else {
        panic!("first statement is the let");
    };
    assert_eq!(resolver.type_of(init), Ok(Idx::I32));
}

#[test]
fn test_scope_at_index() {
    let mut fx = Fixture::new();
    let module = fixture_module(&mut fx);
    let mut pool = TypePool::new();
    let resolver =
        Resolver::resolve(&module, &fx.arena, &fx.interner, &mut pool).expect("resolves");

    let helper = fx.interner.intern("helper");
    let y = fx.interner.intern("y");
    let function = module.function(helper).expect("helper exists");

    // Before the let, `y` is not in scope; after it, it is.
    let scope0 = resolver.scope_at_index(function.body, 0).expect("offset 0");
    assert!(resolver.entry(scope0, y).is_none());
    let scope1 = resolver.scope_at_index(function.body, 1).expect("offset 1");
    let entry = resolver.entry(scope1, y).expect("y visible");
    assert_eq!(entry.ty, Idx::I32);
    assert_eq!(entry.kind, EntryKind::LocalLet);

    // Parameters are visible throughout.
    let x = fx.interner.intern("x");
    assert!(resolver.entry(scope0, x).is_some());
}

#[test]
fn test_fragment_reachability_follows_calls() {
    let mut fx = Fixture::new();
    let module = fixture_module(&mut fx);
    let mut pool = TypePool::new();
    let resolver =
        Resolver::resolve(&module, &fx.arena, &fx.interner, &mut pool).expect("resolves");

    let helper = fx.interner.intern("helper");
    let main_frag = fx.interner.intern("main_frag");
    assert!(resolver.fragment_stage_reachable(main_frag));
    assert!(
        resolver.fragment_stage_reachable(helper),
        "helper is called from the fragment entry point"
    );
}

#[test]
fn test_uniform_queries() {
    let mut fx = Fixture::new();
    let module = fixture_module(&mut fx);
    let mut pool = TypePool::new();
    let resolver =
        Resolver::resolve(&module, &fx.arena, &fx.interner, &mut pool).expect("resolves");

    assert_eq!(resolver.uniform_groups(), vec![0]);
    assert_eq!(resolver.uniform_bindings_for_group(0), vec![0]);
    let binding = resolver.uniform_decl(0, 0).expect("uniform present");
    let params_struct = fx.interner.intern("Params");
    assert_eq!(
        pool.kind(binding.ty),
        morph_types::TypeKind::Struct { name: params_struct }
    );
}

#[test]
fn test_address_of_marks_alias_root() {
    let mut fx = Fixture::new();

    // fn f() { var v: i32 = 1i; let p = &v; }
    let f = fx.name("f");
    let v = fx.name("v");
    let p = fx.name("p");
    let one = fx.int(1);
    let v_ty = fx.named_ty("i32");
    let var_v = fx.arena.alloc_stmt(StmtKind::Variable {
        kind: LocalKind::Var,
        name: v,
        ty: v_ty,
        init: one,
    });
    let v_ref = fx.ident("v");
    let addr = fx.arena.alloc_expr(ExprKind::Unary {
        op: UnaryOp::AddressOf,
        operand: v_ref,
    });
    let let_p = fx.arena.alloc_stmt(StmtKind::Variable {
        kind: LocalKind::Let,
        name: p,
        ty: TyId::INVALID,
        init: addr,
    });
    let body = fx.compound(vec![var_v, let_p]);
    let module = Module {
        decls: vec![GlobalDecl::Function(Function {
            name: f,
            attrs: vec![],
            params: vec![],
            ret_ty: TyId::INVALID,
            ret_attrs: vec![],
            body,
        })],
    };

    let mut pool = TypePool::new();
    let resolver =
        Resolver::resolve(&module, &fx.arena, &fx.interner, &mut pool).expect("resolves");
    assert!(resolver.is_aliased(f, v));
    assert!(!resolver.is_aliased(f, p));
}

#[test]
fn test_unknown_ident_is_fatal() {
    let mut fx = Fixture::new();
    let f = fx.name("f");
    let ghost = fx.ident("ghost");
    let ret = fx.arena.alloc_stmt(StmtKind::Return(ghost));
    let body = fx.compound(vec![ret]);
    let module = Module {
        decls: vec![GlobalDecl::Function(Function {
            name: f,
            attrs: vec![],
            params: vec![],
            ret_ty: TyId::INVALID,
            ret_attrs: vec![],
            body,
        })],
    };

    let mut pool = TypePool::new();
    let result = Resolver::resolve(&module, &fx.arena, &fx.interner, &mut pool);
    assert!(matches!(result, Err(crate::ResolveError::UnknownIdent(_))));
}

#[test]
fn test_swizzle_typing() {
    let mut fx = Fixture::new();

    // fn f(v: vec4<f32>) { let s = v.xyz; let c = v.x; }
    let f = fx.name("f");
    let v = fx.name("v");
    let s = fx.name("s");
    let c = fx.name("c");
    let f32_ty = fx.named_ty("f32");
    let vec4_ty = fx.arena.alloc_ty(TypeDecl::Vector {
        size: VecSize::Four,
        elem: f32_ty,
    });
    let xyz = fx.name("xyz");
    let x = fx.name("x");
    let v_ref1 = fx.ident("v");
    let swizzle = fx.arena.alloc_expr(ExprKind::MemberLookup {
        receiver: v_ref1,
        member: xyz,
    });
    let let_s = fx.arena.alloc_stmt(StmtKind::Variable {
        kind: LocalKind::Let,
        name: s,
        ty: TyId::INVALID,
        init: swizzle,
    });
    let v_ref2 = fx.ident("v");
    let component = fx.arena.alloc_expr(ExprKind::MemberLookup {
        receiver: v_ref2,
        member: x,
    });
    let let_c = fx.arena.alloc_stmt(StmtKind::Variable {
        kind: LocalKind::Let,
        name: c,
        ty: TyId::INVALID,
        init: component,
    });
    let body = fx.compound(vec![let_s, let_c]);
    let module = Module {
        decls: vec![GlobalDecl::Function(Function {
            name: f,
            attrs: vec![],
            params: vec![morph_ast::Param {
                name: v,
                ty: vec4_ty,
                attrs: vec![],
            }],
            ret_ty: TyId::INVALID,
            ret_attrs: vec![],
            body,
        })],
    };

    let mut pool = TypePool::new();
    let resolver =
        Resolver::resolve(&module, &fx.arena, &fx.interner, &mut pool).expect("resolves");
    let vec3_f32 = pool.vector(VecSize::Three, Idx::F32);
    assert_eq!(resolver.type_of(swizzle), Ok(vec3_f32));
    assert_eq!(resolver.type_of(component), Ok(Idx::F32));
}
