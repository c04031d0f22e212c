//! Arbitrary-expression generator: the broadcast-1 fallback and the
//! aliased-storage rejection rule.

mod common;

use common::Fixture;
use pretty_assertions::assert_eq;

use morph_ast::{
    ExprKind, Function, GlobalDecl, LocalKind, Module, StmtKind, TyId, TypeDecl, UnaryOp, VecSize,
};
use morph_fmt::write_module;
use morph_gen::arbitrary::arbitrary_expr;
use morph_gen::choice::ScriptedRandom;
use morph_gen::{FunctionCtx, GenCtx, MorphSettings, Session};
use morph_resolve::{Resolver, UniformState};
use morph_types::{Idx, TypePool};

#[test]
fn test_unsupported_types_broadcast_one() {
    let mut fx = Fixture::new();
    let module = Module { decls: vec![] };
    let mut pool = TypePool::new();
    let resolver =
        Resolver::resolve(&module, &fx.arena, &fx.interner, &mut pool).expect("resolves");
    let vec3_f32 = pool.vector(VecSize::Three, Idx::F32);
    let uniforms = UniformState::new();

    let rng = ScriptedRandom::default();
    let mut session = Session::with_parts(MorphSettings::default(), Box::new(rng), fx.interner);
    let mut ctx = GenCtx {
        session: &mut session,
        resolver: &resolver,
        pool: &mut pool,
        uniforms: &uniforms,
        donor: None,
        function: FunctionCtx::none(),
    };
    let scope = resolver.module_scope();
    let expr =
        arbitrary_expr(&mut ctx, &mut fx.arena, vec3_f32, scope, 0).expect("synthesize");

    // ArbitraryExpression(vec3<f32>(1.0f, 1.0f, 1.0f))
    let ExprKind::ArbitraryExpression(inner) = fx.arena.expr(expr) else {
        panic!("expected the arbitrary marker");
    };
    let ExprKind::VectorConstructor { args, .. } = fx.arena.expr(inner) else {
        panic!("expected the broadcast constructor");
    };
    let args = fx.arena.expr_list(args).to_vec();
    assert_eq!(args.len(), 3);
    for arg in args {
        assert_eq!(
            fx.arena.expr(arg),
            ExprKind::FloatLit {
                bits: 1f64.to_bits(),
                suffix: morph_ast::FloatSuffix::F
            }
        );
    }
}

#[test]
fn test_float_scalars_take_the_fallback_too() {
    // The recursive construction covers bool and integer scalars only;
    // f32 is the deliberate broadcast-1 fallback, not a silent upgrade.
    let mut fx = Fixture::new();
    let module = Module { decls: vec![] };
    let mut pool = TypePool::new();
    let resolver =
        Resolver::resolve(&module, &fx.arena, &fx.interner, &mut pool).expect("resolves");
    let uniforms = UniformState::new();
    let rng = ScriptedRandom::default();
    let mut session = Session::with_parts(MorphSettings::default(), Box::new(rng), fx.interner);
    let mut ctx = GenCtx {
        session: &mut session,
        resolver: &resolver,
        pool: &mut pool,
        uniforms: &uniforms,
        donor: None,
        function: FunctionCtx::none(),
    };
    let scope = resolver.module_scope();
    let expr = arbitrary_expr(&mut ctx, &mut fx.arena, Idx::F32, scope, 0).expect("synthesize");
    let ExprKind::ArbitraryExpression(inner) = fx.arena.expr(expr) else {
        panic!("expected the arbitrary marker");
    };
    assert_eq!(
        fx.arena.expr(inner),
        ExprKind::FloatLit {
            bits: 1f64.to_bits(),
            suffix: morph_ast::FloatSuffix::F
        }
    );
}

#[test]
fn test_aliased_storage_is_never_navigated() {
    // fn f() { var v: i32 = 3i; let p = &v; ... } — `v` is aliased by a
    // live pointer, so the generator must not read it; with no other
    // candidate it falls back to a literal.
    let mut fx = Fixture::new();
    let three = fx.int(3);
    let var_v = fx.var_stmt("v", "i32", three);
    let v_ref = fx.ident("v");
    let addr = fx.arena.alloc_expr(ExprKind::Unary {
        op: UnaryOp::AddressOf,
        operand: v_ref,
    });
    let let_p = {
        let p = fx.name("p");
        fx.arena.alloc_stmt(StmtKind::Variable {
            kind: LocalKind::Let,
            name: p,
            ty: TyId::INVALID,
            init: addr,
        })
    };
    let tail = fx.arena.alloc_stmt(StmtKind::Empty);
    let body = fx.compound(vec![var_v, let_p, tail]);
    let f = fx.plain_fn("f", vec![], TyId::INVALID, body);
    let f_name = f.name;
    let module = Module {
        decls: vec![GlobalDecl::Function(f)],
    };

    let mut pool = TypePool::new();
    let resolver =
        Resolver::resolve(&module, &fx.arena, &fx.interner, &mut pool).expect("resolves");
    let scope = resolver.scope_at_index(body, 2).expect("after both decls");
    let uniforms = UniformState::new();

    // go_deeper declines; with `v` rejected and `p` unnavigable there is
    // no variable candidate, so the leaf is forced to the literal rule.
    let rng = ScriptedRandom::new(vec![5], vec![false, true]);
    let mut session = Session::with_parts(MorphSettings::default(), Box::new(rng), fx.interner);
    let mut ctx = GenCtx {
        session: &mut session,
        resolver: &resolver,
        pool: &mut pool,
        uniforms: &uniforms,
        donor: None,
        function: FunctionCtx {
            name: f_name,
            ret: Idx::NONE,
        },
    };
    let expr = arbitrary_expr(&mut ctx, &mut fx.arena, Idx::I32, scope, 0).expect("synthesize");
    let ExprKind::ArbitraryExpression(inner) = fx.arena.expr(expr) else {
        panic!("expected the arbitrary marker");
    };
    // `v` is rejected (aliased) and `p` is a pointer: no candidates, so
    // the leaf collapses to a literal.
    assert!(
        matches!(fx.arena.expr(inner), ExprKind::IntLit { .. }),
        "aliased storage must not be read: got {:?}",
        fx.arena.expr(inner)
    );
}

#[test]
fn test_generated_trees_print_as_valid_looking_wgsl() {
    let mut fx = Fixture::new();
    let module = Module { decls: vec![] };
    let mut pool = TypePool::new();
    let resolver =
        Resolver::resolve(&module, &fx.arena, &fx.interner, &mut pool).expect("resolves");
    let uniforms = UniformState::new();
    let rng = morph_gen::choice::StdRandom::from_seed(99);
    let mut session = Session::with_parts(MorphSettings::default(), Box::new(rng), fx.interner);
    let mut ctx = GenCtx {
        session: &mut session,
        resolver: &resolver,
        pool: &mut pool,
        uniforms: &uniforms,
        donor: None,
        function: FunctionCtx::none(),
    };
    let scope = resolver.module_scope();
    let expr = arbitrary_expr(&mut ctx, &mut fx.arena, Idx::U32, scope, 0).expect("synthesize");

    // Smoke: wrap in a module and print; the writer must not panic and the
    // expression must not be empty.
    let u32_name = session.intern("u32");
    let probe_ty = fx.arena.alloc_ty(TypeDecl::Named(u32_name));
    let decl = fx.arena.alloc_stmt(StmtKind::Variable {
        kind: LocalKind::Var,
        name: session.intern("probe"),
        ty: probe_ty,
        init: expr,
    });
    let body = {
        let range = fx.arena.alloc_stmt_list([decl]);
        fx.arena.alloc_stmt(StmtKind::Compound(range))
    };
    let probe_fn = Function {
        name: session.intern("probe_fn"),
        attrs: vec![],
        params: vec![],
        ret_ty: TyId::INVALID,
        ret_attrs: vec![],
        body,
    };
    let module = Module {
        decls: vec![GlobalDecl::Function(probe_fn)],
    };
    let text = write_module(&module, &fx.arena, session.interner());
    assert!(text.contains("var probe: u32 = "));
}
