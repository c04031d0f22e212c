//! End-to-end pipeline properties: no-op idempotence, determinism, the
//! forced dead-discard example, and the structural legality invariants of
//! a fully-forced run.

mod common;

use common::{full_module, Fixture};
use pretty_assertions::assert_eq;

use morph_ast::{visitor, AttrKind, Attribute, ExprKind, Module, Param, StmtId, StmtKind, UniqueId};
use morph_ast::visitor::Visitor;
use morph_fmt::write_module;
use morph_gen::choice::{ScriptedRandom, StdRandom};
use morph_gen::passes::dead_jump::DeadJumpPass;
use morph_gen::{MorphPass, MorphSettings, Pipeline, Session, ShaderJob};
use morph_types::TypePool;
use rustc_hash::FxHashSet;

fn build_job() -> (ShaderJob, Session, TypePool) {
    build_job_with(MorphSettings::with_seed(7))
}

fn build_job_with(settings: MorphSettings) -> (ShaderJob, Session, TypePool) {
    let mut fx = Fixture::new();
    let (module, uniforms) = full_module(&mut fx);
    let seed = settings.seed;
    let session = Session::with_parts(
        settings,
        Box::new(StdRandom::from_seed(seed)),
        fx.interner,
    );
    let job = ShaderJob::new(module, fx.arena, uniforms);
    (job, session, TypePool::new())
}

#[test]
fn test_all_probabilities_zero_is_identity() {
    let (job, mut session, mut pool) = build_job_with(MorphSettings::quiescent(3));
    let before = write_module(&job.module, &job.arena, session.interner());

    let result = Pipeline::standard()
        .run(job, &mut session, &mut pool, None)
        .expect("pipeline runs");
    let after = write_module(&result.module, &result.arena, session.interner());
    assert_eq!(before, after);
}

#[test]
fn test_pipeline_is_deterministic() {
    let run = || {
        let (job, mut session, mut pool) = build_job();
        let result = Pipeline::standard()
            .run(job, &mut session, &mut pool, None)
            .expect("pipeline runs");
        write_module(&result.module, &result.arena, session.interner())
    };
    assert_eq!(run(), run());
}

#[test]
fn test_forced_dead_discard_example() {
    // fn f(x: i32) -> i32 { return x; }
    // @fragment fn main() { f(1i); }
    let mut fx = Fixture::new();
    let x = fx.name("x");
    let x_ref = fx.ident("x");
    let ret = fx.arena.alloc_stmt(StmtKind::Return(x_ref));
    let f_body = fx.compound(vec![ret]);
    let i32_ret = fx.named_ty("i32");
    let i32_param = fx.named_ty("i32");
    let f = fx.plain_fn(
        "f",
        vec![Param {
            name: x,
            ty: i32_param,
            attrs: vec![],
        }],
        i32_ret,
        f_body,
    );

    let one = fx.int(1);
    let f_name = fx.name("f");
    let args = fx.arena.alloc_expr_list([one]);
    let call = fx.arena.alloc_stmt(StmtKind::FunctionCall {
        callee: f_name,
        args,
    });
    let main_body = fx.compound(vec![call]);
    let mut main = fx.plain_fn("main", vec![], morph_ast::TyId::INVALID, main_body);
    main.attrs = vec![Attribute::marker(AttrKind::Fragment)];

    let module = Module {
        decls: vec![
            morph_ast::GlobalDecl::Function(f),
            morph_ast::GlobalDecl::Function(main),
        ],
    };

    // Selection flips: offset 0 of f's body (yes), offset 1 (no), then
    // both offsets of main's body (no, no). Synthesis: shape draw 0 =
    // if(false), and one go-deeper flip (no) for the opaque false.
    let rng = ScriptedRandom::new(vec![0], vec![true, false, false, false, false]);
    let mut session = Session::with_parts(MorphSettings::default(), Box::new(rng), fx.interner);
    let mut pool = TypePool::new();
    let job = ShaderJob::new(module, fx.arena, morph_resolve::UniformState::new());

    let result = DeadJumpPass::discard()
        .run(job, &mut session, &mut pool, None)
        .expect("pass runs");
    let text = write_module(&result.module, &result.arena, session.interner());
    assert_eq!(
        text,
        "fn f(x: i32) -> i32 {\n    if (false) {\n        discard;\n    }\n    return x;\n}\n\n@fragment\nfn main() {\n    f(1i);\n}\n"
    );
}

/// Collects wrapper/fallback correlation and identity tags.
#[derive(Default)]
struct InvariantCollector {
    wrapper_ids: Vec<UniqueId>,
    wrappers_with_return: FxHashSet<UniqueId>,
    fallback_ids: FxHashSet<UniqueId>,
    identity_tags: Vec<UniqueId>,
    in_return_scan: Vec<UniqueId>,
}

impl visitor::Visitor for InvariantCollector {
    fn visit_stmt(&mut self, id: StmtId, arena: &morph_ast::ModuleArena) {
        match arena.stmt(id) {
            StmtKind::ControlFlowWrapper { id: wrap_id, inner } => {
                self.wrapper_ids.push(wrap_id);
                self.in_return_scan.push(wrap_id);
                self.visit_stmt(inner, arena);
                self.in_return_scan.pop();
                return;
            }
            StmtKind::ControlFlowWrapReturn { id: wrap_id, inner } => {
                self.fallback_ids.insert(wrap_id);
                self.visit_stmt(inner, arena);
                return;
            }
            StmtKind::Return(_) => {
                for &wrap_id in &self.in_return_scan {
                    self.wrappers_with_return.insert(wrap_id);
                }
            }
            _ => {}
        }
        visitor::walk_stmt(self, id, arena);
    }

    fn visit_expr(&mut self, id: morph_ast::ExprId, arena: &morph_ast::ModuleArena) {
        if let ExprKind::IdentityOperation { tag, .. } = arena.expr(id) {
            self.identity_tags.push(tag);
        }
        visitor::walk_expr(self, id, arena);
    }
}

#[test]
fn test_forced_run_upholds_legality_invariants() {
    let mut settings = MorphSettings::with_seed(11);
    settings.inject_dead_break = 1.0;
    settings.inject_dead_continue = 1.0;
    settings.inject_dead_discard = 1.0;
    settings.inject_dead_return = 1.0;
    settings.apply_identity_operation = 1.0;
    settings.control_flow_wrap = 1.0;

    let (job, mut session, mut pool) = build_job_with(settings);
    let before = write_module(&job.module, &job.arena, session.interner());
    let result = Pipeline::standard()
        .run(job, &mut session, &mut pool, None)
        .expect("pipeline runs");
    let after = write_module(&result.module, &result.arena, session.interner());
    assert_ne!(before, after, "forced probabilities must transform the tree");

    let mut collector = InvariantCollector::default();
    collector.visit_module(&result.module, &result.arena);

    // Minted ids are unique within the run.
    let distinct: FxHashSet<UniqueId> = collector.wrapper_ids.iter().copied().collect();
    assert_eq!(distinct.len(), collector.wrapper_ids.len());
    let distinct_tags: FxHashSet<UniqueId> = collector.identity_tags.iter().copied().collect();
    assert_eq!(distinct_tags.len(), collector.identity_tags.len());
    assert!(
        distinct.is_disjoint(&distinct_tags),
        "wrapper ids and paren tags share one counter"
    );

    // Every wrapped run containing a return has its correlated fallback.
    for wrap_id in &collector.wrappers_with_return {
        assert!(
            collector.fallback_ids.contains(wrap_id),
            "wrapper {wrap_id:?} contains a return but has no fallback return"
        );
    }
    // And no fallback exists without its wrapper.
    for fallback in &collector.fallback_ids {
        assert!(distinct.contains(fallback));
    }

    // The transformed tree still resolves: type preservation in context.
    morph_resolve::Resolver::resolve(
        &result.module,
        &result.arena,
        session.interner(),
        &mut pool,
    )
    .expect("transformed module still resolves");
}

#[test]
fn test_output_tree_shares_untouched_subtrees() {
    // Only dead-return injection enabled; the helper's literal subtrees
    // must survive by id, not by copy.
    let mut settings = MorphSettings::quiescent(5);
    settings.inject_dead_return = 1.0;

    let (job, mut session, mut pool) = build_job_with(settings);
    let stmts_before = job.arena.stmt_count();
    let result = Pipeline::standard()
        .run(job, &mut session, &mut pool, None)
        .expect("pipeline runs");
    assert!(
        result.arena.stmt_count() > stmts_before,
        "injection allocates new nodes"
    );
    // The arena is append-only: every pre-existing id still resolves to
    // the same node, so untouched subtrees are shared, not cloned.
}
