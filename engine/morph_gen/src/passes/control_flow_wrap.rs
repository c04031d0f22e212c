//! Control-flow wrapping.
//!
//! Re-expresses a contiguous run of statements inside a different
//! single-execution-guaranteed construct. Run selection is per compound:
//! candidate starts are independent coin flips, end-points are drawn and
//! then shrunk until legal, and a cursor prevents chosen runs from
//! interleaving. A run is legal only if no name it declares is referenced
//! by a later statement of the same compound.
//!
//! Runs with a break or continue that would bind outside the run forbid
//! every loop-shaped wrapper; an escaping break also forbids the switch
//! shape, which would capture it. If a run contains a `return`, a fallback
//! return correlated by the wrapper's unique id is appended right after
//! the wrapper, restoring a statically well-typed exit path.

use rustc_hash::FxHashMap;

use morph_ast::{
    rewrite, AssignOp, BinaryOp, ExprId, ExprKind, GlobalDecl, IntSuffix, LocalKind, Module,
    ModuleArena, StmtId, StmtKind, SwitchCase,
};
use morph_resolve::{Resolver, ScopeId};
use morph_types::{Idx, TypePool};

use crate::analysis;
use crate::arbitrary::{arbitrary_compound, arbitrary_expr};
use crate::choice::choose;
use crate::ctx::{FunctionCtx, GenCtx};
use crate::donor::Donor;
use crate::job::ShaderJob;
use crate::known_value::{known_bool, known_int, MAX_KNOWN_VALUE};
use crate::passes::dead_jump::make_compound;
use crate::passes::MorphPass;
use crate::session::Session;
use crate::MorphError;

/// One planned run `[start, end)` within a compound.
#[derive(Copy, Clone, Debug)]
struct Run {
    start: usize,
    end: usize,
}

pub struct ControlFlowWrapPass;

impl MorphPass for ControlFlowWrapPass {
    fn name(&self) -> &'static str {
        "control_flow_wrap"
    }

    #[tracing::instrument(level = "debug", skip_all)]
    fn run(
        &self,
        mut job: ShaderJob,
        session: &mut Session,
        pool: &mut TypePool,
        donor: Option<&Donor>,
    ) -> Result<ShaderJob, MorphError> {
        let resolver = Resolver::resolve(&job.module, &job.arena, session.interner(), pool)?;

        // Phase 1: select runs per compound.
        let probability = session.settings().control_flow_wrap;
        let mut plan: FxHashMap<StmtId, Vec<Run>> = FxHashMap::default();
        for function in job.module.functions() {
            let mut planner = Planner {
                arena: &job.arena,
                session: &mut *session,
                probability,
                plan: &mut plan,
            };
            planner.walk_stmt(function.body);
        }
        if plan.is_empty() {
            return Ok(job);
        }
        tracing::debug!(compounds = plan.len(), "control flow wrap plan");

        // Phase 2: one rebuild consulting the plan.
        let decls = job.module.decls.clone();
        let mut wrapper = Wrapper {
            ctx: GenCtx {
                session,
                resolver: &resolver,
                pool,
                uniforms: &job.uniforms,
                donor,
                function: FunctionCtx::none(),
            },
            plan: &plan,
            error: None,
        };
        let mut new_decls = Vec::with_capacity(decls.len());
        for decl in decls {
            match decl {
                GlobalDecl::Function(function) => {
                    let ret = resolver
                        .function(function.name)
                        .map_or(Idx::NONE, |sig| sig.ret);
                    wrapper.ctx.function = FunctionCtx {
                        name: function.name,
                        ret,
                    };
                    let rebuilt =
                        rewrite::rebuild_function(&mut wrapper, &mut job.arena, &function);
                    new_decls.push(GlobalDecl::Function(rebuilt));
                }
                other => new_decls.push(other),
            }
        }
        if let Some(error) = wrapper.error {
            return Err(error);
        }
        job.module = Module { decls: new_decls };
        Ok(job)
    }
}

/// Phase-1 traversal: run selection with lazy shrinking.
struct Planner<'a> {
    arena: &'a ModuleArena,
    session: &'a mut Session,
    probability: f64,
    plan: &'a mut FxHashMap<StmtId, Vec<Run>>,
}

impl Planner<'_> {
    fn walk_stmt(&mut self, id: StmtId) {
        match self.arena.stmt(id) {
            StmtKind::Compound(range) => {
                let children = self.arena.stmt_list(range).to_vec();
                let runs = self.select_runs(&children);
                if !runs.is_empty() {
                    self.plan.insert(id, runs);
                }
                for child in children {
                    self.walk_stmt(child);
                }
            }
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.walk_stmt(then_branch);
                if else_branch.is_valid() {
                    self.walk_stmt(else_branch);
                }
            }
            StmtKind::For { body, .. } | StmtKind::While { body, .. } => {
                self.walk_stmt(body);
            }
            StmtKind::Loop { body, continuing } => {
                self.walk_stmt(body);
                if continuing.is_valid() {
                    // Runs inside a continuing block cannot be wrapped: the
                    // wrapper shapes need jumps/returns that are illegal
                    // there. Nested loops inside it are still visited.
                    self.walk_continuing_constructs_only(continuing);
                }
            }
            StmtKind::Switch { cases, .. } => {
                for case in self.arena.case_list(cases).to_vec() {
                    self.walk_stmt(case.body);
                }
            }
            StmtKind::DeadCodeFragment(inner)
            | StmtKind::ControlFlowWrapper { inner, .. }
            | StmtKind::ControlFlowWrapReturn { inner, .. } => {
                self.walk_stmt(inner);
            }
            _ => {}
        }
    }

    /// Inside a continuing block, skip compound selection but keep
    /// descending into complete nested loops (their bodies are fair game).
    fn walk_continuing_constructs_only(&mut self, id: StmtId) {
        match self.arena.stmt(id) {
            StmtKind::Compound(range) => {
                for child in self.arena.stmt_list(range).to_vec() {
                    self.walk_continuing_constructs_only(child);
                }
            }
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.walk_continuing_constructs_only(then_branch);
                if else_branch.is_valid() {
                    self.walk_continuing_constructs_only(else_branch);
                }
            }
            StmtKind::For { body, .. }
            | StmtKind::While { body, .. }
            | StmtKind::Loop { body, .. } => {
                self.walk_stmt(body);
            }
            StmtKind::Switch { cases, .. } => {
                for case in self.arena.case_list(cases).to_vec() {
                    self.walk_continuing_constructs_only(case.body);
                }
            }
            _ => {}
        }
    }

    fn select_runs(&mut self, children: &[StmtId]) -> Vec<Run> {
        let len = children.len();
        let mut runs = Vec::new();
        let mut cursor = 0usize;
        for start in 0..len {
            if start < cursor {
                continue;
            }
            if !self.session.rng().flip(self.probability) {
                continue;
            }
            let span = self.session.rng().next_below((len - start) as u32) as usize;
            let wanted_end = start + 1 + span;
            // Shrink the end-point until no declared name escapes the run.
            let mut chosen = None;
            for end in (start + 1..=wanted_end).rev() {
                if run_is_legal(self.arena, children, start, end) {
                    chosen = Some(end);
                    break;
                }
            }
            if let Some(end) = chosen {
                runs.push(Run { start, end });
                cursor = end;
            }
        }
        runs
    }
}

/// A run is legal iff no name declared within it is referenced by any
/// statement after it in the same compound.
fn run_is_legal(arena: &ModuleArena, children: &[StmtId], start: usize, end: usize) -> bool {
    let declared = analysis::declared_names(arena, &children[start..end]);
    if declared.is_empty() {
        return true;
    }
    let later = analysis::referenced_names(arena, &children[end..]);
    declared.is_disjoint(&later)
}

#[derive(Copy, Clone, Debug)]
enum WrapShape {
    IfTrue,
    IfFalse,
    SingleTripFor,
    LoopContinuing,
    WhileTrue,
    Switch,
}

#[derive(Copy, Clone, Debug)]
enum ForStyle {
    IncrementToBound,
    DecrementToBound,
    UnitIncrement,
}

/// Phase-2 rewriter: wraps planned runs.
struct Wrapper<'a, 'b> {
    ctx: GenCtx<'b>,
    plan: &'a FxHashMap<StmtId, Vec<Run>>,
    error: Option<MorphError>,
}

impl rewrite::Rewriter for Wrapper<'_, '_> {
    fn edit_compound(
        &mut self,
        id: StmtId,
        children: &[StmtId],
        arena: &mut ModuleArena,
    ) -> Option<Vec<StmtId>> {
        if self.error.is_some() {
            return None;
        }
        let runs = self.plan.get(&id)?.clone();
        let mut out = Vec::with_capacity(children.len());
        let mut index = 0usize;
        for run in runs {
            while index < run.start {
                out.push(children[index]);
                index += 1;
            }
            match self.wrap_run(id, run, &children[run.start..run.end], arena) {
                Ok((wrapper, fallback)) => {
                    out.push(wrapper);
                    out.extend(fallback);
                }
                Err(error) => {
                    self.error = Some(error);
                    return None;
                }
            }
            index = run.end;
        }
        while index < children.len() {
            out.push(children[index]);
            index += 1;
        }
        Some(out)
    }
}

impl Wrapper<'_, '_> {
    fn wrap_run(
        &mut self,
        compound: StmtId,
        run: Run,
        stmts: &[StmtId],
        arena: &mut ModuleArena,
    ) -> Result<(StmtId, Option<StmtId>), MorphError> {
        if stmts.is_empty() {
            return Err(MorphError::Precondition("wrapping an empty statement run"));
        }
        let ctx = &mut self.ctx;
        let scope = ctx.resolver.scope_at_index(compound, run.start)?;
        let jumps = analysis::escaping_jumps(arena, stmts);
        let loops_allowed = !jumps.breaks && !jumps.continues;
        let switch_allowed = !jumps.breaks;
        let has_return = stmts.iter().any(|&stmt| analysis::contains_return(arena, stmt));

        let weights = ctx.session.settings().wrapper.clone();
        let options = [
            (weights.if_true, WrapShape::IfTrue),
            (weights.if_false, WrapShape::IfFalse),
            (
                if loops_allowed { weights.single_trip_for } else { 0 },
                WrapShape::SingleTripFor,
            ),
            (
                if loops_allowed { weights.loop_continuing } else { 0 },
                WrapShape::LoopContinuing,
            ),
            (
                if loops_allowed { weights.while_true } else { 0 },
                WrapShape::WhileTrue,
            ),
            (
                if switch_allowed { weights.switch } else { 0 },
                WrapShape::Switch,
            ),
        ];
        let shape = *choose(ctx.session.rng(), "wrapper shape", &options)?;

        let inner = match shape {
            WrapShape::IfTrue => {
                let cond = known_bool(ctx, arena, scope, true, 0)?;
                let then_branch = make_compound(arena, stmts.to_vec());
                let else_branch = arbitrary_compound(ctx, arena, scope, 0)?;
                arena.alloc_stmt(StmtKind::If {
                    cond,
                    then_branch,
                    else_branch,
                })
            }
            WrapShape::IfFalse => {
                let cond = known_bool(ctx, arena, scope, false, 0)?;
                let then_branch = arbitrary_compound(ctx, arena, scope, 0)?;
                let else_branch = make_compound(arena, stmts.to_vec());
                arena.alloc_stmt(StmtKind::If {
                    cond,
                    then_branch,
                    else_branch,
                })
            }
            WrapShape::SingleTripFor => single_trip_for(ctx, arena, scope, stmts)?,
            WrapShape::LoopContinuing => loop_with_continuing(ctx, arena, scope, stmts)?,
            WrapShape::WhileTrue => {
                let cond = known_bool(ctx, arena, scope, true, 0)?;
                let mut body = stmts.to_vec();
                body.push(arena.alloc_stmt(StmtKind::Break));
                let body = make_compound(arena, body);
                arena.alloc_stmt(StmtKind::While { cond, body })
            }
            WrapShape::Switch => opaque_switch(ctx, arena, stmts)?,
        };

        let id = ctx.session.mint_id();
        let wrapper = arena.alloc_stmt(StmtKind::ControlFlowWrapper { id, inner });

        // Some shapes no longer statically guarantee the function exits
        // inside the run; a correlated fallback return restores the typing
        // of the path after the wrapper.
        let fallback = if has_return {
            let ret = ctx.function.ret;
            let value = if ret.is_some() {
                arbitrary_expr(ctx, arena, ret, scope, 0)?
            } else {
                ExprId::INVALID
            };
            let ret = arena.alloc_stmt(StmtKind::Return(value));
            Some(arena.alloc_stmt(StmtKind::ControlFlowWrapReturn { id, inner: ret }))
        } else {
            None
        };
        Ok((wrapper, fallback))
    }
}

/// A `for` loop whose header guarantees exactly one trip, in one of three
/// counter styles, with known-value-derived bounds.
fn single_trip_for(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    scope: ScopeId,
    stmts: &[StmtId],
) -> Result<StmtId, MorphError> {
    let styles = [
        (1u32, ForStyle::IncrementToBound),
        (1, ForStyle::DecrementToBound),
        (1, ForStyle::UnitIncrement),
    ];
    let style = *choose(ctx.session.rng(), "for style", &styles)?;
    // Bound in [1, 2^24 - 1] so `bound + 1` stays representable.
    let bound = 1 + i64::from(
        ctx.session
            .rng()
            .next_below((MAX_KNOWN_VALUE - 1) as u32),
    );
    let counter = ctx.session.fresh_name("ctr");
    let i32_name = ctx.session.intern("i32");
    let counter_ty = arena.alloc_ty(morph_ast::TypeDecl::Named(i32_name));
    let body = make_compound(arena, stmts.to_vec());

    let int = |arena: &mut ModuleArena, value: i64| {
        arena.alloc_expr(ExprKind::IntLit {
            value,
            suffix: IntSuffix::I,
        })
    };

    let (init_value, cond, update) = match style {
        ForStyle::IncrementToBound => {
            // for (var c = 0i; c < known(N); c = c + N) — one trip: the
            // first step lands exactly on the bound.
            let zero = int(arena, 0);
            let counter_ref = arena.alloc_expr(ExprKind::Ident(counter));
            let limit = known_int(ctx, arena, Idx::I32, bound, 0)?;
            let cond = arena.alloc_expr(ExprKind::Binary {
                op: BinaryOp::LessThan,
                left: counter_ref,
                right: limit,
            });
            let step = int(arena, bound);
            let lhs = arena.alloc_lhs(morph_ast::LhsExprKind::Ident(counter));
            let update = arena.alloc_stmt(StmtKind::Assignment {
                lhs,
                op: AssignOp::AddAssign,
                rhs: step,
            });
            (zero, cond, update)
        }
        ForStyle::DecrementToBound => {
            // for (var c = known(N); c > 0i; c = c - N)
            let start = known_int(ctx, arena, Idx::I32, bound, 0)?;
            let counter_ref = arena.alloc_expr(ExprKind::Ident(counter));
            let zero = int(arena, 0);
            let cond = arena.alloc_expr(ExprKind::Binary {
                op: BinaryOp::GreaterThan,
                left: counter_ref,
                right: zero,
            });
            let step = int(arena, bound);
            let lhs = arena.alloc_lhs(morph_ast::LhsExprKind::Ident(counter));
            let update = arena.alloc_stmt(StmtKind::Assignment {
                lhs,
                op: AssignOp::SubtractAssign,
                rhs: step,
            });
            (start, cond, update)
        }
        ForStyle::UnitIncrement => {
            // for (var c = known(N); c < known(N + 1); c++)
            let start = known_int(ctx, arena, Idx::I32, bound, 0)?;
            let counter_ref = arena.alloc_expr(ExprKind::Ident(counter));
            let limit = known_int(ctx, arena, Idx::I32, bound + 1, 0)?;
            let cond = arena.alloc_expr(ExprKind::Binary {
                op: BinaryOp::LessThan,
                left: counter_ref,
                right: limit,
            });
            let lhs = arena.alloc_lhs(morph_ast::LhsExprKind::Ident(counter));
            let update = arena.alloc_stmt(StmtKind::Increment(lhs));
            (start, cond, update)
        }
    };

    let init = arena.alloc_stmt(StmtKind::Variable {
        kind: LocalKind::Var,
        name: counter,
        ty: counter_ty,
        init: init_value,
    });
    Ok(arena.alloc_stmt(StmtKind::For {
        init,
        cond,
        update,
        body,
    }))
}

/// `loop { prefix; continuing { suffix; break if true; } }`, split right
/// after the run's last return so no return lands in the continuing block.
fn loop_with_continuing(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    scope: ScopeId,
    stmts: &[StmtId],
) -> Result<StmtId, MorphError> {
    let split = match analysis::last_return_index(arena, stmts) {
        Some(last) => last + 1,
        None => ctx.session.rng().next_below(stmts.len() as u32 + 1) as usize,
    };
    let prefix = stmts[..split].to_vec();
    let mut suffix = stmts[split..].to_vec();
    let break_cond = known_bool(ctx, arena, scope, true, 0)?;
    suffix.push(arena.alloc_stmt(StmtKind::BreakIf(break_cond)));

    let body = make_compound(arena, prefix);
    let continuing = make_compound(arena, suffix);
    Ok(arena.alloc_stmt(StmtKind::Loop { body, continuing }))
}

/// `switch (known(V)) { decoys…; case V: { run } decoys…; default {} }`
fn opaque_switch(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    stmts: &[StmtId],
) -> Result<StmtId, MorphError> {
    let value = i64::from(
        ctx.session
            .rng()
            .next_below(MAX_KNOWN_VALUE as u32 + 1),
    );
    let subject = known_int(ctx, arena, Idx::I32, value, 0)?;

    let before = ctx.session.rng().next_below(3);
    let after = ctx.session.rng().next_below(3);
    let mut cases = Vec::with_capacity((before + after + 2) as usize);
    let mut decoy = |arena: &mut ModuleArena, offset: u32| {
        let selector = arena.alloc_expr(ExprKind::IntLit {
            value: value + 1 + i64::from(offset),
            suffix: IntSuffix::I,
        });
        let selectors = arena.alloc_expr_list([selector]);
        let body = make_compound(arena, vec![]);
        SwitchCase {
            selectors,
            has_default: false,
            body,
        }
    };
    for offset in 0..before {
        let case = decoy(arena, offset);
        cases.push(case);
    }
    let selector = arena.alloc_expr(ExprKind::IntLit {
        value,
        suffix: IntSuffix::I,
    });
    let selectors = arena.alloc_expr_list([selector]);
    let body = make_compound(arena, stmts.to_vec());
    cases.push(SwitchCase {
        selectors,
        has_default: false,
        body,
    });
    for offset in before..before + after {
        let case = decoy(arena, offset);
        cases.push(case);
    }
    // WGSL requires exactly one default clause; it is always a decoy here.
    let default_body = make_compound(arena, vec![]);
    cases.push(SwitchCase {
        selectors: morph_ast::ExprRange::EMPTY,
        has_default: true,
        body: default_body,
    });

    let cases = arena.alloc_cases(cases);
    Ok(arena.alloc_stmt(StmtKind::Switch { subject, cases }))
}
