//! Dead-jump injection: discard / break / continue / return.
//!
//! One algorithm, specialized per jump kind. The selection phase walks each
//! function with a stack of enclosing constructs, deciding per legal
//! compound offset (independent coin flips) where to inject; the rewrite
//! phase conceals each injected jump inside an opaque never-taken shape and
//! marks it `DeadCodeFragment`.
//!
//! Legality is per jump kind: `break` needs a nearest relevant construct
//! from {loop, for, while, switch} that is not a `continuing` block;
//! `continue` the same without switch; `return` and `discard` must not sit
//! inside any `continuing` block, and `discard` additionally requires the
//! function to be reachable from a `@fragment` entry point.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use morph_ast::{rewrite, ExprId, GlobalDecl, Module, ModuleArena, StmtId, StmtKind};
use morph_resolve::{Resolver, ScopeId};
use morph_types::{Idx, TypePool};

use crate::arbitrary::arbitrary_expr;
use crate::choice::choose;
use crate::ctx::{FunctionCtx, GenCtx};
use crate::donor::Donor;
use crate::job::ShaderJob;
use crate::known_value::known_bool;
use crate::passes::MorphPass;
use crate::session::Session;
use crate::MorphError;

/// The four dead-jump specializations.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum JumpKind {
    Discard,
    Break,
    Continue,
    Return,
}

/// Constructs tracked by the selection stack.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Construct {
    Loop,
    For,
    While,
    Switch,
    Continuing,
}

type ConstructStack = SmallVec<[Construct; 8]>;

fn jump_legal(kind: JumpKind, stack: &ConstructStack) -> bool {
    match kind {
        JumpKind::Break => stack
            .iter()
            .rev()
            .find(|construct| {
                matches!(
                    construct,
                    Construct::Loop
                        | Construct::For
                        | Construct::While
                        | Construct::Switch
                        | Construct::Continuing
                )
            })
            .is_some_and(|nearest| *nearest != Construct::Continuing),
        JumpKind::Continue => stack
            .iter()
            .rev()
            .find(|construct| {
                matches!(
                    construct,
                    Construct::Loop | Construct::For | Construct::While | Construct::Continuing
                )
            })
            .is_some_and(|nearest| *nearest != Construct::Continuing),
        JumpKind::Return | JumpKind::Discard => !stack.contains(&Construct::Continuing),
    }
}

/// One dead-jump pass.
pub struct DeadJumpPass {
    kind: JumpKind,
}

impl DeadJumpPass {
    pub fn discard() -> Self {
        DeadJumpPass {
            kind: JumpKind::Discard,
        }
    }

    pub fn dead_break() -> Self {
        DeadJumpPass {
            kind: JumpKind::Break,
        }
    }

    pub fn dead_continue() -> Self {
        DeadJumpPass {
            kind: JumpKind::Continue,
        }
    }

    pub fn dead_return() -> Self {
        DeadJumpPass {
            kind: JumpKind::Return,
        }
    }

    fn probability(&self, session: &Session) -> f64 {
        let settings = session.settings();
        match self.kind {
            JumpKind::Discard => settings.inject_dead_discard,
            JumpKind::Break => settings.inject_dead_break,
            JumpKind::Continue => settings.inject_dead_continue,
            JumpKind::Return => settings.inject_dead_return,
        }
    }
}

impl MorphPass for DeadJumpPass {
    fn name(&self) -> &'static str {
        match self.kind {
            JumpKind::Discard => "dead_discard",
            JumpKind::Break => "dead_break",
            JumpKind::Continue => "dead_continue",
            JumpKind::Return => "dead_return",
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(pass = self.name()))]
    fn run(
        &self,
        mut job: ShaderJob,
        session: &mut Session,
        pool: &mut TypePool,
        donor: Option<&Donor>,
    ) -> Result<ShaderJob, MorphError> {
        let resolver = Resolver::resolve(&job.module, &job.arena, session.interner(), pool)?;

        // Phase 1: choose injection sites.
        let probability = self.probability(session);
        let mut plan: FxHashMap<StmtId, Vec<usize>> = FxHashMap::default();
        for function in job.module.functions() {
            if self.kind == JumpKind::Discard
                && !resolver.fragment_stage_reachable(function.name)
            {
                continue;
            }
            let mut planner = Planner {
                arena: &job.arena,
                session: &mut *session,
                kind: self.kind,
                probability,
                stack: SmallVec::new(),
                plan: &mut plan,
            };
            planner.walk_stmt(function.body);
        }
        if plan.is_empty() {
            return Ok(job);
        }
        tracing::debug!(compounds = plan.len(), "dead jump plan");

        // Phase 2: one rebuild consulting the plan.
        let decls = job.module.decls.clone();
        let mut injector = Injector {
            ctx: GenCtx {
                session,
                resolver: &resolver,
                pool,
                uniforms: &job.uniforms,
                donor,
                function: FunctionCtx::none(),
            },
            kind: self.kind,
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
                    injector.ctx.function = FunctionCtx {
                        name: function.name,
                        ret,
                    };
                    let rebuilt =
                        rewrite::rebuild_function(&mut injector, &mut job.arena, &function);
                    new_decls.push(GlobalDecl::Function(rebuilt));
                }
                other => new_decls.push(other),
            }
        }
        if let Some(error) = injector.error {
            return Err(error);
        }
        job.module = Module { decls: new_decls };
        Ok(job)
    }
}

/// Phase-1 traversal: enclosing-construct stack + per-offset coin flips.
struct Planner<'a> {
    arena: &'a ModuleArena,
    session: &'a mut Session,
    kind: JumpKind,
    probability: f64,
    stack: ConstructStack,
    plan: &'a mut FxHashMap<StmtId, Vec<usize>>,
}

impl Planner<'_> {
    fn walk_stmt(&mut self, id: StmtId) {
        match self.arena.stmt(id) {
            StmtKind::Compound(range) => {
                let children = self.arena.stmt_list(range).to_vec();
                if jump_legal(self.kind, &self.stack) {
                    let mut offsets = Vec::new();
                    for offset in 0..=children.len() {
                        if self.session.rng().flip(self.probability) {
                            offsets.push(offset);
                        }
                    }
                    if !offsets.is_empty() {
                        self.plan.insert(id, offsets);
                    }
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
            StmtKind::For { body, .. } => {
                self.stack.push(Construct::For);
                self.walk_stmt(body);
                self.stack.pop();
            }
            StmtKind::While { body, .. } => {
                self.stack.push(Construct::While);
                self.walk_stmt(body);
                self.stack.pop();
            }
            StmtKind::Loop { body, continuing } => {
                self.stack.push(Construct::Loop);
                self.walk_stmt(body);
                self.stack.pop();
                if continuing.is_valid() {
                    self.stack.push(Construct::Continuing);
                    self.walk_stmt(continuing);
                    self.stack.pop();
                }
            }
            StmtKind::Switch { cases, .. } => {
                self.stack.push(Construct::Switch);
                for case in self.arena.case_list(cases).to_vec() {
                    self.walk_stmt(case.body);
                }
                self.stack.pop();
            }
            StmtKind::DeadCodeFragment(inner)
            | StmtKind::ControlFlowWrapper { inner, .. }
            | StmtKind::ControlFlowWrapReturn { inner, .. } => {
                self.walk_stmt(inner);
            }
            _ => {}
        }
    }
}

/// Phase-2 rewriter: inserts concealed jumps at planned offsets.
struct Injector<'a, 'b> {
    ctx: GenCtx<'b>,
    kind: JumpKind,
    plan: &'a FxHashMap<StmtId, Vec<usize>>,
    error: Option<MorphError>,
}

impl rewrite::Rewriter for Injector<'_, '_> {
    fn edit_compound(
        &mut self,
        id: StmtId,
        children: &[StmtId],
        arena: &mut ModuleArena,
    ) -> Option<Vec<StmtId>> {
        if self.error.is_some() {
            return None;
        }
        let offsets = self.plan.get(&id)?.clone();
        let mut out = Vec::with_capacity(children.len() + offsets.len());
        let mut pending = offsets.iter().peekable();
        for index in 0..=children.len() {
            while pending.peek() == Some(&&index) {
                pending.next();
                match self.synthesize(id, index, arena) {
                    Ok(stmt) => out.push(stmt),
                    Err(error) => {
                        self.error = Some(error);
                        return None;
                    }
                }
            }
            if index < children.len() {
                out.push(children[index]);
            }
        }
        Some(out)
    }
}

impl Injector<'_, '_> {
    fn synthesize(
        &mut self,
        compound: StmtId,
        offset: usize,
        arena: &mut ModuleArena,
    ) -> Result<StmtId, MorphError> {
        let scope = self.ctx.resolver.scope_at_index(compound, offset)?;
        let jump = self.make_jump(arena, scope)?;
        conceal_jump(&mut self.ctx, arena, scope, jump)
    }

    fn make_jump(
        &mut self,
        arena: &mut ModuleArena,
        scope: ScopeId,
    ) -> Result<StmtId, MorphError> {
        let kind = match self.kind {
            JumpKind::Discard => StmtKind::Discard,
            JumpKind::Break => StmtKind::Break,
            JumpKind::Continue => StmtKind::Continue,
            JumpKind::Return => {
                // The value is never observed, but must still type-check.
                let ret = self.ctx.function.ret;
                let value = if ret.is_some() {
                    arbitrary_expr(&mut self.ctx, arena, ret, scope, 0)?
                } else {
                    ExprId::INVALID
                };
                StmtKind::Return(value)
            }
        };
        Ok(arena.alloc_stmt(kind))
    }
}

#[derive(Copy, Clone, Debug)]
enum ConcealShape {
    IfFalse,
    IfTrueElse,
    WhileFalse,
    ForFalse,
    LoopBreak,
}

/// Nest a jump inside a never-taken shape, marked `DeadCodeFragment`.
fn conceal_jump(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    scope: ScopeId,
    jump: StmtId,
) -> Result<StmtId, MorphError> {
    let weights = ctx.session.settings().dead_jump_shape.clone();
    let options = [
        (weights.if_false, ConcealShape::IfFalse),
        (weights.if_true_else, ConcealShape::IfTrueElse),
        (weights.while_false, ConcealShape::WhileFalse),
        (weights.for_false, ConcealShape::ForFalse),
        (weights.loop_break, ConcealShape::LoopBreak),
    ];
    let shape = *choose(ctx.session.rng(), "dead jump shape", &options)?;

    let wrapped = match shape {
        ConcealShape::IfFalse => {
            let cond = known_bool(ctx, arena, scope, false, 0)?;
            let then_branch = compound(arena, vec![jump]);
            arena.alloc_stmt(StmtKind::If {
                cond,
                then_branch,
                else_branch: StmtId::INVALID,
            })
        }
        ConcealShape::IfTrueElse => {
            let cond = known_bool(ctx, arena, scope, true, 0)?;
            let then_branch = compound(arena, vec![]);
            let else_branch = compound(arena, vec![jump]);
            arena.alloc_stmt(StmtKind::If {
                cond,
                then_branch,
                else_branch,
            })
        }
        ConcealShape::WhileFalse => {
            let cond = known_bool(ctx, arena, scope, false, 0)?;
            let body = compound(arena, vec![jump]);
            arena.alloc_stmt(StmtKind::While { cond, body })
        }
        ConcealShape::ForFalse => {
            let cond = known_bool(ctx, arena, scope, false, 0)?;
            let body = compound(arena, vec![jump]);
            arena.alloc_stmt(StmtKind::For {
                init: StmtId::INVALID,
                cond,
                update: StmtId::INVALID,
                body,
            })
        }
        ConcealShape::LoopBreak => {
            // loop { if (true-by-construction) { break; } jump; }
            let cond = known_bool(ctx, arena, scope, true, 0)?;
            let brk = arena.alloc_stmt(StmtKind::Break);
            let then_branch = compound(arena, vec![brk]);
            let guard = arena.alloc_stmt(StmtKind::If {
                cond,
                then_branch,
                else_branch: StmtId::INVALID,
            });
            let body = compound(arena, vec![guard, jump]);
            arena.alloc_stmt(StmtKind::Loop {
                body,
                continuing: StmtId::INVALID,
            })
        }
    };
    Ok(arena.alloc_stmt(StmtKind::DeadCodeFragment(wrapped)))
}

pub(crate) fn compound(arena: &mut ModuleArena, stmts: Vec<StmtId>) -> StmtId {
    let range = arena.alloc_stmt_list(stmts);
    arena.alloc_stmt(StmtKind::Compound(range))
}

// Re-exported for the wrap pass, which shares the concealment helpers.
pub(crate) use self::compound as make_compound;
