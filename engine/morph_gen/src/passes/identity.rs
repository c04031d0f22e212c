//! Identity-operation injection.
//!
//! Rewrites concrete numeric scalar expressions `x` into a parenthesized
//! `x + 0`, `0 + x`, `x - 0`, `1 * x`, `x * 1` or `x / 1`, where the 0/1
//! operand comes from the known-value engine — so it need not look like a
//! literal at all. Each rewrite is tagged `IdentityOperation` with the
//! original expression and a session-unique paren tag, recording how to
//! strip it back mechanically.
//!
//! Const-expression positions are never planned: module-scope and local
//! `const` initializers, `const_assert` conditions, switch case selectors,
//! attribute arguments and array sizes all keep their original spelling.
//! The literal half of a `KnownValue` is a proof, not code, and is skipped
//! too. Non-scalar identity operations are an unimplemented loud-failure
//! gap, surfaced here as ineligibility.

use rustc_hash::FxHashSet;

use morph_ast::{
    rewrite, BinaryOp, ExprId, ExprKind, GlobalDecl, Module, ModuleArena, StmtId, StmtKind,
};
use morph_resolve::Resolver;
use morph_types::{Idx, TypePool};

use crate::choice::choose;
use crate::ctx::{FunctionCtx, GenCtx};
use crate::donor::Donor;
use crate::job::ShaderJob;
use crate::known_value::known_int;
use crate::passes::MorphPass;
use crate::session::Session;
use crate::MorphError;

pub struct IdentityOperationPass;

impl MorphPass for IdentityOperationPass {
    fn name(&self) -> &'static str {
        "identity_operation"
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

        // Phase 1: choose rewrite sites.
        let probability = session.settings().apply_identity_operation;
        let mut plan: FxHashSet<ExprId> = FxHashSet::default();
        for function in job.module.functions() {
            let mut planner = Planner {
                arena: &job.arena,
                resolver: &resolver,
                session: &mut *session,
                probability,
                plan: &mut plan,
            };
            planner.walk_stmt(function.body);
        }
        if plan.is_empty() {
            return Ok(job);
        }
        tracing::debug!(sites = plan.len(), "identity operation plan");

        // Phase 2: one rebuild consulting the plan.
        let decls = job.module.decls.clone();
        let mut applier = Applier {
            ctx: GenCtx {
                session,
                resolver: &resolver,
                pool,
                uniforms: &job.uniforms,
                donor,
                function: FunctionCtx::none(),
            },
            plan,
            error: None,
        };
        let mut new_decls = Vec::with_capacity(decls.len());
        for decl in decls {
            match decl {
                GlobalDecl::Function(function) => {
                    let ret = resolver
                        .function(function.name)
                        .map_or(Idx::NONE, |sig| sig.ret);
                    applier.ctx.function = FunctionCtx {
                        name: function.name,
                        ret,
                    };
                    let rebuilt =
                        rewrite::rebuild_function(&mut applier, &mut job.arena, &function);
                    new_decls.push(GlobalDecl::Function(rebuilt));
                }
                other => new_decls.push(other),
            }
        }
        if let Some(error) = applier.error {
            return Err(error);
        }
        job.module = Module { decls: new_decls };
        Ok(job)
    }
}

/// Phase-1 traversal over non-const expression positions.
struct Planner<'a> {
    arena: &'a ModuleArena,
    resolver: &'a Resolver,
    session: &'a mut Session,
    probability: f64,
    plan: &'a mut FxHashSet<ExprId>,
}

impl Planner<'_> {
    fn walk_stmt(&mut self, id: StmtId) {
        match self.arena.stmt(id) {
            StmtKind::Compound(range) => {
                for child in self.arena.stmt_list(range).to_vec() {
                    self.walk_stmt(child);
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.walk_expr(cond);
                self.walk_stmt(then_branch);
                if else_branch.is_valid() {
                    self.walk_stmt(else_branch);
                }
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                if init.is_valid() {
                    self.walk_stmt(init);
                }
                if cond.is_valid() {
                    self.walk_expr(cond);
                }
                if update.is_valid() {
                    self.walk_stmt(update);
                }
                self.walk_stmt(body);
            }
            StmtKind::While { cond, body } => {
                self.walk_expr(cond);
                self.walk_stmt(body);
            }
            StmtKind::Loop { body, continuing } => {
                self.walk_stmt(body);
                if continuing.is_valid() {
                    self.walk_stmt(continuing);
                }
            }
            StmtKind::Switch { subject, cases } => {
                // Case selectors are const-expressions: subject only.
                self.walk_expr(subject);
                for case in self.arena.case_list(cases).to_vec() {
                    self.walk_stmt(case.body);
                }
            }
            StmtKind::Return(value) => {
                if value.is_valid() {
                    self.walk_expr(value);
                }
            }
            StmtKind::BreakIf(cond) => self.walk_expr(cond),
            StmtKind::Assignment { lhs, rhs, .. } => {
                if lhs.is_valid() {
                    self.walk_lhs(lhs);
                }
                self.walk_expr(rhs);
            }
            StmtKind::Variable { init, .. } => {
                if init.is_valid() {
                    self.walk_expr(init);
                }
            }
            StmtKind::FunctionCall { args, .. } => {
                for &arg in &self.arena.expr_list(args).to_vec() {
                    self.walk_expr(arg);
                }
            }
            StmtKind::Increment(lhs) | StmtKind::Decrement(lhs) => self.walk_lhs(lhs),
            StmtKind::DeadCodeFragment(inner)
            | StmtKind::ControlFlowWrapper { inner, .. }
            | StmtKind::ControlFlowWrapReturn { inner, .. } => self.walk_stmt(inner),
            // Const positions and leaf statements.
            StmtKind::Value { .. }
            | StmtKind::ConstAssert(_)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Discard
            | StmtKind::Empty => {}
        }
    }

    fn walk_expr(&mut self, id: ExprId) {
        // Concrete numeric scalars only; abstract literals would change
        // type under a suffixed 0/1, and non-scalars are the flagged gap.
        let eligible = self
            .resolver
            .type_of(id)
            .ok()
            .is_some_and(|ty| matches!(ty, Idx::I32 | Idx::U32 | Idx::F32));
        if eligible && self.session.rng().flip(self.probability) {
            self.plan.insert(id);
        }
        match self.arena.expr(id) {
            ExprKind::Ident(_)
            | ExprKind::BoolLit(_)
            | ExprKind::IntLit { .. }
            | ExprKind::FloatLit { .. } => {}
            ExprKind::Unary { operand, .. } => self.walk_expr(operand),
            ExprKind::Binary { left, right, .. } => {
                self.walk_expr(left);
                self.walk_expr(right);
            }
            ExprKind::Paren(inner)
            | ExprKind::TrueByConstruction(inner)
            | ExprKind::FalseByConstruction(inner)
            | ExprKind::ArbitraryExpression(inner) => self.walk_expr(inner),
            ExprKind::FunctionCall { args, .. }
            | ExprKind::ScalarConstructor { args, .. }
            | ExprKind::VectorConstructor { args, .. }
            | ExprKind::MatrixConstructor { args, .. }
            | ExprKind::ArrayConstructor { args, .. }
            | ExprKind::StructConstructor { args, .. } => {
                for &arg in &self.arena.expr_list(args).to_vec() {
                    self.walk_expr(arg);
                }
            }
            ExprKind::IndexLookup { receiver, index } => {
                self.walk_expr(receiver);
                self.walk_expr(index);
            }
            ExprKind::MemberLookup { receiver, .. } => self.walk_expr(receiver),
            // The literal half is the proof; only the runtime half is code.
            ExprKind::KnownValue { expr, .. } => self.walk_expr(expr),
            ExprKind::IdentityOperation { replacement, .. } => self.walk_expr(replacement),
        }
    }

    fn walk_lhs(&mut self, id: morph_ast::LhsId) {
        match self.arena.lhs(id) {
            morph_ast::LhsExprKind::Ident(_) => {}
            morph_ast::LhsExprKind::IndexLookup { receiver, index } => {
                self.walk_lhs(receiver);
                self.walk_expr(index);
            }
            morph_ast::LhsExprKind::MemberLookup { receiver, .. }
            | morph_ast::LhsExprKind::Paren(receiver)
            | morph_ast::LhsExprKind::Deref(receiver)
            | morph_ast::LhsExprKind::AddressOf(receiver) => self.walk_lhs(receiver),
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum IdentityForm {
    XPlusZero,
    ZeroPlusX,
    XMinusZero,
    OneTimesX,
    XTimesOne,
    XDivOne,
}

/// Phase-2 rewriter.
struct Applier<'a> {
    ctx: GenCtx<'a>,
    plan: FxHashSet<ExprId>,
    error: Option<MorphError>,
}

impl rewrite::Rewriter for Applier<'_> {
    fn replace_expr(&mut self, id: ExprId, arena: &mut ModuleArena) -> Option<ExprId> {
        if self.error.is_some() || !self.plan.remove(&id) {
            return None;
        }
        // Rebuild children first (nested planned sites fire during this
        // descent, now that this id is out of the plan), then wrap.
        let rebuilt = rewrite::rebuild_expr(self, arena, id);
        let ty = match self.ctx.resolver.type_of(id) {
            Ok(ty) => ty,
            Err(error) => {
                self.error = Some(error.into());
                return None;
            }
        };
        match self.apply(arena, rebuilt, ty) {
            Ok(wrapped) => Some(wrapped),
            Err(error) => {
                self.error = Some(error);
                None
            }
        }
    }
}

impl Applier<'_> {
    fn apply(
        &mut self,
        arena: &mut ModuleArena,
        original: ExprId,
        ty: Idx,
    ) -> Result<ExprId, MorphError> {
        let forms = [
            (1u32, IdentityForm::XPlusZero),
            (1, IdentityForm::ZeroPlusX),
            (1, IdentityForm::XMinusZero),
            (1, IdentityForm::OneTimesX),
            (1, IdentityForm::XTimesOne),
            (1, IdentityForm::XDivOne),
        ];
        let form = *choose(self.ctx.session.rng(), "identity form", &forms)?;
        let (op, operand_value, x_on_left) = match form {
            IdentityForm::XPlusZero => (BinaryOp::Add, 0, true),
            IdentityForm::ZeroPlusX => (BinaryOp::Add, 0, false),
            IdentityForm::XMinusZero => (BinaryOp::Subtract, 0, true),
            IdentityForm::OneTimesX => (BinaryOp::Multiply, 1, false),
            IdentityForm::XTimesOne => (BinaryOp::Multiply, 1, true),
            IdentityForm::XDivOne => (BinaryOp::Divide, 1, true),
        };
        let operand = known_int(&mut self.ctx, arena, ty, operand_value, 0)?;
        let (left, right) = if x_on_left {
            (original, operand)
        } else {
            (operand, original)
        };
        let binary = arena.alloc_expr(ExprKind::Binary { op, left, right });
        let paren = arena.alloc_expr(ExprKind::Paren(binary));
        let tag = self.ctx.session.mint_id();
        Ok(arena.alloc_expr(ExprKind::IdentityOperation {
            replacement: paren,
            original,
            tag,
        }))
    }
}
