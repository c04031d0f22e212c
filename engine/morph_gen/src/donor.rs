//! Donor-code splicing.
//!
//! A donor is a second, independently loaded module used purely as a source
//! of plausible filler code. Splicing draws a compound from the donor,
//! deep-copies it into the host arena, renames every locally declared or
//! free identifier to a session-fresh name, synthesizes initializers for
//! the free ones, and rewrites donor `return`s into returns of the type the
//! HOST function requires. The result cannot observably affect the host
//! beyond its own fresh bindings.
//!
//! Fragment candidates are filtered up front: no user-function calls, no
//! `discard`, no pointer operations, no `const` declarations or asserts,
//! no non-literal switch selectors, no break/continue escaping the
//! fragment, and every free variable's type must be constructible. What
//! remains can be transplanted into any host position.

use rustc_hash::{FxHashMap, FxHashSet};

use morph_ast::{
    visitor, ExprId, ExprKind, LhsExprKind, LhsId, Module, ModuleArena, Name, StmtId, StmtKind,
    StringInterner, SwitchCase, TyId, TypeDecl,
};
use morph_ast::visitor::Visitor;
use morph_resolve::{Resolver, ScopeId};
use morph_types::{Idx, ScalarKind, TypeKind, TypePool};

use crate::arbitrary::{arbitrary_expr, constant_one};
use crate::ctx::GenCtx;
use crate::{analysis, MorphError};

/// One spliceable donor fragment.
#[derive(Clone, Debug)]
struct Fragment {
    compound: StmtId,
    /// Free variables the fragment references, with their donor types, in
    /// first-reference order.
    free: Vec<(Name, Idx)>,
}

/// An analyzed donor module.
pub struct Donor {
    pub module: Module,
    pub arena: ModuleArena,
    pub resolver: Resolver,
    fragments: Vec<Fragment>,
}

impl Donor {
    /// Resolve a donor module and precompute its spliceable fragments.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn analyze(
        module: Module,
        arena: ModuleArena,
        interner: &StringInterner,
        pool: &mut TypePool,
    ) -> Result<Donor, MorphError> {
        let resolver = Resolver::resolve(&module, &arena, interner, pool)?;
        let mut donor = Donor {
            module,
            arena,
            resolver,
            fragments: Vec::new(),
        };
        donor.collect_fragments(interner, pool);
        tracing::debug!(fragments = donor.fragments.len(), "donor analyzed");
        Ok(donor)
    }

    /// Whether any fragment survived the filters.
    pub fn has_fragments(&self) -> bool {
        !self.fragments.is_empty()
    }

    fn collect_fragments(&mut self, interner: &StringInterner, pool: &TypePool) {
        struct CompoundCollector {
            compounds: Vec<StmtId>,
        }
        impl visitor::Visitor for CompoundCollector {
            fn visit_stmt(&mut self, id: StmtId, arena: &ModuleArena) {
                if matches!(arena.stmt(id), StmtKind::Compound(_)) {
                    self.compounds.push(id);
                }
                visitor::walk_stmt(self, id, arena);
            }
        }
        let mut collector = CompoundCollector {
            compounds: Vec::new(),
        };
        collector.visit_module(&self.module, &self.arena);

        for compound in collector.compounds {
            if let Some(fragment) = self.vet_fragment(compound, interner, pool) {
                self.fragments.push(fragment);
            }
        }
    }

    /// Check one compound against every splice filter.
    fn vet_fragment(
        &self,
        compound: StmtId,
        interner: &StringInterner,
        pool: &TypePool,
    ) -> Option<Fragment> {
        let StmtKind::Compound(range) = self.arena.stmt(compound) else {
            return None;
        };
        let children = self.arena.stmt_list(range).to_vec();
        if children.is_empty() {
            return None;
        }
        let jumps = analysis::escaping_jumps(&self.arena, &children);
        if jumps.breaks || jumps.continues {
            return None;
        }

        let mut vetter = FragmentVetter {
            resolver: &self.resolver,
            interner,
            ok: true,
        };
        for &child in &children {
            vetter.visit_stmt(child, &self.arena);
        }
        if !vetter.ok {
            return None;
        }

        // Free variables: referenced but not declared at any level of the
        // fragment, with a resolvable, constructible donor type.
        let declared = all_declared_names(&self.arena, compound);
        let referenced = analysis::referenced_names(&self.arena, &children);
        let scope = self.resolver.scope_available_before(compound).ok()?;
        // A fragment that declares a name which ALSO resolves outside it
        // may shadow a free reference; renaming cannot tell the two uses
        // apart, so such fragments are rejected outright.
        for &name in declared.iter() {
            if referenced.contains(&name) && self.resolver.entry(scope, name).is_some() {
                return None;
            }
        }
        let mut free = Vec::new();
        let mut seen = FxHashSet::default();
        for name in ordered_references(&self.arena, &children) {
            if declared.contains(&name) || !referenced.contains(&name) || !seen.insert(name) {
                continue;
            }
            let entry = self.resolver.entry(scope, name)?;
            if !constructible(pool, entry.ty) {
                return None;
            }
            free.push((name, entry.ty));
        }
        Some(Fragment { compound, free })
    }
}

/// Visitor rejecting fragment contents the splicer cannot transplant.
struct FragmentVetter<'a> {
    resolver: &'a Resolver,
    interner: &'a StringInterner,
    ok: bool,
}

impl FragmentVetter<'_> {
    /// A type spelling is portable iff it names nothing defined by the
    /// donor module (structs, aliases) and contains no indirection.
    fn ty_is_portable(&self, arena: &ModuleArena, ty: TyId) -> bool {
        match arena.ty(ty) {
            TypeDecl::Named(name) => matches!(
                self.interner.lookup(name),
                "bool" | "i32" | "u32" | "f16" | "f32"
            ),
            TypeDecl::Vector { elem, .. } | TypeDecl::Matrix { elem, .. } => {
                self.ty_is_portable(arena, elem)
            }
            TypeDecl::Array { elem, count } => {
                let literal_count = !count.is_valid()
                    || matches!(arena.expr(count), ExprKind::IntLit { .. });
                literal_count && self.ty_is_portable(arena, elem)
            }
            TypeDecl::Pointer { .. } | TypeDecl::Atomic { .. } => false,
        }
    }
}

impl visitor::Visitor for FragmentVetter<'_> {
    fn visit_stmt(&mut self, id: StmtId, arena: &ModuleArena) {
        if !self.ok {
            return;
        }
        match arena.stmt(id) {
            StmtKind::Discard | StmtKind::ConstAssert(_) | StmtKind::Value { .. } => {
                self.ok = false;
                return;
            }
            StmtKind::FunctionCall { callee, .. } => {
                if self.resolver.function(callee).is_some() {
                    self.ok = false;
                    return;
                }
            }
            StmtKind::Variable { ty, .. } => {
                if ty.is_valid() && !self.ty_is_portable(arena, ty) {
                    self.ok = false;
                    return;
                }
            }
            StmtKind::Switch { cases, .. } => {
                for case in arena.case_list(cases) {
                    for &selector in arena.expr_list(case.selectors) {
                        if !matches!(arena.expr(selector), ExprKind::IntLit { .. }) {
                            self.ok = false;
                            return;
                        }
                    }
                }
            }
            _ => {}
        }
        visitor::walk_stmt(self, id, arena);
    }

    fn visit_expr(&mut self, id: ExprId, arena: &ModuleArena) {
        if !self.ok {
            return;
        }
        match arena.expr(id) {
            ExprKind::Unary { op, .. }
                if matches!(
                    op,
                    morph_ast::UnaryOp::AddressOf | morph_ast::UnaryOp::Deref
                ) =>
            {
                self.ok = false;
                return;
            }
            ExprKind::FunctionCall { callee, .. } => {
                if self.resolver.function(callee).is_some() {
                    self.ok = false;
                    return;
                }
            }
            ExprKind::ScalarConstructor { ty, .. }
            | ExprKind::VectorConstructor { ty, .. }
            | ExprKind::MatrixConstructor { ty, .. }
            | ExprKind::ArrayConstructor { ty, .. }
            | ExprKind::StructConstructor { ty, .. } => {
                if !ty.is_valid() || !self.ty_is_portable(arena, ty) {
                    self.ok = false;
                    return;
                }
            }
            _ => {}
        }
        visitor::walk_expr(self, id, arena);
    }

    fn visit_lhs(&mut self, id: LhsId, arena: &ModuleArena) {
        if !self.ok {
            return;
        }
        if matches!(
            arena.lhs(id),
            LhsExprKind::AddressOf(_) | LhsExprKind::Deref(_)
        ) {
            self.ok = false;
            return;
        }
        visitor::walk_lhs(self, id, arena);
    }
}

/// Splice a random donor fragment into the host at `scope`, returning the
/// replacement compound.
pub fn splice_compound(
    ctx: &mut GenCtx<'_>,
    arena: &mut ModuleArena,
    scope: ScopeId,
    depth: u32,
) -> Result<StmtId, MorphError> {
    let donor = ctx
        .donor
        .ok_or(MorphError::Precondition("donor splice without a donor"))?;
    if donor.fragments.is_empty() {
        // A donor with nothing spliceable contributes an empty block.
        let range = arena.alloc_stmt_list([]);
        return Ok(arena.alloc_stmt(StmtKind::Compound(range)));
    }
    let pick = ctx
        .session
        .rng()
        .next_below(u32::try_from(donor.fragments.len()).unwrap_or(u32::MAX));
    let fragment = donor.fragments[pick as usize].clone();

    // Rename every declared and free identifier to a fresh name.
    let mut rename: FxHashMap<Name, Name> = FxHashMap::default();
    let mut inits: Vec<(Name, Idx)> = Vec::with_capacity(fragment.free.len());
    for &(name, ty) in &fragment.free {
        let fresh = ctx.session.fresh_name("don");
        rename.insert(name, fresh);
        inits.push((fresh, ty));
    }
    for name in declaration_order(&donor.arena, fragment.compound) {
        let fresh = ctx.session.fresh_name("don");
        rename.insert(name, fresh);
    }

    // Initializers for the free variables, synthesized at the host site.
    let mut stmts = Vec::new();
    for (fresh, ty) in inits {
        let spelled = ctx.spell_type(arena, ty)?;
        let init = match arbitrary_expr(ctx, arena, ty, scope, depth + 1) {
            Ok(expr) => expr,
            Err(MorphError::UnsupportedType { .. }) => constant_one(ctx, arena, ty)?,
            Err(other) => return Err(other),
        };
        stmts.push(arena.alloc_stmt(StmtKind::Variable {
            kind: morph_ast::LocalKind::Var,
            name: fresh,
            ty: spelled,
            init,
        }));
    }

    // Deep-copy the fragment body.
    let mut copier = Copier {
        ctx,
        rename,
        scope,
        depth,
    };
    let StmtKind::Compound(range) = donor.arena.stmt(fragment.compound) else {
        return Err(MorphError::Precondition("donor fragment is not a compound"));
    };
    for &child in donor.arena.stmt_list(range) {
        let copied = copier.copy_stmt(&donor.arena, arena, child)?;
        stmts.push(copied);
    }

    let range = arena.alloc_stmt_list(stmts);
    Ok(arena.alloc_stmt(StmtKind::Compound(range)))
}

/// Names declared anywhere inside the fragment, in traversal order.
fn declaration_order(arena: &ModuleArena, compound: StmtId) -> Vec<Name> {
    struct Collector {
        names: Vec<Name>,
    }
    impl visitor::Visitor for Collector {
        fn visit_stmt(&mut self, id: StmtId, arena: &ModuleArena) {
            match arena.stmt(id) {
                StmtKind::Variable { name, .. } | StmtKind::Value { name, .. } => {
                    self.names.push(name);
                }
                _ => {}
            }
            visitor::walk_stmt(self, id, arena);
        }
    }
    let mut collector = Collector { names: Vec::new() };
    collector.visit_stmt(compound, arena);
    collector.names
}

fn all_declared_names(arena: &ModuleArena, compound: StmtId) -> FxHashSet<Name> {
    declaration_order(arena, compound).into_iter().collect()
}

/// Identifier references in deterministic traversal order.
fn ordered_references(arena: &ModuleArena, stmts: &[StmtId]) -> Vec<Name> {
    struct Collector {
        names: Vec<Name>,
    }
    impl visitor::Visitor for Collector {
        fn visit_expr(&mut self, id: ExprId, arena: &ModuleArena) {
            if let ExprKind::Ident(name) = arena.expr(id) {
                self.names.push(name);
            }
            visitor::walk_expr(self, id, arena);
        }
        fn visit_lhs(&mut self, id: LhsId, arena: &ModuleArena) {
            if let LhsExprKind::Ident(name) = arena.lhs(id) {
                self.names.push(name);
            }
            visitor::walk_lhs(self, id, arena);
        }
    }
    let mut collector = Collector { names: Vec::new() };
    for &stmt in stmts {
        collector.visit_stmt(stmt, arena);
    }
    collector.names
}

/// Whether a free variable of this type can be re-declared and initialized
/// at the host site. Struct types are donor-defined and do not transplant.
fn constructible(pool: &TypePool, ty: Idx) -> bool {
    match pool.kind(ty) {
        TypeKind::Scalar(scalar) => !matches!(
            scalar,
            ScalarKind::AbstractInt | ScalarKind::AbstractFloat
        ),
        TypeKind::Vector { elem, .. } | TypeKind::Matrix { elem, .. } => {
            constructible(pool, elem)
        }
        TypeKind::Array { elem, count } => count.is_some() && constructible(pool, elem),
        TypeKind::Struct { .. }
        | TypeKind::Pointer { .. }
        | TypeKind::Reference { .. }
        | TypeKind::Atomic { .. } => false,
    }
}

/// Cross-arena deep copy with renaming and return rewriting.
struct Copier<'a, 'b> {
    ctx: &'a mut GenCtx<'b>,
    rename: FxHashMap<Name, Name>,
    scope: ScopeId,
    depth: u32,
}

impl Copier<'_, '_> {
    fn renamed(&self, name: Name) -> Name {
        self.rename.get(&name).copied().unwrap_or(name)
    }

    fn copy_stmt(
        &mut self,
        src: &ModuleArena,
        dst: &mut ModuleArena,
        id: StmtId,
    ) -> Result<StmtId, MorphError> {
        let kind = match src.stmt(id) {
            StmtKind::Compound(range) => {
                let mut children = Vec::with_capacity(range.len());
                for &child in &src.stmt_list(range).to_vec() {
                    children.push(self.copy_stmt(src, dst, child)?);
                }
                let range = dst.alloc_stmt_list(children);
                StmtKind::Compound(range)
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => StmtKind::If {
                cond: self.copy_expr(src, dst, cond)?,
                then_branch: self.copy_stmt(src, dst, then_branch)?,
                else_branch: if else_branch.is_valid() {
                    self.copy_stmt(src, dst, else_branch)?
                } else {
                    StmtId::INVALID
                },
            },
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => StmtKind::For {
                init: if init.is_valid() {
                    self.copy_stmt(src, dst, init)?
                } else {
                    StmtId::INVALID
                },
                cond: if cond.is_valid() {
                    self.copy_expr(src, dst, cond)?
                } else {
                    ExprId::INVALID
                },
                update: if update.is_valid() {
                    self.copy_stmt(src, dst, update)?
                } else {
                    StmtId::INVALID
                },
                body: self.copy_stmt(src, dst, body)?,
            },
            StmtKind::While { cond, body } => StmtKind::While {
                cond: self.copy_expr(src, dst, cond)?,
                body: self.copy_stmt(src, dst, body)?,
            },
            StmtKind::Loop { body, continuing } => StmtKind::Loop {
                body: self.copy_stmt(src, dst, body)?,
                continuing: if continuing.is_valid() {
                    self.copy_stmt(src, dst, continuing)?
                } else {
                    StmtId::INVALID
                },
            },
            StmtKind::Switch { subject, cases } => {
                let subject = self.copy_expr(src, dst, subject)?;
                let mut copied = Vec::with_capacity(cases.len());
                for case in src.case_list(cases).to_vec() {
                    let mut selectors = Vec::with_capacity(case.selectors.len());
                    for &selector in &src.expr_list(case.selectors).to_vec() {
                        selectors.push(self.copy_expr(src, dst, selector)?);
                    }
                    let selectors = dst.alloc_expr_list(selectors);
                    copied.push(SwitchCase {
                        selectors,
                        has_default: case.has_default,
                        body: self.copy_stmt(src, dst, case.body)?,
                    });
                }
                let cases = dst.alloc_cases(copied);
                StmtKind::Switch { subject, cases }
            }
            // Donor returns become returns of what the HOST site requires.
            StmtKind::Return(_) => {
                let ret = self.ctx.function.ret;
                let value = if ret.is_some() {
                    arbitrary_expr(self.ctx, dst, ret, self.scope, self.depth + 1)?
                } else {
                    ExprId::INVALID
                };
                StmtKind::Return(value)
            }
            StmtKind::Break => StmtKind::Break,
            StmtKind::Continue => StmtKind::Continue,
            StmtKind::BreakIf(cond) => StmtKind::BreakIf(self.copy_expr(src, dst, cond)?),
            StmtKind::Assignment { lhs, op, rhs } => StmtKind::Assignment {
                lhs: if lhs.is_valid() {
                    self.copy_lhs(src, dst, lhs)?
                } else {
                    LhsId::INVALID
                },
                op,
                rhs: self.copy_expr(src, dst, rhs)?,
            },
            StmtKind::Variable {
                kind,
                name,
                ty,
                init,
            } => StmtKind::Variable {
                kind,
                name: self.renamed(name),
                ty: if ty.is_valid() {
                    self.copy_ty(src, dst, ty)?
                } else {
                    TyId::INVALID
                },
                init: if init.is_valid() {
                    self.copy_expr(src, dst, init)?
                } else {
                    ExprId::INVALID
                },
            },
            StmtKind::FunctionCall { callee, args } => StmtKind::FunctionCall {
                callee,
                args: self.copy_expr_list(src, dst, args)?,
            },
            StmtKind::Increment(lhs) => StmtKind::Increment(self.copy_lhs(src, dst, lhs)?),
            StmtKind::Decrement(lhs) => StmtKind::Decrement(self.copy_lhs(src, dst, lhs)?),
            StmtKind::Empty => StmtKind::Empty,
            StmtKind::DeadCodeFragment(inner) => {
                StmtKind::DeadCodeFragment(self.copy_stmt(src, dst, inner)?)
            }
            StmtKind::ControlFlowWrapper { inner, .. }
            | StmtKind::ControlFlowWrapReturn { inner, .. } => {
                // Wrapper ids are session-scoped; a copied wrapper keeps
                // only its runtime form.
                return self.copy_stmt(src, dst, inner);
            }
            StmtKind::Discard | StmtKind::Value { .. } | StmtKind::ConstAssert(_) => {
                return Err(MorphError::Precondition(
                    "unspliceable statement survived fragment vetting",
                ))
            }
        };
        Ok(dst.alloc_stmt(kind))
    }

    fn copy_expr(
        &mut self,
        src: &ModuleArena,
        dst: &mut ModuleArena,
        id: ExprId,
    ) -> Result<ExprId, MorphError> {
        let kind = match src.expr(id) {
            ExprKind::Ident(name) => ExprKind::Ident(self.renamed(name)),
            lit @ (ExprKind::BoolLit(_) | ExprKind::IntLit { .. } | ExprKind::FloatLit { .. }) => {
                lit
            }
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op,
                operand: self.copy_expr(src, dst, operand)?,
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op,
                left: self.copy_expr(src, dst, left)?,
                right: self.copy_expr(src, dst, right)?,
            },
            ExprKind::Paren(inner) => ExprKind::Paren(self.copy_expr(src, dst, inner)?),
            ExprKind::FunctionCall { callee, args } => ExprKind::FunctionCall {
                callee,
                args: self.copy_expr_list(src, dst, args)?,
            },
            ExprKind::ScalarConstructor { ty, args } => ExprKind::ScalarConstructor {
                ty: self.copy_ty(src, dst, ty)?,
                args: self.copy_expr_list(src, dst, args)?,
            },
            ExprKind::VectorConstructor { ty, args } => ExprKind::VectorConstructor {
                ty: self.copy_ty(src, dst, ty)?,
                args: self.copy_expr_list(src, dst, args)?,
            },
            ExprKind::MatrixConstructor { ty, args } => ExprKind::MatrixConstructor {
                ty: self.copy_ty(src, dst, ty)?,
                args: self.copy_expr_list(src, dst, args)?,
            },
            ExprKind::ArrayConstructor { ty, args } => ExprKind::ArrayConstructor {
                ty: self.copy_ty(src, dst, ty)?,
                args: self.copy_expr_list(src, dst, args)?,
            },
            ExprKind::StructConstructor { ty, args } => ExprKind::StructConstructor {
                ty: self.copy_ty(src, dst, ty)?,
                args: self.copy_expr_list(src, dst, args)?,
            },
            ExprKind::IndexLookup { receiver, index } => ExprKind::IndexLookup {
                receiver: self.copy_expr(src, dst, receiver)?,
                index: self.copy_expr(src, dst, index)?,
            },
            ExprKind::MemberLookup { receiver, member } => ExprKind::MemberLookup {
                receiver: self.copy_expr(src, dst, receiver)?,
                member,
            },
            // Augmented donor nodes are copied as their runtime form; their
            // proofs refer to donor execution, not host execution.
            ExprKind::KnownValue { expr, .. } => return self.copy_expr(src, dst, expr),
            ExprKind::TrueByConstruction(inner)
            | ExprKind::FalseByConstruction(inner)
            | ExprKind::ArbitraryExpression(inner) => return self.copy_expr(src, dst, inner),
            ExprKind::IdentityOperation { replacement, .. } => {
                return self.copy_expr(src, dst, replacement)
            }
        };
        Ok(dst.alloc_expr(kind))
    }

    fn copy_expr_list(
        &mut self,
        src: &ModuleArena,
        dst: &mut ModuleArena,
        range: morph_ast::ExprRange,
    ) -> Result<morph_ast::ExprRange, MorphError> {
        let mut copied = Vec::with_capacity(range.len());
        for &arg in &src.expr_list(range).to_vec() {
            copied.push(self.copy_expr(src, dst, arg)?);
        }
        Ok(dst.alloc_expr_list(copied))
    }

    fn copy_lhs(
        &mut self,
        src: &ModuleArena,
        dst: &mut ModuleArena,
        id: LhsId,
    ) -> Result<LhsId, MorphError> {
        let kind = match src.lhs(id) {
            LhsExprKind::Ident(name) => LhsExprKind::Ident(self.renamed(name)),
            LhsExprKind::IndexLookup { receiver, index } => LhsExprKind::IndexLookup {
                receiver: self.copy_lhs(src, dst, receiver)?,
                index: self.copy_expr(src, dst, index)?,
            },
            LhsExprKind::MemberLookup { receiver, member } => LhsExprKind::MemberLookup {
                receiver: self.copy_lhs(src, dst, receiver)?,
                member,
            },
            LhsExprKind::Paren(inner) => LhsExprKind::Paren(self.copy_lhs(src, dst, inner)?),
            LhsExprKind::Deref(_) | LhsExprKind::AddressOf(_) => {
                return Err(MorphError::Precondition(
                    "pointer l-value survived fragment vetting",
                ))
            }
        };
        Ok(dst.alloc_lhs(kind))
    }

    fn copy_ty(
        &mut self,
        src: &ModuleArena,
        dst: &mut ModuleArena,
        id: TyId,
    ) -> Result<TyId, MorphError> {
        let decl = match src.ty(id) {
            TypeDecl::Named(name) => TypeDecl::Named(name),
            TypeDecl::Vector { size, elem } => TypeDecl::Vector {
                size,
                elem: self.copy_ty(src, dst, elem)?,
            },
            TypeDecl::Matrix { cols, rows, elem } => TypeDecl::Matrix {
                cols,
                rows,
                elem: self.copy_ty(src, dst, elem)?,
            },
            TypeDecl::Array { elem, count } => TypeDecl::Array {
                elem: self.copy_ty(src, dst, elem)?,
                count: if count.is_valid() {
                    self.copy_expr(src, dst, count)?
                } else {
                    ExprId::INVALID
                },
            },
            TypeDecl::Pointer { .. } => {
                return Err(MorphError::Precondition(
                    "pointer type survived fragment vetting",
                ))
            }
            TypeDecl::Atomic { elem } => TypeDecl::Atomic {
                elem: self.copy_ty(src, dst, elem)?,
            },
        };
        Ok(dst.alloc_ty(decl))
    }
}
