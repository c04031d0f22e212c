//! Scope and type resolution.
//!
//! One bottom-up pass over a module builds every table the transformation
//! passes query: per-program-point scopes, expression types, function
//! signatures, the fragment-stage call graph, address-taken roots, and the
//! uniform binding list. Passes re-resolve their input from scratch, so the
//! resolver is a pure function of the tree and passes compose in any order.
//!
//! Typing covers the node set this engine generates and consumes; an
//! expression shape outside that set is a fatal [`ResolveError`], signaling
//! divergence between the engine and the program it was handed.

use rustc_hash::{FxHashMap, FxHashSet};

use morph_ast::{
    AccessMode, AddressSpace, AttrKind, ExprId, ExprKind, Function, GlobalDecl, GlobalValueKind,
    LhsExprKind, Module, ModuleArena, Name, ShaderStage, StmtId, StmtKind, StringInterner, TyId,
    TypeDecl, UnaryOp,
};
use morph_types::{Idx, ScalarKind, StructField, TypeKind, TypePool};

use crate::builtins::builtin_return_type;
use crate::scope::{EntryKind, ScopeArena, ScopeEntry, ScopeId};
use crate::ResolveError;

/// Signature of a user function.
#[derive(Clone, Debug)]
pub struct FunctionSig {
    pub name: Name,
    pub params: Vec<Idx>,
    /// `Idx::NONE` for void.
    pub ret: Idx,
    pub stage: Option<ShaderStage>,
}

/// One `var<uniform>` binding.
#[derive(Clone, Debug)]
pub struct UniformBinding {
    pub group: u32,
    pub binding: u32,
    pub name: Name,
    pub ty: Idx,
}

/// The resolved view of one module.
pub struct Resolver {
    scopes: ScopeArena,
    types: FxHashMap<ExprId, Idx>,
    scope_before: FxHashMap<StmtId, ScopeId>,
    compound_scopes: FxHashMap<StmtId, Vec<ScopeId>>,
    functions: FxHashMap<Name, FunctionSig>,
    fragment_reachable: FxHashSet<Name>,
    aliased: FxHashMap<Name, FxHashSet<Name>>,
    uniforms: Vec<UniformBinding>,
    module_scope: ScopeId,
}

impl Resolver {
    /// Resolve a module.
    #[tracing::instrument(level = "debug", skip_all, fields(decls = module.decls.len()))]
    pub fn resolve(
        module: &Module,
        arena: &ModuleArena,
        interner: &StringInterner,
        pool: &mut TypePool,
    ) -> Result<Resolver, ResolveError> {
        let mut builder = Builder {
            arena,
            interner,
            pool,
            scopes: ScopeArena::new(),
            types: FxHashMap::default(),
            scope_before: FxHashMap::default(),
            compound_scopes: FxHashMap::default(),
            functions: FxHashMap::default(),
            aliases: FxHashMap::default(),
            structs: FxHashMap::default(),
            aliased: FxHashMap::default(),
            calls: FxHashMap::default(),
            uniforms: Vec::new(),
            current_function: Name::EMPTY,
        };
        let module_scope = builder.build_module_scope(module)?;
        for decl in &module.decls {
            if let GlobalDecl::Function(function) = decl {
                builder.walk_function(function, module_scope)?;
            }
            if let GlobalDecl::ConstAssert(expr) = decl {
                builder.type_expr(*expr, module_scope)?;
            }
        }
        let fragment_reachable = builder.fragment_reachable(module);
        Ok(Resolver {
            scopes: builder.scopes,
            types: builder.types,
            scope_before: builder.scope_before,
            compound_scopes: builder.compound_scopes,
            functions: builder.functions,
            fragment_reachable,
            aliased: builder.aliased,
            uniforms: builder.uniforms,
            module_scope,
        })
    }

    // Scope queries

    /// The scope available before a statement.
    pub fn scope_available_before(&self, stmt: StmtId) -> Result<ScopeId, ResolveError> {
        self.scope_before
            .get(&stmt)
            .copied()
            .ok_or(ResolveError::Inconsistent("statement has no recorded scope"))
    }

    /// The scope at offset `index` of a compound (after `index` statements).
    pub fn scope_at_index(&self, compound: StmtId, index: usize) -> Result<ScopeId, ResolveError> {
        let offsets = self
            .compound_scopes
            .get(&compound)
            .ok_or(ResolveError::Inconsistent("not a resolved compound"))?;
        offsets
            .get(index)
            .copied()
            .ok_or(ResolveError::Inconsistent("compound offset out of range"))
    }

    /// The scope at the end of a compound.
    pub fn scope_available_at_end(&self, compound: StmtId) -> Result<ScopeId, ResolveError> {
        let offsets = self
            .compound_scopes
            .get(&compound)
            .ok_or(ResolveError::Inconsistent("not a resolved compound"))?;
        offsets
            .last()
            .copied()
            .ok_or(ResolveError::Inconsistent("compound has no offsets"))
    }

    /// The module-level scope.
    pub fn module_scope(&self) -> ScopeId {
        self.module_scope
    }

    /// The scope arena, for entry lookups on a `ScopeId` snapshot.
    pub fn scopes(&self) -> &ScopeArena {
        &self.scopes
    }

    /// Innermost entry for `name` in `scope`.
    pub fn entry(&self, scope: ScopeId, name: Name) -> Option<ScopeEntry> {
        self.scopes.entry(scope, name)
    }

    // Type queries

    /// The resolved type of an expression.
    pub fn type_of(&self, expr: ExprId) -> Result<Idx, ResolveError> {
        self.types
            .get(&expr)
            .copied()
            .ok_or(ResolveError::Inconsistent("expression was not typed"))
    }

    /// Signature of a user function.
    pub fn function(&self, name: Name) -> Option<&FunctionSig> {
        self.functions.get(&name)
    }

    /// Whether `function` is reachable from a `@fragment` entry point.
    pub fn fragment_stage_reachable(&self, function: Name) -> bool {
        self.fragment_reachable.contains(&function)
    }

    /// Whether `name`'s address is taken anywhere inside `function`.
    pub fn is_aliased(&self, function: Name, name: Name) -> bool {
        self.aliased
            .get(&function)
            .is_some_and(|roots| roots.contains(&name))
    }

    // Uniform queries

    /// All uniform bindings in declaration order.
    pub fn uniforms(&self) -> &[UniformBinding] {
        &self.uniforms
    }

    /// Distinct bind groups carrying uniforms, ascending.
    pub fn uniform_groups(&self) -> Vec<u32> {
        let mut groups: Vec<u32> = self.uniforms.iter().map(|u| u.group).collect();
        groups.sort_unstable();
        groups.dedup();
        groups
    }

    /// Bindings within one group, ascending.
    pub fn uniform_bindings_for_group(&self, group: u32) -> Vec<u32> {
        let mut bindings: Vec<u32> = self
            .uniforms
            .iter()
            .filter(|u| u.group == group)
            .map(|u| u.binding)
            .collect();
        bindings.sort_unstable();
        bindings
    }

    /// The uniform declared at `(group, binding)`.
    pub fn uniform_decl(&self, group: u32, binding: u32) -> Option<&UniformBinding> {
        self.uniforms
            .iter()
            .find(|u| u.group == group && u.binding == binding)
    }
}

struct Builder<'a> {
    arena: &'a ModuleArena,
    interner: &'a StringInterner,
    pool: &'a mut TypePool,
    scopes: ScopeArena,
    types: FxHashMap<ExprId, Idx>,
    scope_before: FxHashMap<StmtId, ScopeId>,
    compound_scopes: FxHashMap<StmtId, Vec<ScopeId>>,
    functions: FxHashMap<Name, FunctionSig>,
    aliases: FxHashMap<Name, Idx>,
    structs: FxHashMap<Name, Idx>,
    aliased: FxHashMap<Name, FxHashSet<Name>>,
    calls: FxHashMap<Name, FxHashSet<Name>>,
    uniforms: Vec<UniformBinding>,
    current_function: Name,
}

impl Builder<'_> {
    fn build_module_scope(&mut self, module: &Module) -> Result<ScopeId, ResolveError> {
        let mut scope = ScopeId::EMPTY;
        for decl in &module.decls {
            match decl {
                GlobalDecl::Struct(struct_decl) => {
                    let fields: Result<Vec<StructField>, ResolveError> = struct_decl
                        .members
                        .iter()
                        .map(|member| {
                            Ok(StructField {
                                name: member.name,
                                ty: self.resolve_ty(member.ty)?,
                            })
                        })
                        .collect();
                    let idx = self.pool.register_struct(struct_decl.name, fields?);
                    self.structs.insert(struct_decl.name, idx);
                }
                GlobalDecl::TypeAlias(alias) => {
                    let idx = self.resolve_ty(alias.ty)?;
                    self.aliases.insert(alias.name, idx);
                }
                GlobalDecl::Variable(var) => {
                    let ty = self.resolve_ty(var.ty)?;
                    if var.init.is_valid() {
                        self.type_expr(var.init, scope)?;
                    }
                    let access = var.access.unwrap_or(match var.space {
                        AddressSpace::Uniform | AddressSpace::Storage => AccessMode::Read,
                        _ => AccessMode::ReadWrite,
                    });
                    scope = self.scopes.push(
                        scope,
                        ScopeEntry {
                            name: var.name,
                            ty,
                            kind: EntryKind::GlobalVar(var.space),
                            access,
                            decl: StmtId::INVALID,
                        },
                    );
                    if var.space == AddressSpace::Uniform {
                        let group = self.attr_literal(&var.attrs, AttrKind::Group)?;
                        let binding = self.attr_literal(&var.attrs, AttrKind::Binding)?;
                        self.uniforms.push(UniformBinding {
                            group,
                            binding,
                            name: var.name,
                            ty,
                        });
                    }
                }
                GlobalDecl::Value(value) => {
                    let init_ty = if value.init.is_valid() {
                        Some(self.type_expr(value.init, scope)?)
                    } else {
                        None
                    };
                    let ty = if value.ty.is_valid() {
                        self.resolve_ty(value.ty)?
                    } else {
                        let inferred = init_ty
                            .ok_or(ResolveError::Inconsistent("value without type or init"))?;
                        self.pool.concretize(inferred)
                    };
                    let kind = match value.kind {
                        GlobalValueKind::Const => EntryKind::GlobalConst,
                        GlobalValueKind::Override => EntryKind::Override,
                    };
                    scope = self.scopes.push(
                        scope,
                        ScopeEntry {
                            name: value.name,
                            ty,
                            kind,
                            access: AccessMode::Read,
                            decl: StmtId::INVALID,
                        },
                    );
                }
                GlobalDecl::Function(function) => {
                    let params: Result<Vec<Idx>, ResolveError> = function
                        .params
                        .iter()
                        .map(|param| self.resolve_ty(param.ty))
                        .collect();
                    let ret = if function.ret_ty.is_valid() {
                        self.resolve_ty(function.ret_ty)?
                    } else {
                        Idx::NONE
                    };
                    self.functions.insert(
                        function.name,
                        FunctionSig {
                            name: function.name,
                            params: params?,
                            ret,
                            stage: function.stage(),
                        },
                    );
                }
                GlobalDecl::ConstAssert(_) | GlobalDecl::Empty => {}
            }
        }
        Ok(scope)
    }

    fn attr_literal(
        &self,
        attrs: &[morph_ast::Attribute],
        kind: AttrKind,
    ) -> Result<u32, ResolveError> {
        let attr = attrs
            .iter()
            .find(|attr| attr.kind == kind)
            .ok_or(ResolveError::NonLiteralAttribute("missing group/binding"))?;
        let args = self.arena.expr_list(attr.args);
        match args.first().map(|&arg| self.arena.expr(arg)) {
            Some(ExprKind::IntLit { value, .. }) if value >= 0 => u32::try_from(value)
                .map_err(|_| ResolveError::NonLiteralAttribute("group/binding out of range")),
            _ => Err(ResolveError::NonLiteralAttribute("group/binding")),
        }
    }

    fn walk_function(
        &mut self,
        function: &Function,
        module_scope: ScopeId,
    ) -> Result<(), ResolveError> {
        self.current_function = function.name;
        let mut scope = module_scope;
        for param in &function.params {
            let ty = self.resolve_ty(param.ty)?;
            scope = self.scopes.push(
                scope,
                ScopeEntry {
                    name: param.name,
                    ty,
                    kind: EntryKind::Parameter,
                    access: AccessMode::Read,
                    decl: StmtId::INVALID,
                },
            );
        }
        self.scope_before.insert(function.body, scope);
        self.walk_compound(function.body, scope)
    }

    fn walk_compound(&mut self, id: StmtId, mut scope: ScopeId) -> Result<(), ResolveError> {
        let StmtKind::Compound(range) = self.arena.stmt(id) else {
            return Err(ResolveError::Inconsistent("expected a compound"));
        };
        let children = self.arena.stmt_list(range).to_vec();
        let mut offsets = Vec::with_capacity(children.len() + 1);
        offsets.push(scope);
        for child in children {
            self.scope_before.insert(child, scope);
            scope = self.walk_stmt(child, scope)?;
            offsets.push(scope);
        }
        self.compound_scopes.insert(id, offsets);
        Ok(())
    }

    /// Walk one statement; returns the scope available after it.
    fn walk_stmt(&mut self, id: StmtId, scope: ScopeId) -> Result<ScopeId, ResolveError> {
        match self.arena.stmt(id) {
            StmtKind::Compound(_) => {
                self.walk_compound(id, scope)?;
                Ok(scope)
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.type_expr(cond, scope)?;
                self.scope_before.insert(then_branch, scope);
                self.walk_compound(then_branch, scope)?;
                if else_branch.is_valid() {
                    self.scope_before.insert(else_branch, scope);
                    self.walk_stmt(else_branch, scope)?;
                }
                Ok(scope)
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                let mut inner = scope;
                if init.is_valid() {
                    self.scope_before.insert(init, inner);
                    inner = self.walk_stmt(init, inner)?;
                }
                if cond.is_valid() {
                    self.type_expr(cond, inner)?;
                }
                if update.is_valid() {
                    self.scope_before.insert(update, inner);
                    self.walk_stmt(update, inner)?;
                }
                self.scope_before.insert(body, inner);
                self.walk_compound(body, inner)?;
                Ok(scope)
            }
            StmtKind::While { cond, body } => {
                self.type_expr(cond, scope)?;
                self.scope_before.insert(body, scope);
                self.walk_compound(body, scope)?;
                Ok(scope)
            }
            StmtKind::Loop { body, continuing } => {
                self.scope_before.insert(body, scope);
                self.walk_compound(body, scope)?;
                if continuing.is_valid() {
                    // Declarations in the loop body are visible in the
                    // continuing block.
                    let at_end = self
                        .compound_scopes
                        .get(&body)
                        .and_then(|offsets| offsets.last().copied())
                        .ok_or(ResolveError::Inconsistent("loop body not resolved"))?;
                    self.scope_before.insert(continuing, at_end);
                    self.walk_compound(continuing, at_end)?;
                }
                Ok(scope)
            }
            StmtKind::Switch { subject, cases } => {
                self.type_expr(subject, scope)?;
                for case in self.arena.case_list(cases).to_vec() {
                    for &selector in self.arena.expr_list(case.selectors).to_vec().iter() {
                        self.type_expr(selector, scope)?;
                    }
                    self.scope_before.insert(case.body, scope);
                    self.walk_compound(case.body, scope)?;
                }
                Ok(scope)
            }
            StmtKind::Return(value) => {
                if value.is_valid() {
                    self.type_expr(value, scope)?;
                }
                Ok(scope)
            }
            StmtKind::BreakIf(cond) | StmtKind::ConstAssert(cond) => {
                self.type_expr(cond, scope)?;
                Ok(scope)
            }
            StmtKind::Assignment { lhs, rhs, .. } => {
                if lhs.is_valid() {
                    self.type_lhs(lhs, scope)?;
                }
                self.type_expr(rhs, scope)?;
                Ok(scope)
            }
            StmtKind::Variable {
                kind,
                name,
                ty,
                init,
            } => {
                let init_ty = if init.is_valid() {
                    Some(self.type_expr(init, scope)?)
                } else {
                    None
                };
                let value_ty = if ty.is_valid() {
                    self.resolve_ty(ty)?
                } else {
                    let inferred =
                        init_ty.ok_or(ResolveError::Inconsistent("var without type or init"))?;
                    self.pool.concretize(inferred)
                };
                let entry_kind = match kind {
                    morph_ast::LocalKind::Var => EntryKind::LocalVar,
                    morph_ast::LocalKind::Let => EntryKind::LocalLet,
                };
                Ok(self.scopes.push(
                    scope,
                    ScopeEntry {
                        name,
                        ty: value_ty,
                        kind: entry_kind,
                        access: AccessMode::ReadWrite,
                        decl: id,
                    },
                ))
            }
            StmtKind::Value { name, ty, init } => {
                let init_ty = if init.is_valid() {
                    Some(self.type_expr(init, scope)?)
                } else {
                    None
                };
                let value_ty = if ty.is_valid() {
                    self.resolve_ty(ty)?
                } else {
                    let inferred =
                        init_ty.ok_or(ResolveError::Inconsistent("const without type or init"))?;
                    self.pool.concretize(inferred)
                };
                Ok(self.scopes.push(
                    scope,
                    ScopeEntry {
                        name,
                        ty: value_ty,
                        kind: EntryKind::LocalConst,
                        access: AccessMode::Read,
                        decl: id,
                    },
                ))
            }
            StmtKind::FunctionCall { callee, args } => {
                let arg_ids = self.arena.expr_list(args).to_vec();
                let mut arg_types = Vec::with_capacity(arg_ids.len());
                for arg in arg_ids {
                    arg_types.push(self.type_expr(arg, scope)?);
                }
                self.record_call(callee, &arg_types)?;
                Ok(scope)
            }
            StmtKind::Increment(lhs) | StmtKind::Decrement(lhs) => {
                self.type_lhs(lhs, scope)?;
                Ok(scope)
            }
            StmtKind::DeadCodeFragment(inner)
            | StmtKind::ControlFlowWrapper { inner, .. }
            | StmtKind::ControlFlowWrapReturn { inner, .. } => {
                self.scope_before.insert(inner, scope);
                self.walk_stmt(inner, scope)?;
                Ok(scope)
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Discard | StmtKind::Empty => Ok(scope),
        }
    }

    fn record_call(&mut self, callee: Name, args: &[Idx]) -> Result<Idx, ResolveError> {
        if let Some(sig) = self.functions.get(&callee) {
            let ret = sig.ret;
            self.calls
                .entry(self.current_function)
                .or_default()
                .insert(callee);
            Ok(ret)
        } else {
            builtin_return_type(self.pool, self.interner.lookup(callee), args)
        }
    }

    fn type_expr(&mut self, id: ExprId, scope: ScopeId) -> Result<Idx, ResolveError> {
        if let Some(&ty) = self.types.get(&id) {
            return Ok(ty);
        }
        let ty = self.compute_expr_type(id, scope)?;
        self.types.insert(id, ty);
        Ok(ty)
    }

    fn compute_expr_type(&mut self, id: ExprId, scope: ScopeId) -> Result<Idx, ResolveError> {
        match self.arena.expr(id) {
            ExprKind::Ident(name) => self
                .scopes
                .entry(scope, name)
                .map(|entry| entry.ty)
                .ok_or_else(|| {
                    ResolveError::UnknownIdent(self.interner.lookup(name).to_owned())
                }),
            ExprKind::BoolLit(_) => Ok(Idx::BOOL),
            ExprKind::IntLit { suffix, .. } => Ok(match suffix {
                morph_ast::IntSuffix::I => Idx::I32,
                morph_ast::IntSuffix::U => Idx::U32,
                morph_ast::IntSuffix::None => Idx::ABSTRACT_INT,
            }),
            ExprKind::FloatLit { suffix, .. } => Ok(match suffix {
                morph_ast::FloatSuffix::F => Idx::F32,
                morph_ast::FloatSuffix::H => Idx::F16,
                morph_ast::FloatSuffix::None => Idx::ABSTRACT_FLOAT,
            }),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Negate | UnaryOp::BitNot | UnaryOp::Not => {
                    self.type_expr(operand, scope)
                }
                UnaryOp::AddressOf => {
                    let elem = self.type_expr(operand, scope)?;
                    let root = self.expr_root_ident(operand)?;
                    let entry = self.scopes.entry(scope, root).ok_or_else(|| {
                        ResolveError::UnknownIdent(self.interner.lookup(root).to_owned())
                    })?;
                    let space = match entry.kind {
                        EntryKind::GlobalVar(space) => space,
                        _ => AddressSpace::Function,
                    };
                    self.aliased
                        .entry(self.current_function)
                        .or_default()
                        .insert(root);
                    Ok(self.pool.intern(TypeKind::Pointer {
                        space,
                        elem,
                        access: entry.access,
                    }))
                }
                UnaryOp::Deref => {
                    let pointer = self.type_expr(operand, scope)?;
                    match self.pool.kind(pointer) {
                        TypeKind::Pointer { elem, .. } => Ok(elem),
                        _ => Err(ResolveError::OperatorMismatch { op: "*" }),
                    }
                }
            },
            ExprKind::Binary { op, left, right } => {
                let lhs = self.type_expr(left, scope)?;
                let rhs = self.type_expr(right, scope)?;
                self.binary_type(op, lhs, rhs)
            }
            ExprKind::Paren(inner)
            | ExprKind::ArbitraryExpression(inner) => self.type_expr(inner, scope),
            ExprKind::TrueByConstruction(inner) | ExprKind::FalseByConstruction(inner) => {
                let inner_ty = self.type_expr(inner, scope)?;
                if inner_ty == Idx::BOOL {
                    Ok(Idx::BOOL)
                } else {
                    Err(ResolveError::Inconsistent(
                        "by-construction wrapper around non-bool",
                    ))
                }
            }
            ExprKind::KnownValue { expr, value } => {
                self.type_expr(value, scope)?;
                self.type_expr(expr, scope)
            }
            ExprKind::IdentityOperation { replacement, .. } => {
                self.type_expr(replacement, scope)
            }
            ExprKind::FunctionCall { callee, args } => {
                let arg_ids = self.arena.expr_list(args).to_vec();
                let mut arg_types = Vec::with_capacity(arg_ids.len());
                for arg in arg_ids {
                    arg_types.push(self.type_expr(arg, scope)?);
                }
                let ret = self.record_call(callee, &arg_types)?;
                if ret.is_some() {
                    Ok(ret)
                } else {
                    Err(ResolveError::Inconsistent("void call in value position"))
                }
            }
            ExprKind::ScalarConstructor { ty, args }
            | ExprKind::StructConstructor { ty, args } => {
                for &arg in &self.arena.expr_list(args).to_vec() {
                    self.type_expr(arg, scope)?;
                }
                self.resolve_ty(ty)
            }
            ExprKind::VectorConstructor { ty, args } => {
                let arg_ids = self.arena.expr_list(args).to_vec();
                let mut arg_types = Vec::with_capacity(arg_ids.len());
                for arg in arg_ids {
                    arg_types.push(self.type_expr(arg, scope)?);
                }
                if ty.is_valid() {
                    self.resolve_ty(ty)
                } else {
                    self.infer_vector(&arg_types)
                }
            }
            ExprKind::MatrixConstructor { ty, args } => {
                for &arg in &self.arena.expr_list(args).to_vec() {
                    self.type_expr(arg, scope)?;
                }
                self.resolve_ty(ty)
            }
            ExprKind::ArrayConstructor { ty, args } => {
                let arg_ids = self.arena.expr_list(args).to_vec();
                let mut arg_types = Vec::with_capacity(arg_ids.len());
                for arg in arg_ids {
                    arg_types.push(self.type_expr(arg, scope)?);
                }
                if ty.is_valid() {
                    self.resolve_ty(ty)
                } else {
                    let elem = arg_types
                        .first()
                        .copied()
                        .ok_or(ResolveError::Inconsistent("empty inferred array"))?;
                    let elem = self.pool.concretize(elem);
                    let count = u32::try_from(arg_types.len())
                        .map_err(|_| ResolveError::Inconsistent("array too long"))?;
                    Ok(self.pool.array(elem, Some(count)))
                }
            }
            ExprKind::IndexLookup { receiver, index } => {
                let recv = self.type_expr(receiver, scope)?;
                self.type_expr(index, scope)?;
                match self.pool.kind(recv) {
                    TypeKind::Array { elem, .. } | TypeKind::Vector { elem, .. } => Ok(elem),
                    TypeKind::Matrix { rows, elem, .. } => Ok(self.pool.vector(rows, elem)),
                    _ => Err(ResolveError::BadIndexLookup),
                }
            }
            ExprKind::MemberLookup { receiver, member } => {
                let recv = self.type_expr(receiver, scope)?;
                self.member_type(recv, member)
            }
        }
    }

    fn infer_vector(&mut self, args: &[Idx]) -> Result<Idx, ResolveError> {
        let elem = args
            .first()
            .copied()
            .ok_or(ResolveError::Inconsistent("empty inferred vector"))?;
        let elem = self.pool.concretize(elem);
        let size = morph_ast::VecSize::from_u32(
            u32::try_from(args.len())
                .map_err(|_| ResolveError::Inconsistent("vector arity"))?,
        )
        .ok_or(ResolveError::Inconsistent("vector arity"))?;
        Ok(self.pool.vector(size, elem))
    }

    fn member_type(&mut self, receiver: Idx, member: Name) -> Result<Idx, ResolveError> {
        match self.pool.kind(receiver) {
            TypeKind::Struct { name } => {
                let fields = self
                    .pool
                    .fields_of(name)
                    .ok_or(ResolveError::Inconsistent("unregistered struct"))?;
                fields
                    .iter()
                    .find(|field| field.name == member)
                    .map(|field| field.ty)
                    .ok_or_else(|| {
                        ResolveError::BadMemberLookup(self.interner.lookup(member).to_owned())
                    })
            }
            TypeKind::Vector { elem, .. } => {
                let text = self.interner.lookup(member);
                let is_swizzle = !text.is_empty()
                    && (text.chars().all(|c| "xyzw".contains(c))
                        || text.chars().all(|c| "rgba".contains(c)));
                if !is_swizzle || text.len() > 4 {
                    return Err(ResolveError::BadMemberLookup(text.to_owned()));
                }
                if text.len() == 1 {
                    Ok(elem)
                } else {
                    let size = morph_ast::VecSize::from_u32(text.len() as u32)
                        .ok_or_else(|| ResolveError::BadMemberLookup(text.to_owned()))?;
                    Ok(self.pool.vector(size, elem))
                }
            }
            _ => Err(ResolveError::BadMemberLookup(
                self.interner.lookup(member).to_owned(),
            )),
        }
    }

    fn binary_type(
        &mut self,
        op: morph_ast::BinaryOp,
        lhs: Idx,
        rhs: Idx,
    ) -> Result<Idx, ResolveError> {
        use morph_ast::BinaryOp;
        if op.is_comparison() {
            return match self.pool.kind(lhs) {
                TypeKind::Vector { size, .. } => Ok(self.pool.vector(size, Idx::BOOL)),
                _ => Ok(Idx::BOOL),
            };
        }
        match op {
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => Ok(Idx::BOOL),
            BinaryOp::ShiftLeft | BinaryOp::ShiftRight => Ok(self.pool.concretize(lhs)),
            _ => self.unify_numeric(lhs, rhs, op.symbol()),
        }
    }

    fn unify_numeric(
        &mut self,
        lhs: Idx,
        rhs: Idx,
        op: &'static str,
    ) -> Result<Idx, ResolveError> {
        if lhs == rhs {
            return Ok(lhs);
        }
        let lhs_kind = self.pool.kind(lhs);
        let rhs_kind = self.pool.kind(rhs);
        match (lhs_kind, rhs_kind) {
            // Abstract leaning on a concrete partner.
            (TypeKind::Scalar(a), TypeKind::Scalar(b)) => {
                match (a, b) {
                    (ScalarKind::AbstractInt, _) if b.is_integer() || b.is_float() => Ok(rhs),
                    (_, ScalarKind::AbstractInt) if a.is_integer() || a.is_float() => Ok(lhs),
                    (ScalarKind::AbstractFloat, _) if b.is_float() => Ok(rhs),
                    (_, ScalarKind::AbstractFloat) if a.is_float() => Ok(lhs),
                    _ => Err(ResolveError::OperatorMismatch { op }),
                }
            }
            // Component-wise vector/scalar forms.
            (TypeKind::Vector { size, elem }, TypeKind::Scalar(_)) => {
                let elem = self.unify_numeric(elem, rhs, op)?;
                Ok(self.pool.vector(size, elem))
            }
            (TypeKind::Scalar(_), TypeKind::Vector { size, elem }) => {
                let elem = self.unify_numeric(lhs, elem, op)?;
                Ok(self.pool.vector(size, elem))
            }
            (TypeKind::Vector { size: ls, elem: le }, TypeKind::Vector { size: rs, elem: re })
                if ls == rs =>
            {
                let elem = self.unify_numeric(le, re, op)?;
                Ok(self.pool.vector(ls, elem))
            }
            // Matrix algebra.
            (TypeKind::Matrix { .. }, TypeKind::Scalar(_)) => Ok(lhs),
            (TypeKind::Scalar(_), TypeKind::Matrix { .. }) => Ok(rhs),
            (TypeKind::Matrix { cols, rows, elem }, TypeKind::Vector { size, .. })
                if cols == size =>
            {
                Ok(self.pool.vector(rows, elem))
            }
            (TypeKind::Vector { size, .. }, TypeKind::Matrix { cols, rows, elem })
                if rows == size =>
            {
                Ok(self.pool.vector(cols, elem))
            }
            (TypeKind::Matrix { rows, elem, .. }, TypeKind::Matrix { cols, .. }) => {
                Ok(self.pool.matrix(cols, rows, elem))
            }
            _ => Err(ResolveError::OperatorMismatch { op }),
        }
    }

    fn type_lhs(&mut self, id: morph_ast::LhsId, scope: ScopeId) -> Result<Idx, ResolveError> {
        match self.arena.lhs(id) {
            LhsExprKind::Ident(name) => {
                self.scopes
                    .entry(scope, name)
                    .map(|entry| entry.ty)
                    .ok_or_else(|| {
                        ResolveError::UnknownIdent(self.interner.lookup(name).to_owned())
                    })
            }
            LhsExprKind::IndexLookup { receiver, index } => {
                let recv = self.type_lhs(receiver, scope)?;
                self.type_expr(index, scope)?;
                match self.pool.kind(recv) {
                    TypeKind::Array { elem, .. } | TypeKind::Vector { elem, .. } => Ok(elem),
                    TypeKind::Matrix { rows, elem, .. } => Ok(self.pool.vector(rows, elem)),
                    _ => Err(ResolveError::BadIndexLookup),
                }
            }
            LhsExprKind::MemberLookup { receiver, member } => {
                let recv = self.type_lhs(receiver, scope)?;
                self.member_type(recv, member)
            }
            LhsExprKind::Paren(inner) => self.type_lhs(inner, scope),
            LhsExprKind::Deref(inner) => {
                let pointer = self.type_lhs(inner, scope)?;
                match self.pool.kind(pointer) {
                    TypeKind::Pointer { elem, .. } => Ok(elem),
                    _ => Err(ResolveError::OperatorMismatch { op: "*" }),
                }
            }
            LhsExprKind::AddressOf(inner) => {
                if let Some(root) = self.lhs_root_ident(inner) {
                    self.aliased
                        .entry(self.current_function)
                        .or_default()
                        .insert(root);
                }
                let elem = self.type_lhs(inner, scope)?;
                Ok(self.pool.intern(TypeKind::Pointer {
                    space: AddressSpace::Function,
                    elem,
                    access: AccessMode::ReadWrite,
                }))
            }
        }
    }

    /// The root identifier of an access chain expression.
    fn expr_root_ident(&self, mut id: ExprId) -> Result<Name, ResolveError> {
        loop {
            match self.arena.expr(id) {
                ExprKind::Ident(name) => return Ok(name),
                ExprKind::IndexLookup { receiver, .. }
                | ExprKind::MemberLookup { receiver, .. } => id = receiver,
                ExprKind::Paren(inner) | ExprKind::Unary { operand: inner, .. } => id = inner,
                _ => {
                    return Err(ResolveError::Inconsistent(
                        "address-of target is not an access chain",
                    ))
                }
            }
        }
    }

    fn lhs_root_ident(&self, mut id: morph_ast::LhsId) -> Option<Name> {
        loop {
            match self.arena.lhs(id) {
                LhsExprKind::Ident(name) => return Some(name),
                LhsExprKind::IndexLookup { receiver, .. }
                | LhsExprKind::MemberLookup { receiver, .. }
                | LhsExprKind::Paren(receiver)
                | LhsExprKind::Deref(receiver)
                | LhsExprKind::AddressOf(receiver) => id = receiver,
            }
        }
    }

    fn resolve_ty(&mut self, ty: TyId) -> Result<Idx, ResolveError> {
        if !ty.is_valid() {
            return Err(ResolveError::Inconsistent("unresolvable invalid type"));
        }
        match self.arena.ty(ty) {
            TypeDecl::Named(name) => {
                match self.interner.lookup(name) {
                    "bool" => Ok(Idx::BOOL),
                    "i32" => Ok(Idx::I32),
                    "u32" => Ok(Idx::U32),
                    "f16" => Ok(Idx::F16),
                    "f32" => Ok(Idx::F32),
                    other => self
                        .structs
                        .get(&name)
                        .or_else(|| self.aliases.get(&name))
                        .copied()
                        .ok_or_else(|| ResolveError::UnknownType(other.to_owned())),
                }
            }
            TypeDecl::Vector { size, elem } => {
                let elem = self.resolve_ty(elem)?;
                Ok(self.pool.vector(size, elem))
            }
            TypeDecl::Matrix { cols, rows, elem } => {
                let elem = self.resolve_ty(elem)?;
                Ok(self.pool.matrix(cols, rows, elem))
            }
            TypeDecl::Array { elem, count } => {
                let elem = self.resolve_ty(elem)?;
                let count = if count.is_valid() {
                    match self.arena.expr(count) {
                        ExprKind::IntLit { value, .. } if value > 0 => {
                            Some(u32::try_from(value).map_err(|_| {
                                ResolveError::Inconsistent("array size out of range")
                            })?)
                        }
                        _ => {
                            return Err(ResolveError::Inconsistent(
                                "array size must be an integer literal",
                            ))
                        }
                    }
                } else {
                    None
                };
                Ok(self.pool.array(elem, count))
            }
            TypeDecl::Pointer {
                space,
                elem,
                access,
            } => {
                let elem = self.resolve_ty(elem)?;
                let access = access.unwrap_or(match space {
                    AddressSpace::Uniform | AddressSpace::Storage => AccessMode::Read,
                    _ => AccessMode::ReadWrite,
                });
                Ok(self.pool.intern(TypeKind::Pointer {
                    space,
                    elem,
                    access,
                }))
            }
            TypeDecl::Atomic { elem } => {
                let elem = self.resolve_ty(elem)?;
                Ok(self.pool.intern(TypeKind::Atomic { elem }))
            }
        }
    }

    /// Functions reachable from `@fragment` entry points via the call graph.
    fn fragment_reachable(&self, module: &Module) -> FxHashSet<Name> {
        let mut reachable = FxHashSet::default();
        let mut worklist: Vec<Name> = module
            .functions()
            .filter(|function| function.stage() == Some(ShaderStage::Fragment))
            .map(|function| function.name)
            .collect();
        while let Some(name) = worklist.pop() {
            if !reachable.insert(name) {
                continue;
            }
            if let Some(callees) = self.calls.get(&name) {
                worklist.extend(callees.iter().copied());
            }
        }
        reachable
    }
}
