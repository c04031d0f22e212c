//! Module-to-WGSL writer.
//!
//! Augmented nodes print as their runtime form: a `KnownValue` prints its
//! opaque expression, a `DeadCodeFragment` or control-flow wrapper prints
//! its inner statement. The proof/metadata halves never reach the output.
//!
//! Nested operator expressions are parenthesized unconditionally, which
//! sidesteps WGSL's template-list and mixed-operator grammar restrictions;
//! generated code is paren-heavy by construction anyway.

use morph_ast::{
    AttrKind, Attribute, ExprId, ExprKind, FloatSuffix, Function, GlobalDecl, GlobalValue,
    GlobalValueKind, GlobalVar, IntSuffix, LhsExprKind, LhsId, Module, ModuleArena, Param,
    StmtId, StmtKind, StringInterner, StructDecl, TyId, TypeAlias, TypeDecl,
};

use crate::emitter::StringEmitter;

/// Print a module as WGSL source.
pub fn write_module(module: &Module, arena: &ModuleArena, interner: &StringInterner) -> String {
    let mut writer = Writer {
        arena,
        interner,
        out: StringEmitter::new(),
        indent: 0,
    };
    for decl in &module.decls {
        writer.global(decl);
    }
    writer.out.ensure_trailing_newline();
    writer.out.output()
}

struct Writer<'a> {
    arena: &'a ModuleArena,
    interner: &'a StringInterner,
    out: StringEmitter,
    indent: usize,
}

impl Writer<'_> {
    fn name(&mut self, name: morph_ast::Name) {
        let text = self.interner.lookup(name).to_owned();
        self.out.emit(&text);
    }

    fn global(&mut self, decl: &GlobalDecl) {
        match decl {
            GlobalDecl::Function(function) => self.function(function),
            GlobalDecl::Variable(var) => self.global_var(var),
            GlobalDecl::Struct(struct_decl) => self.struct_decl(struct_decl),
            GlobalDecl::TypeAlias(alias) => self.type_alias(alias),
            GlobalDecl::Value(value) => self.global_value(value),
            GlobalDecl::ConstAssert(expr) => {
                self.out.emit("const_assert ");
                self.expr(*expr);
                self.out.emit(";");
                self.out.emit_newline();
                self.out.emit_newline();
            }
            GlobalDecl::Empty => {
                self.out.emit(";");
                self.out.emit_newline();
            }
        }
    }

    fn attributes(&mut self, attrs: &[Attribute], trailing_space: bool) {
        for (i, attr) in attrs.iter().enumerate() {
            if i > 0 {
                self.out.emit_space();
            }
            self.out.emit("@");
            self.out.emit(attr.kind.keyword());
            if let AttrKind::Builtin(value) = attr.kind {
                self.out.emit("(");
                self.out.emit(value.keyword());
                self.out.emit(")");
            } else if !attr.args.is_empty() {
                self.out.emit("(");
                let args = self.arena.expr_list(attr.args).to_vec();
                for (j, arg) in args.into_iter().enumerate() {
                    if j > 0 {
                        self.out.emit(", ");
                    }
                    self.expr(arg);
                }
                self.out.emit(")");
            }
        }
        if trailing_space && !attrs.is_empty() {
            self.out.emit_space();
        }
    }

    fn function(&mut self, function: &Function) {
        if !function.attrs.is_empty() {
            self.attributes(&function.attrs, false);
            self.out.emit_newline();
        }
        self.out.emit("fn ");
        self.name(function.name);
        self.out.emit("(");
        for (i, param) in function.params.iter().enumerate() {
            if i > 0 {
                self.out.emit(", ");
            }
            self.param(param);
        }
        self.out.emit(")");
        if function.ret_ty.is_valid() {
            self.out.emit(" -> ");
            self.attributes(&function.ret_attrs, true);
            self.ty(function.ret_ty);
        }
        self.out.emit_space();
        self.stmt_inline_compound(function.body);
        self.out.emit_newline();
        self.out.emit_newline();
    }

    fn param(&mut self, param: &Param) {
        self.attributes(&param.attrs, true);
        self.name(param.name);
        self.out.emit(": ");
        self.ty(param.ty);
    }

    fn global_var(&mut self, var: &GlobalVar) {
        self.attributes(&var.attrs, true);
        self.out.emit("var");
        match var.space {
            morph_ast::AddressSpace::Private => {}
            space => {
                self.out.emit("<");
                self.out.emit(space.keyword());
                if let Some(access) = var.access {
                    self.out.emit(", ");
                    self.out.emit(access.keyword());
                }
                self.out.emit(">");
            }
        }
        self.out.emit_space();
        self.name(var.name);
        self.out.emit(": ");
        self.ty(var.ty);
        if var.init.is_valid() {
            self.out.emit(" = ");
            self.expr(var.init);
        }
        self.out.emit(";");
        self.out.emit_newline();
        self.out.emit_newline();
    }

    fn struct_decl(&mut self, struct_decl: &StructDecl) {
        self.out.emit("struct ");
        self.name(struct_decl.name);
        self.out.emit(" {");
        self.out.emit_newline();
        for member in &struct_decl.members {
            self.out.emit_indent(1);
            self.attributes(&member.attrs, true);
            self.name(member.name);
            self.out.emit(": ");
            self.ty(member.ty);
            self.out.emit(",");
            self.out.emit_newline();
        }
        self.out.emit("}");
        self.out.emit_newline();
        self.out.emit_newline();
    }

    fn type_alias(&mut self, alias: &TypeAlias) {
        self.out.emit("alias ");
        self.name(alias.name);
        self.out.emit(" = ");
        self.ty(alias.ty);
        self.out.emit(";");
        self.out.emit_newline();
        self.out.emit_newline();
    }

    fn global_value(&mut self, value: &GlobalValue) {
        self.out.emit(match value.kind {
            GlobalValueKind::Const => "const ",
            GlobalValueKind::Override => "override ",
        });
        self.name(value.name);
        if value.ty.is_valid() {
            self.out.emit(": ");
            self.ty(value.ty);
        }
        if value.init.is_valid() {
            self.out.emit(" = ");
            self.expr(value.init);
        }
        self.out.emit(";");
        self.out.emit_newline();
        self.out.emit_newline();
    }

    fn ty(&mut self, id: TyId) {
        match self.arena.ty(id) {
            TypeDecl::Named(name) => self.name(name),
            TypeDecl::Vector { size, elem } => {
                self.out.emit(match size.as_u32() {
                    2 => "vec2<",
                    3 => "vec3<",
                    _ => "vec4<",
                });
                self.ty(elem);
                self.out.emit(">");
            }
            TypeDecl::Matrix { cols, rows, elem } => {
                let head = format!("mat{}x{}<", cols.as_u32(), rows.as_u32());
                self.out.emit(&head);
                self.ty(elem);
                self.out.emit(">");
            }
            TypeDecl::Array { elem, count } => {
                self.out.emit("array<");
                self.ty(elem);
                if count.is_valid() {
                    self.out.emit(", ");
                    self.expr(count);
                }
                self.out.emit(">");
            }
            TypeDecl::Pointer {
                space,
                elem,
                access,
            } => {
                self.out.emit("ptr<");
                self.out.emit(space.keyword());
                self.out.emit(", ");
                self.ty(elem);
                if let Some(access) = access {
                    self.out.emit(", ");
                    self.out.emit(access.keyword());
                }
                self.out.emit(">");
            }
            TypeDecl::Atomic { elem } => {
                self.out.emit("atomic<");
                self.ty(elem);
                self.out.emit(">");
            }
        }
    }

    /// Print a compound statement starting on the current line.
    fn stmt_inline_compound(&mut self, id: StmtId) {
        match self.arena.stmt(id) {
            StmtKind::Compound(range) => {
                let children = self.arena.stmt_list(range).to_vec();
                if children.is_empty() {
                    self.out.emit("{");
                    self.out.emit_newline();
                    self.out.emit_indent(self.indent);
                    self.out.emit("}");
                    return;
                }
                self.out.emit("{");
                self.out.emit_newline();
                self.indent += 1;
                for child in children {
                    self.stmt(child);
                }
                self.indent -= 1;
                self.out.emit_indent(self.indent);
                self.out.emit("}");
            }
            // Dead/wrapper markers around a compound are transparent.
            StmtKind::DeadCodeFragment(inner)
            | StmtKind::ControlFlowWrapper { inner, .. }
            | StmtKind::ControlFlowWrapReturn { inner, .. } => self.stmt_inline_compound(inner),
            _ => {
                // A non-compound where a block is required is a printer
                // contract violation; emit a block around it to stay valid.
                self.out.emit("{");
                self.out.emit_newline();
                self.indent += 1;
                self.stmt(id);
                self.indent -= 1;
                self.out.emit_indent(self.indent);
                self.out.emit("}");
            }
        }
    }

    /// Print a statement on its own line(s).
    fn stmt(&mut self, id: StmtId) {
        match self.arena.stmt(id) {
            StmtKind::DeadCodeFragment(inner)
            | StmtKind::ControlFlowWrapper { inner, .. }
            | StmtKind::ControlFlowWrapReturn { inner, .. } => {
                self.stmt(inner);
                return;
            }
            _ => {}
        }
        self.out.emit_indent(self.indent);
        match self.arena.stmt(id) {
            StmtKind::Compound(_) => {
                self.stmt_inline_compound(id);
                self.out.emit_newline();
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.out.emit("if (");
                self.expr(cond);
                self.out.emit(") ");
                self.stmt_inline_compound(then_branch);
                self.else_chain(else_branch);
                self.out.emit_newline();
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.out.emit("for (");
                if init.is_valid() {
                    self.stmt_header(init);
                }
                self.out.emit("; ");
                if cond.is_valid() {
                    self.expr(cond);
                }
                self.out.emit("; ");
                if update.is_valid() {
                    self.stmt_header(update);
                }
                self.out.emit(") ");
                self.stmt_inline_compound(body);
                self.out.emit_newline();
            }
            StmtKind::While { cond, body } => {
                self.out.emit("while (");
                self.expr(cond);
                self.out.emit(") ");
                self.stmt_inline_compound(body);
                self.out.emit_newline();
            }
            StmtKind::Loop { body, continuing } => {
                self.out.emit("loop {");
                self.out.emit_newline();
                self.indent += 1;
                if let StmtKind::Compound(range) = self.arena.stmt(body) {
                    for child in self.arena.stmt_list(range).to_vec() {
                        self.stmt(child);
                    }
                }
                if continuing.is_valid() {
                    self.out.emit_indent(self.indent);
                    self.out.emit("continuing ");
                    self.stmt_inline_compound(continuing);
                    self.out.emit_newline();
                }
                self.indent -= 1;
                self.out.emit_indent(self.indent);
                self.out.emit("}");
                self.out.emit_newline();
            }
            StmtKind::Switch { subject, cases } => {
                self.out.emit("switch (");
                self.expr(subject);
                self.out.emit(") {");
                self.out.emit_newline();
                self.indent += 1;
                for case in self.arena.case_list(cases).to_vec() {
                    self.out.emit_indent(self.indent);
                    let selectors = self.arena.expr_list(case.selectors).to_vec();
                    if selectors.is_empty() && case.has_default {
                        self.out.emit("default ");
                    } else {
                        self.out.emit("case ");
                        for (i, selector) in selectors.into_iter().enumerate() {
                            if i > 0 {
                                self.out.emit(", ");
                            }
                            self.expr(selector);
                        }
                        if case.has_default {
                            self.out.emit(", default");
                        }
                        self.out.emit_space();
                    }
                    self.stmt_inline_compound(case.body);
                    self.out.emit_newline();
                }
                self.indent -= 1;
                self.out.emit_indent(self.indent);
                self.out.emit("}");
                self.out.emit_newline();
            }
            StmtKind::Return(value) => {
                self.out.emit("return");
                if value.is_valid() {
                    self.out.emit_space();
                    self.expr(value);
                }
                self.out.emit(";");
                self.out.emit_newline();
            }
            StmtKind::Break => {
                self.out.emit("break;");
                self.out.emit_newline();
            }
            StmtKind::Continue => {
                self.out.emit("continue;");
                self.out.emit_newline();
            }
            StmtKind::BreakIf(cond) => {
                self.out.emit("break if ");
                self.expr(cond);
                self.out.emit(";");
                self.out.emit_newline();
            }
            StmtKind::Discard => {
                self.out.emit("discard;");
                self.out.emit_newline();
            }
            StmtKind::Assignment { .. }
            | StmtKind::Variable { .. }
            | StmtKind::Value { .. }
            | StmtKind::FunctionCall { .. }
            | StmtKind::Increment(_)
            | StmtKind::Decrement(_) => {
                self.stmt_header(id);
                self.out.emit(";");
                self.out.emit_newline();
            }
            StmtKind::ConstAssert(expr) => {
                self.out.emit("const_assert ");
                self.expr(expr);
                self.out.emit(";");
                self.out.emit_newline();
            }
            StmtKind::Empty => {
                self.out.emit(";");
                self.out.emit_newline();
            }
            StmtKind::DeadCodeFragment(_)
            | StmtKind::ControlFlowWrapper { .. }
            | StmtKind::ControlFlowWrapReturn { .. } => unreachable!("handled above"),
        }
    }

    fn else_chain(&mut self, id: StmtId) {
        if !id.is_valid() {
            return;
        }
        self.out.emit(" else ");
        match self.arena.stmt(id) {
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.out.emit("if (");
                self.expr(cond);
                self.out.emit(") ");
                self.stmt_inline_compound(then_branch);
                self.else_chain(else_branch);
            }
            _ => self.stmt_inline_compound(id),
        }
    }

    /// Print the headline form of a simple statement, without the trailing
    /// semicolon (shared by statement position and `for` headers).
    fn stmt_header(&mut self, id: StmtId) {
        match self.arena.stmt(id) {
            StmtKind::Assignment { lhs, op, rhs } => {
                if lhs.is_valid() {
                    self.lhs(lhs);
                } else {
                    self.out.emit("_");
                }
                self.out.emit_space();
                self.out.emit(op.symbol());
                self.out.emit_space();
                self.expr(rhs);
            }
            StmtKind::Variable {
                kind,
                name,
                ty,
                init,
            } => {
                self.out.emit(kind.keyword());
                self.out.emit_space();
                self.name(name);
                if ty.is_valid() {
                    self.out.emit(": ");
                    self.ty(ty);
                }
                if init.is_valid() {
                    self.out.emit(" = ");
                    self.expr(init);
                }
            }
            StmtKind::Value { name, ty, init } => {
                self.out.emit("const ");
                self.name(name);
                if ty.is_valid() {
                    self.out.emit(": ");
                    self.ty(ty);
                }
                if init.is_valid() {
                    self.out.emit(" = ");
                    self.expr(init);
                }
            }
            StmtKind::FunctionCall { callee, args } => {
                self.name(callee);
                self.call_args(args);
            }
            StmtKind::Increment(lhs) => {
                self.lhs(lhs);
                self.out.emit("++");
            }
            StmtKind::Decrement(lhs) => {
                self.lhs(lhs);
                self.out.emit("--");
            }
            _ => {}
        }
    }

    fn call_args(&mut self, args: morph_ast::ExprRange) {
        self.out.emit("(");
        let ids = self.arena.expr_list(args).to_vec();
        for (i, arg) in ids.into_iter().enumerate() {
            if i > 0 {
                self.out.emit(", ");
            }
            self.expr(arg);
        }
        self.out.emit(")");
    }

    fn expr(&mut self, id: ExprId) {
        match self.arena.expr(id) {
            ExprKind::Ident(name) => self.name(name),
            ExprKind::BoolLit(value) => self.out.emit(if value { "true" } else { "false" }),
            ExprKind::IntLit { value, suffix } => {
                let text = match suffix {
                    IntSuffix::I => format!("{value}i"),
                    IntSuffix::U => format!("{value}u"),
                    IntSuffix::None => format!("{value}"),
                };
                self.out.emit(&text);
            }
            ExprKind::FloatLit { bits, suffix } => {
                let value = f64::from_bits(bits);
                let mut text = format!("{value}");
                if !text.contains('.') && !text.contains('e') && !text.contains("inf") {
                    text.push_str(".0");
                }
                match suffix {
                    FloatSuffix::F => text.push('f'),
                    FloatSuffix::H => text.push('h'),
                    FloatSuffix::None => {}
                }
                self.out.emit(&text);
            }
            ExprKind::Unary { op, operand } => {
                self.out.emit(op.symbol());
                self.operand(operand);
            }
            ExprKind::Binary { op, left, right } => {
                self.operand(left);
                self.out.emit_space();
                self.out.emit(op.symbol());
                self.out.emit_space();
                self.operand(right);
            }
            ExprKind::Paren(inner) => {
                self.out.emit("(");
                self.expr(inner);
                self.out.emit(")");
            }
            ExprKind::FunctionCall { callee, args } => {
                self.name(callee);
                self.call_args(args);
            }
            ExprKind::ScalarConstructor { ty, args }
            | ExprKind::VectorConstructor { ty, args }
            | ExprKind::MatrixConstructor { ty, args }
            | ExprKind::ArrayConstructor { ty, args }
            | ExprKind::StructConstructor { ty, args } => {
                self.ty(ty);
                self.call_args(args);
            }
            ExprKind::IndexLookup { receiver, index } => {
                self.operand(receiver);
                self.out.emit("[");
                self.expr(index);
                self.out.emit("]");
            }
            ExprKind::MemberLookup { receiver, member } => {
                self.operand(receiver);
                self.out.emit(".");
                self.name(member);
            }
            // Augmented nodes print as their runtime form.
            ExprKind::KnownValue { expr, .. } => self.expr(expr),
            ExprKind::TrueByConstruction(inner)
            | ExprKind::FalseByConstruction(inner)
            | ExprKind::ArbitraryExpression(inner) => self.expr(inner),
            ExprKind::IdentityOperation { replacement, .. } => self.expr(replacement),
        }
    }

    /// Print an operand, parenthesizing nested operator expressions. This is
    /// deliberately conservative: WGSL restricts mixing of several operator
    /// families without parentheses.
    fn operand(&mut self, id: ExprId) {
        let needs_parens = matches!(
            self.resolve_augmented(id),
            ExprKind::Binary { .. } | ExprKind::Unary { .. }
        );
        if needs_parens {
            self.out.emit("(");
            self.expr(id);
            self.out.emit(")");
        } else {
            self.expr(id);
        }
    }

    /// Look through augmented wrappers to the runtime expression shape.
    fn resolve_augmented(&self, id: ExprId) -> ExprKind {
        match self.arena.expr(id) {
            ExprKind::KnownValue { expr, .. } => self.resolve_augmented(expr),
            ExprKind::TrueByConstruction(inner)
            | ExprKind::FalseByConstruction(inner)
            | ExprKind::ArbitraryExpression(inner) => self.resolve_augmented(inner),
            ExprKind::IdentityOperation { replacement, .. } => self.resolve_augmented(replacement),
            other => other,
        }
    }

    fn lhs(&mut self, id: LhsId) {
        match self.arena.lhs(id) {
            LhsExprKind::Ident(name) => self.name(name),
            LhsExprKind::IndexLookup { receiver, index } => {
                self.lhs(receiver);
                self.out.emit("[");
                self.expr(index);
                self.out.emit("]");
            }
            LhsExprKind::MemberLookup { receiver, member } => {
                self.lhs(receiver);
                self.out.emit(".");
                self.name(member);
            }
            LhsExprKind::Paren(inner) => {
                self.out.emit("(");
                self.lhs(inner);
                self.out.emit(")");
            }
            LhsExprKind::Deref(inner) => {
                self.out.emit("*");
                self.lhs(inner);
            }
            LhsExprKind::AddressOf(inner) => {
                self.out.emit("&");
                self.lhs(inner);
            }
        }
    }
}
