//! Shared test support: a fixture shader, and a tiny constant evaluator
//! used to check that every known-value expression actually evaluates to
//! its proven value.

use rustc_hash::FxHashMap;

use morph_ast::{
    AttrKind, Attribute, AddressSpace, ExprId, ExprKind, FloatSuffix, Function, GlobalDecl,
    GlobalVar, IntSuffix, LocalKind, Module, ModuleArena, Name, Param, StmtId, StmtKind,
    StringInterner, StructDecl, StructMember, TyId, TypeDecl, UnaryOp, VecSize,
};
use morph_resolve::{UniformState, UniformValue};

/// Mutable builder state for one test shader.
pub struct Fixture {
    pub interner: StringInterner,
    pub arena: ModuleArena,
}

impl Fixture {
    pub fn new() -> Self {
        Fixture {
            interner: StringInterner::new(),
            arena: ModuleArena::new(),
        }
    }

    pub fn name(&mut self, text: &str) -> Name {
        self.interner.intern(text)
    }

    pub fn named_ty(&mut self, text: &str) -> TyId {
        let name = self.name(text);
        self.arena.alloc_ty(TypeDecl::Named(name))
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.arena.alloc_expr(ExprKind::IntLit {
            value,
            suffix: IntSuffix::I,
        })
    }

    pub fn float(&mut self, value: f64) -> ExprId {
        self.arena.alloc_expr(ExprKind::FloatLit {
            bits: value.to_bits(),
            suffix: FloatSuffix::F,
        })
    }

    pub fn ident(&mut self, text: &str) -> ExprId {
        let name = self.name(text);
        self.arena.alloc_expr(ExprKind::Ident(name))
    }

    pub fn compound(&mut self, stmts: Vec<StmtId>) -> StmtId {
        let range = self.arena.alloc_stmt_list(stmts);
        self.arena.alloc_stmt(StmtKind::Compound(range))
    }

    pub fn attr(&mut self, kind: AttrKind, arg: i64) -> Attribute {
        let expr = self.arena.alloc_expr(ExprKind::IntLit {
            value: arg,
            suffix: IntSuffix::None,
        });
        let args = self.arena.alloc_expr_list([expr]);
        Attribute { kind, args }
    }

    pub fn let_stmt(&mut self, name: &str, init: ExprId) -> StmtId {
        let name = self.name(name);
        self.arena.alloc_stmt(StmtKind::Variable {
            kind: LocalKind::Let,
            name,
            ty: TyId::INVALID,
            init,
        })
    }

    pub fn var_stmt(&mut self, name: &str, ty: &str, init: ExprId) -> StmtId {
        let name = self.name(name);
        let ty = self.named_ty(ty);
        self.arena.alloc_stmt(StmtKind::Variable {
            kind: LocalKind::Var,
            name,
            ty,
            init,
        })
    }

    pub fn plain_fn(&mut self, name: &str, params: Vec<Param>, ret: TyId, body: StmtId) -> Function {
        Function {
            name: self.name(name),
            attrs: vec![],
            params,
            ret_ty: ret,
            ret_attrs: vec![],
            body,
        }
    }
}

/// `struct Params { a: i32, b: f32 }` plus the matching
/// `@group(0) @binding(0) var<uniform> params: Params;`, with a=5, b=2.5.
pub fn uniform_fixture(fx: &mut Fixture) -> (Vec<GlobalDecl>, UniformState) {
    let params_struct = fx.name("Params");
    let a = fx.name("a");
    let b = fx.name("b");
    let i32_ty = fx.named_ty("i32");
    let f32_ty = fx.named_ty("f32");
    let struct_decl = GlobalDecl::Struct(StructDecl {
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
    });
    let group = fx.attr(AttrKind::Group, 0);
    let binding = fx.attr(AttrKind::Binding, 0);
    let params_ty = fx.named_ty("Params");
    let var = GlobalDecl::Variable(GlobalVar {
        name: fx.name("params"),
        space: AddressSpace::Uniform,
        access: None,
        ty: params_ty,
        init: ExprId::INVALID,
        attrs: vec![group, binding],
    });

    let mut uniforms = UniformState::new();
    uniforms.insert(
        0,
        0,
        UniformValue::Composite(vec![UniformValue::Int(5), UniformValue::Float(2.5)]),
    );
    (vec![struct_decl, var], uniforms)
}

/// A fragment entry point `main` that reads the uniform and returns a
/// color, preceded by a helper it calls.
pub fn full_module(fx: &mut Fixture) -> (Module, UniformState) {
    let (mut decls, uniforms) = uniform_fixture(fx);

    // fn helper(x: i32) -> i32 { let y = x + 1i; return y; }
    let x_name = fx.name("x");
    let x_ref = fx.ident("x");
    let one = fx.int(1);
    let sum = fx.arena.alloc_expr(ExprKind::Binary {
        op: morph_ast::BinaryOp::Add,
        left: x_ref,
        right: one,
    });
    let let_y = fx.let_stmt("y", sum);
    let y_ref = fx.ident("y");
    let ret = fx.arena.alloc_stmt(StmtKind::Return(y_ref));
    let body = fx.compound(vec![let_y, ret]);
    let i32_ret = fx.named_ty("i32");
    let i32_param = fx.named_ty("i32");
    let helper = fx.plain_fn(
        "helper",
        vec![Param {
            name: x_name,
            ty: i32_param,
            attrs: vec![],
        }],
        i32_ret,
        body,
    );
    decls.push(GlobalDecl::Function(helper));

    // @fragment fn main() -> @location(0) vec4<f32> {
    //     var v: i32 = helper(params.a);
    //     v = v * 2i;
    //     return vec4<f32>(f32(v), 0.0f, 0.0f, 1.0f);
    // }
    let params_ref = fx.ident("params");
    let a = fx.name("a");
    let params_a = fx.arena.alloc_expr(ExprKind::MemberLookup {
        receiver: params_ref,
        member: a,
    });
    let helper_name = fx.name("helper");
    let call_args = fx.arena.alloc_expr_list([params_a]);
    let call = fx.arena.alloc_expr(ExprKind::FunctionCall {
        callee: helper_name,
        args: call_args,
    });
    let var_v = fx.var_stmt("v", "i32", call);

    let v_lhs = {
        let v = fx.name("v");
        fx.arena.alloc_lhs(morph_ast::LhsExprKind::Ident(v))
    };
    let v_ref = fx.ident("v");
    let two = fx.int(2);
    let doubled = fx.arena.alloc_expr(ExprKind::Binary {
        op: morph_ast::BinaryOp::Multiply,
        left: v_ref,
        right: two,
    });
    let assign = fx.arena.alloc_stmt(StmtKind::Assignment {
        lhs: v_lhs,
        op: morph_ast::AssignOp::Assign,
        rhs: doubled,
    });

    let v_ref2 = fx.ident("v");
    let f32_ty = fx.named_ty("f32");
    let cast_args = fx.arena.alloc_expr_list([v_ref2]);
    let v_as_f32 = fx.arena.alloc_expr(ExprKind::ScalarConstructor {
        ty: f32_ty,
        args: cast_args,
    });
    let zero_a = fx.float(0.0);
    let zero_b = fx.float(0.0);
    let one_f = fx.float(1.0);
    let f32_elem = fx.named_ty("f32");
    let vec4_ty = fx.arena.alloc_ty(TypeDecl::Vector {
        size: VecSize::Four,
        elem: f32_elem,
    });
    let color_args = fx
        .arena
        .alloc_expr_list([v_as_f32, zero_a, zero_b, one_f]);
    let color = fx.arena.alloc_expr(ExprKind::VectorConstructor {
        ty: vec4_ty,
        args: color_args,
    });
    let ret_color = fx.arena.alloc_stmt(StmtKind::Return(color));

    let main_body = fx.compound(vec![var_v, assign, ret_color]);
    let location = fx.attr(AttrKind::Location, 0);
    let f32_elem2 = fx.named_ty("f32");
    let vec4_ret = fx.arena.alloc_ty(TypeDecl::Vector {
        size: VecSize::Four,
        elem: f32_elem2,
    });
    let main = Function {
        name: fx.name("main"),
        attrs: vec![Attribute::marker(AttrKind::Fragment)],
        params: vec![],
        ret_ty: vec4_ret,
        ret_attrs: vec![location],
        body: main_body,
    };
    decls.push(GlobalDecl::Function(main));

    (Module { decls }, uniforms)
}

// Constant evaluator

/// An evaluated value.
#[derive(Clone, Debug)]
pub enum Val {
    Num(f64),
    Bool(bool),
    Tree(UniformValue),
}

impl Val {
    pub fn num(&self) -> f64 {
        match self {
            Val::Num(value) => *value,
            Val::Tree(tree) => tree.as_f64().expect("scalar uniform leaf"),
            Val::Bool(_) => panic!("expected a number, got a bool"),
        }
    }

    pub fn truth(&self) -> bool {
        match self {
            Val::Bool(value) => *value,
            _ => panic!("expected a bool"),
        }
    }
}

/// Evaluates the closed expression language the known-value engine emits,
/// resolving identifiers against uniform values. Every `KnownValue` and
/// by-construction wrapper encountered is CHECKED against its proof.
pub struct Evaluator<'a> {
    pub arena: &'a ModuleArena,
    pub interner: &'a StringInterner,
    /// Uniform variable name → bound value tree.
    pub roots: FxHashMap<Name, UniformValue>,
    /// Struct member name → member index (for member lookups on trees).
    pub fields: FxHashMap<Name, usize>,
}

impl Evaluator<'_> {
    pub fn eval(&self, id: ExprId) -> Val {
        match self.arena.expr(id) {
            ExprKind::Ident(name) => Val::Tree(
                self.roots
                    .get(&name)
                    .unwrap_or_else(|| {
                        panic!("unbound identifier `{}`", self.interner.lookup(name))
                    })
                    .clone(),
            ),
            ExprKind::BoolLit(value) => Val::Bool(value),
            ExprKind::IntLit { value, .. } => Val::Num(value as f64),
            ExprKind::FloatLit { bits, .. } => Val::Num(f64::from_bits(bits)),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => Val::Bool(!self.eval(operand).truth()),
                UnaryOp::Negate => Val::Num(-self.eval(operand).num()),
                other => panic!("evaluator does not model {other:?}"),
            },
            ExprKind::Binary { op, left, right } => self.eval_binary(op, left, right),
            ExprKind::Paren(inner) => self.eval(inner),
            ExprKind::FunctionCall { callee, args } => {
                let name = self.interner.lookup(callee);
                let args = self.arena.expr_list(args).to_vec();
                match name {
                    "abs" => Val::Num(self.eval(args[0]).num().abs()),
                    other => panic!("evaluator does not model builtin `{other}`"),
                }
            }
            ExprKind::ScalarConstructor { ty, args } => {
                let args = self.arena.expr_list(args).to_vec();
                let value = self.eval(args[0]).num();
                match self.arena.ty(ty) {
                    TypeDecl::Named(name) => match self.interner.lookup(name) {
                        "i32" | "u32" => Val::Num(value.trunc()),
                        "f32" => Val::Num(value as f32 as f64),
                        other => panic!("evaluator does not cast to `{other}`"),
                    },
                    other => panic!("unexpected constructor type {other:?}"),
                }
            }
            ExprKind::IndexLookup { receiver, index } => {
                let index = self.eval(index).num() as usize;
                match self.eval(receiver) {
                    Val::Tree(UniformValue::Composite(parts)) => {
                        Val::Tree(parts[index].clone())
                    }
                    other => panic!("indexing a non-composite {other:?}"),
                }
            }
            ExprKind::MemberLookup { receiver, member } => {
                let index = *self.fields.get(&member).unwrap_or_else(|| {
                    panic!("unknown member `{}`", self.interner.lookup(member))
                });
                match self.eval(receiver) {
                    Val::Tree(UniformValue::Composite(parts)) => {
                        Val::Tree(parts[index].clone())
                    }
                    other => panic!("member lookup on {other:?}"),
                }
            }
            ExprKind::KnownValue { expr, value } => {
                let actual = self.eval(expr).num();
                let proven = self.eval(value).num();
                assert_eq!(
                    actual, proven,
                    "known value proof violated: expression evaluates to {actual}, proof says {proven}"
                );
                Val::Num(actual)
            }
            ExprKind::TrueByConstruction(inner) => {
                let value = self.eval(inner).truth();
                assert!(value, "true-by-construction evaluated to false");
                Val::Bool(true)
            }
            ExprKind::FalseByConstruction(inner) => {
                let value = self.eval(inner).truth();
                assert!(!value, "false-by-construction evaluated to true");
                Val::Bool(false)
            }
            ExprKind::ArbitraryExpression(inner) => self.eval(inner),
            ExprKind::IdentityOperation {
                replacement,
                original,
                ..
            } => {
                let replaced = self.eval(replacement).num();
                let kept = self.eval(original).num();
                assert_eq!(replaced, kept, "identity operation changed the value");
                Val::Num(replaced)
            }
            other => panic!("evaluator does not model {other:?}"),
        }
    }

    fn eval_binary(&self, op: morph_ast::BinaryOp, left: ExprId, right: ExprId) -> Val {
        use morph_ast::BinaryOp;
        match op {
            BinaryOp::LogicalAnd => {
                Val::Bool(self.eval(left).truth() && self.eval(right).truth())
            }
            BinaryOp::LogicalOr => {
                Val::Bool(self.eval(left).truth() || self.eval(right).truth())
            }
            _ => {
                let lhs = self.eval(left).num();
                let rhs = self.eval(right).num();
                match op {
                    BinaryOp::Add => Val::Num(lhs + rhs),
                    BinaryOp::Subtract => Val::Num(lhs - rhs),
                    BinaryOp::Multiply => Val::Num(lhs * rhs),
                    BinaryOp::Divide => Val::Num(lhs / rhs),
                    BinaryOp::Modulo => Val::Num(lhs % rhs),
                    BinaryOp::Equal => Val::Bool(lhs == rhs),
                    BinaryOp::NotEqual => Val::Bool(lhs != rhs),
                    BinaryOp::LessThan => Val::Bool(lhs < rhs),
                    BinaryOp::LessEqual => Val::Bool(lhs <= rhs),
                    BinaryOp::GreaterThan => Val::Bool(lhs > rhs),
                    BinaryOp::GreaterEqual => Val::Bool(lhs >= rhs),
                    other => panic!("evaluator does not model {other:?}"),
                }
            }
        }
    }
}

/// Evaluator preloaded with the `params` uniform of [`uniform_fixture`].
pub fn fixture_evaluator<'a>(
    arena: &'a ModuleArena,
    interner: &'a StringInterner,
    uniforms: &UniformState,
) -> Evaluator<'a> {
    let mut roots = FxHashMap::default();
    let mut fields = FxHashMap::default();
    // Names were interned by the fixture; find them by content.
    let lookup = |text: &str| -> Name {
        for raw in 0..u32::try_from(interner.len()).expect("interner size") {
            let name = Name::from_raw(raw);
            if interner.lookup(name) == text {
                return name;
            }
        }
        panic!("`{text}` was never interned");
    };
    if let Some(value) = uniforms.value(0, 0) {
        roots.insert(lookup("params"), value.clone());
    }
    fields.insert(lookup("a"), 0);
    fields.insert(lookup("b"), 1);
    Evaluator {
        arena,
        interner,
        roots,
        fields,
    }
}
