//! Module-level declarations.

use super::types::{AccessMode, AddressSpace, AttrKind, Attribute};
use crate::{ExprId, Name, StmtId, TyId};

/// A shader module: an ordered list of global declarations plus the arena
/// they index into (the arena is passed alongside, as in every consumer).
#[derive(Clone, Debug, Default)]
pub struct Module {
    pub decls: Vec<GlobalDecl>,
}

impl Module {
    /// Iterate the functions of the module in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.decls.iter().filter_map(|decl| match decl {
            GlobalDecl::Function(function) => Some(function),
            _ => None,
        })
    }

    /// Find a function by name.
    pub fn function(&self, name: Name) -> Option<&Function> {
        self.functions().find(|function| function.name == name)
    }
}

/// Global declaration variants.
#[derive(Clone, Debug)]
pub enum GlobalDecl {
    Function(Function),
    Variable(GlobalVar),
    Struct(StructDecl),
    TypeAlias(TypeAlias),
    Value(GlobalValue),
    ConstAssert(ExprId),
    Empty,
}

/// Pipeline stage of an entry point.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

/// Function declaration.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: Name,
    pub attrs: Vec<Attribute>,
    pub params: Vec<Param>,
    /// `TyId::INVALID` = no return type (void).
    pub ret_ty: TyId,
    pub ret_attrs: Vec<Attribute>,
    /// Always a `Compound`.
    pub body: StmtId,
}

impl Function {
    /// The entry-point stage declared by an attribute, if any.
    pub fn stage(&self) -> Option<ShaderStage> {
        self.attrs.iter().find_map(|attr| match attr.kind {
            AttrKind::Vertex => Some(ShaderStage::Vertex),
            AttrKind::Fragment => Some(ShaderStage::Fragment),
            AttrKind::Compute => Some(ShaderStage::Compute),
            _ => None,
        })
    }
}

/// Formal parameter.
#[derive(Clone, Debug)]
pub struct Param {
    pub name: Name,
    pub ty: TyId,
    pub attrs: Vec<Attribute>,
}

/// Module-scope `var` declaration.
#[derive(Clone, Debug)]
pub struct GlobalVar {
    pub name: Name,
    /// Address space; module-scope `var` without one is `Private`.
    pub space: AddressSpace,
    pub access: Option<AccessMode>,
    pub ty: TyId,
    /// `ExprId::INVALID` = no initializer.
    pub init: ExprId,
    pub attrs: Vec<Attribute>,
}

/// Struct declaration.
#[derive(Clone, Debug)]
pub struct StructDecl {
    pub name: Name,
    pub members: Vec<StructMember>,
}

/// Struct member.
#[derive(Clone, Debug)]
pub struct StructMember {
    pub name: Name,
    pub ty: TyId,
    pub attrs: Vec<Attribute>,
}

/// `alias Name = T;`
#[derive(Clone, Debug)]
pub struct TypeAlias {
    pub name: Name,
    pub ty: TyId,
}

/// Module-scope value kind.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum GlobalValueKind {
    Const,
    Override,
}

/// Module-scope `const` or `override` declaration.
#[derive(Clone, Debug)]
pub struct GlobalValue {
    pub kind: GlobalValueKind,
    pub name: Name,
    /// `TyId::INVALID` = inferred.
    pub ty: TyId,
    /// `ExprId::INVALID` = none (overrides may omit it).
    pub init: ExprId,
}
