//! Syntactic types and attributes.
//!
//! `TypeDecl` is the pre-resolution spelling of a type as it appears in
//! source (`vec3<f32>`, `array<u32, 4>`, `MyStruct`). The semantic view
//! lives in `morph_types`; the resolver maps between the two.

use crate::{ExprId, ExprRange, Name, TyId};

/// Vector/matrix dimension: 2, 3 or 4.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum VecSize {
    Two,
    Three,
    Four,
}

impl VecSize {
    pub const fn as_u32(self) -> u32 {
        match self {
            VecSize::Two => 2,
            VecSize::Three => 3,
            VecSize::Four => 4,
        }
    }

    pub const fn from_u32(n: u32) -> Option<Self> {
        match n {
            2 => Some(VecSize::Two),
            3 => Some(VecSize::Three),
            4 => Some(VecSize::Four),
            _ => None,
        }
    }
}

/// Address space of a `var` declaration or pointer type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AddressSpace {
    Function,
    Private,
    Workgroup,
    Uniform,
    Storage,
}

impl AddressSpace {
    pub const fn keyword(self) -> &'static str {
        match self {
            AddressSpace::Function => "function",
            AddressSpace::Private => "private",
            AddressSpace::Workgroup => "workgroup",
            AddressSpace::Uniform => "uniform",
            AddressSpace::Storage => "storage",
        }
    }
}

/// Access mode of a storage variable or pointer type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    pub const fn keyword(self) -> &'static str {
        match self {
            AccessMode::Read => "read",
            AccessMode::Write => "write",
            AccessMode::ReadWrite => "read_write",
        }
    }
}

/// Syntactic type declaration.
///
/// The array size expression lives in a dedicated position that expression
/// passes never visit: it must stay a pristine const-expression.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeDecl {
    /// A scalar keyword, struct name, or alias name: `i32`, `Particle`.
    Named(Name),
    /// `vecN<T>`
    Vector { size: VecSize, elem: TyId },
    /// `matCxR<T>`
    Matrix { cols: VecSize, rows: VecSize, elem: TyId },
    /// `array<T, N>`; `count` is `ExprId::INVALID` for runtime-sized arrays.
    Array { elem: TyId, count: ExprId },
    /// `ptr<space, T>` or `ptr<space, T, access>`
    Pointer {
        space: AddressSpace,
        elem: TyId,
        access: Option<AccessMode>,
    },
    /// `atomic<T>`
    Atomic { elem: TyId },
}

/// Builtin value bound by `@builtin(...)`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BuiltinValue {
    Position,
    FragDepth,
    FrontFacing,
    VertexIndex,
    InstanceIndex,
    LocalInvocationId,
    LocalInvocationIndex,
    GlobalInvocationId,
    WorkgroupId,
    NumWorkgroups,
    SampleIndex,
    SampleMask,
}

impl BuiltinValue {
    pub const fn keyword(self) -> &'static str {
        match self {
            BuiltinValue::Position => "position",
            BuiltinValue::FragDepth => "frag_depth",
            BuiltinValue::FrontFacing => "front_facing",
            BuiltinValue::VertexIndex => "vertex_index",
            BuiltinValue::InstanceIndex => "instance_index",
            BuiltinValue::LocalInvocationId => "local_invocation_id",
            BuiltinValue::LocalInvocationIndex => "local_invocation_index",
            BuiltinValue::GlobalInvocationId => "global_invocation_id",
            BuiltinValue::WorkgroupId => "workgroup_id",
            BuiltinValue::NumWorkgroups => "num_workgroups",
            BuiltinValue::SampleIndex => "sample_index",
            BuiltinValue::SampleMask => "sample_mask",
        }
    }
}

/// Attribute kind.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AttrKind {
    Vertex,
    Fragment,
    Compute,
    /// `@group(n)`
    Group,
    /// `@binding(n)`
    Binding,
    /// `@location(n)`
    Location,
    /// `@builtin(value)`
    Builtin(BuiltinValue),
    /// `@workgroup_size(x[, y[, z]])`
    WorkgroupSize,
}

impl AttrKind {
    pub const fn keyword(self) -> &'static str {
        match self {
            AttrKind::Vertex => "vertex",
            AttrKind::Fragment => "fragment",
            AttrKind::Compute => "compute",
            AttrKind::Group => "group",
            AttrKind::Binding => "binding",
            AttrKind::Location => "location",
            AttrKind::Builtin(_) => "builtin",
            AttrKind::WorkgroupSize => "workgroup_size",
        }
    }
}

/// An attribute with its argument expressions.
///
/// Argument expressions are reachable only through declarations, never
/// through statement traversal, so expression passes cannot touch them.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Attribute {
    pub kind: AttrKind,
    pub args: ExprRange,
}

impl Attribute {
    /// Attribute with no arguments.
    pub const fn marker(kind: AttrKind) -> Self {
        Attribute {
            kind,
            args: ExprRange::EMPTY,
        }
    }
}
