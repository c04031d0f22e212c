//! Type interning pool.

use morph_ast::{AccessMode, AddressSpace, Name, VecSize};
use rustc_hash::FxHashMap;

use crate::Idx;

/// Scalar type kinds.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ScalarKind {
    Bool,
    I32,
    U32,
    F16,
    F32,
    AbstractInt,
    AbstractFloat,
}

impl ScalarKind {
    /// Source spelling; abstract types have none.
    pub const fn keyword(self) -> Option<&'static str> {
        match self {
            ScalarKind::Bool => Some("bool"),
            ScalarKind::I32 => Some("i32"),
            ScalarKind::U32 => Some("u32"),
            ScalarKind::F16 => Some("f16"),
            ScalarKind::F32 => Some("f32"),
            ScalarKind::AbstractInt | ScalarKind::AbstractFloat => None,
        }
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::AbstractInt
        )
    }

    pub const fn is_float(self) -> bool {
        matches!(
            self,
            ScalarKind::F16 | ScalarKind::F32 | ScalarKind::AbstractFloat
        )
    }

    pub const fn is_abstract(self) -> bool {
        matches!(self, ScalarKind::AbstractInt | ScalarKind::AbstractFloat)
    }
}

/// A struct member as the type system sees it.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct StructField {
    pub name: Name,
    pub ty: Idx,
}

/// Semantic type variants.
///
/// Structs are nominal: the kind carries only the name, and the pool keeps
/// the field list in a side table.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeKind {
    Scalar(ScalarKind),
    Vector { size: VecSize, elem: Idx },
    Matrix { cols: VecSize, rows: VecSize, elem: Idx },
    /// `count` is `None` for runtime-sized arrays.
    Array { elem: Idx, count: Option<u32> },
    Struct { name: Name },
    Pointer {
        space: AddressSpace,
        elem: Idx,
        access: AccessMode,
    },
    /// The type of a storage location (what a `var` name evaluates to
    /// before the load rule applies). Distinct from an explicit-indirection
    /// pointer value.
    Reference {
        space: AddressSpace,
        elem: Idx,
        access: AccessMode,
    },
    Atomic { elem: Idx },
}

/// Interning pool for semantic types.
pub struct TypePool {
    kinds: Vec<TypeKind>,
    interned: FxHashMap<TypeKind, Idx>,
    struct_fields: FxHashMap<Name, Vec<StructField>>,
}

impl TypePool {
    /// Create a pool with all scalars pre-interned at their fixed indices.
    pub fn new() -> Self {
        let scalars = [
            ScalarKind::Bool,
            ScalarKind::I32,
            ScalarKind::U32,
            ScalarKind::F16,
            ScalarKind::F32,
            ScalarKind::AbstractInt,
            ScalarKind::AbstractFloat,
        ];
        let mut pool = TypePool {
            kinds: Vec::with_capacity(32),
            interned: FxHashMap::default(),
            struct_fields: FxHashMap::default(),
        };
        for (i, scalar) in scalars.into_iter().enumerate() {
            let kind = TypeKind::Scalar(scalar);
            pool.kinds.push(kind);
            pool.interned.insert(kind, Idx::from_raw(i as u32));
        }
        pool
    }

    /// Intern a type kind, returning its index.
    pub fn intern(&mut self, kind: TypeKind) -> Idx {
        if let Some(&idx) = self.interned.get(&kind) {
            return idx;
        }
        let idx = Idx::from_raw(
            u32::try_from(self.kinds.len()).unwrap_or_else(|_| panic!("type pool overflow")),
        );
        self.kinds.push(kind);
        self.interned.insert(kind, idx);
        idx
    }

    /// Look up a type kind.
    ///
    /// # Panics
    /// Panics if the index was not produced by this pool.
    pub fn kind(&self, idx: Idx) -> TypeKind {
        self.kinds[idx.raw() as usize]
    }

    /// Register a struct's fields (idempotent per name) and return its type.
    pub fn register_struct(&mut self, name: Name, fields: Vec<StructField>) -> Idx {
        self.struct_fields.insert(name, fields);
        self.intern(TypeKind::Struct { name })
    }

    /// Fields of a registered struct.
    pub fn fields_of(&self, name: Name) -> Option<&[StructField]> {
        self.struct_fields.get(&name).map(Vec::as_slice)
    }

    // Shape helpers

    pub fn vector(&mut self, size: VecSize, elem: Idx) -> Idx {
        self.intern(TypeKind::Vector { size, elem })
    }

    pub fn matrix(&mut self, cols: VecSize, rows: VecSize, elem: Idx) -> Idx {
        self.intern(TypeKind::Matrix { cols, rows, elem })
    }

    pub fn array(&mut self, elem: Idx, count: Option<u32>) -> Idx {
        self.intern(TypeKind::Array { elem, count })
    }

    // Predicates

    pub fn as_scalar(&self, idx: Idx) -> Option<ScalarKind> {
        match self.kind(idx) {
            TypeKind::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn is_scalar(&self, idx: Idx) -> bool {
        matches!(self.kind(idx), TypeKind::Scalar(_))
    }

    pub fn is_integer_scalar(&self, idx: Idx) -> bool {
        self.as_scalar(idx).is_some_and(ScalarKind::is_integer)
    }

    pub fn is_numeric_scalar(&self, idx: Idx) -> bool {
        self.as_scalar(idx)
            .is_some_and(|scalar| scalar.is_integer() || scalar.is_float())
    }

    /// Whether the type contains no abstract scalar anywhere.
    pub fn is_concrete(&self, idx: Idx) -> bool {
        match self.kind(idx) {
            TypeKind::Scalar(scalar) => !scalar.is_abstract(),
            TypeKind::Vector { elem, .. }
            | TypeKind::Matrix { elem, .. }
            | TypeKind::Array { elem, .. }
            | TypeKind::Atomic { elem }
            | TypeKind::Pointer { elem, .. }
            | TypeKind::Reference { elem, .. } => self.is_concrete(elem),
            TypeKind::Struct { .. } => true,
        }
    }

    /// Concretize abstract scalars: abstract-int → i32, abstract-float →
    /// f32, recursively through vectors/matrices/arrays.
    pub fn concretize(&mut self, idx: Idx) -> Idx {
        match self.kind(idx) {
            TypeKind::Scalar(ScalarKind::AbstractInt) => Idx::I32,
            TypeKind::Scalar(ScalarKind::AbstractFloat) => Idx::F32,
            TypeKind::Scalar(_) => idx,
            TypeKind::Vector { size, elem } => {
                let elem = self.concretize(elem);
                self.vector(size, elem)
            }
            TypeKind::Matrix { cols, rows, elem } => {
                let elem = self.concretize(elem);
                self.matrix(cols, rows, elem)
            }
            TypeKind::Array { elem, count } => {
                let elem = self.concretize(elem);
                self.array(elem, count)
            }
            _ => idx,
        }
    }

    /// Strip a reference, yielding the stored type (the WGSL load rule).
    pub fn load(&self, idx: Idx) -> Idx {
        match self.kind(idx) {
            TypeKind::Reference { elem, .. } => elem,
            _ => idx,
        }
    }
}

impl Default for TypePool {
    fn default() -> Self {
        Self::new()
    }
}
