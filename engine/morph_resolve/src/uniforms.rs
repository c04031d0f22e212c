//! Uniform buffer values.
//!
//! The harness knows the concrete bytes it binds to every `var<uniform>`;
//! this module is the engine-side mirror of that knowledge. A
//! [`UniformValue`] tree has exactly the shape of the uniform's declared
//! type (scalars at the leaves, composites elsewhere), and a
//! [`UniformState`] maps `(group, binding)` to one such tree.
//!
//! The serde model matches the job JSON the original system ships shaders
//! in: a `uniforms` array of `{group, binding, value}` records.

use rustc_hash::FxHashMap;
use serde::Deserialize;

use morph_ast::{ExprId, ExprKind, FloatSuffix, IntSuffix, ModuleArena};
use morph_types::{Idx, ScalarKind, TypeKind, TypePool};

use crate::ResolveError;

/// A literal value tree mirroring a uniform's declared type.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum UniformValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Composite(Vec<UniformValue>),
}

impl UniformValue {
    /// The scalar at a navigation path of component indices, if the path
    /// leads to a leaf.
    pub fn leaf(&self, path: &[usize]) -> Option<&UniformValue> {
        match (self, path) {
            (value, []) => match value {
                UniformValue::Composite(_) => None,
                leaf => Some(leaf),
            },
            (UniformValue::Composite(parts), [head, rest @ ..]) => {
                parts.get(*head).and_then(|part| part.leaf(rest))
            }
            _ => None,
        }
    }

    /// Numeric view of a scalar leaf.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            UniformValue::Int(value) => Some(*value as f64),
            UniformValue::Float(value) => Some(*value),
            UniformValue::Bool(_) | UniformValue::Composite(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UniformRecord {
    group: u32,
    binding: u32,
    value: UniformValue,
}

#[derive(Debug, Deserialize)]
struct UniformFile {
    uniforms: Vec<UniformRecord>,
}

/// The uniform values for one shader job.
#[derive(Default, Debug)]
pub struct UniformState {
    values: FxHashMap<(u32, u32), UniformValue>,
}

impl UniformState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value for `(group, binding)`.
    pub fn insert(&mut self, group: u32, binding: u32, value: UniformValue) {
        self.values.insert((group, binding), value);
    }

    /// The value bound at `(group, binding)`.
    pub fn value(&self, group: u32, binding: u32) -> Option<&UniformValue> {
        self.values.get(&(group, binding))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse the uniform section of a job JSON document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let file: UniformFile = serde_json::from_str(text)?;
        let mut state = UniformState::new();
        for record in file.uniforms {
            state.insert(record.group, record.binding, record.value);
        }
        Ok(state)
    }
}

/// Build a literal-valued expression mirroring `ty` from a uniform value
/// tree (the `getUniformValue` query surface: the engine hands this to
/// passes that need the uniform's contents as AST).
pub fn literal_expr(
    arena: &mut ModuleArena,
    pool: &TypePool,
    ty: Idx,
    value: &UniformValue,
) -> Result<ExprId, ResolveError> {
    match (pool.kind(ty), value) {
        (TypeKind::Scalar(scalar), leaf) => scalar_literal(arena, scalar, leaf),
        (TypeKind::Vector { size, elem }, UniformValue::Composite(parts)) => {
            if parts.len() != size.as_u32() as usize {
                return Err(ResolveError::UniformShape("vector arity"));
            }
            let args: Result<Vec<ExprId>, ResolveError> = parts
                .iter()
                .map(|part| literal_expr(arena, pool, elem, part))
                .collect();
            let args = arena.alloc_expr_list(args?);
            Ok(arena.alloc_expr(ExprKind::VectorConstructor {
                ty: morph_ast::TyId::INVALID,
                args,
            }))
        }
        (TypeKind::Array { elem, count }, UniformValue::Composite(parts)) => {
            if let Some(count) = count {
                if parts.len() != count as usize {
                    return Err(ResolveError::UniformShape("array arity"));
                }
            }
            let args: Result<Vec<ExprId>, ResolveError> = parts
                .iter()
                .map(|part| literal_expr(arena, pool, elem, part))
                .collect();
            let args = arena.alloc_expr_list(args?);
            Ok(arena.alloc_expr(ExprKind::ArrayConstructor {
                ty: morph_ast::TyId::INVALID,
                args,
            }))
        }
        (TypeKind::Struct { name }, UniformValue::Composite(parts)) => {
            let fields = pool
                .fields_of(name)
                .ok_or(ResolveError::UniformShape("unregistered struct"))?;
            if parts.len() != fields.len() {
                return Err(ResolveError::UniformShape("struct arity"));
            }
            let field_types: Vec<Idx> = fields.iter().map(|field| field.ty).collect();
            let args: Result<Vec<ExprId>, ResolveError> = field_types
                .iter()
                .zip(parts)
                .map(|(&field_ty, part)| literal_expr(arena, pool, field_ty, part))
                .collect();
            let args = arena.alloc_expr_list(args?);
            Ok(arena.alloc_expr(ExprKind::StructConstructor {
                ty: morph_ast::TyId::INVALID,
                args,
            }))
        }
        _ => Err(ResolveError::UniformShape("kind mismatch")),
    }
}

fn scalar_literal(
    arena: &mut ModuleArena,
    scalar: ScalarKind,
    value: &UniformValue,
) -> Result<ExprId, ResolveError> {
    let kind = match (scalar, value) {
        (ScalarKind::Bool, UniformValue::Bool(b)) => ExprKind::BoolLit(*b),
        (ScalarKind::I32, UniformValue::Int(v)) => ExprKind::IntLit {
            value: *v,
            suffix: IntSuffix::I,
        },
        (ScalarKind::U32, UniformValue::Int(v)) => ExprKind::IntLit {
            value: *v,
            suffix: IntSuffix::U,
        },
        (ScalarKind::F32, UniformValue::Float(v)) => ExprKind::FloatLit {
            bits: v.to_bits(),
            suffix: FloatSuffix::F,
        },
        (ScalarKind::F32, UniformValue::Int(v)) => ExprKind::FloatLit {
            bits: (*v as f64).to_bits(),
            suffix: FloatSuffix::F,
        },
        (ScalarKind::F16, UniformValue::Float(v)) => ExprKind::FloatLit {
            bits: v.to_bits(),
            suffix: FloatSuffix::H,
        },
        _ => return Err(ResolveError::UniformShape("scalar kind mismatch")),
    };
    Ok(arena.alloc_expr(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use morph_ast::VecSize;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_job_json() {
        let text = r#"{
            "uniforms": [
                { "group": 0, "binding": 0, "value": [1, 2.5] },
                { "group": 0, "binding": 1, "value": 7 }
            ]
        }"#;
        let state = UniformState::from_json(text).expect("valid json");
        assert_eq!(
            state.value(0, 1),
            Some(&UniformValue::Int(7))
        );
        match state.value(0, 0) {
            Some(UniformValue::Composite(parts)) => {
                assert_eq!(parts[0], UniformValue::Int(1));
                assert_eq!(parts[1], UniformValue::Float(2.5));
            }
            other => panic!("expected composite, got {other:?}"),
        }
    }

    #[test]
    fn test_leaf_navigation() {
        let value = UniformValue::Composite(vec![
            UniformValue::Int(3),
            UniformValue::Composite(vec![UniformValue::Float(1.5), UniformValue::Float(2.0)]),
        ]);
        assert_eq!(value.leaf(&[0]), Some(&UniformValue::Int(3)));
        assert_eq!(value.leaf(&[1, 1]), Some(&UniformValue::Float(2.0)));
        assert_eq!(value.leaf(&[1]), None, "composite is not a leaf");
        assert_eq!(value.leaf(&[5]), None);
    }

    #[test]
    fn test_literal_expr_mirrors_scalar() {
        let mut arena = ModuleArena::new();
        let pool = TypePool::new();
        let id = literal_expr(&mut arena, &pool, Idx::U32, &UniformValue::Int(9))
            .expect("scalar mirror");
        assert_eq!(
            arena.expr(id),
            ExprKind::IntLit {
                value: 9,
                suffix: IntSuffix::U
            }
        );
    }

    #[test]
    fn test_literal_expr_shape_mismatch_is_fatal() {
        let mut arena = ModuleArena::new();
        let mut pool = TypePool::new();
        let vec2 = pool.vector(VecSize::Two, Idx::F32);
        let bad = literal_expr(&mut arena, &pool, vec2, &UniformValue::Int(1));
        assert!(bad.is_err());
    }
}
