//! Builtin function typing.
//!
//! Covers the builtins the engine generates and the ones common shader code
//! under test uses. The table is intentionally closed: an unknown callee is
//! a fatal [`ResolveError::UnknownFunction`], signaling divergence between
//! the engine and the program it was handed.

use morph_ast::VecSize;
use morph_types::{Idx, TypeKind, TypePool};

use crate::ResolveError;

/// Result type of `name(args)`, or an error if `name` is not a builtin or
/// the argument types do not fit.
pub fn builtin_return_type(
    pool: &mut TypePool,
    name: &str,
    args: &[Idx],
) -> Result<Idx, ResolveError> {
    let first = args.first().copied();
    match name {
        // Same-shape numeric builtins.
        "abs" | "clamp" | "min" | "max" | "saturate" | "sign" | "floor" | "ceil" | "fract"
        | "round" | "trunc" | "sqrt" | "inverseSqrt" | "sin" | "cos" | "tan" | "exp" | "exp2"
        | "log" | "log2" | "pow" | "mix" | "step" | "smoothstep" | "normalize" | "fma" => {
            first.ok_or(ResolveError::OperatorMismatch { op: "builtin call" })
        }

        // Integer bit manipulation: same shape as the first argument.
        "countOneBits" | "countLeadingZeros" | "countTrailingZeros" | "reverseBits"
        | "firstLeadingBit" | "firstTrailingBit" | "extractBits" | "insertBits" => {
            first.ok_or(ResolveError::OperatorMismatch { op: "bit builtin" })
        }

        // Reductions to the element scalar.
        "dot" | "length" | "distance" => match first.map(|idx| pool.kind(idx)) {
            Some(TypeKind::Vector { elem, .. }) => Ok(elem),
            Some(TypeKind::Scalar(_)) => first.ok_or(ResolveError::BadIndexLookup),
            _ => Err(ResolveError::OperatorMismatch { op: "dot" }),
        },

        // Packed-dot-product family.
        "dot4U8Packed" => Ok(Idx::U32),
        "dot4I8Packed" => Ok(Idx::I32),
        "pack4xI8" | "pack4xU8" | "pack2x16float" | "pack2x16snorm" | "pack2x16unorm" => {
            Ok(Idx::U32)
        }
        "unpack2x16float" => Ok(pool.vector(VecSize::Two, Idx::F32)),
        "unpack4xI8" => Ok(pool.vector(VecSize::Four, Idx::I32)),
        "unpack4xU8" => Ok(pool.vector(VecSize::Four, Idx::U32)),

        // Boolean reductions and selection.
        "all" | "any" => Ok(Idx::BOOL),
        "select" => first.ok_or(ResolveError::OperatorMismatch { op: "select" }),

        // Vector length query.
        "arrayLength" => Ok(Idx::U32),

        _ => Err(ResolveError::UnknownFunction(name.to_owned())),
    }
}

/// Whether the engine's arbitrary-expression generator may call this
/// builtin for an integer-scalar result.
pub fn is_integer_arbitrary_builtin(name: &str) -> bool {
    matches!(
        name,
        "abs" | "clamp"
            | "min"
            | "max"
            | "countOneBits"
            | "reverseBits"
            | "firstLeadingBit"
            | "firstTrailingBit"
            | "extractBits"
            | "dot4U8Packed"
            | "dot4I8Packed"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_shape_builtins() {
        let mut pool = TypePool::new();
        assert_eq!(
            builtin_return_type(&mut pool, "abs", &[Idx::I32]),
            Ok(Idx::I32)
        );
        let v3 = pool.vector(VecSize::Three, Idx::F32);
        assert_eq!(
            builtin_return_type(&mut pool, "clamp", &[v3, v3, v3]),
            Ok(v3)
        );
    }

    #[test]
    fn test_dot_reduces() {
        let mut pool = TypePool::new();
        let v4 = pool.vector(VecSize::Four, Idx::U32);
        assert_eq!(builtin_return_type(&mut pool, "dot", &[v4, v4]), Ok(Idx::U32));
    }

    #[test]
    fn test_packed_family() {
        let mut pool = TypePool::new();
        assert_eq!(
            builtin_return_type(&mut pool, "dot4U8Packed", &[Idx::U32, Idx::U32]),
            Ok(Idx::U32)
        );
        assert_eq!(
            builtin_return_type(&mut pool, "dot4I8Packed", &[Idx::U32, Idx::U32]),
            Ok(Idx::I32)
        );
    }

    #[test]
    fn test_unknown_function_is_fatal() {
        let mut pool = TypePool::new();
        assert!(matches!(
            builtin_return_type(&mut pool, "texelFetchMadeUp", &[]),
            Err(ResolveError::UnknownFunction(_))
        ));
    }
}
