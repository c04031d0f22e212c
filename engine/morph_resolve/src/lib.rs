//! Scope/type resolver for wgslmorph.
//!
//! Every transformation pass consumes the tree through this crate's query
//! interface: per-program-point scopes, expression types, function
//! signatures, fragment-stage reachability, address-taken roots, and
//! uniform bindings plus their runtime values.
//!
//! The resolver is rebuilt from scratch for each pass input; it holds no
//! state across trees, which is what lets passes compose in any order.

mod builtins;
mod error;
mod resolver;
mod scope;
mod uniforms;

pub use builtins::{builtin_return_type, is_integer_arbitrary_builtin};
pub use error::ResolveError;
pub use resolver::{FunctionSig, Resolver, UniformBinding};
pub use scope::{EntryKind, ScopeArena, ScopeEntry, ScopeId, ScopeIter};
pub use uniforms::{literal_expr, UniformState, UniformValue};

#[cfg(test)]
mod tests;
