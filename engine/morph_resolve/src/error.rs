//! Resolver errors.
//!
//! Every variant is an internal-consistency or unsupported-input failure:
//! fatal, never caught or degraded inside the engine.

use std::fmt;

/// Resolution failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// An identifier was not in scope at its use site.
    UnknownIdent(String),
    /// A type name could not be resolved.
    UnknownType(String),
    /// A call referenced neither a user function nor a known builtin.
    UnknownFunction(String),
    /// Operand types were incompatible for an operator.
    OperatorMismatch { op: &'static str },
    /// A member lookup did not match the receiver's type.
    BadMemberLookup(String),
    /// An index lookup on a non-indexable type.
    BadIndexLookup,
    /// A node shape the resolver expected was not found; the tree and the
    /// resolver's model have diverged.
    Inconsistent(&'static str),
    /// An attribute argument that must be an integer literal was not.
    NonLiteralAttribute(&'static str),
    /// A uniform value did not mirror its declared type.
    UniformShape(&'static str),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::UnknownIdent(name) => write!(f, "unknown identifier `{name}`"),
            ResolveError::UnknownType(name) => write!(f, "unknown type `{name}`"),
            ResolveError::UnknownFunction(name) => write!(f, "unknown function `{name}`"),
            ResolveError::OperatorMismatch { op } => {
                write!(f, "incompatible operand types for `{op}`")
            }
            ResolveError::BadMemberLookup(member) => {
                write!(f, "invalid member lookup `.{member}`")
            }
            ResolveError::BadIndexLookup => write!(f, "index lookup on non-indexable type"),
            ResolveError::Inconsistent(what) => {
                write!(f, "internal consistency violation: {what}")
            }
            ResolveError::NonLiteralAttribute(attr) => {
                write!(f, "attribute `{attr}` argument must be an integer literal")
            }
            ResolveError::UniformShape(what) => {
                write!(f, "uniform value does not mirror its declared type: {what}")
            }
        }
    }
}

impl std::error::Error for ResolveError {}
