//! Engine errors.
//!
//! Every failure here is fatal and non-retried inside the core: a failed
//! pipeline invocation is retried, if at all, by an outer driver with a
//! different seed.

use morph_resolve::ResolveError;

/// Fatal transformation failure.
#[derive(Debug, thiserror::Error)]
pub enum MorphError {
    /// A known value fell outside `[0, 2^24]`; the float/int precision
    /// argument depends on that bound, so this is never clamped.
    #[error("known value {value} outside [0, 16777216]")]
    KnownValueRange { value: i64 },

    /// A type the engine cannot synthesize for.
    #[error("unsupported type for {context}")]
    UnsupportedType { context: &'static str },

    /// A deliberately flagged feature gap; must fail loudly, never degrade.
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),

    /// A precondition violation (e.g. wrapping an empty statement run).
    #[error("precondition violated: {0}")]
    Precondition(&'static str),

    /// A weighted choice with every option at weight zero.
    #[error("no weighted option available for {0}")]
    NoChoice(&'static str),

    /// Divergence between the engine and the resolver's model of the tree.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
