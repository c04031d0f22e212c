//! WGSL writer for wgslmorph.
//!
//! Turns a (module, arena, interner) triple back into WGSL source text.
//! The transformed tree prints as the runtime program: augmentation
//! metadata (known-value proofs, dead-code markers, wrapper ids) leaves no
//! trace in the output.

mod emitter;
mod writer;

pub use emitter::StringEmitter;
pub use writer::write_module;

#[cfg(test)]
mod tests;
