//! Shader jobs.

use morph_ast::{Module, ModuleArena};
use morph_resolve::UniformState;

/// The unit every pass consumes and produces: a module, the arena its
/// nodes live in, and the uniform values the harness will bind when the
/// shader runs.
pub struct ShaderJob {
    pub module: Module,
    pub arena: ModuleArena,
    pub uniforms: UniformState,
}

impl ShaderJob {
    pub fn new(module: Module, arena: ModuleArena, uniforms: UniformState) -> Self {
        ShaderJob {
            module,
            arena,
            uniforms,
        }
    }
}
