//! Transformation passes and the pipeline that orders them.
//!
//! Every pass has the same two-phase shape: resolve the input tree from
//! scratch, run a read-only analysis that produces an id-keyed edit plan
//! (drawing randomness in deterministic traversal order), then perform one
//! clone-with-replacement rebuild consulting the plan. Because each pass
//! re-derives everything from its own input, passes compose in any order.

pub mod control_flow_wrap;
pub mod dead_jump;
pub mod identity;

use morph_types::TypePool;

use crate::donor::Donor;
use crate::job::ShaderJob;
use crate::session::Session;
use crate::MorphError;

/// A semantics-preserving transformation over a shader job.
pub trait MorphPass {
    fn name(&self) -> &'static str;

    /// Consume a job, return the transformed job. The output tree shares
    /// every untouched subtree with the input.
    fn run(
        &self,
        job: ShaderJob,
        session: &mut Session,
        pool: &mut TypePool,
        donor: Option<&Donor>,
    ) -> Result<ShaderJob, MorphError>;
}

/// An ordered list of passes applied left to right.
pub struct Pipeline {
    passes: Vec<Box<dyn MorphPass>>,
}

impl Pipeline {
    pub fn new(passes: Vec<Box<dyn MorphPass>>) -> Self {
        Pipeline { passes }
    }

    /// The full pass set in its shipped order.
    pub fn standard() -> Self {
        Pipeline::new(vec![
            Box::new(dead_jump::DeadJumpPass::discard()),
            Box::new(dead_jump::DeadJumpPass::dead_break()),
            Box::new(dead_jump::DeadJumpPass::dead_continue()),
            Box::new(dead_jump::DeadJumpPass::dead_return()),
            Box::new(control_flow_wrap::ControlFlowWrapPass),
            Box::new(identity::IdentityOperationPass),
        ])
    }

    /// Thread a job through every pass.
    #[tracing::instrument(level = "debug", skip_all, fields(passes = self.passes.len()))]
    pub fn run(
        &self,
        mut job: ShaderJob,
        session: &mut Session,
        pool: &mut TypePool,
        donor: Option<&Donor>,
    ) -> Result<ShaderJob, MorphError> {
        for pass in &self.passes {
            tracing::debug!(pass = pass.name(), "applying pass");
            job = pass.run(job, session, pool, donor)?;
        }
        Ok(job)
    }
}
