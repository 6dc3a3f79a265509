//! The executable side of a step definition.

use async_trait::async_trait;

use crate::core::scope::StepCause;
use crate::core::step_result::ActionResult;
use crate::core::world::World;
use crate::error::StepError;
use crate::resolver::StepArgs;

use super::StepperPool;

/// Everything an operation sees while it runs: the world, the pool (for
/// nested sub-runs), and where the statement came from.
pub struct StepContext<'w> {
    pub world: &'w mut World,
    pub pool: &'w StepperPool,
    pub path: &'w str,
    pub in_line: &'w str,
    pub seq: &'w [usize],
}

impl StepContext<'_> {
    /// The provenance cause for writes made by this step.
    pub fn cause(&self) -> StepCause {
        StepCause {
            in_line: self.in_line.to_string(),
            seq: self.seq.to_vec(),
        }
    }
}

/// One operation bound to a step definition. Returning `Err` is equivalent
/// to a not-ok result; the executor converts it.
#[async_trait]
pub trait StepAction: Send + Sync {
    async fn run(
        &self,
        args: &StepArgs,
        ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError>;
}
