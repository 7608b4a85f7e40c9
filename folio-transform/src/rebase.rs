//! Rebasing local steps over steps confirmed by the authority.

use crate::error::StepResult;
use crate::step::Step;
use crate::transform::Transform;
use folio_model::Node;
use folio_types::TransactionId;
use tracing::trace;

/// A local step together with its inverse and the transaction it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Rebaseable {
    pub step: Step,
    pub inverted: Step,
    pub origin: TransactionId,
}

impl Rebaseable {
    /// Pairs `step` with its inverse against `doc`, the document it applies to.
    pub fn new(step: Step, doc: &Node, origin: TransactionId) -> StepResult<Self> {
        let inverted = step.invert(doc)?;
        Ok(Self {
            step,
            inverted,
            origin,
        })
    }
}

/// Undoes `steps`, applies `over`, then reapplies each of `steps` mapped
/// through everything that happened since it was undone.
///
/// Steps whose target was deleted, or that no longer apply, are dropped.
/// Each surviving step is recorded as the mirror of its inverse so positions
/// inside content it restores map back to where they were. Fails only when
/// one of the inverses or one of `over` does not apply.
pub fn rebase_steps(
    steps: &[Rebaseable],
    over: &[Step],
    transform: &mut Transform,
) -> StepResult<Vec<Rebaseable>> {
    for step in steps.iter().rev() {
        transform.step(step.inverted.clone())?;
    }
    for step in over {
        transform.step(step.clone())?;
    }
    let mut result = Vec::with_capacity(steps.len());
    let mut map_from = steps.len();
    for step in steps {
        let mapped = step.step.map(&transform.mapping().slice_from(map_from));
        map_from -= 1;
        let Some(mapped) = mapped else {
            trace!(origin = %step.origin, "pending step dropped while rebasing");
            continue;
        };
        if transform.maybe_step(mapped.clone()).is_err() {
            trace!(origin = %step.origin, "rebased step no longer applies");
            continue;
        }
        let last = transform.steps().len() - 1;
        transform.set_mirror(map_from, last);
        let before = &transform.docs()[last];
        result.push(Rebaseable::new(mapped, before, step.origin)?);
    }
    Ok(result)
}
