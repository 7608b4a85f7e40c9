//! Steps, position mapping and transactions for folio documents.
//!
//! Every change to a document is expressed as a sequence of [`Step`]s:
//! - [`Step`]: an atomic, invertible, JSON-serializable change
//! - [`StepMap`] / [`Mapping`]: how positions move through steps
//! - [`Transform`]: a document plus the steps applied to it
//! - [`Transaction`]: a transform carrying selection, stored marks and metadata
//! - [`rebase_steps`]: replays unconfirmed local steps over confirmed remote ones
//!
//! Steps are position-addressed, so two replicas that apply the same steps
//! in the same order end up with the same document.

mod error;
mod map;
mod rebase;
mod selection;
mod step;
mod transaction;
mod transform;

pub use error::{StepError, StepResult};
pub use map::{Assoc, MapResult, Mapping, StepMap};
pub use rebase::{rebase_steps, Rebaseable};
pub use selection::Selection;
pub use step::{Step, StepJson};
pub use transaction::{Transaction, META_ADD_TO_HISTORY, META_REBASED, META_REMOTE};
pub use transform::Transform;
