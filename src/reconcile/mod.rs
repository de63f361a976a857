pub mod outcome;
pub mod reconciler;

pub use outcome::{GracePolicy, PolicyViolation, ReconcileOutcome};
pub use reconciler::{find_highest_valid_purchase, reconcile};
