pub mod features;
pub mod strings;
pub mod tier;
pub mod trial;

pub use features::{ContribFeature, TrialMode, is_satisfied_by, required_tier, trial_policy};
pub use tier::LicenceStatus;
pub use trial::{TrialStatus, end_of_trial, trial_status};
