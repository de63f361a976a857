use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    catalog::features::{ContribFeature, TRIAL_DURATION_DAYS, TrialMode},
    types::state::EntitlementState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrialStatus {
    /// `remaining_ms` is `None` for trials without a time limit.
    Active { remaining_ms: Option<i64> },
    Expired,
    NotApplicable,
}

impl TrialStatus {
    pub fn is_usable(&self) -> bool {
        matches!(self, TrialStatus::Active { .. })
    }

    pub fn remaining(&self) -> Option<Duration> {
        match self {
            TrialStatus::Active { remaining_ms } => remaining_ms.map(Duration::milliseconds),
            _ => None,
        }
    }
}

pub fn trial_duration() -> Duration {
    Duration::days(TRIAL_DURATION_DAYS)
}

/// End of the trial window; a trial that has not started yet would end a full duration from `now`.
///
/// `None` also when the end is past the representable range, which `trial_status` reads as expired.
pub fn end_of_trial(
    feature: ContribFeature,
    state: &EntitlementState,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match feature.trial_mode() {
        TrialMode::Duration => {
            let start = state.trial_start(feature).unwrap_or(now);
            start.checked_add_signed(trial_duration())
        }
        TrialMode::None | TrialMode::Unlimited => None,
    }
}

pub fn trial_status(
    feature: ContribFeature,
    state: &EntitlementState,
    now: DateTime<Utc>,
) -> TrialStatus {
    match feature.trial_mode() {
        TrialMode::None => TrialStatus::NotApplicable,
        TrialMode::Unlimited => TrialStatus::Active { remaining_ms: None },
        TrialMode::Duration => match end_of_trial(feature, state, now) {
            Some(end) if end > now => TrialStatus::Active {
                remaining_ms: Some((end - now).num_milliseconds()),
            },
            _ => TrialStatus::Expired,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_day(day: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap() + Duration::days(day)
    }

    #[test]
    fn no_trial_policy_is_not_applicable() {
        let state = EntitlementState::default();
        assert_eq!(
            trial_status(ContribFeature::AdFree, &state, at_day(0)),
            TrialStatus::NotApplicable
        );
    }

    #[test]
    fn unlimited_trial_stays_active() {
        let mut state = EntitlementState::default();
        state.start_trial(ContribFeature::CategoryTree, at_day(0));
        assert_eq!(
            trial_status(ContribFeature::CategoryTree, &state, at_day(1000)),
            TrialStatus::Active { remaining_ms: None }
        );
    }

    #[test]
    fn duration_trial_counts_down_then_expires() {
        let mut state = EntitlementState::default();
        state.start_trial(ContribFeature::Ocr, at_day(0));

        let status = trial_status(ContribFeature::Ocr, &state, at_day(10));
        assert_eq!(status.remaining(), Some(Duration::days(50)));

        assert_eq!(
            trial_status(ContribFeature::Ocr, &state, at_day(TRIAL_DURATION_DAYS)),
            TrialStatus::Expired
        );
        assert_eq!(
            trial_status(ContribFeature::Ocr, &state, at_day(90)),
            TrialStatus::Expired
        );
    }

    #[test]
    fn unstarted_duration_trial_has_full_window() {
        let state = EntitlementState::default();
        let status = trial_status(ContribFeature::Budget, &state, at_day(3));
        assert_eq!(status.remaining(), Some(trial_duration()));
        assert_eq!(
            end_of_trial(ContribFeature::Budget, &state, at_day(3)),
            Some(at_day(3 + TRIAL_DURATION_DAYS))
        );
    }

    #[test]
    fn start_near_the_end_of_time_reads_as_expired() {
        let mut state = EntitlementState::default();
        state.trial_starts.insert(ContribFeature::Ocr, 8_210_266_876_799_999);

        assert_eq!(end_of_trial(ContribFeature::Ocr, &state, at_day(0)), None);
        assert_eq!(
            trial_status(ContribFeature::Ocr, &state, at_day(0)),
            TrialStatus::Expired
        );
    }
}
