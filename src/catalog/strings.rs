//! User-facing text derived from the catalog.

use chrono::{DateTime, Utc};

use crate::{
    catalog::{
        features::{
            ContribFeature, FREE_ACCOUNTS, FREE_PLANS, FREE_SPLIT_TEMPLATES, TRIAL_DURATION_DAYS,
            TrialMode,
        },
        tier::LicenceStatus,
    },
    types::state::EntitlementState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialButton {
    RemindLater,
    No,
}

pub fn label(feature: ContribFeature) -> &'static str {
    match feature {
        ContribFeature::AccountsUnlimited => "Unlimited accounts",
        ContribFeature::PlansUnlimited => "Unlimited plans",
        ContribFeature::SplitTransaction => "Split transactions",
        ContribFeature::Distribution => "Distribution",
        ContribFeature::Print => "Print",
        ContribFeature::AdFree => "Ad-free",
        ContribFeature::CsvImport => "CSV import",
        ContribFeature::Synchronization => "Synchronization",
        ContribFeature::SplitTemplate => "Split templates",
        ContribFeature::ProSupport => "Priority support",
        ContribFeature::RoadmapVoting => "Roadmap voting",
        ContribFeature::History => "History",
        ContribFeature::Budget => "Budget",
        ContribFeature::Ocr => "OCR",
        ContribFeature::WebUi => "Web UI",
        ContribFeature::CategoryTree => "Category tree",
    }
}

pub fn requires_string(feature: ContribFeature) -> String {
    format!("Requires licence: {}", feature.licence_status())
}

/// Limitation text shown in the contrib dialog; `current` is the licence the user holds.
pub fn usage_limit_string(feature: ContribFeature, current: LicenceStatus) -> String {
    match feature {
        ContribFeature::AccountsUnlimited => format!(
            "The number of accounts is limited to {}. Current licence: {}.",
            FREE_ACCOUNTS, current
        ),
        ContribFeature::PlansUnlimited => format!(
            "The number of plans is limited to {}. Current licence: {}.",
            FREE_PLANS, current
        ),
        ContribFeature::SplitTemplate => format!(
            "You can create {} split template. Current licence: {}.",
            FREE_SPLIT_TEMPLATES, current
        ),
        _ => match feature.trial_mode() {
            TrialMode::Duration => format!(
                "You can try this feature for {} days. Current licence: {}.",
                TRIAL_DURATION_DAYS, current
            ),
            TrialMode::Unlimited => format!(
                "You can use this feature, a reminder is shown on each use. Current licence: {}.",
                current
            ),
            TrialMode::None => String::new(),
        },
    }
}

pub fn limit_reached_warning(feature: ContribFeature) -> String {
    format!("The trial period for {} has ended.", label(feature))
}

/// Only duration trials have a countdown.
pub fn usages_left_string(
    feature: ContribFeature,
    end_of_trial: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<String> {
    if feature.trial_mode() != TrialMode::Duration {
        return None;
    }
    if end_of_trial < now {
        Some(limit_reached_warning(feature))
    } else {
        Some(format!(
            "You can try {} until {}.",
            label(feature),
            end_of_trial.format("%Y-%m-%d")
        ))
    }
}

pub fn full_info_string(feature: ContribFeature, current: LicenceStatus) -> String {
    let info = format!(
        "{} is a premium feature, available with licence {}.",
        label(feature),
        feature.licence_status()
    );
    let limit = usage_limit_string(feature, current);
    if limit.is_empty() {
        info
    } else {
        format!("{} {}", info, limit)
    }
}

pub fn trial_button(feature: ContribFeature) -> TrialButton {
    match feature.trial_mode() {
        TrialMode::Unlimited => TrialButton::RemindLater,
        _ => TrialButton::No,
    }
}

/// One-line summary such as `Extended (+ OCR, Budget)`.
pub fn describe_status(state: &EntitlementState) -> String {
    let add_ons = state
        .add_on_features
        .iter()
        .map(|f| label(*f))
        .collect::<Vec<_>>()
        .join(", ");

    match (state.licence, add_ons.is_empty()) {
        (Some(licence), true) => licence.label().to_string(),
        (Some(licence), false) => format!("{} (+ {})", licence.label(), add_ons),
        (None, false) => format!("+ {}", add_ons),
        (None, true) => String::new(),
    }
}
