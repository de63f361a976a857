use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{catalog::tier::LicenceStatus, utils::error::LicenceError};

pub const TRIAL_DURATION_DAYS: i64 = 60;
pub const FREE_ACCOUNTS: u32 = 5;
pub const FREE_PLANS: u32 = 3;
pub const FREE_SPLIT_TEMPLATES: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrialMode {
    None,
    /// Usable for `TRIAL_DURATION_DAYS` after the first usage.
    Duration,
    /// Usable without time limit, with a reminder on every use.
    Unlimited,
}

/// Features gated behind a licence tier or an add-on purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContribFeature {
    AccountsUnlimited,
    PlansUnlimited,
    SplitTransaction,
    Distribution,
    Print,
    AdFree,
    CsvImport,
    Synchronization,
    SplitTemplate,
    ProSupport,
    RoadmapVoting,
    History,
    Budget,
    Ocr,
    WebUi,
    CategoryTree,
}

impl ContribFeature {
    pub const ALL: [ContribFeature; 16] = [
        ContribFeature::AccountsUnlimited,
        ContribFeature::PlansUnlimited,
        ContribFeature::SplitTransaction,
        ContribFeature::Distribution,
        ContribFeature::Print,
        ContribFeature::AdFree,
        ContribFeature::CsvImport,
        ContribFeature::Synchronization,
        ContribFeature::SplitTemplate,
        ContribFeature::ProSupport,
        ContribFeature::RoadmapVoting,
        ContribFeature::History,
        ContribFeature::Budget,
        ContribFeature::Ocr,
        ContribFeature::WebUi,
        ContribFeature::CategoryTree,
    ];

    pub fn trial_mode(&self) -> TrialMode {
        match self {
            ContribFeature::AccountsUnlimited
            | ContribFeature::PlansUnlimited
            | ContribFeature::AdFree
            | ContribFeature::SplitTemplate
            | ContribFeature::ProSupport
            | ContribFeature::RoadmapVoting => TrialMode::None,
            ContribFeature::CategoryTree => TrialMode::Unlimited,
            _ => TrialMode::Duration,
        }
    }

    pub fn licence_status(&self) -> LicenceStatus {
        match self {
            ContribFeature::AccountsUnlimited
            | ContribFeature::PlansUnlimited
            | ContribFeature::SplitTransaction
            | ContribFeature::Distribution
            | ContribFeature::Print
            | ContribFeature::AdFree => LicenceStatus::Contrib,
            ContribFeature::CsvImport | ContribFeature::Synchronization => LicenceStatus::Extended,
            _ => LicenceStatus::Professional,
        }
    }

    pub fn is_satisfied_by(&self, held: LicenceStatus) -> bool {
        held.satisfies(self.licence_status())
    }

    pub fn is_extended(&self) -> bool {
        self.licence_status() == LicenceStatus::Extended
    }

    pub fn is_professional(&self) -> bool {
        self.licence_status() == LicenceStatus::Professional
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContribFeature::AccountsUnlimited => "ACCOUNTS_UNLIMITED",
            ContribFeature::PlansUnlimited => "PLANS_UNLIMITED",
            ContribFeature::SplitTransaction => "SPLIT_TRANSACTION",
            ContribFeature::Distribution => "DISTRIBUTION",
            ContribFeature::Print => "PRINT",
            ContribFeature::AdFree => "AD_FREE",
            ContribFeature::CsvImport => "CSV_IMPORT",
            ContribFeature::Synchronization => "SYNCHRONIZATION",
            ContribFeature::SplitTemplate => "SPLIT_TEMPLATE",
            ContribFeature::ProSupport => "PRO_SUPPORT",
            ContribFeature::RoadmapVoting => "ROADMAP_VOTING",
            ContribFeature::History => "HISTORY",
            ContribFeature::Budget => "BUDGET",
            ContribFeature::Ocr => "OCR",
            ContribFeature::WebUi => "WEB_UI",
            ContribFeature::CategoryTree => "CATEGORY_TREE",
        }
    }

    /// Preference key holding the timestamp of the first usage.
    pub fn pref_key(&self) -> String {
        format!("FEATURE_{}_FIRST_USAGE", self.name())
    }
}

pub fn required_tier(feature: ContribFeature) -> LicenceStatus {
    feature.licence_status()
}

pub fn trial_policy(feature: ContribFeature) -> TrialMode {
    feature.trial_mode()
}

pub fn is_satisfied_by(feature: ContribFeature, held: LicenceStatus) -> bool {
    feature.is_satisfied_by(held)
}

impl fmt::Display for ContribFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_lowercase())
    }
}

impl FromStr for ContribFeature {
    type Err = LicenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        ContribFeature::ALL
            .into_iter()
            .find(|feature| feature.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| LicenceError::ValidationError(format!("unknown feature: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_matches_tier_and_trial_table() {
        assert_eq!(required_tier(ContribFeature::Print), LicenceStatus::Contrib);
        assert_eq!(required_tier(ContribFeature::CsvImport), LicenceStatus::Extended);
        assert_eq!(required_tier(ContribFeature::Ocr), LicenceStatus::Professional);

        assert_eq!(trial_policy(ContribFeature::AdFree), TrialMode::None);
        assert_eq!(trial_policy(ContribFeature::Synchronization), TrialMode::Duration);
        assert_eq!(trial_policy(ContribFeature::CategoryTree), TrialMode::Unlimited);
        assert_eq!(trial_policy(ContribFeature::SplitTemplate), TrialMode::None);
    }

    #[test]
    fn satisfied_by_held_tier_or_above() {
        assert!(is_satisfied_by(ContribFeature::CsvImport, LicenceStatus::Extended));
        assert!(is_satisfied_by(ContribFeature::CsvImport, LicenceStatus::Professional));
        assert!(!is_satisfied_by(ContribFeature::CsvImport, LicenceStatus::Contrib));
        assert!(!is_satisfied_by(ContribFeature::Print, LicenceStatus::Free));
    }

    #[test]
    fn names_round_trip_through_display_and_parse() {
        for feature in ContribFeature::ALL {
            let parsed: ContribFeature = feature.to_string().parse().unwrap();
            assert_eq!(parsed, feature);
        }
        assert_eq!(ContribFeature::WebUi.to_string(), "web_ui");
        assert_eq!("web-ui".parse::<ContribFeature>().unwrap(), ContribFeature::WebUi);
        assert!("teleport".parse::<ContribFeature>().is_err());
    }

    #[test]
    fn pref_key_uses_upper_case_name() {
        assert_eq!(ContribFeature::Ocr.pref_key(), "FEATURE_OCR_FIRST_USAGE");
    }
}
