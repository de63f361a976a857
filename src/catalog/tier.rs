use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::utils::error::LicenceError;

/// Licence tiers, ordered from the default upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenceStatus {
    #[default]
    Free,
    Contrib,
    Extended,
    Professional,
}

impl LicenceStatus {
    pub const ALL: [LicenceStatus; 4] = [
        LicenceStatus::Free,
        LicenceStatus::Contrib,
        LicenceStatus::Extended,
        LicenceStatus::Professional,
    ];

    /// Whether holding `self` is enough for something that requires `required`.
    pub fn satisfies(self, required: LicenceStatus) -> bool {
        self >= required
    }

    pub fn label(&self) -> &'static str {
        match self {
            LicenceStatus::Free => "Free",
            LicenceStatus::Contrib => "Contrib",
            LicenceStatus::Extended => "Extended",
            LicenceStatus::Professional => "Professional",
        }
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            LicenceStatus::Free => "FREE",
            LicenceStatus::Contrib => "CONTRIB",
            LicenceStatus::Extended => "EXTENDED",
            LicenceStatus::Professional => "PROFESSIONAL",
        }
    }
}

impl fmt::Display for LicenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LicenceStatus {
    type Err = LicenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LicenceStatus::ALL
            .into_iter()
            .find(|status| status.as_key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LicenceError::ValidationError(format!("unknown licence status: {}", s)))
    }
}
