use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    catalog::{features::ContribFeature, tier::LicenceStatus},
    types::purchase::ProductType,
    utils::error::LicenceError,
};

pub const SKU_CONTRIB: &str = "sku_premium";
pub const SKU_EXTENDED: &str = "sku_extended";
pub const SKU_UPGRADE: &str = "sku_premium2extended";
pub const SKU_EXTENDED_SUB: &str = "extended_sub";
pub const SKU_PROFESSIONAL_MONTHLY: &str = "sku_professional_monthly";
pub const SKU_PROFESSIONAL_YEARLY: &str = "sku_professional_yearly";
pub const SKU_EXTENDED2PROFESSIONAL_MONTHLY: &str = "sku_extended2professional_monthly";
pub const SKU_EXTENDED2PROFESSIONAL_YEARLY: &str = "sku_extended2professional_yearly";

const ADD_ON_PREFIX: &str = "addon_";

/// Maps a product id to the licence it grants, if any.
pub fn licence_for_sku(sku: &str) -> Option<LicenceStatus> {
    match sku {
        SKU_CONTRIB => Some(LicenceStatus::Contrib),
        SKU_EXTENDED | SKU_UPGRADE | SKU_EXTENDED_SUB => Some(LicenceStatus::Extended),
        SKU_PROFESSIONAL_MONTHLY
        | SKU_PROFESSIONAL_YEARLY
        | SKU_EXTENDED2PROFESSIONAL_MONTHLY
        | SKU_EXTENDED2PROFESSIONAL_YEARLY => Some(LicenceStatus::Professional),
        _ => None,
    }
}

pub fn product_type_for_sku(sku: &str) -> ProductType {
    match licence_for_sku(sku) {
        Some(LicenceStatus::Professional) => ProductType::Subs,
        _ => ProductType::InApp,
    }
}

/// Features that can be bought on their own, independent of the licence tier.
pub fn is_add_on_eligible(feature: ContribFeature) -> bool {
    feature.licence_status() > LicenceStatus::Contrib
        && !matches!(
            feature,
            ContribFeature::ProSupport | ContribFeature::RoadmapVoting
        )
}

/// Maps a product id to the add-on feature it unlocks, if any.
pub fn parse_add_on(sku: &str) -> Option<ContribFeature> {
    let name = sku.strip_prefix(ADD_ON_PREFIX)?;
    let feature = name.parse::<ContribFeature>().ok()?;
    is_add_on_eligible(feature).then_some(feature)
}

pub fn add_on_sku(feature: ContribFeature) -> String {
    format!("{}{}", ADD_ON_PREFIX, feature)
}

/// Purchasable units offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Package {
    Contrib,
    Extended,
    /// Contrib holders moving to Extended.
    Upgrade,
    ProfessionalMonthly,
    ProfessionalYearly,
    AddOn(ContribFeature),
}

impl Package {
    pub fn sku(&self) -> String {
        match self {
            Package::Contrib => SKU_CONTRIB.to_string(),
            Package::Extended => SKU_EXTENDED.to_string(),
            Package::Upgrade => SKU_UPGRADE.to_string(),
            Package::ProfessionalMonthly => SKU_PROFESSIONAL_MONTHLY.to_string(),
            Package::ProfessionalYearly => SKU_PROFESSIONAL_YEARLY.to_string(),
            Package::AddOn(feature) => add_on_sku(*feature),
        }
    }

    pub fn product_type(&self) -> ProductType {
        match self {
            Package::ProfessionalMonthly | Package::ProfessionalYearly => ProductType::Subs,
            _ => ProductType::InApp,
        }
    }

    pub fn all() -> Vec<Package> {
        let mut packages = vec![
            Package::Contrib,
            Package::Extended,
            Package::Upgrade,
            Package::ProfessionalMonthly,
            Package::ProfessionalYearly,
        ];
        packages.extend(
            ContribFeature::ALL
                .into_iter()
                .filter(|f| is_add_on_eligible(*f))
                .map(Package::AddOn),
        );
        packages
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Package::Contrib => f.write_str("contrib"),
            Package::Extended => f.write_str("extended"),
            Package::Upgrade => f.write_str("upgrade"),
            Package::ProfessionalMonthly => f.write_str("professional_monthly"),
            Package::ProfessionalYearly => f.write_str("professional_yearly"),
            Package::AddOn(feature) => write!(f, "addon_{}", feature),
        }
    }
}

impl FromStr for Package {
    type Err = LicenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "contrib" => Ok(Package::Contrib),
            "extended" => Ok(Package::Extended),
            "upgrade" => Ok(Package::Upgrade),
            "professional_monthly" => Ok(Package::ProfessionalMonthly),
            "professional_yearly" => Ok(Package::ProfessionalYearly),
            other => parse_add_on(other)
                .map(Package::AddOn)
                .ok_or_else(|| LicenceError::ValidationError(format!("unknown package: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_table() {
        assert_eq!(licence_for_sku("sku_premium"), Some(LicenceStatus::Contrib));
        assert_eq!(licence_for_sku("extended_sub"), Some(LicenceStatus::Extended));
        assert_eq!(
            licence_for_sku("sku_extended2professional_yearly"),
            Some(LicenceStatus::Professional)
        );
        assert_eq!(licence_for_sku("addon_ocr"), None);
        assert_eq!(licence_for_sku("something_else"), None);
    }

    #[test]
    fn professional_skus_are_subscriptions() {
        assert_eq!(product_type_for_sku(SKU_PROFESSIONAL_MONTHLY), ProductType::Subs);
        assert_eq!(product_type_for_sku(SKU_EXTENDED), ProductType::InApp);
        assert_eq!(Package::ProfessionalYearly.product_type(), ProductType::Subs);
        assert_eq!(Package::AddOn(ContribFeature::Ocr).product_type(), ProductType::InApp);
    }

    #[test]
    fn add_on_parsing_only_accepts_eligible_features() {
        assert_eq!(parse_add_on("addon_ocr"), Some(ContribFeature::Ocr));
        assert_eq!(parse_add_on("addon_csv_import"), Some(ContribFeature::CsvImport));
        assert_eq!(parse_add_on("addon_print"), None);
        assert_eq!(parse_add_on("addon_pro_support"), None);
        assert_eq!(parse_add_on("sku_extended"), None);
    }

    #[test]
    fn packages_parse_from_their_display_form() {
        for package in Package::all() {
            assert_eq!(package.to_string().parse::<Package>().unwrap(), package);
        }
        assert_eq!(Package::AddOn(ContribFeature::WebUi).sku(), "addon_web_ui");
        assert!("lifetime".parse::<Package>().is_err());
    }
}
