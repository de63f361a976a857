use crate::types::purchase::{ProductDetails, PurchaseRecord};

/// Everything the billing side can tell the licence worker.
#[derive(Debug, Clone, PartialEq)]
pub enum BillingEvent {
    PurchasesUpdated {
        purchases: Vec<PurchaseRecord>,
        new_purchase: bool,
    },
    PurchaseCanceled,
    PurchaseFailed {
        code: i32,
    },
    ProductDetails(Vec<ProductDetails>),
}

impl BillingEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            BillingEvent::PurchasesUpdated { .. } => "purchases_updated",
            BillingEvent::PurchaseCanceled => "purchase_canceled",
            BillingEvent::PurchaseFailed { .. } => "purchase_failed",
            BillingEvent::ProductDetails(_) => "product_details",
        }
    }
}
