use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseState {
    Purchased,
    Pending,
    /// Any state code the billing channel reports besides the two above.
    Other(i32),
}

impl PurchaseState {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => PurchaseState::Purchased,
            2 => PurchaseState::Pending,
            other => PurchaseState::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    /// A purchase may bundle several products; the first one decides the licence.
    pub products: Vec<String>,
    pub purchase_state: PurchaseState,
    #[serde(default)]
    pub order_id: Option<String>,
    pub purchase_token: String,
    #[serde(default)]
    pub acknowledged: bool,
}

impl PurchaseRecord {
    pub fn new(product: impl Into<String>, purchase_state: PurchaseState, token: impl Into<String>) -> Self {
        Self {
            products: vec![product.into()],
            purchase_state,
            order_id: None,
            purchase_token: token.into(),
            acknowledged: false,
        }
    }

    pub fn primary_product(&self) -> Option<&str> {
        self.products.first().map(String::as_str)
    }

    pub fn is_purchased(&self) -> bool {
        self.purchase_state == PurchaseState::Purchased
    }

    pub fn is_pending(&self) -> bool {
        self.purchase_state == PurchaseState::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    InApp,
    Subs,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::InApp => "inapp",
            ProductType::Subs => "subs",
        }
    }
}

/// Store listing for a product, as returned by the billing channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub product_id: String,
    pub product_type: ProductType,
    pub formatted_price: String,
}

/// Terminal outcome of a purchase flow launched by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PurchaseInitiationResult {
    Success,
    UserCancelled,
    Failed { code: i32 },
}

impl PurchaseInitiationResult {
    pub fn from_response_code(code: i32) -> Self {
        match code {
            0 => PurchaseInitiationResult::Success,
            1 => PurchaseInitiationResult::UserCancelled,
            other => PurchaseInitiationResult::Failed { code: other },
        }
    }
}
