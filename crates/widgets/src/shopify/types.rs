//! Wire types of the storefront AJAX API.
//!
//! The AJAX endpoints (`/cart/*.js`, `/products/<handle>.js`) speak plain
//! JSON with prices in integer cents; these types mirror only the fields the
//! widgets read. Unknown fields are ignored, and everything else in a cart
//! response is kept as raw JSON for event consumers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use theme_widgets_core::{Money, ProductId};

use crate::variant::Variant;

// =============================================================================
// Cart
// =============================================================================

/// A request body for a cart endpoint, already normalized.
#[derive(Debug, Clone, PartialEq)]
pub enum CartRequest {
    /// `application/x-www-form-urlencoded` fields, in order.
    Form(Vec<(String, String)>),
    /// `application/json` document.
    Json(Value),
}

/// A successful cart call: the response body plus re-rendered sections.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CartResponse {
    /// Section id → rendered HTML. A `null` value means the section failed to render.
    #[serde(default)]
    pub sections: BTreeMap<String, Option<String>>,
    /// The rest of the response (line items, or the whole cart for change/update).
    #[serde(flatten)]
    pub body: serde_json::Map<String, Value>,
}

impl CartResponse {
    /// Rendered HTML of a section, if present and rendered.
    #[must_use]
    pub fn section(&self, id: &str) -> Option<&str> {
        self.sections.get(id).and_then(Option::as_deref)
    }

    /// Total item count, when the body is a cart.
    #[must_use]
    pub fn item_count(&self) -> Option<u64> {
        self.body.get("item_count").and_then(Value::as_u64)
    }

    /// Discount codes reported by an update call.
    #[must_use]
    pub fn discount_codes(&self) -> Vec<DiscountCode> {
        self.body
            .get("discount_codes")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

/// A discount code attached to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DiscountCode {
    pub code: String,
    #[serde(default)]
    pub applicable: bool,
}

/// A failed cart call as shown to the shopper.
///
/// Both `message` and `description` are always populated: missing fields in
/// the endpoint's error body are filled from the HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartErrorDetail {
    pub status: Option<u16>,
    pub message: String,
    pub description: String,
}

/// Error body as returned by the cart endpoints (`{status, message, description}`).
#[derive(Debug, Default, Deserialize)]
struct RawCartError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    description: Option<Value>,
}

impl CartErrorDetail {
    /// Build from an HTTP status and the (possibly non-JSON) response body.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let raw: RawCartError = serde_json::from_str(body).unwrap_or_default();
        let fallback = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .map_or_else(|| format!("HTTP {status}"), str::to_string);

        let message = raw
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback);
        let description = match raw.description {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::Null | Value::String(_)) | None => message.clone(),
            Some(other) => other.to_string(),
        };

        Self {
            status: Some(status),
            message,
            description,
        }
    }

    /// A failure that never produced an HTTP response.
    #[must_use]
    pub fn network(error: &impl std::fmt::Display) -> Self {
        let message = "Network error".to_string();
        Self {
            status: None,
            description: error.to_string(),
            message,
        }
    }

    /// Alert markup: the description alone when it repeats the message.
    #[must_use]
    pub fn alert_html(&self) -> String {
        if self.message == self.description {
            self.description.clone()
        } else {
            format!("<b>{}</b> - {}", self.message, self.description)
        }
    }
}

/// One line of a JSON add request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemInput {
    pub id: theme_widgets_core::VariantId,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selling_plan: Option<theme_widgets_core::SellingPlanId>,
}

// =============================================================================
// Product
// =============================================================================

/// Product JSON from `/products/<handle>.js`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProductJson {
    pub id: ProductId,
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub url: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub price_varies: bool,
    #[serde(default)]
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub media: Vec<ProductMedia>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl ProductJson {
    /// Storefront path of the product page.
    #[must_use]
    pub fn path(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| format!("/products/{}", self.handle))
    }

    /// Second image, falling back to the featured image.
    #[must_use]
    pub fn secondary_image(&self) -> Option<String> {
        self.images
            .get(1)
            .cloned()
            .or_else(|| self.featured_image.clone())
    }

    /// Alt text of the first media item.
    #[must_use]
    pub fn image_alt(&self) -> Option<String> {
        self.media.first().and_then(|m| m.alt.clone())
    }
}

/// A media entry of a product.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProductMedia {
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub position: Option<u32>,
}

// =============================================================================
// Shipping
// =============================================================================

/// Destination used to estimate shipping rates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingAddress {
    pub zip: String,
    pub country: String,
    pub province: String,
}

impl ShippingAddress {
    /// Query pairs in the form the shipping endpoints expect.
    #[must_use]
    pub fn query_pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("shipping_address[zip]", &self.zip),
            ("shipping_address[country]", &self.country),
            ("shipping_address[province]", &self.province),
        ]
    }
}

/// A quoted shipping rate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ShippingRate {
    pub name: String,
    #[serde(default)]
    pub presentment_name: Option<String>,
    /// Decimal price in major units, as the endpoint formats it.
    pub price: String,
    pub currency: String,
}

impl ShippingRate {
    /// Name shown to the shopper.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.presentment_name.as_deref().unwrap_or(&self.name)
    }
}

/// Body of `/cart/async_shipping_rates.json`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ShippingRatesBody {
    #[serde(default)]
    pub shipping_rates: Option<Vec<ShippingRate>>,
}

/// One rejected field of a shipping address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub messages: String,
}

/// Result of asking the storefront to start computing shipping rates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareOutcome {
    Accepted,
    /// The address was rejected, with per-field messages.
    Rejected(Vec<FieldError>),
}

impl PrepareOutcome {
    /// Parse a rejection body such as `{"zip": ["is not valid"]}`.
    #[must_use]
    pub fn rejected_from_body(body: &str) -> Self {
        let fields: BTreeMap<String, Value> = serde_json::from_str(body).unwrap_or_default();
        let errors = fields
            .into_iter()
            .map(|(field, value)| {
                let messages = match value {
                    Value::Array(items) => items
                        .iter()
                        .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                        .collect::<Vec<_>>()
                        .join(","),
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                FieldError { field, messages }
            })
            .collect();
        Self::Rejected(errors)
    }
}
