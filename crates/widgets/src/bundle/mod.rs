//! Bundle builder.
//!
//! The shopper stages products in a bundle that lives in the local store,
//! independent of the server cart, until it is added to the cart in one call
//! or sent to checkout as a cart permalink. Discount tiers are computed from
//! the staged quantity or amount.

mod tiers;
mod view;

pub use tiers::{BundleTier, TierError, TierTable};
pub use view::{BundleTotals, bundle_patches};

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use theme_widgets_core::{Money, MoneyFormat, ProductId, VariantId};
use tracing::instrument;

use crate::cart::{CartProxy, JsonPayload};
use crate::config::Dataset;
use crate::error::{Result, WidgetError, add_breadcrumb};
use crate::render::{SharedSink, apply_shared};
use crate::shopify::{CartItemInput, CartResponse, ImageRatio};
use crate::store::{KeyValueStore, read_list, update_list};

/// A staged bundle entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleItem {
    pub product_id: ProductId,
    pub product_handle: String,
    pub product_title: String,
    pub product_url: String,
    pub variant_id: VariantId,
    #[serde(default)]
    pub variant_image: String,
    pub variant_price: Money,
    #[serde(default)]
    pub variant_title: String,
    #[serde(deserialize_with = "quantity_from_text_or_number")]
    pub quantity: u32,
}

impl BundleItem {
    #[must_use]
    pub fn line_price(&self) -> Money {
        self.variant_price * self.quantity
    }
}

/// Older theme versions stored quantities as strings.
fn quantity_from_text_or_number<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// What tier thresholds measure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BundleMode {
    /// Units staged.
    #[default]
    Quantity,
    /// Staged total in major currency units.
    Amount,
}

impl BundleMode {
    /// Parse `data-bundle-mode`; anything but `amount` counts units.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("amount") {
            Self::Amount
        } else {
            Self::Quantity
        }
    }

    /// Data attribute declaring this mode's tiers.
    #[must_use]
    pub const fn tiers_attribute(self) -> &'static str {
        match self {
            Self::Quantity => "bundle-quantity-tiers",
            Self::Amount => "bundle-amount-tiers",
        }
    }
}

/// Builder settings read from its data attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleSettings {
    pub bundle_id: String,
    pub mode: BundleMode,
    pub tiers: TierTable,
    /// Progress at which the bar is full, in the units progress is measured
    /// in; zero means the last threshold.
    pub max_tier_value: Decimal,
    /// Units required before the bundle can be added (0 = none).
    pub min_items: u32,
    /// Units after which no more can be staged (0 = unlimited).
    pub max_items: u32,
    pub cart_url: String,
    pub text_promo_amount: String,
    pub text_promo_quantity: String,
    pub text_promo_final: String,
    pub text_remove: String,
    pub img_ratio: ImageRatio,
}

impl BundleSettings {
    /// Read settings from the builder element.
    ///
    /// Tiers come from the attribute matching the mode
    /// (`bundle-amount-tiers` or `bundle-quantity-tiers`), falling back to
    /// `bundle-tiers`. The theme declares `max-tier-value` in cents in amount
    /// mode; it is stored in major units here.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::Config` for a missing `bundle-id` or a bad
    /// number, and `WidgetError::Tier` for a malformed tier list.
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        let mode = BundleMode::parse(dataset.get("bundle-mode").unwrap_or_default());
        let declared = dataset
            .get(mode.tiers_attribute())
            .or_else(|| dataset.get("bundle-tiers"))
            .unwrap_or_default();
        let tiers = TierTable::parse(declared)?;

        let max_tier_value: Decimal = dataset.parse_or("max-tier-value", Decimal::ZERO)?;
        let max_tier_value = match mode {
            BundleMode::Amount => max_tier_value / Decimal::ONE_HUNDRED,
            BundleMode::Quantity => max_tier_value,
        };

        Ok(Self {
            bundle_id: dataset.require("bundle-id")?.to_string(),
            mode,
            tiers,
            max_tier_value,
            min_items: dataset.parse_or("bundle-min", 0)?,
            max_items: dataset.parse_or("bundle-max", 0)?,
            cart_url: dataset.get("cart-url").unwrap_or("/cart").to_string(),
            text_promo_amount: dataset.text("text-promo-amount"),
            text_promo_quantity: dataset.text("text-promo-quantity"),
            text_promo_final: dataset.text("text-promo-final"),
            text_remove: dataset.get("text-remove").unwrap_or("Remove").to_string(),
            img_ratio: ImageRatio::parse(dataset.get("img-ratio").unwrap_or_default()),
        })
    }

    /// Store key of this builder's contents.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("ks-bundle-{}", self.bundle_id)
    }

    /// Progress value of a full bar.
    #[must_use]
    pub fn goal(&self) -> Decimal {
        if self.max_tier_value > Decimal::ZERO {
            self.max_tier_value
        } else {
            self.tiers.last_threshold().unwrap_or(Decimal::ZERO)
        }
    }
}

/// A bundle builder bound to its store key and page.
pub struct BundleAccumulator {
    settings: BundleSettings,
    key: String,
    store: Arc<dyn KeyValueStore>,
    sink: SharedSink,
    money_format: MoneyFormat,
}

impl BundleAccumulator {
    #[must_use]
    pub fn new(
        settings: BundleSettings,
        store: Arc<dyn KeyValueStore>,
        sink: SharedSink,
        money_format: MoneyFormat,
    ) -> Self {
        Self {
            key: settings.storage_key(),
            settings,
            store,
            sink,
            money_format,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &BundleSettings {
        &self.settings
    }

    /// Staged entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::Store` only when the store backend fails; bad
    /// stored data reads as an empty bundle.
    pub fn contents(&self) -> Result<Vec<BundleItem>> {
        let items = read_list(self.store.as_ref(), &self.key)?;
        Ok(validated(&self.key, items))
    }

    #[must_use]
    pub fn totals(&self, items: &[BundleItem]) -> BundleTotals {
        BundleTotals::of(items, &self.settings)
    }

    /// Stage `selection`, merging into an existing entry for the same variant.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::InvalidQuantity` for a zero quantity or one that
    /// would overflow the merged entry, or a store or render error.
    #[instrument(skip(self, selection), fields(bundle = %self.settings.bundle_id, variant_id = %selection.variant_id))]
    pub fn add_item(&self, selection: BundleItem) -> Result<Vec<BundleItem>> {
        if selection.quantity == 0 {
            return Err(WidgetError::InvalidQuantity);
        }
        add_breadcrumb(
            "bundle",
            "Add to bundle",
            Some(&[("variant_id", &selection.variant_id.to_string())]),
        );

        let mut overflowed = false;
        let items = self.update(|mut items| {
            match items
                .iter_mut()
                .find(|item| item.variant_id == selection.variant_id)
            {
                Some(existing) => {
                    let Some(quantity) = existing.quantity.checked_add(selection.quantity) else {
                        overflowed = true;
                        return None;
                    };
                    existing.quantity = quantity;
                }
                None => items.push(selection.clone()),
            }
            Some(items)
        })?;

        if overflowed {
            tracing::warn!(quantity = selection.quantity, "bundle quantity out of range");
            return Err(WidgetError::InvalidQuantity);
        }
        Ok(items.unwrap_or_default())
    }

    /// Drop the entry for `variant_id`.
    ///
    /// # Errors
    ///
    /// Returns a store or render error.
    #[instrument(skip(self), fields(bundle = %self.settings.bundle_id))]
    pub fn remove_item(&self, variant_id: VariantId) -> Result<Vec<BundleItem>> {
        let items = self.update(|mut items| {
            items.retain(|item| item.variant_id != variant_id);
            Some(items)
        })?;
        Ok(items.unwrap_or_default())
    }

    /// Set an entry's quantity; zero removes it.
    ///
    /// Returns `None`, without persisting or rendering, when the variant is
    /// not staged.
    ///
    /// # Errors
    ///
    /// Returns a store or render error.
    #[instrument(skip(self), fields(bundle = %self.settings.bundle_id))]
    pub fn set_quantity(
        &self,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<Option<Vec<BundleItem>>> {
        self.update(|mut items| {
            let index = items
                .iter()
                .position(|item| item.variant_id == variant_id)?;
            if quantity == 0 {
                items.remove(index);
            } else if let Some(item) = items.get_mut(index) {
                item.quantity = quantity;
            }
            Some(items)
        })
    }

    /// Empty the bundle.
    ///
    /// # Errors
    ///
    /// Returns a store or render error.
    pub fn clear(&self) -> Result<()> {
        self.store.remove(&self.key)?;
        self.render(&[])
    }

    /// Re-render the builder from the stored contents.
    ///
    /// # Errors
    ///
    /// Returns a store or render error.
    pub fn refresh(&self) -> Result<()> {
        let items = self.contents()?;
        self.render(&items)
    }

    /// Add every staged entry to the cart in one call, then clear the bundle.
    ///
    /// The bundle is kept when the cart rejects the add.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::EmptyBundle` when nothing is staged, or the
    /// cart proxy's error.
    #[instrument(skip(self, proxy), fields(bundle = %self.settings.bundle_id))]
    pub async fn add_to_cart(&self, proxy: &CartProxy) -> Result<Arc<CartResponse>> {
        let items = self.contents()?;
        if items.is_empty() {
            return Err(WidgetError::EmptyBundle);
        }

        let inputs: Vec<CartItemInput> = items
            .iter()
            .map(|item| CartItemInput {
                id: item.variant_id,
                quantity: item.quantity,
                selling_plan: None,
            })
            .collect();
        tracing::debug!(lines = inputs.len(), "adding bundle to cart");

        let response = proxy.add(JsonPayload::items(&inputs)).await?;
        self.clear()?;
        Ok(response)
    }

    /// Cart permalink `<cart_url>/<variant>:<qty>,...` for the staged
    /// entries. The bundle is cleared once the link is built.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::EmptyBundle` when nothing is staged.
    pub fn checkout_url(&self) -> Result<String> {
        let items = self.contents()?;
        if items.is_empty() {
            return Err(WidgetError::EmptyBundle);
        }

        let lines = items
            .iter()
            .map(|item| format!("{}:{}", item.variant_id, item.quantity))
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/{lines}", self.settings.cart_url.trim_end_matches('/'));

        self.clear()?;
        Ok(url)
    }

    /// Persist a mutation of the list, then render the result.
    fn update<F>(&self, mut mutate: F) -> Result<Option<Vec<BundleItem>>>
    where
        F: FnMut(Vec<BundleItem>) -> Option<Vec<BundleItem>>,
    {
        let updated = update_list(self.store.as_ref(), &self.key, |items| {
            mutate(validated(&self.key, items))
        })?;

        if let Some(items) = &updated {
            self.render(items)?;
        }
        Ok(updated)
    }

    fn render(&self, items: &[BundleItem]) -> Result<()> {
        let patches = bundle_patches(items, &self.settings, &self.money_format)?;
        apply_shared(&self.sink, &patches)?;
        Ok(())
    }
}

/// Discard a stored list with duplicate variants or empty entries.
fn validated(key: &str, items: Vec<BundleItem>) -> Vec<BundleItem> {
    let mut seen = HashSet::with_capacity(items.len());
    let valid = items
        .iter()
        .all(|item| item.quantity > 0 && seen.insert(item.variant_id));

    if valid {
        items
    } else {
        tracing::warn!(key, "discarding inconsistent bundle contents");
        Vec::new()
    }
}
