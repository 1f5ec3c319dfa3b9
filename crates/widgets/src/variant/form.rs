//! Product form submission, quantity breaks and buy-now.

use std::sync::Arc;

use rust_decimal::Decimal;
use theme_widgets_core::{Money, MoneyFormat, VariantId};
use tracing::instrument;

use super::{Variant, resolve};
use crate::cart::{CartProxy, FormPayload};
use crate::error::Result;
use crate::render::{Patch, SharedSink, Target, apply_shared};
use crate::shopify::CartResponse;

/// A checked upsell offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upsell {
    pub id: VariantId,
    pub quantity: u32,
}

/// The add payload of a product form.
///
/// `qty_break` is the value of the checked quantity-break offer, a
/// comma-separated list of variant ids; when present it replaces the form's
/// own `id` and `quantity`. Upsells are appended as extra items.
#[must_use]
pub fn form_payload(mut fields: FormPayload, qty_break: Option<&str>, upsells: &[Upsell]) -> FormPayload {
    if let Some(offer) = qty_break.map(str::trim).filter(|o| !o.is_empty()) {
        fields.delete("id");
        fields.delete("quantity");
        for (index, id) in offer.split(',').map(str::trim).enumerate() {
            fields.append(&format!("items[qty-breaks-{index}][id]"), id);
            fields.append(&format!("items[qty-breaks-{index}][quantity]"), "1");
        }
    }

    for (index, upsell) in upsells.iter().enumerate() {
        fields.append(&format!("items[upsells-{index}][id]"), upsell.id.to_string());
        fields.append(
            &format!("items[upsells-{index}][quantity]"),
            upsell.quantity.to_string(),
        );
    }
    fields
}

/// Cart permalink sending one variant straight to checkout.
#[must_use]
pub fn buy_url(cart_url: &str, variant_id: VariantId, quantity: Option<u32>) -> String {
    format!(
        "{}/{variant_id}:{}",
        cart_url.trim_end_matches('/'),
        quantity.unwrap_or(1)
    )
}

/// Submits a product form through the cart proxy.
#[derive(Clone)]
pub struct ProductForm {
    proxy: CartProxy,
    sink: SharedSink,
}

impl ProductForm {
    #[must_use]
    pub fn new(proxy: CartProxy, sink: SharedSink) -> Self {
        Self { proxy, sink }
    }

    /// Add the form to the cart, holding the add button busy meanwhile.
    ///
    /// # Errors
    ///
    /// Returns the cart proxy's error; the button is released either way.
    #[instrument(skip_all)]
    pub async fn submit(
        &self,
        fields: FormPayload,
        qty_break: Option<&str>,
        upsells: &[Upsell],
    ) -> Result<Arc<CartResponse>> {
        let payload = form_payload(fields, qty_break, upsells);
        tracing::debug!(fields = ?payload.fields(), "submitting product form");

        apply_shared(&self.sink, &add_button_patches(true))?;
        let result = self.proxy.add(payload).await;
        apply_shared(&self.sink, &add_button_patches(false))?;
        result
    }
}

fn add_button_patches(busy: bool) -> Vec<Patch> {
    vec![
        Patch::class(Target::ADD_BUTTON, "loading", busy),
        Patch::disabled(Target::ADD_BUTTON, busy),
        Patch::attr(Target::ADD_BUTTON, "aria-busy", busy.to_string()),
    ]
}

/// A quantity-break offer: several units, each with its own options, sold
/// together at a discount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QtyBreakGroup {
    /// `data-group` of the offer.
    pub group: String,
    pub discount_percent: Decimal,
    /// Selected option values of each unit.
    pub rows: Vec<Vec<String>>,
}

/// Resolved figures of a quantity-break offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QtyBreakOffer {
    pub total: Money,
    pub discounted: Money,
    pub variant_ids: Vec<VariantId>,
}

impl QtyBreakOffer {
    /// Radio value: the variant ids, comma separated.
    #[must_use]
    pub fn value(&self) -> String {
        self.variant_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl QtyBreakGroup {
    /// Resolve each unit; units matching no variant are left out.
    #[must_use]
    pub fn offer(&self, variants: &[Variant]) -> QtyBreakOffer {
        let resolved: Vec<&Variant> = self
            .rows
            .iter()
            .filter_map(|row| resolve(variants, row))
            .collect();
        let total = resolved.iter().map(|v| v.price).sum::<Money>();

        QtyBreakOffer {
            total,
            discounted: total.discounted(self.discount_percent),
            variant_ids: resolved.iter().map(|v| v.id).collect(),
        }
    }

    /// Patches showing the offer after a unit's options changed.
    #[must_use]
    pub fn patches(&self, variants: &[Variant], money_format: &MoneyFormat) -> Vec<Patch> {
        let offer = self.offer(variants);
        let mut patches = vec![Patch::text(
            Target::qty_break(&self.group, "[data-total]"),
            money_format.format(offer.discounted),
        )];
        if self.discount_percent > Decimal::ZERO {
            patches.push(Patch::text(
                Target::qty_break(&self.group, "[data-compare-total]"),
                money_format.format(offer.total),
            ));
        }
        patches.push(Patch::value(
            Target::qty_break(&self.group, "input[type='radio']"),
            offer.value(),
        ));
        patches
    }
}
