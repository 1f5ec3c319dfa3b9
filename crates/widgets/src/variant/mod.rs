//! Variant resolution.
//!
//! A product page embeds its variants as JSON. Selecting option values
//! resolves to the variant whose option tuple matches exactly; the result
//! fans out to the gallery, inventory bar, sticky bar and friends through
//! `variant:change` and `variant:newDoc`.

mod form;
mod listeners;
mod options;

pub use form::{ProductForm, QtyBreakGroup, QtyBreakOffer, Upsell, buy_url, form_payload};
pub use listeners::{InventoryBar, MediaGallery, QtySwitcher, StickyAtc};
pub use options::{
    ButtonLabels, DiscountDisplay, ProductOptions, ProductSettings, SaleBadge, button_patches,
    pricing_patches,
};

use serde::{Deserialize, Serialize};
use theme_widgets_core::{MediaId, Money, VariantId};

use crate::render::{Patch, Target};

/// A product variant as embedded in `data-product-variants-json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    #[serde(default)]
    pub title: String,
    /// Option values in option order.
    pub options: Vec<String>,
    pub price: Money,
    #[serde(default)]
    pub compare_at_price: Option<Money>,
    pub available: bool,
    #[serde(default)]
    pub featured_media: Option<FeaturedMedia>,
}

impl Variant {
    /// Whether the variant sells below its compare-at price.
    #[must_use]
    pub fn on_sale(&self) -> bool {
        self.compare_at_price.is_some_and(|compare| compare > self.price)
    }

    /// Value of option `position` (1-based).
    #[must_use]
    pub fn option(&self, position: usize) -> Option<&str> {
        self.options
            .get(position.checked_sub(1)?)
            .map(String::as_str)
    }
}

/// Media shown for a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedMedia {
    pub id: MediaId,
    /// 1-based position in the product's media list.
    pub position: usize,
}

/// The variant whose options equal `selected`, in order.
#[must_use]
pub fn resolve<'a, S: AsRef<str>>(variants: &'a [Variant], selected: &[S]) -> Option<&'a Variant> {
    variants.iter().find(|variant| {
        variant.options.len() == selected.len()
            && variant
                .options
                .iter()
                .zip(selected)
                .all(|(option, value)| option == value.as_ref())
    })
}

/// One option dimension of a product (Color, Size ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductOption {
    /// 1-based option position.
    pub position: usize,
    /// Candidate values in display order.
    pub values: Vec<String>,
}

/// Whether `value` at `position` can still be bought given the other
/// dimensions currently selected. Unselected dimensions match anything.
#[must_use]
pub fn is_value_available(
    variants: &[Variant],
    selection: &[Option<String>],
    position: usize,
    value: &str,
) -> bool {
    variants.iter().filter(|v| v.available).any(|variant| {
        variant.option(position) == Some(value)
            && selection.iter().enumerate().all(|(index, selected)| {
                let other = index + 1;
                other == position
                    || selected
                        .as_deref()
                        .is_none_or(|selected| variant.option(other) == Some(selected))
            })
    })
}

/// Mark every candidate value available or not.
#[must_use]
pub fn availability_patches(
    variants: &[Variant],
    options: &[ProductOption],
    selection: &[Option<String>],
) -> Vec<Patch> {
    let mut patches = Vec::new();
    for option in options {
        for value in &option.values {
            let target = Target::option_value(option.position, value);
            if is_value_available(variants, selection, option.position, value) {
                patches.push(Patch::class(target.clone(), "disabled", false));
                patches.push(Patch::remove_attr(target, "aria-disabled"));
            } else {
                patches.push(Patch::class(target.clone(), "disabled", true));
                patches.push(Patch::attr(target, "aria-disabled", "true"));
            }
        }
    }
    patches
}
