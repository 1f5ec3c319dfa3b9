//! Option picker of a product form.

use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use theme_widgets_core::{Money, MoneyFormat};
use tracing::instrument;

use super::{ProductOption, Variant, availability_patches, resolve};
use crate::config::Dataset;
use crate::error::{Result, add_breadcrumb};
use crate::events::{EventBus, ThemeEvent};
use crate::render::{Patch, SharedSink, Target, apply_shared};
use crate::shopify::StorefrontClient;

/// Labels of the add-to-cart button.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonLabels {
    pub add: String,
    pub sold_out: String,
    pub unavailable: String,
}

/// How the sale badge expresses the saving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiscountDisplay {
    Percentage,
    #[default]
    Amount,
}

/// Sale badge template, e.g. `Save {{ value }}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaleBadge {
    pub text: String,
    pub display: DiscountDisplay,
}

impl SaleBadge {
    /// Badge text for `variant`.
    #[must_use]
    pub fn render(&self, variant: &Variant, money_format: &MoneyFormat) -> String {
        let compare = variant.compare_at_price.unwrap_or(Money::ZERO);
        let value = match self.display {
            DiscountDisplay::Percentage => format!("{}%", percent_saved(variant.price, compare)),
            DiscountDisplay::Amount => money_format.format(compare - variant.price),
        };
        self.text.replace("{{ value }}", &value)
    }
}

fn percent_saved(price: Money, compare: Money) -> i64 {
    if compare.cents() <= 0 {
        return 0;
    }
    let paid = (Decimal::from(price.cents()) / Decimal::from(compare.cents())
        * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    100 - paid.to_i64().unwrap_or(100)
}

/// Settings of a product form and its option picker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductSettings {
    /// Product page path, fetched per variant for `variant:newDoc`.
    pub product_url: String,
    /// Whether the form is the main product of a product page, whose URL
    /// tracks the selected variant.
    pub on_product_page: bool,
    pub labels: ButtonLabels,
    /// Whether the form has a buy-now button.
    pub buy_button: bool,
    pub sale_badge: Option<SaleBadge>,
}

impl ProductSettings {
    /// Read settings from the form's data attributes.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::Config` when `product-url` is missing.
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        let sale_badge = dataset.get("badge-text").map(|text| SaleBadge {
            text: text.to_string(),
            display: if dataset.get("discount-type") == Some("percentage") {
                DiscountDisplay::Percentage
            } else {
                DiscountDisplay::Amount
            },
        });

        Ok(Self {
            product_url: dataset.require("product-url")?.to_string(),
            on_product_page: dataset.get("page-type") == Some("product"),
            labels: ButtonLabels {
                add: dataset.text("text-add"),
                sold_out: dataset.text("text-sold-out"),
                unavailable: dataset.text("text-unavailable"),
            },
            buy_button: dataset.parse_or("buy-button", false)?,
            sale_badge,
        })
    }
}

/// Button states for a resolved (or unresolved) selection.
#[must_use]
pub fn button_patches(variant: Option<&Variant>, settings: &ProductSettings) -> Vec<Patch> {
    let labels = &settings.labels;
    let Some(variant) = variant else {
        return vec![
            Patch::text(Target::ADD_BUTTON, labels.unavailable.clone()),
            Patch::disabled(Target::ADD_BUTTON, true),
        ];
    };

    let label = if variant.available {
        &labels.add
    } else {
        &labels.sold_out
    };
    let mut patches = vec![
        Patch::text(Target::ADD_BUTTON, label.clone()),
        Patch::disabled(Target::ADD_BUTTON, !variant.available),
    ];
    if settings.buy_button {
        patches.push(Patch::disabled(Target::BUY_BUTTON, !variant.available));
    }
    patches
}

/// Price block for `variant`.
#[must_use]
pub fn pricing_patches(
    variant: &Variant,
    settings: &ProductSettings,
    money_format: &MoneyFormat,
) -> Vec<Patch> {
    let mut patches = vec![
        Patch::attr(
            Target::PRICE,
            "data-has-price-compare",
            variant.on_sale().to_string(),
        ),
        Patch::attr(Target::PRICE, "data-sold-out", (!variant.available).to_string()),
        Patch::text(
            Target::PRICE_COMPARE,
            money_format.format(variant.compare_at_price.unwrap_or(Money::ZERO)),
        ),
        Patch::text(Target::PRICE_AMOUNT, money_format.format(variant.price)),
    ];
    if let Some(badge) = &settings.sale_badge {
        patches.push(Patch::text(
            Target::PRICE_SALE_BADGE,
            badge.render(variant, money_format),
        ));
    }
    patches
}

/// The option picker of one product form.
pub struct ProductOptions {
    variants: Arc<[Variant]>,
    options: Vec<ProductOption>,
    selection: Vec<Option<String>>,
    settings: ProductSettings,
    client: StorefrontClient,
    bus: EventBus,
    sink: SharedSink,
    money_format: MoneyFormat,
}

impl ProductOptions {
    /// Create a picker over `variants` starting from `selection` (one entry
    /// per option, `None` when nothing is checked yet).
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        variants: Vec<Variant>,
        options: Vec<ProductOption>,
        selection: Vec<Option<String>>,
        settings: ProductSettings,
        client: StorefrontClient,
        bus: EventBus,
        sink: SharedSink,
        money_format: MoneyFormat,
    ) -> Self {
        Self {
            variants: variants.into(),
            options,
            selection,
            settings,
            client,
            bus,
            sink,
            money_format,
        }
    }

    /// Parse the embedded `data-product-variants-json` script.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` for malformed JSON.
    pub fn parse_variants(json: &str) -> std::result::Result<Vec<Variant>, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    #[must_use]
    pub fn selection(&self) -> &[Option<String>] {
        &self.selection
    }

    /// The variant matching the current selection.
    #[must_use]
    pub fn selected_variant(&self) -> Option<&Variant> {
        let values: Option<Vec<&str>> = self.selection.iter().map(Option::as_deref).collect();
        resolve(&self.variants, &values?)
    }

    /// Mark option values on first render.
    ///
    /// # Errors
    ///
    /// Returns a render error when an option input is missing.
    pub fn initialize(&self) -> Result<()> {
        apply_shared(
            &self.sink,
            &availability_patches(&self.variants, &self.options, &self.selection),
        )?;
        Ok(())
    }

    /// Select `value` for option `position` (1-based) and apply the result.
    ///
    /// # Errors
    ///
    /// See [`ProductOptions::on_change`].
    pub async fn select(&mut self, position: usize, value: &str) -> Result<Option<Arc<Variant>>> {
        let Some(index) = position.checked_sub(1) else {
            return Ok(None);
        };
        if self.selection.len() <= index {
            self.selection.resize(index + 1, None);
        }
        if let Some(slot) = self.selection.get_mut(index) {
            *slot = Some(value.to_string());
        }
        self.on_change().await
    }

    /// Resolve the current selection and update the form.
    ///
    /// A selection matching no variant leaves add-to-cart disabled with the
    /// unavailable label; that is a normal state, not an error. A failed
    /// product page fetch is logged and no `variant:newDoc` is emitted.
    ///
    /// # Errors
    ///
    /// Returns a render error when the form lacks an element it needs.
    #[instrument(skip(self))]
    pub async fn on_change(&self) -> Result<Option<Arc<Variant>>> {
        let variant = self.selected_variant().cloned().map(Arc::new);
        apply_shared(&self.sink, &button_patches(variant.as_deref(), &self.settings))?;

        let Some(variant) = variant else {
            tracing::debug!(selection = ?self.selection, "selection matches no variant");
            return Ok(None);
        };
        add_breadcrumb(
            "product",
            "Variant selected",
            Some(&[("variant_id", &variant.id.to_string())]),
        );

        let mut patches = vec![Patch::value(Target::VARIANT_ID_INPUT, variant.id.to_string())];
        if self.settings.on_product_page {
            patches.push(Patch::SetUrlParam {
                name: "variant".to_string(),
                value: variant.id.to_string(),
            });
        }
        patches.extend(availability_patches(
            &self.variants,
            &self.options,
            &self.selection,
        ));
        patches.extend(pricing_patches(&variant, &self.settings, &self.money_format));
        apply_shared(&self.sink, &patches)?;

        self.bus.publish(ThemeEvent::VariantChange(Arc::clone(&variant)));

        match self.fetch_variant_page(&variant).await {
            Ok(html) => {
                self.bus.publish(ThemeEvent::VariantNewDoc(html.into()));
            }
            Err(e) => {
                tracing::warn!(variant_id = %variant.id, error = %e, "failed to fetch variant page");
            }
        }

        Ok(Some(variant))
    }

    async fn fetch_variant_page(&self, variant: &Variant) -> Result<String> {
        let mut url = self.client.url(&self.settings.product_url)?;
        url.query_pairs_mut()
            .append_pair("variant", &variant.id.to_string());
        Ok(self.client.page(url).await?)
    }
}
