//! Shipping rate calculator in the cart drawer.

use askama::Template;
use tracing::instrument;

use crate::config::Dataset;
use crate::error::{Result, add_breadcrumb};
use crate::render::{Patch, SharedSink, Target, apply_shared};
use crate::shopify::{FieldError, PrepareOutcome, ShippingAddress, ShippingRate, StorefrontClient};

/// Settings read from the calculator's data attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingSettings {
    /// Message shown when the address has no rates (`data-text-no-results`).
    pub text_no_results: String,
    /// Country names allowed in the selector (`data-allowed-countries`); empty allows all.
    pub allowed_countries: Vec<String>,
}

impl ShippingSettings {
    /// Read settings from the calculator element.
    #[must_use]
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let allowed_countries = dataset
            .get("allowed-countries")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            text_no_results: dataset.text("text-no-results"),
            allowed_countries,
        }
    }

    /// Keep only the selector options that are allowed.
    #[must_use]
    pub fn filter_countries(&self, options: &[String]) -> Vec<String> {
        if self.allowed_countries.is_empty() {
            return options.to_vec();
        }
        options
            .iter()
            .filter(|option| self.allowed_countries.contains(option))
            .cloned()
            .collect()
    }
}

/// Outcome of a rate estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShippingEstimate {
    Rates(Vec<ShippingRate>),
    NoRates,
    /// The storefront rejected the address.
    Invalid(Vec<FieldError>),
}

impl ShippingEstimate {
    const fn alert_type(&self) -> &'static str {
        match self {
            Self::Rates(_) => "success",
            Self::NoRates => "warning",
            Self::Invalid(_) => "error",
        }
    }
}

struct RateView<'a> {
    name: &'a str,
    price: &'a str,
    currency: &'a str,
}

#[derive(Template)]
#[template(path = "cart/shipping_rates.html")]
struct ShippingRatesTemplate<'a> {
    rates: Vec<RateView<'a>>,
}

#[derive(Template)]
#[template(path = "cart/shipping_errors.html")]
struct ShippingErrorsTemplate<'a> {
    errors: &'a [FieldError],
}

/// Patches showing `estimate` in the calculator alert.
///
/// # Errors
///
/// Returns `askama::Error` if a template fails to render.
pub fn estimate_patches(
    estimate: &ShippingEstimate,
    settings: &ShippingSettings,
) -> std::result::Result<Vec<Patch>, askama::Error> {
    let html = match estimate {
        ShippingEstimate::Rates(rates) => ShippingRatesTemplate {
            rates: rates
                .iter()
                .map(|r| RateView {
                    name: r.display_name(),
                    price: &r.price,
                    currency: &r.currency,
                })
                .collect(),
        }
        .render()?,
        ShippingEstimate::NoRates => format!("<p>{}</p>", settings.text_no_results),
        ShippingEstimate::Invalid(errors) => ShippingErrorsTemplate { errors }.render()?,
    };

    Ok(vec![
        Patch::inner_html(Target::SHIPPING_ALERT, html),
        Patch::attr(Target::SHIPPING_ALERT, "data-alert-type", estimate.alert_type()),
        Patch::hidden(Target::SHIPPING_ALERT, false),
    ])
}

/// Estimates shipping for the current cart.
pub struct ShippingCalculator {
    client: StorefrontClient,
    sink: SharedSink,
    settings: ShippingSettings,
}

impl ShippingCalculator {
    #[must_use]
    pub fn new(client: StorefrontClient, sink: SharedSink, settings: ShippingSettings) -> Self {
        Self {
            client,
            sink,
            settings,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &ShippingSettings {
        &self.settings
    }

    /// Request rates for `address` and show the result.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::Storefront` when a request fails outright; the
    /// alert is left as it was.
    #[instrument(skip(self))]
    pub async fn estimate(&self, address: &ShippingAddress) -> Result<ShippingEstimate> {
        add_breadcrumb(
            "cart",
            "Estimate shipping",
            Some(&[("country", &address.country)]),
        );
        apply_shared(&self.sink, &button_patches(true))?;
        let result = self.fetch(address).await;
        apply_shared(&self.sink, &button_patches(false))?;

        let estimate = result?;
        apply_shared(&self.sink, &estimate_patches(&estimate, &self.settings)?)?;
        Ok(estimate)
    }

    async fn fetch(&self, address: &ShippingAddress) -> Result<ShippingEstimate> {
        match self.client.prepare_shipping_rates(address).await? {
            PrepareOutcome::Rejected(errors) => Ok(ShippingEstimate::Invalid(errors)),
            PrepareOutcome::Accepted => {
                let rates = self.client.async_shipping_rates(address).await?;
                if rates.is_empty() {
                    Ok(ShippingEstimate::NoRates)
                } else {
                    Ok(ShippingEstimate::Rates(rates))
                }
            }
        }
    }
}

fn button_patches(busy: bool) -> Vec<Patch> {
    vec![
        Patch::class(Target::SHIPPING_BUTTON, "loading", busy),
        Patch::disabled(Target::SHIPPING_BUTTON, busy),
        if busy {
            Patch::attr(Target::SHIPPING_BUTTON, "aria-busy", "true")
        } else {
            Patch::remove_attr(Target::SHIPPING_BUTTON, "aria-busy")
        },
    ]
}
