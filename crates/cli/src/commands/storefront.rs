//! Read-only storefront commands: variant lookup, search and shipping quotes.
//!
//! # Usage
//!
//! ```bash
//! # Which variant is "Red / M"?
//! tw-cli variant resolve classic-tee Red M
//!
//! # Predictive search
//! tw-cli search "linen shirt"
//!
//! # Shipping quote for the current cart
//! tw-cli shipping --zip 10001 --country "United States" --province "New York"
//! ```

use clap::{Args, Subcommand};
use theme_widgets::Dataset;
use theme_widgets::cart::{ShippingCalculator, ShippingEstimate, ShippingSettings};
use theme_widgets::search::{PredictiveSearch, SearchOutcome};
use theme_widgets::shopify::ShippingAddress;
use theme_widgets::variant::{self, ProductOption};
use theme_widgets_core::ProductHandle;

use super::{CommandError, Page};

#[derive(Debug, Subcommand)]
pub enum VariantAction {
    /// Resolve option values to a variant of a product
    Resolve {
        handle: ProductHandle,

        /// Option values in option order
        #[arg(required = true)]
        values: Vec<String>,
    },
}

/// Destination of a shipping quote.
#[derive(Debug, Args)]
pub struct ShippingArgs {
    #[arg(long)]
    zip: String,

    #[arg(long)]
    country: String,

    #[arg(long, default_value = "")]
    province: String,
}

/// Run a variant action.
///
/// An unmatched selection is reported, not treated as a failure.
///
/// # Errors
///
/// Returns an error if the product cannot be fetched.
pub async fn resolve(page: &Page, action: VariantAction) -> Result<(), CommandError> {
    let VariantAction::Resolve { handle, values } = action;
    let product = page.client.product(&handle).await?;

    match variant::resolve(&product.variants, &values) {
        Some(found) => print_line(&format!(
            "{} {} {} available={}",
            found.id,
            found.title,
            page.config.money_format.format(found.price),
            found.available
        )),
        None => print_line(&format!("{handle} has no variant {}", values.join(" / "))),
    }

    // Which values stay purchasable alongside this selection
    let selection: Vec<Option<String>> = values.into_iter().map(Some).collect();
    for option in options_of(&product.variants) {
        for value in &option.values {
            let available =
                variant::is_value_available(&product.variants, &selection, option.position, value);
            print_line(&format!(
                "option{} {value}: {}",
                option.position,
                if available { "available" } else { "unavailable" }
            ));
        }
    }
    Ok(())
}

/// Option dimensions as they appear across `variants`, in first-seen order.
fn options_of(variants: &[variant::Variant]) -> Vec<ProductOption> {
    let dimensions = variants.iter().map(|v| v.options.len()).max().unwrap_or(0);
    (1..=dimensions)
        .map(|position| {
            let mut values: Vec<String> = Vec::new();
            for value in variants.iter().filter_map(|v| v.option(position)) {
                if !values.iter().any(|seen| seen == value) {
                    values.push(value.to_string());
                }
            }
            ProductOption { position, values }
        })
        .collect()
}

/// Run a predictive search.
///
/// # Errors
///
/// Returns a render error; failed requests are logged.
pub async fn search(page: &mut Page, query: &str) -> Result<(), CommandError> {
    let search = PredictiveSearch::new(page.client.clone(), page.sink.clone(), "Loading...");
    if search.search(query).await? == SearchOutcome::Failed {
        tracing::warn!(query, "search returned no results section");
    }
    page.flush()
}

/// Quote shipping for the current cart.
///
/// # Errors
///
/// Returns an error if a shipping request fails outright.
pub async fn shipping(page: &mut Page, args: ShippingArgs) -> Result<(), CommandError> {
    let settings = ShippingSettings::from_dataset(
        &Dataset::new().with("text-no-results", "No shipping rates for this address."),
    );
    let calculator = ShippingCalculator::new(page.client.clone(), page.sink.clone(), settings);
    let address = ShippingAddress {
        zip: args.zip,
        country: args.country,
        province: args.province,
    };

    if let ShippingEstimate::Rates(rates) = calculator.estimate(&address).await? {
        for rate in &rates {
            print_line(&format!("{}: {} {}", rate.display_name(), rate.price, rate.currency));
        }
    }
    page.flush()
}

#[allow(clippy::print_stdout)]
fn print_line(line: &str) {
    println!("{line}");
}
