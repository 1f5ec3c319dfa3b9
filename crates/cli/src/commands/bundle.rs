//! Bundle builder commands.
//!
//! # Usage
//!
//! ```bash
//! # Stage two units of a variant in bundle "summer"
//! tw-cli bundle --bundle-id summer --tiers "2:5;4:10" add classic-tee --variant 4242 -q 2
//!
//! # Show the staged contents and totals
//! tw-cli bundle --bundle-id summer show
//!
//! # Send the bundle to the cart
//! tw-cli bundle --bundle-id summer add-to-cart
//! ```

use std::sync::Arc;

use clap::{Args, Subcommand};
use theme_widgets::bundle::{BundleAccumulator, BundleItem, BundleMode, BundleSettings};
use theme_widgets::cart::CartProxy;
use theme_widgets::{Dataset, SharedSink};
use theme_widgets_core::{ProductHandle, VariantId};

use super::{CommandError, Page};

/// Bundle builder settings, as the section's data attributes would carry them.
#[derive(Debug, Args)]
pub struct BundleArgs {
    /// Bundle section id (`data-bundle-id`)
    #[arg(long)]
    bundle_id: String,

    /// Progress mode: `quantity` or `amount`
    #[arg(long, default_value = "quantity")]
    mode: String,

    /// Discount tiers, `threshold:percent;...`
    #[arg(long, default_value = "")]
    tiers: String,

    /// Progress bar goal, in cents in amount mode (defaults to the last tier)
    #[arg(long)]
    max_tier_value: Option<String>,

    /// Minimum units before the bundle can be bought
    #[arg(long)]
    min: Option<String>,

    /// Maximum units in the bundle
    #[arg(long)]
    max: Option<String>,
}

impl BundleArgs {
    fn dataset(&self, cart_url: &str) -> Dataset {
        let tiers_attribute = BundleMode::parse(&self.mode).tiers_attribute();
        let mut dataset = Dataset::new()
            .with("bundle-id", self.bundle_id.as_str())
            .with("bundle-mode", self.mode.as_str())
            .with(tiers_attribute, self.tiers.as_str())
            .with("cart-url", cart_url)
            .with("text-promo-amount", "Add {{ amount }} more to save {{ discount }}")
            .with("text-promo-quantity", "Add {{ count }} more to save {{ discount }}")
            .with("text-promo-final", "You unlocked the best discount!");
        for (key, value) in [
            ("max-tier-value", &self.max_tier_value),
            ("bundle-min", &self.min),
            ("bundle-max", &self.max),
        ] {
            if let Some(value) = value {
                dataset.insert(key, value.as_str());
            }
        }
        dataset
    }
}

#[derive(Debug, Subcommand)]
pub enum BundleAction {
    /// Stage a product variant
    Add {
        /// Product handle
        handle: ProductHandle,

        /// Variant id (defaults to the first variant)
        #[arg(long)]
        variant: Option<VariantId>,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a staged variant
    Remove { variant: VariantId },
    /// Set the quantity of a staged variant (0 removes it)
    Set { variant: VariantId, quantity: u32 },
    /// Show the staged contents and totals
    Show,
    /// Empty the bundle
    Clear,
    /// Print the cart permalink for the bundle and empty it
    Checkout,
    /// Add the whole bundle to the cart
    AddToCart,
}

/// Run a bundle action.
///
/// # Errors
///
/// Returns an error if the settings are invalid, the store fails, or a
/// storefront call fails.
pub async fn run(page: &mut Page, args: &BundleArgs, action: BundleAction) -> Result<(), CommandError> {
    let settings = BundleSettings::from_dataset(&args.dataset(&page.config.routes.cart))?;
    let sink: SharedSink = page.sink.clone();
    let bundle = BundleAccumulator::new(
        settings,
        page.store.clone(),
        sink.clone(),
        page.config.money_format.clone(),
    );

    match action {
        BundleAction::Add {
            handle,
            variant,
            quantity,
        } => {
            let item = staged_item(page, &handle, variant, quantity).await?;
            bundle.add_item(item)?;
        }
        BundleAction::Remove { variant } => {
            bundle.remove_item(variant)?;
        }
        BundleAction::Set { variant, quantity } => {
            if bundle.set_quantity(variant, quantity)?.is_none() {
                tracing::warn!(%variant, "variant is not in the bundle");
            }
        }
        BundleAction::Show => {
            let items = bundle.contents()?;
            show(&bundle, &items, &page.config.money_format);
        }
        BundleAction::Clear => bundle.clear()?,
        BundleAction::Checkout => {
            let url = bundle.checkout_url()?;
            print_line(&url);
        }
        BundleAction::AddToCart => {
            let proxy = CartProxy::new(
                page.client.clone(),
                page.bus.clone(),
                sink,
                page.config.sections_url.clone(),
            );
            let cart = bundle.add_to_cart(&proxy).await?;
            tracing::info!(item_count = ?cart.item_count(), "bundle added to cart");
        }
    }

    page.flush()
}

async fn staged_item(
    page: &Page,
    handle: &ProductHandle,
    variant_id: Option<VariantId>,
    quantity: u32,
) -> Result<BundleItem, CommandError> {
    let product = page.client.product(handle).await?;
    let variant = match variant_id {
        Some(id) => product.variants.iter().find(|v| v.id == id),
        None => product.variants.first(),
    }
    .ok_or_else(|| CommandError::UnknownVariant {
        handle: handle.to_string(),
        variant: variant_id.map_or_else(|| "(first)".to_string(), |id| id.to_string()),
    })?;

    Ok(BundleItem {
        product_id: product.id,
        product_handle: product.handle.clone(),
        product_title: product.title.clone(),
        product_url: product.path(),
        variant_id: variant.id,
        variant_image: product.featured_image.clone().unwrap_or_default(),
        variant_price: variant.price,
        variant_title: variant.title.clone(),
        quantity,
    })
}

fn show(
    bundle: &BundleAccumulator,
    items: &[BundleItem],
    money_format: &theme_widgets_core::MoneyFormat,
) {
    for item in items.iter().rev() {
        print_line(&format!(
            "{} x {} ({}) {}",
            item.quantity,
            item.product_title,
            item.variant_title,
            money_format.format(item.line_price())
        ));
    }
    let totals = bundle.totals(items);
    print_line(&format!(
        "{} units, total {}, discount {}%, you pay {}",
        totals.quantity,
        money_format.format(totals.total),
        totals.discount,
        money_format.format(totals.discounted_total())
    ));
    if let Some(next) = bundle.settings().tiers.next_tier(totals.progress) {
        print_line(&format!(
            "next tier: {} for {}%",
            next.threshold, next.discount_percent
        ));
    }
}

#[allow(clippy::print_stdout)]
fn print_line(line: &str) {
    println!("{line}");
}
