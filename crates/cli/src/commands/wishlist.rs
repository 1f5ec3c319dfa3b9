//! Wishlist commands.
//!
//! # Usage
//!
//! ```bash
//! tw-cli wishlist toggle classic-tee
//! tw-cli wishlist list
//! tw-cli wishlist clear
//! ```

use chrono::Utc;
use clap::Subcommand;
use theme_widgets::Dataset;
use theme_widgets::wishlist::{Wishlist, WishlistLabels, WishlistToggle, time_ago};
use theme_widgets_core::ProductHandle;

use super::{CommandError, Page};

#[derive(Debug, Subcommand)]
pub enum WishlistAction {
    /// Save a product, or remove it when already saved
    Toggle { handle: ProductHandle },
    /// List saved products, newest first
    List,
    /// Remove every saved product
    Clear,
}

/// English labels of the wishlist drawer.
fn labels() -> WishlistLabels {
    WishlistLabels::from_dataset(&Dataset::from_iter([
        ("text-moments", "moments"),
        ("text-minute", "minute"),
        ("text-minutes", "minutes"),
        ("text-hour", "hour"),
        ("text-hours", "hours"),
        ("text-day", "day"),
        ("text-days", "days"),
        ("text-ago", "ago"),
        ("text-add", "Add to wishlist"),
        ("text-remove", "Remove from wishlist"),
        ("text-price-regular", "Regular price"),
        ("text-price-sale", "Sale price"),
        ("text-price-from", "From"),
    ]))
}

/// Run a wishlist action.
///
/// # Errors
///
/// Returns an error if the store fails or the product cannot be fetched.
pub async fn run(page: &mut Page, action: WishlistAction) -> Result<(), CommandError> {
    let wishlist = Wishlist::new(
        page.store.clone(),
        page.client.clone(),
        page.sink.clone(),
        labels(),
        page.config.money_format.clone(),
    );

    match action {
        WishlistAction::Toggle { handle } => {
            let wishlist = wishlist.with_buttons([handle.as_str()]);
            match wishlist.toggle(&handle).await? {
                WishlistToggle::Added(item) => tracing::info!(title = %item.title, "saved"),
                WishlistToggle::Removed => tracing::info!(%handle, "removed"),
            }
        }
        WishlistAction::List => {
            let labels = labels();
            let now = Utc::now().timestamp_millis();
            for item in wishlist.items()? {
                print_line(&format!(
                    "{:<32} {:>10}  {}",
                    item.handle,
                    page.config.money_format.format(item.price),
                    time_ago(now - item.added_at, &labels)
                ));
            }
        }
        WishlistAction::Clear => wishlist.clear()?,
    }

    page.flush()
}

#[allow(clippy::print_stdout)]
fn print_line(line: &str) {
    println!("{line}");
}
