//! Wishlist.
//!
//! Saved products are snapshots taken from the product JSON when the shopper
//! adds them and are never refreshed. They live in the local store under
//! `ks-wishlist`, oldest first, and are shown newest first.

mod view;

pub use view::{WishlistLabels, time_ago, wishlist_patches};

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use theme_widgets_core::{Money, MoneyFormat, ProductHandle, ProductId};
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::render::{SharedSink, apply_shared};
use crate::shopify::{ProductJson, StorefrontClient};
use crate::store::{KeyValueStore, read_list, update_list};

/// Store key of the wishlist.
pub const STORAGE_KEY: &str = "ks-wishlist";

/// A saved product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub handle: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub title: String,
    #[serde(rename = "img_src", default)]
    pub image: Option<String>,
    #[serde(rename = "img_2_src", default)]
    pub secondary_image: Option<String>,
    #[serde(rename = "img_alt", default)]
    pub image_alt: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub price_varies: bool,
    /// Epoch milliseconds.
    pub added_at: i64,
}

impl WishlistItem {
    /// Snapshot `product` as saved at `added_at`.
    #[must_use]
    pub fn from_product(product: &ProductJson, added_at: i64) -> Self {
        Self {
            handle: product.handle.clone(),
            url: product.path(),
            product_id: product.id,
            title: product.title.clone(),
            image: product.featured_image.clone(),
            secondary_image: product.secondary_image(),
            image_alt: product.image_alt(),
            price: product.price,
            compare_at_price: product.compare_at_price,
            price_varies: product.price_varies,
            added_at,
        }
    }

    #[must_use]
    pub fn on_sale(&self) -> bool {
        self.compare_at_price.is_some_and(|compare| compare > self.price)
    }
}

/// What a toggle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WishlistToggle {
    Added(WishlistItem),
    Removed,
}

/// The wishlist drawer and every wishlist button on the page.
pub struct Wishlist {
    store: Arc<dyn KeyValueStore>,
    client: StorefrontClient,
    sink: SharedSink,
    labels: WishlistLabels,
    money_format: MoneyFormat,
    /// Handles of the wishlist buttons rendered on the page.
    buttons: Vec<String>,
}

impl Wishlist {
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        client: StorefrontClient,
        sink: SharedSink,
        labels: WishlistLabels,
        money_format: MoneyFormat,
    ) -> Self {
        Self {
            store,
            client,
            sink,
            labels,
            money_format,
            buttons: Vec::new(),
        }
    }

    /// Register the wishlist buttons present on the page.
    #[must_use]
    pub fn with_buttons<I, S>(mut self, handles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.buttons = handles.into_iter().map(Into::into).collect();
        self
    }

    /// Saved products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::Store` when the backend fails.
    pub fn items(&self) -> Result<Vec<WishlistItem>> {
        let mut items = self.stored()?;
        items.reverse();
        Ok(items)
    }

    /// Whether `handle` is saved.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::Store` when the backend fails.
    pub fn contains(&self, handle: &ProductHandle) -> Result<bool> {
        Ok(self
            .stored()?
            .iter()
            .any(|item| item.handle == handle.as_str()))
    }

    /// Remove `handle` when saved, otherwise fetch the product and save it.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::Storefront` when the product cannot be fetched,
    /// or a store or render error.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn toggle(&self, handle: &ProductHandle) -> Result<WishlistToggle> {
        if self.contains(handle)? {
            add_breadcrumb("wishlist", "Remove from wishlist", Some(&[("handle", handle.as_str())]));
            self.update(|mut items| {
                items.retain(|item| item.handle != handle.as_str());
                Some(items)
            })?;
            return Ok(WishlistToggle::Removed);
        }

        add_breadcrumb("wishlist", "Add to wishlist", Some(&[("handle", handle.as_str())]));
        let product = self.client.product(handle).await?;
        let item = WishlistItem::from_product(&product, Utc::now().timestamp_millis());

        self.update(|mut items| {
            if items.iter().any(|saved| saved.handle == item.handle) {
                return Some(items);
            }
            items.push(item.clone());
            Some(items)
        })?;
        Ok(WishlistToggle::Added(item))
    }

    /// Remove everything.
    ///
    /// # Errors
    ///
    /// Returns a store or render error.
    pub fn clear(&self) -> Result<()> {
        self.store.remove(STORAGE_KEY)?;
        self.render(&[])
    }

    /// Re-render badges, buttons and the list from the store.
    ///
    /// # Errors
    ///
    /// Returns a store or render error.
    pub fn refresh(&self) -> Result<()> {
        let items = self.stored()?;
        self.render(&items)
    }

    fn stored(&self) -> Result<Vec<WishlistItem>> {
        Ok(validated(read_list(self.store.as_ref(), STORAGE_KEY)?))
    }

    fn update<F>(&self, mut mutate: F) -> Result<()>
    where
        F: FnMut(Vec<WishlistItem>) -> Option<Vec<WishlistItem>>,
    {
        let updated = update_list(self.store.as_ref(), STORAGE_KEY, |items| {
            mutate(validated(items))
        })?;
        if let Some(items) = updated {
            self.render(&items)?;
        }
        Ok(())
    }

    fn render(&self, items: &[WishlistItem]) -> Result<()> {
        let patches = wishlist_patches(
            items,
            &self.buttons,
            &self.labels,
            &self.money_format,
            Utc::now().timestamp_millis(),
        )?;
        apply_shared(&self.sink, &patches)?;
        Ok(())
    }
}

fn validated(items: Vec<WishlistItem>) -> Vec<WishlistItem> {
    let mut seen = HashSet::with_capacity(items.len());
    if items.iter().all(|item| seen.insert(item.handle.clone())) {
        items
    } else {
        tracing::warn!(key = STORAGE_KEY, "discarding wishlist with duplicate products");
        Vec::new()
    }
}
