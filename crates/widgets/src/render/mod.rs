//! View patches and pluggable render sinks.
//!
//! Widgets never touch a document directly. Each render step is a pure
//! function from widget state (or a server response) to an ordered list of
//! [`Patch`]es; a [`RenderSink`] applies them to whatever the target is - the
//! in-memory [`Document`] model, a [`Snapshot`] recorder in tests, or a
//! browser bridge. [`RenderSink::apply_all`] returns only after every patch
//! has been applied, which is the completion signal follow-up steps (such as
//! restoring focus) wait on.

mod document;
pub mod fragment;

pub use document::{Document, Node};

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Errors raised while producing or applying patches.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A patch addressed an element the document does not contain.
    #[error("render target not found: {0}")]
    MissingTarget(String),

    /// A server-rendered section did not contain an expected element.
    #[error("section {section} has no element matching {selector}")]
    MissingFragment { section: String, selector: String },

    /// The shared sink lock was poisoned by a panicking renderer.
    #[error("render sink lock poisoned")]
    Poisoned,
}

/// A CSS-style selector addressing one element (or group of elements).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target(Cow<'static, str>);

impl Target {
    /// Target from a static selector.
    #[must_use]
    pub const fn from_static(selector: &'static str) -> Self {
        Self(Cow::Borrowed(selector))
    }

    /// Target from a computed selector.
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self(Cow::Owned(selector.into()))
    }

    /// The selector text.
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.0
    }

    // Cart drawer
    pub const CART_BADGE: Self = Self::from_static("[data-badge='cart']");
    pub const CART_COMPONENT: Self = Self::from_static("cart-component");
    pub const CART_VARIANT_SWITCHER_MODALS: Self =
        Self::from_static("#cart-items-variant-switcher-modals");
    pub const CART_DRAWER: Self = Self::from_static("#cart-drawer");
    pub const CART_DRAWER_TITLE: Self = Self::from_static("#cart-drawer-title");
    pub const CART_DRAWER_FOOTER: Self = Self::from_static("#cart-drawer .dialog-footer");
    pub const CART_STATUS: Self = Self::from_static("#cart-status");
    pub const CART_ALERT: Self = Self::from_static("#cart-alert");
    pub const CART_ALERT_TEXT: Self = Self::from_static("#cart-alert [data-text]");
    pub const SHIPPING_ALERT: Self = Self::from_static("#shipping-calculator-alert");
    pub const SHIPPING_BUTTON: Self = Self::from_static("cart-shipping-calculator form button");
    pub const DISCOUNT_ALERT: Self = Self::from_static("cart-discount .alert");

    // Bundle builder
    pub const BUNDLE_PROGRESS_BAR: Self = Self::from_static(".bundle-builder-progress .progress-bar");
    pub const BUNDLE_PROMO: Self = Self::from_static(".bundle-builder-promo-text");
    pub const BUNDLE_SUBTOTAL: Self = Self::from_static("[data-bundle-builder-subtotal]");
    pub const BUNDLE_SAVINGS: Self = Self::from_static("[data-bundle-builder-savings]");
    pub const BUNDLE_ITEM_COUNT: Self = Self::from_static("[data-bundle-builder-item-count]");
    pub const BUNDLE_ACTIONS: Self = Self::from_static("[data-bundle-builder-btn-action]");
    pub const BUNDLE_SELECTION: Self = Self::from_static(".bundle-product-form select[name='id']");
    pub const BUNDLE_SELECTION_BUTTON: Self = Self::from_static(".bundle-product-form .btn");
    pub const BUNDLE_CONTENTS_EMPTY: Self = Self::from_static(".bundle-builder-contents-empty");
    pub const BUNDLE_CONTENTS_LIST: Self = Self::from_static(".bundle-builder-contents-list");

    // Product form
    pub const VARIANT_ID_INPUT: Self = Self::from_static("[name='id']");
    pub const PRICE: Self = Self::from_static(".price");
    pub const PRICE_AMOUNT: Self = Self::from_static(".price [data-price]");
    pub const PRICE_COMPARE: Self = Self::from_static(".price [data-compare-price]");
    pub const PRICE_SALE_BADGE: Self = Self::from_static(".price .badge-sale");
    pub const ADD_BUTTON: Self = Self::from_static("button[name='add']");
    pub const BUY_BUTTON: Self = Self::from_static("button[name='buy']");
    pub const STICKY_ATC_SELECT: Self = Self::from_static("sticky-atc select[name='id']");
    pub const MEDIA_GALLERY_TRACK: Self = Self::from_static(".product-media-gallery-track");
    pub const MEDIA_GALLERY_PAGINATION: Self = Self::from_static(".product-media-gallery-pagination");
    pub const QTY_INPUT: Self = Self::from_static("product-qty-switcher input");
    pub const QTY_DECREASE: Self = Self::from_static("product-qty-switcher [name='decrease']");
    pub const QTY_INCREASE: Self = Self::from_static("product-qty-switcher [name='increase']");

    // Wishlist
    pub const WISHLIST_BADGE: Self = Self::from_static("[data-badge='wishlist']");
    pub const WISHLIST_DIALOG: Self = Self::from_static("#wishlist-drawer");
    pub const WISHLIST_EMPTY: Self = Self::from_static(".wishlist-empty");
    pub const WISHLIST_LIST: Self = Self::from_static("wishlist-component .product-list");

    // Predictive search
    pub const SEARCH_INPUT: Self = Self::from_static("predictive-search input[type='search']");
    pub const SEARCH_RESET: Self = Self::from_static("predictive-search button[type='reset']");
    pub const SEARCH_SUBMIT: Self = Self::from_static("predictive-search button[type='submit']");
    pub const SEARCH_LOADING: Self = Self::from_static("predictive-search .loading-spinner-wrapper");
    pub const SEARCH_RESULTS: Self = Self::from_static("#predictive-search-results");
    pub const SEARCH_STATUS: Self = Self::from_static("#predictive-search-status");

    /// A dialog element by id.
    #[must_use]
    pub fn dialog(id: &str) -> Self {
        Self::new(format!("#{id}"))
    }

    /// The focusable cart element tagged with `data-focus-element-id`.
    #[must_use]
    pub fn cart_focus(focus_id: &str) -> Self {
        Self::new(format!(
            "#cart-component [data-focus-element-id={}]",
            quoted(focus_id)
        ))
    }

    /// A tier marker of the bundle progress bar (0-based).
    #[must_use]
    pub fn bundle_marker(index: usize) -> Self {
        Self::new(format!(".bundle-builder-progress ul li:nth-child({})", index + 1))
    }

    /// One candidate value of a product option (1-based position).
    #[must_use]
    pub fn option_value(position: usize, value: &str) -> Self {
        Self::new(format!(
            "input[data-option-position='{position}'][value={}]",
            quoted(value)
        ))
    }

    /// The inventory bar of a product block.
    #[must_use]
    pub fn inventory_bar(block_id: &str) -> Self {
        Self::new(format!("[id*={}]", quoted(&format!("inventory-bar-{block_id}"))))
    }

    /// The quantity switcher of a product block.
    #[must_use]
    pub fn qty_switcher(block_id: &str) -> Self {
        Self::new(format!(
            "[id*={}]",
            quoted(&format!("product-qty-switcher-{block_id}"))
        ))
    }

    /// The add-to-wishlist toggle for a product.
    #[must_use]
    pub fn wishlist_button(handle: &str) -> Self {
        Self::new(format!(".wishlist-btn[data-product-handle={}]", quoted(handle)))
    }

    /// Parts of a quantity-break offer group.
    #[must_use]
    pub fn qty_break(group: &str, part: &str) -> Self {
        Self::new(format!(".product-qty-break[data-group={}] {part}", quoted(group)))
    }
}

/// A CSS string for an attribute selector value.
///
/// Single quotes unless the value contains one; backslash escapes only when
/// it contains both quote kinds.
fn quoted(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One change to apply to a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    /// Replace the element itself (outer HTML) with server-rendered markup.
    Replace { target: Target, html: String },
    /// Replace the element's children.
    SetInnerHtml { target: Target, html: String },
    /// Replace the element's text content.
    SetText { target: Target, text: String },
    SetAttribute {
        target: Target,
        name: String,
        value: String,
    },
    RemoveAttribute { target: Target, name: String },
    SetClass {
        target: Target,
        class: String,
        enabled: bool,
    },
    SetDisabled { target: Target, disabled: bool },
    SetHidden { target: Target, hidden: bool },
    SetStyle {
        target: Target,
        property: String,
        value: String,
    },
    /// Set a form control's value.
    SetValue { target: Target, value: String },
    Focus { target: Target },
    OpenDialog { target: Target },
    CloseDialog { target: Target },
    /// Replace a query parameter of the page URL without navigating.
    SetUrlParam { name: String, value: String },
}

impl Patch {
    #[must_use]
    pub fn text(target: Target, text: impl Into<String>) -> Self {
        Self::SetText {
            target,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn inner_html(target: Target, html: impl Into<String>) -> Self {
        Self::SetInnerHtml {
            target,
            html: html.into(),
        }
    }

    #[must_use]
    pub fn attr(target: Target, name: &str, value: impl Into<String>) -> Self {
        Self::SetAttribute {
            target,
            name: name.to_string(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn remove_attr(target: Target, name: &str) -> Self {
        Self::RemoveAttribute {
            target,
            name: name.to_string(),
        }
    }

    #[must_use]
    pub fn class(target: Target, class: &str, enabled: bool) -> Self {
        Self::SetClass {
            target,
            class: class.to_string(),
            enabled,
        }
    }

    #[must_use]
    pub const fn disabled(target: Target, disabled: bool) -> Self {
        Self::SetDisabled { target, disabled }
    }

    #[must_use]
    pub const fn hidden(target: Target, hidden: bool) -> Self {
        Self::SetHidden { target, hidden }
    }

    #[must_use]
    pub fn style(target: Target, property: &str, value: impl Into<String>) -> Self {
        Self::SetStyle {
            target,
            property: property.to_string(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn value(target: Target, value: impl Into<String>) -> Self {
        Self::SetValue {
            target,
            value: value.into(),
        }
    }

    /// The element this patch addresses, if any.
    #[must_use]
    pub const fn target(&self) -> Option<&Target> {
        match self {
            Self::Replace { target, .. }
            | Self::SetInnerHtml { target, .. }
            | Self::SetText { target, .. }
            | Self::SetAttribute { target, .. }
            | Self::RemoveAttribute { target, .. }
            | Self::SetClass { target, .. }
            | Self::SetDisabled { target, .. }
            | Self::SetHidden { target, .. }
            | Self::SetStyle { target, .. }
            | Self::SetValue { target, .. }
            | Self::Focus { target }
            | Self::OpenDialog { target }
            | Self::CloseDialog { target } => Some(target),
            Self::SetUrlParam { .. } => None,
        }
    }
}

/// Proof that a batch of patches finished applying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderReceipt {
    pub applied: usize,
}

/// Something patches can be applied to.
pub trait RenderSink: Send {
    /// Apply one patch.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::MissingTarget` when the addressed element does not exist.
    fn apply(&mut self, patch: &Patch) -> Result<(), RenderError>;

    /// Apply patches in order, stopping at the first failure.
    ///
    /// Patches before the failing one stay applied; there is no rollback.
    ///
    /// # Errors
    ///
    /// Returns the first patch error.
    fn apply_all(&mut self, patches: &[Patch]) -> Result<RenderReceipt, RenderError> {
        for patch in patches {
            self.apply(patch)?;
        }
        Ok(RenderReceipt {
            applied: patches.len(),
        })
    }
}

/// A sink shared between the widgets of one page.
pub type SharedSink = Arc<Mutex<dyn RenderSink>>;

/// Wrap a sink for sharing.
pub fn shared<S: RenderSink + 'static>(sink: S) -> Arc<Mutex<S>> {
    Arc::new(Mutex::new(sink))
}

/// Apply patches through a shared sink.
///
/// # Errors
///
/// Returns the first patch error, or `RenderError::Poisoned`.
pub fn apply_shared(sink: &SharedSink, patches: &[Patch]) -> Result<RenderReceipt, RenderError> {
    let mut guard = sink.lock().map_err(|_| RenderError::Poisoned)?;
    guard.apply_all(patches)
}

/// A sink that records patches instead of applying them.
#[derive(Debug, Default)]
pub struct Snapshot {
    patches: Vec<Patch>,
}

impl Snapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Patches recorded so far.
    #[must_use]
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Take the recorded patches, leaving the snapshot empty.
    pub fn take(&mut self) -> Vec<Patch> {
        std::mem::take(&mut self.patches)
    }
}

impl RenderSink for Snapshot {
    fn apply(&mut self, patch: &Patch) -> Result<(), RenderError> {
        self.patches.push(patch.clone());
        Ok(())
    }
}
