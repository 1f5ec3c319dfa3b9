//! Integration tests for the theme widgets.
//!
//! Each test wires several widgets onto one page the way the theme does:
//! a shared [`Document`], one [`EventBus`], one store, and a `wiremock`
//! server standing in for the storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p theme-widgets-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_flow` - bundle builder and product form through the cart proxy
//! - `variant_flow` - option picker fanning out to its followers
//! - `wishlist_flow` - wishlist persistence in the file store

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};
use theme_widgets::dialog::CART_DRAWER;
use theme_widgets::shopify::StorefrontClient;
use theme_widgets::{Document, EventListener, Patch, RenderSink, Target, ThemeEvent, WidgetsConfig};
use url::Url;
use wiremock::MockServer;

/// Cart drawer section as the storefront renders it after a change.
pub const DRAWER_HTML: &str = r#"<div id="shopify-section-cart-drawer">
<cart-component class="cart"><ul><li data-focus-element-id="qty-1">Tee x 2</li></ul></cart-component>
<div id="cart-items-variant-switcher-modals"></div>
<div id="cart-drawer"><h2 id="cart-drawer-title">Cart (3)</h2><div class="dialog-footer">$62.00</div></div>
<p id="cart-status">3 items</p>
</div>"#;

/// Cart badge section.
pub const BADGE_HTML: &str =
    r#"<div id="shopify-section-cart-badge"><span data-badge="cart" data-count="3">3</span></div>"#;

/// A successful cart response carrying both cart sections.
#[must_use]
pub fn cart_sections() -> Value {
    json!({
        "item_count": 3,
        "sections": { "cart-badge": BADGE_HTML, "cart-drawer": DRAWER_HTML }
    })
}

/// A 422 cart rejection.
#[must_use]
pub fn cart_rejection(description: &str) -> Value {
    json!({ "status": 422, "message": "Cart Error", "description": description })
}

/// Storefront client pointed at a mock server.
///
/// # Panics
///
/// Panics if the mock server URI is not a valid URL.
#[must_use]
pub fn client(server: &MockServer) -> StorefrontClient {
    let url = Url::parse(&server.uri()).expect("mock server URI");
    StorefrontClient::new(&WidgetsConfig::for_storefront(url)).expect("storefront client")
}

/// Elements of the cart drawer and its alert.
#[must_use]
pub fn cart_targets() -> Vec<Target> {
    vec![
        Target::CART_BADGE,
        Target::CART_COMPONENT,
        Target::CART_VARIANT_SWITCHER_MODALS,
        Target::CART_DRAWER_TITLE,
        Target::CART_DRAWER_FOOTER,
        Target::CART_STATUS,
        Target::CART_ALERT,
        Target::CART_ALERT_TEXT,
        Target::dialog(CART_DRAWER),
    ]
}

/// A page with the cart drawer and `extra` elements mounted.
#[must_use]
pub fn page_with(extra: impl IntoIterator<Item = Target>) -> Arc<Mutex<Document>> {
    Arc::new(Mutex::new(
        Document::new().with_all(cart_targets()).with_all(extra),
    ))
}

/// Feed `events` to `listener` and apply what it returns to `page`.
///
/// # Panics
///
/// Panics if a listener patch addresses an element the page lacks.
pub fn dispatch(page: &Mutex<Document>, listener: &mut dyn EventListener, events: &[ThemeEvent]) {
    let patches: Vec<Patch> = events
        .iter()
        .flat_map(|event| listener.on_event(event))
        .collect();
    page.lock()
        .expect("page lock")
        .apply_all(&patches)
        .expect("listener patches apply");
}

/// Names of `events`, in order.
#[must_use]
pub fn names(events: &[ThemeEvent]) -> Vec<&'static str> {
    events.iter().map(ThemeEvent::name).collect()
}

/// A fresh directory for a file store, unique per call.
///
/// # Panics
///
/// Panics if the system clock is before the Unix epoch.
#[must_use]
pub fn scratch_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "theme-widgets-{label}-{}-{nanos}",
        std::process::id()
    ))
}
