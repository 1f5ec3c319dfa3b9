//! Local cart proxy.
//!
//! Every add, change and update of the server cart goes through
//! [`CartProxy`]. A call marks the cart component busy, hits the storefront,
//! then on success swaps in the re-rendered sections and broadcasts
//! `cart:rendered` followed by `cart:added` / `cart:changed`. On failure
//! exactly one `cart:error` is broadcast and nothing is re-rendered.
//!
//! Calls are neither cancelled nor coalesced: when two overlap, the last one
//! to finish rendering wins.

mod alert;
mod payload;
mod shipping;

pub use alert::CartAlert;
pub use payload::{AddPayload, FormPayload, JsonPayload};
pub use shipping::{ShippingCalculator, ShippingEstimate, ShippingSettings};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use theme_widgets_core::{LineKey, SellingPlanId, VariantId};
use tracing::instrument;

use crate::dialog::{self, Dialogs};
use crate::error::{Result, WidgetError, add_breadcrumb};
use crate::events::{EventBus, ThemeEvent};
use crate::render::{Patch, RenderError, SharedSink, Target, apply_shared, fragment};
use crate::shopify::{CartItemInput, CartResponse, StorefrontClient, StorefrontError};

/// Sections re-rendered by add and change calls.
pub const SECTIONS_TO_RENDER: &[&str] = &["cart-badge", "cart-drawer"];

/// Sections re-rendered by discount updates.
const DISCOUNT_SECTIONS: &[&str] = &["cart-drawer"];

/// Result of submitting a discount code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountOutcome {
    /// The code applies; the drawer was re-rendered.
    Applied,
    /// The storefront accepted the request but the code does not apply.
    NotApplicable,
    /// Nothing was submitted.
    Empty,
}

/// Mediator for all calls against the server cart.
#[derive(Clone)]
pub struct CartProxy {
    client: StorefrontClient,
    bus: EventBus,
    sink: SharedSink,
    dialogs: Dialogs,
    sections_url: String,
    in_flight: Arc<AtomicUsize>,
}

impl CartProxy {
    /// Create a proxy rendering into `sink` and broadcasting on `bus`.
    ///
    /// `sections_url` is the path of the current page, which the storefront
    /// renders the returned sections for.
    #[must_use]
    pub fn new(
        client: StorefrontClient,
        bus: EventBus,
        sink: SharedSink,
        sections_url: impl Into<String>,
    ) -> Self {
        let dialogs = Dialogs::new(Arc::clone(&sink), bus.clone());
        Self {
            client,
            bus,
            sink,
            dialogs,
            sections_url: sections_url.into(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of calls currently awaiting a response.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Add to the cart, then open the cart drawer whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::CartRejected` when the storefront refuses the add
    /// (after `cart:error` was emitted), or a render error when the page is
    /// missing a cart element.
    #[instrument(skip(self, payload))]
    pub async fn add(&self, payload: impl Into<AddPayload>) -> Result<Arc<CartResponse>> {
        add_breadcrumb("cart", "Add to cart", None);
        let request = payload
            .into()
            .normalize(&self.sections_url, SECTIONS_TO_RENDER);

        let busy = self.busy()?;
        let result = self.client.cart_add(&request).await;
        busy.finish()?;

        let outcome = self.complete(result, ThemeEvent::CartAdded);
        self.dialogs.open(dialog::CART_DRAWER, None)?;
        outcome
    }

    /// Set the quantity of a line (zero removes it).
    ///
    /// When `focus_target` is given, focus moves to the element with that
    /// `data-focus-element-id` once the new sections have been applied.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::CartRejected` when the storefront refuses the change.
    #[instrument(skip(self), fields(line = %line_key))]
    pub async fn change(
        &self,
        line_key: &LineKey,
        quantity: u32,
        focus_target: Option<&str>,
    ) -> Result<Arc<CartResponse>> {
        add_breadcrumb(
            "cart",
            "Change line quantity",
            Some(&[("line", line_key.as_str()), ("quantity", &quantity.to_string())]),
        );
        let body = json!({
            "id": line_key,
            "quantity": quantity,
            "sections": SECTIONS_TO_RENDER,
            "sections_url": self.sections_url,
        });

        let busy = self.busy()?;
        let result = self.client.cart_change(body).await;
        busy.finish()?;

        let response = self.complete(result, ThemeEvent::CartChanged)?;

        if let Some(focus_id) = focus_target {
            let focus = Patch::Focus {
                target: Target::cart_focus(focus_id),
            };
            // Render already completed above; the element may legitimately be gone
            if let Err(e) = apply_shared(&self.sink, &[focus]) {
                tracing::debug!(error = %e, focus_id, "focus target not found after render");
            }
        }
        Ok(response)
    }

    /// Replace a one-time line with the same variant on a selling plan.
    ///
    /// Not atomic: the line is removed first, then the add is sent whatever
    /// the removal returned.
    ///
    /// # Errors
    ///
    /// Returns the first failing call's error.
    pub async fn upgrade_to_subscription(
        &self,
        line_key: &LineKey,
        variant_id: VariantId,
        quantity: u32,
        selling_plan: SellingPlanId,
    ) -> Result<Arc<CartResponse>> {
        let removed = self.change(line_key, 0, None).await;
        let added = self
            .add(JsonPayload::items(&[CartItemInput {
                id: variant_id,
                quantity,
                selling_plan: Some(selling_plan),
            }]))
            .await;
        first_error(removed, added)
    }

    /// Swap a line to another variant of the same product.
    ///
    /// Not atomic, in the same way as [`Self::upgrade_to_subscription`].
    ///
    /// # Errors
    ///
    /// Returns the first failing call's error.
    pub async fn swap_variant(
        &self,
        line_key: &LineKey,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<Arc<CartResponse>> {
        let removed = self.change(line_key, 0, None).await;
        let added = self.add(FormPayload::variant(variant_id, quantity)).await;
        first_error(removed, added)
    }

    /// Save the order note.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::Storefront` when the update fails.
    #[instrument(skip(self, note))]
    pub async fn update_note(&self, note: &str) -> Result<CartResponse> {
        Ok(self.client.cart_update(json!({ "note": note })).await?)
    }

    /// Set cart attributes (e.g. a delivery date).
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::Storefront` when the update fails.
    #[instrument(skip(self))]
    pub async fn update_attributes(
        &self,
        attributes: &BTreeMap<String, String>,
    ) -> Result<CartResponse> {
        Ok(self
            .client
            .cart_update(json!({ "attributes": attributes }))
            .await?)
    }

    /// Apply a discount code, re-rendering the drawer only when it applies.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::Storefront` when the update fails.
    #[instrument(skip(self))]
    pub async fn apply_discount(&self, code: &str) -> Result<DiscountOutcome> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(DiscountOutcome::Empty);
        }
        add_breadcrumb("cart", "Apply discount", Some(&[("code", code)]));

        let response = self.client.cart_update(self.discount_body(code)).await?;
        let applicable = response
            .discount_codes()
            .first()
            .is_some_and(|d| d.applicable);

        if applicable {
            self.render(&response)?;
            Ok(DiscountOutcome::Applied)
        } else {
            apply_shared(
                &self.sink,
                &[
                    Patch::attr(Target::DISCOUNT_ALERT, "data-alert-type", "error"),
                    Patch::hidden(Target::DISCOUNT_ALERT, false),
                ],
            )?;
            Ok(DiscountOutcome::NotApplicable)
        }
    }

    /// Remove any applied discount code and re-render the drawer.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::Storefront` when the update fails.
    #[instrument(skip(self))]
    pub async fn remove_discount(&self) -> Result<()> {
        let response = self.client.cart_update(self.discount_body("")).await?;
        self.render(&response)?;
        Ok(())
    }

    fn discount_body(&self, code: &str) -> Value {
        json!({
            "discount": code,
            "sections": DISCOUNT_SECTIONS,
            "sections_url": self.sections_url,
        })
    }

    /// Render and broadcast a finished call.
    fn complete(
        &self,
        result: std::result::Result<CartResponse, StorefrontError>,
        event: fn(Arc<CartResponse>) -> ThemeEvent,
    ) -> Result<Arc<CartResponse>> {
        match result {
            Ok(response) => {
                let response = Arc::new(response);
                self.render(&response)?;
                self.bus.publish(event(Arc::clone(&response)));
                Ok(response)
            }
            Err(e) => {
                let detail = e.cart_detail();
                tracing::warn!(
                    status = ?detail.status,
                    message = %detail.message,
                    description = %detail.description,
                    "cart call failed"
                );
                if !matches!(e, StorefrontError::Cart(_)) {
                    sentry::capture_error(&e);
                }
                self.bus.publish(ThemeEvent::CartError(detail.clone()));
                Err(WidgetError::CartRejected(detail))
            }
        }
    }

    /// Apply the response's sections, then announce `cart:rendered`.
    fn render(&self, response: &CartResponse) -> Result<()> {
        let patches = section_patches(response)?;
        let receipt = apply_shared(&self.sink, &patches)?;
        tracing::debug!(applied = receipt.applied, "cart sections rendered");
        self.bus.publish(ThemeEvent::CartRendered);
        Ok(())
    }

    fn busy(&self) -> Result<BusyGuard> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            apply_shared(&self.sink, &busy_patches(true))?;
        }
        Ok(BusyGuard {
            in_flight: Arc::clone(&self.in_flight),
            sink: Arc::clone(&self.sink),
            finished: false,
        })
    }
}

/// Holds the cart component's busy state for one call.
///
/// Dropping without [`BusyGuard::finish`] (e.g. a cancelled future) still
/// releases the in-flight count and clears the busy markers.
struct BusyGuard {
    in_flight: Arc<AtomicUsize>,
    sink: SharedSink,
    finished: bool,
}

impl BusyGuard {
    fn finish(mut self) -> std::result::Result<(), RenderError> {
        self.finished = true;
        self.release()
    }

    fn release(&self) -> std::result::Result<(), RenderError> {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            apply_shared(&self.sink, &busy_patches(false))?;
        }
        Ok(())
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if !self.finished
            && let Err(e) = self.release()
        {
            tracing::warn!(error = %e, "failed to clear cart busy state");
        }
    }
}

/// Outcome of a remove-then-add pair: the add's response, unless the
/// removal already failed.
fn first_error(
    removed: Result<Arc<CartResponse>>,
    added: Result<Arc<CartResponse>>,
) -> Result<Arc<CartResponse>> {
    if let Err(e) = removed {
        if let Err(add_error) = &added {
            tracing::debug!(error = %add_error, "add after failed removal also failed");
        }
        return Err(e);
    }
    added
}

fn busy_patches(busy: bool) -> Vec<Patch> {
    vec![
        Patch::class(Target::CART_COMPONENT, "loading", busy),
        Patch::attr(Target::CART_COMPONENT, "aria-busy", busy.to_string()),
    ]
}

// =============================================================================
// Section rendering
// =============================================================================

/// Patches replacing the cart's page fragments with a response's sections.
///
/// Sections the storefront failed to render (`null`) are skipped.
///
/// # Errors
///
/// Returns `RenderError::MissingFragment` when a rendered section lacks an
/// element the cart needs.
pub fn section_patches(response: &CartResponse) -> std::result::Result<Vec<Patch>, RenderError> {
    let mut patches = Vec::new();

    for (section, html) in &response.sections {
        let Some(html) = html.as_deref() else {
            tracing::warn!(section, "section was not rendered");
            continue;
        };

        match section.as_str() {
            "cart-badge" => {
                patches.push(Patch::Replace {
                    target: Target::CART_BADGE,
                    html: outer(section, html, Target::CART_BADGE.selector())?,
                });
            }
            "cart-drawer" => {
                patches.push(Patch::Replace {
                    target: Target::CART_COMPONENT,
                    html: outer(section, html, Target::CART_COMPONENT.selector())?,
                });
                patches.push(Patch::Replace {
                    target: Target::CART_VARIANT_SWITCHER_MODALS,
                    html: outer(section, html, Target::CART_VARIANT_SWITCHER_MODALS.selector())?,
                });
                patches.push(Patch::text(
                    Target::CART_DRAWER_TITLE,
                    text(section, html, Target::CART_DRAWER_TITLE.selector())?,
                ));
                patches.push(Patch::Replace {
                    target: Target::CART_DRAWER_FOOTER,
                    html: outer(section, html, Target::CART_DRAWER_FOOTER.selector())?,
                });
                patches.push(Patch::text(
                    Target::CART_STATUS,
                    text(section, html, Target::CART_STATUS.selector())?,
                ));
            }
            other => tracing::debug!(section = other, "ignoring unrequested section"),
        }
    }

    Ok(patches)
}

fn outer(section: &str, html: &str, selector: &str) -> std::result::Result<String, RenderError> {
    fragment::outer_html(html, selector).ok_or_else(|| missing(section, selector))
}

fn text(section: &str, html: &str, selector: &str) -> std::result::Result<String, RenderError> {
    fragment::text(html, selector).ok_or_else(|| missing(section, selector))
}

fn missing(section: &str, selector: &str) -> RenderError {
    RenderError::MissingFragment {
        section: section.to_string(),
        selector: selector.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::WidgetsConfig;
    use crate::events::drain;
    use crate::render::{Document, Snapshot, shared};

    const DRAWER_HTML: &str = r#"<div id="shopify-section-cart-drawer">
<cart-component class="cart"><ul><li data-focus-element-id="qty-1">1</li></ul></cart-component>
<div id="cart-items-variant-switcher-modals"></div>
<div id="cart-drawer"><h2 id="cart-drawer-title">Cart (2)</h2><div class="dialog-footer">$20.00</div></div>
<p id="cart-status">2 items</p>
</div>"#;

    const BADGE_HTML: &str =
        r#"<div id="shopify-section-cart-badge"><span data-badge="cart" data-count="2">2</span></div>"#;

    fn page() -> Document {
        Document::new().with_all([
            Target::CART_BADGE,
            Target::CART_COMPONENT,
            Target::CART_VARIANT_SWITCHER_MODALS,
            Target::CART_DRAWER_TITLE,
            Target::CART_DRAWER_FOOTER,
            Target::CART_STATUS,
            Target::dialog(dialog::CART_DRAWER),
            Target::cart_focus("qty-1"),
            Target::DISCOUNT_ALERT,
        ])
    }

    fn proxy(server: &MockServer, sink: SharedSink, bus: EventBus) -> CartProxy {
        let config = WidgetsConfig::for_storefront(Url::parse(&server.uri()).unwrap());
        let client = StorefrontClient::new(&config).unwrap();
        CartProxy::new(client, bus, sink, "/products/tee")
    }

    fn sections_body() -> Value {
        json!({
            "item_count": 2,
            "sections": { "cart-badge": BADGE_HTML, "cart-drawer": DRAWER_HTML }
        })
    }

    #[test]
    fn test_section_patches() {
        let response: CartResponse = serde_json::from_value(sections_body()).unwrap();
        let patches = section_patches(&response).unwrap();

        assert_eq!(patches.len(), 6);
        assert_eq!(
            patches[0],
            Patch::Replace {
                target: Target::CART_BADGE,
                html: r#"<span data-badge="cart" data-count="2">2</span>"#.to_string(),
            }
        );
        assert_eq!(patches[3], Patch::text(Target::CART_DRAWER_TITLE, "Cart (2)"));
        assert_eq!(patches[5], Patch::text(Target::CART_STATUS, "2 items"));
    }

    #[test]
    fn test_section_patches_missing_fragment() {
        let response: CartResponse = serde_json::from_value(json!({
            "sections": { "cart-drawer": "<div>nothing here</div>" }
        }))
        .unwrap();
        let err = section_patches(&response).unwrap_err();
        assert!(matches!(err, RenderError::MissingFragment { section, .. } if section == "cart-drawer"));
    }

    #[tokio::test]
    async fn test_add_success_renders_then_announces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cart/add.js"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sections_body()))
            .expect(1)
            .mount(&server)
            .await;

        let doc = shared(page());
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let cart = proxy(&server, doc.clone(), bus);

        cart.add(FormPayload::variant(VariantId::new(1), 1))
            .await
            .unwrap();

        let names: Vec<_> = drain(&mut rx).iter().map(ThemeEvent::name).collect();
        assert_eq!(names, ["cart:rendered", "cart:added", "dialog:open"]);

        let doc = doc.lock().unwrap();
        assert_eq!(doc.node(&Target::CART_STATUS).unwrap().text, "2 items");
        assert_eq!(doc.node(&Target::CART_COMPONENT).unwrap().replacements, 1);
        assert!(!doc.node(&Target::CART_COMPONENT).unwrap().has_class("loading"));
        assert_eq!(
            doc.node(&Target::CART_COMPONENT).unwrap().attribute("aria-busy"),
            Some("false")
        );
        assert!(doc.node(&Target::dialog(dialog::CART_DRAWER)).unwrap().open);
        assert_eq!(cart.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_add_failure_emits_single_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cart/add.js"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "status": 422,
                "message": "Cart Error",
                "description": "All 1 Tee are in your cart."
            })))
            .mount(&server)
            .await;

        let doc = shared(page());
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let cart = proxy(&server, doc.clone(), bus);

        let err = cart
            .add(FormPayload::variant(VariantId::new(1), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, WidgetError::CartRejected(_)));

        let events = drain(&mut rx);
        let errors: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ThemeEvent::CartError(detail) => Some(detail),
                _ => None,
            })
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Cart Error");
        assert_eq!(errors[0].description, "All 1 Tee are in your cart.");
        assert!(!events.iter().any(|e| matches!(e, ThemeEvent::CartRendered)));

        let doc = doc.lock().unwrap();
        assert_eq!(doc.node(&Target::CART_COMPONENT).unwrap().replacements, 0);
        assert_eq!(doc.node(&Target::CART_STATUS).unwrap().text, "");
        // The drawer still opens to show the error
        assert!(doc.node(&Target::dialog(dialog::CART_DRAWER)).unwrap().open);
    }

    #[tokio::test]
    async fn test_change_restores_focus_after_render() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cart/change.js"))
            .and(body_json(json!({
                "id": "39897499729985:abc",
                "quantity": 3,
                "sections": ["cart-badge", "cart-drawer"],
                "sections_url": "/products/tee"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(sections_body()))
            .mount(&server)
            .await;

        let snapshot = shared(Snapshot::new());
        let cart = proxy(&server, snapshot.clone(), EventBus::new());

        cart.change(&LineKey::new("39897499729985:abc"), 3, Some("qty-1"))
            .await
            .unwrap();

        let patches = snapshot.lock().unwrap().take();
        let focus_at = patches
            .iter()
            .position(|p| matches!(p, Patch::Focus { .. }))
            .unwrap();
        let last_section = patches
            .iter()
            .rposition(|p| p.target() == Some(&Target::CART_STATUS))
            .unwrap();
        assert!(focus_at > last_section);
        assert_eq!(focus_at, patches.len() - 1);
    }

    #[tokio::test]
    async fn test_upgrade_adds_even_when_removal_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cart/change.js"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "message": "Bad request", "description": "Unknown line"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cart/add.js"))
            .and(body_partial_json(json!({
                "items": [{ "id": 1, "quantity": 2, "selling_plan": 9 }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(sections_body()))
            .expect(1)
            .mount(&server)
            .await;

        let doc = shared(page());
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let cart = proxy(&server, doc.clone(), bus);
        let err = cart
            .upgrade_to_subscription(
                &LineKey::new("k"),
                VariantId::new(1),
                2,
                SellingPlanId::new(9),
            )
            .await
            .unwrap_err();

        // The removal's error is the one reported
        assert!(
            matches!(err, WidgetError::CartRejected(ref detail) if detail.description == "Unknown line")
        );
        let names: Vec<_> = drain(&mut rx).iter().map(ThemeEvent::name).collect();
        assert_eq!(names, ["cart:error", "cart:rendered", "cart:added", "dialog:open"]);
        assert_eq!(doc.lock().unwrap().node(&Target::CART_COMPONENT).unwrap().replacements, 1);
    }

    #[tokio::test]
    async fn test_swap_variant_removes_then_adds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cart/change.js"))
            .and(body_partial_json(json!({ "id": "k", "quantity": 0 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(sections_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cart/add.js"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sections_body()))
            .expect(1)
            .mount(&server)
            .await;

        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let cart = proxy(&server, shared(page()), bus);
        cart.swap_variant(&LineKey::new("k"), VariantId::new(5), 1)
            .await
            .unwrap();

        let names: Vec<_> = drain(&mut rx).iter().map(ThemeEvent::name).collect();
        assert_eq!(
            names,
            ["cart:rendered", "cart:changed", "cart:rendered", "cart:added", "dialog:open"]
        );
    }

    #[tokio::test]
    async fn test_discount_not_applicable_renders_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cart/update.js"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "discount_codes": [{ "code": "NOPE", "applicable": false }],
                "sections": { "cart-drawer": DRAWER_HTML }
            })))
            .mount(&server)
            .await;

        let doc = shared(page());
        let cart = proxy(&server, doc.clone(), EventBus::new());

        assert_eq!(cart.apply_discount("NOPE").await.unwrap(), DiscountOutcome::NotApplicable);
        assert_eq!(cart.apply_discount("  ").await.unwrap(), DiscountOutcome::Empty);

        let doc = doc.lock().unwrap();
        assert_eq!(doc.node(&Target::CART_COMPONENT).unwrap().replacements, 0);
        assert_eq!(
            doc.node(&Target::DISCOUNT_ALERT).unwrap().attribute("data-alert-type"),
            Some("error")
        );
    }

    #[tokio::test]
    async fn test_discount_applied_renders_drawer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cart/update.js"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "discount_codes": [{ "code": "SAVE10", "applicable": true }],
                "sections": { "cart-drawer": DRAWER_HTML }
            })))
            .mount(&server)
            .await;

        let doc = shared(page());
        let cart = proxy(&server, doc.clone(), EventBus::new());

        assert_eq!(cart.apply_discount("SAVE10").await.unwrap(), DiscountOutcome::Applied);
        assert_eq!(
            doc.lock().unwrap().node(&Target::CART_COMPONENT).unwrap().replacements,
            1
        );
    }
}
