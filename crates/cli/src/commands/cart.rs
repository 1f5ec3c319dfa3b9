//! Cart commands, run through the cart proxy.
//!
//! # Usage
//!
//! ```bash
//! tw-cli cart add 4242 -q 2
//! tw-cli cart change "4242:8e0a4f9d" 0
//! tw-cli cart note "Leave at the door"
//! tw-cli cart discount WELCOME10
//! tw-cli cart discount            # removes the applied code
//! ```

use clap::Subcommand;
use theme_widgets::cart::{CartAlert, CartProxy, DiscountOutcome, FormPayload, JsonPayload};
use theme_widgets::events::drain;
use theme_widgets::render::apply_shared;
use theme_widgets::shopify::CartItemInput;
use theme_widgets::{EventListener, SharedSink, WidgetError};
use theme_widgets_core::{LineKey, SellingPlanId, VariantId};

use super::{CommandError, Page};

#[derive(Debug, Subcommand)]
pub enum CartAction {
    /// Add a variant to the cart
    Add {
        variant: VariantId,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Subscribe with this selling plan
        #[arg(long)]
        selling_plan: Option<SellingPlanId>,
    },
    /// Set the quantity of a cart line (0 removes it)
    Change { line: String, quantity: u32 },
    /// Save the order note
    Note { note: String },
    /// Apply a discount code, or remove the current one when omitted
    Discount { code: Option<String> },
}

/// Run a cart action.
///
/// A rejected add or change is not a command failure: the widgets show it
/// in the cart alert, which is printed like any other patch.
///
/// # Errors
///
/// Returns an error if a storefront call fails outright or the page is
/// missing a cart element.
pub async fn run(page: &mut Page, action: CartAction) -> Result<(), CommandError> {
    let proxy = CartProxy::new(
        page.client.clone(),
        page.bus.clone(),
        page.sink.clone(),
        page.config.sections_url.clone(),
    );
    let mut alerts = page.bus.subscribe();

    let result = match action {
        CartAction::Add {
            variant,
            quantity,
            selling_plan: None,
        } => proxy.add(FormPayload::variant(variant, quantity)).await.map(drop),
        CartAction::Add {
            variant,
            quantity,
            selling_plan,
        } => proxy
            .add(JsonPayload::items(&[CartItemInput {
                id: variant,
                quantity,
                selling_plan,
            }]))
            .await
            .map(drop),
        CartAction::Change { line, quantity } => proxy
            .change(&LineKey::new(line), quantity, None)
            .await
            .map(drop),
        CartAction::Note { note } => proxy.update_note(&note).await.map(drop),
        CartAction::Discount { code: Some(code) } => {
            proxy.apply_discount(&code).await.map(|outcome| {
                if outcome == DiscountOutcome::NotApplicable {
                    tracing::warn!(%code, "discount code does not apply to this cart");
                }
            })
        }
        CartAction::Discount { code: None } => proxy.remove_discount().await,
    };

    let mut alert = CartAlert;
    let patches: Vec<_> = drain(&mut alerts)
        .iter()
        .flat_map(|event| alert.on_event(event))
        .collect();
    let sink: SharedSink = page.sink.clone();
    apply_shared(&sink, &patches).map_err(WidgetError::from)?;

    match result {
        Ok(()) | Err(WidgetError::CartRejected(_)) => page.flush(),
        Err(e) => Err(e.into()),
    }
}
