//! Cart error alert.

use crate::events::{EventListener, ThemeEvent};
use crate::render::{Patch, Target};

/// Shows the last cart error and clears it on the next successful call.
#[derive(Debug, Default)]
pub struct CartAlert;

impl EventListener for CartAlert {
    fn on_event(&mut self, event: &ThemeEvent) -> Vec<Patch> {
        match event {
            ThemeEvent::CartError(detail) => vec![
                Patch::inner_html(Target::CART_ALERT_TEXT, detail.alert_html()),
                Patch::attr(Target::CART_ALERT, "data-alert-type", "error"),
                Patch::class(Target::CART_ALERT, "visually-hidden", false),
            ],
            ThemeEvent::CartAdded(_) | ThemeEvent::CartChanged(_) => vec![
                Patch::inner_html(Target::CART_ALERT_TEXT, ""),
                Patch::remove_attr(Target::CART_ALERT, "data-alert-type"),
                Patch::class(Target::CART_ALERT, "visually-hidden", true),
            ],
            _ => Vec::new(),
        }
    }
}
