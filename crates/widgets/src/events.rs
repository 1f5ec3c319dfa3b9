//! Typed publish/subscribe bus connecting otherwise independent widgets.
//!
//! Producers (cart proxy, variant picker, dialogs) publish a [`ThemeEvent`];
//! any number of consumers subscribe without referencing each other. Each
//! event name carries exactly one payload type, so a consumer matching on
//! `ThemeEvent::VariantChange` is checked against what the variant picker
//! actually sends.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::render::Patch;
use crate::shopify::{CartErrorDetail, CartResponse};
use crate::variant::Variant;

/// Default number of buffered events per subscriber.
const DEFAULT_CAPACITY: usize = 64;

/// An in-page event.
#[derive(Debug, Clone)]
pub enum ThemeEvent {
    /// `cart:added` - an add call succeeded and its sections were rendered.
    CartAdded(Arc<CartResponse>),
    /// `cart:changed` - a change call succeeded and its sections were rendered.
    CartChanged(Arc<CartResponse>),
    /// `cart:error` - a cart call failed; nothing was rendered.
    CartError(CartErrorDetail),
    /// `cart:rendered` - cart sections were replaced.
    CartRendered,
    /// `variant:change` - the selected options resolved to a variant.
    VariantChange(Arc<Variant>),
    /// `variant:newDoc` - the product page re-rendered for the new variant.
    VariantNewDoc(Arc<str>),
    /// `dialog:open`
    DialogOpen {
        dialog_id: String,
        trigger: Option<String>,
    },
    /// `dialog:close`
    DialogClose { dialog_id: String },
    /// `collection:loaded` - a filtered collection grid was swapped in.
    CollectionLoaded,
}

impl ThemeEvent {
    /// The event name as used in theme markup and scripts.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CartAdded(_) => "cart:added",
            Self::CartChanged(_) => "cart:changed",
            Self::CartError(_) => "cart:error",
            Self::CartRendered => "cart:rendered",
            Self::VariantChange(_) => "variant:change",
            Self::VariantNewDoc(_) => "variant:newDoc",
            Self::DialogOpen { .. } => "dialog:open",
            Self::DialogClose { .. } => "dialog:close",
            Self::CollectionLoaded => "collection:loaded",
        }
    }
}

/// Broadcast bus shared by all widgets on a page.
///
/// Cheap to clone; all clones publish to the same subscribers. Subscribers
/// that fall more than the channel capacity behind skip the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ThemeEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a bus with the default buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to every current subscriber.
    ///
    /// Returns the number of subscribers reached. Publishing with no
    /// subscribers is not an error; the event is simply dropped.
    pub fn publish(&self, event: ThemeEvent) -> usize {
        tracing::debug!(event = event.name(), "publishing theme event");
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ThemeEvent> {
        self.sender.subscribe()
    }
}

/// Collect every event currently buffered for `receiver` without waiting.
pub fn drain(receiver: &mut broadcast::Receiver<ThemeEvent>) -> Vec<ThemeEvent> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event subscriber lagged");
            }
            Err(_) => break,
        }
    }
    events
}

/// A widget that reacts to bus events by producing view patches.
pub trait EventListener {
    /// Handle one event, returning the patches to apply (often none).
    fn on_event(&mut self, event: &ThemeEvent) -> Vec<Patch>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(ThemeEvent::CartRendered), 0);
    }

    #[test]
    fn test_every_subscriber_receives() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.clone().subscribe();

        assert_eq!(bus.publish(ThemeEvent::CollectionLoaded), 2);

        assert_eq!(drain(&mut first).len(), 1);
        assert_eq!(drain(&mut second).len(), 1);
        assert!(drain(&mut first).is_empty());
    }

    #[test]
    fn test_subscribers_only_see_later_events() {
        let bus = EventBus::new();
        bus.publish(ThemeEvent::CartRendered);
        let mut late = bus.subscribe();
        bus.publish(ThemeEvent::DialogClose {
            dialog_id: "cart-drawer".to_string(),
        });

        let events = drain(&mut late);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "dialog:close");
    }

    #[test]
    fn test_lagging_subscriber_skips_oldest() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe();
        for _ in 0..5 {
            bus.publish(ThemeEvent::CartRendered);
        }
        assert_eq!(drain(&mut rx).len(), 2);
    }
}
