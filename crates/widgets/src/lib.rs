//! Theme widgets library.
//!
//! The interactive layer of the Shopify theme as a library: the cart
//! drawer's cart proxy, the bundle builder, the variant picker and its
//! followers, the wishlist and predictive search.
//!
//! # Architecture
//!
//! - Widgets read their settings from markup data attributes ([`config::Dataset`]).
//! - Server state lives behind the storefront's AJAX endpoints ([`shopify::StorefrontClient`]).
//! - Client state lives in a [`store::KeyValueStore`] (browser `localStorage` analogue).
//! - Views are pure functions producing [`render::Patch`]es for a [`render::RenderSink`].
//! - Widgets talk to each other through typed [`events::ThemeEvent`]s on an [`events::EventBus`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bundle;
pub mod cart;
pub mod config;
pub mod dialog;
pub mod error;
pub mod events;
pub mod render;
pub mod search;
pub mod shopify;
pub mod store;
pub mod variant;
pub mod wishlist;

pub use config::{Dataset, WidgetsConfig};
pub use error::{Result, WidgetError};
pub use events::{EventBus, EventListener, ThemeEvent};
pub use render::{Document, Patch, RenderSink, SharedSink, Snapshot, Target};
pub use store::{FileStore, KeyValueStore, MemoryStore};
