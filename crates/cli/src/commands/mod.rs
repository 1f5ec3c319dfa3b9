//! Command implementations.
//!
//! Every command runs against one simulated page: the storefront client,
//! a file-backed store standing in for the browser profile, an event bus and
//! a [`Snapshot`] sink. What the widgets would have done to the page is
//! printed afterwards.

pub mod bundle;
pub mod cart;
pub mod storefront;
pub mod wishlist;

use std::sync::{Arc, Mutex};

use theme_widgets::config::ConfigError;
use theme_widgets::events::drain;
use theme_widgets::shopify::{StorefrontClient, StorefrontError};
use theme_widgets::store::StoreError;
use theme_widgets::{EventBus, FileStore, Patch, Snapshot, ThemeEvent, WidgetError, WidgetsConfig};
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Storefront error: {0}")]
    Storefront(#[from] StorefrontError),

    #[error(transparent)]
    Widget(#[from] WidgetError),

    /// The product has no variant with the requested id.
    #[error("Product {handle} has no variant {variant}")]
    UnknownVariant { handle: String, variant: String },

    #[error("Render sink lock poisoned")]
    Poisoned,
}

/// The simulated page a command acts on.
pub struct Page {
    pub config: WidgetsConfig,
    pub client: StorefrontClient,
    pub store: Arc<FileStore>,
    pub bus: EventBus,
    pub sink: Arc<Mutex<Snapshot>>,
    events: broadcast::Receiver<ThemeEvent>,
}

impl Page {
    /// Open a page rendered for `sections_url` (defaults to the configured one).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is missing or the data directory
    /// cannot be created.
    pub fn open(sections_url: Option<String>) -> Result<Self, CommandError> {
        let mut config = WidgetsConfig::from_env()?;
        if let Some(url) = sections_url {
            config.sections_url = url;
        }

        let client = StorefrontClient::new(&config)?;
        let store = Arc::new(FileStore::open(config.data_dir.clone())?);
        let bus = EventBus::new();
        let events = bus.subscribe();

        tracing::debug!(data_dir = %store.dir().display(), "page opened");
        Ok(Self {
            config,
            client,
            store,
            bus,
            sink: Arc::new(Mutex::new(Snapshot::new())),
            events,
        })
    }

    /// Print and forget the patches and events produced so far.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Poisoned` if a widget panicked mid-render.
    pub fn flush(&mut self) -> Result<(), CommandError> {
        let patches = self
            .sink
            .lock()
            .map_err(|_| CommandError::Poisoned)?
            .take();
        print_patches(&patches);
        print_events(&drain(&mut self.events));
        Ok(())
    }
}

#[allow(clippy::print_stdout)]
fn print_patches(patches: &[Patch]) {
    for patch in patches {
        println!("patch  {patch:?}");
    }
}

#[allow(clippy::print_stdout)]
fn print_events(events: &[ThemeEvent]) {
    for event in events {
        match event {
            ThemeEvent::CartError(detail) => {
                println!("event  {} {}: {}", event.name(), detail.message, detail.description);
            }
            ThemeEvent::VariantChange(variant) => {
                println!("event  {} variant={}", event.name(), variant.id);
            }
            ThemeEvent::VariantNewDoc(html) => {
                println!("event  {} ({} bytes)", event.name(), html.len());
            }
            ThemeEvent::DialogOpen { dialog_id, .. } | ThemeEvent::DialogClose { dialog_id } => {
                println!("event  {} {dialog_id}", event.name());
            }
            _ => println!("event  {}", event.name()),
        }
    }
}
