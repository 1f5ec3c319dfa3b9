//! Theme widgets CLI - drive the widgets against a live storefront.
//!
//! Client-side state (bundles, wishlist) is kept in `THEME_DATA_DIR`, one
//! JSON file per key, the way a browser profile keeps `localStorage`. The
//! patches each command would apply to the page are printed, followed by
//! the events it broadcast.
//!
//! # Usage
//!
//! ```bash
//! # Stage a variant in a bundle and show the totals
//! tw-cli bundle --bundle-id summer --tiers "2:5;4:10" add classic-tee -q 2
//! tw-cli bundle --bundle-id summer show
//!
//! # Save a product to the wishlist
//! tw-cli wishlist toggle classic-tee
//!
//! # Add to the cart, rendering sections for the product page
//! tw-cli --page /products/classic-tee cart add 4242
//! ```
//!
//! # Environment Variables
//!
//! - `THEME_STOREFRONT_URL` - Storefront origin (required)
//! - `THEME_DATA_DIR` - Directory of the local store
//! - `RUST_LOG` - Log filter (default: `theme_widgets=info`)
//! - `SENTRY_DSN` - Sentry DSN for error tracking

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::Page;
use commands::bundle::{BundleAction, BundleArgs};
use commands::cart::CartAction;
use commands::storefront::{ShippingArgs, VariantAction};
use commands::wishlist::WishlistAction;

#[derive(Parser)]
#[command(name = "tw-cli")]
#[command(author, version, about = "Theme widgets CLI")]
struct Cli {
    /// Path of the page sections are rendered for
    #[arg(long, global = true)]
    page: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bundle builder
    Bundle {
        #[command(flatten)]
        settings: BundleArgs,

        #[command(subcommand)]
        action: BundleAction,
    },
    /// Wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Server cart, through the cart proxy
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Variant resolution
    Variant {
        #[command(subcommand)]
        action: VariantAction,
    },
    /// Predictive search
    Search { query: String },
    /// Shipping rate estimate
    Shipping {
        #[command(flatten)]
        address: ShippingArgs,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|d| !d.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: std::env::var("SENTRY_ENVIRONMENT")
                .ok()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "theme_widgets=info,tw_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let mut page = Page::open(cli.page)?;

    match cli.command {
        Commands::Bundle { settings, action } => {
            commands::bundle::run(&mut page, &settings, action).await
        }
        Commands::Wishlist { action } => commands::wishlist::run(&mut page, action).await,
        Commands::Cart { action } => commands::cart::run(&mut page, action).await,
        Commands::Variant { action } => commands::storefront::resolve(&page, action).await,
        Commands::Search { query } => commands::storefront::search(&mut page, &query).await,
        Commands::Shipping { address } => commands::storefront::shipping(&mut page, address).await,
    }
}
