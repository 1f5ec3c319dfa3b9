//! Widget configuration loaded from environment variables and markup data attributes.
//!
//! # Environment Variables
//!
//! ## Required
//! - `THEME_STOREFRONT_URL` - Storefront origin (e.g., `https://your-store.myshopify.com`)
//!
//! ## Optional
//! - `THEME_CART_ADD_ROUTE` - Cart add route (default: `/cart/add`)
//! - `THEME_CART_CHANGE_ROUTE` - Cart change route (default: `/cart/change`)
//! - `THEME_CART_UPDATE_ROUTE` - Cart update route (default: `/cart/update`)
//! - `THEME_CART_URL` - Cart page / permalink route (default: `/cart`)
//! - `THEME_SECTIONS_URL` - Page path sections are rendered for (default: `/`)
//! - `THEME_SEARCH_ROUTE` - Predictive search route (default: `/search/suggest`)
//! - `THEME_SEARCH_RESOURCE_TYPES` - Resource types (default: `product,collection,article,page`)
//! - `THEME_SEARCH_LIMIT` - Results per resource type (default: 4)
//! - `THEME_MONEY_FORMAT` - Shop money format (default: `${{amount}}`)
//! - `THEME_HTTP_TIMEOUT_SECS` - Request timeout (default: 10)
//! - `THEME_DATA_DIR` - Directory backing the local key-value store (default: `.theme-widgets`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! # Data Attributes
//!
//! Individual widgets are configured the way the theme markup configures them:
//! through `data-*` attributes, collected into a [`Dataset`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use theme_widgets_core::MoneyFormat;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Missing data attribute: data-{0}")]
    MissingAttribute(String),
    #[error("Invalid data attribute data-{0}: {1}")]
    InvalidAttribute(String, String),
}

/// Widget runtime configuration.
#[derive(Debug, Clone)]
pub struct WidgetsConfig {
    /// Storefront origin all routes are resolved against
    pub storefront_url: Url,
    /// Cart endpoint routes
    pub routes: CartRoutes,
    /// Page path passed as `sections_url` so sections render for the current page
    pub sections_url: String,
    /// Predictive search configuration
    pub search: SearchConfig,
    /// Shop money format
    pub money_format: MoneyFormat,
    /// HTTP request timeout
    pub http_timeout: Duration,
    /// Directory backing the file key-value store
    pub data_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Storefront cart routes, without the `.js` suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartRoutes {
    pub add: String,
    pub change: String,
    pub update: String,
    /// Cart page; also the base of `/cart/<variant>:<qty>` permalinks
    pub cart: String,
}

impl Default for CartRoutes {
    fn default() -> Self {
        Self {
            add: "/cart/add".to_string(),
            change: "/cart/change".to_string(),
            update: "/cart/update".to_string(),
            cart: "/cart".to_string(),
        }
    }
}

/// Predictive search configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub route: String,
    pub resource_types: String,
    pub limit: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            route: "/search/suggest".to_string(),
            resource_types: "product,collection,article,page".to_string(),
            limit: 4,
        }
    }
}

impl WidgetsConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        let storefront_url = vars.required("THEME_STOREFRONT_URL")?;
        let storefront_url = Url::parse(&storefront_url).map_err(|e| {
            ConfigError::InvalidEnvVar("THEME_STOREFRONT_URL".to_string(), e.to_string())
        })?;

        let defaults = CartRoutes::default();
        let routes = CartRoutes {
            add: vars.or_default("THEME_CART_ADD_ROUTE", &defaults.add),
            change: vars.or_default("THEME_CART_CHANGE_ROUTE", &defaults.change),
            update: vars.or_default("THEME_CART_UPDATE_ROUTE", &defaults.update),
            cart: vars.or_default("THEME_CART_URL", &defaults.cart),
        };

        let search_defaults = SearchConfig::default();
        let search = SearchConfig {
            route: vars.or_default("THEME_SEARCH_ROUTE", &search_defaults.route),
            resource_types: vars
                .or_default("THEME_SEARCH_RESOURCE_TYPES", &search_defaults.resource_types),
            limit: vars.parsed("THEME_SEARCH_LIMIT", search_defaults.limit)?,
        };

        let money_format = vars
            .optional("THEME_MONEY_FORMAT")
            .map_or_else(MoneyFormat::default, MoneyFormat::new);
        let http_timeout = Duration::from_secs(vars.parsed("THEME_HTTP_TIMEOUT_SECS", 10)?);

        Ok(Self {
            storefront_url,
            routes,
            sections_url: vars.or_default("THEME_SECTIONS_URL", "/"),
            search,
            money_format,
            http_timeout,
            data_dir: PathBuf::from(vars.or_default("THEME_DATA_DIR", ".theme-widgets")),
            sentry_dsn: vars.optional("SENTRY_DSN"),
            sentry_environment: vars.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration pointing at `storefront_url` with every optional value defaulted.
    #[must_use]
    pub fn for_storefront(storefront_url: Url) -> Self {
        Self {
            storefront_url,
            routes: CartRoutes::default(),
            sections_url: "/".to_string(),
            search: SearchConfig::default(),
            money_format: MoneyFormat::default(),
            http_timeout: Duration::from_secs(10),
            data_dir: PathBuf::from(".theme-widgets"),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Vars<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable, treating empty values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to a default when unset.
    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// The `data-*` attributes of a widget's root element.
///
/// Keys are stored without the `data-` prefix in kebab case, as written in
/// markup (`data-bundle-id` → `bundle-id`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Dataset(HashMap<String, String>);

impl Dataset {
    /// Create an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.insert(normalize_key(key), value.into());
        self
    }

    /// Insert or replace an attribute.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(normalize_key(key), value.into());
    }

    /// Raw attribute value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Attribute value or empty string, like reading a missing `dataset` key into a template.
    #[must_use]
    pub fn text(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    /// Required attribute value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingAttribute` when absent.
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingAttribute(key.to_string()))
    }

    /// Parse an attribute, falling back to `default` when absent or blank.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidAttribute` when present but unparseable.
    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key).map(str::trim) {
            None | Some("") => Ok(default),
            Some(raw) => raw
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidAttribute(key.to_string(), e.to_string())),
        }
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Dataset {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dataset = Self::new();
        for (key, value) in iter {
            dataset.insert(key.as_ref(), value);
        }
        dataset
    }
}

fn normalize_key(key: &str) -> String {
    key.strip_prefix("data-").unwrap_or(key).to_string()
}
