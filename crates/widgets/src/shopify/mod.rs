//! Storefront AJAX API client.
//!
//! # Architecture
//!
//! - Plain `reqwest` calls against the theme's own storefront origin
//! - The storefront is the source of truth for the cart; nothing is mirrored locally
//! - Product JSON is cached in memory via `moka` (5 minute TTL)
//!
//! # Endpoints
//!
//! - `POST <route_add>.js`, `<route_change>.js`, `<route_update>.js`
//! - `GET /products/<handle>.js`
//! - `GET <search_route>?q=...&section_id=predictive-search`
//! - `POST /cart/prepare_shipping_rates.json`, `GET /cart/async_shipping_rates.json`

mod image;
mod types;

pub use image::{ImageRatio, resize_image};
pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;
use theme_widgets_core::ProductHandle;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::{CartRoutes, SearchConfig, WidgetsConfig};

/// Errors that can occur when talking to the storefront.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A route could not be resolved against the storefront origin.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A cart endpoint rejected the call.
    #[error("Cart error: {}", .0.description)]
    Cart(CartErrorDetail),

    /// Any other non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl StorefrontError {
    /// The shopper-facing form of a failed cart call.
    #[must_use]
    pub fn cart_detail(&self) -> CartErrorDetail {
        match self {
            Self::Cart(detail) => detail.clone(),
            Self::Status { status, body } => CartErrorDetail::from_response(*status, body),
            other => CartErrorDetail::network(other),
        }
    }
}

/// Polling bounds for async shipping rates.
const SHIPPING_POLL_ATTEMPTS: u32 = 5;

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the storefront AJAX endpoints.
///
/// Cheap to clone; clones share the HTTP connection pool and product cache.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    base: Url,
    routes: CartRoutes,
    search: SearchConfig,
    poll_interval: Duration,
    cache: Cache<String, Arc<ProductJson>>,
}

impl std::fmt::Debug for StorefrontClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontClient")
            .field("base", &self.inner.base.as_str())
            .finish_non_exhaustive()
    }
}

impl StorefrontClient {
    /// Create a client for the configured storefront.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Http` if the HTTP client cannot be built.
    pub fn new(config: &WidgetsConfig) -> Result<Self, StorefrontError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(StorefrontClientInner {
                client,
                base: config.storefront_url.clone(),
                routes: config.routes.clone(),
                search: config.search.clone(),
                poll_interval: Duration::from_millis(500),
                cache,
            }),
        })
    }

    /// Override the delay between async shipping rate polls.
    #[must_use]
    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        let inner = &self.inner;
        Self {
            inner: Arc::new(StorefrontClientInner {
                client: inner.client.clone(),
                base: inner.base.clone(),
                routes: inner.routes.clone(),
                search: inner.search.clone(),
                poll_interval,
                cache: inner.cache.clone(),
            }),
        }
    }

    /// Configured cart routes.
    #[must_use]
    pub fn routes(&self) -> &CartRoutes {
        &self.inner.routes
    }

    /// Resolve a storefront path against the origin.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Url` for unparseable paths.
    pub fn url(&self, path: &str) -> Result<Url, StorefrontError> {
        Ok(self.inner.base.join(path)?)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// `POST <route_add>.js`
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Cart` when the endpoint rejects the add.
    #[instrument(skip(self, request))]
    pub async fn cart_add(&self, request: &CartRequest) -> Result<CartResponse, StorefrontError> {
        self.post_cart(&self.inner.routes.add, request).await
    }

    /// `POST <route_change>.js`
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Cart` when the endpoint rejects the change.
    #[instrument(skip(self, body))]
    pub async fn cart_change(&self, body: Value) -> Result<CartResponse, StorefrontError> {
        self.post_cart(&self.inner.routes.change, &CartRequest::Json(body))
            .await
    }

    /// `POST <route_update>.js`
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Cart` when the endpoint rejects the update.
    #[instrument(skip(self, body))]
    pub async fn cart_update(&self, body: Value) -> Result<CartResponse, StorefrontError> {
        self.post_cart(&self.inner.routes.update, &CartRequest::Json(body))
            .await
    }

    async fn post_cart(
        &self,
        route: &str,
        request: &CartRequest,
    ) -> Result<CartResponse, StorefrontError> {
        let url = self.url(&format!("{route}.js"))?;
        let builder = self
            .inner
            .client
            .post(url)
            .header("Accept", "application/json");

        let builder = match request {
            CartRequest::Form(fields) => {
                debug!(fields = ?fields, "cart form request");
                builder.form(fields)
            }
            CartRequest::Json(body) => {
                debug!(body = %body, "cart JSON request");
                builder.json(body)
            }
        };

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                body = %text.chars().take(500).collect::<String>(),
                "cart endpoint returned non-success status"
            );
            return Err(StorefrontError::Cart(CartErrorDetail::from_response(
                status.as_u16(),
                &text,
            )));
        }

        Ok(serde_json::from_str(&text)?)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Product JSON by handle, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::NotFound` for unknown handles.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn product(&self, handle: &ProductHandle) -> Result<Arc<ProductJson>, StorefrontError> {
        let cache_key = handle.as_str().to_string();
        if let Some(product) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let path = format!("/products/{}.js", urlencoding::encode(handle.as_str()));
        let response = self.inner.client.get(self.url(&path)?).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorefrontError::NotFound(handle.to_string()));
        }
        let text = response.text().await?;
        if !status.is_success() {
            return Err(StorefrontError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let product = Arc::new(serde_json::from_str::<ProductJson>(&text)?);
        self.inner.cache.insert(cache_key, Arc::clone(&product)).await;
        Ok(product)
    }

    /// HTML of a storefront page (e.g. a product page for a specific variant).
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Status` for non-success responses.
    #[instrument(skip(self))]
    pub async fn page(&self, url: Url) -> Result<String, StorefrontError> {
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(StorefrontError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Predictive search URL for `query`.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Url` when the search route is invalid.
    pub fn search_url(&self, query: &str) -> Result<Url, StorefrontError> {
        let search = &self.inner.search;
        let mut url = self.url(&search.route)?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("resources[type]", &search.resource_types)
            .append_pair("resources[limit]", &search.limit.to_string())
            .append_pair("section_id", "predictive-search");
        Ok(url)
    }

    /// Rendered predictive search section for `query`.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Status` for non-success responses.
    #[instrument(skip(self))]
    pub async fn predictive_search(&self, query: &str) -> Result<String, StorefrontError> {
        let url = self.search_url(query)?;
        self.page(url).await
    }

    // =========================================================================
    // Shipping
    // =========================================================================

    fn shipping_url(&self, path: &str, address: &ShippingAddress) -> Result<Url, StorefrontError> {
        let mut url = self.url(path)?;
        url.query_pairs_mut().extend_pairs(address.query_pairs());
        Ok(url)
    }

    /// Ask the storefront to start computing rates for `address`.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Http` when the request fails outright.
    #[instrument(skip(self))]
    pub async fn prepare_shipping_rates(
        &self,
        address: &ShippingAddress,
    ) -> Result<PrepareOutcome, StorefrontError> {
        let url = self.shipping_url("/cart/prepare_shipping_rates.json", address)?;
        let response = self.inner.client.post(url).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(PrepareOutcome::Accepted);
        }

        let text = response.text().await?;
        debug!(status = status.as_u16(), body = %text, "shipping address rejected");
        Ok(PrepareOutcome::rejected_from_body(&text))
    }

    /// Fetch computed rates, polling while the storefront reports them pending.
    ///
    /// Returns an empty list when the quote is still pending after the last poll.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError` for failed requests or unparseable bodies.
    #[instrument(skip(self))]
    pub async fn async_shipping_rates(
        &self,
        address: &ShippingAddress,
    ) -> Result<Vec<ShippingRate>, StorefrontError> {
        let url = self.shipping_url("/cart/async_shipping_rates.json", address)?;

        for attempt in 1..=SHIPPING_POLL_ATTEMPTS {
            let response = self.inner.client.get(url.clone()).send().await?;
            let status = response.status();
            let text = response.text().await?;

            if !status.is_success() {
                return Err(StorefrontError::Status {
                    status: status.as_u16(),
                    body: text,
                });
            }

            let body: Option<ShippingRatesBody> = if text.trim().is_empty() {
                None
            } else {
                serde_json::from_str(&text)?
            };
            let pending = status == reqwest::StatusCode::ACCEPTED;

            match body.and_then(|b| b.shipping_rates) {
                Some(rates) if !pending => return Ok(rates),
                _ => {
                    debug!(attempt, "shipping rates pending");
                    if attempt < SHIPPING_POLL_ATTEMPTS {
                        tokio::time::sleep(self.inner.poll_interval).await;
                    }
                }
            }
        }

        tracing::warn!("shipping rates still pending after polling");
        Ok(Vec::new())
    }
}
