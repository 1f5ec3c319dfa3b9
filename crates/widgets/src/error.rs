//! Unified error handling with Sentry integration.
//!
//! Each subsystem has its own error enum; widget operations return
//! `Result<T, WidgetError>`, which folds them together. Errors worth an
//! operator's attention are captured to Sentry via [`WidgetError::report`].

use theme_widgets_core::HandleError;
use thiserror::Error;

use crate::bundle::TierError;
use crate::config::ConfigError;
use crate::render::RenderError;
use crate::shopify::{CartErrorDetail, StorefrontError};
use crate::store::StoreError;

/// Crate-level error type.
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Storefront error: {0}")]
    Storefront(#[from] StorefrontError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Bundle tier error: {0}")]
    Tier(#[from] TierError),

    #[error("Invalid product handle: {0}")]
    Handle(#[from] HandleError),

    /// A cart call was rejected; the `cart:error` event has already been emitted.
    #[error("Cart rejected: {}", .0.description)]
    CartRejected(CartErrorDetail),

    /// Bundle checkout or add-to-cart with nothing staged.
    #[error("Bundle is empty")]
    EmptyBundle,

    /// A zero quantity, or one that would overflow the staged total.
    #[error("Quantity must be positive and within range")]
    InvalidQuantity,
}

impl WidgetError {
    /// Log the error and capture it to Sentry when it indicates a fault
    /// rather than an expected shopper-facing outcome.
    pub fn report(&self) {
        if matches!(
            self,
            Self::Store(_) | Self::Render(_) | Self::Template(_) | Self::Storefront(_)
        ) {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Widget error"
            );
        } else {
            tracing::warn!(error = %self, "Widget operation failed");
        }
    }
}

/// Result type alias for `WidgetError`.
pub type Result<T> = std::result::Result<T, WidgetError>;

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_error_display() {
        assert_eq!(WidgetError::EmptyBundle.to_string(), "Bundle is empty");

        let err = WidgetError::CartRejected(CartErrorDetail {
            status: Some(422),
            message: "Cart Error".to_string(),
            description: "Sold out".to_string(),
        });
        assert_eq!(err.to_string(), "Cart rejected: Sold out");
    }

    #[test]
    fn test_from_conversions() {
        let err: WidgetError = StoreError::Poisoned.into();
        assert!(matches!(err, WidgetError::Store(_)));

        let err: WidgetError = HandleError::Empty.into();
        assert_eq!(err.to_string(), "Invalid product handle: handle cannot be empty");
    }
}
