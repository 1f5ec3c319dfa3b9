//! Core types for the theme widgets.
//!
//! This module provides type-safe wrappers for common storefront concepts.

pub mod handle;
pub mod id;
pub mod money;

pub use handle::{HandleError, ProductHandle};
pub use id::*;
pub use money::{Money, MoneyFormat};
