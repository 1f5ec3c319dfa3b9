//! Theme Widgets Core - Shared types library.
//!
//! This crate provides common types used across all theme widget components:
//! - `widgets` - Cart proxy, bundle builder, variant picker and friends
//! - `cli` - Command-line driver for exercising widgets against a storefront
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, and product handles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
