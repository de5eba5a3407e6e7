//! Dropkit Core - Shared types library.
//!
//! This crate provides common types used across all Dropkit components:
//! - `orders` - Order-fulfillment and order-tracking reconciliation pipeline
//! - `integration-tests` - Cross-component test harness
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money amounts, statuses,
//!   platforms, and raw/normalized address shapes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
