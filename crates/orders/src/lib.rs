//! Dropkit order-fulfillment reconciliation pipeline.
//!
//! This crate is the core library behind the orders view: it pages orders
//! out of a connected store (directly, via a search-index mirror, or via
//! the local database mirror), cross-references the lines against the
//! locally mapped catalog, computes cached placement records for the
//! place-order flow, keeps the order-track ledger consistent, and
//! reconciles platform shipments back into fulfillment statuses.
//!
//! The web/task layer consuming this crate provides the boundary
//! collaborators as trait objects: [`adapters::StoreAdapter`] per platform,
//! [`permissions::PermissionOracle`], [`notify::NotificationSink`],
//! [`sync::SearchIndex`], and [`feed::SupplierFeed`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod adapters;
pub mod address;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod lines;
pub mod mapping;
pub mod models;
pub mod notify;
pub mod permissions;
pub mod reconcile;
pub mod stores;
pub mod sync;
pub mod tasks;
pub mod tracks;

pub use error::{OrderFlowError, UpstreamApiError};
