//! Core types for Dropkit.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod id;
pub mod money;
pub mod platform;
pub mod status;

pub use address::{AddressCorrection, AddressFlags, NormalizedAddress, RawAddress};
pub use id::*;
pub use money::{Money, parse_amount};
pub use platform::{Platform, SupplierType};
pub use status::*;
