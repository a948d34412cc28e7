//! Sake Passport Core - Shared types library.
//!
//! This crate provides the domain types used across all Sake Passport components:
//! - `web` - The attendee-facing passport application
//! - `cli` - Command-line tools for migrations and exports
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no timers. Everything that decides *what* happens to a passport lives
//! here; the `web` crate decides *when* and *where* it happens.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for item ids, identities and ratings
//! - [`catalog`] - The bundled, immutable tasting catalog
//! - [`ranking`] - Ranking records, partial updates and the merge policy
//! - [`scan`] - Scan code normalization and stamp decisions
//! - [`views`] - Derived view models (map progress, catalog, passport)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod ranking;
pub mod scan;
pub mod types;
pub mod views;

pub use catalog::{Catalog, CatalogItem};
pub use ranking::{RankingRecord, RankingUpdate, ReadModel};
pub use scan::{ScanDecision, normalize_code};
pub use types::*;
