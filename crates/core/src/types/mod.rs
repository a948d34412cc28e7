//! Core types for Sake Passport.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod rating;

pub use id::*;
pub use rating::{Rating, RatingError};
