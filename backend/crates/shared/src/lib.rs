//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of the service vocabulary:
//! - Common error types and result aliases
//! - The JSON envelope every failed request is answered with
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all features.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
