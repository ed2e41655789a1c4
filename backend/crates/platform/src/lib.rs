//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (CSPRNG tokens, HMAC-SHA256, constant-time eq)
//! - Cookie management
//! - Client identification behind reverse proxies
//! - Sliding-window rate limiting primitives

pub mod client;
pub mod cookie;
pub mod crypto;
pub mod rate_limit;
