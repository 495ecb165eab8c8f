//! GB Green Guide Core - Shared types library.
//!
//! This crate provides common types used across all GB Green Guide components:
//! - `client` - Session, cart and checkout stores over the remote REST API
//! - `cli` - Command-line frontend driving the client stores
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
