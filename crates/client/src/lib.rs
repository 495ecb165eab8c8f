//! GB Green Guide client library.
//!
//! Session, cart and checkout stores for the GB Green Guide REST API, plus
//! the catalog and gallery views built on it. The `gbg` CLI drives this
//! crate; anything else that renders the shop can too.
//!
//! # Architecture
//!
//! - [`session`] - Who is logged in; persisted, expiry-checked bearer token
//! - [`cart`] - Local mirror of the remote cart, replaced by every response
//! - [`checkout`] - Form validation and the order submit lifecycle
//! - [`api`] - REST client and the [`api::RemoteApi`] seam the stores use
//! - [`state`] - [`state::AppContext`], which wires everything once
//!
//! State is observable through `tokio::sync::watch` receivers handed out by
//! each store's `subscribe` method.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod gallery;
pub mod models;
pub mod session;
pub mod state;

pub use error::{ClientError, Result};
