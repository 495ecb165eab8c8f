//! CLI command implementations.
//!
//! Command output goes to stdout; logs go to stderr.

#![allow(clippy::print_stdout)]

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
