//! Core domain + application logic for the Packagist Telegram bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and Packagist live
//! behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod offset;
pub mod ports;
pub mod registry;
pub mod updates;

pub use errors::{Error, Result};
