//! Core domain + application logic for the shortener Telegram bot.
//!
//! This crate is framework-agnostic. Telegram lives in `stb-telegram`; the
//! third-party shortening APIs sit behind the `Shortener` trait.

pub mod bulk;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod registry;
pub mod rotation;
pub mod service;
pub mod shortener;
pub mod store;

pub use errors::{Error, ProviderError, Result};
