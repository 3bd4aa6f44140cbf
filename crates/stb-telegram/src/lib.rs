//! Telegram adapter (teloxide).
//!
//! Receives `/start`, `/shorten`, `/rotate`, `/status` and `/links` and drives
//! `stb_core::service::LinkService`.

pub mod handlers;
pub mod router;
