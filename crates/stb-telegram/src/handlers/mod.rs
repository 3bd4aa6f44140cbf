//! Telegram update handlers.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::router::AppState;

mod commands;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if !text.starts_with('/') {
        let _ = bot
            .send_message(msg.chat.id, "Send /shorten <URL> to get a short link.")
            .await;
        return Ok(());
    }
    commands::handle_command(bot, msg, state).await
}
