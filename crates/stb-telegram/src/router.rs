use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use stb_core::{config::Config, service::LinkService};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub links: Arc<LinkService>,
}

pub async fn run_polling(cfg: Arc<Config>, links: Arc<LinkService>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "stb started"),
        Err(e) => tracing::warn!(error = %e, "getMe failed; continuing"),
    }
    match links.status() {
        Ok(st) => tracing::info!(
            provider = %st.provider_name,
            index = st.provider_index,
            providers = st.provider_count,
            links = st.link_count,
            "active shortener"
        ),
        Err(e) => tracing::error!(error = %e, "failed to read store status"),
    }

    let state = Arc::new(AppState { cfg, links });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
