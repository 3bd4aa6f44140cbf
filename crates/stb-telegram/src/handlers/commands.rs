use std::sync::Arc;

use teloxide::{prelude::*, types::ParseMode};

use stb_core::{
    domain::{LinkRecord, UserId},
    errors::Error,
    formatting::{ellipsize_middle, escape_html},
    service::{RotationReport, ShortenOutcome, StatusReport},
};

use crate::router::AppState;

const URL_DISPLAY_MAX: usize = 60;

const HELP: &str = "👋 Send me any URL with /shorten to get a short link.\n\
Example: /shorten https://example.com/page\n\n\
/status - Show the active shortener\n\
/links - Show your recent links\n\n\
Owner can also run /rotate to switch providers and re-generate all old links.";

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

/// First whitespace-separated argument, if any.
fn first_arg(args: &str) -> Option<&str> {
    args.split_whitespace().next()
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let user_id = UserId(user.id.0 as i64);
    let (cmd, args) = parse_command(text);

    let reply = match cmd.as_str() {
        "start" | "help" => HELP.to_string(),

        "shorten" => match first_arg(&args) {
            None => usage_reply(),
            Some(url) => shorten_reply(&state.links.shorten(user_id, url).await),
        },

        "rotate" => {
            if !state.links.is_owner(user_id) {
                tracing::warn!(user = user_id.0, "rotate denied");
                unauthorized_reply()
            } else {
                let _ = bot
                    .send_message(msg.chat.id, "⏳ Rotating provider and re-shortening links…")
                    .await;
                rotate_reply(&state.links.rotate(user_id).await)
            }
        }

        "status" => status_reply(&state.links.status()),

        "links" => links_reply(&state.links.recent_links(user_id, state.cfg.links_page_size)),

        _ => "Unknown command. Try /start.".to_string(),
    };

    bot.send_message(msg.chat.id, reply)
        .parse_mode(ParseMode::Html)
        .disable_web_page_preview(true)
        .await?;
    Ok(())
}

fn usage_reply() -> String {
    "❗️ Usage: /shorten &lt;URL&gt;".to_string()
}

fn unauthorized_reply() -> String {
    "❌ You are not authorized.".to_string()
}

fn internal_error_reply(e: &Error) -> String {
    tracing::error!(error = %e, "command failed");
    "⚠️ Internal error, please try again later.".to_string()
}

fn shorten_reply(result: &stb_core::Result<ShortenOutcome>) -> String {
    match result {
        Ok(out) => format!(
            "✅ Shortened via {}:\n{}",
            escape_html(&out.provider_name),
            escape_html(&out.record.short_url)
        ),
        Err(Error::InvalidUrl(_)) => {
            format!("{}\nOnly http(s) links can be shortened.", usage_reply())
        }
        Err(Error::AllProvidersFailed { .. }) => {
            "⚠️ Could not shorten: all providers failed.".to_string()
        }
        Err(e) => internal_error_reply(e),
    }
}

fn rotate_reply(result: &stb_core::Result<RotationReport>) -> String {
    match result {
        Ok(r) => format!(
            "🔄 Rotated to provider #{} ({}).\nRe-shortened {} of {} links.",
            r.provider_index + 1,
            escape_html(&r.provider_name),
            r.bulk.succeeded,
            r.bulk.total
        ),
        Err(Error::Unauthorized) => unauthorized_reply(),
        Err(e) => internal_error_reply(e),
    }
}

fn status_reply(result: &stb_core::Result<StatusReport>) -> String {
    match result {
        Ok(st) => format!(
            "📊 <b>Status</b>\n\nActive shortener: #{} of {} ({})\nStored links: {}",
            st.provider_index + 1,
            st.provider_count,
            escape_html(&st.provider_name),
            st.link_count
        ),
        Err(e) => internal_error_reply(e),
    }
}

fn links_reply(result: &stb_core::Result<Vec<LinkRecord>>) -> String {
    let links = match result {
        Ok(links) => links,
        Err(e) => return internal_error_reply(e),
    };
    if links.is_empty() {
        return "You have no stored links yet.".to_string();
    }

    let mut out = String::from("🔗 <b>Your recent links</b>\n");
    for rec in links {
        out.push_str(&format!(
            "\n• {} → {}",
            escape_html(&ellipsize_middle(&rec.original_url, URL_DISPLAY_MAX)),
            escape_html(&rec.short_url)
        ));
    }
    out
}
