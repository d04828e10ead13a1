use std::{sync::Arc, time::Duration};

use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        payloads::SendMessageSetters,
        prelude::*,
        types::{AllowedUpdate, BotCommand, ParseMode, Update, UpdateKind},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use ferrybot_relay::{AuditLog, RelayRouter};

use crate::{commands, config::TelegramConfig, convert, templates::TelegramNotices};

/// Build the bot client, verify credentials, and prepare long polling.
///
/// Returns the bot together with its username (used to answer addressed
/// commands like `/help@this_bot`).
pub async fn connect(config: &TelegramConfig) -> anyhow::Result<(Bot, Option<String>)> {
    // Client timeout above the long-polling timeout (30s) so the HTTP client
    // doesn't abort the request before Telegram responds.
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(45))
        .build()?;
    let bot = Bot::with_client(config.token.expose_secret(), client);

    let me = bot.get_me().await?;
    let username = me.username.clone();

    // Delete any existing webhook so long polling works.
    bot.delete_webhook().send().await?;

    // Register slash commands for autocomplete in Telegram clients.
    let bot_commands = vec![
        BotCommand::new("start", "Start talking to the support team"),
        BotCommand::new("help", "How this bot works"),
        BotCommand::new("info", "About this bot"),
    ];
    if let Err(e) = bot.set_my_commands(bot_commands).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = ?username, "telegram bot connected (webhook cleared)");
    Ok((bot, username))
}

/// Start the manual long-polling loop.
///
/// Spawns a background task that processes updates until the returned
/// `CancellationToken` is cancelled. Each update is isolated: a failing
/// event is logged and the loop keeps serving.
pub fn start_polling(
    bot: Bot,
    bot_username: Option<String>,
    router: RelayRouter,
    notices: Arc<TelegramNotices>,
    audit: Option<Arc<dyn AuditLog>>,
) -> CancellationToken {
    let cancel = CancellationToken::new();
    let loop_cancel = cancel.clone();

    tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut offset: i32 = 0;

        loop {
            if loop_cancel.is_cancelled() {
                info!("telegram polling stopped");
                break;
            }

            let result = bot
                .get_updates()
                .offset(offset)
                .timeout(30)
                .allowed_updates(vec![
                    AllowedUpdate::Message,
                    AllowedUpdate::EditedMessage,
                    AllowedUpdate::MyChatMember,
                ])
                .await;

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        handle_update(
                            &bot,
                            &update,
                            bot_username.as_deref(),
                            &router,
                            &notices,
                            audit.as_deref(),
                        )
                        .await;
                    }
                },
                Err(e) => {
                    // Another bot instance is polling with the same token.
                    if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                        error!("telegram polling disabled: another instance is running with this token");
                        loop_cancel.cancel();
                        break;
                    }

                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                },
            }
        }
    });

    cancel
}

/// Audit, answer commands in place, and hand everything else to the router.
async fn handle_update(
    bot: &Bot,
    update: &Update,
    bot_username: Option<&str>,
    router: &RelayRouter,
    notices: &TelegramNotices,
    audit: Option<&dyn AuditLog>,
) {
    // Record the raw update before any processing, best-effort.
    if let Some(audit) = audit {
        match serde_json::to_value(update) {
            Ok(payload) => {
                if let Err(e) = audit.record(i64::from(update.id.0), &payload).await {
                    warn!(update_id = update.id.0, error = %e, "failed to audit update");
                }
            },
            Err(e) => warn!(update_id = update.id.0, error = %e, "failed to serialize update"),
        }
    }

    if let UpdateKind::Message(msg) = &update.kind {
        if let Some(command) = msg.text().and_then(|t| commands::parse(t, bot_username)) {
            respond_to_command(bot, msg.chat.id, &command, notices).await;
            return;
        }
    }

    let Some(event) = convert::inbound_event(update) else {
        debug!(update_id = update.id.0, "ignoring unsupported update kind");
        return;
    };
    if let Err(e) = router.handle(event).await {
        error!(update_id = update.id.0, error = %e, "error handling telegram update");
    }
}

async fn respond_to_command(
    bot: &Bot,
    chat_id: ChatId,
    command: &commands::Command,
    notices: &TelegramNotices,
) {
    let text = match notices.command_reply(command) {
        Ok(text) => text,
        Err(e) => {
            warn!(chat_id = chat_id.0, error = %e, "failed to render command reply");
            return;
        },
    };
    if let Err(e) = bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await
    {
        warn!(chat_id = chat_id.0, error = %e, "failed to send command reply");
    }
}
