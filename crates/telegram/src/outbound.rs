use {
    async_trait::async_trait,
    teloxide::{
        payloads::{CopyMessageSetters, SendMessageSetters},
        prelude::*,
        types::{ChatId, MessageId, ParseMode},
    },
    tracing::warn,
};

use ferrybot_relay::{Error, InboundMessage, RelayTransport, Result, ThreadId, UserId};

/// Outbound side of the relay: copy messages across and manage topics via
/// the Bot API. No retries here; failures surface to the router.
pub struct TelegramTransport {
    bot: Bot,
    group_id: ChatId,
}

/// Topic icon color, one of the palette values the Bot API accepts.
const TOPIC_ICON_COLOR: u32 = 0x6FB9F0;

impl TelegramTransport {
    pub fn new(bot: Bot, group_id: i64) -> Self {
        Self {
            bot,
            group_id: ChatId(group_id),
        }
    }
}

fn as_tg_thread(thread_id: ThreadId) -> teloxide::types::ThreadId {
    teloxide::types::ThreadId(MessageId(thread_id as i32))
}

#[async_trait]
impl RelayTransport for TelegramTransport {
    async fn send_notice(
        &self,
        chat_id: i64,
        thread_id: Option<ThreadId>,
        text: &str,
    ) -> Result<()> {
        let mut req = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(thread) = thread_id {
            req = req.message_thread_id(as_tg_thread(thread));
        }
        match req.await {
            Ok(_) => Ok(()),
            Err(e) => {
                // HTML can be rejected over template data; fall back to
                // plain text before giving up.
                warn!(chat_id, error = %e, "html notice failed, retrying as plain text");
                let mut plain = self.bot.send_message(ChatId(chat_id), text);
                if let Some(thread) = thread_id {
                    plain = plain.message_thread_id(as_tg_thread(thread));
                }
                plain
                    .await
                    .map_err(|e| Error::delivery("send notice", e))?;
                Ok(())
            },
        }
    }

    async fn copy_to_thread(&self, thread_id: ThreadId, message: &InboundMessage) -> Result<()> {
        self.bot
            .copy_message(
                self.group_id,
                ChatId(message.chat_id),
                MessageId(message.message_id as i32),
            )
            .message_thread_id(as_tg_thread(thread_id))
            .await
            .map_err(|e| Error::delivery("copy message into thread", e))?;
        Ok(())
    }

    async fn copy_to_user(&self, user_id: UserId, message: &InboundMessage) -> Result<()> {
        self.bot
            .copy_message(
                ChatId(user_id),
                ChatId(message.chat_id),
                MessageId(message.message_id as i32),
            )
            .await
            .map_err(|e| Error::delivery("copy reply to user", e))?;
        Ok(())
    }

    async fn create_topic(&self, title: &str) -> Result<()> {
        // teloxide declares the icon parameters as required even though the
        // Bot API treats them as optional.
        self.bot
            .create_forum_topic(self.group_id, title, TOPIC_ICON_COLOR, String::new())
            .await
            .map_err(|e| Error::delivery("create forum topic", e))?;
        Ok(())
    }
}
