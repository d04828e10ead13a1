use askama::Template;

use ferrybot_relay::{Error, Notice, NoticeRender, Result, UserId};

use crate::commands::Command;

/// Topic titles are plain text, not HTML; the id token must survive verbatim
/// for later extraction.
#[derive(Template)]
#[template(path = "topic_title.html", escape = "none")]
struct TopicTitleTemplate<'a> {
    name: &'a str,
    user_id: UserId,
}

#[derive(Template)]
#[template(path = "empty_reply.html", escape = "html")]
struct EmptyReplyTemplate;

#[derive(Template)]
#[template(path = "delivery_failed.html", escape = "html")]
struct DeliveryFailedTemplate<'a> {
    reason: &'a str,
}

#[derive(Template)]
#[template(path = "start.html", escape = "html")]
struct StartTemplate;

#[derive(Template)]
#[template(path = "help.html", escape = "html")]
struct HelpTemplate;

#[derive(Template)]
#[template(path = "info.html", escape = "html")]
struct InfoTemplate;

#[derive(Template)]
#[template(path = "unknown_command.html", escape = "html")]
struct UnknownCommandTemplate<'a> {
    command: &'a str,
}

/// Askama-backed renderer for all user-facing texts.
pub struct TelegramNotices;

impl TelegramNotices {
    /// Reply text for a slash command.
    pub fn command_reply(&self, command: &Command) -> Result<String> {
        let rendered = match command {
            Command::Start => StartTemplate.render(),
            Command::Help => HelpTemplate.render(),
            Command::Info => InfoTemplate.render(),
            Command::Unknown(name) => UnknownCommandTemplate { command: name }.render(),
        };
        rendered.map_err(|e| Error::render("command reply template", e))
    }
}

impl NoticeRender for TelegramNotices {
    fn render(&self, notice: Notice<'_>) -> Result<String> {
        let rendered = match notice {
            Notice::TopicTitle { user_id, name } => TopicTitleTemplate { name, user_id }.render(),
            Notice::EmptyReply => EmptyReplyTemplate.render(),
            Notice::DeliveryFailed { reason } => DeliveryFailedTemplate { reason }.render(),
        };
        rendered.map_err(|e| Error::render("notice template", e))
    }
}
