use crate::mapping::{ThreadId, UserId};

/// Inbound events consumed by the router, already lifted out of the
/// transport's native update shape.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Message(InboundMessage),
    /// An edit to a previously delivered message; relayed like a fresh one.
    EditedMessage(InboundMessage),
    /// Bot membership changed in some chat. Structural, never relayed.
    MembershipChange { chat_id: i64 },
}

/// A single inbound message, from either side of the relay.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Platform message id within its chat.
    pub message_id: i64,
    /// Chat the message was posted in (user DM or the staff group).
    pub chat_id: i64,
    pub sender: Option<Sender>,
    /// Forum thread the message was posted in, if any.
    pub thread_id: Option<ThreadId>,
    /// Thread of the message this one replies to, if it is a reply.
    pub reply_to_thread: Option<ThreadId>,
    /// Structural topic sub-event carried by a service message.
    pub topic: Option<TopicEvent>,
    pub text: Option<String>,
}

/// Message author identity.
#[derive(Debug, Clone)]
pub struct Sender {
    pub id: UserId,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl Sender {
    /// "Last First (username)" label used in topic titles.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "{} {} ({})",
            self.last_name.as_deref().unwrap_or_default(),
            self.first_name,
            self.username.as_deref().unwrap_or_default(),
        )
        .trim()
        .to_string()
    }
}

/// Topic lifecycle sub-events. Only `Created` inside the staff group carries
/// relay state (the new mapping); the rest are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicEvent {
    Created { title: String },
    Edited,
    Closed,
    Reopened,
}
