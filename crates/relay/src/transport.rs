use async_trait::async_trait;

use crate::{
    Result,
    event::InboundMessage,
    mapping::{ThreadId, UserId},
};

/// Messaging-platform operations the router needs. All calls are fallible
/// remote calls; implementations must not retry on their own.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Send rendered notice text into a chat, optionally inside a thread.
    async fn send_notice(&self, chat_id: i64, thread_id: Option<ThreadId>, text: &str)
    -> Result<()>;

    /// Copy an end-user message into its thread in the staff group.
    async fn copy_to_thread(&self, thread_id: ThreadId, message: &InboundMessage) -> Result<()>;

    /// Copy a staff reply to the end-user's chat.
    async fn copy_to_user(&self, user_id: UserId, message: &InboundMessage) -> Result<()>;

    /// Ask the platform to create a sub-conversation (topic) in the staff
    /// group. The resulting thread id arrives later as a topic-created
    /// service event, not in this call's response.
    async fn create_topic(&self, title: &str) -> Result<()>;
}

/// User-facing notices the router asks its renderer for. The concrete
/// template engine lives with the transport crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice<'a> {
    /// Title of a newly created topic. Must embed the user id in a form
    /// [`crate::router::extract_user_id`] can recover.
    TopicTitle { user_id: UserId, name: &'a str },
    /// Staff posted in the group's root context instead of a thread.
    EmptyReply,
    /// A forward failed; shown in the chat the message came from.
    DeliveryFailed { reason: &'a str },
}

/// Renders a [`Notice`] into text ready to send.
pub trait NoticeRender: Send + Sync {
    fn render(&self, notice: Notice<'_>) -> Result<String>;
}
