use teloxide::types::{Message, MessageKind, Update, UpdateKind, User};

use ferrybot_relay::{InboundEvent, InboundMessage, Sender, ThreadId, TopicEvent};

/// Lift a raw Telegram update into the router's event model. Updates the
/// relay has no use for map to `None`.
pub fn inbound_event(update: &Update) -> Option<InboundEvent> {
    match &update.kind {
        UpdateKind::Message(msg) => Some(InboundEvent::Message(inbound_message(msg))),
        UpdateKind::EditedMessage(msg) => Some(InboundEvent::EditedMessage(inbound_message(msg))),
        UpdateKind::MyChatMember(member) => Some(InboundEvent::MembershipChange {
            chat_id: member.chat.id.0,
        }),
        _ => None,
    }
}

fn inbound_message(msg: &Message) -> InboundMessage {
    // Messages inside a forum topic carry the topic as their reply context
    // whether or not they explicitly reply to another message; DM messages
    // have no thread at all.
    let reply_to_thread = msg
        .reply_to_message()
        .and_then(|reply| reply.thread_id)
        .or(msg.thread_id);

    InboundMessage {
        message_id: i64::from(msg.id.0),
        chat_id: msg.chat.id.0,
        sender: msg.from.as_ref().map(sender),
        thread_id: msg.thread_id.map(as_thread_id),
        reply_to_thread: reply_to_thread.map(as_thread_id),
        topic: topic_event(&msg.kind),
        text: msg.text().map(ToOwned::to_owned),
    }
}

fn sender(user: &User) -> Sender {
    Sender {
        id: user.id.0 as i64,
        is_bot: user.is_bot,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
    }
}

fn as_thread_id(thread: teloxide::types::ThreadId) -> ThreadId {
    i64::from(thread.0.0)
}

fn topic_event(kind: &MessageKind) -> Option<TopicEvent> {
    match kind {
        MessageKind::ForumTopicCreated(created) => Some(TopicEvent::Created {
            title: created.forum_topic_created.name.clone(),
        }),
        MessageKind::ForumTopicEdited(_) => Some(TopicEvent::Edited),
        MessageKind::ForumTopicClosed(_) => Some(TopicEvent::Closed),
        MessageKind::ForumTopicReopened(_) => Some(TopicEvent::Reopened),
        _ => None,
    }
}
