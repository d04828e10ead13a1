use std::{
    collections::HashMap,
    sync::{Arc, LazyLock, Mutex},
    time::Duration,
};

use {
    regex::Regex,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

use crate::{
    Result,
    error::Error,
    event::{InboundEvent, InboundMessage, Sender, TopicEvent},
    mapping::{ThreadId, UserId},
    registry::ThreadRegistry,
    transport::{Notice, NoticeRender, RelayTransport},
};

/// Topic titles embed the owner as "User ID: <n>"; this recovers it.
#[allow(clippy::expect_used)]
static USER_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)User\s?ID:\s?([-\d]+)").expect("user id pattern is valid")
});

/// Routing parameters. `poll_interval` and `max_wait` govern the background
/// wait between requesting a topic and its creation ack arriving.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    /// Chat id of the staff supergroup.
    pub group_id: i64,
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl RouterConfig {
    #[must_use]
    pub fn new(group_id: i64) -> Self {
        Self {
            group_id,
            poll_interval: Duration::from_secs(3),
            max_wait: Duration::from_secs(300),
        }
    }
}

/// Per-message routing between end-users and the staff group.
///
/// Cheap to clone; clones share the registry, transport, and pending-wait
/// table. Pending thread creations are tracked per user so racing messages
/// from the same new user request at most one topic.
#[derive(Clone)]
pub struct RelayRouter {
    registry: Arc<ThreadRegistry>,
    transport: Arc<dyn RelayTransport>,
    notices: Arc<dyn NoticeRender>,
    config: RouterConfig,
    /// One cancellation token per user with an outstanding topic creation.
    /// Plain mutex: never held across an await.
    pending: Arc<Mutex<HashMap<UserId, CancellationToken>>>,
    shutdown: CancellationToken,
}

impl RelayRouter {
    pub fn new(
        registry: Arc<ThreadRegistry>,
        transport: Arc<dyn RelayTransport>,
        notices: Arc<dyn NoticeRender>,
        config: RouterConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            notices,
            config,
            pending: Arc::new(Mutex::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancel every outstanding creation wait. Called on process shutdown.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        let pending = {
            let mut map = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *map)
        };
        for (user_id, token) in pending {
            info!(user_id, "cancelling pending thread creation wait");
            token.cancel();
        }
    }

    /// Route one inbound event. Errors are terminal for this event only; the
    /// dispatch loop logs them and keeps serving.
    pub async fn handle(&self, event: InboundEvent) -> Result<()> {
        match event {
            InboundEvent::Message(msg) | InboundEvent::EditedMessage(msg) => {
                self.relay_message(msg).await
            },
            InboundEvent::MembershipChange { chat_id } => {
                info!(chat_id, "bot membership changed");
                Ok(())
            },
        }
    }

    async fn relay_message(&self, msg: InboundMessage) -> Result<()> {
        // Topic created inside the staff group: the creation ack that carries
        // the new mapping.
        if let Some(TopicEvent::Created { title }) = &msg.topic {
            if msg.chat_id == self.config.group_id {
                return self.capture_topic_created(&msg, title).await;
            }
            return Ok(());
        }

        // Remaining topic lifecycle events carry no relay state.
        if msg.topic.is_some() {
            info!(chat_id = msg.chat_id, "ignoring forum topic change");
            return Ok(());
        }

        // Never relay our own (or any bot's) messages back and forth.
        let Some(sender) = msg.sender.clone().filter(|s| !s.is_bot) else {
            info!(chat_id = msg.chat_id, "ignoring message without a human sender");
            return Ok(());
        };

        // Staff reply inside a thread.
        if let Some(reply_thread) = msg.reply_to_thread {
            return self.relay_reply(&msg, &sender, reply_thread).await;
        }

        // Messages in the group's root context belong to no user thread.
        if msg.chat_id == self.config.group_id {
            info!(chat_id = msg.chat_id, "ignoring message in the general thread");
            self.send_notice(self.config.group_id, None, Notice::EmptyReply)
                .await;
            return Ok(());
        }

        self.relay_from_user(&msg, &sender).await
    }

    /// User → group: copy into the user's thread, creating it if absent.
    async fn relay_from_user(&self, msg: &InboundMessage, sender: &Sender) -> Result<()> {
        match self.registry.thread_for_user(sender.id).await {
            Ok(thread_id) => {
                self.copy_to_thread(thread_id, msg).await?;
                info!(
                    user_id = sender.id,
                    thread_id,
                    message_id = msg.message_id,
                    "message relayed"
                );
                Ok(())
            },
            Err(e) if e.is_not_found() => self.begin_thread_creation(msg, sender).await,
            Err(e) => Err(e),
        }
    }

    /// Group → user: resolve the thread owner and copy the reply out.
    ///
    /// A reply in a thread with no known owner falls back to treating the
    /// reply as a fresh message from the replying staff member, preserving
    /// delivery over strict correctness.
    async fn relay_reply(
        &self,
        msg: &InboundMessage,
        sender: &Sender,
        reply_thread: ThreadId,
    ) -> Result<()> {
        match self.registry.user_for_thread(reply_thread).await {
            Ok(user_id) => {
                if let Err(e) = self.transport.copy_to_user(user_id, msg).await {
                    error!(
                        user_id,
                        thread_id = reply_thread,
                        message_id = msg.message_id,
                        error = %e,
                        "failed to copy reply to user, resend manually"
                    );
                    self.send_notice(
                        self.config.group_id,
                        msg.thread_id,
                        Notice::DeliveryFailed {
                            reason: &e.to_string(),
                        },
                    )
                    .await;
                    return Err(e);
                }
                info!(
                    user_id,
                    thread_id = reply_thread,
                    message_id = msg.message_id,
                    "reply relayed"
                );
                Ok(())
            },
            Err(e) if e.is_not_found() => {
                warn!(
                    thread_id = reply_thread,
                    staff_id = sender.id,
                    "reply in a thread with no known owner, relaying to the replier's own thread"
                );
                self.relay_from_user(msg, sender).await
            },
            Err(e) => Err(e),
        }
    }

    /// Handle the topic-created service message: extract the owner from the
    /// title and record the mapping. A title with no identifier is dropped
    /// with a warning, never a fault.
    async fn capture_topic_created(&self, msg: &InboundMessage, title: &str) -> Result<()> {
        let user_id = match extract_user_id(title) {
            Ok(id) => id,
            Err(e) => {
                warn!(title, error = %e, "identifier not found in topic title, dropping event");
                return Ok(());
            },
        };
        let Some(thread_id) = msg.thread_id else {
            warn!(user_id, "topic-created event carries no thread id, dropping event");
            return Ok(());
        };

        match self.registry.record(user_id, thread_id).await {
            Ok(()) => {
                info!(user_id, thread_id, "thread mapping recorded");
                Ok(())
            },
            Err(Error::MappingExists { user_id }) => {
                warn!(
                    user_id,
                    thread_id, "duplicate topic creation for an already-mapped user, ignoring"
                );
                Ok(())
            },
            Err(e) => Err(e),
        }
    }

    /// First message from an unmapped user: request a topic (at most one per
    /// user) and wait in the background for the creation ack.
    async fn begin_thread_creation(&self, msg: &InboundMessage, sender: &Sender) -> Result<()> {
        let user_id = sender.id;

        // Reserve the creation slot before the remote call so a racing
        // message for the same user queues behind this one.
        let (wait_token, already_requested) = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            match pending.get(&user_id) {
                Some(token) => (token.clone(), true),
                None => {
                    let token = CancellationToken::new();
                    pending.insert(user_id, token.clone());
                    (token, false)
                },
            }
        };

        if !already_requested {
            let name = sender.display_name();
            let title = match self.notices.render(Notice::TopicTitle {
                user_id,
                name: &name,
            }) {
                Ok(t) => t,
                Err(e) => {
                    self.clear_pending(user_id);
                    return Err(e);
                },
            };

            if let Err(e) = self.transport.create_topic(&title).await {
                self.clear_pending(user_id);
                error!(
                    user_id,
                    message_id = msg.message_id,
                    error = %e,
                    "failed to create forum topic, resend manually"
                );
                return Err(e);
            }
            info!(user_id, "forum topic requested, waiting for creation");
        }

        let router = self.clone();
        let message = msg.clone();
        tokio::spawn(async move {
            router.wait_for_thread(user_id, message, wait_token).await;
        });
        Ok(())
    }

    /// Background wait for a pending creation: poll the registry on a fixed
    /// interval, holding no lock between polls, until the mapping appears or
    /// the wait window closes.
    async fn wait_for_thread(
        &self,
        user_id: UserId,
        message: InboundMessage,
        cancel: CancellationToken,
    ) {
        let deadline = tokio::time::Instant::now() + self.config.max_wait;

        loop {
            match self.registry.thread_for_user(user_id).await {
                Ok(thread_id) => {
                    self.clear_pending(user_id);
                    match self.copy_to_thread(thread_id, &message).await {
                        Ok(()) => info!(
                            user_id,
                            thread_id,
                            message_id = message.message_id,
                            "message relayed after topic creation"
                        ),
                        Err(e) => error!(
                            user_id,
                            thread_id,
                            message_id = message.message_id,
                            error = %e,
                            "failed to relay message after topic creation, resend manually"
                        ),
                    }
                    return;
                },
                Err(e) if e.is_not_found() => {},
                // Store trouble during a poll is transient here; keep waiting
                // until the deadline decides.
                Err(e) => warn!(user_id, error = %e, "registry lookup failed during creation wait"),
            }

            if tokio::time::Instant::now() >= deadline {
                self.clear_pending(user_id);
                let e = Error::DeliveryTimeout { user_id };
                error!(
                    user_id,
                    message_id = message.message_id,
                    error = %e,
                    "thread creation never acknowledged, resend manually"
                );
                self.send_notice(
                    message.chat_id,
                    None,
                    Notice::DeliveryFailed {
                        reason: &e.to_string(),
                    },
                )
                .await;
                return;
            }

            tokio::select! {
                () = cancel.cancelled() => return,
                () = self.shutdown.cancelled() => return,
                () = tokio::time::sleep(self.config.poll_interval) => {},
            }
        }
    }

    async fn copy_to_thread(&self, thread_id: ThreadId, msg: &InboundMessage) -> Result<()> {
        if let Err(e) = self.transport.copy_to_thread(thread_id, msg).await {
            self.send_notice(
                msg.chat_id,
                None,
                Notice::DeliveryFailed {
                    reason: &e.to_string(),
                },
            )
            .await;
            return Err(e);
        }
        Ok(())
    }

    fn clear_pending(&self, user_id: UserId) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&user_id);
    }

    /// Render and send a notice, best-effort.
    async fn send_notice(&self, chat_id: i64, thread_id: Option<ThreadId>, notice: Notice<'_>) {
        let text = match self.notices.render(notice) {
            Ok(text) => text,
            Err(e) => {
                warn!(chat_id, error = %e, "failed to render notice");
                return;
            },
        };
        if let Err(e) = self.transport.send_notice(chat_id, thread_id, &text).await {
            warn!(chat_id, error = %e, "failed to send notice");
        }
    }
}

/// Extract the user id embedded in a topic title.
pub fn extract_user_id(title: &str) -> Result<UserId> {
    let captures = USER_ID_RE
        .captures(title)
        .ok_or(Error::IdentifierNotFound)?;
    Ok(captures[1].parse()?)
}
