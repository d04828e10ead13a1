use std::error::Error as StdError;

use crate::mapping::{ThreadId, UserId};

/// Crate-wide result type for relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed relay errors shared by the registry, the router, and collaborators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No thread mapped for this user yet; drives the creation flow.
    #[error("no thread mapped for user {user_id}")]
    MappingNotFound { user_id: UserId },

    /// No user owns this thread; drives the reply fallback.
    #[error("no user owns thread {thread_id}")]
    ThreadOwnerNotFound { thread_id: ThreadId },

    /// The user already has a mapped thread; a second mapping is rejected.
    #[error("user {user_id} is already mapped to a thread")]
    MappingExists { user_id: UserId },

    /// The store accepted the write but affected no rows.
    #[error("mapping row was not inserted")]
    NotInserted,

    /// Persistence failure from the thread store or audit log.
    #[error("store operation failed: {context}: {source}")]
    Store {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// A topic title carried no extractable user identifier.
    #[error("user identifier not found in topic title")]
    IdentifierNotFound,

    /// Transport call failed. Logged with context for a manual resend.
    #[error("delivery failed: {context}: {source}")]
    Delivery {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// A pending thread creation never produced a mapping within the
    /// configured wait window.
    #[error("gave up waiting for thread creation for user {user_id}")]
    DeliveryTimeout { user_id: UserId },

    /// Notice template rendering failed.
    #[error("render failed: {context}: {source}")]
    Render {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Integer parsing failed (topic title id token).
    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),
}

impl Error {
    #[must_use]
    pub fn store(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn delivery(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Delivery {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn render(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Render {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether this is an expected "mapping absent" miss rather than a fault.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::MappingNotFound { .. } | Self::ThreadOwnerNotFound { .. }
        )
    }
}
