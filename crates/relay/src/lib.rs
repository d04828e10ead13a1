//! Core relay engine: user↔thread mapping registry and the per-message
//! routing logic between end-users and the staff group.
//!
//! Transport, persistence, and template rendering are collaborator traits
//! implemented by the `ferrybot-storage` and `ferrybot-telegram` crates.

pub mod audit;
pub mod error;
pub mod event;
pub mod mapping;
pub mod registry;
pub mod router;
pub mod transport;

pub use {
    audit::AuditLog,
    error::{Error, Result},
    event::{InboundEvent, InboundMessage, Sender, TopicEvent},
    mapping::{ThreadId, ThreadMapping, ThreadStore, UserId},
    registry::ThreadRegistry,
    router::{RelayRouter, RouterConfig},
    transport::{Notice, NoticeRender, RelayTransport},
};
