//! # Collaborator Adapters
//!
//! Outbound ports for the external collaborators and the local adapters
//! used when no backend is configured.
//!
//! ```text
//! ┌──────────────┐   EventRecord   ┌──────────────────┐   port   ┌─────────────────────┐
//! │  Event Bus   │ ──────────────▶ │  handlers/*      │ ───────▶ │ ContentClassifier   │
//! └──────────────┘                 │                  │ ───────▶ │ NotificationDispatch│
//!                                  │                  │ ───────▶ │ ChatMirror          │
//!                                  └──────────────────┘          └─────────────────────┘
//! ```

pub mod chat;
pub mod moderation;
pub mod notifications;
pub mod ports;

pub use chat::{chat_id_for, chat_message_for, ChatMessage, ChatMessageKind, LoggingChatMirror};
pub use moderation::NoopClassifier;
pub use notifications::{notifications_for, LoggingDispatcher, Notification, NotificationKind};
pub use ports::{ChatMirror, CollaboratorError, ContentClassifier, NotificationDispatcher};
