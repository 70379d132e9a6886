//! Client-side conversation sync engine.
//!
//! Keeps a single conversation transcript consistent while data arrives
//! from three unsynchronized sources: a REST history fetch, optimistic
//! local sends, and push events on a shared realtime channel. Rendering,
//! auth and the transports behind the consumed contracts live elsewhere.

pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod realtime;
pub mod receipts;
pub mod reconcile;
pub mod send;
pub mod session;
pub mod store;
pub mod typing;
pub mod utils;

pub use api::client::{ApiClient, DeleteType, Permission};
pub use api::events::{InboundEvent, OutboundEvent};
pub use api::models::{DeliveryState, Message, MessageId, MessageKind, MessageRecord, conversation_id};
pub use error::{Error, Result};
pub use realtime::channel::{ChannelSignal, RealtimeSink, WsChannel};
pub use realtime::connection::{ConnectionLifecycleManager, ConnectionState};
pub use session::ChatSession;
pub use store::{ConversationStore, TypingState};
