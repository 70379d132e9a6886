use crate::api::events::InboundEvent;
use crate::store::{ConversationStore, TypingState};

/// How far apart the client and server clocks may drift before the
/// fallback echo match refuses to correlate a pending send.
pub const ECHO_MATCH_WINDOW_MS: i64 = 5_000;

/// How long an inbound typing flag stays trustworthy without an explicit
/// stop event.
pub const TYPING_TRUST_WINDOW_MS: i64 = 5_000;

/// Folds inbound realtime events into the store, idempotently: replaying
/// an event, or racing it against the REST response for the same send,
/// always converges on the same transcript. The room is shared by many
/// conversations and stale rooms are never left, so everything is
/// filtered against the open conversation before it can mutate anything.
#[derive(Debug)]
pub struct ReconciliationEngine {
    echo_window_ms: i64,
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self {
            echo_window_ms: ECHO_MATCH_WINDOW_MS,
        }
    }
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one inbound event. `now` is the local clock, used for the
    /// typing trust window.
    pub fn apply(&self, store: &mut ConversationStore, event: InboundEvent, now: i64) {
        match event {
            InboundEvent::NewMessage(record) => {
                let Some(message) = record.confirm() else {
                    log::debug!("dropping malformed new_message event");
                    return;
                };
                if message.conversation_id() != store.conversation_id() {
                    // Another conversation's traffic; unread bookkeeping
                    // for it belongs to the surrounding screen.
                    return;
                }
                if let Some(id) = message.id.confirmed() {
                    if store.contains_confirmed(id) {
                        return;
                    }
                }
                let from_counterpart = message.sender_id == store.partner_id();
                if message.sender_id == store.local_user_id() {
                    if let Some(local_id) = store.matching_provisional(&message, self.echo_window_ms) {
                        store.resolve_provisional(local_id, message);
                        return;
                    }
                }
                store.insert(message);
                if from_counterpart {
                    // A delivered message supersedes any typing indicator.
                    store.set_typing(TypingState::default());
                }
            }
            InboundEvent::MessagesRead { reader_id } => {
                if reader_id == store.partner_id() {
                    store.mark_own_read();
                }
            }
            InboundEvent::Typing { user_id } => {
                if user_id == store.partner_id() {
                    store.set_typing(TypingState {
                        active: true,
                        expires_at: now + TYPING_TRUST_WINDOW_MS,
                    });
                }
            }
            InboundEvent::StoppedTyping { user_id } => {
                if user_id == store.partner_id() {
                    store.set_typing(TypingState::default());
                }
            }
            InboundEvent::MessageDeleted { message_id } => {
                if !store.remove_confirmed(&message_id) {
                    log::debug!("delete for unknown message {message_id}");
                }
            }
        }
    }
}
