use crate::api::events::OutboundEvent;
use crate::store::ConversationStore;

/// Fire-and-forget read receipts, outbound side. The inbound path (a
/// peer's receipt flipping our sent messages) is folded by the
/// reconciliation engine.
#[derive(Debug, Default)]
pub struct ReadReceiptController;

impl ReadReceiptController {
    pub fn new() -> Self {
        Self
    }

    /// Conversation opened, or a new inbound message arrived while it is
    /// in the foreground: mark counterpart-authored messages read and
    /// return the receipt to broadcast. `None` when the counterpart has
    /// never written. Repeats are harmless; the receipt is idempotent on
    /// the receiving side.
    pub fn acknowledge(&self, store: &mut ConversationStore) -> Option<OutboundEvent> {
        if !store.has_counterpart_messages() {
            return None;
        }
        let flipped = store.mark_counterpart_read();
        if flipped > 0 {
            log::debug!("marked {flipped} messages read");
        }
        Some(OutboundEvent::MarkRead {
            reader_id: store.local_user_id().to_string(),
            author_id: store.partner_id().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{DeliveryState, Message, MessageId, MessageKind};

    fn inbound(id: &str, at: i64) -> Message {
        Message {
            id: MessageId::Confirmed(id.to_string()),
            sender_id: "b".to_string(),
            receiver_id: "a".to_string(),
            content: "hi".to_string(),
            kind: MessageKind::Text,
            created_at: at,
            is_read: false,
            delivery: DeliveryState::Sent,
        }
    }

    #[test]
    fn acknowledge_flips_locally_and_broadcasts() {
        let receipts = ReadReceiptController::new();
        let mut store = ConversationStore::new("a", "b");
        store.insert(inbound("m1", 100));
        store.insert(inbound("m2", 200));

        let event = receipts.acknowledge(&mut store);
        assert_eq!(
            event,
            Some(OutboundEvent::MarkRead {
                reader_id: "a".into(),
                author_id: "b".into(),
            })
        );
        assert_eq!(store.unread_count(), 0);

        // already-read state: still broadcasts, still harmless
        assert!(receipts.acknowledge(&mut store).is_some());
    }

    #[test]
    fn nothing_to_acknowledge_in_a_one_sided_conversation() {
        let receipts = ReadReceiptController::new();
        let mut store = ConversationStore::new("a", "b");
        assert!(receipts.acknowledge(&mut store).is_none());
    }
}
