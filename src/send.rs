use crate::api::models::{DeliveryState, Message, MessageId, MessageKind, MessageRecord};
use crate::store::ConversationStore;

/// Drives the optimistic send path: a provisional entry is inserted
/// synchronously on user action, then resolved or rolled back once the
/// create request settles. Split into deterministic steps; the async glue
/// around the REST call lives in `session`.
#[derive(Debug, Default)]
pub struct OptimisticSendController {
    last_local_id: u64,
}

impl OptimisticSendController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and insert the provisional entry at its timestamp slot.
    /// Returns the local id to resolve against, or `None` for empty input
    /// (a no-op, nothing inserted).
    pub fn begin(
        &mut self,
        store: &mut ConversationStore,
        content: &str,
        kind: MessageKind,
        now: i64,
    ) -> Option<u64> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        // Monotonic even when two sends share a millisecond.
        let local_id = (now.max(0) as u64).max(self.last_local_id + 1);
        self.last_local_id = local_id;
        store.insert(Message {
            id: MessageId::Provisional(local_id),
            sender_id: store.local_user_id().to_string(),
            receiver_id: store.partner_id().to_string(),
            content: content.to_string(),
            kind,
            created_at: now,
            is_read: false,
            delivery: DeliveryState::Pending,
        });
        Some(local_id)
    }

    /// Create request succeeded. If the response carries a canonical
    /// record, swap the provisional entry for it in place; if the realtime
    /// echo already performed the swap, just drop the leftover provisional
    /// entry (or no-op when there is none). Without a record, the entry
    /// stays provisional but moves to `Sent`.
    pub fn resolve(
        &self,
        store: &mut ConversationStore,
        local_id: u64,
        record: Option<MessageRecord>,
    ) {
        match record.and_then(MessageRecord::confirm) {
            Some(confirmed) => {
                let already_present = confirmed
                    .id
                    .confirmed()
                    .is_some_and(|id| store.contains_confirmed(id));
                if already_present {
                    // Echo won the race; dedup whatever is left.
                    store.remove_provisional(local_id);
                } else if !store.resolve_provisional(local_id, confirmed) {
                    log::debug!("provisional {local_id} vanished before resolution");
                }
            }
            None => {
                store.mark_sent(local_id);
            }
        }
    }

    /// Create request failed: full rollback to the pre-send transcript.
    /// No retry queue; the user resends manually.
    pub fn fail(&self, store: &mut ConversationStore, local_id: u64) {
        if !store.remove_provisional(local_id) {
            log::debug!("rollback found no provisional {local_id}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, sender: &str, receiver: &str, content: &str, at: i64) -> MessageRecord {
        MessageRecord {
            id: Some(id.to_string()),
            sender_id: Some(sender.to_string()),
            receiver_id: Some(receiver.to_string()),
            content: content.to_string(),
            created_at: Some(at),
            ..Default::default()
        }
    }

    #[test]
    fn empty_content_is_a_noop() {
        let mut store = ConversationStore::new("a", "b");
        let mut ctl = OptimisticSendController::new();
        assert_eq!(ctl.begin(&mut store, "   ", MessageKind::Text, 100), None);
        assert!(store.messages().is_empty());
    }

    #[test]
    fn begin_inserts_pending_tail_entry() {
        let mut store = ConversationStore::new("a", "b");
        let mut ctl = OptimisticSendController::new();
        let local_id = ctl.begin(&mut store, "hello", MessageKind::Text, 100).unwrap();
        let msg = store.get(&MessageId::Provisional(local_id)).unwrap();
        assert_eq!(msg.delivery, DeliveryState::Pending);
        assert_eq!(msg.sender_id, "a");
        assert_eq!(msg.content, "hello");
    }

    #[test]
    fn local_ids_are_monotonic_within_a_millisecond() {
        let mut store = ConversationStore::new("a", "b");
        let mut ctl = OptimisticSendController::new();
        let first = ctl.begin(&mut store, "a", MessageKind::Text, 100).unwrap();
        let second = ctl.begin(&mut store, "b", MessageKind::Text, 100).unwrap();
        assert!(second > first);
    }

    #[test]
    fn resolve_with_record_confirms_in_place() {
        let mut store = ConversationStore::new("a", "b");
        let mut ctl = OptimisticSendController::new();
        let local_id = ctl.begin(&mut store, "hello", MessageKind::Text, 100).unwrap();
        ctl.resolve(&mut store, local_id, Some(record("m1", "a", "b", "hello", 105)));

        assert_eq!(store.messages().len(), 1);
        assert!(store.contains_confirmed("m1"));
        assert!(store.get(&MessageId::Provisional(local_id)).is_none());
    }

    #[test]
    fn resolve_without_record_marks_sent() {
        let mut store = ConversationStore::new("a", "b");
        let mut ctl = OptimisticSendController::new();
        let local_id = ctl.begin(&mut store, "hello", MessageKind::Text, 100).unwrap();
        ctl.resolve(&mut store, local_id, None);
        let msg = store.get(&MessageId::Provisional(local_id)).unwrap();
        assert_eq!(msg.delivery, DeliveryState::Sent);
    }

    #[test]
    fn resolve_after_echo_win_is_a_dedup_noop() {
        let mut store = ConversationStore::new("a", "b");
        let mut ctl = OptimisticSendController::new();
        let local_id = ctl.begin(&mut store, "hello", MessageKind::Text, 100).unwrap();
        // Echo already swapped the slot.
        assert!(store.resolve_provisional(
            local_id,
            record("m1", "a", "b", "hello", 105).confirm().unwrap()
        ));
        ctl.resolve(&mut store, local_id, Some(record("m1", "a", "b", "hello", 105)));
        assert_eq!(store.messages().len(), 1);
    }

    #[test]
    fn fail_rolls_back_to_pre_send_state() {
        let mut store = ConversationStore::new("a", "b");
        let mut ctl = OptimisticSendController::new();
        store.insert(record("m0", "b", "a", "earlier", 50).confirm().unwrap());
        let local_id = ctl.begin(&mut store, "doomed", MessageKind::Text, 100).unwrap();
        assert_eq!(store.messages().len(), 2);

        ctl.fail(&mut store, local_id);
        assert_eq!(store.messages().len(), 1);
        assert!(store.contains_confirmed("m0"));
    }
}
