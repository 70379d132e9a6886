use crate::api::models::{DeliveryState, Message, MessageId, conversation_id};

/// Transient typing state for the counterpart. The flag is cleared early
/// by an explicit stop event or a new message; `expires_at` bounds how
/// long it is trusted when neither arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypingState {
    pub active: bool,
    pub expires_at: i64,
}

impl TypingState {
    /// Whether the indicator should still show at `now`. A lost stop
    /// event ends at the trust window instead of sticking forever.
    pub fn is_active_at(&self, now: i64) -> bool {
        self.active && now < self.expires_at
    }
}

/// In-memory transcript for the one open conversation. Mutated only by
/// the engine's handlers, never by view code.
#[derive(Debug)]
pub struct ConversationStore {
    local_user_id: String,
    partner_id: String,
    messages: Vec<Message>,
    typing: TypingState,
    load_failed: bool,
}

impl ConversationStore {
    pub fn new(local_user_id: impl Into<String>, partner_id: impl Into<String>) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            partner_id: partner_id.into(),
            messages: Vec::new(),
            typing: TypingState::default(),
            load_failed: false,
        }
    }

    pub fn local_user_id(&self) -> &str {
        &self.local_user_id
    }

    pub fn partner_id(&self) -> &str {
        &self.partner_id
    }

    /// Canonical id of this conversation; doubles as the realtime room id.
    pub fn conversation_id(&self) -> String {
        conversation_id(&self.local_user_id, &self.partner_id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn typing(&self) -> TypingState {
        self.typing
    }

    pub fn set_typing(&mut self, typing: TypingState) {
        self.typing = typing;
    }

    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    /// Wholesale replacement from a history resync. Sorts ascending by
    /// `created_at`; the sort is stable so server ordering breaks ties.
    pub fn replace_all(&mut self, mut messages: Vec<Message>) {
        messages.sort_by_key(|m| m.created_at);
        self.messages = messages;
        self.load_failed = false;
    }

    /// History fetch failed: drop the transcript and flag the error state.
    pub fn clear_failed(&mut self) {
        self.messages.clear();
        self.load_failed = true;
    }

    /// Insert keeping `created_at` order; equal timestamps keep insertion
    /// order, so arrival order never reorders what is already settled.
    pub fn insert(&mut self, message: Message) {
        let idx = self
            .messages
            .partition_point(|m| m.created_at <= message.created_at);
        self.messages.insert(idx, message);
    }

    pub fn contains_confirmed(&self, server_id: &str) -> bool {
        self.messages
            .iter()
            .any(|m| m.id.confirmed() == Some(server_id))
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Swap a provisional entry for its confirmed counterpart in place.
    /// The slot keeps the provisional `created_at` (client clock is
    /// authoritative for the optimistic entry's position); identity,
    /// content and read state come from the server record. Returns false
    /// when the provisional entry is already gone.
    pub fn resolve_provisional(&mut self, local_id: u64, confirmed: Message) -> bool {
        let target = MessageId::Provisional(local_id);
        match self.messages.iter_mut().find(|m| m.id == target) {
            Some(slot) => {
                let created_at = slot.created_at;
                *slot = confirmed;
                slot.created_at = created_at;
                slot.delivery = DeliveryState::Sent;
                true
            }
            None => false,
        }
    }

    /// Mark a still-provisional entry delivered (server accepted the send
    /// but echoed no record).
    pub fn mark_sent(&mut self, local_id: u64) -> bool {
        let target = MessageId::Provisional(local_id);
        match self.messages.iter_mut().find(|m| m.id == target) {
            Some(slot) => {
                slot.delivery = DeliveryState::Sent;
                true
            }
            None => false,
        }
    }

    /// Rollback of a failed send. Returns false when nothing was removed.
    pub fn remove_provisional(&mut self, local_id: u64) -> bool {
        self.remove(&MessageId::Provisional(local_id))
    }

    pub fn remove_confirmed(&mut self, server_id: &str) -> bool {
        self.remove(&MessageId::Confirmed(server_id.to_string()))
    }

    fn remove(&mut self, id: &MessageId) -> bool {
        match self.messages.iter().position(|m| &m.id == id) {
            Some(idx) => {
                self.messages.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Counterpart read receipt: flip `is_read` on every message authored
    /// by the local user. Returns how many flipped.
    pub fn mark_own_read(&mut self) -> usize {
        let mut flipped = 0;
        for m in &mut self.messages {
            if m.sender_id == self.local_user_id && !m.is_read {
                m.is_read = true;
                flipped += 1;
            }
        }
        flipped
    }

    /// Local view acknowledgement: mark counterpart-authored messages read.
    pub fn mark_counterpart_read(&mut self) -> usize {
        let mut flipped = 0;
        for m in &mut self.messages {
            if m.sender_id == self.partner_id && !m.is_read {
                m.is_read = true;
                flipped += 1;
            }
        }
        flipped
    }

    pub fn has_counterpart_messages(&self) -> bool {
        self.messages.iter().any(|m| m.sender_id == self.partner_id)
    }

    /// Derived, never stored: counterpart messages not yet read locally.
    pub fn unread_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.sender_id == self.partner_id && !m.is_read)
            .count()
    }

    /// Fallback correlation for a server echo that carries no provisional
    /// id: a still-provisional local send with the same participants and
    /// content, created within `window_ms` of the echo. Covers both a
    /// `Pending` entry (echo won the race) and a `Sent` one whose create
    /// response carried no record. Best effort; the id-based path always
    /// runs first.
    pub fn matching_provisional(&self, echo: &Message, window_ms: i64) -> Option<u64> {
        self.messages.iter().find_map(|m| match m.id {
            MessageId::Provisional(local_id)
                if m.delivery != DeliveryState::Failed
                    && m.sender_id == echo.sender_id
                    && m.receiver_id == echo.receiver_id
                    && m.content == echo.content
                    && (m.created_at - echo.created_at).abs() <= window_ms =>
            {
                Some(local_id)
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::MessageKind;

    fn confirmed(id: &str, sender: &str, receiver: &str, at: i64) -> Message {
        Message {
            id: MessageId::Confirmed(id.to_string()),
            sender_id: sender.to_string(),
            receiver_id: receiver.to_string(),
            content: format!("msg {id}"),
            kind: MessageKind::Text,
            created_at: at,
            is_read: false,
            delivery: DeliveryState::Sent,
        }
    }

    fn provisional(local_id: u64, sender: &str, receiver: &str, at: i64) -> Message {
        Message {
            id: MessageId::Provisional(local_id),
            sender_id: sender.to_string(),
            receiver_id: receiver.to_string(),
            content: "draft".to_string(),
            kind: MessageKind::Text,
            created_at: at,
            is_read: false,
            delivery: DeliveryState::Pending,
        }
    }

    #[test]
    fn replace_all_sorts_ascending() {
        let mut store = ConversationStore::new("a", "b");
        store.replace_all(vec![
            confirmed("m2", "a", "b", 200),
            confirmed("m1", "b", "a", 100),
            confirmed("m3", "a", "b", 300),
        ]);
        let at: Vec<i64> = store.messages().iter().map(|m| m.created_at).collect();
        assert_eq!(at, vec![100, 200, 300]);
    }

    #[test]
    fn insert_keeps_arrival_order_for_equal_timestamps() {
        let mut store = ConversationStore::new("a", "b");
        store.insert(confirmed("m1", "b", "a", 100));
        store.insert(confirmed("m2", "b", "a", 100));
        let ids: Vec<_> = store
            .messages()
            .iter()
            .map(|m| m.id.confirmed().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn resolve_keeps_slot_position_and_client_timestamp() {
        let mut store = ConversationStore::new("a", "b");
        store.insert(confirmed("m1", "b", "a", 100));
        store.insert(provisional(150, "a", "b", 150));
        store.insert(confirmed("m2", "b", "a", 200));

        let mut echo = confirmed("m9", "a", "b", 170);
        echo.content = "draft".to_string();
        assert!(store.resolve_provisional(150, echo));

        let middle = &store.messages()[1];
        assert_eq!(middle.id, MessageId::Confirmed("m9".to_string()));
        assert_eq!(middle.created_at, 150);
        assert_eq!(middle.delivery, DeliveryState::Sent);
        // second resolve is a no-op
        assert!(!store.resolve_provisional(150, confirmed("m9", "a", "b", 170)));
    }

    #[test]
    fn read_flips_are_scoped_by_author() {
        let mut store = ConversationStore::new("a", "b");
        store.insert(confirmed("m1", "a", "b", 100));
        store.insert(confirmed("m2", "b", "a", 200));

        assert_eq!(store.mark_own_read(), 1);
        assert!(store.messages()[0].is_read);
        assert!(!store.messages()[1].is_read);
        assert_eq!(store.unread_count(), 1);

        assert_eq!(store.mark_counterpart_read(), 1);
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn matching_provisional_requires_content_and_window() {
        let mut store = ConversationStore::new("a", "b");
        store.insert(provisional(1_000, "a", "b", 1_000));

        let mut echo = confirmed("m1", "a", "b", 3_000);
        echo.content = "draft".to_string();
        assert_eq!(store.matching_provisional(&echo, 5_000), Some(1_000));
        assert_eq!(store.matching_provisional(&echo, 1_000), None);

        echo.content = "different".to_string();
        assert_eq!(store.matching_provisional(&echo, 5_000), None);
    }

    #[test]
    fn typing_flag_is_not_trusted_past_its_window() {
        let typing = TypingState {
            active: true,
            expires_at: 5_000,
        };
        assert!(typing.is_active_at(4_999));
        assert!(!typing.is_active_at(5_000));
        assert!(!TypingState::default().is_active_at(0));
    }

    #[test]
    fn clear_failed_drops_transcript_and_sets_flag() {
        let mut store = ConversationStore::new("a", "b");
        store.insert(confirmed("m1", "b", "a", 100));
        store.clear_failed();
        assert!(store.messages().is_empty());
        assert!(store.load_failed());
        store.replace_all(vec![confirmed("m1", "b", "a", 100)]);
        assert!(!store.load_failed());
    }
}
