use serde::{Deserialize, Serialize};

/// Identity of a transcript entry. A message is `Provisional` from the
/// moment the user presses send until the server acknowledges it; the
/// local id is the creation timestamp in milliseconds, bumped when two
/// sends land in the same millisecond.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageId {
    Provisional(u64),
    Confirmed(String),
}

impl MessageId {
    pub fn is_provisional(&self) -> bool {
        matches!(self, MessageId::Provisional(_))
    }

    pub fn confirmed(&self) -> Option<&str> {
        match self {
            MessageId::Confirmed(id) => Some(id),
            MessageId::Provisional(_) => None,
        }
    }
}

/// Only meaningful while the id is `Provisional`; a confirmed message is
/// always `Sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Pending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    /// Synthetic local entry standing in for "request sent, awaiting
    /// acceptance" when history comes back empty on a pending chat request.
    Placeholder,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Placeholder => "placeholder",
        }
    }

    fn from_wire(s: &str) -> MessageKind {
        match s {
            "image" => MessageKind::Image,
            _ => MessageKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub kind: MessageKind,
    /// Unix milliseconds. Client clock for provisional entries, server
    /// clock for confirmed ones. Primary sort key of the transcript.
    pub created_at: i64,
    pub is_read: bool,
    pub delivery: DeliveryState,
}

impl Message {
    pub fn conversation_id(&self) -> String {
        conversation_id(&self.sender_id, &self.receiver_id)
    }
}

/// Canonical conversation key: the sorted participant pair. Commutative,
/// so both sides derive the same realtime room id.
pub fn conversation_id(a: &str, b: &str) -> String {
    if a <= b { format!("{a}:{b}") } else { format!("{b}:{a}") }
}

/// Wire shape of a server message record, as returned by the history and
/// send endpoints and embedded in `new_message` events. Every field the
/// server has been observed to omit is optional; `confirm` is the one
/// place that decides whether a record is usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "sender")]
    pub sender_id: Option<String>,
    #[serde(default, alias = "receiver")]
    pub receiver_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub is_read: bool,
}

impl MessageRecord {
    /// Validate and promote to a confirmed `Message`. Records missing an
    /// id or a resolvable sender/receiver pair are unusable and yield
    /// `None`; callers drop them.
    pub fn confirm(self) -> Option<Message> {
        let id = self.id?;
        let sender_id = self.sender_id?;
        let receiver_id = self.receiver_id?;
        let kind = self
            .message_type
            .as_deref()
            .map(MessageKind::from_wire)
            .unwrap_or(MessageKind::Text);
        Some(Message {
            id: MessageId::Confirmed(id),
            sender_id,
            receiver_id,
            content: self.content,
            kind,
            created_at: self.created_at.unwrap_or(0),
            is_read: self.is_read,
            delivery: DeliveryState::Sent,
        })
    }
}
