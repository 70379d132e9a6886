use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::api::models::{MessageKind, MessageRecord};

/// Raw websocket frame: `{ "event": <name>, "data": <payload> }`.
#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Events delivered by the push channel. Decoding is lenient: unknown
/// event names and payloads that fail to parse both yield `None` and are
/// dropped by the caller.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    NewMessage(MessageRecord),
    MessagesRead { reader_id: String },
    Typing { user_id: String },
    StoppedTyping { user_id: String },
    MessageDeleted { message_id: String },
}

impl InboundEvent {
    pub fn decode(text: &str) -> Option<InboundEvent> {
        let frame: Frame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(err) => {
                log::debug!("dropping undecodable frame: {err}");
                return None;
            }
        };
        let event = match frame.event.as_str() {
            "new_message" => {
                InboundEvent::NewMessage(serde_json::from_value(frame.data).ok()?)
            }
            "messages_were_read" => InboundEvent::MessagesRead {
                reader_id: str_field(&frame.data, "readerId")?,
            },
            "user_typing" => InboundEvent::Typing {
                user_id: str_field(&frame.data, "userId")?,
            },
            "user_stopped_typing" => InboundEvent::StoppedTyping {
                user_id: str_field(&frame.data, "userId")?,
            },
            "delete_message" => InboundEvent::MessageDeleted {
                message_id: str_field(&frame.data, "messageId")?,
            },
            other => {
                log::debug!("ignoring unknown event '{other}'");
                return None;
            }
        };
        Some(event)
    }
}

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

/// Events this client pushes to the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    JoinChat {
        room_id: String,
    },
    RegisterUser {
        user_id: String,
    },
    SendMessage {
        content: String,
        receiver_id: String,
        message_type: MessageKind,
        sender: String,
    },
    TypingStart {
        room_id: String,
    },
    TypingStop {
        room_id: String,
    },
    MarkRead {
        reader_id: String,
        author_id: String,
    },
    DeleteMessage {
        room_id: String,
        message_id: String,
    },
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::JoinChat { .. } => "join_chat",
            OutboundEvent::RegisterUser { .. } => "register_user",
            OutboundEvent::SendMessage { .. } => "send_message",
            OutboundEvent::TypingStart { .. } => "typing_start",
            OutboundEvent::TypingStop { .. } => "typing_stop",
            OutboundEvent::MarkRead { .. } => "mark_read",
            OutboundEvent::DeleteMessage { .. } => "delete_message",
        }
    }

    pub fn encode(&self) -> String {
        let data = match self {
            OutboundEvent::JoinChat { room_id }
            | OutboundEvent::TypingStart { room_id }
            | OutboundEvent::TypingStop { room_id } => json!({ "roomId": room_id }),
            OutboundEvent::RegisterUser { user_id } => json!({ "userId": user_id }),
            OutboundEvent::SendMessage {
                content,
                receiver_id,
                message_type,
                sender,
            } => json!({
                "content": content,
                "receiverId": receiver_id,
                "messageType": message_type.as_str(),
                "sender": sender,
            }),
            OutboundEvent::MarkRead {
                reader_id,
                author_id,
            } => json!({ "readerId": reader_id, "authorId": author_id }),
            OutboundEvent::DeleteMessage {
                room_id,
                message_id,
            } => json!({ "roomId": room_id, "messageId": message_id }),
        };
        json!({ "event": self.name(), "data": data }).to_string()
    }
}
