use crate::api::client::ApiClient;
use crate::api::models::{DeliveryState, Message, MessageId, MessageKind};
use crate::error::Result;
use crate::store::ConversationStore;

/// Seed the store from a full history fetch. This is a wholesale resync,
/// not a merge: success replaces the transcript, failure clears it and
/// surfaces the error. No automatic retry; the caller refreshes explicitly.
///
/// `pending_request` is the caller's knowledge that a chat request to this
/// partner is still awaiting acceptance; with it, an empty history gets a
/// placeholder entry instead of presenting as "no conversation".
pub async fn load_history(
    client: &ApiClient,
    store: &mut ConversationStore,
    pending_request: bool,
) -> Result<()> {
    match client.history(store.partner_id()).await {
        Ok(records) => {
            let before = records.len();
            let mut messages: Vec<Message> = records
                .into_iter()
                .filter_map(|r| r.confirm())
                .collect();
            if messages.len() < before {
                log::debug!(
                    "dropped {} malformed history records",
                    before - messages.len()
                );
            }
            if messages.is_empty() && pending_request {
                messages.push(pending_placeholder(store, crate::utils::now_ms()));
            }
            store.replace_all(messages);
            Ok(())
        }
        Err(err) => {
            log::warn!("history fetch failed: {err}");
            store.clear_failed();
            Err(err)
        }
    }
}

/// Local-only stand-in shown while a chat request awaits acceptance.
/// Swept away by the next resync like everything else.
pub fn pending_placeholder(store: &ConversationStore, now: i64) -> Message {
    Message {
        id: MessageId::Provisional(now as u64),
        sender_id: store.local_user_id().to_string(),
        receiver_id: store.partner_id().to_string(),
        content: "Chat request sent. Waiting for them to accept.".to_string(),
        kind: MessageKind::Placeholder,
        created_at: now,
        is_read: true,
        delivery: DeliveryState::Sent,
    }
}
