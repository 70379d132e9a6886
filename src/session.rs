use crate::api::client::{ApiClient, DeleteType, Permission};
use crate::api::events::{InboundEvent, OutboundEvent};
use crate::api::models::{MessageId, MessageKind};
use crate::error::{Error, Result};
use crate::history::load_history;
use crate::realtime::channel::RealtimeSink;
use crate::receipts::ReadReceiptController;
use crate::reconcile::ReconciliationEngine;
use crate::send::OptimisticSendController;
use crate::store::ConversationStore;
use crate::typing::{TypingIndicatorController, TypingSignal};
use crate::utils::now_ms;

/// One open conversation: the store plus the controllers that mutate it.
/// Dropped on navigate-away; reopening fetches history fresh. Room
/// join/leave belongs to the connection manager.
pub struct ChatSession<S: RealtimeSink> {
    client: ApiClient,
    sink: S,
    store: ConversationStore,
    sender: OptimisticSendController,
    reconciler: ReconciliationEngine,
    typing: TypingIndicatorController,
    receipts: ReadReceiptController,
    foreground: bool,
}

impl<S: RealtimeSink> ChatSession<S> {
    /// Assemble a session around an already-seeded store.
    pub fn new(client: ApiClient, sink: S, store: ConversationStore) -> Self {
        Self {
            client,
            sink,
            store,
            sender: OptimisticSendController::new(),
            reconciler: ReconciliationEngine::new(),
            typing: TypingIndicatorController::new(),
            receipts: ReadReceiptController::new(),
            foreground: true,
        }
    }

    /// Open flow: permission gate, history seed, initial read
    /// acknowledgement. `pending_request` is the caller's knowledge that a
    /// chat request to this partner is still awaiting acceptance.
    pub async fn open(
        client: ApiClient,
        sink: S,
        local_user_id: &str,
        partner_id: &str,
        pending_request: bool,
    ) -> Result<Self> {
        match client.can_message(partner_id).await? {
            Permission::Blocked => return Err(Error::NotPermitted("user is blocked")),
            Permission::NotFollowing => {
                return Err(Error::NotPermitted("users do not follow each other"));
            }
            Permission::Allowed => {}
        }
        let mut store = ConversationStore::new(local_user_id, partner_id);
        // A failed initial load still yields a session: the store comes
        // back cleared with `load_failed` set, and the caller retries
        // through `refresh`.
        let _ = load_history(&client, &mut store, pending_request).await;
        let mut session = ChatSession::new(client, sink, store);
        session.acknowledge_read().await;
        Ok(session)
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Canonical room id for the connection manager to join.
    pub fn room_id(&self) -> String {
        self.store.conversation_id()
    }

    pub fn set_foreground(&mut self, foreground: bool) {
        if !foreground {
            // No stop signal on blur; receivers expire stale indicators.
            self.typing.cancel();
        }
        self.foreground = foreground;
    }

    /// User-initiated refresh, the only retry path after a failed load.
    pub async fn refresh(&mut self, pending_request: bool) -> Result<()> {
        load_history(&self.client, &mut self.store, pending_request).await
    }

    /// Optimistic send: the provisional entry lands in the transcript
    /// before any network round-trip. On REST success it is confirmed in
    /// place and the send is broadcast over the channel so the counterpart
    /// sees it without a resync; on failure it is rolled back entirely.
    pub async fn send(&mut self, content: &str) -> Result<()> {
        let now = now_ms();
        let Some(local_id) = self
            .sender
            .begin(&mut self.store, content, MessageKind::Text, now)
        else {
            return Ok(());
        };
        let content = content.trim().to_string();
        match self
            .client
            .send(self.store.partner_id(), &content, MessageKind::Text)
            .await
        {
            Ok(record) => {
                self.sender.resolve(&mut self.store, local_id, record);
                let broadcast = OutboundEvent::SendMessage {
                    content,
                    receiver_id: self.store.partner_id().to_string(),
                    message_type: MessageKind::Text,
                    sender: self.store.local_user_id().to_string(),
                };
                if let Err(err) = self.sink.emit(broadcast) {
                    // REST already delivered; only the fast path degraded.
                    log::debug!("send broadcast skipped: {err}");
                }
                Ok(())
            }
            Err(err) => {
                self.sender.fail(&mut self.store, local_id);
                Err(err)
            }
        }
    }

    /// Delete a confirmed message. `ForEveryone` additionally broadcasts
    /// so the counterpart's transcript drops it too.
    pub async fn delete(&mut self, id: &MessageId, delete_type: DeleteType) -> Result<()> {
        let Some(server_id) = id.confirmed() else {
            return Err(Error::DeleteUnconfirmed);
        };
        self.client.delete(server_id, delete_type).await?;
        let server_id = server_id.to_string();
        self.store.remove_confirmed(&server_id);
        if delete_type == DeleteType::ForEveryone {
            let event = OutboundEvent::DeleteMessage {
                room_id: self.room_id(),
                message_id: server_id,
            };
            if let Err(err) = self.sink.emit(event) {
                log::debug!("delete broadcast skipped: {err}");
            }
        }
        Ok(())
    }

    /// Feed one inbound realtime event through reconciliation. New unread
    /// counterpart messages are acknowledged immediately while the
    /// conversation is foregrounded.
    pub fn handle_event(&mut self, event: InboundEvent) {
        self.reconciler.apply(&mut self.store, event, now_ms());
        if self.foreground && self.store.unread_count() > 0 {
            if let Some(receipt) = self.receipts.acknowledge(&mut self.store) {
                if let Err(err) = self.sink.emit(receipt) {
                    log::debug!("read receipt skipped: {err}");
                }
            }
        }
    }

    /// Keystroke in the input field with its current content.
    pub fn keystroke(&mut self, content: &str) {
        if self
            .typing
            .keystroke(content, self.sink.is_connected(), now_ms())
            == Some(TypingSignal::Start)
        {
            let event = OutboundEvent::TypingStart {
                room_id: self.room_id(),
            };
            if let Err(err) = self.sink.emit(event) {
                log::debug!("typing signal skipped: {err}");
            }
        }
    }

    /// Next instant `poll_typing` can do work, for event loops that sleep.
    pub fn typing_deadline(&self) -> Option<i64> {
        self.typing.deadline()
    }

    /// Drive the typing idle timer.
    pub fn poll_typing(&mut self) {
        if self.typing.poll(now_ms()) == Some(TypingSignal::Stop) {
            let event = OutboundEvent::TypingStop {
                room_id: self.room_id(),
            };
            if let Err(err) = self.sink.emit(event) {
                log::debug!("typing stop skipped: {err}");
            }
        }
    }

    /// Navigate-away teardown. Pending typing timers die silently.
    pub fn close(&mut self) {
        self.typing.cancel();
    }

    async fn acknowledge_read(&mut self) {
        if let Some(receipt) = self.receipts.acknowledge(&mut self.store) {
            // Persist server-side state on open; later receipts ride the
            // realtime channel only.
            if let Err(err) = self.client.mark_read(self.store.partner_id()).await {
                log::warn!("mark-read request failed: {err}");
            }
            if let Err(err) = self.sink.emit(receipt) {
                log::debug!("read receipt skipped: {err}");
            }
        }
    }
}
