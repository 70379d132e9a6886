use std::time::Duration;

use tokio::sync::mpsc;

use crate::api::events::OutboundEvent;
use crate::error::{Error, Result};
use crate::realtime::channel::{ChannelSignal, RealtimeSink, WsChannel};

/// Fixed pause between reconnect attempts. One attempt in flight at a
/// time; there is no backoff cap.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Owns connect/reconnect and room membership as the user moves between
/// conversations. Switching rooms joins the new one without leaving the
/// old; the reconciliation engine filters stale-room traffic.
#[derive(Debug)]
pub struct ConnectionLifecycleManager {
    state: ConnectionState,
    user_id: String,
    active_room: Option<String>,
}

impl ConnectionLifecycleManager {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            user_id: user_id.into(),
            active_room: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn active_room(&self) -> Option<&str> {
        self.active_room.as_deref()
    }

    /// Start a connection attempt. Refused unless currently disconnected,
    /// which keeps attempts serialized.
    pub fn begin_connect(&mut self) -> bool {
        if self.state == ConnectionState::Disconnected {
            self.state = ConnectionState::Connecting;
            true
        } else {
            false
        }
    }

    pub fn connect_failed(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Disconnected;
        }
    }

    /// Transport is up: re-register the presence identity and rejoin the
    /// open conversation's room, in that order.
    pub fn on_connected(&mut self) -> Vec<OutboundEvent> {
        self.state = ConnectionState::Connected;
        let mut events = vec![OutboundEvent::RegisterUser {
            user_id: self.user_id.clone(),
        }];
        if let Some(room_id) = &self.active_room {
            events.push(OutboundEvent::JoinChat {
                room_id: room_id.clone(),
            });
        }
        events
    }

    /// Transport error. Returns true when the caller should schedule a
    /// reconnect (i.e. this was the transition out of `Connected`).
    pub fn on_disconnected(&mut self) -> bool {
        if self.state == ConnectionState::Connected {
            self.state = ConnectionState::Disconnected;
            true
        } else {
            false
        }
    }

    /// The user opened a conversation. Joins its room immediately when
    /// connected; otherwise the join is replayed by `on_connected`.
    pub fn open_room(&mut self, room_id: impl Into<String>) -> Option<OutboundEvent> {
        let room_id = room_id.into();
        self.active_room = Some(room_id.clone());
        (self.state == ConnectionState::Connected)
            .then_some(OutboundEvent::JoinChat { room_id })
    }

    /// Dial until a connection is established, pausing `RECONNECT_DELAY`
    /// between attempts. The register/join events are flushed before the
    /// channel is handed back.
    pub async fn establish(
        &mut self,
        ws_url: &str,
        token: &str,
    ) -> Result<(WsChannel, mpsc::UnboundedReceiver<ChannelSignal>)> {
        if !self.begin_connect() {
            log::warn!("connect requested while {:?}", self.state);
            return Err(Error::ChannelClosed);
        }
        loop {
            match WsChannel::connect(ws_url, token).await {
                Ok((channel, signals)) => {
                    for event in self.on_connected() {
                        channel.emit(event)?;
                    }
                    log::info!("realtime channel connected");
                    return Ok((channel, signals));
                }
                Err(err) => {
                    log::warn!("realtime connect failed, retrying: {err}");
                    self.connect_failed();
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    self.begin_connect();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_are_serialized() {
        let mut mgr = ConnectionLifecycleManager::new("u1");
        assert!(mgr.begin_connect());
        assert!(!mgr.begin_connect());
        mgr.connect_failed();
        assert_eq!(mgr.state(), ConnectionState::Disconnected);
        assert!(mgr.begin_connect());
    }

    #[test]
    fn connect_replays_identity_and_open_room() {
        let mut mgr = ConnectionLifecycleManager::new("u1");
        assert!(mgr.open_room("a:b").is_none());
        mgr.begin_connect();
        let events = mgr.on_connected();
        assert_eq!(
            events,
            vec![
                OutboundEvent::RegisterUser { user_id: "u1".into() },
                OutboundEvent::JoinChat { room_id: "a:b".into() },
            ]
        );
        assert_eq!(mgr.state(), ConnectionState::Connected);
    }

    #[test]
    fn switching_rooms_joins_without_leaving() {
        let mut mgr = ConnectionLifecycleManager::new("u1");
        mgr.begin_connect();
        mgr.on_connected();
        let join = mgr.open_room("a:b");
        assert_eq!(join, Some(OutboundEvent::JoinChat { room_id: "a:b".into() }));
        let join = mgr.open_room("a:c");
        assert_eq!(join, Some(OutboundEvent::JoinChat { room_id: "a:c".into() }));
        assert_eq!(mgr.active_room(), Some("a:c"));
    }

    #[test]
    fn only_the_connected_to_disconnected_edge_schedules_reconnect() {
        let mut mgr = ConnectionLifecycleManager::new("u1");
        assert!(!mgr.on_disconnected());
        mgr.begin_connect();
        mgr.on_connected();
        assert!(mgr.on_disconnected());
        assert!(!mgr.on_disconnected());
    }
}
