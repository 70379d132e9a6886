use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use url::Url;

use crate::api::events::{InboundEvent, OutboundEvent};
use crate::error::{Error, Result};

/// What the reader task surfaces to the engine's event loop.
#[derive(Debug)]
pub enum ChannelSignal {
    Event(InboundEvent),
    Disconnected,
}

/// Outbound half of the realtime channel. Injected so a session can run
/// against a recording fake in tests.
pub trait RealtimeSink: Send {
    fn emit(&self, event: OutboundEvent) -> Result<()>;
    fn is_connected(&self) -> bool;
}

/// tokio-tungstenite backed channel. A writer task drains the outbound
/// queue and a reader task decodes frames into `ChannelSignal`s.
pub struct WsChannel {
    outbound: mpsc::UnboundedSender<OutboundEvent>,
    connected: Arc<AtomicBool>,
}

impl WsChannel {
    /// Connect and authenticate. Inbound events, and eventually the
    /// disconnect notice, arrive on the returned receiver.
    pub async fn connect(
        ws_url: &str,
        token: &str,
    ) -> Result<(WsChannel, mpsc::UnboundedReceiver<ChannelSignal>)> {
        let mut url = Url::parse(ws_url)?;
        url.query_pairs_mut().append_pair("token", token);
        let (stream, _) = connect_async(url.as_str()).await?;
        let (mut write, mut read) = stream.split();

        let connected = Arc::new(AtomicBool::new(true));
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<OutboundEvent>();
        let (sig_tx, sig_rx) = mpsc::unbounded_channel();

        let writer_connected = connected.clone();
        let writer_sig_tx = sig_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = out_rx.recv().await {
                if let Err(err) = write.send(WsMessage::Text(event.encode())).await {
                    log::warn!("realtime write failed: {err}");
                    writer_connected.store(false, Ordering::SeqCst);
                    // the reader may not have noticed yet; duplicate
                    // disconnect notices are absorbed by the lifecycle
                    let _ = writer_sig_tx.send(ChannelSignal::Disconnected);
                    break;
                }
            }
        });

        let reader_connected = connected.clone();
        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => {
                        if let Some(event) = InboundEvent::decode(&text) {
                            if sig_tx.send(ChannelSignal::Event(event)).is_err() {
                                // Engine side is gone; stop reading.
                                return;
                            }
                        }
                    }
                    Ok(WsMessage::Close(_)) => break,
                    Err(err) => {
                        log::warn!("realtime read failed: {err}");
                        break;
                    }
                    Ok(_) => {}
                }
            }
            reader_connected.store(false, Ordering::SeqCst);
            let _ = sig_tx.send(ChannelSignal::Disconnected);
        });

        Ok((
            WsChannel {
                outbound: out_tx,
                connected,
            },
            sig_rx,
        ))
    }
}

impl RealtimeSink for WsChannel {
    fn emit(&self, event: OutboundEvent) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::ChannelClosed);
        }
        self.outbound.send(event).map_err(|_| Error::ChannelClosed)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
