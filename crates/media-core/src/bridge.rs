//! Per-call media stream bridge
//!
//! Owns the in-memory side of one carrier media connection. The transport
//! loop (the webhook layer's WebSocket handler) feeds decoded inbound audio
//! in through [`MediaStreamBridge::handle_inbound`] and drains outbound
//! messages from the channel returned by [`MediaStreamBridge::new`].
//!
//! Inbound frames go to the single current subscriber; with no subscriber
//! they are dropped, never buffered — a listen operation installs a fresh
//! subscription on entry precisely so that stale audio cannot leak into a
//! turn. Outbound writes after close are silently dropped, so trailing
//! audio from an already-ended call never surfaces as an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

use crate::envelope;

struct Inner {
    subscriber: Option<mpsc::UnboundedSender<Bytes>>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    stream_id: Option<String>,
}

/// The bidirectional audio endpoint of one live call.
pub struct MediaStreamBridge {
    inner: Mutex<Inner>,
    open: AtomicBool,
    closed_tx: watch::Sender<bool>,
}

impl MediaStreamBridge {
    /// Create a bridge and the outbound message stream its socket writer
    /// must drain. The receiver yields ready-to-send envelope text and ends
    /// when the bridge closes.
    pub fn new(stream_id: Option<String>) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (closed_tx, _) = watch::channel(false);
        let bridge = Arc::new(Self {
            inner: Mutex::new(Inner {
                subscriber: None,
                outbound: Some(outbound_tx),
                stream_id,
            }),
            open: AtomicBool::new(true),
            closed_tx,
        });
        (bridge, outbound_rx)
    }

    /// Whether the media connection is still open for writing
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Install a fresh inbound subscription, replacing any previous one.
    ///
    /// Replacing the sender drops whatever the old subscriber had not yet
    /// consumed, which is the "clear buffered audio" step of a listen.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Bytes> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        inner.subscriber = Some(tx);
        if !self.is_open() {
            // Closed already: drop the sender so the subscriber sees
            // end-of-stream instead of waiting out its deadline.
            inner.subscriber = None;
        }
        rx
    }

    /// Drop the current inbound subscription, if any.
    pub fn clear_subscriber(&self) {
        self.inner.lock().subscriber = None;
    }

    /// Forward one chunk of decoded caller audio to the active subscriber.
    pub fn handle_inbound(&self, audio: Vec<u8>) {
        let inner = self.inner.lock();
        match &inner.subscriber {
            Some(tx) => {
                // A receiver dropped mid-turn just means that listen ended.
                let _ = tx.send(Bytes::from(audio));
            }
            None => trace!("inbound media with no subscriber, dropped"),
        }
    }

    /// Queue one encoded wire frame for the socket writer.
    ///
    /// A no-op once the connection has closed.
    pub fn send_frame(&self, frame: &[u8]) {
        if !self.is_open() {
            return;
        }
        let inner = self.inner.lock();
        if let Some(outbound) = &inner.outbound {
            let message = envelope::media_message(inner.stream_id.as_deref(), frame);
            let _ = outbound.send(message);
        }
    }

    /// Close the bridge: stop accepting writes, end the writer stream, and
    /// drop the subscriber so an in-flight listen observes end-of-stream.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!("media bridge closed");
        }
        let mut inner = self.inner.lock();
        inner.subscriber = None;
        inner.outbound = None;
        drop(inner);
        let _ = self.closed_tx.send(true);
    }

    /// Wait until the bridge has closed (carrier-side or local).
    pub async fn closed(&self) {
        let mut rx = self.closed_tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
