use {
    domain::ChainId,
    mirror::Channel,
    std::sync::{Arc, Mutex},
    tokio::sync::mpsc,
};

/// An in-process message channel. `send` queues without blocking; a test
/// drains the queue and hands payloads to receivers whenever it chooses,
/// which models the relay's asynchronous, reorderable delivery.
pub struct LocalChannel {
    tx: mpsc::UnboundedSender<(ChainId, Vec<u8>)>,
    rx: Mutex<mpsc::UnboundedReceiver<(ChainId, Vec<u8>)>>,
}

impl LocalChannel {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            tx,
            rx: Mutex::new(rx),
        })
    }

    /// Takes every queued message out of the channel, in send order.
    pub fn drain(&self) -> Vec<(ChainId, Vec<u8>)> {
        let mut rx = self.rx.lock().unwrap();
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }
}

impl Channel for LocalChannel {
    fn send(&self, chain: ChainId, payload: Vec<u8>) {
        // Fire-and-forget: a closed receiver just drops the message, which
        // is within the relay's delivery guarantees.
        let _ = self.tx.send((chain, payload));
    }
}
