use tokio::sync::mpsc;
use tracing::trace;
use wavegate_core::RunEvent;

/// Channel for streaming run events
#[derive(Clone, Debug)]
pub struct EventChannel {
    sender: mpsc::UnboundedSender<RunEvent>,
}

impl EventChannel {
    /// Creates a channel and its receiving end.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Creates a channel from an existing sender
    pub fn from_sender(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self { sender }
    }

    /// Sends an event; it is dropped if the receiver has been closed.
    pub fn send(&self, event: RunEvent) {
        if self.sender.send(event).is_err() {
            trace!("Run event receiver closed, dropping event");
        }
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new().0
    }
}
