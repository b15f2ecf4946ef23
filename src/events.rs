use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Domain events emitted after a unit of work commits.
///
/// Events are strictly post-commit notifications: a failed send is logged by
/// the emitting service and never fails the write that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Product events
    ProductCreated(i32),
    ProductUpdated(i32),
    ProductDeleted(i32),

    // Category events
    CategoryCreated(i32),
    CategoryDeleted(i32),
    ProductLinkedToCategory { product_id: i32, category_id: i32 },

    // User events
    UserRegistered(i32),
    UserUpdated(i32),
    UserDeleted(i32),

    // Order events
    OrderCreated(i32),
}

/// Cloneable handle for publishing events onto the shared channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates an event channel pair with the given buffer size.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}
