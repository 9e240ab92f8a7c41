//! Handing extracted line items to a downstream message queue.

#[cfg(feature = "http")]
pub mod sqs;

#[cfg(feature = "http")]
pub use sqs::SqsSink;

use tracing::info;

use crate::error::PublishError;
use crate::models::InvoiceItem;

/// Result type for publishing operations.
pub type Result<T> = std::result::Result<T, PublishError>;

/// Destination for opaque message bodies.
pub trait MessageSink: Send + Sync {
    /// Deliver one message body to `destination`.
    fn send(&self, destination: &str, body: &str) -> Result<()>;
}

impl<S: MessageSink + ?Sized> MessageSink for Box<S> {
    fn send(&self, destination: &str, body: &str) -> Result<()> {
        (**self).send(destination, body)
    }
}

/// Serializes line items and sends them to a fixed destination.
pub struct Publisher<S: MessageSink> {
    sink: S,
    destination: String,
}

impl<S: MessageSink> Publisher<S> {
    /// Create a publisher sending to `destination` through `sink`.
    pub fn new(sink: S, destination: impl Into<String>) -> Self {
        Self {
            sink,
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Send an already serialized payload.
    pub fn publish(&self, payload: &str) -> Result<()> {
        if self.destination.is_empty() {
            return Err(PublishError::NoDestination);
        }
        self.sink.send(&self.destination, payload)?;
        info!("Published {} bytes to {}", payload.len(), self.destination);
        Ok(())
    }
}

/// Serialize line items as a JSON array.
pub fn serialize_items(items: &[InvoiceItem]) -> serde_json::Result<String> {
    serde_json::to_string(items)
}
