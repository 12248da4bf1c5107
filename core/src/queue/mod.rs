// basket/src/queue/mod.rs

//! Queue ports: the producer side used by the API gateway, and the consumer
//! side (a stream of deliveries that must be settled) used by the
//! consumption loop.

pub mod memory;

use crate::error::CartResult;
use crate::intent::CartIntent;
use async_trait::async_trait;
use std::time::Duration;

pub use memory::{InMemoryDelivery, InMemoryQueue, InMemorySource, Settlement};

/// One received message awaiting settlement.
///
/// Exactly one of `ack`, `nak` or `term` should be called per delivery.
#[async_trait]
pub trait Delivery: Send + Sync {
  fn payload(&self) -> &[u8];

  /// How many times this message has been delivered, starting at 1.
  fn attempt(&self) -> u32;

  /// The message is handled; the broker forgets it.
  async fn ack(&self) -> CartResult<()>;

  /// The message could not be handled now; redeliver after `delay`.
  async fn nak(&self, delay: Duration) -> CartResult<()>;

  /// The message can never be handled; do not redeliver.
  async fn term(&self) -> CartResult<()>;
}

#[async_trait]
pub trait IntentSource: Send {
  type Delivery: Delivery;

  /// Waits for the next delivery. `None` means the source is closed and the
  /// consumer should stop.
  async fn next_delivery(&mut self) -> Option<CartResult<Self::Delivery>>;
}

#[async_trait]
pub trait IntentPublisher: Send + Sync {
  async fn publish(&self, intent: &CartIntent) -> CartResult<()>;
}

/// Where messages go once redelivery is exhausted.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
  async fn dead_letter(&self, payload: &[u8], reason: &str, attempts: u32) -> CartResult<()>;
}
