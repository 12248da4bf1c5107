// basket/src/queue/memory.rs

//! An in-process queue with broker-like settlement semantics, for tests and
//! local runs without a broker.

use super::{DeadLetterSink, Delivery, IntentPublisher, IntentSource};
use crate::error::{CartError, CartResult};
use crate::intent::CartIntent;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{event, Level};

/// How a delivery was settled, recorded per message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
  Acked,
  Nacked(Duration),
  Termed,
}

/// A dead-lettered message as captured by the in-memory sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
  pub payload: Vec<u8>,
  pub reason: String,
  pub attempts: u32,
}

#[derive(Debug, Clone)]
struct Envelope {
  id: u64,
  payload: Vec<u8>,
  attempt: u32,
}

#[derive(Debug, Default)]
struct QueueInner {
  pending: Mutex<VecDeque<Envelope>>,
  settlements: Mutex<Vec<(u64, Settlement)>>,
  dead_letters: Mutex<Vec<DeadLetter>>,
  notify: Notify,
  closed: AtomicBool,
  next_id: AtomicU64,
  // 0 means unlimited redelivery.
  max_deliver: u32,
  fail_dead_letters: AtomicBool,
}

impl QueueInner {
  fn enqueue(&self, envelope: Envelope) {
    self.pending.lock().push_back(envelope);
    self.notify.notify_one();
  }

  fn record(&self, id: u64, settlement: Settlement) {
    self.settlements.lock().push((id, settlement));
  }
}

/// Cloneable handle: publish on one clone, consume from `source()` on another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryQueue {
  inner: Arc<QueueInner>,
}

impl InMemoryQueue {
  pub fn new() -> Self {
    Self::default()
  }

  /// Stops redelivering a message once it has been delivered `max_deliver` times,
  /// as a broker consumer with the same limit would.
  pub fn with_max_deliver(max_deliver: u32) -> Self {
    Self {
      inner: Arc::new(QueueInner {
        max_deliver,
        ..Default::default()
      }),
    }
  }

  /// Enqueues raw bytes, bypassing intent encoding. Returns the message id.
  pub fn push_raw(&self, payload: impl Into<Vec<u8>>) -> u64 {
    let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
    self.inner.enqueue(Envelope {
      id,
      payload: payload.into(),
      attempt: 1,
    });
    id
  }

  /// After `close`, the source drains what is pending and then ends.
  pub fn close(&self) {
    self.inner.closed.store(true, Ordering::SeqCst);
    self.inner.notify.notify_one();
  }

  pub fn source(&self) -> InMemorySource {
    InMemorySource {
      inner: self.inner.clone(),
    }
  }

  pub fn pending_len(&self) -> usize {
    self.inner.pending.lock().len()
  }

  /// Settlements in the order they happened.
  pub fn settlements(&self) -> Vec<(u64, Settlement)> {
    self.inner.settlements.lock().clone()
  }

  pub fn settlements_of(&self, id: u64) -> Vec<Settlement> {
    self
      .inner
      .settlements
      .lock()
      .iter()
      .filter(|(msg_id, _)| *msg_id == id)
      .map(|(_, settlement)| *settlement)
      .collect()
  }

  pub fn dead_letters(&self) -> Vec<DeadLetter> {
    self.inner.dead_letters.lock().clone()
  }

  pub fn fail_dead_letters(&self, fail: bool) {
    self.inner.fail_dead_letters.store(fail, Ordering::SeqCst);
  }
}

#[async_trait]
impl IntentPublisher for InMemoryQueue {
  async fn publish(&self, intent: &CartIntent) -> CartResult<()> {
    if self.inner.closed.load(Ordering::SeqCst) {
      return Err(CartError::Queue("queue is closed".to_string()));
    }
    let id = self.push_raw(intent.to_bytes()?);
    event!(Level::DEBUG, message_id = id, %intent, "Intent enqueued.");
    Ok(())
  }
}

#[async_trait]
impl DeadLetterSink for InMemoryQueue {
  async fn dead_letter(&self, payload: &[u8], reason: &str, attempts: u32) -> CartResult<()> {
    if self.inner.fail_dead_letters.load(Ordering::SeqCst) {
      return Err(CartError::Queue("dead-letter sink unavailable".to_string()));
    }
    self.inner.dead_letters.lock().push(DeadLetter {
      payload: payload.to_vec(),
      reason: reason.to_string(),
      attempts,
    });
    Ok(())
  }
}

pub struct InMemorySource {
  inner: Arc<QueueInner>,
}

#[async_trait]
impl IntentSource for InMemorySource {
  type Delivery = InMemoryDelivery;

  async fn next_delivery(&mut self) -> Option<CartResult<InMemoryDelivery>> {
    loop {
      let next = self.inner.pending.lock().pop_front();
      if let Some(envelope) = next {
        return Some(Ok(InMemoryDelivery {
          envelope,
          inner: self.inner.clone(),
        }));
      }
      if self.inner.closed.load(Ordering::SeqCst) {
        return None;
      }
      // notify_one leaves a permit when nobody is waiting, so a push between
      // the pop above and this await is not lost.
      self.inner.notify.notified().await;
    }
  }
}

pub struct InMemoryDelivery {
  envelope: Envelope,
  inner: Arc<QueueInner>,
}

impl InMemoryDelivery {
  pub fn id(&self) -> u64 {
    self.envelope.id
  }
}

#[async_trait]
impl Delivery for InMemoryDelivery {
  fn payload(&self) -> &[u8] {
    &self.envelope.payload
  }

  fn attempt(&self) -> u32 {
    self.envelope.attempt
  }

  async fn ack(&self) -> CartResult<()> {
    self.inner.record(self.envelope.id, Settlement::Acked);
    Ok(())
  }

  async fn nak(&self, delay: Duration) -> CartResult<()> {
    self.inner.record(self.envelope.id, Settlement::Nacked(delay));
    let max_deliver = self.inner.max_deliver;
    if max_deliver != 0 && self.envelope.attempt >= max_deliver {
      event!(
        Level::WARN,
        message_id = self.envelope.id,
        attempt = self.envelope.attempt,
        "Redelivery limit reached, message dropped."
      );
      return Ok(());
    }
    // Redelivered immediately; the delay is only recorded.
    self.inner.enqueue(Envelope {
      attempt: self.envelope.attempt + 1,
      ..self.envelope.clone()
    });
    Ok(())
  }

  async fn term(&self) -> CartResult<()> {
    self.inner.record(self.envelope.id, Settlement::Termed);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn nak_redelivers_with_next_attempt() {
    let queue = InMemoryQueue::new();
    let id = queue.push_raw(b"x".to_vec());
    let mut source = queue.source();

    let first = source.next_delivery().await.unwrap().unwrap();
    assert_eq!(first.attempt(), 1);
    first.nak(Duration::from_millis(10)).await.unwrap();

    let second = source.next_delivery().await.unwrap().unwrap();
    assert_eq!(second.id(), id);
    assert_eq!(second.attempt(), 2);
    second.ack().await.unwrap();

    assert_eq!(
      queue.settlements_of(id),
      vec![Settlement::Nacked(Duration::from_millis(10)), Settlement::Acked]
    );
  }

  #[tokio::test]
  async fn closed_queue_drains_then_ends() {
    let queue = InMemoryQueue::new();
    queue.push_raw(b"last".to_vec());
    queue.close();
    let mut source = queue.source();
    assert!(source.next_delivery().await.is_some());
    assert!(source.next_delivery().await.is_none());
    assert!(queue.publish(&CartIntent::delete_cart(1)).await.is_err());
  }

  #[tokio::test]
  async fn waiting_source_wakes_on_publish() {
    let queue = InMemoryQueue::new();
    let mut source = queue.source();
    let waiter = tokio::spawn(async move { source.next_delivery().await.map(|d| d.map(|d| d.attempt())) });
    tokio::task::yield_now().await;
    queue.publish(&CartIntent::delete_cart(4)).await.unwrap();
    assert_eq!(waiter.await.unwrap().unwrap().unwrap(), 1);
  }

  #[tokio::test]
  async fn max_deliver_stops_redelivery() {
    let queue = InMemoryQueue::with_max_deliver(2);
    queue.push_raw(b"y".to_vec());
    queue.close();
    let mut source = queue.source();
    source.next_delivery().await.unwrap().unwrap().nak(Duration::ZERO).await.unwrap();
    source.next_delivery().await.unwrap().unwrap().nak(Duration::ZERO).await.unwrap();
    assert!(source.next_delivery().await.is_none());
  }
}
