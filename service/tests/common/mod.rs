// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use basket::{CartEngine, InMemoryCartStore, InMemoryQueue, IntentConsumer, RetryPolicy};
use basket_service::AppState;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// In-memory store and queue standing in for Postgres and NATS.
pub struct TestBackend {
  pub store: InMemoryCartStore,
  pub queue: InMemoryQueue,
}

impl TestBackend {
  pub fn new() -> Self {
    setup_tracing();
    Self {
      store: InMemoryCartStore::new(),
      queue: InMemoryQueue::new(),
    }
  }

  pub fn state(&self) -> AppState {
    AppState::new(Arc::new(self.store.clone()), Arc::new(self.queue.clone()))
  }

  pub fn engine(&self) -> CartEngine {
    CartEngine::new(Arc::new(self.store.clone()))
  }

  /// Applies everything queued so far, as the consumer binary would.
  pub async fn drain(&self) {
    self.queue.close();
    let mut consumer = IntentConsumer::new(
      self.queue.source(),
      self.engine(),
      Arc::new(self.queue.clone()),
      RetryPolicy::exponential(3, Duration::from_millis(10), Duration::from_millis(50)),
    );
    consumer.run().await;
  }
}
