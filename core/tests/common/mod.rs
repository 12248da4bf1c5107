// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use basket::{Cart, CartEngine, CartIntent, InMemoryCartStore, InMemoryQueue, IntentConsumer, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Fixtures ---
pub struct Harness {
  pub store: InMemoryCartStore,
  pub engine: CartEngine,
  pub queue: InMemoryQueue,
}

impl Harness {
  pub fn new() -> Self {
    setup_tracing();
    let store = InMemoryCartStore::new();
    let engine = CartEngine::new(Arc::new(store.clone()));
    let queue = InMemoryQueue::new();
    Self { store, engine, queue }
  }

  /// A consumer over this harness's queue that dead-letters into the same queue.
  pub fn consumer(&self, max_attempts: u32) -> IntentConsumer<basket::queue::InMemorySource> {
    IntentConsumer::new(
      self.queue.source(),
      self.engine.clone(),
      Arc::new(self.queue.clone()),
      redelivery_policy(max_attempts),
    )
  }

  pub async fn cart(&self, user_id: i64) -> Option<Cart> {
    basket::CartStore::find_cart(&self.store, user_id).await.unwrap()
  }

  /// Line items as `(product_id, amount)` pairs; `None` if the cart does not exist.
  pub async fn lines(&self, user_id: i64) -> Option<Vec<(i64, u32)>> {
    self
      .cart(user_id)
      .await
      .map(|cart| cart.items().iter().map(|item| (item.product_id, item.amount)).collect())
  }
}

pub fn redelivery_policy(max_attempts: u32) -> RetryPolicy {
  RetryPolicy::exponential(max_attempts, Duration::from_millis(100), Duration::from_secs(1))
}

pub fn add(user_id: i64, product_id: i64, amount: i64) -> CartIntent {
  CartIntent::add(user_id, product_id, amount).unwrap()
}

pub fn remove(user_id: i64, product_id: i64, amount: i64) -> CartIntent {
  CartIntent::remove(user_id, product_id, amount).unwrap()
}
