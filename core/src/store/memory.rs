// basket/src/store/memory.rs

use super::{CartStore, CartUpdateFn, CartWrite, MutationOutcome};
use crate::cart::{Cart, UserId};
use crate::error::{CartError, CartResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{event, Level};

/// A process-local store backed by a `BTreeMap` behind a `parking_lot::RwLock`.
///
/// Used by tests, benchmarks and local development. The write lock is held for
/// the whole update, which gives the same per-user serialization as a row
/// lock. `fail_next_writes` makes the next N writing transactions fail with
/// `CartError::Persistence` after the update function ran, leaving the map
/// untouched, which is what a rolled-back database transaction looks like.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartStore {
  carts: Arc<RwLock<BTreeMap<UserId, Cart>>>,
  failing_writes: Arc<AtomicUsize>,
  commits: Arc<AtomicUsize>,
}

impl InMemoryCartStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fail_next_writes(&self, count: usize) {
    self.failing_writes.store(count, Ordering::SeqCst);
  }

  /// Number of transactions that persisted a write.
  pub fn commit_count(&self) -> usize {
    self.commits.load(Ordering::SeqCst)
  }

  pub fn cart_count(&self) -> usize {
    self.carts.read().len()
  }

  fn take_injected_failure(&self) -> bool {
    self
      .failing_writes
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
      .is_ok()
  }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
  async fn list_carts(&self) -> CartResult<Vec<Cart>> {
    Ok(self.carts.read().values().cloned().collect())
  }

  async fn find_cart(&self, user_id: UserId) -> CartResult<Option<Cart>> {
    Ok(self.carts.read().get(&user_id).cloned())
  }

  async fn update_cart(&self, user_id: UserId, update: CartUpdateFn) -> CartResult<MutationOutcome> {
    let mut carts = self.carts.write();
    let mutation = update(carts.get(&user_id).cloned())?;

    if mutation.write != CartWrite::Unchanged && self.take_injected_failure() {
      event!(Level::WARN, user_id, "Injected write failure, rolling back.");
      return Err(CartError::persistence(
        user_id,
        anyhow::anyhow!("injected write failure"),
      ));
    }

    match mutation.write {
      CartWrite::Put(cart) => {
        if cart.user_id != user_id {
          return Err(CartError::Internal(format!(
            "update for user {} produced a cart for user {}",
            user_id, cart.user_id
          )));
        }
        carts.insert(user_id, cart);
        self.commits.fetch_add(1, Ordering::SeqCst);
      }
      CartWrite::Delete => {
        carts.remove(&user_id);
        self.commits.fetch_add(1, Ordering::SeqCst);
      }
      CartWrite::Unchanged => {}
    }
    Ok(mutation.outcome)
  }
}
