// basket/src/store/mod.rs

//! The cart store port.
//!
//! A store keeps one row per user. All writes go through
//! [`CartStore::update_cart`]: the store loads the current cart under a lock,
//! hands it to the caller's update function, persists whatever that function
//! decided and commits. If persisting or committing fails the transaction is
//! rolled back and the caller sees `CartError::Persistence`.

pub mod memory;

use crate::cart::{Cart, UserId};
use crate::error::CartResult;
use async_trait::async_trait;

pub use memory::InMemoryCartStore;

/// What an update function wants done with the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartWrite {
  /// Insert or replace the row with this cart.
  Put(Cart),
  /// Delete the row.
  Delete,
  /// Leave the row as it is; the transaction commits without writing.
  Unchanged,
}

/// Result of one transactional update, as reported back to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
  /// No cart existed; a new one was created with a single line.
  Created,
  /// An existing line's amount grew to the given value.
  Incremented(u32),
  /// A new line was appended to an existing cart.
  Appended,
  /// An existing line's amount shrank to the given value.
  Decremented(u32),
  /// The whole line was removed. The cart row remains, possibly empty.
  LineRemoved,
  /// The cart row was deleted.
  Deleted,
  /// Nothing to do: missing cart or missing product.
  NoOp,
}

impl MutationOutcome {
  pub fn wrote(&self) -> bool {
    !matches!(self, MutationOutcome::NoOp)
  }
}

/// The write plus the outcome it represents. Returned by update functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
  pub write: CartWrite,
  pub outcome: MutationOutcome,
}

impl Mutation {
  pub fn noop() -> Self {
    Self {
      write: CartWrite::Unchanged,
      outcome: MutationOutcome::NoOp,
    }
  }
}

/// Decides the write for one user's cart, given its current state (if any).
///
/// Runs inside the store's transaction, so it must not block or await.
pub type CartUpdateFn = Box<dyn FnOnce(Option<Cart>) -> CartResult<Mutation> + Send>;

#[async_trait]
pub trait CartStore: Send + Sync {
  /// All carts, ordered by user id.
  async fn list_carts(&self) -> CartResult<Vec<Cart>>;

  async fn find_cart(&self, user_id: UserId) -> CartResult<Option<Cart>>;

  /// Applies `update` to the cart of `user_id` in one transaction.
  ///
  /// An `Err` returned by `update` aborts the transaction and is passed
  /// through unchanged.
  async fn update_cart(&self, user_id: UserId, update: CartUpdateFn) -> CartResult<MutationOutcome>;
}
