// basket/src/engine.rs

//! Applies validated intents to a [`CartStore`], one transaction per intent.

use crate::cart::{Cart, ProductId, Removal, UserId};
use crate::error::CartResult;
use crate::intent::CartIntent;
use crate::store::{CartStore, CartWrite, Mutation, MutationOutcome};
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// The cart mutation engine. Cheap to clone; the store handle is shared.
#[derive(Clone)]
pub struct CartEngine {
  store: Arc<dyn CartStore>,
}

impl CartEngine {
  pub fn new(store: Arc<dyn CartStore>) -> Self {
    Self { store }
  }

  pub async fn apply(&self, intent: &CartIntent) -> CartResult<MutationOutcome> {
    match *intent {
      CartIntent::Add {
        user_id,
        product_id,
        amount,
      } => self.add(user_id, product_id, amount).await,
      CartIntent::Remove {
        user_id,
        product_id,
        amount,
      } => self.remove(user_id, product_id, amount).await,
      CartIntent::DeleteCart { user_id } => self.delete_cart(user_id).await,
    }
  }

  /// Creates the cart if needed, then merges `amount` into the product's line.
  #[instrument(name = "CartEngine::add", skip(self), err(Display))]
  pub async fn add(&self, user_id: UserId, product_id: ProductId, amount: u32) -> CartResult<MutationOutcome> {
    let outcome = self
      .store
      .update_cart(
        user_id,
        Box::new(move |current: Option<Cart>| {
          let Some(mut cart) = current else {
            let mut cart = Cart::new(user_id);
            cart.add(product_id, amount)?;
            return Ok(Mutation {
              write: CartWrite::Put(cart),
              outcome: MutationOutcome::Created,
            });
          };
          let had_line = cart.amount_of(product_id).is_some();
          let new_amount = cart.add(product_id, amount)?;
          Ok(Mutation {
            write: CartWrite::Put(cart),
            outcome: if had_line {
              MutationOutcome::Incremented(new_amount)
            } else {
              MutationOutcome::Appended
            },
          })
        }),
      )
      .await?;
    event!(Level::INFO, ?outcome, "Cart add applied.");
    Ok(outcome)
  }

  /// Decrements the product's line, dropping it when `amount` covers it.
  /// Missing cart or missing product is a no-op.
  #[instrument(name = "CartEngine::remove", skip(self), err(Display))]
  pub async fn remove(&self, user_id: UserId, product_id: ProductId, amount: u32) -> CartResult<MutationOutcome> {
    let outcome = self
      .store
      .update_cart(
        user_id,
        Box::new(move |current: Option<Cart>| {
          let Some(mut cart) = current else {
            return Ok(Mutation::noop());
          };
          let outcome = match cart.remove(product_id, amount) {
            Removal::Absent => return Ok(Mutation::noop()),
            Removal::Decremented(left) => MutationOutcome::Decremented(left),
            Removal::LineRemoved => MutationOutcome::LineRemoved,
          };
          Ok(Mutation {
            write: CartWrite::Put(cart),
            outcome,
          })
        }),
      )
      .await?;
    if outcome.wrote() {
      event!(Level::INFO, ?outcome, "Cart remove applied.");
    } else {
      event!(Level::INFO, "Nothing to remove: cart or product not present.");
    }
    Ok(outcome)
  }

  #[instrument(name = "CartEngine::delete_cart", skip(self), err(Display))]
  pub async fn delete_cart(&self, user_id: UserId) -> CartResult<MutationOutcome> {
    let outcome = self
      .store
      .update_cart(
        user_id,
        Box::new(|current: Option<Cart>| {
          Ok(match current {
            Some(_) => Mutation {
              write: CartWrite::Delete,
              outcome: MutationOutcome::Deleted,
            },
            None => Mutation::noop(),
          })
        }),
      )
      .await?;
    event!(Level::INFO, ?outcome, "Cart delete applied.");
    Ok(outcome)
  }
}

impl std::fmt::Debug for CartEngine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CartEngine").finish_non_exhaustive()
  }
}
