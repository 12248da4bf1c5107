// basket/src/intent.rs

//! Cart mutation intents and their wire format.
//!
//! The queue carries one JSON object per message:
//!
//! ```json
//! {"action": "add", "user_id": 1, "product_id": 5, "amount": 2}
//! ```
//!
//! `product_id` and `amount` are `null` for `delete_cart`. Decoding is a pure
//! step: it either yields a [`CartIntent`] or a `Decode` / `Validation` error,
//! and the consumer decides what to do with the message.

use crate::cart::{ProductId, UserId};
use crate::error::{CartError, CartResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  Add,
  Remove,
  DeleteCart,
}

impl Action {
  pub fn as_str(&self) -> &'static str {
    match self {
      Action::Add => "add",
      Action::Remove => "remove",
      Action::DeleteCart => "delete_cart",
    }
  }

  fn parse(raw: &str) -> CartResult<Self> {
    match raw {
      "add" => Ok(Action::Add),
      "remove" => Ok(Action::Remove),
      "delete_cart" => Ok(Action::DeleteCart),
      other => Err(CartError::Validation(format!("unknown action '{}'", other))),
    }
  }
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A validated instruction to mutate one user's cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartIntent {
  Add {
    user_id: UserId,
    product_id: ProductId,
    amount: u32,
  },
  Remove {
    user_id: UserId,
    product_id: ProductId,
    amount: u32,
  },
  DeleteCart {
    user_id: UserId,
  },
}

#[derive(Serialize)]
struct WireIntent {
  action: Action,
  user_id: UserId,
  product_id: Option<ProductId>,
  amount: Option<u32>,
}

impl CartIntent {
  /// Builds an `add` intent, applying the same rules as the decoder.
  pub fn add(user_id: UserId, product_id: ProductId, amount: i64) -> CartResult<Self> {
    Ok(CartIntent::Add {
      user_id,
      product_id: check_product_id(product_id)?,
      amount: check_amount(amount)?,
    })
  }

  /// Builds a `remove` intent, applying the same rules as the decoder.
  pub fn remove(user_id: UserId, product_id: ProductId, amount: i64) -> CartResult<Self> {
    Ok(CartIntent::Remove {
      user_id,
      product_id: check_product_id(product_id)?,
      amount: check_amount(amount)?,
    })
  }

  pub fn delete_cart(user_id: UserId) -> Self {
    CartIntent::DeleteCart { user_id }
  }

  pub fn action(&self) -> Action {
    match self {
      CartIntent::Add { .. } => Action::Add,
      CartIntent::Remove { .. } => Action::Remove,
      CartIntent::DeleteCart { .. } => Action::DeleteCart,
    }
  }

  pub fn user_id(&self) -> UserId {
    match *self {
      CartIntent::Add { user_id, .. } | CartIntent::Remove { user_id, .. } | CartIntent::DeleteCart { user_id } => {
        user_id
      }
    }
  }

  pub fn product_id(&self) -> Option<ProductId> {
    match *self {
      CartIntent::Add { product_id, .. } | CartIntent::Remove { product_id, .. } => Some(product_id),
      CartIntent::DeleteCart { .. } => None,
    }
  }

  pub fn amount(&self) -> Option<u32> {
    match *self {
      CartIntent::Add { amount, .. } | CartIntent::Remove { amount, .. } => Some(amount),
      CartIntent::DeleteCart { .. } => None,
    }
  }

  /// Decodes and validates one raw queue message.
  pub fn decode(payload: &[u8]) -> CartResult<Self> {
    let value: Value = serde_json::from_slice(payload)?;
    let Value::Object(fields) = value else {
      return Err(CartError::Decode("expected a JSON object".to_string()));
    };

    let action = match fields.get("action") {
      None | Some(Value::Null) => return Err(CartError::Validation("missing action".to_string())),
      Some(Value::String(raw)) => Action::parse(raw)?,
      Some(other) => {
        return Err(CartError::Validation(format!("action must be a string, got {}", other)));
      }
    };
    let user_id = required_int(&fields, "user_id")?;

    match action {
      Action::DeleteCart => Ok(CartIntent::DeleteCart { user_id }),
      Action::Add => CartIntent::add(
        user_id,
        required_int(&fields, "product_id")?,
        required_int(&fields, "amount")?,
      ),
      Action::Remove => CartIntent::remove(
        user_id,
        required_int(&fields, "product_id")?,
        required_int(&fields, "amount")?,
      ),
    }
  }

  /// Renders the wire payload published to the queue.
  pub fn to_bytes(&self) -> CartResult<Vec<u8>> {
    let wire = WireIntent {
      action: self.action(),
      user_id: self.user_id(),
      product_id: self.product_id(),
      amount: self.amount(),
    };
    serde_json::to_vec(&wire).map_err(|e| CartError::Internal(format!("encoding intent failed: {}", e)))
  }
}

impl fmt::Display for CartIntent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CartIntent::Add {
        user_id,
        product_id,
        amount,
      }
      | CartIntent::Remove {
        user_id,
        product_id,
        amount,
      } => write!(f, "{}(user={}, product={}, amount={})", self.action(), user_id, product_id, amount),
      CartIntent::DeleteCart { user_id } => write!(f, "delete_cart(user={})", user_id),
    }
  }
}

fn required_int(fields: &Map<String, Value>, name: &str) -> CartResult<i64> {
  match fields.get(name) {
    None | Some(Value::Null) => Err(CartError::Validation(format!("missing {}", name))),
    Some(value) => value
      .as_i64()
      .ok_or_else(|| CartError::Validation(format!("{} must be an integer, got {}", name, value))),
  }
}

fn check_product_id(product_id: ProductId) -> CartResult<ProductId> {
  if product_id == 0 {
    return Err(CartError::Validation("product_id must be nonzero".to_string()));
  }
  Ok(product_id)
}

fn check_amount(amount: i64) -> CartResult<u32> {
  if amount <= 0 {
    return Err(CartError::Validation(format!("amount must be positive, got {}", amount)));
  }
  u32::try_from(amount).map_err(|_| CartError::Validation(format!("amount {} is too large", amount)))
}
