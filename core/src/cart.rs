// basket/src/cart.rs

//! The cart aggregate: one per user, an ordered list of line items.
//!
//! Line items are kept as `{product_id, amount}` records rather than two
//! positionally-paired arrays, so a product and its amount can never drift
//! apart. `product_ids()` and `amounts()` are derived views for readers that
//! still want the columnar shape.

use crate::error::{CartError, CartResult};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type ProductId = i64;

/// One (product id, quantity) entry within a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
  pub product_id: ProductId,
  pub amount: u32,
}

/// What `Cart::remove` did to the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
  /// The product was not in the cart.
  Absent,
  /// The line survived with this amount.
  Decremented(u32),
  /// The requested amount covered the whole line, which is gone.
  LineRemoved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
  pub user_id: UserId,
  items: Vec<LineItem>,
}

impl Cart {
  pub fn new(user_id: UserId) -> Self {
    Self {
      user_id,
      items: Vec::new(),
    }
  }

  /// Rebuilds a cart from stored line items, merging duplicate products and
  /// dropping non-positive amounts so a hand-edited row cannot break the
  /// cart's invariants.
  pub fn from_items(user_id: UserId, items: impl IntoIterator<Item = LineItem>) -> CartResult<Self> {
    let mut cart = Self::new(user_id);
    for item in items {
      if item.amount == 0 {
        continue;
      }
      cart.add(item.product_id, item.amount)?;
    }
    Ok(cart)
  }

  pub fn items(&self) -> &[LineItem] {
    &self.items
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn amount_of(&self, product_id: ProductId) -> Option<u32> {
    self.position(product_id).map(|idx| self.items[idx].amount)
  }

  pub fn product_ids(&self) -> Vec<ProductId> {
    self.items.iter().map(|item| item.product_id).collect()
  }

  pub fn amounts(&self) -> Vec<u32> {
    self.items.iter().map(|item| item.amount).collect()
  }

  /// Adds `amount` of `product_id`, merging into an existing line if present.
  /// Returns the line's new amount.
  ///
  /// Fails with `Validation` (and leaves the cart untouched) when `amount` is
  /// zero or the merged amount would overflow.
  pub fn add(&mut self, product_id: ProductId, amount: u32) -> CartResult<u32> {
    if amount == 0 {
      return Err(CartError::Validation("amount must be positive".to_string()));
    }
    match self.position(product_id) {
      Some(idx) => {
        let line = &mut self.items[idx];
        line.amount = line.amount.checked_add(amount).ok_or_else(|| {
          CartError::Validation(format!(
            "amount for product {} would exceed {}",
            product_id,
            u32::MAX
          ))
        })?;
        Ok(line.amount)
      }
      None => {
        self.items.push(LineItem { product_id, amount });
        Ok(amount)
      }
    }
  }

  /// Removes up to `amount` of `product_id`. A request covering the whole line
  /// drops the line; the cart itself stays, even when emptied.
  pub fn remove(&mut self, product_id: ProductId, amount: u32) -> Removal {
    let Some(idx) = self.position(product_id) else {
      return Removal::Absent;
    };
    let line = &mut self.items[idx];
    if amount >= line.amount {
      self.items.remove(idx);
      Removal::LineRemoved
    } else {
      line.amount -= amount;
      Removal::Decremented(line.amount)
    }
  }

  fn position(&self, product_id: ProductId) -> Option<usize> {
    self.items.iter().position(|item| item.product_id == product_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn add_merges_duplicates_and_keeps_first_position() {
    let mut cart = Cart::new(1);
    cart.add(5, 2).unwrap();
    cart.add(7, 1).unwrap();
    assert_eq!(cart.add(5, 3).unwrap(), 5);
    assert_eq!(cart.product_ids(), vec![5, 7]);
    assert_eq!(cart.amounts(), vec![5, 1]);
  }

  #[test]
  fn add_rejects_zero_and_overflow_without_mutating() {
    let mut cart = Cart::new(1);
    cart.add(5, u32::MAX - 1).unwrap();
    assert!(matches!(cart.add(5, 0), Err(CartError::Validation(_))));
    assert!(matches!(cart.add(5, 2), Err(CartError::Validation(_))));
    assert_eq!(cart.amount_of(5), Some(u32::MAX - 1));
  }

  #[test]
  fn remove_decrements_or_drops_line() {
    let mut cart = Cart::new(1);
    cart.add(5, 5).unwrap();
    cart.add(6, 1).unwrap();
    assert_eq!(cart.remove(5, 2), Removal::Decremented(3));
    assert_eq!(cart.remove(5, 3), Removal::LineRemoved);
    assert_eq!(cart.remove(5, 1), Removal::Absent);
    assert_eq!(cart.product_ids(), vec![6]);
    assert_eq!(cart.amounts(), vec![1]);
  }

  #[test]
  fn removing_middle_line_keeps_pairs_together() {
    let mut cart = Cart::new(9);
    cart.add(1, 10).unwrap();
    cart.add(2, 20).unwrap();
    cart.add(3, 30).unwrap();
    cart.remove(2, 20);
    assert_eq!(
      cart.items(),
      &[
        LineItem { product_id: 1, amount: 10 },
        LineItem { product_id: 3, amount: 30 }
      ]
    );
  }

  #[test]
  fn from_items_repairs_duplicates_and_zero_amounts() {
    let cart = Cart::from_items(
      3,
      vec![
        LineItem { product_id: 1, amount: 2 },
        LineItem { product_id: 2, amount: 0 },
        LineItem { product_id: 1, amount: 4 },
      ],
    )
    .unwrap();
    assert_eq!(cart.items(), &[LineItem { product_id: 1, amount: 6 }]);
  }

  #[test]
  fn emptied_cart_is_still_a_cart() {
    let mut cart = Cart::new(1);
    cart.add(5, 1).unwrap();
    cart.remove(5, 10);
    assert!(cart.is_empty());
    assert_eq!(cart.user_id, 1);
  }
}
