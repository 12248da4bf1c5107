// basket_service/src/models/cart.rs

use basket::{Cart, CartError, CartResult, LineItem, ProductId, UserId};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// One row of the `carts` table.
#[derive(Debug, Clone, FromRow)]
pub struct CartRow {
  pub user_id: i64,
  pub items: Json<Vec<LineItem>>,
}

impl CartRow {
  /// Rebuilds the domain cart, merging any duplicate lines a hand-edited row might carry.
  ///
  /// A row that cannot be repaired is a fault in the stored data, never in the request.
  pub fn into_cart(self) -> CartResult<Cart> {
    let user_id = self.user_id;
    Cart::from_items(user_id, self.items.0)
      .map_err(|e| CartError::Internal(format!("stored cart for user {} is unreadable: {}", user_id, e)))
  }
}

/// Cart as returned by the read endpoints.
///
/// `product_ids` and `amounts` are parallel arrays kept for clients that
/// predate `items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
  pub user_id: UserId,
  pub items: Vec<LineItem>,
  pub product_ids: Vec<ProductId>,
  pub amounts: Vec<u32>,
}

impl From<&Cart> for CartView {
  fn from(cart: &Cart) -> Self {
    Self {
      user_id: cart.user_id,
      items: cart.items().to_vec(),
      product_ids: cart.product_ids(),
      amounts: cart.amounts(),
    }
  }
}

/// Body of `add_product` and `remove_product`.
///
/// Amount is signed on the wire so that zero and negatives reach validation
/// instead of failing as a JSON type error.
#[derive(Debug, Clone, Deserialize)]
pub struct LinePayload {
  pub id: ProductId,
  pub amount: i64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn view_keeps_parallel_arrays_in_line_order() {
    let mut cart = Cart::new(4);
    cart.add(9, 2).unwrap();
    cart.add(3, 1).unwrap();
    let view = CartView::from(&cart);
    assert_eq!(view.product_ids, vec![9, 3]);
    assert_eq!(view.amounts, vec![2, 1]);
    assert_eq!(view.items.len(), 2);
  }

  #[test]
  fn row_with_duplicate_lines_is_merged() {
    let row = CartRow {
      user_id: 1,
      items: Json(vec![
        LineItem { product_id: 5, amount: 1 },
        LineItem { product_id: 5, amount: 2 },
      ]),
    };
    let cart = row.into_cart().unwrap();
    assert_eq!(cart.amount_of(5), Some(3));
    assert_eq!(cart.len(), 1);
  }

  #[test]
  fn row_that_cannot_be_merged_is_internal() {
    let row = CartRow {
      user_id: 8,
      items: Json(vec![
        LineItem { product_id: 5, amount: u32::MAX },
        LineItem { product_id: 5, amount: 1 },
      ]),
    };
    let err = row.into_cart().unwrap_err();
    assert!(matches!(err, CartError::Internal(ref m) if m.contains("user 8")), "got {:?}", err);
  }
}
