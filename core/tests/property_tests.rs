//! Property tests for the cart mutation engine.
//!
//! Invariants tested:
//! - Adds alone produce exactly the distinct products submitted, each with the summed amount
//! - After any mix of add/remove/delete_cart, no product appears twice and
//!   `product_ids` and `amounts` stay the same length, with positive amounts
//! - The engine agrees with a straightforward reference model

mod common;

use basket::{CartIntent, CartStore};
use common::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};
use tokio::runtime::Runtime;

#[derive(Debug, Clone)]
enum Op {
  Add { user_id: i64, product_id: i64, amount: i64 },
  Remove { user_id: i64, product_id: i64, amount: i64 },
  Delete { user_id: i64 },
}

impl Op {
  fn intent(&self) -> CartIntent {
    match *self {
      Op::Add {
        user_id,
        product_id,
        amount,
      } => add(user_id, product_id, amount),
      Op::Remove {
        user_id,
        product_id,
        amount,
      } => remove(user_id, product_id, amount),
      Op::Delete { user_id } => CartIntent::delete_cart(user_id),
    }
  }
}

fn op_strategy() -> impl Strategy<Value = Op> {
  prop_oneof![
    4 => (1i64..=3, 1i64..=6, 1i64..=20).prop_map(|(user_id, product_id, amount)| Op::Add { user_id, product_id, amount }),
    3 => (1i64..=3, 1i64..=6, 1i64..=20).prop_map(|(user_id, product_id, amount)| Op::Remove { user_id, product_id, amount }),
    1 => (1i64..=3).prop_map(|user_id| Op::Delete { user_id }),
  ]
}

/// Reference model: user -> ordered (product, amount) lines.
fn model_apply(model: &mut BTreeMap<i64, Vec<(i64, u32)>>, op: &Op) {
  match *op {
    Op::Add {
      user_id,
      product_id,
      amount,
    } => {
      let lines = model.entry(user_id).or_default();
      match lines.iter_mut().find(|(p, _)| *p == product_id) {
        Some((_, a)) => *a += amount as u32,
        None => lines.push((product_id, amount as u32)),
      }
    }
    Op::Remove {
      user_id,
      product_id,
      amount,
    } => {
      if let Some(lines) = model.get_mut(&user_id) {
        if let Some(idx) = lines.iter().position(|(p, _)| *p == product_id) {
          if amount as u32 >= lines[idx].1 {
            lines.remove(idx);
          } else {
            lines[idx].1 -= amount as u32;
          }
        }
      }
    }
    Op::Delete { user_id } => {
      model.remove(&user_id);
    }
  }
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  /// Property: adds on an empty cart sum per distinct product
  #[test]
  fn adds_sum_per_distinct_product(
    adds in prop::collection::vec((1i64..=8, 1i64..=50), 1..40),
  ) {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
      let h = Harness::new();
      for (product_id, amount) in &adds {
        h.engine.apply(&add(1, *product_id, *amount)).await.unwrap();
      }

      let mut expected: BTreeMap<i64, u32> = BTreeMap::new();
      for (product_id, amount) in &adds {
        *expected.entry(*product_id).or_default() += *amount as u32;
      }

      let cart = h.cart(1).await.unwrap();
      let actual: BTreeMap<i64, u32> = cart.items().iter().map(|i| (i.product_id, i.amount)).collect();
      prop_assert_eq!(actual, expected);
      prop_assert_eq!(cart.len(), cart.product_ids().len());
      Ok::<(), TestCaseError>(())
    })?;
  }

  /// Property: line items stay paired and unique under any sequence of mutations
  #[test]
  fn mutations_preserve_cart_invariants(ops in prop::collection::vec(op_strategy(), 1..80)) {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
      let h = Harness::new();
      let mut model = BTreeMap::new();

      for op in &ops {
        h.engine.apply(&op.intent()).await.unwrap();
        model_apply(&mut model, op);
      }

      for cart in h.store.list_carts().await.unwrap() {
        let product_ids = cart.product_ids();
        let amounts = cart.amounts();
        prop_assert_eq!(product_ids.len(), amounts.len());
        let distinct: HashSet<i64> = product_ids.iter().copied().collect();
        prop_assert_eq!(distinct.len(), product_ids.len(), "duplicate product in {:?}", cart);
        prop_assert!(amounts.iter().all(|a| *a > 0), "non-positive amount in {:?}", cart);
      }

      for user_id in 1..=3 {
        prop_assert_eq!(h.lines(user_id).await, model.get(&user_id).cloned());
      }
      Ok::<(), TestCaseError>(())
    })?;
  }
}
