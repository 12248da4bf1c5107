// basket_service/src/models/mod.rs

//! Row and response shapes for carts.

pub mod cart;

pub use cart::{CartRow, CartView, LinePayload};
