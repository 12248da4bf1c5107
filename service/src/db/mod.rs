// basket_service/src/db/mod.rs

//! Postgres adapter for the cart store port.

pub mod cart_store;

pub use cart_store::PgCartStore;
