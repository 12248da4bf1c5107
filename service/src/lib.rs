// basket_service/src/lib.rs

//! Deployment side of the cart service: configuration, the Postgres store,
//! the NATS JetStream queue, and the HTTP API. The `basket_api` and
//! `basket_consumer` binaries wire these to the `basket` core.

pub mod broker;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod state;
pub mod telemetry;
pub mod web;

pub use config::AppConfig;
pub use errors::AppError;
pub use state::AppState;
