// basket_service/src/broker/mod.rs

//! NATS JetStream adapter for the queue ports.

pub mod nats;

pub use nats::{NatsDelivery, NatsQueue, NatsSource};
