// src/lib.rs

//! Basket: the core of a queue-driven shopping-cart service.
//!
//! Writes to a cart never happen on the request path. An API publishes an
//! intent (`add`, `remove`, `delete_cart`) to a queue, and a consumer applies
//! each intent to the cart store in its own transaction:
//!  - [`intent`] decodes and validates wire messages into [`CartIntent`]s.
//!  - [`engine`] applies an intent to a [`CartStore`] transactionally.
//!  - [`consumer`] runs the receive/decode/apply/settle loop with
//!    acknowledge-after-commit semantics, redelivery and dead-lettering.
//!  - [`retry`] is the bounded-retry helper used around connection setup.
//!
//! Store and queue are ports ([`CartStore`], [`IntentSource`],
//! [`IntentPublisher`], [`DeadLetterSink`]) with in-memory implementations
//! here; database and broker adapters live in the service crate.

pub mod cart;
pub mod consumer;
pub mod control;
pub mod engine;
pub mod error;
pub mod intent;
pub mod queue;
pub mod retry;
pub mod store;

// --- Re-exports for the Public API ---

pub use crate::cart::{Cart, LineItem, ProductId, Removal, UserId};
pub use crate::consumer::IntentConsumer;
pub use crate::control::{ConsumerState, ConsumerStats, Disposition};
pub use crate::engine::CartEngine;
pub use crate::error::{CartError, CartResult};
pub use crate::intent::{Action, CartIntent};
pub use crate::queue::{DeadLetterSink, Delivery, InMemoryQueue, IntentPublisher, IntentSource, Settlement};
pub use crate::retry::{retry_async, RetryPolicy};
pub use crate::store::{CartStore, CartUpdateFn, CartWrite, InMemoryCartStore, Mutation, MutationOutcome};

/// Well-known subject every cart intent is published to.
pub const CART_QUEUE: &str = "cart_queue";

/// Subject for intents whose mutation could not be persisted after all attempts.
pub const CART_DEAD_LETTER_QUEUE: &str = "cart_queue.dead";
