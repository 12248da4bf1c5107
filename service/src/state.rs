// basket_service/src/state.rs
use basket::{CartStore, IntentPublisher};
use std::sync::Arc;

/// Shared by every HTTP worker. Reads go straight to the store; writes only
/// ever leave as intents on the queue.
#[derive(Clone)]
pub struct AppState {
  pub carts: Arc<dyn CartStore>,
  pub intents: Arc<dyn IntentPublisher>,
}

impl AppState {
  pub fn new(carts: Arc<dyn CartStore>, intents: Arc<dyn IntentPublisher>) -> Self {
    Self { carts, intents }
  }
}
