// basket/src/consumer.rs

//! The queue consumption loop.
//!
//! Messages are processed one at a time. A delivery is acknowledged only
//! after its mutation committed, so a crash between receipt and commit leads
//! to redelivery instead of a silently lost mutation. Messages that can never
//! be applied (malformed, invalid) are terminated; messages whose mutation
//! failed to persist are redelivered with backoff and, on the final attempt,
//! handed to the dead-letter sink.

use crate::control::{ConsumerState, ConsumerStats, Disposition};
use crate::engine::CartEngine;
use crate::intent::CartIntent;
use crate::queue::{DeadLetterSink, Delivery, IntentSource};
use crate::retry::RetryPolicy;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, event, info, instrument, warn, Level};

pub struct IntentConsumer<S: IntentSource> {
  source: S,
  engine: CartEngine,
  dead_letters: Arc<dyn DeadLetterSink>,
  /// `max_attempts` is the number of deliveries before dead-lettering.
  redelivery: RetryPolicy,
  state: ConsumerState,
  stats: ConsumerStats,
}

impl<S: IntentSource> IntentConsumer<S> {
  pub fn new(source: S, engine: CartEngine, dead_letters: Arc<dyn DeadLetterSink>, redelivery: RetryPolicy) -> Self {
    Self {
      source,
      engine,
      dead_letters,
      redelivery,
      state: ConsumerState::Idle,
      stats: ConsumerStats::default(),
    }
  }

  pub fn state(&self) -> ConsumerState {
    self.state
  }

  pub fn stats(&self) -> ConsumerStats {
    self.stats
  }

  /// Consumes until `shutdown` resolves or the source closes. A message being
  /// processed when `shutdown` fires is finished and settled first.
  pub async fn run_until<F>(&mut self, shutdown: F) -> ConsumerStats
  where
    F: Future<Output = ()>,
  {
    tokio::pin!(shutdown);
    info!("Waiting for cart intents.");

    loop {
      self.transition(ConsumerState::Receiving);
      let next = tokio::select! {
        biased;
        _ = &mut shutdown => {
          info!("Shutdown requested, stopping consumer.");
          break;
        }
        next = self.source.next_delivery() => next,
      };

      match next {
        None => {
          info!("Intent source closed, stopping consumer.");
          break;
        }
        Some(Err(e)) => {
          self.stats.receive_errors += 1;
          error!(error = %e, "Failed to receive from intent source.");
        }
        Some(Ok(delivery)) => {
          self.handle(delivery).await;
        }
      }
    }

    self.transition(ConsumerState::Idle);
    info!(stats = ?self.stats, "Consumer stopped.");
    self.stats
  }

  /// Consumes until the source closes.
  pub async fn run(&mut self) -> ConsumerStats {
    self.run_until(std::future::pending()).await
  }

  /// Decides and settles one delivery.
  #[instrument(name = "IntentConsumer::handle", skip_all, fields(attempt = delivery.attempt()))]
  pub async fn handle(&mut self, delivery: S::Delivery) -> Disposition {
    self.stats.received += 1;
    let disposition = self.decide(&delivery).await;
    self.settle(&delivery, &disposition).await;
    disposition
  }

  async fn decide(&mut self, delivery: &S::Delivery) -> Disposition {
    self.transition(ConsumerState::Decoding);
    let intent = match CartIntent::decode(delivery.payload()) {
      Ok(intent) => intent,
      Err(e) => {
        warn!(error = %e, kind = e.kind(), "Dropping undecodable cart intent.");
        return Disposition::Discard { reason: e.to_string() };
      }
    };

    self.transition(ConsumerState::Applying);
    match self.engine.apply(&intent).await {
      Ok(outcome) => {
        event!(Level::DEBUG, %intent, ?outcome, "Intent applied.");
        Disposition::Ack
      }
      Err(e) if !e.is_retryable() => {
        warn!(%intent, error = %e, "Dropping cart intent that cannot be applied.");
        Disposition::Discard { reason: e.to_string() }
      }
      Err(e) if self.redelivery.has_attempts_left(delivery.attempt()) => {
        let delay = self.redelivery.next_delay(delivery.attempt());
        warn!(
          %intent,
          error = %e,
          delay_ms = delay.as_millis() as u64,
          "Persisting cart intent failed, requeueing."
        );
        Disposition::Requeue { delay }
      }
      Err(e) => {
        error!(%intent, error = %e, "Persisting cart intent failed on final attempt.");
        Disposition::DeadLetter { reason: e.to_string() }
      }
    }
  }

  async fn settle(&mut self, delivery: &S::Delivery, disposition: &Disposition) {
    let settled = match disposition {
      Disposition::Ack => {
        self.transition(ConsumerState::Committed);
        self.stats.committed += 1;
        delivery.ack().await
      }
      Disposition::Discard { .. } => {
        self.transition(ConsumerState::Discarded);
        self.stats.discarded += 1;
        delivery.term().await
      }
      Disposition::Requeue { delay } => {
        self.transition(ConsumerState::Requeued);
        self.stats.requeued += 1;
        delivery.nak(*delay).await
      }
      Disposition::DeadLetter { reason } => {
        match self
          .dead_letters
          .dead_letter(delivery.payload(), reason, delivery.attempt())
          .await
        {
          Ok(()) => {
            self.transition(ConsumerState::DeadLettered);
            self.stats.dead_lettered += 1;
            delivery.term().await
          }
          Err(e) => {
            // Keep the message on the queue rather than lose it.
            error!(error = %e, "Dead-lettering failed, requeueing instead.");
            self.transition(ConsumerState::Requeued);
            self.stats.requeued += 1;
            delivery.nak(self.redelivery.max_delay).await
          }
        }
      }
    };

    if let Err(e) = settled {
      self.stats.settle_errors += 1;
      error!(error = %e, state = %self.state, "Failed to settle delivery with the broker.");
    }
  }

  fn transition(&mut self, next: ConsumerState) {
    event!(Level::TRACE, from = %self.state, to = %next, "Consumer state transition.");
    self.state = next;
  }
}
