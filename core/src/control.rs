// basket/src/control.rs

//! Signals describing where the consumer is and what it decided for a message.

use std::fmt;
use std::time::Duration;

/// Consumption-loop state. Transitions:
/// `Idle → Receiving → Decoding → Applying → (Committed | Discarded | Requeued | DeadLettered) → Receiving`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
  Idle,
  Receiving,
  Decoding,
  Applying,
  Committed,
  Discarded,
  Requeued,
  DeadLettered,
}

impl fmt::Display for ConsumerState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ConsumerState::Idle => "idle",
      ConsumerState::Receiving => "receiving",
      ConsumerState::Decoding => "decoding",
      ConsumerState::Applying => "applying",
      ConsumerState::Committed => "committed",
      ConsumerState::Discarded => "discarded",
      ConsumerState::Requeued => "requeued",
      ConsumerState::DeadLettered => "dead_lettered",
    };
    f.write_str(name)
  }
}

/// What to tell the broker about one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
  /// The mutation committed (or was a no-op). Acknowledge.
  Ack,
  /// The message can never be applied. Terminate without redelivery.
  Discard { reason: String },
  /// Persisting failed and attempts remain. Redeliver after the delay.
  Requeue { delay: Duration },
  /// Persisting failed on the final attempt. Park it on the dead-letter subject.
  DeadLetter { reason: String },
}

/// Counters accumulated by one consumer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
  pub received: u64,
  pub committed: u64,
  pub discarded: u64,
  pub requeued: u64,
  pub dead_lettered: u64,
  pub receive_errors: u64,
  pub settle_errors: u64,
}
