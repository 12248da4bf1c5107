// basket/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartError {
  /// The message body is not structured data.
  #[error("Malformed intent message: {0}")]
  Decode(String),

  /// Well-formed, but a field is missing or carries an unacceptable value.
  #[error("Invalid intent: {0}")]
  Validation(String),

  #[error("Persisting cart for user {user_id} failed. Source: {source}")]
  Persistence {
    user_id: i64,
    #[source]
    source: AnyhowError,
  },

  /// Reading carts failed; no transaction was involved.
  #[error("Cart store read failed. Source: {source}")]
  Store {
    #[source]
    source: AnyhowError,
  },

  #[error("Queue error: {0}")]
  Queue(String),

  #[error("Internal basket error: {0}")]
  Internal(String),
}

impl CartError {
  pub fn persistence(user_id: i64, source: impl Into<AnyhowError>) -> Self {
    CartError::Persistence {
      user_id,
      source: source.into(),
    }
  }

  pub fn store(source: impl Into<AnyhowError>) -> Self {
    CartError::Store { source: source.into() }
  }

  /// Only store failures are worth redelivering; a bad message stays bad.
  pub fn is_retryable(&self) -> bool {
    matches!(self, CartError::Persistence { .. })
  }

  /// Short label used in structured logs and dead-letter headers.
  pub fn kind(&self) -> &'static str {
    match self {
      CartError::Decode(_) => "decode",
      CartError::Validation(_) => "validation",
      CartError::Persistence { .. } => "persistence",
      CartError::Store { .. } => "store",
      CartError::Queue(_) => "queue",
      CartError::Internal(_) => "internal",
    }
  }
}

impl From<serde_json::Error> for CartError {
  fn from(err: serde_json::Error) -> Self {
    // Syntax and EOF errors mean the body was never JSON; type errors are caught
    // later by field validation, so anything reaching here is a decode failure.
    CartError::Decode(err.to_string())
  }
}

pub type CartResult<T, E = CartError> = std::result::Result<T, E>;
