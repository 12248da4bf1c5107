// basket_service/src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use basket::CartError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  /// The queue could not be reached or refused the publish.
  #[error("Broker Error: {0}")]
  Broker(String),

  #[error("Cart Error: {0}")]
  Cart(CartError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

// Client mistakes stay client mistakes; everything else keeps its cart context.
impl From<CartError> for AppError {
  fn from(err: CartError) -> Self {
    match err {
      CartError::Validation(m) | CartError::Decode(m) => AppError::Validation(m),
      CartError::Queue(m) => AppError::Broker(m),
      CartError::Store { source } => source.into(),
      other => AppError::Cart(other),
    }
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(err) => AppError::Internal(format!("{:#}", err)),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Broker(_) => StatusCode::SERVICE_UNAVAILABLE,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Cart(_) | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::debug!(application_error = %self, "Rejecting request");
    }
    let body = match self {
      AppError::Validation(m) | AppError::NotFound(m) => json!({"error": m}),
      AppError::Broker(m) => json!({"error": "Cart queue unavailable", "detail": m}),
      AppError::Config(m) => json!({"error": "Configuration issue", "detail": m}),
      AppError::Sqlx(_) => json!({"error": "Database operation failed"}),
      AppError::Cart(e) => json!({"error": "Cart operation failed", "kind": e.kind()}),
      AppError::Internal(m) => json!({"error": "An internal error occurred", "detail": m}),
    };
    HttpResponse::build(status).json(body)
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
