// basket_service/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use basket::{CartIntent, UserId};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::{CartView, LinePayload};
use crate::state::AppState;

#[instrument(name = "handler::list_carts", skip(app_state))]
pub async fn list_carts_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let carts = app_state.carts.list_carts().await?;
  let views: Vec<CartView> = carts.iter().map(CartView::from).collect();
  info!(count = views.len(), "Listed carts");
  Ok(HttpResponse::Ok().json(json!({ "carts": views })))
}

#[instrument(name = "handler::get_cart", skip(app_state), fields(user_id = %path))]
pub async fn get_cart_handler(
  app_state: web::Data<AppState>,
  path: web::Path<UserId>,
) -> Result<HttpResponse, AppError> {
  let user_id = path.into_inner();
  let cart = app_state
    .carts
    .find_cart(user_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No cart for user {}", user_id)))?;
  Ok(HttpResponse::Ok().json(json!({ "cart": CartView::from(&cart) })))
}

#[instrument(
  name = "handler::add_product",
  skip(app_state, path, payload),
  fields(user_id = %path, product_id = payload.id, amount = payload.amount)
)]
pub async fn add_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<UserId>,
  payload: web::Json<LinePayload>,
) -> Result<HttpResponse, AppError> {
  let intent = CartIntent::add(path.into_inner(), payload.id, payload.amount)?;
  enqueue(&app_state, intent, "Product add accepted.").await
}

#[instrument(
  name = "handler::remove_product",
  skip(app_state, path, payload),
  fields(user_id = %path, product_id = payload.id, amount = payload.amount)
)]
pub async fn remove_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<UserId>,
  payload: web::Json<LinePayload>,
) -> Result<HttpResponse, AppError> {
  let intent = CartIntent::remove(path.into_inner(), payload.id, payload.amount)?;
  enqueue(&app_state, intent, "Product removal accepted.").await
}

#[instrument(name = "handler::delete_cart", skip(app_state, path), fields(user_id = %path))]
pub async fn delete_cart_handler(
  app_state: web::Data<AppState>,
  path: web::Path<UserId>,
) -> Result<HttpResponse, AppError> {
  let intent = CartIntent::delete_cart(path.into_inner());
  enqueue(&app_state, intent, "Cart deletion accepted.").await
}

/// Publishes the intent and answers `202 Accepted`. The cart itself changes
/// only once the consumer has applied the intent.
async fn enqueue(app_state: &AppState, intent: CartIntent, message: &str) -> Result<HttpResponse, AppError> {
  app_state.intents.publish(&intent).await?;
  info!(%intent, "Intent queued");
  Ok(HttpResponse::Accepted().json(json!({
    "message": message,
    "intent": {
      "action": intent.action(),
      "user_id": intent.user_id(),
      "product_id": intent.product_id(),
      "amount": intent.amount(),
    }
  })))
}
