// basket_service/src/web/routes.rs

use crate::errors::AppError;
use crate::web::handlers::cart_handlers;
use actix_web::{web, HttpResponse};

async fn index_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "message": "Welcome to the Cart Service" }))
}

// Liveness only; store and broker reachability are checked at startup.
async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Registers every route of the cart API, plus extractor settings that turn
/// malformed bodies and path segments into `400` responses.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()))
    .app_data(web::PathConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()))
    .route("/", web::get().to(index_handler))
    .route("/health", web::get().to(health_check_handler))
    .service(
      web::scope("/cart")
        .route("", web::get().to(cart_handlers::list_carts_handler))
        .route("/{user_id}", web::get().to(cart_handlers::get_cart_handler))
        .route("/{user_id}", web::delete().to(cart_handlers::delete_cart_handler))
        .route("/{user_id}/add_product", web::post().to(cart_handlers::add_product_handler))
        .route(
          "/{user_id}/remove_product",
          web::delete().to(cart_handlers::remove_product_handler),
        ),
    );
}
