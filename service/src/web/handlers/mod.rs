// basket_service/src/web/handlers/mod.rs

pub mod cart_handlers;
