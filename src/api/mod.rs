//! HTTP endpoint modules.

pub mod admin;
pub mod auth;
pub mod client;
pub mod flash;
pub mod health;
pub mod pages;
pub mod views;

use actix_web::web;

pub use health::configure_health_routes;

/// Register every route of the application.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(pages::home)
        .configure(auth::configure_routes)
        .configure(admin::configure_routes)
        .configure(client::configure_routes)
        .configure(configure_health_routes);
}
