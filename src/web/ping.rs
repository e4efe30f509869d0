use actix_web::{get, HttpResponse};
use serde_json::json;

use tracing::info;

#[tracing::instrument()]
#[get("/")]
pub async fn index() -> actix_web::Result<actix_web::HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "message": "Welcome!",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

#[tracing::instrument()]
#[get("/ping")]
pub async fn ping() -> actix_web::Result<actix_web::HttpResponse> {
    info!("ping");

    Ok(HttpResponse::Ok().body("pong"))
}
