mod config;
mod error;
mod handlers;
mod merkle;
mod models;
mod progress;
mod scheduler;
mod utils;

use actix_web::{web, App, HttpServer};
use tracing_subscriber::filter::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = config::Config::from_env();
    let port = config.port;

    tracing::info!("Starting merkle-machine on port {}", port);

    let data = web::Data::new(config);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/health", web::get().to(handlers::health))
            .route("/tree", web::post().to(handlers::generate_tree))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
