use std::sync::Mutex;

use actix_web::{web, App, HttpServer};
use billsplit::{api, config::ServerConfig, Ledger};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,billsplit=debug")),
        )
        .init();

    info!("Starting billsplit v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // The browser keeps the durable copy and re-imports it through /snapshot.
    let ledger = web::Data::new(Mutex::new(Ledger::new()));
    let allowed_origins = config.allowed_origins.clone();

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(ledger.clone())
            .wrap(api::cors(&allowed_origins))
            .configure(api::configure)
    });
    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }

    info!(addr = %config.http_addr, "Listening");
    server.bind(config.http_addr)?.run().await
}
