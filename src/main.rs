use actix_web::middleware::Logger;
use actix_web::{web::Data, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use log::{error, info, warn};

use chat_relay::config::Config;
use chat_relay::model::build_provider;
use chat_relay::web::routes;
use chat_relay::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting chat relay");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    if config.provider.api_key.is_none() {
        // /health stays up; /chat will answer 500 until the key is set.
        warn!(
            "{} is not set; chat requests will fail",
            config.provider.kind.credential_var()
        );
    }
    info!("Provider: {}", config.provider.kind);

    let app_state = Data::new(AppState {
        persona: config.persona.clone(),
        provider: build_provider(&config.provider),
    });

    info!("Listening on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(routes::cors_headers())
            .wrap(Logger::default())
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
    .run()
    .await
    .context("server error")
}
