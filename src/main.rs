use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;

use okrserver::api_router::configure_api_routes;
use okrserver::config::AppConfig;
use okrserver::mailer;
use okrserver::shared::state::AppState;
use okrserver::shared::utils::create_conn;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::from_env().expect("Failed to load config from env");

    let pool = match create_conn(&config.database_url(), config.database.max_connections) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to create database pool: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("Database pool creation failed: {}", e),
            ));
        }
    };

    let mail_queue = mailer::start_worker(config.smtp.clone());

    let app_state = Arc::new(AppState {
        config: config.clone(),
        conn: pool,
        mail_queue,
    });

    let app = configure_api_routes(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}
