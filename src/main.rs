use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use lawnbook::config::AppConfig;
use lawnbook::db;
use lawnbook::handlers;
use lawnbook::services::messaging::twilio::TwilioSmsProvider;
use lawnbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    if config.employee_phone.is_empty() {
        tracing::warn!("EMPLOYEE_PHONE_NUMBER not set, booking requests cannot be delivered");
    }
    if config.twilio_auth_token.is_empty() {
        tracing::warn!("TWILIO_AUTH_TOKEN not set, webhook signatures will not be checked");
    }

    let conn = db::init_db(&config.database_url)?;

    let messaging = TwilioSmsProvider::new(
        config.twilio_account_sid.clone(),
        config.twilio_auth_token.clone(),
        config.twilio_phone_number.clone(),
        Duration::from_secs(config.sms_timeout_secs),
    )?;

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        messaging: Box::new(messaging),
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");
    tracing::info!("Twilio webhook path: /webhook/sms");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
