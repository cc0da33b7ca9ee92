use interview_booking::{
    configuration::Configuration,
    configuration_handler::ConfigurationHandler,
    file_storage::FileStorage,
    greeting::{GeminiClient, Greeter},
    http::create_app,
    key_selection::SessionKeySelection,
    local_storage::LocalStorage,
    storage::Storage,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("#####################");
    println!("# Interview Booking #");
    println!("#####################");

    let configuration = ConfigurationHandler::parse_arguments();

    let address = format!("0.0.0.0:{}", configuration.port());
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(?err, "Failed to bind {address}");
            return;
        }
    };
    info!("Accessible at {address}");

    if configuration.api_key().is_none() {
        warn!("No API key configured, greetings use the template until a key is selected");
    }
    let greeter = Greeter::new(
        GeminiClient::new(configuration.gemini_url(), configuration.model()),
        configuration.api_key(),
    )
    .with_key_selection(Arc::new(SessionKeySelection::default()));

    let app = if let Some(data_dir) = configuration.data_dir() {
        let backend = match FileStorage::new(&data_dir) {
            Ok(backend) => backend,
            Err(err) => {
                error!(?err, "Failed to open data directory {}", data_dir.display());
                return;
            }
        };
        info!("Persisting to {}", data_dir.display());
        create_app(Storage::new(backend), configuration, greeter)
    } else {
        info!("No data directory configured, slots and config are kept in memory");
        let backend = match configuration.memory_quota() {
            Some(quota) => LocalStorage::with_quota(quota),
            None => LocalStorage::default(),
        };
        create_app(Storage::new(backend), configuration, greeter)
    };

    if let Err(err) = axum::serve(listener, app).await {
        error!(?err, "Server stopped");
    }
}
