//! HTTP API for DeepSearch built on Rocket.

pub mod auth;
pub mod error;
pub mod routes;

pub use auth::AuthenticatedUser;
pub use error::{ApiError, ServerError};

use deepsearch_config::{AuthConfig, DeepSearchConfig, ServerConfig};
use deepsearch_core::DeepSearch;
use log::{info, warn};
use rocket::{Build, Rocket, catchers, routes};
use std::net::IpAddr;
use std::sync::Arc;

/// Shared state managed by Rocket.
#[derive(Clone)]
pub struct AppState {
    /// Chat service.
    pub service: Arc<DeepSearch>,
    /// Bearer token table.
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(service: DeepSearch, auth: AuthConfig) -> Self {
        Self {
            service: Arc::new(service),
            auth,
        }
    }
}

/// Assemble the Rocket instance with routes, catchers and managed state.
pub fn build_rocket(state: AppState, config: &ServerConfig) -> Result<Rocket<Build>, ServerError> {
    let address: IpAddr = config
        .address
        .parse()
        .map_err(|_| ServerError::InvalidAddress(config.address.clone()))?;
    let figment = rocket::Config::figment()
        .merge(("address", address))
        .merge(("port", config.port))
        .merge(("log_level", "off"));
    Ok(rocket::custom(figment)
        .manage(state)
        .mount(
            "/",
            routes![
                routes::health,
                routes::chat,
                routes::list_chats,
                routes::get_chat,
                routes::delete_chat,
            ],
        )
        .register("/", catchers![routes::json_catcher]))
}

/// Serve the API until shutdown.
pub async fn serve(service: DeepSearch, config: &DeepSearchConfig) -> Result<(), ServerError> {
    if config.auth.tokens.is_empty() {
        warn!("no auth tokens configured; every authenticated route will return 401");
    }
    let state = AppState::new(service, config.auth.clone());
    let rocket = build_rocket(state, &config.server)?;
    info!(
        "starting http server (address={}, port={})",
        config.server.address, config.server.port
    );
    rocket
        .launch()
        .await
        .map_err(|err| ServerError::Launch(err.to_string()))?;
    info!("http server stopped");
    Ok(())
}
