mod api;
mod certs;
pub mod cli;
pub mod config;
pub mod conversion;
pub mod target;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::{self, TraceLayer};

use crate::api::{
    handlers::{convert_handler, readiness_handler},
    state::ApiServerState,
};
use crate::certs::create_tls_config_and_watch_certificate_changes;
use crate::config::{Config, TlsConfig, SERVICE_NAME};
use crate::conversion::{ApiVersionConverter, ConversionHandler};

/// Path the API server posts `ConversionReview` documents to.
pub const CONVERT_PATH: &str = "/convert";
pub const READINESS_PATH: &str = "/readiness";
/// Largest `ConversionReview` accepted on [`CONVERT_PATH`]. List conversions
/// carry whole resource sets, well above the 2 MiB axum default.
pub const MAX_CONVERT_BODY_BYTES: usize = 64 * 1024 * 1024;

pub struct ConversionWebhook {
    router: Router,
    addr: SocketAddr,
    tls_config: TlsConfig,
}

impl ConversionWebhook {
    /// Build a webhook that rewrites the `apiVersion` of every object it
    /// receives.
    pub fn new_from_config(config: Config) -> Self {
        Self::with_handler(config, ConversionHandler::new(ApiVersionConverter))
    }

    /// Build a webhook around a custom conversion handler.
    pub fn with_handler(config: Config, conversion_handler: ConversionHandler) -> Self {
        let state = Arc::new(ApiServerState { conversion_handler });

        let router = Router::new()
            .route(
                CONVERT_PATH,
                post(convert_handler).layer(DefaultBodyLimit::max(MAX_CONVERT_BODY_BYTES)),
            )
            .route(READINESS_PATH, get(readiness_handler))
            .with_state(state)
            .layer(
                TraceLayer::new_for_http()
                    .on_request(trace::DefaultOnRequest::new().level(::tracing::Level::DEBUG))
                    .on_response(trace::DefaultOnResponse::new().level(::tracing::Level::DEBUG)),
            );

        Self {
            router,
            addr: config.addr,
            tls_config: config.tls_config,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn run(self) -> Result<()> {
        let rustls_config = create_tls_config_and_watch_certificate_changes(self.tls_config).await?;

        info!(
            service = SERVICE_NAME,
            address = self.addr.to_string().as_str(),
            "started HTTPS server"
        );
        axum_server::bind_rustls(self.addr, rustls_config)
            .serve(self.router.into_make_service())
            .await?;

        Ok(())
    }
}
