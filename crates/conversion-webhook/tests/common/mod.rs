use axum::Router;
use conversion_webhook::{
    config::{Config, TlsConfig},
    ConversionWebhook,
};
use std::net::SocketAddr;

pub(crate) fn default_test_config() -> Config {
    Config {
        addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
        tls_config: TlsConfig {
            cert_file: "/certs/tls.crt".into(),
            key_file: "/certs/tls.key".into(),
            client_ca_file: Vec::new(),
        },
        log_level: "info".to_owned(),
        log_fmt: "json".to_owned(),
        log_no_color: false,
    }
}

pub(crate) fn app(config: Config) -> Router {
    ConversionWebhook::new_from_config(config).router()
}
