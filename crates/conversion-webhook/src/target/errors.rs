use thiserror::Error;

pub type Result<T> = std::result::Result<T, TargetError>;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("cannot encode webhook client config: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("webhook client config has neither a url nor a service reference")]
    MissingAddress,

    #[error("webhook client config sets both a url and a service reference")]
    AmbiguousAddress,

    #[error("invalid webhook url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("webhook url '{0}' must use the https scheme")]
    InsecureScheme(String),

    #[error("invalid port {0} for service reference")]
    InvalidPort(i32),

    #[error("cannot resolve service {namespace}/{name}: {message}")]
    Resolution {
        namespace: String,
        name: String,
        message: String,
    },
}
