use thiserror::Error;

/// Failure of the conversion of a single object. These are reported to the
/// API server inside of the response envelope.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("request carries no object to convert")]
    MissingObject,

    #[error("object is not a JSON object")]
    NotAnObject,

    #[error("object 'kind' is missing")]
    MissingKind,

    #[error("desired API version is empty")]
    MissingDesiredApiVersion,

    #[error("conversion of object {index} failed: {source}")]
    Object {
        index: usize,
        #[source]
        source: Box<ConversionError>,
    },

    #[error("{0}")]
    Rejected(String),
}

/// Failure of the whole exchange. No response envelope is produced.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("contentType={content_type}, expect application/json")]
    ProtocolViolation { content_type: String },

    #[error("cannot decode conversion review: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("conversion review has no request")]
    MissingRequest,

    #[error("cannot encode conversion review: {0}")]
    Encode(#[source] serde_json::Error),
}
