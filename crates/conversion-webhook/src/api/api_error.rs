use axum::{http::StatusCode, response::IntoResponse};

use crate::conversion::HandlerError;

#[derive(Debug)]
/// An error that aborts the exchange before a conversion review could be
/// produced.
pub(crate) enum ApiError {
    /// The request does not follow the protocol: the reply carries no body.
    ProtocolViolation,
    /// The reply carries the error text as a plain body.
    Transport { status: StatusCode, message: String },
}

impl From<HandlerError> for ApiError {
    fn from(error: HandlerError) -> Self {
        match error {
            HandlerError::ProtocolViolation { .. } => ApiError::ProtocolViolation,
            err => ApiError::Transport {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::ProtocolViolation => StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response(),
            ApiError::Transport { status, message } => (status, message).into_response(),
        }
    }
}
