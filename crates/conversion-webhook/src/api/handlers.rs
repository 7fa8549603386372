use axum::{
    body::Bytes,
    extract,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::api::{api_error::ApiError, state::ApiServerState};

/// Convert the object carried by a `ConversionReview`.
#[tracing::instrument(
    name = "conversion",
    fields(
        request_uid=tracing::field::Empty,
        host=crate::config::HOSTNAME.as_str(),
        desired_api_version=tracing::field::Empty,
        status=tracing::field::Empty,
    ),
    skip_all)]
pub(crate) async fn convert_handler(
    extract::State(state): extract::State<Arc<ApiServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    let reply = state.conversion_handler.handle(content_type, &body)?;

    Ok((
        [(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())],
        reply,
    ))
}

pub(crate) async fn readiness_handler() -> StatusCode {
    StatusCode::OK
}
