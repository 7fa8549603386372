use tracing::{debug, error, warn, Span};

use super::{
    errors::{ConversionError, HandlerError},
    review::{ConversionRequest, ConversionResponse, ConversionStatus},
};

/// Hooks invoked by the [`ConversionHandler`](super::ConversionHandler)
/// while it processes a request. Implementations must not fail: whatever
/// happens inside of them cannot abort the request.
pub trait ConversionObserver {
    fn request_received(&self, _request: &ConversionRequest) {}

    fn response_ready(&self, _response: &ConversionResponse) {}

    fn conversion_failed(&self, _uid: &str, _error: &ConversionError) {}

    fn request_rejected(&self, _error: &HandlerError) {}
}

/// Observer that ignores every event.
#[derive(Clone, Debug, Default)]
pub struct NoopObserver;

impl ConversionObserver for NoopObserver {}

/// Emits `tracing` events and fills the fields of the current span.
#[derive(Clone, Debug, Default)]
pub struct TracingObserver;

impl ConversionObserver for TracingObserver {
    fn request_received(&self, request: &ConversionRequest) {
        Span::current().record("request_uid", request.uid.as_str());
        Span::current().record(
            "desired_api_version",
            request.desired_api_version.as_str(),
        );
        debug!(
            uid = request.uid.as_str(),
            desired_api_version = request.desired_api_version.as_str(),
            objects = request
                .objects
                .as_ref()
                .map_or(usize::from(request.object.is_some()), Vec::len),
            "handling request"
        );
    }

    fn response_ready(&self, response: &ConversionResponse) {
        let status = match response.status {
            Some(ConversionStatus::Success) => "Success",
            Some(ConversionStatus::Failure) => "Failure",
            None => "",
        };
        Span::current().record("status", status);
        debug!(response = ?response, "sending response");
    }

    fn conversion_failed(&self, uid: &str, error: &ConversionError) {
        warn!(uid, error = %error, "conversion failed");
    }

    fn request_rejected(&self, error: &HandlerError) {
        error!(error = %error, "cannot handle conversion request");
    }
}
