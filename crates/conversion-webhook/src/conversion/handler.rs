use std::sync::Arc;

use serde_json::Value;

use super::{
    converter::Converter,
    errors::{ConversionError, HandlerError},
    observer::{ConversionObserver, TracingObserver},
    review::{ConversionRequest, ConversionResponse, ConversionReview},
};

/// Answers conversion reviews.
///
/// The handler keeps no per-request state, it can be cloned and shared
/// between any number of concurrent requests.
#[derive(Clone)]
pub struct ConversionHandler {
    converter: Arc<dyn Converter + Send + Sync>,
    observer: Arc<dyn ConversionObserver + Send + Sync>,
}

impl ConversionHandler {
    pub fn new<C: Converter + Send + Sync + 'static>(converter: C) -> Self {
        ConversionHandler {
            converter: Arc::new(converter),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer<O: ConversionObserver + Send + Sync + 'static>(
        mut self,
        observer: O,
    ) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Processes the raw body of a conversion request and returns the raw
    /// body of the reply.
    ///
    /// Errors mean no envelope can be produced. A failed conversion is not
    /// one of them: it is reported inside of the envelope.
    pub fn handle(&self, content_type: Option<&str>, body: &[u8]) -> Result<Vec<u8>, HandlerError> {
        let result = self.process(content_type, body);
        if let Err(error) = &result {
            self.observer.request_rejected(error);
        }
        result
    }

    fn process(&self, content_type: Option<&str>, body: &[u8]) -> Result<Vec<u8>, HandlerError> {
        ensure_json_content_type(content_type)?;

        let mut review: ConversionReview =
            serde_json::from_slice(body).map_err(HandlerError::Decode)?;
        let request = review.request.take().ok_or(HandlerError::MissingRequest)?;
        self.observer.request_received(&request);

        let response = self.convert(request);
        self.observer.response_ready(&response);

        serde_json::to_vec(&review.reply(response)).map_err(HandlerError::Encode)
    }

    /// Consumes the request, the objects are moved into the converter.
    pub fn convert(&self, request: ConversionRequest) -> ConversionResponse {
        let ConversionRequest {
            uid,
            desired_api_version,
            object,
            objects,
        } = request;

        let converted = match (object, objects) {
            (Some(object), _) => self
                .converter
                .convert(object, &desired_api_version)
                .map(Converted::Single),
            (None, Some(objects)) => self
                .convert_list(objects, &desired_api_version)
                .map(Converted::List),
            (None, None) => Err(ConversionError::MissingObject),
        };

        match converted {
            Ok(Converted::Single(object)) => ConversionResponse::converted(uid, object),
            Ok(Converted::List(objects)) => ConversionResponse::converted_list(uid, objects),
            Err(error) => {
                self.observer.conversion_failed(&uid, &error);
                ConversionResponse::failure(uid, error.to_string())
            }
        }
    }

    fn convert_list(
        &self,
        objects: Vec<Value>,
        desired_api_version: &str,
    ) -> Result<Vec<Value>, ConversionError> {
        objects
            .into_iter()
            .enumerate()
            .map(|(index, object)| {
                self.converter
                    .convert(object, desired_api_version)
                    .map_err(|source| ConversionError::Object {
                        index,
                        source: Box::new(source),
                    })
            })
            .collect()
    }
}

enum Converted {
    Single(Value),
    List(Vec<Value>),
}

fn ensure_json_content_type(content_type: Option<&str>) -> Result<(), HandlerError> {
    let is_json = content_type
        .and_then(|ct| ct.parse::<mime::Mime>().ok())
        .is_some_and(|ct| ct.essence_str() == mime::APPLICATION_JSON.essence_str());

    if is_json {
        Ok(())
    } else {
        Err(HandlerError::ProtocolViolation {
            content_type: content_type.unwrap_or_default().to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::{ApiVersionConverter, ConversionStatus};
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingObserver {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingObserver {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl ConversionObserver for RecordingObserver {
        fn request_received(&self, request: &ConversionRequest) {
            self.push(format!("received {}", request.uid));
        }

        fn response_ready(&self, response: &ConversionResponse) {
            self.push(format!("ready {}", response.uid));
        }

        fn conversion_failed(&self, uid: &str, _error: &ConversionError) {
            self.push(format!("failed {uid}"));
        }

        fn request_rejected(&self, _error: &HandlerError) {
            self.push("rejected".to_owned());
        }
    }

    fn handler() -> (ConversionHandler, RecordingObserver) {
        let observer = RecordingObserver::default();
        let handler = ConversionHandler::new(ApiVersionConverter).with_observer(observer.clone());
        (handler, observer)
    }

    fn decode(body: &[u8]) -> ConversionReview {
        serde_json::from_slice(body).expect("reply should be a conversion review")
    }

    #[test]
    fn converts_a_single_object() {
        let (handler, observer) = handler();
        let body = json!({
            "request": {
                "uid": "abc-1",
                "object": {"apiVersion": "v1", "kind": "Foo", "spec": {"x": 1}},
                "desiredAPIVersion": "v2"
            }
        });

        let reply = handler
            .handle(Some("application/json"), body.to_string().as_bytes())
            .unwrap();
        let review = decode(&reply);

        let response = review.response.unwrap();
        assert_eq!(response.uid, "abc-1");
        assert_eq!(
            response.converted_object,
            Some(json!({"apiVersion": "v2", "kind": "Foo", "spec": {"x": 1}}))
        );
        assert_eq!(response.status, Some(ConversionStatus::Success));
        assert_eq!(review.request, Some(ConversionRequest::default()));
        assert_eq!(observer.events(), vec!["received abc-1", "ready abc-1"]);
    }

    #[test]
    fn reply_never_echoes_the_request_object() {
        let (handler, _) = handler();
        let body = json!({
            "request": {
                "uid": "abc-2",
                "object": {"apiVersion": "v1", "kind": "Secret", "data": {"token": "c2VjcmV0"}},
                "desiredAPIVersion": "v1"
            }
        });

        let reply = handler
            .handle(Some("application/json"), body.to_string().as_bytes())
            .unwrap();
        let raw: Value = serde_json::from_slice(&reply).unwrap();

        assert_eq!(raw["request"], json!({}));
    }

    #[test]
    fn converts_an_object_list() {
        let (handler, _) = handler();
        let request = ConversionRequest {
            uid: "list".to_owned(),
            desired_api_version: "example.com/v2".to_owned(),
            object: None,
            objects: Some(vec![
                json!({"apiVersion": "example.com/v1", "kind": "Foo", "metadata": {"name": "a"}}),
                json!({"apiVersion": "example.com/v1", "kind": "Foo", "metadata": {"name": "b"}}),
            ]),
        };

        let response = handler.convert(request);

        assert_eq!(response.uid, "list");
        assert!(response.converted_object.is_none());
        let converted = response.converted_objects.unwrap();
        assert_eq!(converted.len(), 2);
        assert!(converted.iter().all(|o| o["apiVersion"] == "example.com/v2"));
        assert_eq!(converted[1]["metadata"]["name"], "b");
    }

    #[test]
    fn failure_inside_of_a_list_names_the_object() {
        let (handler, observer) = handler();
        let request = ConversionRequest {
            uid: "list".to_owned(),
            desired_api_version: "v2".to_owned(),
            object: None,
            objects: Some(vec![json!({"kind": "Foo"}), json!({"apiVersion": "v1"})]),
        };

        let response = handler.convert(request);

        assert_eq!(response.status, Some(ConversionStatus::Failure));
        assert!(response.converted_objects.is_none());
        assert_eq!(
            response.message.as_deref(),
            Some("conversion of object 1 failed: object 'kind' is missing")
        );
        assert_eq!(observer.events(), vec!["failed list"]);
    }

    #[test]
    fn conversion_failure_is_reported_in_the_envelope() {
        let (handler, observer) = handler();
        let body = json!({
            "request": {
                "uid": "no-kind",
                "object": {"apiVersion": "v1"},
                "desiredAPIVersion": "v2"
            }
        });

        let reply = handler
            .handle(Some("application/json"), body.to_string().as_bytes())
            .unwrap();
        let response = decode(&reply).response.unwrap();

        assert_eq!(response.uid, "no-kind");
        assert_eq!(response.status, Some(ConversionStatus::Failure));
        assert_eq!(response.message.as_deref(), Some("object 'kind' is missing"));
        assert!(response.converted_object.is_none());
        assert_eq!(
            observer.events(),
            vec!["received no-kind", "failed no-kind", "ready no-kind"]
        );
    }

    #[test]
    fn request_without_objects() {
        let (handler, _) = handler();
        let response = handler.convert(ConversionRequest {
            uid: "empty".to_owned(),
            desired_api_version: "v2".to_owned(),
            ..Default::default()
        });

        assert_eq!(response.status, Some(ConversionStatus::Failure));
        assert_eq!(
            response.message.as_deref(),
            Some("request carries no object to convert")
        );
    }

    #[rstest]
    #[case::text_plain(Some("text/plain"))]
    #[case::missing(None)]
    #[case::garbage(Some("not a mime type"))]
    #[case::json_patch(Some("application/json-patch+json"))]
    fn wrong_content_type_is_a_protocol_violation(#[case] content_type: Option<&str>) {
        let (handler, observer) = handler();
        let body = json!({"request": {"uid": "u", "object": {"kind": "Foo"}, "desiredAPIVersion": "v2"}});

        let err = handler
            .handle(content_type, body.to_string().as_bytes())
            .unwrap_err();

        assert!(matches!(err, HandlerError::ProtocolViolation { .. }));
        assert_eq!(observer.events(), vec!["rejected"]);
    }

    #[test]
    fn charset_parameter_is_accepted() {
        let (handler, _) = handler();
        let body = json!({"request": {"uid": "u", "object": {"kind": "Foo"}, "desiredAPIVersion": "v2"}});

        let reply = handler.handle(
            Some("application/json; charset=utf-8"),
            body.to_string().as_bytes(),
        );

        assert!(reply.is_ok());
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let (handler, observer) = handler();

        let err = handler
            .handle(Some("application/json"), b"{\"request\": ")
            .unwrap_err();

        assert!(matches!(err, HandlerError::Decode(_)));
        assert!(!err.to_string().is_empty());
        assert_eq!(observer.events(), vec!["rejected"]);
    }

    #[test]
    fn envelope_without_request() {
        let (handler, _) = handler();

        let err = handler
            .handle(Some("application/json"), b"{\"kind\": \"ConversionReview\"}")
            .unwrap_err();

        assert!(matches!(err, HandlerError::MissingRequest));
    }
}
