use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CONVERSION_REVIEW_KIND: &str = "ConversionReview";
pub const CONVERSION_REVIEW_API_VERSION: &str = "apiextensions.k8s.io/v1";

/// The envelope exchanged between the API server and the webhook.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ConversionRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ConversionResponse>,
}

/// Conversion request, as sent by the API server.
///
/// Both the single `object` shape and the `objects` list of the
/// `apiextensions.k8s.io` envelopes are accepted. A default value serializes
/// to `{}`, which is what gets echoed back inside of a response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireConversionRequest")]
pub struct ConversionRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,

    #[serde(rename = "desiredAPIVersion", skip_serializing_if = "String::is_empty")]
    pub desired_api_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<Value>>,
}

/// Decoding shape of [`ConversionRequest`]. Old clients name the desired
/// version `apiVersion`; it is used only when `desiredAPIVersion` is empty.
#[derive(Deserialize)]
struct WireConversionRequest {
    #[serde(default)]
    uid: String,

    #[serde(default, rename = "desiredAPIVersion", alias = "desiredApiVersion")]
    desired_api_version: String,

    #[serde(default, rename = "apiVersion")]
    legacy_api_version: Option<String>,

    #[serde(default)]
    object: Option<Value>,

    #[serde(default)]
    objects: Option<Vec<Value>>,
}

impl From<WireConversionRequest> for ConversionRequest {
    fn from(wire: WireConversionRequest) -> Self {
        let desired_api_version = if wire.desired_api_version.is_empty() {
            wire.legacy_api_version.unwrap_or_default()
        } else {
            wire.desired_api_version
        };

        ConversionRequest {
            uid: wire.uid,
            desired_api_version,
            object: wire.object,
            objects: wire.objects,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionStatus {
    Success,
    Failure,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub uid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_object: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_objects: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConversionStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConversionResponse {
    pub fn converted(uid: String, object: Value) -> Self {
        ConversionResponse {
            uid,
            converted_object: Some(object),
            status: Some(ConversionStatus::Success),
            ..Default::default()
        }
    }

    pub fn converted_list(uid: String, objects: Vec<Value>) -> Self {
        ConversionResponse {
            uid,
            converted_objects: Some(objects),
            status: Some(ConversionStatus::Success),
            ..Default::default()
        }
    }

    pub fn failure(uid: String, message: String) -> Self {
        ConversionResponse {
            uid,
            status: Some(ConversionStatus::Failure),
            message: Some(message),
            ..Default::default()
        }
    }
}

impl ConversionReview {
    /// Builds the reply to `self`, keeping the envelope type information of
    /// the request and replacing the request with an empty placeholder.
    pub fn reply(self, response: ConversionResponse) -> ConversionReview {
        ConversionReview {
            api_version: self
                .api_version
                .or_else(|| Some(CONVERSION_REVIEW_API_VERSION.to_owned())),
            kind: self
                .kind
                .or_else(|| Some(CONVERSION_REVIEW_KIND.to_owned())),
            request: Some(ConversionRequest::default()),
            response: Some(response),
        }
    }
}
