//! Resolution of the place where a webhook lives.
//!
//! A webhook client configuration points either to an absolute URL or to an
//! in-cluster service. [`WebhookTarget`] exposes both shapes through plain
//! accessors, which only reflect what has been configured, and through
//! [`WebhookTarget::address`], which folds them into a [`WebhookAddress`]
//! that callers match on exhaustively.

use k8s_openapi::api::admissionregistration::v1 as admissionregistration;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1 as apiextensions;
use url::Url;

pub mod errors;
mod resolver;

pub use errors::TargetError;
use errors::Result;
pub use resolver::{ClusterDnsResolver, ServiceResolver};

/// Path used when a service reference does not configure one.
pub const DEFAULT_SERVICE_PATH: &str = "/";
/// Port used when a service reference does not configure one.
pub const DEFAULT_SERVICE_PORT: u16 = 443;

/// Where a webhook can be reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookAddress {
    Url(String),
    Service(ServiceAddress),
}

/// In-cluster service reference, with defaults already applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceAddress {
    pub namespace: String,
    pub name: String,
    pub path: String,
    pub port: u16,
}

/// Read-only view over a webhook client configuration.
pub trait WebhookTarget {
    /// The direct URL, set only when the webhook is addressed by URL.
    fn url(&self) -> Option<&str>;

    /// Trust anchors used to verify the webhook. Empty means the platform
    /// trust store.
    fn ca_bundle(&self) -> &[u8];

    fn service_name(&self) -> Option<&str>;

    fn service_namespace(&self) -> Option<&str>;

    /// Set only when a service reference configures an explicit path.
    fn service_path(&self) -> Option<&str>;

    /// Set only when a service reference configures an explicit port.
    fn service_port(&self) -> Option<i32>;

    /// Key used to share clients and certificates between webhooks with an
    /// identical configuration. This is the canonical JSON serialization of
    /// the whole configuration.
    fn cache_key(&self) -> Result<String>;

    fn address(&self) -> Result<WebhookAddress> {
        match (self.url(), self.service_name(), self.service_namespace()) {
            (Some(url), None, None) => Ok(WebhookAddress::Url(url.to_owned())),
            (None, Some(name), Some(namespace)) => {
                let port = match self.service_port() {
                    None => DEFAULT_SERVICE_PORT,
                    Some(port) => u16::try_from(port)
                        .ok()
                        .filter(|p| *p != 0)
                        .ok_or(TargetError::InvalidPort(port))?,
                };

                Ok(WebhookAddress::Service(ServiceAddress {
                    namespace: namespace.to_owned(),
                    name: name.to_owned(),
                    path: self
                        .service_path()
                        .unwrap_or(DEFAULT_SERVICE_PATH)
                        .to_owned(),
                    port,
                }))
            }
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(TargetError::AmbiguousAddress),
            _ => Err(TargetError::MissingAddress),
        }
    }

    /// The URL to dial. Service references are handed over to `resolver`.
    fn endpoint(&self, resolver: &dyn ServiceResolver) -> Result<Url> {
        match self.address()? {
            WebhookAddress::Url(raw) => {
                let url = Url::parse(&raw).map_err(|source| TargetError::InvalidUrl {
                    url: raw.clone(),
                    source,
                })?;
                if url.scheme() != "https" {
                    return Err(TargetError::InsecureScheme(raw));
                }
                Ok(url)
            }
            WebhookAddress::Service(service) => resolver.resolve(&service),
        }
    }
}

// The admission and the CRD conversion flavours of WebhookClientConfig share
// the same shape, only the Rust types differ.
macro_rules! impl_webhook_target {
    ($config:ty) => {
        impl WebhookTarget for $config {
            fn url(&self) -> Option<&str> {
                self.url.as_deref()
            }

            fn ca_bundle(&self) -> &[u8] {
                self.ca_bundle
                    .as_ref()
                    .map(|bundle| bundle.0.as_slice())
                    .unwrap_or_default()
            }

            fn service_name(&self) -> Option<&str> {
                self.service.as_ref().map(|svc| svc.name.as_str())
            }

            fn service_namespace(&self) -> Option<&str> {
                self.service.as_ref().map(|svc| svc.namespace.as_str())
            }

            fn service_path(&self) -> Option<&str> {
                self.service.as_ref().and_then(|svc| svc.path.as_deref())
            }

            fn service_port(&self) -> Option<i32> {
                self.service.as_ref().and_then(|svc| svc.port)
            }

            fn cache_key(&self) -> Result<String> {
                Ok(serde_json::to_string(self)?)
            }
        }
    };
}

impl_webhook_target!(admissionregistration::WebhookClientConfig);
impl_webhook_target!(apiextensions::WebhookClientConfig);
