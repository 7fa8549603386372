use url::Url;

use super::{
    errors::{Result, TargetError},
    ServiceAddress,
};

/// Turns an in-cluster service reference into a URL that can be dialed.
///
/// Service discovery is owned by the caller: the API server may go through a
/// service proxy, an endpoint lookup or plain cluster DNS.
pub trait ServiceResolver {
    fn resolve(&self, service: &ServiceAddress) -> Result<Url>;
}

/// Resolves services through the conventional cluster DNS name,
/// `https://<name>.<namespace>.svc:<port><path>`.
#[derive(Clone, Debug, Default)]
pub struct ClusterDnsResolver;

impl ServiceResolver for ClusterDnsResolver {
    fn resolve(&self, service: &ServiceAddress) -> Result<Url> {
        let base = format!(
            "https://{}.{}.svc:{}",
            service.name, service.namespace, service.port
        );
        let mut url = Url::parse(&base).map_err(|e| TargetError::Resolution {
            namespace: service.namespace.clone(),
            name: service.name.clone(),
            message: e.to_string(),
        })?;
        url.set_path(&service.path);

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(port: u16, path: &str) -> ServiceAddress {
        ServiceAddress {
            namespace: "webhooks".to_owned(),
            name: "crd-converter".to_owned(),
            path: path.to_owned(),
            port,
        }
    }

    #[test]
    fn default_https_port_is_omitted() {
        let url = ClusterDnsResolver
            .resolve(&service(443, "/convert"))
            .expect("resolution should work");

        assert_eq!(url.as_str(), "https://crd-converter.webhooks.svc/convert");
    }

    #[test]
    fn custom_port_is_kept() {
        let url = ClusterDnsResolver
            .resolve(&service(8443, "/"))
            .expect("resolution should work");

        assert_eq!(url.as_str(), "https://crd-converter.webhooks.svc:8443/");
        assert_eq!(url.port(), Some(8443));
    }

    #[test]
    fn invalid_service_name_is_reported() {
        let mut svc = service(443, "/");
        svc.name = "not a host".to_owned();

        let err = ClusterDnsResolver.resolve(&svc).unwrap_err();
        assert!(matches!(err, TargetError::Resolution { .. }));
    }
}
