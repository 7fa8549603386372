use std::{path::Path, sync::Arc};

use ::tracing::{info, warn};
use anyhow::{anyhow, Result};
use axum_server::tls_rustls::RustlsConfig;
use rustls::{server::WebPkiClientVerifier, RootCertStore, ServerConfig};
use rustls_pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer};

use crate::config::TlsConfig;

/// Everything needed to build the TLS server configuration.
struct TlsMaterial {
    cert_chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    client_verifier: Option<Arc<dyn rustls::server::danger::ClientCertVerifier>>,
}

impl TlsMaterial {
    async fn load(tls_config: &TlsConfig) -> Result<Self> {
        let (cert_chain, key) =
            load_server_cert_and_key(&tls_config.cert_file, &tls_config.key_file).await?;
        let client_verifier = if tls_config.client_ca_file.is_empty() {
            None
        } else {
            Some(load_client_ca_certs(&tls_config.client_ca_file).await?)
        };

        Ok(TlsMaterial {
            cert_chain,
            key,
            client_verifier,
        })
    }

    fn server_config(&self) -> Result<ServerConfig> {
        let builder = match &self.client_verifier {
            Some(verifier) => ServerConfig::builder().with_client_cert_verifier(verifier.clone()),
            None => ServerConfig::builder().with_no_client_auth(),
        };
        let mut server_config =
            builder.with_single_cert(self.cert_chain.clone(), self.key.clone_key())?;
        server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

        Ok(server_config)
    }
}

/// There's no watching of the certificate files on non-linux platforms
/// since we rely on inotify to watch for changes
#[cfg(not(target_os = "linux"))]
pub(crate) async fn create_tls_config_and_watch_certificate_changes(
    tls_config: TlsConfig,
) -> Result<RustlsConfig> {
    let material = TlsMaterial::load(&tls_config).await?;
    Ok(RustlsConfig::from_config(Arc::new(material.server_config()?)))
}

/// Return the RustlsConfig and watch for changes in the certificate files
/// using inotify.
/// The server certificate is swapped only once both the certificate and its
/// key have been rewritten. A change of the client CA files is applied right
/// away.
#[cfg(target_os = "linux")]
pub(crate) async fn create_tls_config_and_watch_certificate_changes(
    tls_config: TlsConfig,
) -> Result<RustlsConfig> {
    use ::tracing::error;
    use inotify::{Inotify, WatchMask};
    use tokio_stream::StreamExt;

    let mut material = TlsMaterial::load(&tls_config).await?;
    let rustls_config = RustlsConfig::from_config(Arc::new(material.server_config()?));
    let reloadable_config = rustls_config.clone();

    let inotify = Inotify::init().map_err(|e| anyhow!("Cannot initialize inotify: {e}"))?;
    let cert_watch = inotify
        .watches()
        .add(&tls_config.cert_file, WatchMask::CLOSE_WRITE)
        .map_err(|e| anyhow!("Cannot watch certificate file: {e}"))?;
    let key_watch = inotify
        .watches()
        .add(&tls_config.key_file, WatchMask::CLOSE_WRITE)
        .map_err(|e| anyhow!("Cannot watch key file: {e}"))?;
    let client_ca_watches = tls_config
        .client_ca_file
        .iter()
        .map(|path| {
            inotify
                .watches()
                .add(path, WatchMask::CLOSE_WRITE)
                .map_err(|e| anyhow!("Cannot watch client CA file: {e}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let stream = inotify
        .into_event_stream([0; 1024])
        .map_err(|e| anyhow!("Cannot create inotify event stream: {e}"))?;

    tokio::spawn(async move {
        tokio::pin!(stream);
        let mut cert_changed = false;
        let mut key_changed = false;

        while let Some(event) = stream.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    warn!("Cannot read inotify event: {e}");
                    continue;
                }
            };

            let mut reload = false;
            if event.wd == cert_watch {
                info!("TLS certificate file has been modified");
                cert_changed = true;
            }
            if event.wd == key_watch {
                info!("TLS key file has been modified");
                key_changed = true;
            }

            if client_ca_watches.contains(&event.wd) {
                info!("Reloading client CA certificates");
                match load_client_ca_certs(&tls_config.client_ca_file).await {
                    Ok(verifier) => {
                        material.client_verifier = Some(verifier);
                        reload = true;
                    }
                    Err(e) => {
                        error!("Failed to reload client CA certificates: {e}");
                        continue;
                    }
                }
            }

            if cert_changed && key_changed {
                info!("Reloading server TLS certificates");
                cert_changed = false;
                key_changed = false;

                match load_server_cert_and_key(&tls_config.cert_file, &tls_config.key_file).await
                {
                    Ok((cert_chain, key)) => {
                        material.cert_chain = cert_chain;
                        material.key = key;
                        reload = true;
                    }
                    Err(e) => {
                        error!("Failed to reload TLS certificates: {e}");
                        continue;
                    }
                }
            }

            if !reload {
                continue;
            }
            match material.server_config() {
                Ok(server_config) => reloadable_config.reload_from_config(Arc::new(server_config)),
                Err(e) => error!("Failed to build TLS configuration: {e}"),
            }
        }
    });

    Ok(rustls_config)
}

async fn load_server_cert_and_key(
    cert_file: &Path,
    key_file: &Path,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let cert_contents = tokio::fs::read(cert_file)
        .await
        .map_err(|e| anyhow!("Cannot read certificate file {}: {e}", cert_file.display()))?;
    let key_contents = tokio::fs::read(key_file)
        .await
        .map_err(|e| anyhow!("Cannot read key file {}: {e}", key_file.display()))?;

    let cert_chain = parse_cert_chain(&cert_contents)?;
    let key = PrivateKeyDer::from_pem_slice(&key_contents)
        .map_err(|e| anyhow!("Cannot parse private key {}: {e}", key_file.display()))?;

    Ok((cert_chain, key))
}

/// The first certificate is the server one, the ones following it are
/// intermediates sent along during the handshake.
fn parse_cert_chain(contents: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let certs: Vec<_> = CertificateDer::pem_slice_iter(contents)
        .filter_map(|it| {
            if let Err(ref e) = it {
                warn!("Cannot parse certificate: {e}");
            }
            it.ok()
        })
        .collect();

    if certs.is_empty() {
        return Err(anyhow!("No certificate found in certificate file"));
    }

    Ok(certs)
}

async fn load_client_ca_certs(
    client_cas: &[std::path::PathBuf],
) -> Result<Arc<dyn rustls::server::danger::ClientCertVerifier>> {
    let mut store = RootCertStore::empty();
    for client_ca_file in client_cas {
        let contents = tokio::fs::read(client_ca_file).await?;
        let certs: Vec<_> = CertificateDer::pem_slice_iter(&contents)
            .filter_map(|it| {
                if let Err(ref e) = it {
                    warn!("Cannot parse client CA certificate: {e}");
                }
                it.ok()
            })
            .collect();
        let (cert_added, cert_ignored) = store.add_parsable_certificates(certs);
        info!(
            client_ca_certs_added = cert_added,
            client_ca_certs_ignored = cert_ignored,
            "Loaded client CA certificates"
        );
    }

    WebPkiClientVerifier::builder(Arc::new(store))
        .build()
        .map_err(|e| anyhow!("Cannot build client verifier: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use rcgen::{generate_simple_self_signed, CertifiedKey};

    fn self_signed(hostname: &str) -> (String, String) {
        let CertifiedKey { cert, signing_key: key_pair } =
            generate_simple_self_signed(vec![hostname.to_owned()]).unwrap();

        (cert.pem(), key_pair.serialize_pem())
    }

    #[test]
    fn cert_chain_keeps_intermediates() {
        let (leaf, _) = self_signed("webhook.example.com");
        let (intermediate, _) = self_signed("ca.example.com");
        let bundle = format!("{leaf}{intermediate}");

        let chain = parse_cert_chain(bundle.as_bytes()).unwrap();

        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn cert_chain_cannot_be_empty() {
        assert!(parse_cert_chain(b"not a certificate").is_err());
    }

    #[tokio::test]
    async fn load_certificate_and_key() {
        let dir = tempfile::tempdir().unwrap();
        let cert_file = dir.path().join("tls.crt");
        let key_file = dir.path().join("tls.key");
        let (cert, key) = self_signed("webhook.example.com");
        std::fs::write(&cert_file, cert).unwrap();
        std::fs::write(&key_file, key).unwrap();

        let (chain, _key) = load_server_cert_and_key(&cert_file, &key_file)
            .await
            .unwrap();

        assert_eq!(chain.len(), 1);
    }

    #[tokio::test]
    async fn missing_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let cert_file = dir.path().join("tls.crt");
        let (cert, _) = self_signed("webhook.example.com");
        std::fs::write(&cert_file, cert).unwrap();

        let err = load_server_cert_and_key(&cert_file, &dir.path().join("missing.key"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Cannot read key file"));
    }
}
