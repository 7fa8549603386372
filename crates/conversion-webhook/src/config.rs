use anyhow::{anyhow, Result};
use clap::ArgMatches;
use lazy_static::lazy_static;
use std::net::SocketAddr;
use std::path::PathBuf;

pub static SERVICE_NAME: &str = "conversion-webhook";

lazy_static! {
    pub(crate) static ref HOSTNAME: String =
        std::env::var("HOSTNAME").unwrap_or_else(|_| String::from("unknown"));
}

pub struct Config {
    pub addr: SocketAddr,
    pub tls_config: TlsConfig,
    pub log_level: String,
    pub log_fmt: String,
    pub log_no_color: bool,
}

#[derive(Clone, Debug)]
pub struct TlsConfig {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
    pub client_ca_file: Vec<PathBuf>,
}

impl Config {
    pub fn from_args(matches: &ArgMatches) -> Result<Self> {
        let addr = api_bind_address(matches)?;
        let tls_config = tls_config(matches)?;

        let log_level = matches
            .get_one::<String>("log-level")
            .expect("This should not happen, there's a default value for log-level")
            .to_owned();
        let log_fmt = matches
            .get_one::<String>("log-fmt")
            .expect("This should not happen, there's a default value for log-fmt")
            .to_owned();
        let log_no_color = matches
            .get_one::<bool>("log-no-color")
            .expect("clap should have assigned a default value")
            .to_owned();

        Ok(Self {
            addr,
            tls_config,
            log_level,
            log_fmt,
            log_no_color,
        })
    }
}

fn api_bind_address(matches: &ArgMatches) -> Result<SocketAddr> {
    let address = matches
        .get_one::<String>("address")
        .ok_or_else(|| anyhow!("error parsing arguments: missing bind address"))?;
    let port = matches
        .get_one::<String>("port")
        .ok_or_else(|| anyhow!("error parsing arguments: missing port"))?;

    format!("{address}:{port}")
        .parse()
        .map_err(|e| anyhow!("error parsing arguments: {}", e))
}

fn tls_config(matches: &ArgMatches) -> Result<TlsConfig> {
    let cert_file = matches
        .get_one::<String>("cert-file")
        .filter(|f| !f.is_empty())
        .ok_or_else(|| anyhow!("error parsing arguments: --cert-file must be provided"))?;
    let key_file = matches
        .get_one::<String>("key-file")
        .filter(|f| !f.is_empty())
        .ok_or_else(|| anyhow!("error parsing arguments: --key-file must be provided"))?;
    let client_ca_file = matches
        .get_many::<String>("client-ca-file")
        .map(|files| files.filter(|f| !f.is_empty()).map(PathBuf::from).collect())
        .unwrap_or_default();

    Ok(TlsConfig {
        cert_file: PathBuf::from(cert_file),
        key_file: PathBuf::from(key_file),
        client_ca_file,
    })
}
