use anyhow::{anyhow, Result};
use std::fs;

use conversion_webhook::{cli, config::Config, tracing::setup_tracing, ConversionWebhook};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();

    if let Some(("docs", sub_matches)) = matches.subcommand() {
        let output = sub_matches
            .get_one::<String>("output")
            .ok_or_else(|| anyhow!("error parsing arguments: missing output file"))?;
        fs::write(output, clap_markdown::help_markdown_command(&cli::build_cli()))
            .map_err(|e| anyhow!("Cannot write documentation to {output}: {e}"))?;
        return Ok(());
    }

    let config = Config::from_args(&matches)?;

    setup_tracing(&config.log_level, &config.log_fmt, config.log_no_color)?;

    // Starting from rustls 0.22, each application must set its default crypto provider.
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Cannot install the default crypto provider"))?;

    let webhook = ConversionWebhook::new_from_config(config);
    webhook.run().await
}
