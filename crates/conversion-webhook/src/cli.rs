use clap::builder::PossibleValue;
use clap::{crate_authors, crate_description, crate_name, crate_version, Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    let mut args = vec![
        Arg::new("log-level")
            .long("log-level")
            .value_name("LOG_LEVEL")
            .env("CONVERSION_WEBHOOK_LOG_LEVEL")
            .default_value("info")
            .value_parser([
                PossibleValue::new("trace"),
                PossibleValue::new("debug"),
                PossibleValue::new("info"),
                PossibleValue::new("warn"),
                PossibleValue::new("error"),
            ])
            .help("Log level"),
        Arg::new("log-fmt")
            .long("log-fmt")
            .value_name("LOG_FMT")
            .env("CONVERSION_WEBHOOK_LOG_FMT")
            .default_value("text")
            .value_parser([PossibleValue::new("text"), PossibleValue::new("json")])
            .help("Log output format"),
        Arg::new("log-no-color")
            .long("log-no-color")
            .env("NO_COLOR")
            .action(ArgAction::SetTrue)
            .help("Disable colored output for logs"),
        Arg::new("address")
            .long("addr")
            .value_name("BIND_ADDRESS")
            .default_value("0.0.0.0")
            .env("CONVERSION_WEBHOOK_BIND_ADDRESS")
            .help("Bind against ADDRESS"),
        Arg::new("port")
            .long("port")
            .value_name("PORT")
            .default_value("443")
            .env("CONVERSION_WEBHOOK_PORT")
            .help("Listen on PORT"),
        Arg::new("cert-file")
            .long("cert-file")
            .alias("tls-cert-file")
            .value_name("CERT_FILE")
            .env("CONVERSION_WEBHOOK_CERT_FILE")
            .required(true)
            .help("Path to an X.509 certificate file for HTTPS. Intermediate certificates, if any, can be concatenated after the server certificate"),
        Arg::new("key-file")
            .long("key-file")
            .alias("tls-private-key-file")
            .value_name("KEY_FILE")
            .env("CONVERSION_WEBHOOK_KEY_FILE")
            .required(true)
            .help("Path to the X.509 private key matching --cert-file"),
        Arg::new("client-ca-file")
            .long("client-ca-file")
            .value_name("CLIENT_CA_FILE")
            .env("CONVERSION_WEBHOOK_CLIENT_CA_FILE")
            .value_delimiter(',')
            .action(ArgAction::Append)
            .help("Path to CA certificates used to verify client certificates. When set, clients must present a valid certificate"),
    ];
    args.sort_by(|a, b| a.get_id().cmp(b.get_id()));

    Command::new(crate_name!())
        .author(crate_authors!())
        .version(crate_version!())
        .about(crate_description!())
        .args(args)
        .subcommand_negates_reqs(true)
        .subcommand(
            Command::new("docs")
                .about("Generates the markdown documentation of the command line interface")
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_name("FILE")
                        .required(true)
                        .help("path where the documentation is written"),
                ),
        )
}
