use crate::{
    common::{
        constants::DEFAULT_TRACING_FILTER,
        error::{
            must,
            Error::{CliArgsParse, TracingSubscriberFilter},
            Result,
        },
    },
    helm::client::HelmClient,
    kube::client::KubeClient,
    opts::{CliArgs, Command},
};
use clap::{CommandFactory, Parser};
use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod common;
mod helm;
mod kube;
mod opts;
mod upgrade;

#[tokio::main]
async fn main() {
    must(init_logging());

    let opts = must(parse_cli_args());

    let Some(command) = opts.command() else {
        let _ = <CliArgs as CommandFactory>::command().print_help();
        std::process::exit(1);
    };

    let cluster = KubeClient::new(opts.kubectl(), opts.namespace());
    let helm = HelmClient::new(opts.namespace());

    match command {
        Command::List => must(commands::list(&opts, &cluster)),
        Command::Versions => must(commands::versions(&opts, &cluster, &helm)),
        Command::Upgrade { ids } => {
            must(commands::upgrade(&opts, &cluster, &helm, ids.as_slice()).await)
        }
        Command::Restart { ids } => {
            must(commands::restart(&opts, &cluster, ids.as_slice()).await)
        }
    }
}

/// Initialize logging components -- tracing.
fn init_logging() -> Result<()> {
    let fmt_layer = fmt::layer().with_target(false);
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_TRACING_FILTER))
        .map_err(|e| TracingSubscriberFilter {
            source: e,
            filter: DEFAULT_TRACING_FILTER.to_string(),
        })?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();

    Ok(())
}

fn parse_cli_args() -> Result<CliArgs> {
    CliArgs::try_parse().map_err(|error| match error.kind() {
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
            let _ = error.print();
            std::process::exit(0);
        }
        _ => CliArgsParse { source: error },
    })
}
