use crate::common::constants::PRODUCT;
use snafu::Snafu;

/// For use with multiple fallible operations which may fail for different reasons, but are
/// defined withing the same scope and must return to the outer scope (calling scope) using
/// the try operator -- '?'.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))]
pub(crate) enum Error {
    /// Error for when cli args are parsed.
    #[snafu(display("Failed to parse cli args: {}", source))]
    CliArgsParse { source: clap::error::Error },

    /// Error for use when parsing invalid tracing-subscriber filter directive.
    #[snafu(display(
        "Failed to create tracing-subscriber filter with directive {}: {}",
        filter,
        source
    ))]
    TracingSubscriberFilter {
        source: tracing_subscriber::filter::ParseError,
        filter: String,
    },

    /// Error for when a kubectl command could not be spawned.
    #[snafu(display(
        "Failed to run kubectl command, command: {}, args: {:?}, command_error: {}",
        command,
        args,
        source
    ))]
    KubectlCommand {
        source: std::io::Error,
        command: String,
        args: Vec<String>,
    },

    /// Error for when a kubectl command ran but exited with a failure.
    #[snafu(display(
        "kubectl command failed, command: {}, args: {:?}, stderr: {}",
        command,
        args,
        stderr
    ))]
    KubectlOutput {
        command: String,
        args: Vec<String>,
        stderr: String,
    },

    /// Error for when a Helm command could not be spawned.
    #[snafu(display(
        "Failed to run Helm command, command: {}, args: {:?}, command_error: {}",
        command,
        args,
        source
    ))]
    HelmCommand {
        source: std::io::Error,
        command: String,
        args: Vec<String>,
    },

    /// Error for when a Helm command ran but exited with a failure.
    #[snafu(display(
        "Helm command failed, command: {}, args: {:?}, stderr: {}",
        command,
        args,
        stderr
    ))]
    HelmOutput {
        command: String,
        args: Vec<String>,
        stderr: String,
    },

    /// Error for when regular expression parsing or compilation fails.
    #[snafu(display("Failed to compile regex {}: {}", expression, source))]
    RegexCompile {
        source: regex::Error,
        expression: String,
    },

    /// Error for when Helm v3.x.y is not present in $PATH.
    #[snafu(display(
        "Helm version {} does not start with 'v3.x.y'",
        String::from_utf8_lossy(version)
    ))]
    HelmVersion { version: Vec<u8> },

    #[snafu(display(
        "Failed to parse YAML {}: {}",
        String::from_utf8_lossy(input_yaml),
        source
    ))]
    YamlParseFromSlice {
        source: serde_yaml::Error,
        input_yaml: Vec<u8>,
    },

    /// Error for when one or more identifiers match no Deployment in the namespace.
    #[snafu(display(
        "Could not find {} Deployments for identifiers {:?} in namespace {}",
        PRODUCT,
        ids,
        namespace
    ))]
    UnresolvedIdentifiers { ids: Vec<String>, namespace: String },

    /// Error for when resolved Deployments carry no Helm release-name annotation.
    #[snafu(display(
        "The following {} Deployments are not Helm-managed, upgrade requires Helm-managed Deployments: {:?}",
        PRODUCT,
        deployments
    ))]
    NotHelmManaged { deployments: Vec<String> },

    /// Error for when a Deployment's owning Helm release is not in the installed list.
    #[snafu(display("Helm release {} not found in namespace {}", name, namespace))]
    HelmReleaseNotFound { name: String, namespace: String },
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

/// Unwraps the output, logging and exiting with the operational-error code on failure.
pub(crate) fn must<T>(output: Result<T>) -> T {
    match output {
        Ok(value) => value,
        Err(error) => {
            tracing::error!(%error, "command failed");
            std::process::exit(2);
        }
    }
}
