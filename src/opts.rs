use crate::common::constants::{
    DEFAULT_HELM_REPO, DEFAULT_KUBECTL, DEFAULT_NAMESPACE, DEFAULT_TIMEOUT,
};
use clap::{Parser, Subcommand};

pub(crate) mod validators;

/// Manage a fleet of connector Deployments: list them, report their versions, and
/// upgrade their Helm releases in confirmable batches.
#[derive(Debug, Parser)]
#[command(name = "connector-manager", version, about)]
pub(crate) struct CliArgs {
    /// Kubernetes namespace the connectors live in.
    #[arg(short, long, global = true, default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Auto-confirm actions.
    #[arg(short = 'y', long = "yes", global = true)]
    yes: bool,

    /// kubectl binary to use.
    #[arg(short, long, global = true, env = "KUBECTL", default_value = DEFAULT_KUBECTL)]
    kubectl: String,

    /// Helm chart repository name used for upgrades.
    #[arg(long, global = true, default_value = DEFAULT_HELM_REPO)]
    helm_repo: String,

    /// Image tag to set when upgrading, overriding the chart default.
    #[arg(long, global = true)]
    set_image: Option<String>,

    /// Helm/rollout timeout, e.g. 120s or 2m.
    #[arg(long, global = true, default_value = DEFAULT_TIMEOUT)]
    timeout: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List Pods and Deployments in the namespace, wide format.
    List,
    /// Show the observed connector version for every Deployment, plus installed Helm
    /// releases.
    Versions,
    /// Upgrade the Helm releases owning the identified Deployments and report
    /// before/after versions.
    Upgrade {
        /// Identifier substrings, each matching one Deployment name.
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Rolling-restart the identified Deployments and report before/after versions.
    Restart {
        /// Identifier substrings, each matching one Deployment name.
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

impl CliArgs {
    pub(crate) fn namespace(&self) -> String {
        self.namespace.clone()
    }

    pub(crate) fn auto_confirm(&self) -> bool {
        self.yes
    }

    pub(crate) fn kubectl(&self) -> String {
        self.kubectl.clone()
    }

    pub(crate) fn helm_repo(&self) -> String {
        self.helm_repo.clone()
    }

    pub(crate) fn set_image(&self) -> Option<String> {
        self.set_image.clone()
    }

    pub(crate) fn timeout(&self) -> String {
        self.timeout.clone()
    }

    pub(crate) fn command(&self) -> Option<&Command> {
        self.command.as_ref()
    }
}
