use std::time::Duration;

/// Name of the product.
pub(crate) const PRODUCT: &str = "connector";

/// Default namespace the connector Deployments live in.
pub(crate) const DEFAULT_NAMESPACE: &str = "twingate-connectors";

/// Default kubectl binary, overridable via the KUBECTL env variable.
pub(crate) const DEFAULT_KUBECTL: &str = "kubectl";

/// Default Helm chart repository used for upgrades.
pub(crate) const DEFAULT_HELM_REPO: &str = "twingate";

/// Default helm/rollout timeout.
pub(crate) const DEFAULT_TIMEOUT: &str = "120s";

/// Annotation Helm stamps onto resources it owns.
pub(crate) const HELM_RELEASE_ANNOTATION: &str = "meta.helm.sh/release-name";

/// Command run inside a connector Pod to read its version.
pub(crate) const VERSION_COMMAND: &[&str] = &["./connectord", "--version"];

/// Version reported when a Deployment has no running Pod.
pub(crate) const VERSION_NO_POD: &str = "<no-pod>";

/// Version reported when the version query inside the Pod failed.
pub(crate) const VERSION_UNKNOWN: &str = "<unknown>";

/// Fixed interval between convergence-poll samples.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Poll deadline used when the configured timeout is absent or unparseable.
pub(crate) const FALLBACK_POLL_TIMEOUT: Duration = Duration::from_secs(120);

/// This is the tracing-filter, used when the environment variable is absent.
pub(crate) const DEFAULT_TRACING_FILTER: &str = "info";
