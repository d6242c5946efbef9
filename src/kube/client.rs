use crate::common::{
    constants::{VERSION_COMMAND, VERSION_NO_POD, VERSION_UNKNOWN},
    error::{
        Error::{KubectlCommand, KubectlOutput},
        Result,
    },
};
use std::process::Command;

/// Control-plane operations the upgrade engine consumes. Implemented by [`KubeClient`]
/// against a live cluster, and by scripted fakes in tests.
pub(crate) trait ClusterOps {
    /// Names of all resources of the given kind in the namespace, in listing order.
    fn resource_names(&self, kind: &str) -> Result<Vec<String>>;

    /// Raw `-o wide` listing for the given kind, for display only.
    fn resources_wide(&self, kind: &str) -> Result<String>;

    /// Runs a command inside the given Pod and returns its stdout.
    fn exec(&self, pod: &str, command: &[&str]) -> Result<String>;

    /// Triggers a rolling restart of the Deployment.
    fn restart(&self, deployment: &str) -> Result<()>;

    /// Blocks until the Deployment's rollout completes, bounded by the timeout.
    fn wait_rollout(&self, deployment: &str, timeout: &str) -> Result<()>;

    /// Reads a single annotation off the Deployment. Absent annotations read as "".
    fn annotation(&self, deployment: &str, key: &str) -> Result<String>;
}

/// kubectl facade bound to one namespace.
pub(crate) struct KubeClient {
    kubectl: String,
    namespace: String,
}

impl KubeClient {
    pub(crate) fn new(kubectl: String, namespace: String) -> Self {
        Self { kubectl, namespace }
    }

    fn kubectl(&self, args: Vec<String>) -> Result<String> {
        let output = Command::new(self.kubectl.as_str())
            .args(args.clone())
            .output()
            .map_err(|e| KubectlCommand {
                source: e,
                command: self.kubectl.clone(),
                args: args.clone(),
            })?;

        if !output.status.success() {
            return Err(KubectlOutput {
                command: self.kubectl.clone(),
                args,
                stderr: String::from_utf8_lossy(output.stderr.as_slice())
                    .trim()
                    .to_string(),
            });
        }

        Ok(String::from_utf8_lossy(output.stdout.as_slice()).to_string())
    }

    fn namespaced(&self, args: &[&str]) -> Vec<String> {
        let mut all: Vec<String> = vec!["-n".to_string(), self.namespace.clone()];
        all.extend(args.iter().map(|arg| arg.to_string()));
        all
    }
}

impl ClusterOps for KubeClient {
    fn resource_names(&self, kind: &str) -> Result<Vec<String>> {
        let output = self.kubectl(self.namespaced(&["get", kind, "-o", "name"]))?;

        // `-o name` prints `<kind>/<name>` per line.
        Ok(output
            .lines()
            .filter_map(|line| line.trim().split_once('/'))
            .map(|(_, name)| name.to_string())
            .collect())
    }

    fn resources_wide(&self, kind: &str) -> Result<String> {
        self.kubectl(self.namespaced(&["get", kind, "-o", "wide"]))
    }

    fn exec(&self, pod: &str, command: &[&str]) -> Result<String> {
        let pod_ref = format!("pod/{pod}");
        let mut args = self.namespaced(&["exec", pod_ref.as_str(), "--"]);
        args.extend(command.iter().map(|arg| arg.to_string()));
        self.kubectl(args)
    }

    fn restart(&self, deployment: &str) -> Result<()> {
        let deploy_ref = format!("deployment/{deployment}");
        self.kubectl(self.namespaced(&["rollout", "restart", deploy_ref.as_str()]))
            .map(|_| ())
    }

    fn wait_rollout(&self, deployment: &str, timeout: &str) -> Result<()> {
        let deploy_ref = format!("deployment/{deployment}");
        let timeout_arg = format!("--timeout={timeout}");
        self.kubectl(self.namespaced(&[
            "rollout",
            "status",
            deploy_ref.as_str(),
            timeout_arg.as_str(),
        ]))
        .map(|_| ())
    }

    fn annotation(&self, deployment: &str, key: &str) -> Result<String> {
        // Dots inside the annotation key must be escaped for jsonpath.
        let jsonpath = format!(
            "jsonpath={{.metadata.annotations.{}}}",
            key.replace('.', r"\.")
        );
        let output = self.kubectl(self.namespaced(&[
            "get",
            "deployment",
            deployment,
            "-o",
            jsonpath.as_str(),
        ]))?;
        Ok(output.trim().to_string())
    }
}

/// Locates the current Pod backing a Deployment (first pod whose name contains the
/// Deployment name) and queries its reported version. Lookup failures degrade to the
/// version sentinels rather than erroring, so callers can surface a partial picture.
pub(crate) fn observe_version(cluster: &dyn ClusterOps, deployment: &str) -> (Option<String>, String) {
    let pod = cluster
        .resource_names("pods")
        .unwrap_or_default()
        .into_iter()
        .find(|name| name.contains(deployment));

    let version = match pod.as_deref() {
        None => VERSION_NO_POD.to_string(),
        Some(pod) => match cluster.exec(pod, VERSION_COMMAND) {
            Ok(output) => output.trim().to_string(),
            Err(_) => VERSION_UNKNOWN.to_string(),
        },
    };

    (pod, version)
}


#[cfg(test)]
mod tests {
    use super::{fake::FakeCluster, observe_version};
    use crate::common::constants::{VERSION_NO_POD, VERSION_UNKNOWN};

    #[test]
    fn version_reads_from_matching_pod() {
        let cluster = FakeCluster::new(
            &["alpha-connector"],
            &["alpha-connector-7f9b-x2x", "other-5c4d-a1a"],
        )
        .script_versions(&[Some("1.2.3\n")]);

        let (pod, version) = observe_version(&cluster, "alpha-connector");
        assert_eq!(pod.as_deref(), Some("alpha-connector-7f9b-x2x"));
        assert_eq!(version, "1.2.3");
    }

    #[test]
    fn missing_pod_yields_no_pod_sentinel() {
        let cluster = FakeCluster::new(&["alpha-connector"], &[]);

        let (pod, version) = observe_version(&cluster, "alpha-connector");
        assert!(pod.is_none());
        assert_eq!(version, VERSION_NO_POD);
    }

    #[test]
    fn failed_version_query_yields_unknown_sentinel() {
        let cluster = FakeCluster::new(&["alpha-connector"], &["alpha-connector-7f9b-x2x"])
            .script_versions(&[None]);

        let (_, version) = observe_version(&cluster, "alpha-connector");
        assert_eq!(version, VERSION_UNKNOWN);
    }
}
