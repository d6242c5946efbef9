use crate::common::error::{
    Error::{HelmCommand, HelmOutput, YamlParseFromSlice},
    Result,
};
use serde::Deserialize;
use std::process::Command;

/// One row of `helm list -o yaml` output.
#[derive(Clone, Deserialize)]
pub(crate) struct HelmReleaseElement {
    name: String,
    chart: String,
}

impl HelmReleaseElement {
    pub(crate) fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The bare chart name. Helm reports `<chart>-<version>`, so the trailing
    /// `-<version>` segment is stripped at the last hyphen.
    pub(crate) fn chart_name(&self) -> &str {
        match self.chart.rsplit_once('-') {
            Some((name, _)) if !name.is_empty() => name,
            _ => self.chart.as_str(),
        }
    }

    #[cfg(test)]
    pub(crate) fn new(name: &str, chart: &str) -> Self {
        Self {
            name: name.to_string(),
            chart: chart.to_string(),
        }
    }
}

/// Release-manager operations the upgrade engine consumes. Implemented by [`HelmClient`]
/// against the helm binary, and by scripted fakes in tests.
pub(crate) trait ReleaseOps {
    /// Refreshes chart repository metadata for all configured repositories.
    fn repo_update(&self) -> Result<()>;

    /// Installed releases in the namespace.
    fn releases(&self) -> Result<Vec<HelmReleaseElement>>;

    /// Human-readable `helm list` output, for display only.
    fn releases_raw(&self) -> Result<String>;

    /// Upgrades a release from `<repo>/<chart>`, reusing previously-set values and
    /// blocking until the release's resources are ready or the timeout elapses.
    fn upgrade(
        &self,
        release: &str,
        chart_ref: &str,
        timeout: &str,
        set_image: Option<&str>,
    ) -> Result<String>;
}

/// helm facade bound to one namespace.
pub(crate) struct HelmClient {
    namespace: String,
}

impl HelmClient {
    pub(crate) fn new(namespace: String) -> Self {
        Self { namespace }
    }

    fn helm(&self, args: Vec<String>) -> Result<String> {
        let command: &str = "helm";
        let output = Command::new(command)
            .args(args.clone())
            .output()
            .map_err(|e| HelmCommand {
                source: e,
                command: command.to_string(),
                args: args.clone(),
            })?;

        if !output.status.success() {
            return Err(HelmOutput {
                command: command.to_string(),
                args,
                stderr: String::from_utf8_lossy(output.stderr.as_slice())
                    .trim()
                    .to_string(),
            });
        }

        Ok(String::from_utf8_lossy(output.stdout.as_slice()).to_string())
    }
}

impl ReleaseOps for HelmClient {
    fn repo_update(&self) -> Result<()> {
        self.helm(vec!["repo".to_string(), "update".to_string()])
            .map(|_| ())
    }

    fn releases(&self) -> Result<Vec<HelmReleaseElement>> {
        // The output flag has to be at the end for it to work.
        let output = self.helm(vec![
            "list".to_string(),
            "-n".to_string(),
            self.namespace.clone(),
            "-o".to_string(),
            "yaml".to_string(),
        ])?;

        let output = output.into_bytes();
        serde_yaml::from_slice(output.as_slice()).map_err(|e| YamlParseFromSlice {
            source: e,
            input_yaml: output,
        })
    }

    fn releases_raw(&self) -> Result<String> {
        self.helm(vec![
            "list".to_string(),
            "-n".to_string(),
            self.namespace.clone(),
        ])
    }

    fn upgrade(
        &self,
        release: &str,
        chart_ref: &str,
        timeout: &str,
        set_image: Option<&str>,
    ) -> Result<String> {
        let mut args: Vec<String> = vec![
            "upgrade".to_string(),
            release.to_string(),
            chart_ref.to_string(),
            "--namespace".to_string(),
            self.namespace.clone(),
            "--reuse-values".to_string(),
            "--wait".to_string(),
            "--timeout".to_string(),
            timeout.to_string(),
        ];
        if let Some(tag) = set_image {
            args.push("--set".to_string());
            args.push(format!("image.tag={tag}"));
        }
        self.helm(args)
    }
}
