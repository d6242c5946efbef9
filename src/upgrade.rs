use crate::{
    common::error::Result,
    helm::client::ReleaseOps,
    kube::client::ClusterOps,
    upgrade::poll::Convergence,
};
use tracing::{info, warn};

pub(crate) mod poll;
pub(crate) mod resolve;

/// The unit of work for one identifier. Populated through the resolution stages and
/// discarded at the end of the invocation.
#[derive(Debug)]
pub(crate) struct UpgradeItem {
    pub(crate) id: String,
    pub(crate) deployment: String,
    pub(crate) release: String,
    pub(crate) chart: String,
    pub(crate) pod: Option<String>,
    pub(crate) version_before: String,
    pub(crate) version_after: String,
}

impl UpgradeItem {
    pub(crate) fn new(id: &str, deployment: &str) -> Self {
        Self {
            id: id.to_string(),
            deployment: deployment.to_string(),
            release: String::new(),
            chart: String::new(),
            pod: None,
            version_before: String::new(),
            version_after: String::new(),
        }
    }
}

/// Per-item before/after versions plus the ordered audit log of steps taken.
#[derive(Debug)]
pub(crate) struct UpgradeReport {
    pub(crate) items: Vec<UpgradeItem>,
    pub(crate) steps: Vec<String>,
}

/// An operator abort is a successful outcome with no steps taken, not an error.
#[derive(Debug)]
pub(crate) enum UpgradeOutcome {
    Aborted,
    Completed(UpgradeReport),
}

/// Runs a full upgrade batch: resolution, confirmation, one repository refresh, then
/// per-item `helm upgrade` + best-effort rollout wait in batch order, then convergence
/// polling. A resolution failure or a failed upgrade aborts the batch; items already
/// upgraded are left in their new state.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run(
    cluster: &dyn ClusterOps,
    helm: &dyn ReleaseOps,
    namespace: &str,
    ids: &[String],
    helm_repo: &str,
    set_image: Option<&str>,
    timeout: &str,
    gate: &mut dyn FnMut(&[UpgradeItem]) -> bool,
) -> Result<UpgradeOutcome> {
    let mut items = resolve::resolve_workloads(cluster, namespace, ids)?;
    resolve::resolve_releases(cluster, helm, namespace, items.as_mut_slice())?;
    resolve::observe_versions(cluster, items.as_mut_slice());

    if !gate(items.as_slice()) {
        return Ok(UpgradeOutcome::Aborted);
    }

    let mut steps: Vec<String> = Vec::new();

    // One refresh for the whole batch, before any release is touched.
    helm.repo_update()?;
    steps.push("helm repo update".to_string());

    for item in items.iter() {
        let chart_ref = format!("{helm_repo}/{}", item.chart);
        info!(id = %item.id, release = %item.release, chart = %chart_ref, "Upgrading Helm release");
        helm.upgrade(item.release.as_str(), chart_ref.as_str(), timeout, set_image)?;
        steps.push(format!("upgraded helm release {}", item.release));

        // Rollout wait is best-effort observability, it never fails the batch.
        if let Err(error) = cluster.wait_rollout(item.deployment.as_str(), timeout) {
            warn!(%error, deployment = %item.deployment, "Rollout wait did not complete");
        }
        steps.push(format!("waited for rollout {}", item.deployment));
    }

    converge(cluster, items.as_mut_slice(), timeout).await;

    Ok(UpgradeOutcome::Completed(UpgradeReport { items, steps }))
}

/// Fills each item's post-mutation version by polling, one item at a time.
pub(crate) async fn converge(cluster: &dyn ClusterOps, items: &mut [UpgradeItem], timeout: &str) {
    let timeout = poll::poll_timeout(timeout);
    for item in items.iter_mut() {
        item.version_after = match poll::await_version_change(
            cluster,
            item.deployment.as_str(),
            item.version_before.as_str(),
            timeout,
        )
        .await
        {
            Convergence::Converged(version) => version,
            Convergence::Inconclusive(version) => {
                warn!(
                    deployment = %item.deployment,
                    last_seen = %version,
                    "Version did not converge before the deadline"
                );
                version
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::{run, UpgradeItem, UpgradeOutcome};
    use crate::{
        common::error::Error,
        helm::client::fake::FakeHelm,
        kube::client::fake::FakeCluster,
    };

    const NS: &str = "twingate-connectors";
    const TIMEOUT: &str = "30s";

    fn two_managed_connectors() -> (FakeCluster, FakeHelm) {
        let cluster = FakeCluster::new(
            &["alpha-connector", "beta-connector"],
            &["alpha-connector-7f9b-x2x", "beta-connector-5c4d-a1a"],
        )
        .annotate("alpha-connector", "alpha")
        .annotate("beta-connector", "beta")
        // Two pre-upgrade observations, then one converging sample per item.
        .script_versions(&[
            Some("1.0.0"),
            Some("1.0.5"),
            Some("2.0.0"),
            Some("2.0.5"),
        ]);
        let helm = FakeHelm::new(&[
            ("alpha", "connector-1.0.0"),
            ("beta", "connector-1.0.5"),
        ]);
        (cluster, helm)
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn full_batch_upgrades_in_order_and_converges() {
        let (cluster, helm) = two_managed_connectors();
        let mut seen = 0usize;
        let mut gate = |items: &[UpgradeItem]| {
            seen = items.len();
            true
        };

        let outcome = run(
            &cluster,
            &helm,
            NS,
            ids(&["alpha", "beta"]).as_slice(),
            "twingate",
            None,
            TIMEOUT,
            &mut gate,
        )
        .await
        .unwrap();

        assert_eq!(seen, 2);
        let report = match outcome {
            UpgradeOutcome::Completed(report) => report,
            UpgradeOutcome::Aborted => panic!("batch was aborted"),
        };
        assert_eq!(
            report.steps,
            vec![
                "helm repo update",
                "upgraded helm release alpha",
                "waited for rollout alpha-connector",
                "upgraded helm release beta",
                "waited for rollout beta-connector",
            ]
        );
        assert_eq!(report.items[0].version_before, "1.0.0");
        assert_eq!(report.items[0].version_after, "2.0.0");
        assert_eq!(report.items[1].version_before, "1.0.5");
        assert_eq!(report.items[1].version_after, "2.0.5");
        assert_eq!(
            helm.calls.borrow().as_slice(),
            [
                "repo update",
                "upgrade alpha twingate/connector",
                "upgrade beta twingate/connector",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn non_helm_item_rejects_the_batch_before_any_mutation() {
        let (mut cluster, helm) = two_managed_connectors();
        cluster.annotations.remove("beta-connector");
        let mut gate = |_: &[UpgradeItem]| -> bool { panic!("gate must not be reached") };

        let error = run(
            &cluster,
            &helm,
            NS,
            ids(&["alpha", "beta"]).as_slice(),
            "twingate",
            None,
            TIMEOUT,
            &mut gate,
        )
        .await
        .unwrap_err();

        assert!(matches!(error, Error::NotHelmManaged { .. }));
        assert!(helm.calls.borrow().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn operator_abort_terminates_with_no_steps() {
        let (cluster, helm) = two_managed_connectors();
        let mut gate = |_: &[UpgradeItem]| false;

        let outcome = run(
            &cluster,
            &helm,
            NS,
            ids(&["alpha"]).as_slice(),
            "twingate",
            None,
            TIMEOUT,
            &mut gate,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, UpgradeOutcome::Aborted));
        assert!(helm.calls.borrow().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_upgrade_stops_the_batch_without_rollback() {
        let (cluster, mut helm) = two_managed_connectors();
        helm.fail_upgrade_of = Some("beta".to_string());
        let mut gate = |_: &[UpgradeItem]| true;

        let error = run(
            &cluster,
            &helm,
            NS,
            ids(&["alpha", "beta"]).as_slice(),
            "twingate",
            None,
            TIMEOUT,
            &mut gate,
        )
        .await
        .unwrap_err();

        assert!(matches!(error, Error::HelmOutput { .. }));
        // alpha's upgrade went through and is left as-is.
        assert_eq!(
            helm.calls.borrow().as_slice(),
            [
                "repo update",
                "upgrade alpha twingate/connector",
                "upgrade beta twingate/connector",
            ]
        );
        assert_eq!(cluster.calls.borrow().as_slice(), ["wait_rollout alpha-connector"]);
    }

    #[tokio::test(start_paused = true)]
    async fn rollout_wait_failure_does_not_abort_the_batch() {
        let (mut cluster, helm) = two_managed_connectors();
        cluster.rollout_ok = false;
        let mut gate = |_: &[UpgradeItem]| true;

        let outcome = run(
            &cluster,
            &helm,
            NS,
            ids(&["alpha", "beta"]).as_slice(),
            "twingate",
            None,
            TIMEOUT,
            &mut gate,
        )
        .await
        .unwrap();

        let report = match outcome {
            UpgradeOutcome::Completed(report) => report,
            UpgradeOutcome::Aborted => panic!("batch was aborted"),
        };
        assert_eq!(report.steps.len(), 5);
        assert!(report.steps.contains(&"waited for rollout beta-connector".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_repo_refresh_aborts_before_any_release_is_touched() {
        let (cluster, mut helm) = two_managed_connectors();
        helm.repo_update_ok = false;
        let mut gate = |_: &[UpgradeItem]| true;

        let error = run(
            &cluster,
            &helm,
            NS,
            ids(&["alpha"]).as_slice(),
            "twingate",
            None,
            TIMEOUT,
            &mut gate,
        )
        .await
        .unwrap_err();

        assert!(matches!(error, Error::HelmOutput { .. }));
        assert_eq!(helm.calls.borrow().as_slice(), ["repo update"]);
    }
}
