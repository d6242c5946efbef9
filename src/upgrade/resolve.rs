use crate::{
    common::{
        constants::HELM_RELEASE_ANNOTATION,
        error::{
            Error::{HelmReleaseNotFound, NotHelmManaged, UnresolvedIdentifiers},
            Result,
        },
    },
    helm::client::ReleaseOps,
    kube::client::{observe_version, ClusterOps},
    upgrade::UpgradeItem,
};

/// Maps identifier substrings to Deployment names. The Deployment listing is fetched
/// once and reused for the whole batch; the first listed name containing the identifier
/// wins. Every identifier with zero matches is collected into a single aggregated
/// error, so the operator can fix all inputs in one pass.
pub(crate) fn resolve_workloads(
    cluster: &dyn ClusterOps,
    namespace: &str,
    ids: &[String],
) -> Result<Vec<UpgradeItem>> {
    let deployments = cluster.resource_names("deployment")?;

    let mut items: Vec<UpgradeItem> = Vec::with_capacity(ids.len());
    let mut missing: Vec<String> = Vec::new();
    for id in ids {
        match deployments.iter().find(|name| name.contains(id.as_str())) {
            Some(deployment) => items.push(UpgradeItem::new(id, deployment)),
            None => missing.push(id.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(UnresolvedIdentifiers {
            ids: missing,
            namespace: namespace.to_string(),
        });
    }

    Ok(items)
}

/// Fills in each item's owning Helm release and bare chart name. Deployments without
/// the release-name annotation (or whose annotation cannot be read) are aggregated
/// into a single error; a release missing from the installed list is a consistency
/// problem and fails on its own.
pub(crate) fn resolve_releases(
    cluster: &dyn ClusterOps,
    helm: &dyn ReleaseOps,
    namespace: &str,
    items: &mut [UpgradeItem],
) -> Result<()> {
    let mut non_helm: Vec<String> = Vec::new();
    for item in items.iter_mut() {
        let release = cluster
            .annotation(item.deployment.as_str(), HELM_RELEASE_ANNOTATION)
            .unwrap_or_default();
        if release.is_empty() {
            non_helm.push(item.deployment.clone());
        } else {
            item.release = release;
        }
    }

    if !non_helm.is_empty() {
        return Err(NotHelmManaged {
            deployments: non_helm,
        });
    }

    let releases = helm.releases()?;
    for item in items.iter_mut() {
        let release = releases
            .iter()
            .find(|release| release.name() == item.release)
            .ok_or_else(|| HelmReleaseNotFound {
                name: item.release.clone(),
                namespace: namespace.to_string(),
            })?;
        item.chart = release.chart_name().to_string();
    }

    Ok(())
}

/// Fills in each item's current Pod and pre-upgrade version. Unobservable versions
/// degrade to the sentinels, never to an error.
pub(crate) fn observe_versions(cluster: &dyn ClusterOps, items: &mut [UpgradeItem]) {
    for item in items.iter_mut() {
        let (pod, version) = observe_version(cluster, item.deployment.as_str());
        item.pod = pod;
        item.version_before = version;
    }
}
