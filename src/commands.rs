use crate::{
    common::{constants::HELM_RELEASE_ANNOTATION, error::Result},
    helm::client::ReleaseOps,
    kube::client::{observe_version, ClusterOps},
    opts::{validators::validate_helmv3_in_path, CliArgs},
    upgrade::{self, resolve, UpgradeItem, UpgradeOutcome},
};
use std::io::{self, BufRead, Write};
use tracing::{info, warn};

/// Prints Pods then Deployments in the namespace, wide format.
pub(crate) fn list(opts: &CliArgs, cluster: &dyn ClusterOps) -> Result<()> {
    let namespace = opts.namespace();

    println!("Pods in namespace {namespace}:");
    print!("{}", cluster.resources_wide("pods")?);
    println!();
    println!("Deployments in namespace {namespace}:");
    print!("{}", cluster.resources_wide("deployment")?);

    Ok(())
}

/// Prints the observed connector version for every Deployment, then the installed Helm
/// releases. A helm listing failure is reported inline rather than failing the command.
pub(crate) fn versions(
    opts: &CliArgs,
    cluster: &dyn ClusterOps,
    helm: &dyn ReleaseOps,
) -> Result<()> {
    let namespace = opts.namespace();

    println!("Connector versions in namespace {namespace}:");
    let deployments = cluster.resource_names("deployment")?;
    if deployments.is_empty() {
        println!("No deployments found in namespace {namespace}");
    } else {
        for deployment in deployments.iter() {
            let (_, version) = observe_version(cluster, deployment.as_str());
            println!("{deployment:<40} {version}");
        }
    }

    println!();
    println!("Helm releases in namespace {namespace}:");
    match helm.releases_raw() {
        Ok(output) => print!("{output}"),
        Err(error) => println!("(helm list failed: {error})"),
    }

    Ok(())
}

/// Runs the upgrade orchestrator against the identified Deployments and prints the
/// resulting before/after summary and step log.
pub(crate) async fn upgrade(
    opts: &CliArgs,
    cluster: &dyn ClusterOps,
    helm: &dyn ReleaseOps,
    ids: &[String],
) -> Result<()> {
    validate_helmv3_in_path()?;

    println!(
        "Note: upgrade targets Helm-managed Deployments (annotation {HELM_RELEASE_ANNOTATION})."
    );

    let namespace = opts.namespace();
    let auto_yes = opts.auto_confirm();
    let mut gate = |items: &[UpgradeItem]| {
        print!("{}", render_upgrade_summary(namespace.as_str(), items));
        confirm(
            "Proceed with upgrading these Helm releases?",
            auto_yes,
            io::stdin().lock(),
        )
    };

    let outcome = upgrade::run(
        cluster,
        helm,
        namespace.as_str(),
        ids,
        opts.helm_repo().as_str(),
        opts.set_image().as_deref(),
        opts.timeout().as_str(),
        &mut gate,
    )
    .await?;

    match outcome {
        UpgradeOutcome::Aborted => println!("Aborted by user."),
        UpgradeOutcome::Completed(report) => {
            print_report("upgrade", report.items.as_slice(), report.steps.as_slice())
        }
    }

    Ok(())
}

/// Rolling-restarts the identified Deployments. No Helm involvement: resolution stops
/// at the workload stage, mutation is `kubectl rollout restart`, and convergence
/// polling reports the observed version change.
pub(crate) async fn restart(
    opts: &CliArgs,
    cluster: &dyn ClusterOps,
    ids: &[String],
) -> Result<()> {
    let namespace = opts.namespace();
    let mut items = resolve::resolve_workloads(cluster, namespace.as_str(), ids)?;
    resolve::observe_versions(cluster, items.as_mut_slice());

    println!("About to restart the following Deployments in namespace {namespace}:");
    for item in items.iter() {
        println!(
            "  {} (pod: {}, version: {})",
            item.deployment,
            item.pod.as_deref().unwrap_or("<none>"),
            item.version_before
        );
    }

    if !confirm(
        "Proceed with restarting these Deployments?",
        opts.auto_confirm(),
        io::stdin().lock(),
    ) {
        println!("Aborted by user.");
        return Ok(());
    }

    let timeout = opts.timeout();
    let mut steps: Vec<String> = Vec::new();
    for item in items.iter() {
        info!(deployment = %item.deployment, "Restarting Deployment");
        cluster.restart(item.deployment.as_str())?;
        steps.push(format!("restarted {}", item.deployment));

        if let Err(error) = cluster.wait_rollout(item.deployment.as_str(), timeout.as_str()) {
            warn!(%error, deployment = %item.deployment, "Rollout wait did not complete");
        }
        steps.push(format!("waited for rollout {}", item.deployment));
    }

    upgrade::converge(cluster, items.as_mut_slice(), timeout.as_str()).await;

    print_report("restart", items.as_slice(), steps.as_slice());

    Ok(())
}

/// Single synchronous yes/no decision point. With auto-confirm set it proceeds without
/// touching the input; otherwise one line is read and only an affirmative
/// case-insensitive "y"/"yes" proceeds. End-of-input aborts.
pub(crate) fn confirm<R: BufRead>(prompt: &str, auto_yes: bool, mut input: R) -> bool {
    if auto_yes {
        return true;
    }

    print!("{prompt} [y/N]: ");
    let _ = io::stdout().flush();

    let mut line = String::new();
    if input.read_line(&mut line).is_ok() {
        let answer = line.trim();
        return answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes");
    }
    false
}

fn render_upgrade_summary(namespace: &str, items: &[UpgradeItem]) -> String {
    let mut summary = format!(
        "About to upgrade the following Helm-managed connectors in namespace {namespace}:\n\n"
    );
    for item in items.iter() {
        summary.push_str(format!("  Release: {}\n", item.release).as_str());
        summary.push_str(format!("  Chart: {}\n", item.chart).as_str());
        summary.push_str(format!("  Deployment: {}\n", item.deployment).as_str());
        summary.push_str(
            format!("  Pod: {}\n", item.pod.as_deref().unwrap_or("<none>")).as_str(),
        );
        summary.push_str(format!("  Version: {}\n\n", item.version_before).as_str());
    }
    summary
}

fn print_report(operation: &str, items: &[UpgradeItem], steps: &[String]) {
    println!();
    println!("Summary for {operation} operation:");
    for item in items.iter() {
        println!("Connector: {}", item.deployment);
        println!("  old version: {}", item.version_before);
        println!("  new version: {}", item.version_after);
        println!();
    }
    println!("Steps taken:");
    for step in steps.iter() {
        println!(" - {step}");
    }
}

#[cfg(test)]
mod tests {
    use super::{confirm, render_upgrade_summary, restart};
    use crate::{kube::client::fake::FakeCluster, opts::CliArgs, upgrade::UpgradeItem};
    use clap::Parser;
    use std::io::{self, Cursor};

    /// A reader that fails the test if the confirmation gate touches it.
    struct Unreadable;

    impl io::Read for Unreadable {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            panic!("input must not be read");
        }
    }

    impl io::BufRead for Unreadable {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            panic!("input must not be read");
        }

        fn consume(&mut self, _: usize) {}
    }

    #[test]
    fn auto_confirm_proceeds_without_reading_input() {
        assert!(confirm("Proceed?", true, Unreadable));
    }

    #[test]
    fn affirmative_answers_proceed_in_any_case() {
        for answer in ["y\n", "Y\n", "yes\n", "YES\n", "Yes\n"] {
            assert!(confirm("Proceed?", false, Cursor::new(answer)), "{answer:?}");
        }
    }

    #[test]
    fn anything_else_aborts() {
        for answer in ["n\n", "no\n", "\n", "", "yep\n", " y es\n"] {
            assert!(!confirm("Proceed?", false, Cursor::new(answer)), "{answer:?}");
        }
    }

    #[test]
    fn summary_names_release_chart_deployment_pod_and_version() {
        let mut item = UpgradeItem::new("alpha", "alpha-connector");
        item.release = "alpha".to_string();
        item.chart = "connector".to_string();
        item.version_before = "1.0.0".to_string();

        let summary = render_upgrade_summary("twingate-connectors", &[item]);
        assert!(summary.contains("Release: alpha"));
        assert!(summary.contains("Chart: connector"));
        assert!(summary.contains("Deployment: alpha-connector"));
        assert!(summary.contains("Pod: <none>"));
        assert!(summary.contains("Version: 1.0.0"));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_mutates_and_waits_in_identifier_order() {
        let opts = CliArgs::parse_from(["connector-manager", "-y", "restart", "alpha", "beta"]);
        let cluster = FakeCluster::new(
            &["alpha-connector", "beta-connector"],
            &["alpha-connector-7f9b-x2x", "beta-connector-5c4d-a1a"],
        )
        .script_versions(&[Some("1.0.0"), Some("1.0.0"), Some("1.1.0"), Some("1.1.0")]);
        let ids = vec!["alpha".to_string(), "beta".to_string()];

        restart(&opts, &cluster, ids.as_slice()).await.unwrap();

        assert_eq!(
            cluster.calls.borrow().as_slice(),
            [
                "restart alpha-connector",
                "wait_rollout alpha-connector",
                "restart beta-connector",
                "wait_rollout beta-connector",
            ]
        );
    }
}
