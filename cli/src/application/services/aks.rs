//! Application service: AKS private-cluster configuration.
//!
//! Every step here is fatal: these are explicit operations with no optional
//! parts, so the first failure aborts the command.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, LocalFs, ProgressReporter};
use crate::application::services::steps::{run_plan, run_step, run_step_with_stdin};
use crate::domain::aks::{
    CertSettings, DnsSettings, approuting_attach_keyvault, approuting_enable, command_invoke,
    command_invoke_apply, coredns_forward_manifest, coredns_restart, dns_steps, get_credentials,
    internal_ingress_manifest, keyvault_id, keyvault_import, kubectl_apply_stdin, openssl_steps,
};
use crate::domain::config::ClusterRef;
use crate::domain::report::first_line;
use crate::domain::step::CommandStep;

/// How `kubectl` reaches the cluster.
pub struct ClusterAccess<'a> {
    pub cluster: &'a ClusterRef,
    /// Private API server: go through `az aks command invoke`.
    pub private: bool,
    /// Scratch directory for manifests and certificate files.
    pub scratch: &'a Path,
}

impl ClusterAccess<'_> {
    /// Apply a manifest, via the run-command API for private clusters or
    /// `kubectl apply -f -` otherwise.
    async fn apply(
        &self,
        runner: &impl CommandRunner,
        fs: &impl LocalFs,
        file_name: &str,
        manifest: &str,
    ) -> Result<()> {
        if self.private {
            let path = self.scratch.join(file_name);
            fs.write(&path, manifest.as_bytes())?;
            run_step(runner, &command_invoke_apply(self.cluster, &path)).await?;
        } else {
            run_step(runner, &get_credentials(self.cluster)).await?;
            run_step_with_stdin(runner, &kubectl_apply_stdin(), manifest.as_bytes()).await?;
        }
        Ok(())
    }

    async fn kubectl(&self, runner: &impl CommandRunner, step: &CommandStep) -> Result<()> {
        let step = if self.private {
            command_invoke(self.cluster, step)
        } else {
            step.clone()
        };
        run_step(runner, &step).await.map(|_| ())
    }
}

/// Enable app routing and deploy an internal-only NGINX ingress controller.
///
/// # Errors
///
/// Returns the first failing step.
pub async fn configure_ingress(
    runner: &impl CommandRunner,
    fs: &impl LocalFs,
    reporter: &impl ProgressReporter,
    access: &ClusterAccess<'_>,
    ingress_class: &str,
) -> Result<()> {
    reporter.step("enabling app routing addon...");
    run_step(runner, &approuting_enable(access.cluster))
        .await
        .context("enabling app routing")?;
    reporter.step(&format!("deploying internal ingress controller '{ingress_class}'..."));
    let manifest = internal_ingress_manifest(ingress_class)?;
    access
        .apply(runner, fs, "internal-ingress.yaml", &manifest)
        .await
        .context("applying ingress controller")?;
    reporter.success(&format!("internal ingress '{ingress_class}' configured"));
    Ok(())
}

/// Private DNS zone for the ingress, plus on-premises forwarding in CoreDNS.
///
/// # Errors
///
/// Returns the first failing step.
pub async fn configure_dns(
    runner: &impl CommandRunner,
    fs: &impl LocalFs,
    reporter: &impl ProgressReporter,
    access: &ClusterAccess<'_>,
    dns: &DnsSettings,
) -> Result<()> {
    reporter.step(&format!("creating private DNS zone {}...", dns.zone));
    run_plan(runner, &dns_steps(access.cluster, dns))
        .await
        .context("configuring private DNS")?;
    reporter.success(&format!("{}.{} -> {}", dns.record, dns.zone, dns.ingress_ip));

    if let Some((domain, servers)) = &dns.onprem {
        reporter.step(&format!("forwarding {domain} to {}...", servers.join(", ")));
        let manifest = coredns_forward_manifest(domain, servers)?;
        access
            .apply(runner, fs, "coredns-custom.yaml", &manifest)
            .await
            .context("applying CoreDNS forwarding")?;
        access
            .kubectl(runner, &coredns_restart())
            .await
            .context("restarting CoreDNS")?;
        reporter.success(&format!("{domain} resolves through on-premises DNS"));
    }
    Ok(())
}

/// Self-signed certificate into Key Vault, attached to app routing.
///
/// # Errors
///
/// Returns the first failing step, or an error when the vault ID lookup
/// prints nothing.
pub async fn configure_certificate(
    runner: &impl CommandRunner,
    fs: &impl LocalFs,
    reporter: &impl ProgressReporter,
    access: &ClusterAccess<'_>,
    cert: &CertSettings,
) -> Result<()> {
    reporter.step(&format!("generating certificate for {}...", cert.host));
    fs.create_dir_all(access.scratch)?;
    let (steps, pfx) = openssl_steps(cert, access.scratch);
    run_plan(runner, &steps).await.context("generating certificate")?;

    reporter.step(&format!("importing '{}' into {}...", cert.name, cert.keyvault));
    run_step(runner, &keyvault_import(cert, &pfx))
        .await
        .context("importing certificate")?;

    let output = run_step(runner, &keyvault_id(cert))
        .await
        .context("looking up Key Vault")?;
    let vault_id = first_line(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("Key Vault '{}' returned no resource ID", cert.keyvault))?;

    reporter.step("attaching Key Vault to app routing...");
    run_step(runner, &approuting_attach_keyvault(access.cluster, &vault_id))
        .await
        .context("attaching Key Vault")?;
    reporter.success(&format!("certificate '{}' available to ingress", cert.name));
    Ok(())
}
