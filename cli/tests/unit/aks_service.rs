//! AKS ingress, DNS and certificate configuration against port doubles.

use std::net::Ipv4Addr;

use azp_cli::application::services::aks::{
    ClusterAccess, configure_certificate, configure_dns, configure_ingress,
};
use azp_cli::domain::aks::{CertSettings, DnsSettings};
use azp_cli::domain::config::ClusterRef;

use crate::helpers::{CapturingReporter, RecordingRunner, TrackingFs};

const VAULT_ID: &str =
    "/subscriptions/0000/resourceGroups/rg-build/providers/Microsoft.KeyVault/vaults/kv-build";

fn cluster() -> ClusterRef {
    ClusterRef {
        resource_group: "rg-build".to_string(),
        name: "aks-build".to_string(),
    }
}

fn dns(onprem: bool) -> DnsSettings {
    DnsSettings {
        zone: "build.internal".to_string(),
        vnet_id: "/subscriptions/0000/vnet-build".to_string(),
        ingress_ip: Ipv4Addr::new(10, 240, 0, 10),
        record: "*".to_string(),
        onprem: onprem.then(|| {
            (
                "corp.contoso.com".to_string(),
                vec!["10.0.0.4".to_string(), "10.0.0.5".to_string()],
            )
        }),
    }
}

fn cert() -> CertSettings {
    CertSettings {
        keyvault: "kv-build".to_string(),
        name: "ingress-tls".to_string(),
        host: "apps.build.internal".to_string(),
        days: 365,
    }
}

// ── Ingress ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_public_cluster_applies_manifest_on_stdin() {
    let scratch = tempfile::tempdir().unwrap();
    let cluster = cluster();
    let runner = RecordingRunner::new();
    let fs = TrackingFs::default();
    let access = ClusterAccess {
        cluster: &cluster,
        private: false,
        scratch: scratch.path(),
    };

    configure_ingress(&runner, &fs, &CapturingReporter::default(), &access, "nginx-internal")
        .await
        .unwrap();

    let calls = runner.calls();
    assert!(calls[0].starts_with("az aks approuting enable"));
    assert!(runner.called("az aks get-credentials"));
    let manifest = runner.stdin_for("kubectl apply -f -").unwrap();
    assert!(manifest.contains("NginxIngressController"));
    assert!(manifest.contains("nginx-internal"));
    assert!(!runner.called("command invoke"));
    assert!(fs.written("internal-ingress.yaml").is_none());
}

#[tokio::test]
async fn test_private_cluster_applies_through_command_invoke() {
    let scratch = tempfile::tempdir().unwrap();
    let cluster = cluster();
    let runner = RecordingRunner::new();
    let fs = TrackingFs::default();
    let access = ClusterAccess {
        cluster: &cluster,
        private: true,
        scratch: scratch.path(),
    };

    configure_ingress(&runner, &fs, &CapturingReporter::default(), &access, "nginx-internal")
        .await
        .unwrap();

    assert!(!runner.called("get-credentials"));
    assert!(runner.called("az aks command invoke"));
    assert!(runner.called("kubectl apply -f internal-ingress.yaml"));
    let written = fs.written("internal-ingress.yaml").unwrap();
    assert!(written.contains("nginx-internal"));
}

#[tokio::test]
async fn test_ingress_stops_when_addon_fails() {
    let scratch = tempfile::tempdir().unwrap();
    let cluster = cluster();
    let runner = RecordingRunner::new().fail_when("approuting enable");
    let access = ClusterAccess {
        cluster: &cluster,
        private: false,
        scratch: scratch.path(),
    };

    let result = configure_ingress(
        &runner,
        &TrackingFs::default(),
        &CapturingReporter::default(),
        &access,
        "nginx-internal",
    )
    .await;

    assert!(result.is_err());
    assert_eq!(runner.calls().len(), 1);
}

// ── DNS ───────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_dns_without_onprem_creates_zone_only() {
    let scratch = tempfile::tempdir().unwrap();
    let cluster = cluster();
    let runner = RecordingRunner::new();
    let access = ClusterAccess {
        cluster: &cluster,
        private: true,
        scratch: scratch.path(),
    };

    configure_dns(
        &runner,
        &TrackingFs::default(),
        &CapturingReporter::default(),
        &access,
        &dns(false),
    )
    .await
    .unwrap();

    assert_eq!(runner.calls().len(), 3);
    assert!(runner.called("--ipv4-address 10.240.0.10"));
    assert!(!runner.called("coredns"));
}

#[tokio::test]
async fn test_dns_with_onprem_forwards_and_restarts_coredns() {
    let scratch = tempfile::tempdir().unwrap();
    let cluster = cluster();
    let runner = RecordingRunner::new();
    let fs = TrackingFs::default();
    let access = ClusterAccess {
        cluster: &cluster,
        private: true,
        scratch: scratch.path(),
    };

    configure_dns(&runner, &fs, &CapturingReporter::default(), &access, &dns(true))
        .await
        .unwrap();

    let manifest = fs.written("coredns-custom.yaml").unwrap();
    assert!(manifest.contains("corp.contoso.com"));
    assert!(manifest.contains("10.0.0.4 10.0.0.5"));
    let restart = runner.position("rollout restart deployment/coredns").unwrap();
    let apply = runner.position("kubectl apply -f coredns-custom.yaml").unwrap();
    assert!(apply < restart);
    assert!(runner.calls()[restart].starts_with("az aks command invoke"));
}

// ── Certificates ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_certificate_attaches_vault_id_from_lookup() {
    let scratch = tempfile::tempdir().unwrap();
    let cluster = cluster();
    let runner = RecordingRunner::new().stdout_for(
        "az keyvault show --name kv-build --query id --output tsv",
        &format!("{VAULT_ID}\n"),
    );
    let access = ClusterAccess {
        cluster: &cluster,
        private: true,
        scratch: scratch.path(),
    };

    configure_certificate(
        &runner,
        &TrackingFs::default(),
        &CapturingReporter::default(),
        &access,
        &cert(),
    )
    .await
    .unwrap();

    let calls = runner.calls();
    assert!(calls[0].starts_with("openssl req -x509"));
    assert!(calls[0].contains("/CN=apps.build.internal"));
    assert!(calls[1].starts_with("openssl pkcs12 -export"));
    assert!(calls[2].starts_with("az keyvault certificate import --vault-name kv-build"));
    let attach = calls.last().unwrap();
    assert!(attach.starts_with("az aks approuting update"), "got: {attach}");
    assert!(attach.ends_with(&format!("--attach-kv {VAULT_ID}")), "got: {attach}");
}

#[tokio::test]
async fn test_certificate_fails_when_vault_lookup_is_empty() {
    let scratch = tempfile::tempdir().unwrap();
    let cluster = cluster();
    let runner = RecordingRunner::new();
    let access = ClusterAccess {
        cluster: &cluster,
        private: false,
        scratch: scratch.path(),
    };

    let err = configure_certificate(
        &runner,
        &TrackingFs::default(),
        &CapturingReporter::default(),
        &access,
        &cert(),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("kv-build"), "got: {err}");
    assert!(!runner.called("approuting update"));
}
