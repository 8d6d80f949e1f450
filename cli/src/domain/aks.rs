//! AKS private-cluster configuration: Kubernetes manifests and `az` / `openssl`
//! command plans for internal ingress, hybrid DNS and Key Vault certificates.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::domain::config::{AksConfig, ClusterRef, required};
use crate::domain::error::ConfigError;
use crate::domain::step::CommandStep;

/// Annotation that keeps the ingress load balancer on the VNet.
pub const INTERNAL_LB_ANNOTATION: &str = "service.beta.kubernetes.io/azure-load-balancer-internal";

// ── Manifests ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<S> {
    api_version: &'static str,
    kind: &'static str,
    metadata: Metadata,
    #[serde(flatten)]
    body: S,
}

#[derive(Debug, Serialize)]
struct Metadata {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct IngressBody {
    spec: IngressSpec,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngressSpec {
    ingress_class_name: String,
    controller_name_prefix: String,
    load_balancer_annotations: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
struct ConfigMapBody {
    data: BTreeMap<String, String>,
}

/// App-routing `NginxIngressController` with an internal load balancer.
///
/// # Errors
///
/// Returns an error if YAML serialization fails.
pub fn internal_ingress_manifest(ingress_class: &str) -> Result<String> {
    let manifest = Manifest {
        api_version: "approuting.kubernetes.azure.com/v1alpha1",
        kind: "NginxIngressController",
        metadata: Metadata {
            name: ingress_class.to_string(),
            namespace: None,
        },
        body: IngressBody {
            spec: IngressSpec {
                ingress_class_name: ingress_class.to_string(),
                controller_name_prefix: ingress_class.to_string(),
                load_balancer_annotations: BTreeMap::from([(INTERNAL_LB_ANNOTATION, "true")]),
            },
        },
    };
    Ok(serde_yaml::to_string(&manifest)?)
}

/// `coredns-custom` ConfigMap forwarding `domain` to on-premises resolvers.
///
/// # Errors
///
/// Returns an error if YAML serialization fails.
pub fn coredns_forward_manifest(domain: &str, servers: &[String]) -> Result<String> {
    let server_block = format!(
        "{domain}:53 {{\n    errors\n    cache 30\n    forward . {}\n}}\n",
        servers.join(" ")
    );
    let manifest = Manifest {
        api_version: "v1",
        kind: "ConfigMap",
        metadata: Metadata {
            name: "coredns-custom".to_string(),
            namespace: Some("kube-system"),
        },
        body: ConfigMapBody {
            data: BTreeMap::from([("onprem.server".to_string(), server_block)]),
        },
    };
    Ok(serde_yaml::to_string(&manifest)?)
}

// ── Cluster access ───────────────────────────────────────────────────────────

fn az_aks(cluster: &ClusterRef, words: &[&str]) -> CommandStep {
    CommandStep::new("az")
        .arg("aks")
        .args(words.iter().copied())
        .args([
            "--resource-group",
            cluster.resource_group.as_str(),
            "--name",
            cluster.name.as_str(),
        ])
}

/// Enable the app routing addon.
#[must_use]
pub fn approuting_enable(cluster: &ClusterRef) -> CommandStep {
    az_aks(cluster, &["approuting", "enable"])
}

/// Merge cluster credentials into the local kubeconfig.
#[must_use]
pub fn get_credentials(cluster: &ClusterRef) -> CommandStep {
    az_aks(cluster, &["get-credentials"]).arg("--overwrite-existing")
}

/// Apply a manifest piped on stdin.
#[must_use]
pub fn kubectl_apply_stdin() -> CommandStep {
    CommandStep::new("kubectl").args(["apply", "-f", "-"])
}

/// Apply a manifest file through the AKS run-command API (private clusters).
#[must_use]
pub fn command_invoke_apply(cluster: &ClusterRef, manifest: &Path) -> CommandStep {
    let file_name = manifest
        .file_name()
        .map_or_else(|| "manifest.yaml".to_string(), |n| n.to_string_lossy().into_owned());
    az_aks(cluster, &["command", "invoke"])
        .arg("--command")
        .arg(format!("kubectl apply -f {file_name}"))
        .arg("--file")
        .arg(manifest.display().to_string())
}

/// Run a kubectl step inside a private cluster through the run-command API.
#[must_use]
pub fn command_invoke(cluster: &ClusterRef, inner: &CommandStep) -> CommandStep {
    az_aks(cluster, &["command", "invoke"])
        .arg("--command")
        .arg(inner.to_string())
}

// ── DNS ──────────────────────────────────────────────────────────────────────

/// Validated settings for `aks dns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsSettings {
    pub zone: String,
    pub vnet_id: String,
    pub ingress_ip: Ipv4Addr,
    pub record: String,
    /// On-premises domain and resolvers, when hybrid forwarding is configured.
    pub onprem: Option<(String, Vec<String>)>,
}

impl DnsSettings {
    /// Extract and validate DNS settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for missing zone / VNet / IP, an unparsable IP,
    /// or an on-premises domain without resolvers (and vice versa).
    pub fn from_config(cfg: &AksConfig) -> Result<Self> {
        let zone = required(cfg.dns_zone.as_deref(), "AKS_DNS_ZONE")?;
        let vnet_id = required(cfg.vnet_id.as_deref(), "AKS_VNET_ID")?;
        let ip_text = required(cfg.ingress_ip.as_deref(), "AKS_INGRESS_IP")?;
        let ingress_ip = ip_text.parse::<Ipv4Addr>().map_err(|e| ConfigError::InvalidValue {
            var: "AKS_INGRESS_IP",
            value: ip_text.clone(),
            reason: e.to_string(),
        })?;

        let servers: Vec<String> = cfg
            .onprem_dns_servers
            .iter()
            .flatten()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for server in &servers {
            server.parse::<Ipv4Addr>().map_err(|e| ConfigError::InvalidValue {
                var: "AKS_ONPREM_DNS_SERVERS",
                value: server.clone(),
                reason: e.to_string(),
            })?;
        }
        let domain = cfg
            .onprem_domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        let onprem = match (domain, servers.is_empty()) {
            (Some(d), false) => Some((d.to_string(), servers)),
            (None, true) => None,
            (Some(_), true) => return Err(ConfigError::Missing { var: "AKS_ONPREM_DNS_SERVERS" }.into()),
            (None, false) => return Err(ConfigError::Missing { var: "AKS_ONPREM_DOMAIN" }.into()),
        };

        Ok(Self {
            zone,
            vnet_id,
            ingress_ip,
            record: cfg.dns_record.clone(),
            onprem,
        })
    }
}

/// Private zone, VNet link and ingress A record.
#[must_use]
pub fn dns_steps(cluster: &ClusterRef, dns: &DnsSettings) -> Vec<CommandStep> {
    let rg = cluster.resource_group.as_str();
    let link_name = format!("{}-link", dns.zone.replace('.', "-"));
    vec![
        CommandStep::new("az").args([
            "network",
            "private-dns",
            "zone",
            "create",
            "--resource-group",
            rg,
            "--name",
            dns.zone.as_str(),
        ]),
        CommandStep::new("az").args([
            "network",
            "private-dns",
            "link",
            "vnet",
            "create",
            "--resource-group",
            rg,
            "--zone-name",
            dns.zone.as_str(),
            "--name",
            link_name.as_str(),
            "--virtual-network",
            dns.vnet_id.as_str(),
            "--registration-enabled",
            "false",
        ]),
        CommandStep::new("az")
            .args([
                "network",
                "private-dns",
                "record-set",
                "a",
                "add-record",
                "--resource-group",
                rg,
                "--zone-name",
                dns.zone.as_str(),
                "--record-set-name",
                dns.record.as_str(),
                "--ipv4-address",
            ])
            .arg(dns.ingress_ip.to_string()),
    ]
}

/// Restart CoreDNS so it picks up `coredns-custom`.
#[must_use]
pub fn coredns_restart() -> CommandStep {
    CommandStep::new("kubectl").args([
        "-n",
        "kube-system",
        "rollout",
        "restart",
        "deployment/coredns",
    ])
}

// ── Certificates ─────────────────────────────────────────────────────────────

/// Validated settings for `aks cert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertSettings {
    pub keyvault: String,
    pub name: String,
    pub host: String,
    pub days: u32,
}

impl CertSettings {
    /// Extract and validate certificate settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the vault or host is missing, or the
    /// validity is zero days.
    pub fn from_config(cfg: &AksConfig) -> Result<Self> {
        if cfg.cert_days == 0 {
            return Err(ConfigError::InvalidValue {
                var: "AKS_CERT_DAYS",
                value: "0".to_string(),
                reason: "Certificate validity must be at least one day".to_string(),
            }
            .into());
        }
        Ok(Self {
            keyvault: required(cfg.keyvault_name.as_deref(), "AKS_KEYVAULT_NAME")?,
            name: cfg.cert_name.clone(),
            host: required(cfg.cert_host.as_deref(), "AKS_CERT_HOST")?,
            days: cfg.cert_days,
        })
    }
}

/// Generate a self-signed certificate and bundle it as PKCS#12 in `dir`.
///
/// Returns the steps and the path of the resulting `.pfx`.
#[must_use]
pub fn openssl_steps(cert: &CertSettings, dir: &Path) -> (Vec<CommandStep>, String) {
    let key = dir.join("tls.key").display().to_string();
    let crt = dir.join("tls.crt").display().to_string();
    let pfx = dir.join("tls.pfx").display().to_string();
    let steps = vec![
        CommandStep::new("openssl")
            .args(["req", "-x509", "-nodes", "-newkey", "rsa:2048", "-days"])
            .arg(cert.days.to_string())
            .args(["-keyout", key.as_str(), "-out", crt.as_str(), "-subj"])
            .arg(format!("/CN={}", cert.host))
            .arg("-addext")
            .arg(format!("subjectAltName=DNS:{}", cert.host)),
        CommandStep::new("openssl").args([
            "pkcs12",
            "-export",
            "-in",
            crt.as_str(),
            "-inkey",
            key.as_str(),
            "-out",
            pfx.as_str(),
            "-passout",
            "pass:",
        ]),
    ];
    (steps, pfx)
}

/// Import the PKCS#12 bundle into Key Vault.
#[must_use]
pub fn keyvault_import(cert: &CertSettings, pfx: &str) -> CommandStep {
    CommandStep::new("az").args([
        "keyvault",
        "certificate",
        "import",
        "--vault-name",
        cert.keyvault.as_str(),
        "--name",
        cert.name.as_str(),
        "--file",
        pfx,
    ])
}

/// Resource ID lookup for the vault.
#[must_use]
pub fn keyvault_id(cert: &CertSettings) -> CommandStep {
    CommandStep::new("az").args([
        "keyvault",
        "show",
        "--name",
        cert.keyvault.as_str(),
        "--query",
        "id",
        "--output",
        "tsv",
    ])
}

/// Attach the vault to the app routing addon.
#[must_use]
pub fn approuting_attach_keyvault(cluster: &ClusterRef, keyvault_id: &str) -> CommandStep {
    az_aks(cluster, &["approuting", "update"]).args(["--enable-kv", "--attach-kv", keyvault_id])
}
