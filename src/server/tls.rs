//! TLS certificate management for the conversion webhook
//!
//! The API server only calls conversion webhooks over HTTPS and checks
//! the serving certificate against the `caBundle` stored in each CRD.
//! On startup the webhook loads (or creates) a CA and serving
//! certificate, keeps them in a Secret, and injects the CA into every
//! CRD it converts.
//!
//! ## Certificate Chain
//! ```text
//! Self-signed CA (kanta-webhook-ca)
//!     └── Server cert (kanta-webhook.kanta-system.svc)
//! ```

use k8s_openapi::ByteString;
use kube::CustomResourceExt;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose, SanType,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::crd::v1;

/// Validity period for the CA certificate (10 years)
pub const CA_VALIDITY_DAYS: u32 = 3650;

/// Validity period for the serving certificate (1 year)
pub const SERVER_VALIDITY_DAYS: u32 = 365;

const CA_COMMON_NAME: &str = "kanta-webhook-ca";
const ORGANIZATION: &str = "kanta";

/// Secret keys for storing certificate data
pub const SECRET_CA_CERT_KEY: &str = "ca.crt";
pub const SECRET_SERVER_CERT_KEY: &str = "tls.crt";
pub const SECRET_SERVER_KEY_KEY: &str = "tls.key";

/// Default secret name for webhook TLS
pub const DEFAULT_TLS_SECRET_NAME: &str = "kanta-webhook-tls";

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("Failed to generate certificate: {0}")]
    Generation(#[from] rcgen::Error),

    #[error("Invalid DNS name '{name}': {reason}")]
    InvalidDnsName { name: String, reason: String },

    #[error("Failed to parse certificate: {0}")]
    Parse(String),

    #[error("Secret {secret} is missing key {key}")]
    MissingSecretKey { secret: String, key: &'static str },

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Invalid PEM data")]
    InvalidPem,
}

/// CA and serving certificate for the webhook
#[derive(Clone)]
pub struct CertificateBundle {
    /// PEM-encoded CA certificate
    pub ca_cert_pem: String,
    /// PEM-encoded server certificate
    pub server_cert_pem: String,
    /// PEM-encoded server private key
    pub server_key_pem: String,
}

impl CertificateBundle {
    /// The CA certificate as base64-encoded DER (for `caBundle` in a CRD)
    pub fn ca_bundle_base64(&self) -> Result<String, TlsError> {
        use base64::{engine::general_purpose::STANDARD, Engine};

        let pem = pem::parse(&self.ca_cert_pem)
            .map_err(|e| TlsError::Parse(format!("Failed to parse CA PEM: {}", e)))?;

        Ok(STANDARD.encode(pem.contents()))
    }

    /// Secret data for this bundle
    pub fn to_secret_data(&self) -> BTreeMap<String, ByteString> {
        [
            (SECRET_CA_CERT_KEY, &self.ca_cert_pem),
            (SECRET_SERVER_CERT_KEY, &self.server_cert_pem),
            (SECRET_SERVER_KEY_KEY, &self.server_key_pem),
        ]
        .into_iter()
        .map(|(key, pem)| (key.to_string(), ByteString(pem.as_bytes().to_vec())))
        .collect()
    }

    /// Rebuild a bundle from Secret data
    pub fn from_secret_data(
        secret: &str,
        data: &BTreeMap<String, ByteString>,
    ) -> Result<Self, TlsError> {
        let read = |key: &'static str| {
            data.get(key)
                .map(|b| String::from_utf8_lossy(&b.0).into_owned())
                .ok_or_else(|| TlsError::MissingSecretKey {
                    secret: secret.to_string(),
                    key,
                })
        };

        Ok(Self {
            ca_cert_pem: read(SECRET_CA_CERT_KEY)?,
            server_cert_pem: read(SECRET_SERVER_CERT_KEY)?,
            server_key_pem: read(SECRET_SERVER_KEY_KEY)?,
        })
    }
}

/// DNS names the API server may use to reach the webhook service
pub fn service_dns_names(service_name: &str, namespace: &str) -> Vec<String> {
    vec![
        service_name.to_string(),
        format!("{}.{}", service_name, namespace),
        format!("{}.{}.svc", service_name, namespace),
        format!("{}.{}.svc.cluster.local", service_name, namespace),
    ]
}

fn generate_ca() -> Result<(Certificate, KeyPair), TlsError> {
    let mut params = CertificateParams::default();
    params
        .distinguished_name
        .push(DnType::CommonName, CA_COMMON_NAME);
    params
        .distinguished_name
        .push(DnType::OrganizationName, ORGANIZATION);

    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];

    let now = time::OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = now + time::Duration::days(CA_VALIDITY_DAYS as i64);

    let key_pair = KeyPair::generate()?;
    let cert = params.self_signed(&key_pair)?;

    Ok((cert, key_pair))
}

fn generate_server_cert(
    ca_cert: &Certificate,
    ca_key: &KeyPair,
    service_name: &str,
    namespace: &str,
) -> Result<(String, String), TlsError> {
    let mut params = CertificateParams::default();
    params
        .distinguished_name
        .push(DnType::CommonName, service_name);
    params
        .distinguished_name
        .push(DnType::OrganizationName, ORGANIZATION);

    params.subject_alt_names = service_dns_names(service_name, namespace)
        .into_iter()
        .map(|name| {
            name.clone()
                .try_into()
                .map(SanType::DnsName)
                .map_err(|e: rcgen::Error| TlsError::InvalidDnsName {
                    name,
                    reason: e.to_string(),
                })
        })
        .collect::<Result<_, _>>()?;

    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

    let now = time::OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = now + time::Duration::days(SERVER_VALIDITY_DAYS as i64);

    let key_pair = KeyPair::generate()?;
    let cert = params.signed_by(&key_pair, ca_cert, ca_key)?;

    Ok((cert.pem(), key_pair.serialize_pem()))
}

/// Generate a fresh CA and a serving certificate signed by it
///
/// # Arguments
/// * `service_name` - Kubernetes service name (e.g., "kanta-webhook")
/// * `namespace` - Kubernetes namespace (e.g., "kanta-system")
pub fn generate_certificate_bundle(
    service_name: &str,
    namespace: &str,
) -> Result<CertificateBundle, TlsError> {
    let (ca_cert, ca_key) = generate_ca()?;
    let (server_cert_pem, server_key_pem) =
        generate_server_cert(&ca_cert, &ca_key, service_name, namespace)?;

    Ok(CertificateBundle {
        ca_cert_pem: ca_cert.pem(),
        server_cert_pem,
        server_key_pem,
    })
}

/// Load the certificate bundle from a Secret, `None` if it does not exist
pub async fn load_from_secret(
    client: &kube::Client,
    namespace: &str,
    secret_name: &str,
) -> Result<Option<CertificateBundle>, TlsError> {
    use k8s_openapi::api::core::v1::Secret;
    use kube::Api;

    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);

    match secrets.get(secret_name).await {
        Ok(secret) => {
            let data = secret.data.unwrap_or_default();
            CertificateBundle::from_secret_data(secret_name, &data).map(Some)
        }
        Err(kube::Error::Api(err)) if err.code == 404 => Ok(None),
        Err(e) => Err(TlsError::Kube(e)),
    }
}

/// Create or update the Secret holding the certificate bundle
pub async fn save_to_secret(
    client: &kube::Client,
    namespace: &str,
    secret_name: &str,
    bundle: &CertificateBundle,
) -> Result<(), TlsError> {
    use k8s_openapi::api::core::v1::Secret;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube::api::{Patch, PatchParams, PostParams};
    use kube::Api;

    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);

    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(secret_name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(
                "app.kubernetes.io/managed-by".to_string(),
                ORGANIZATION.to_string(),
            )])),
            ..Default::default()
        },
        type_: Some("kubernetes.io/tls".to_string()),
        data: Some(bundle.to_secret_data()),
        ..Default::default()
    };

    match secrets.create(&PostParams::default(), &secret).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(err)) if err.code == 409 => {
            secrets
                .patch(secret_name, &PatchParams::default(), &Patch::Merge(&secret))
                .await?;
            Ok(())
        }
        Err(e) => Err(TlsError::Kube(e)),
    }
}

/// CRDs whose conversion webhook is served by this process
pub fn conversion_crd_names() -> [String; 2] {
    [
        v1::Cluster::crd_name().to_string(),
        v1::ComponentDefinition::crd_name().to_string(),
    ]
}

/// Merge patch that sets the webhook `caBundle` of a CRD
pub fn ca_bundle_patch(ca_bundle_base64: &str) -> serde_json::Value {
    serde_json::json!({
        "spec": {
            "conversion": {
                "webhook": {
                    "clientConfig": {
                        "caBundle": ca_bundle_base64
                    }
                }
            }
        }
    })
}

/// Inject the CA bundle into every converted CRD
///
/// A CRD that cannot be patched (usually because it is not installed
/// yet) is logged and skipped.
pub async fn patch_crd_ca_bundles(client: &kube::Client, ca_bundle_base64: &str) {
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
    use kube::api::{Patch, PatchParams};
    use kube::Api;

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let patch = ca_bundle_patch(ca_bundle_base64);

    for name in conversion_crd_names() {
        match crds
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => info!(crd = %name, "Patched CRD with webhook CA bundle"),
            Err(e) => warn!(crd = %name, error = ?e, "Failed to patch CRD with CA bundle"),
        }
    }
}

/// Load or create the webhook certificates and publish the CA
///
/// Returns the certificate bundle for use by the HTTPS server.
pub async fn initialize_tls(
    client: &kube::Client,
    service_name: &str,
    namespace: &str,
    secret_name: &str,
) -> Result<CertificateBundle, TlsError> {
    let bundle = match load_from_secret(client, namespace, secret_name).await? {
        Some(bundle) => {
            info!(
                secret = secret_name,
                "Loaded existing TLS certificates from Secret"
            );
            bundle
        }
        None => {
            info!("No existing TLS certificates found, generating new ones");
            let bundle = generate_certificate_bundle(service_name, namespace)?;
            save_to_secret(client, namespace, secret_name, &bundle).await?;
            info!(secret = secret_name, "Saved new TLS certificates to Secret");
            bundle
        }
    };

    // CRDs may have been reinstalled since the Secret was written
    patch_crd_ca_bundles(client, &bundle.ca_bundle_base64()?).await;

    Ok(bundle)
}

/// Build a rustls ServerConfig from the certificate bundle
pub fn build_rustls_config(
    bundle: &CertificateBundle,
) -> Result<Arc<rustls::ServerConfig>, TlsError> {
    use rustls::pki_types::CertificateDer;
    use rustls_pemfile::{certs, private_key};
    use std::io::BufReader;

    let cert_chain: Vec<CertificateDer<'static>> =
        certs(&mut BufReader::new(bundle.server_cert_pem.as_bytes()))
            .filter_map(|r| r.ok())
            .collect();

    if cert_chain.is_empty() {
        return Err(TlsError::InvalidPem);
    }

    let key = private_key(&mut BufReader::new(bundle.server_key_pem.as_bytes()))
        .map_err(|e| TlsError::Parse(format!("Failed to parse private key: {}", e)))?
        .ok_or(TlsError::InvalidPem)?;

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| TlsError::Parse(format!("Failed to set protocol versions: {}", e)))?
    .with_no_client_auth()
    .with_single_cert(cert_chain, key)
    .map_err(|e| TlsError::Parse(format!("Failed to build TLS config: {}", e)))?;

    Ok(Arc::new(config))
}
