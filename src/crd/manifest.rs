//! Installable CRD manifests with both versions and webhook conversion

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceConversion, CustomResourceDefinition, ServiceReference, WebhookClientConfig,
    WebhookConversion,
};
use kube::CustomResourceExt;

use super::{v1, v1alpha1};

/// Path the webhook serves ConversionReviews on
pub const CONVERT_PATH: &str = "/convert";

/// Service the API server calls for conversions
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookService {
    pub name: String,
    pub namespace: String,
    pub port: i32,
}

/// Merge a spoke and hub CRD into one multi-version definition
///
/// The hub is the storage version. Both versions stay served (the spoke
/// flagged deprecated), and the API server converts between them through
/// `service`.
pub fn merge_versions(
    spoke: CustomResourceDefinition,
    hub: CustomResourceDefinition,
    service: &WebhookService,
) -> CustomResourceDefinition {
    let mut crd = hub;

    let mut versions: Vec<_> = spoke
        .spec
        .versions
        .into_iter()
        .map(|mut version| {
            version.served = true;
            version.storage = false;
            version.deprecated = Some(true);
            version
        })
        .collect();
    for mut version in crd.spec.versions.drain(..) {
        version.served = true;
        version.storage = true;
        versions.push(version);
    }
    crd.spec.versions = versions;

    crd.spec.conversion = Some(CustomResourceConversion {
        strategy: "Webhook".to_string(),
        webhook: Some(WebhookConversion {
            client_config: Some(WebhookClientConfig {
                service: Some(ServiceReference {
                    name: service.name.clone(),
                    namespace: service.namespace.clone(),
                    path: Some(CONVERT_PATH.to_string()),
                    port: Some(service.port),
                }),
                ..Default::default()
            }),
            conversion_review_versions: vec!["v1".to_string()],
        }),
    });

    crd
}

/// Every CRD this crate serves, ready to install
pub fn all_crds(service: &WebhookService) -> Vec<CustomResourceDefinition> {
    vec![
        merge_versions(v1alpha1::Cluster::crd(), v1::Cluster::crd(), service),
        merge_versions(
            v1alpha1::ComponentDefinition::crd(),
            v1::ComponentDefinition::crd(),
            service,
        ),
    ]
}
