//! CRD conversion webhook for `apps.kanta.io` resources
//!
//! Kubernetes calls this webhook whenever it needs an object in a version
//! other than the stored one. Every object goes through the typed
//! conversion engine of its kind.
//!
//! ## Endpoints
//! - POST /convert - Kubernetes ConversionReview webhook
//!
//! ## Supported conversions
//! - Cluster: v1alpha1 <-> v1
//! - ComponentDefinition: v1alpha1 <-> v1

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::health::ServerState;
use super::metrics::{ConversionMetrics, DIRECTION_FROM_HUB, DIRECTION_TO_HUB};
use crate::conversion::{
    ClusterConverter, ComponentDefinitionConverter, ConversionEngine, ConversionError,
    KindConverter, HUB_VERSION, SPOKE_VERSION,
};
use crate::crd::API_GROUP;

/// Kubernetes ConversionReview request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReview {
    pub api_version: String,
    pub kind: String,
    pub request: ConversionRequest,
}

/// The actual conversion request from Kubernetes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    /// Unique ID for this request
    pub uid: String,
    /// Target API version (e.g., "apps.kanta.io/v1")
    #[serde(rename = "desiredAPIVersion")]
    pub desired_api_version: String,
    /// Objects to convert
    pub objects: Vec<Value>,
}

/// Result status for conversion
#[derive(Debug, Serialize, PartialEq)]
pub struct ConversionResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response for a conversion request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub uid: String,
    pub result: ConversionResult,
    pub converted_objects: Vec<Value>,
}

/// Full ConversionReview response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReviewResponse {
    pub api_version: String,
    pub kind: String,
    pub response: ConversionResponse,
}

/// Why a single object could not be converted
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing apiVersion{0}")]
    MissingApiVersion(String),

    #[error("Invalid apiVersion format '{api_version}'{context}")]
    InvalidApiVersion { api_version: String, context: String },

    #[error("Unsupported API group '{group}'{context}")]
    UnsupportedGroup { group: String, context: String },

    #[error("Unsupported kind '{kind}'{context}")]
    UnsupportedKind { kind: String, context: String },

    #[error("Unsupported conversion: {from} -> {to}{context}")]
    UnsupportedConversion {
        from: String,
        to: String,
        context: String,
    },

    #[error("Failed to decode {kind}{context}: {source}")]
    Decode {
        kind: &'static str,
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode {kind}{context}: {source}")]
    Encode {
        kind: &'static str,
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Conversion failed{context}: {source}")]
    Conversion {
        context: String,
        #[source]
        source: ConversionError,
    },
}

/// Split an apiVersion into group and version ("apps.kanta.io/v1" -> ("apps.kanta.io", "v1"))
fn split_api_version(api_version: &str) -> Option<(&str, &str)> {
    let (group, version) = api_version.split_once('/')?;
    if group.is_empty() || version.is_empty() || version.contains('/') {
        return None;
    }
    Some((group, version))
}

/// Build a short context string (namespace/name) for error messages
fn object_context(obj: &Value) -> String {
    let metadata = obj.get("metadata");
    let name = metadata
        .and_then(|m| m.get("name"))
        .and_then(|n| n.as_str());
    let namespace = metadata
        .and_then(|m| m.get("namespace"))
        .and_then(|n| n.as_str());
    match (namespace, name) {
        (Some(ns), Some(n)) => format!(" (namespace: {}, name: {})", ns, n),
        (None, Some(n)) => format!(" (name: {})", n),
        (Some(ns), None) => format!(" (namespace: {})", ns),
        _ => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    ToHub,
    FromHub,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::ToHub => DIRECTION_TO_HUB,
            Direction::FromHub => DIRECTION_FROM_HUB,
        }
    }
}

/// Run one typed conversion over a JSON object
fn convert_typed<K>(obj: &Value, direction: Direction, context: &str) -> Result<Value, WebhookError>
where
    K: KindConverter,
    K::Spoke: Serialize + DeserializeOwned,
    K::Hub: Serialize + DeserializeOwned,
{
    let engine = ConversionEngine::<K>::new();
    let conversion_error = |source| WebhookError::Conversion {
        context: context.to_string(),
        source,
    };
    let decode_error = |source| WebhookError::Decode {
        kind: K::KIND,
        context: context.to_string(),
        source,
    };
    let encode_error = |source| WebhookError::Encode {
        kind: K::KIND,
        context: context.to_string(),
        source,
    };

    match direction {
        Direction::ToHub => {
            let spoke: K::Spoke = serde_json::from_value(obj.clone()).map_err(decode_error)?;
            let hub = engine.to_hub(&spoke).map_err(conversion_error)?;
            serde_json::to_value(&hub).map_err(encode_error)
        }
        Direction::FromHub => {
            let mut hub: K::Hub = serde_json::from_value(obj.clone()).map_err(decode_error)?;
            let spoke = engine.from_hub(&mut hub).map_err(conversion_error)?;
            serde_json::to_value(&spoke).map_err(encode_error)
        }
    }
}

/// Convert a single object to the desired version
fn convert_object(
    obj: &Value,
    desired_version: &str,
    metrics: Option<&ConversionMetrics>,
) -> Result<Value, WebhookError> {
    let context = object_context(obj);

    let current_api_version = obj
        .get("apiVersion")
        .and_then(|v| v.as_str())
        .ok_or_else(|| WebhookError::MissingApiVersion(context.clone()))?;

    let (group, current_version) =
        split_api_version(current_api_version).ok_or_else(|| WebhookError::InvalidApiVersion {
            api_version: current_api_version.to_string(),
            context: context.clone(),
        })?;

    if group != API_GROUP {
        return Err(WebhookError::UnsupportedGroup {
            group: group.to_string(),
            context,
        });
    }

    // Same version - no conversion needed
    if current_version == desired_version {
        return Ok(obj.clone());
    }

    let direction = match (current_version, desired_version) {
        (SPOKE_VERSION, HUB_VERSION) => Direction::ToHub,
        (HUB_VERSION, SPOKE_VERSION) => Direction::FromHub,
        _ => {
            return Err(WebhookError::UnsupportedConversion {
                from: current_version.to_string(),
                to: desired_version.to_string(),
                context,
            })
        }
    };

    let kind = obj.get("kind").and_then(|k| k.as_str()).unwrap_or_default();
    let started = Instant::now();
    let result = match kind {
        "Cluster" => convert_typed::<ClusterConverter>(obj, direction, &context),
        "ComponentDefinition" => {
            convert_typed::<ComponentDefinitionConverter>(obj, direction, &context)
        }
        other => {
            return Err(WebhookError::UnsupportedKind {
                kind: other.to_string(),
                context,
            })
        }
    };

    if let Some(metrics) = metrics {
        metrics.record_conversion(
            kind,
            direction.label(),
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );
    }
    debug!(
        kind = kind,
        direction = direction.label(),
        success = result.is_ok(),
        "Converted object{}",
        context
    );
    result
}

fn failed(uid: String, message: String) -> ConversionResponse {
    ConversionResponse {
        uid,
        result: ConversionResult {
            status: "Failed".to_string(),
            message: Some(message),
        },
        converted_objects: vec![],
    }
}

/// Convert all objects in a request
///
/// The first failure fails the whole review and no objects are returned.
pub fn convert_review(
    request: ConversionRequest,
    metrics: Option<&ConversionMetrics>,
) -> ConversionResponse {
    let desired_version = match split_api_version(&request.desired_api_version) {
        Some((API_GROUP, version)) => version,
        _ => {
            let message = format!(
                "Invalid desired API version: {}",
                request.desired_api_version
            );
            return failed(request.uid, message);
        }
    };

    // Check if desired version is supported
    if desired_version != SPOKE_VERSION && desired_version != HUB_VERSION {
        let message = format!("Unsupported API version: {}", desired_version);
        return failed(request.uid, message);
    }

    let mut converted_objects = Vec::with_capacity(request.objects.len());

    for obj in &request.objects {
        match convert_object(obj, desired_version, metrics) {
            Ok(converted) => converted_objects.push(converted),
            Err(e) => return failed(request.uid, e.to_string()),
        }
    }

    ConversionResponse {
        uid: request.uid,
        result: ConversionResult {
            status: "Success".to_string(),
            message: None,
        },
        converted_objects,
    }
}

/// Axum handler for the /convert endpoint
pub async fn handle_convert(
    State(state): State<ServerState>,
    Json(review): Json<ConversionReview>,
) -> impl IntoResponse {
    info!(
        uid = %review.request.uid,
        desired_version = %review.request.desired_api_version,
        object_count = review.request.objects.len(),
        "Processing conversion request"
    );

    let metrics = state.metrics();
    let response = convert_review(review.request, Some(metrics));

    let success = response.result.status == "Success";
    metrics.record_review(success);

    if success {
        info!(
            uid = %response.uid,
            converted_count = response.converted_objects.len(),
            "Conversion successful"
        );
    } else {
        warn!(
            uid = %response.uid,
            error = ?response.result.message,
            "Conversion failed"
        );
    }

    let review_response = ConversionReviewResponse {
        api_version: "apiextensions.k8s.io/v1".to_string(),
        kind: "ConversionReview".to_string(),
        response,
    };

    (StatusCode::OK, Json(review_response))
}

#[cfg(test)]
#[path = "webhook_test.rs"]
mod tests;
