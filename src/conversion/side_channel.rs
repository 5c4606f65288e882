//! Side channel carrying spoke-only data through a hub object
//!
//! The delta is stored as a JSON string under one reserved annotation.
//! Per-kind code only sees [`SideChannel::set`] and [`SideChannel::take`], so
//! the storage can move out of annotations without touching the kinds.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Reserved annotation holding the JSON-encoded delta
pub const DELTA_ANNOTATION: &str = "apps.kanta.io/conversion-delta";

#[derive(Debug, Error)]
pub enum SideChannelError {
    #[error("failed to encode delta: {0}")]
    Encode(#[source] serde_json::Error),

    /// The stored payload no longer matches the delta type
    #[error("failed to decode delta stored under '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait SideChannel {
    /// Raw payload currently stored on the object
    fn get<'a>(&self, meta: &'a ObjectMeta) -> Option<&'a str>;

    fn put(&self, meta: &mut ObjectMeta, payload: String);

    /// Remove the payload, if any
    fn clear(&self, meta: &mut ObjectMeta);

    /// Where the payload lives, for error messages
    fn location(&self) -> &str;

    /// Serialize `delta` and store it, replacing any previous entry
    fn set<D: Serialize>(&self, meta: &mut ObjectMeta, delta: &D) -> Result<(), SideChannelError>
    where
        Self: Sized,
    {
        let payload = serde_json::to_string(delta).map_err(SideChannelError::Encode)?;
        self.put(meta, payload);
        Ok(())
    }

    /// Read the stored delta into `delta` and remove it from the object
    ///
    /// Returns `Ok(false)` and leaves `delta` untouched when nothing is
    /// stored. A payload that fails to decode is an error and is left in
    /// place.
    fn take<D: DeserializeOwned>(
        &self,
        meta: &mut ObjectMeta,
        delta: &mut D,
    ) -> Result<bool, SideChannelError>
    where
        Self: Sized,
    {
        let decoded = match self.get(meta) {
            Some(payload) => {
                serde_json::from_str(payload).map_err(|source| SideChannelError::Decode {
                    key: self.location().to_string(),
                    source,
                })?
            }
            None => return Ok(false),
        };
        *delta = decoded;
        self.clear(meta);
        Ok(true)
    }
}

/// Stores the delta in `metadata.annotations`
#[derive(Debug, Clone)]
pub struct AnnotationSideChannel {
    key: String,
}

impl AnnotationSideChannel {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Default for AnnotationSideChannel {
    fn default() -> Self {
        Self::new(DELTA_ANNOTATION)
    }
}

impl SideChannel for AnnotationSideChannel {
    fn get<'a>(&self, meta: &'a ObjectMeta) -> Option<&'a str> {
        meta.annotations
            .as_ref()
            .and_then(|a| a.get(&self.key))
            .map(String::as_str)
    }

    fn put(&self, meta: &mut ObjectMeta, payload: String) {
        meta.annotations
            .get_or_insert_with(Default::default)
            .insert(self.key.clone(), payload);
    }

    fn clear(&self, meta: &mut ObjectMeta) {
        remove_annotation(meta, &self.key);
    }

    fn location(&self) -> &str {
        &self.key
    }
}

/// Remove one annotation, dropping the map when it becomes empty
///
/// `put` creates the map on demand, so an object that had no annotations
/// before a round trip has none after it.
pub(crate) fn remove_annotation(meta: &mut ObjectMeta, key: &str) {
    if let Some(annotations) = meta.annotations.as_mut() {
        annotations.remove(key);
        if annotations.is_empty() {
            meta.annotations = None;
        }
    }
}

#[cfg(test)]
#[path = "side_channel_test.rs"]
mod tests;
