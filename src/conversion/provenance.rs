//! Provenance annotations for triage
//!
//! Records which direction an object was last converted in and from which
//! schema version. Written on every conversion; nothing reads it back for
//! correctness.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::side_channel::remove_annotation;

/// Schema version the object was converted from
pub const CONVERTED_FROM_ANNOTATION: &str = "apps.kanta.io/converted-from";

/// One of the [`Provenance`] values
pub const PROVENANCE_ANNOTATION: &str = "apps.kanta.io/conversion-provenance";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Content came from the source version unchanged
    Native,
    /// Restored from the hub version
    MigratedFromHub,
    /// The conversion narrowed or dropped data
    NeedsReview,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Native => "Native",
            Provenance::MigratedFromHub => "MigratedFromHub",
            Provenance::NeedsReview => "NeedsReview",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Native" => Some(Provenance::Native),
            "MigratedFromHub" => Some(Provenance::MigratedFromHub),
            "NeedsReview" => Some(Provenance::NeedsReview),
            _ => None,
        }
    }
}

pub fn record(meta: &mut ObjectMeta, provenance: Provenance, source_version: &str) {
    let annotations = meta.annotations.get_or_insert_with(Default::default);
    annotations.insert(
        PROVENANCE_ANNOTATION.to_string(),
        provenance.as_str().to_string(),
    );
    annotations.insert(
        CONVERTED_FROM_ANNOTATION.to_string(),
        source_version.to_string(),
    );
}

/// Provenance and source version, if both annotations are present and valid
pub fn read(meta: &ObjectMeta) -> Option<(Provenance, &str)> {
    let annotations = meta.annotations.as_ref()?;
    let provenance = Provenance::parse(annotations.get(PROVENANCE_ANNOTATION)?)?;
    let version = annotations.get(CONVERTED_FROM_ANNOTATION)?;
    Some((provenance, version.as_str()))
}

pub fn clear(meta: &mut ObjectMeta) {
    remove_annotation(meta, PROVENANCE_ANNOTATION);
    remove_annotation(meta, CONVERTED_FROM_ANNOTATION);
}

#[cfg(test)]
#[path = "provenance_test.rs"]
mod tests;
