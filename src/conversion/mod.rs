//! Hub/spoke conversion between v1alpha1 and v1
//!
//! Every kind converts through the v1 hub. A conversion runs in a fixed
//! order:
//!
//! 1. identity copy (object metadata)
//! 2. generic field mapping: an explicit table of fields whose type is the
//!    same in both versions
//! 3. structural remap: renames, enum narrowing, restructured collections,
//!    derived fields
//! 4. delta capture (to hub) or delta apply (from hub) through a side channel
//!
//! The delta holds every spoke field the hub cannot express, so
//! `from_hub(to_hub(x)) == x` for all modelled fields except the documented
//! forward-only ones (`Halt` narrowing, derived scheduling policy).
//!
//! ## Conversion rules
//! - Cluster: see [`cluster`]
//! - ComponentDefinition: see [`component_definition`]

pub mod cluster;
pub mod component_definition;
pub mod provenance;
pub mod scheduling;
pub mod side_channel;

use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::marker::PhantomData;
use thiserror::Error;
use tracing::debug;

pub use cluster::{ClusterConverter, ClusterDelta};
pub use component_definition::{ComponentDefinitionConverter, ComponentDefinitionDelta};
pub use provenance::Provenance;
pub use side_channel::{AnnotationSideChannel, SideChannel, SideChannelError, DELTA_ANNOTATION};

/// Deprecated version every spoke object is written in
pub const SPOKE_VERSION: &str = "v1alpha1";

/// Canonical storage version
pub const HUB_VERSION: &str = "v1";

/// Errors that abort a conversion
///
/// No partially converted object is ever returned alongside one of these.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("invalid destination object: expected {kind} {HUB_VERSION}")]
    InvalidDestination { kind: &'static str },

    #[error("invalid source object: expected {kind} {HUB_VERSION}")]
    InvalidSource { kind: &'static str },

    #[error("{kind} conversion delta: {source}")]
    SideChannel {
        kind: &'static str,
        #[source]
        source: SideChannelError,
    },

    #[error("duplicate {field} entry '{name}': names must be unique to convert to {HUB_VERSION}")]
    DuplicateName { field: &'static str, name: String },
}

/// Whether a structural remap kept everything it was given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fidelity {
    Exact,
    /// Data was narrowed or dropped and a human should look at the result
    Lossy,
}

/// Per-kind conversion rules
///
/// A new kind is added by implementing this trait; the engine supplies the
/// ordering, the side channel and the provenance tagging.
pub trait KindConverter {
    type Spoke: Resource<DynamicType = ()> + 'static;
    type Hub: Resource<DynamicType = ()> + 'static;

    /// Spoke-only fields. `Default` must mean "no extra information".
    type Delta: Serialize + DeserializeOwned + Default;

    const KIND: &'static str;

    /// Copy every field whose type matches in both versions.
    ///
    /// Implementations build the hub value with a struct literal so that a
    /// field added to either version fails to compile until it is mapped.
    fn map_to_hub(spoke: &Self::Spoke) -> Self::Hub;

    fn map_from_hub(hub: &Self::Hub) -> Self::Spoke;

    /// Apply the renames, narrowing and restructuring the generic mapping
    /// cannot express.
    fn remap_to_hub(spoke: &Self::Spoke, hub: &mut Self::Hub)
        -> Result<Fidelity, ConversionError>;

    /// Reverse structural remap. `delta` is `None` when the hub object never
    /// went through `to_hub` (or its side channel was removed).
    fn remap_from_hub(
        hub: &Self::Hub,
        spoke: &mut Self::Spoke,
        delta: Option<&Self::Delta>,
    ) -> Fidelity;

    fn capture(spoke: &Self::Spoke) -> Self::Delta;

    /// Restore spoke-only fields. Runs last so it wins over anything the
    /// generic and structural steps filled in.
    fn apply(spoke: &mut Self::Spoke, delta: Self::Delta);
}

/// Runs the conversion steps for one kind
pub struct ConversionEngine<K, C = AnnotationSideChannel> {
    channel: C,
    _kind: PhantomData<fn() -> K>,
}

impl<K: KindConverter> ConversionEngine<K> {
    pub fn new() -> Self {
        Self::with_channel(AnnotationSideChannel::default())
    }
}

impl<K: KindConverter> Default for ConversionEngine<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: KindConverter, C: SideChannel> ConversionEngine<K, C> {
    pub fn with_channel(channel: C) -> Self {
        Self {
            channel,
            _kind: PhantomData,
        }
    }

    /// Convert a spoke object into a new hub object (ConvertTo)
    pub fn to_hub(&self, spoke: &K::Spoke) -> Result<K::Hub, ConversionError> {
        let mut hub = K::map_to_hub(spoke);
        *hub.meta_mut() = spoke.meta().clone();

        let fidelity = K::remap_to_hub(spoke, &mut hub)?;

        let delta = K::capture(spoke);
        self.channel
            .set(hub.meta_mut(), &delta)
            .map_err(|source| ConversionError::SideChannel {
                kind: K::KIND,
                source,
            })?;

        let provenance = match fidelity {
            Fidelity::Exact => Provenance::Native,
            Fidelity::Lossy => Provenance::NeedsReview,
        };
        provenance::record(hub.meta_mut(), provenance, SPOKE_VERSION);

        debug!(
            kind = K::KIND,
            name = ?spoke.meta().name,
            provenance = provenance.as_str(),
            "Converted {} to {}",
            SPOKE_VERSION,
            HUB_VERSION
        );
        Ok(hub)
    }

    /// Convert a hub object back to the spoke version (ConvertFrom)
    ///
    /// The side-channel entry is removed from `hub` in place, so the caller
    /// must treat `hub` as consumed.
    pub fn from_hub(&self, hub: &mut K::Hub) -> Result<K::Spoke, ConversionError> {
        let mut delta = K::Delta::default();
        let found = self
            .channel
            .take(hub.meta_mut(), &mut delta)
            .map_err(|source| ConversionError::SideChannel {
                kind: K::KIND,
                source,
            })?;

        let mut spoke = K::map_from_hub(hub);
        *spoke.meta_mut() = hub.meta().clone();

        let fidelity = K::remap_from_hub(hub, &mut spoke, found.then_some(&delta));
        if found {
            K::apply(&mut spoke, delta);
        }

        let provenance = match fidelity {
            Fidelity::Exact => Provenance::MigratedFromHub,
            Fidelity::Lossy => Provenance::NeedsReview,
        };
        provenance::record(spoke.meta_mut(), provenance, HUB_VERSION);

        debug!(
            kind = K::KIND,
            name = ?hub.meta().name,
            delta_found = found,
            provenance = provenance.as_str(),
            "Converted {} to {}",
            HUB_VERSION,
            SPOKE_VERSION
        );
        Ok(spoke)
    }

    /// ConvertTo over a loosely typed destination handle
    ///
    /// `dst` is only written when the whole conversion succeeds.
    pub fn convert_to(&self, spoke: &K::Spoke, dst: &mut dyn Any) -> Result<(), ConversionError> {
        let dst = dst
            .downcast_mut::<K::Hub>()
            .ok_or(ConversionError::InvalidDestination { kind: K::KIND })?;
        *dst = self.to_hub(spoke)?;
        Ok(())
    }

    /// ConvertFrom over a loosely typed source handle
    ///
    /// `dst` is only written when the whole conversion succeeds.
    pub fn convert_from(
        &self,
        dst: &mut K::Spoke,
        src: &mut dyn Any,
    ) -> Result<(), ConversionError> {
        let src = src
            .downcast_mut::<K::Hub>()
            .ok_or(ConversionError::InvalidSource { kind: K::KIND })?;
        *dst = self.from_hub(src)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_tests;
