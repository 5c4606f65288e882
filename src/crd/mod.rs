//! Custom resource definitions for `apps.kanta.io`
//!
//! - `v1alpha1`: deprecated spoke version, still served
//! - `v1`: hub and storage version
//! - `common`: types with an identical shape in both versions
//! - `manifest`: multi-version CRDs for installation

pub mod common;
pub mod manifest;
pub mod v1;
pub mod v1alpha1;

/// API group shared by every kind in this crate
pub const API_GROUP: &str = "apps.kanta.io";

#[cfg(test)]
#[path = "crd_test.rs"]
mod tests;
