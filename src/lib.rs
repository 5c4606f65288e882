//! Multi-version conversion for `apps.kanta.io` resources
//!
//! - [`crd`]: the v1alpha1 (spoke) and v1 (hub) resource types
//! - [`conversion`]: the per-kind converters and the engine that drives them
//! - [`server`]: the ConversionReview webhook and its HTTP plumbing

pub mod conversion;
pub mod crd;
pub mod server;
