//! # API Shared
//!
//! Shared definitions for the intake outer surfaces.
//!
//! Contains:
//! - The health check response and `HealthService`
//!
//! Used by `api-rest` and the `intake-run` binary.

pub mod health;

pub use health::{HealthRes, HealthService};
