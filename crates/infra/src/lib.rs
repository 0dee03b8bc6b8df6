//! # Changecast Infrastructure
//!
//! Process-level plumbing around the core pipeline.
//!
//! This crate contains:
//! - Configuration loading (environment variables, JSON/TOML files)
//! - Tracing subscriber setup
//! - Storage-notification envelope parsing
//!
//! ## Architecture
//! - Depends on `changecast-domain` only
//! - Contains all "impure" code (environment, filesystem, global subscriber)

pub mod config;
pub mod ingress;
pub mod telemetry;

pub use ingress::{decode_object_key, parse_storage_events};
pub use telemetry::init_tracing;
