//! Core types and service wiring for the peepal public toilet finder.

/// Bundle of storage and provider ports the service runs against.
pub mod backend;
/// Runtime configuration and environment loading.
pub mod config;
/// Human-readable distance, duration and instruction formatting.
pub mod format;
/// Distance math on the WGS-84 ellipsoid.
pub mod geo;
/// Domain models and identifiers shared by all crates.
pub mod model;
/// Report counting with threshold deletion.
pub mod moderation;
/// Conversion of provider directions into client routes.
pub mod navigation;
/// Radius-bounded and text query planning.
pub mod planner;
/// Encoded polyline codec.
pub mod polyline;
/// Traits describing the storage and provider interfaces.
pub mod ports;
/// Search result ordering and amenity post-filtering.
pub mod ranking;
/// High-level service facade used by clients.
pub mod service;
/// Path simplification.
pub mod simplify;
/// Bearer token cache for the directions provider.
pub mod token;

pub use backend::*;
pub use model::*;
pub use ports::*;
pub use service::*;
