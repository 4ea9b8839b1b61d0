//! Traits describing storage and provider capabilities plus the shared error type.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::{Coordinate, EntityKind, IssuedToken, RawDirections, Toilet, ToiletId};
use crate::planner::{NearbyPlan, TextPlan};

#[derive(thiserror::Error, Debug)]
/// Errors surfaced by the core and its collaborators.
pub enum PortError {
    /// A request field is malformed or out of range.
    #[error("Invalid {field}: {message}")]
    InvalidInput {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },
    /// The referenced record does not exist.
    #[error("{0} not found: {1}")]
    NotFound(EntityKind, String),
    /// The directions provider returned no route.
    #[error("No route found")]
    NoRoute,
    /// The directions provider failed or rejected the request.
    #[error("Upstream error: {0}")]
    Upstream(String),
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// A provider payload could not be interpreted.
    #[error("Decode error: {0}")]
    Decode(String),
    /// Storage or other internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PortError {
    /// Shorthand for [`PortError::InvalidInput`].
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        PortError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Coarse category used by the transport layer.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            PortError::InvalidInput { .. } => ErrorKind::InvalidInput,
            PortError::NotFound(..) => ErrorKind::NotFound,
            PortError::NoRoute
            | PortError::Upstream(_)
            | PortError::Network(_)
            | PortError::Decode(_) => ErrorKind::UpstreamFailure,
            PortError::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Error categories exposed to callers.
pub enum ErrorKind {
    /// Bad request data.
    InvalidInput,
    /// Unknown identifier.
    NotFound,
    /// Directions provider unavailable, failing, or without a route.
    UpstreamFailure,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// HTTP status equivalent.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            ErrorKind::InvalidInput => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::UpstreamFailure => 502,
            ErrorKind::Internal => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Store row returned for a radius query.
pub struct Candidate {
    /// The listing.
    pub toilet: Toilet,
    /// Geography distance from the plan origin, in meters.
    pub distance_m: f64,
}

#[derive(Debug, Clone, PartialEq)]
/// Store row returned for a text query.
pub struct TextCandidate {
    /// The listing.
    pub toilet: Toilet,
    /// Geography distance from the plan origin, in meters.
    pub distance_m: f64,
    /// Full-text relevance, higher is better; zero for substring-only hits.
    pub relevance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Counter state after a report was applied.
pub enum ReportOutcome {
    /// Counter was persisted with this value.
    Counted(u32),
    /// Threshold reached and the record was removed.
    Deleted,
}

#[async_trait]
/// Point-indexed toilet storage.
pub trait ToiletStore: Send + Sync {
    /// Toilets within `plan.radius_m` of the origin, with their distances.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the storage query fails.
    async fn within_radius(&self, plan: &NearbyPlan) -> Result<Vec<Candidate>, PortError>;

    /// Toilets whose address matches the plan by full text or substring.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the storage query fails.
    async fn matching(&self, plan: &TextPlan) -> Result<Vec<TextCandidate>, PortError>;

    /// Single toilet lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the storage query fails.
    async fn toilet(&self, id: &ToiletId) -> Result<Option<Toilet>, PortError>;
}

#[async_trait]
/// Atomic report counter for one kind of record.
pub trait ReportCounter: Send + Sync {
    /// Kind of record this counter moderates.
    fn kind(&self) -> EntityKind;

    /// Increment the counter and delete the record when it reaches `threshold`,
    /// as one atomic step. Returns `None` when the record does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the storage operation fails.
    async fn increment_or_delete(
        &self,
        id: &str,
        threshold: u32,
    ) -> Result<Option<ReportOutcome>, PortError>;
}

#[async_trait]
/// Walking directions provider.
pub trait DirectionsPort: Send + Sync {
    /// Request walking directions between two points.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the provider request fails.
    async fn walking_directions(
        &self,
        token: &str,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RawDirections, PortError>;
}

#[async_trait]
/// Token endpoint of the directions provider.
pub trait TokenPort: Send + Sync {
    /// Obtain a fresh short-lived access token.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the provider request fails.
    async fn issue_token(&self) -> Result<IssuedToken, PortError>;
}
