//! Planning and execution of radius-bounded and text queries against a [`ToiletStore`].

use crate::config::Config;
use crate::geo::{clamp_radius_km, walking_distance_m};
use crate::model::{Coordinate, NearbyToilet};
use crate::ports::{PortError, ToiletStore};
use crate::ranking::sanitize_query;

#[derive(Debug, Clone, Copy, PartialEq)]
/// "Within radius, ordered by distance" query.
pub struct NearbyPlan {
    /// Search center.
    pub origin: Coordinate,
    /// Clamped radius in meters.
    pub radius_m: f64,
    /// Maximum rows to return.
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
/// "Relevance plus distance" query.
pub struct TextPlan {
    /// Trimmed query as typed, used for substring containment.
    pub raw: String,
    /// Query without punctuation, used for full-text matching.
    pub sanitized: String,
    /// Caller position for distance.
    pub origin: Coordinate,
}

/// Builds query plans and post-processes store rows for nearby lookups.
#[derive(Debug, Clone)]
pub struct SpatialQueryPlanner {
    max_radius_km: f64,
    default_limit: usize,
    walking_factor: f64,
}

impl SpatialQueryPlanner {
    /// Planner using the configured ceiling, default limit and walking factor.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            max_radius_km: config.max_radius_km,
            default_limit: config.default_nearby_limit,
            walking_factor: config.walking_factor,
        }
    }

    /// Plan a nearby lookup. Radii above the ceiling are silently reduced.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] when `limit` is zero.
    pub fn plan_nearby(
        &self,
        origin: Coordinate,
        radius_km: Option<f64>,
        limit: Option<usize>,
    ) -> Result<NearbyPlan, PortError> {
        let limit = limit.unwrap_or(self.default_limit);
        if limit == 0 {
            return Err(PortError::invalid("limit", "must be at least 1"));
        }
        Ok(NearbyPlan {
            origin,
            radius_m: clamp_radius_km(radius_km, self.max_radius_km) * 1000.0,
            limit,
        })
    }

    /// Plan a text lookup.
    #[must_use]
    pub fn plan_text(&self, query: &str, origin: Coordinate) -> TextPlan {
        TextPlan {
            raw: query.trim().to_owned(),
            sanitized: sanitize_query(query),
            origin,
        }
    }

    /// Run a nearby plan: rows ordered by ascending distance, capped at the plan limit.
    ///
    /// Equal distances keep the order the store returned them in.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store query fails.
    pub async fn nearby(
        &self,
        store: &dyn ToiletStore,
        plan: &NearbyPlan,
    ) -> Result<Vec<NearbyToilet>, PortError> {
        let mut candidates = store.within_radius(plan).await?;
        candidates.retain(|candidate| candidate.distance_m <= plan.radius_m);
        candidates.sort_by(|left, right| left.distance_m.total_cmp(&right.distance_m));
        candidates.truncate(plan.limit);

        Ok(candidates
            .into_iter()
            .map(|candidate| NearbyToilet {
                distance: self.walking_distance(candidate.distance_m),
                toilet: candidate.toilet,
            })
            .collect())
    }

    /// Reported distance for a straight-line distance.
    #[must_use]
    pub fn walking_distance(&self, straight_line_m: f64) -> u64 {
        walking_distance_m(straight_line_m, self.walking_factor)
    }
}
