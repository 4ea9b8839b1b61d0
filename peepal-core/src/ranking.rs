//! Keyword search ranking and the tri-state amenity post-filter.

use std::cmp::Ordering;

use crate::config::Config;
use crate::geo::walking_distance_m;
use crate::model::{AmenityFilter, NearbyToilet};
use crate::planner::TextPlan;
use crate::ports::{PortError, TextCandidate, ToiletStore};

/// Drop every character that is neither a word character nor whitespace.
#[must_use]
pub fn sanitize_query(query: &str) -> String {
    query
        .chars()
        .filter(|ch| ch.is_alphanumeric() || *ch == '_' || ch.is_whitespace())
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Orders text matches and applies the amenity post-filter.
#[derive(Debug, Clone)]
pub struct RankingEngine {
    limit: usize,
    walking_factor: f64,
}

#[derive(Debug)]
struct Scored {
    exact: bool,
    candidate: TextCandidate,
}

impl RankingEngine {
    /// Engine with the configured result cap and walking factor.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            limit: config.search_limit,
            walking_factor: config.walking_factor,
        }
    }

    /// Order candidates by exact address match, then relevance, then distance,
    /// and keep at most the configured number.
    ///
    /// The sort is stable: rows equal on all three keys keep store order.
    #[must_use]
    pub fn rank(&self, raw_query: &str, candidates: Vec<TextCandidate>) -> Vec<TextCandidate> {
        let needle = raw_query.trim().to_lowercase();
        let mut scored: Vec<Scored> = candidates
            .into_iter()
            .map(|candidate| Scored {
                exact: candidate.toilet.address.to_lowercase() == needle,
                candidate,
            })
            .collect();

        scored.sort_by(compare_scored);

        scored
            .into_iter()
            .take(self.limit)
            .map(|scored| scored.candidate)
            .collect()
    }

    /// Fetch matches for `plan`, rank them, cap them and then filter amenities.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the store query fails.
    pub async fn search(
        &self,
        store: &dyn ToiletStore,
        plan: &TextPlan,
        filter: &AmenityFilter,
    ) -> Result<Vec<NearbyToilet>, PortError> {
        let candidates = store.matching(plan).await?;
        let ranked = self
            .rank(&plan.raw, candidates)
            .into_iter()
            .map(|candidate| NearbyToilet {
                distance: walking_distance_m(candidate.distance_m, self.walking_factor),
                toilet: candidate.toilet,
            })
            .collect();
        Ok(apply_amenity_filter(ranked, filter))
    }
}

fn compare_scored(left: &Scored, right: &Scored) -> Ordering {
    right
        .exact
        .cmp(&left.exact)
        .then_with(|| right.candidate.relevance.total_cmp(&left.candidate.relevance))
        .then_with(|| left.candidate.distance_m.total_cmp(&right.candidate.distance_m))
}

/// Remove results whose known amenity values conflict with the filter.
///
/// Results with no data for a filtered amenity are always kept.
#[must_use]
pub fn apply_amenity_filter(ranked: Vec<NearbyToilet>, filter: &AmenityFilter) -> Vec<NearbyToilet> {
    if filter.is_empty() {
        return ranked;
    }
    ranked
        .into_iter()
        .filter(|hit| filter.admits(&hit.toilet.amenities))
        .collect()
}
