//! In-process storage for toilets and reviews, seeded from a JSON document.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use peepal_core::{
    geo::geography_distance,
    model::{EntityKind, Review, Toilet, ToiletId},
    planner::{NearbyPlan, TextPlan},
    ports::{Candidate, PortError, ReportCounter, ReportOutcome, TextCandidate, ToiletStore},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// Serializable contents of a [`MemoryStore`].
pub struct Seed {
    /// Toilet listings, in storage order.
    #[serde(default)]
    pub toilets: Vec<Toilet>,
    /// Reviews, in storage order.
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Seed {
    /// Parse a seed document.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] when the JSON does not match the schema.
    pub fn from_json(raw: &str) -> Result<Self, PortError> {
        serde_json::from_str(raw).map_err(|err| PortError::invalid("seed", err.to_string()))
    }

    /// Render the seed as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Internal`] when serialization fails.
    pub fn to_json(&self) -> Result<String, PortError> {
        serde_json::to_string_pretty(self).map_err(|err| PortError::Internal(err.to_string()))
    }
}

/// Toilet and review storage held in memory.
///
/// Rows keep their seed order, which is the order ties resolve to.
pub struct MemoryStore {
    toilets: RwLock<Vec<Toilet>>,
    reviews: RwLock<Vec<Review>>,
}

impl MemoryStore {
    /// Store holding the validated contents of `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] for out-of-range coordinates or
    /// ratings and for duplicate ids.
    pub fn new(seed: Seed) -> Result<Self, PortError> {
        let mut toilet_ids = HashSet::new();
        for toilet in &seed.toilets {
            toilet.location.validated()?;
            if !toilet_ids.insert(toilet.id.clone()) {
                return Err(PortError::invalid(
                    "id",
                    format!("duplicate toilet id {}", toilet.id),
                ));
            }
        }

        let mut review_ids = HashSet::new();
        for review in &seed.reviews {
            review.validate()?;
            if !review_ids.insert(review.id.clone()) {
                return Err(PortError::invalid(
                    "id",
                    format!("duplicate review id {}", review.id),
                ));
            }
        }

        Ok(Self {
            toilets: RwLock::new(seed.toilets),
            reviews: RwLock::new(seed.reviews),
        })
    }

    /// Copy of the current contents.
    pub async fn snapshot(&self) -> Seed {
        Seed {
            toilets: self.toilets.read().await.clone(),
            reviews: self.reviews.read().await.clone(),
        }
    }

    /// Report counter over this store's toilets.
    #[must_use]
    pub fn toilet_reports(self: &Arc<Self>) -> Arc<dyn ReportCounter> {
        Arc::new(ToiletReports(Arc::clone(self)))
    }

    /// Report counter over this store's reviews.
    #[must_use]
    pub fn review_reports(self: &Arc<Self>) -> Arc<dyn ReportCounter> {
        Arc::new(ReviewReports(Arc::clone(self)))
    }
}

#[async_trait]
impl ToiletStore for MemoryStore {
    async fn within_radius(&self, plan: &NearbyPlan) -> Result<Vec<Candidate>, PortError> {
        let toilets = self.toilets.read().await;
        let mut candidates: Vec<Candidate> = toilets
            .iter()
            .map(|toilet| Candidate {
                distance_m: geography_distance(plan.origin, toilet.location),
                toilet: toilet.clone(),
            })
            .filter(|candidate| candidate.distance_m <= plan.radius_m)
            .collect();

        candidates.sort_by(|left, right| left.distance_m.total_cmp(&right.distance_m));
        candidates.truncate(plan.limit);
        Ok(candidates)
    }

    async fn matching(&self, plan: &TextPlan) -> Result<Vec<TextCandidate>, PortError> {
        let query_tokens = tokenize(&plan.sanitized);
        let needle = plan.raw.to_lowercase();

        let toilets = self.toilets.read().await;
        Ok(toilets
            .iter()
            .filter_map(|toilet| {
                let relevance = relevance(&query_tokens, &toilet.address);
                let contains = !needle.is_empty() && toilet.address.to_lowercase().contains(&needle);
                (relevance > 0.0 || contains).then(|| TextCandidate {
                    distance_m: geography_distance(plan.origin, toilet.location),
                    relevance,
                    toilet: toilet.clone(),
                })
            })
            .collect())
    }

    async fn toilet(&self, id: &ToiletId) -> Result<Option<Toilet>, PortError> {
        Ok(self
            .toilets
            .read()
            .await
            .iter()
            .find(|toilet| toilet.id == *id)
            .cloned())
    }
}

struct ToiletReports(Arc<MemoryStore>);

#[async_trait]
impl ReportCounter for ToiletReports {
    fn kind(&self) -> EntityKind {
        EntityKind::Toilet
    }

    async fn increment_or_delete(
        &self,
        id: &str,
        threshold: u32,
    ) -> Result<Option<ReportOutcome>, PortError> {
        let mut toilets = self.0.toilets.write().await;
        let Some(index) = toilets.iter().position(|toilet| toilet.id.0 == id) else {
            return Ok(None);
        };

        let outcome = bump(toilets.get_mut(index).map(|toilet| &mut toilet.report_count), threshold)?;
        if outcome == ReportOutcome::Deleted {
            toilets.remove(index);
            // reviews go with their toilet
            let mut reviews = self.0.reviews.write().await;
            let before = reviews.len();
            reviews.retain(|review| review.toilet_id.0 != id);
            tracing::debug!(id, reviews = before - reviews.len(), "toilet removed with its reviews");
        }
        Ok(Some(outcome))
    }
}

struct ReviewReports(Arc<MemoryStore>);

#[async_trait]
impl ReportCounter for ReviewReports {
    fn kind(&self) -> EntityKind {
        EntityKind::Review
    }

    async fn increment_or_delete(
        &self,
        id: &str,
        threshold: u32,
    ) -> Result<Option<ReportOutcome>, PortError> {
        let mut reviews = self.0.reviews.write().await;
        let Some(index) = reviews.iter().position(|review| review.id.0 == id) else {
            return Ok(None);
        };

        let outcome = bump(reviews.get_mut(index).map(|review| &mut review.report_count), threshold)?;
        if outcome == ReportOutcome::Deleted {
            reviews.remove(index);
        }
        Ok(Some(outcome))
    }
}

// Caller holds the write lock for the whole read-increment-compare step.
fn bump(slot: Option<&mut u32>, threshold: u32) -> Result<ReportOutcome, PortError> {
    let count = slot.ok_or_else(|| PortError::Internal("row vanished under lock".to_owned()))?;
    let next = count.saturating_add(1);
    if next >= threshold {
        return Ok(ReportOutcome::Deleted);
    }
    *count = next;
    Ok(ReportOutcome::Counted(next))
}

/// Lower-cased word tokens of `text`.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Share of query tokens found as whole words in `address`.
#[expect(clippy::cast_precision_loss, reason = "token counts are tiny")]
fn relevance(query_tokens: &[String], address: &str) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let address_tokens: HashSet<String> = tokenize(address).into_iter().collect();
    let matched = query_tokens
        .iter()
        .filter(|token| address_tokens.contains(token.as_str()))
        .count();
    matched as f64 / query_tokens.len() as f64
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use peepal_core::{
        Backend, PeepalService,
        config::Config,
        model::{
            Coordinate, IssuedToken, NavigateRequest, NearbyRequest, RawDirections, RawRoute,
            RawStep, ReviewId, SearchRequest,
        },
        moderation::ModerationGate,
        ports::{DirectionsPort, TokenPort},
    };

    use super::*;

    const SEED: &str = r#"{
        "toilets": [
            {"id": "t-orchard", "name": "Orchard MRT", "address": "437 Orchard Road",
             "location": {"latitude": 1.3040, "longitude": 103.8320},
             "bidetAvail": false, "rating": 3.5},
            {"id": "t-somerset", "name": "313 Somerset", "address": "313 Orchard Road",
             "location": {"latitude": 1.3010, "longitude": 103.8380},
             "bidetAvail": true, "handicapAvail": true},
            {"id": "t-tanglin", "name": "Tanglin Mall", "address": "163 Tanglin Road",
             "location": {"latitude": 1.3050, "longitude": 103.8230}},
            {"id": "t-changi", "name": "Changi T3", "address": "65 Airport Boulevard",
             "location": {"latitude": 1.3564, "longitude": 103.9866}, "showerAvail": true}
        ],
        "reviews": [
            {"id": "r-1", "toiletId": "t-orchard", "rating": 4, "reviewText": "clean"},
            {"id": "r-2", "toiletId": "t-orchard", "rating": 1},
            {"id": "r-3", "toiletId": "t-changi", "rating": 5}
        ]
    }"#;

    struct FixedIssuer;

    #[async_trait]
    impl TokenPort for FixedIssuer {
        async fn issue_token(&self) -> Result<IssuedToken, PortError> {
            Ok(IssuedToken {
                access_token: "access".into(),
                expires_in_seconds: 1800,
            })
        }
    }

    struct StraightLine;

    #[async_trait]
    impl DirectionsPort for StraightLine {
        async fn walking_directions(
            &self,
            _token: &str,
            origin: Coordinate,
            destination: Coordinate,
        ) -> Result<RawDirections, PortError> {
            Ok(RawDirections {
                origin: Some(origin),
                destination: Some(destination),
                routes: vec![RawRoute {
                    distance_meters: 640.0,
                    duration_seconds: 480.0,
                    step_indexes: vec![0],
                }],
                steps: vec![RawStep {
                    step_path_index: 0,
                    distance_meters: 640.0,
                    duration_seconds: 480.0,
                    instructions: "Walk to <b>destination</b>".into(),
                }],
                step_paths: vec![vec![origin, destination]],
            })
        }
    }

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(Seed::from_json(SEED).expect("seed parses")).expect("seed valid"))
    }

    fn service(store: &Arc<MemoryStore>) -> PeepalService {
        let backend = Backend {
            toilets: Arc::clone(store) as Arc<dyn ToiletStore>,
            toilet_reports: store.toilet_reports(),
            review_reports: store.review_reports(),
            directions: Arc::new(StraightLine),
            tokens: Arc::new(FixedIssuer),
        };
        PeepalService::new(&Config::default(), backend).expect("service wires")
    }

    fn nearby_request(radius: Option<f64>) -> NearbyRequest {
        NearbyRequest {
            latitude: "1.3040".into(),
            longitude: "103.8300".into(),
            radius,
            limit: None,
        }
    }

    fn search_request(query: &str) -> SearchRequest {
        SearchRequest {
            query: query.into(),
            latitude: 1.3040,
            longitude: 103.8300,
            handicap_avail: None,
            bidet_avail: None,
            shower_avail: None,
            sanitiser_avail: None,
        }
    }

    fn ids(hits: &[peepal_core::model::NearbyToilet]) -> Vec<&str> {
        hits.iter().map(|hit| hit.toilet.id.0.as_str()).collect()
    }

    #[tokio::test]
    async fn nearby_is_sorted_and_excludes_far_toilets() {
        let store = store();
        let service = service(&store);
        let hits = service.nearby(&nearby_request(None)).await.expect("nearby");

        assert_eq!(ids(&hits), ["t-orchard", "t-tanglin", "t-somerset"]);
        assert!(hits.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
        // ~222 m straight line, reported with the walking factor
        let first = hits.first().expect("closest");
        assert!(first.distance > 300 && first.distance < 330, "got {}", first.distance);
    }

    #[tokio::test]
    async fn oversized_radius_matches_the_ceiling() {
        let store = store();
        let service = service(&store);
        let huge = service.nearby(&nearby_request(Some(100.0))).await.expect("nearby");
        let ceiling = service.nearby(&nearby_request(Some(5.0))).await.expect("nearby");
        assert_eq!(huge, ceiling);
        assert!(!ids(&huge).contains(&"t-changi"));
    }

    #[tokio::test]
    async fn antipodal_toilet_is_outside_every_radius() {
        let seed = Seed::from_json(
            r#"{"toilets": [
                {"id": "antipode", "name": "Far side", "address": "1 Other Way",
                 "location": {"latitude": -10.0, "longitude": -160.0}},
                {"id": "near", "name": "Next door", "address": "2 This Way",
                 "location": {"latitude": 10.001, "longitude": 20.0}}
            ]}"#,
        )
        .expect("seed parses");
        let store = MemoryStore::new(seed).expect("seed valid");
        let plan = NearbyPlan {
            origin: Coordinate {
                latitude: 10.0,
                longitude: 20.0,
            },
            radius_m: 5000.0,
            limit: 5,
        };

        let rows = store.within_radius(&plan).await.expect("query");
        let ids: Vec<&str> = rows.iter().map(|row| row.toilet.id.0.as_str()).collect();
        assert_eq!(ids, ["near"]);
        assert!(rows.iter().all(|row| row.distance_m > 100.0));
    }

    #[tokio::test]
    async fn nearby_rejects_malformed_coordinates() {
        let store = store();
        let service = service(&store);
        let request = NearbyRequest {
            latitude: "abc".into(),
            ..nearby_request(None)
        };
        let err = service.nearby(&request).await.expect_err("bad latitude");
        assert_eq!(err.kind().status_code(), 400);
    }

    #[tokio::test]
    async fn search_unions_full_text_and_substring_matches() {
        let store = store();
        let service = service(&store);

        let hits = service.search(&search_request("orchard")).await.expect("search");
        assert_eq!(ids(&hits), ["t-orchard", "t-somerset"]);

        // "Orch" is no whole token, but still a substring of the address
        let hits = service.search(&search_request("Orch")).await.expect("search");
        assert_eq!(hits.len(), 2);

        assert!(service.search(&search_request("   ")).await.expect("search").is_empty());
    }

    #[tokio::test]
    async fn exact_address_outranks_closer_partial_match() {
        let store = store();
        let service = service(&store);
        let hits = service
            .search(&search_request("313 ORCHARD ROAD"))
            .await
            .expect("search");
        assert_eq!(ids(&hits).first(), Some(&"t-somerset"));
    }

    #[tokio::test]
    async fn amenity_filter_keeps_unknowns() {
        let store = store();
        let service = service(&store);

        let wants_bidet = SearchRequest {
            bidet_avail: Some(true),
            ..search_request("road")
        };
        let hits = service.search(&wants_bidet).await.expect("search");
        assert_eq!(ids(&hits), ["t-tanglin", "t-somerset"]);

        let refuses_bidet = SearchRequest {
            bidet_avail: Some(false),
            ..search_request("road")
        };
        let hits = service.search(&refuses_bidet).await.expect("search");
        assert_eq!(ids(&hits), ["t-orchard", "t-tanglin"]);
    }

    #[tokio::test]
    async fn toilet_is_deleted_on_third_report_with_its_reviews() {
        let store = store();
        let service = service(&store);
        let id = ToiletId::from("t-orchard");

        for _ in 0..2 {
            assert!(!service.report_toilet(&id).await.expect("report").deleted);
        }
        let details = service.details(&id).await.expect("still present");
        assert_eq!(details.report_count, 2);

        let receipt = service.report_toilet(&id).await.expect("report");
        assert!(receipt.deleted);
        assert!(matches!(
            service.details(&id).await,
            Err(PortError::NotFound(EntityKind::Toilet, _))
        ));
        assert!(matches!(
            service.report_toilet(&id).await,
            Err(PortError::NotFound(EntityKind::Toilet, _))
        ));

        let remaining: Vec<String> = store
            .snapshot()
            .await
            .reviews
            .into_iter()
            .map(|review| review.id.0)
            .collect();
        assert_eq!(remaining, ["r-3"]);
    }

    #[tokio::test]
    async fn review_is_deleted_on_fifth_report() {
        let store = store();
        let service = service(&store);
        let id = ReviewId::from("r-3");

        for _ in 0..4 {
            assert!(!service.report_review(&id).await.expect("report").deleted);
        }
        let receipt = service.report_review(&id).await.expect("report");
        assert!(receipt.deleted);
        assert_eq!(
            receipt.message,
            "Review reported and deleted after reaching threshold"
        );
        assert!(service.report_review(&id).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reports_are_all_counted() {
        let store = store();
        let gate = Arc::new(ModerationGate::new(store.toilet_reports(), 1000));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..40 {
            let gate = Arc::clone(&gate);
            tasks.spawn(async move { gate.report("t-tanglin").await });
        }
        while let Some(joined) = tasks.join_next().await {
            assert!(!joined.expect("task").expect("report").deleted);
        }

        let tanglin = store
            .toilet(&ToiletId::from("t-tanglin"))
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(tanglin.report_count, 40);
    }

    #[tokio::test]
    async fn navigate_uses_the_stored_destination() {
        let store = store();
        let service = service(&store);
        let route = service
            .navigate(
                &ToiletId::from("t-changi"),
                &NavigateRequest {
                    latitude: 1.3600,
                    longitude: 103.9900,
                },
            )
            .await
            .expect("route");
        assert_eq!(
            route.end_location,
            Coordinate {
                latitude: 1.3564,
                longitude: 103.9866
            }
        );
        assert_eq!(route.distance, "640 meters");
        assert_eq!(route.duration, "8 min");
        assert_eq!(route.directions.len(), 1);

        let missing = service
            .navigate(
                &ToiletId::from("nope"),
                &NavigateRequest {
                    latitude: 1.36,
                    longitude: 103.99,
                },
            )
            .await;
        assert!(matches!(missing, Err(PortError::NotFound(..))));
    }

    #[test]
    fn seed_validation_rejects_bad_rows() {
        let bad_rating = r#"{"reviews":[{"id":"r","toiletId":"t","rating":9}]}"#;
        assert!(MemoryStore::new(Seed::from_json(bad_rating).expect("parses")).is_err());

        let bad_location = r#"{"toilets":[{"id":"t","name":"n","address":"a",
            "location":{"latitude":120.0,"longitude":0.0}}]}"#;
        assert!(MemoryStore::new(Seed::from_json(bad_location).expect("parses")).is_err());

        assert!(Seed::from_json("{not json").is_err());
    }

    #[test]
    fn relevance_counts_whole_tokens() {
        let query = tokenize("Orchard Road");
        assert!((relevance(&query, "437 Orchard Road") - 1.0).abs() < f64::EPSILON);
        assert!((relevance(&query, "163 Tanglin Road") - 0.5).abs() < f64::EPSILON);
        assert!(relevance(&query, "Orchardville").abs() < f64::EPSILON);
        assert!(relevance(&[], "anything").abs() < f64::EPSILON);
    }
}
