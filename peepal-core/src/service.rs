//! High-level service facade combining search, moderation and navigation.

use std::sync::Arc;

use crate::backend::Backend;
use crate::config::Config;
use crate::model::{
    Coordinate, EntityKind, NavigateRequest, NearbyRequest, NearbyToilet, ReportReceipt,
    ReviewId, Route, SearchRequest, Toilet, ToiletId,
};
use crate::moderation::ModerationGate;
use crate::navigation::NavigationAssembler;
use crate::planner::SpatialQueryPlanner;
use crate::ports::{PortError, ToiletStore};
use crate::ranking::RankingEngine;
use crate::token::TokenCache;

/// Public entry point for nearby lookups, keyword search, reports and navigation.
pub struct PeepalService {
    store: Arc<dyn ToiletStore>,
    planner: SpatialQueryPlanner,
    ranking: RankingEngine,
    toilet_gate: ModerationGate,
    review_gate: ModerationGate,
    navigator: NavigationAssembler,
}

impl PeepalService {
    /// Wire the service over `backend` with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the configuration is out of range or the
    /// backend's counters are swapped.
    pub fn new(config: &Config, backend: Backend) -> Result<Self, PortError> {
        let config = config.clone().validated()?;
        let backend = backend.validated()?;

        let tokens = Arc::new(TokenCache::new(
            backend.tokens,
            config.token_safety_margin_secs,
        ));
        let navigator = NavigationAssembler::new(
            Arc::clone(&backend.toilets),
            backend.directions,
            tokens,
            config.simplify_tolerance,
        );

        Ok(Self {
            store: backend.toilets,
            planner: SpatialQueryPlanner::new(&config),
            ranking: RankingEngine::new(&config),
            toilet_gate: ModerationGate::new(
                backend.toilet_reports,
                config.toilet_report_threshold,
            ),
            review_gate: ModerationGate::new(
                backend.review_reports,
                config.review_report_threshold,
            ),
            navigator,
        })
    }

    /// Toilets closest to the requested point, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] for malformed coordinates or a zero
    /// limit, or the store's error.
    pub async fn nearby(&self, request: &NearbyRequest) -> Result<Vec<NearbyToilet>, PortError> {
        let origin = Coordinate::parse(&request.latitude, &request.longitude)?;
        let plan = self
            .planner
            .plan_nearby(origin, request.radius, request.limit)?;
        let results = self.planner.nearby(self.store.as_ref(), &plan).await?;
        tracing::info!(
            %origin,
            radius_m = plan.radius_m,
            results = results.len(),
            "nearby toilets fetched"
        );
        Ok(results)
    }

    /// Toilets whose address matches the query, best match first.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] for out-of-range coordinates, or the
    /// store's error.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<NearbyToilet>, PortError> {
        let origin = request.origin()?;
        if request.query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let plan = self.planner.plan_text(&request.query, origin);
        let results = self
            .ranking
            .search(self.store.as_ref(), &plan, &request.filter())
            .await?;
        tracing::info!(query = %plan.raw, results = results.len(), "toilets searched");
        Ok(results)
    }

    /// Full record of one toilet.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotFound`] for an unknown id, or the store's error.
    pub async fn details(&self, id: &ToiletId) -> Result<Toilet, PortError> {
        self.store
            .toilet(id)
            .await?
            .ok_or_else(|| PortError::NotFound(EntityKind::Toilet, id.0.clone()))
    }

    /// Report a toilet; it is deleted once the toilet threshold is reached.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotFound`] for an unknown id, or the store's error.
    pub async fn report_toilet(&self, id: &ToiletId) -> Result<ReportReceipt, PortError> {
        self.toilet_gate.report(&id.0).await
    }

    /// Report a review; it is deleted once the review threshold is reached.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotFound`] for an unknown id, or the store's error.
    pub async fn report_review(&self, id: &ReviewId) -> Result<ReportReceipt, PortError> {
        self.review_gate.report(&id.0).await
    }

    /// Walking route from the request's position to a toilet.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] for bad coordinates,
    /// [`PortError::NotFound`] for an unknown toilet, [`PortError::NoRoute`] when
    /// the provider has no route, or the provider's failure.
    pub async fn navigate(
        &self,
        destination: &ToiletId,
        request: &NavigateRequest,
    ) -> Result<Route, PortError> {
        let origin = request.origin()?;
        let route = self.navigator.navigate(origin, destination).await?;
        tracing::info!(
            toilet_id = %destination,
            steps = route.directions.len(),
            distance = %route.distance,
            "route assembled"
        );
        Ok(route)
    }
}
