//! Turns provider directions into a compact, client-renderable walking route.

use std::sync::Arc;

use crate::format::{format_distance, format_duration, strip_html};
use crate::model::{Coordinate, EntityKind, RawDirections, RawStep, Route, RouteStep, ToiletId};
use crate::polyline;
use crate::ports::{DirectionsPort, PortError, ToiletStore};
use crate::simplify::simplify;
use crate::token::TokenCache;

/// Resolves a destination toilet, fetches walking directions and assembles a [`Route`].
///
/// The token fetch and the directions call run one after the other since the
/// latter needs the former's result. Nothing is retried here.
pub struct NavigationAssembler {
    store: Arc<dyn ToiletStore>,
    directions: Arc<dyn DirectionsPort>,
    tokens: Arc<TokenCache>,
    simplify_tolerance: f64,
}

impl NavigationAssembler {
    /// Assembler over the given ports.
    #[must_use]
    pub fn new(
        store: Arc<dyn ToiletStore>,
        directions: Arc<dyn DirectionsPort>,
        tokens: Arc<TokenCache>,
        simplify_tolerance: f64,
    ) -> Self {
        Self {
            store,
            directions,
            tokens,
            simplify_tolerance,
        }
    }

    /// Walking route from `origin` to the toilet `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotFound`] for an unknown toilet, [`PortError::NoRoute`]
    /// when the provider finds no route, or the provider's failure otherwise.
    pub async fn navigate(
        &self,
        origin: Coordinate,
        destination: &ToiletId,
    ) -> Result<Route, PortError> {
        let toilet = self
            .store
            .toilet(destination)
            .await?
            .ok_or_else(|| PortError::NotFound(EntityKind::Toilet, destination.0.clone()))?;

        let token = self.tokens.get_token().await?;
        let raw = self
            .directions
            .walking_directions(&token, origin, toilet.location)
            .await?;

        tracing::debug!(
            toilet_id = %destination,
            routes = raw.routes.len(),
            steps = raw.steps.len(),
            "directions received"
        );

        assemble_route(&raw, self.simplify_tolerance)
    }
}

/// Build a [`Route`] from the first candidate route of `raw`.
///
/// Each step keeps its full path as its own polyline; the overview joins all
/// step paths and simplifies them with `tolerance` before encoding.
///
/// # Errors
///
/// Returns [`PortError::NoRoute`] when `raw` holds no route or no usable
/// point, and [`PortError::Decode`] when a step references a missing step or path.
pub fn assemble_route(raw: &RawDirections, tolerance: f64) -> Result<Route, PortError> {
    let route = raw.routes.first().ok_or(PortError::NoRoute)?;

    let steps: Vec<&RawStep> = if route.step_indexes.is_empty() {
        raw.steps.iter().collect()
    } else {
        route
            .step_indexes
            .iter()
            .map(|&index| {
                raw.steps
                    .get(index)
                    .ok_or_else(|| PortError::Decode(format!("route references missing step {index}")))
            })
            .collect::<Result<_, _>>()?
    };

    let mut directions = Vec::with_capacity(steps.len());
    let mut overview = Vec::new();

    for step in steps {
        let path = raw.step_paths.get(step.step_path_index).ok_or_else(|| {
            PortError::Decode(format!(
                "step references missing path {}",
                step.step_path_index
            ))
        })?;
        let (Some(&start_location), Some(&end_location)) = (path.first(), path.last()) else {
            continue;
        };

        directions.push(RouteStep {
            distance: format_distance(step.distance_meters),
            duration: format_duration(step.duration_seconds),
            distance_meters: step.distance_meters,
            duration_seconds: step.duration_seconds,
            polyline: polyline::encode(path),
            start_location,
            end_location,
            instructions: strip_html(&step.instructions),
        });
        overview.extend_from_slice(path);
    }

    let start_location = overview
        .first()
        .copied()
        .or(raw.origin)
        .ok_or(PortError::NoRoute)?;
    let end_location = overview
        .last()
        .copied()
        .or(raw.destination)
        .ok_or(PortError::NoRoute)?;

    let simplified = simplify(&overview, tolerance, false);

    Ok(Route {
        overview_polyline: polyline::encode(&simplified),
        start_location,
        end_location,
        distance: format_distance(route.distance_meters),
        duration: format_duration(route.duration_seconds),
        directions,
    })
}
