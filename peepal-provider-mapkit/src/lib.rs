//! Directions and token ports backed by the Apple Maps Server API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use peepal_core::{
    config::Config,
    model::{Coordinate, IssuedToken, RawDirections, RawRoute, RawStep},
    ports::{DirectionsPort, PortError, TokenPort},
};

/// Response from /token
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
    expires_in_seconds: i64,
}

/// Response from /directions
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DirectionsResponse {
    origin: Option<Place>,
    destination: Option<Place>,
    routes: Vec<RouteEntry>,
    steps: Vec<StepEntry>,
    step_paths: Vec<Vec<WireCoordinate>>,
}

#[derive(Debug, Deserialize)]
struct Place {
    coordinate: WireCoordinate,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct WireCoordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RouteEntry {
    distance_meters: f64,
    expected_travel_time_seconds: Option<f64>,
    duration_seconds: Option<f64>,
    step_indexes: Vec<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StepEntry {
    step_path_index: usize,
    distance_meters: f64,
    duration_seconds: f64,
    instructions: String,
}

impl From<WireCoordinate> for Coordinate {
    fn from(wire: WireCoordinate) -> Self {
        Self {
            latitude: wire.latitude,
            longitude: wire.longitude,
        }
    }
}

impl From<DirectionsResponse> for RawDirections {
    fn from(resp: DirectionsResponse) -> Self {
        Self {
            origin: resp.origin.map(|place| place.coordinate.into()),
            destination: resp.destination.map(|place| place.coordinate.into()),
            routes: resp
                .routes
                .into_iter()
                .map(|route| RawRoute {
                    distance_meters: route.distance_meters,
                    // the live API names it expectedTravelTimeSeconds
                    duration_seconds: route
                        .duration_seconds
                        .or(route.expected_travel_time_seconds)
                        .unwrap_or_default(),
                    step_indexes: route.step_indexes,
                })
                .collect(),
            steps: resp
                .steps
                .into_iter()
                .map(|step| RawStep {
                    step_path_index: step.step_path_index,
                    distance_meters: step.distance_meters,
                    duration_seconds: step.duration_seconds,
                    instructions: step.instructions,
                })
                .collect(),
            step_paths: resp
                .step_paths
                .into_iter()
                .map(|path| path.into_iter().map(Coordinate::from).collect())
                .collect(),
        }
    }
}

/// Exchanges the long-lived auth token for short-lived access tokens.
pub struct MapkitTokenPort {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl MapkitTokenPort {
    /// Create a token port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, base_url: &str, auth_token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            auth_token,
        }
    }
}

#[async_trait]
impl TokenPort for MapkitTokenPort {
    async fn issue_token(&self) -> Result<IssuedToken, PortError> {
        let auth_token = self
            .auth_token
            .as_deref()
            .ok_or_else(|| PortError::Upstream("no MapKit auth token configured".into()))?;

        let req = self
            .client
            .get(format!("{}/token", self.base_url))
            .bearer_auth(auth_token);
        let resp = fetch_json::<TokenResponse>(req).await?;

        tracing::debug!(expires_in = resp.expires_in_seconds, "issued MapKit access token");
        Ok(IssuedToken {
            access_token: resp.access_token,
            expires_in_seconds: resp.expires_in_seconds,
        })
    }
}

/// Walking directions from the /directions endpoint.
pub struct MapkitDirectionsPort {
    client: Client,
    base_url: String,
}

impl MapkitDirectionsPort {
    /// Create a directions port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// GET /directions?origin=lat,lon&destination=lat,lon&transportType=Walking
    fn request(&self, token: &str, origin: Coordinate, destination: Coordinate) -> RequestBuilder {
        let origin = origin.to_string();
        let destination = destination.to_string();

        self.client
            .get(format!("{}/directions", self.base_url))
            .query(&[
                ("origin", origin.as_str()),
                ("destination", destination.as_str()),
                ("transportType", "Walking"),
            ])
            .bearer_auth(token)
    }
}

#[async_trait]
impl DirectionsPort for MapkitDirectionsPort {
    async fn walking_directions(
        &self,
        token: &str,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RawDirections, PortError> {
        let req = self.request(token, origin, destination);
        let resp = fetch_json::<DirectionsResponse>(req).await?;
        Ok(resp.into())
    }
}

/// Provider-side ports of a [`peepal_core::Backend`].
pub struct MapkitPorts {
    /// Walking directions.
    pub directions: Arc<dyn DirectionsPort>,
    /// Access token issuer.
    pub tokens: Arc<dyn TokenPort>,
}

/// Build the MapKit ports for the configured endpoint and credential.
#[must_use]
pub fn ports(client: Client, config: &Config) -> MapkitPorts {
    let tokens = Arc::new(MapkitTokenPort::new(
        client.clone(),
        &config.mapkit_base_url,
        config.mapkit_auth_token.clone(),
    ));
    let directions = Arc::new(MapkitDirectionsPort::new(client, &config.mapkit_base_url));

    MapkitPorts { directions, tokens }
}

// Fetch and decode JSON; non-success statuses surface as upstream failures.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    let resp = req.send().await.map_err(PortError::from)?;

    let status = resp.status();
    if !status.is_success() {
        let path = resp.url().path().to_owned();
        return Err(PortError::Upstream(format!("{path} returned {status}")));
    }

    resp.json().await.map_err(|err| {
        if err.is_decode() {
            PortError::Decode(err.to_string())
        } else {
            PortError::from(err)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTIONS: &str = r#"{
        "origin": {"coordinate": {"latitude": 1.3000, "longitude": 103.8000}},
        "destination": {"coordinate": {"latitude": 1.3010, "longitude": 103.8010}},
        "routes": [
            {"name": "Orchard Rd", "distanceMeters": 240, "expectedTravelTimeSeconds": 190,
             "stepIndexes": [0, 1], "transportType": "Walking"}
        ],
        "steps": [
            {"stepPathIndex": 0, "distanceMeters": 110, "durationSeconds": 90,
             "instructions": "Head north"},
            {"stepPathIndex": 1, "distanceMeters": 130, "durationSeconds": 100,
             "instructions": "Turn right onto Orchard Rd"}
        ],
        "stepPaths": [
            [{"latitude": 1.3000, "longitude": 103.8000}, {"latitude": 1.3010, "longitude": 103.8000}],
            [{"latitude": 1.3010, "longitude": 103.8000}, {"latitude": 1.3010, "longitude": 103.8010}]
        ]
    }"#;

    #[test]
    fn directions_payload_maps_to_raw_directions() {
        let resp: DirectionsResponse = serde_json::from_str(DIRECTIONS).expect("payload parses");
        let raw = RawDirections::from(resp);

        assert_eq!(
            raw.origin,
            Some(Coordinate {
                latitude: 1.3,
                longitude: 103.8
            })
        );
        assert_eq!(raw.routes.len(), 1);
        assert_eq!(raw.routes[0].step_indexes, [0, 1]);
        assert!((raw.routes[0].duration_seconds - 190.0).abs() < f64::EPSILON);
        assert_eq!(raw.steps[1].instructions, "Turn right onto Orchard Rd");
        assert_eq!(raw.step_paths.len(), 2);
        assert_eq!(raw.step_paths[1].len(), 2);
    }

    #[test]
    fn payload_without_routes_assembles_to_no_route() {
        let resp: DirectionsResponse = serde_json::from_str("{}").expect("empty payload parses");
        let raw = RawDirections::from(resp);
        assert!(raw.routes.is_empty());
        assert!(matches!(
            peepal_core::navigation::assemble_route(&raw, 1e-4),
            Err(PortError::NoRoute)
        ));
    }

    #[test]
    fn token_payload_parses() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"accessToken":"abc","expiresInSeconds":1800}"#)
                .expect("token parses");
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_in_seconds, 1800);
    }

    #[test]
    fn directions_request_carries_points_mode_and_bearer() {
        let port = MapkitDirectionsPort::new(Client::new(), "https://maps.example/v1/");
        let origin = Coordinate {
            latitude: 1.3,
            longitude: 103.8,
        };
        let destination = Coordinate {
            latitude: -33.86,
            longitude: 151.2,
        };
        let req = port
            .request("access-1", origin, destination)
            .build()
            .expect("request builds");

        assert_eq!(req.method(), reqwest::Method::GET);
        assert_eq!(req.url().path(), "/v1/directions");
        let pairs: Vec<(String, String)> = req.url().query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            [
                ("origin".to_owned(), "1.3,103.8".to_owned()),
                ("destination".to_owned(), "-33.86,151.2".to_owned()),
                ("transportType".to_owned(), "Walking".to_owned()),
            ]
        );
        assert_eq!(
            req.headers()
                .get(reqwest::header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok()),
            Some("Bearer access-1")
        );
    }

    #[tokio::test]
    async fn missing_auth_token_fails_without_network() {
        let port = MapkitTokenPort::new(Client::new(), "http://127.0.0.1:9/v1/", None);
        assert_eq!(port.base_url, "http://127.0.0.1:9/v1");
        assert!(matches!(
            port.issue_token().await,
            Err(PortError::Upstream(_))
        ));
    }
}
