//! Runtime configuration with environment overrides.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ports::PortError;

/// Hard ceiling on the nearby search radius.
pub const MAX_RADIUS_KM: f64 = 5.0;
/// Results returned by a nearby lookup when the caller sets no limit.
pub const DEFAULT_NEARBY_LIMIT: usize = 5;
/// Results returned by a keyword search.
pub const SEARCH_LIMIT: usize = 6;
/// Straight-line to walking distance correction.
pub const WALKING_FACTOR: f64 = 1.4;
/// Overview path simplification tolerance, degrees.
pub const SIMPLIFY_TOLERANCE: f64 = 1e-4;
/// Seconds shaved off a provider token's lifetime.
pub const TOKEN_SAFETY_MARGIN_SECS: i64 = 60;
/// Reports after which a toilet is removed.
pub const TOILET_REPORT_THRESHOLD: u32 = 3;
/// Reports after which a review is removed.
pub const REVIEW_REPORT_THRESHOLD: u32 = 5;
/// Default directions provider endpoint.
pub const MAPKIT_BASE_URL: &str = "https://maps-api.apple.com/v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Tunables of the service.
pub struct Config {
    /// Reports after which a toilet is deleted.
    pub toilet_report_threshold: u32,
    /// Reports after which a review is deleted.
    pub review_report_threshold: u32,
    /// Radius ceiling in kilometers; never above [`MAX_RADIUS_KM`].
    pub max_radius_km: f64,
    /// Nearby result count when the caller sets none.
    pub default_nearby_limit: usize,
    /// Keyword search result cap.
    pub search_limit: usize,
    /// Straight-line to walking distance factor.
    pub walking_factor: f64,
    /// Overview simplification tolerance in degrees.
    pub simplify_tolerance: f64,
    /// Seconds subtracted from token lifetimes.
    pub token_safety_margin_secs: i64,
    /// Directions provider base URL.
    pub mapkit_base_url: String,
    /// Long-lived credential exchanged for access tokens.
    pub mapkit_auth_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            toilet_report_threshold: TOILET_REPORT_THRESHOLD,
            review_report_threshold: REVIEW_REPORT_THRESHOLD,
            max_radius_km: MAX_RADIUS_KM,
            default_nearby_limit: DEFAULT_NEARBY_LIMIT,
            search_limit: SEARCH_LIMIT,
            walking_factor: WALKING_FACTOR,
            simplify_tolerance: SIMPLIFY_TOLERANCE,
            token_safety_margin_secs: TOKEN_SAFETY_MARGIN_SECS,
            mapkit_base_url: MAPKIT_BASE_URL.to_owned(),
            mapkit_auth_token: None,
        }
    }
}

impl Config {
    /// Defaults overridden by `PEEPAL_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] naming a variable that does not parse
    /// or a value that fails validation.
    pub fn from_env() -> Result<Self, PortError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by values from `lookup`, keyed by variable name.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] as [`Config::from_env`] does.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PortError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = parse_var(&lookup, "PEEPAL_TOILET_REPORT_THRESHOLD")? {
            config.toilet_report_threshold = value;
        }
        if let Some(value) = parse_var(&lookup, "PEEPAL_REVIEW_REPORT_THRESHOLD")? {
            config.review_report_threshold = value;
        }
        if let Some(value) = parse_var(&lookup, "PEEPAL_NEARBY_LIMIT")? {
            config.default_nearby_limit = value;
        }
        if let Some(value) = parse_var(&lookup, "PEEPAL_SIMPLIFY_TOLERANCE")? {
            config.simplify_tolerance = value;
        }
        if let Some(url) = lookup("PEEPAL_MAPKIT_BASE_URL").filter(|url| !url.trim().is_empty()) {
            config.mapkit_base_url = url.trim().trim_end_matches('/').to_owned();
        }
        config.mapkit_auth_token = lookup("PEEPAL_MAPKIT_AUTH_TOKEN")
            .map(|token| token.trim().to_owned())
            .filter(|token| !token.is_empty());

        config.validated()
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] for the first offending field.
    pub fn validated(self) -> Result<Self, PortError> {
        if self.toilet_report_threshold == 0 {
            return Err(PortError::invalid(
                "toilet_report_threshold",
                "must be at least 1",
            ));
        }
        if self.review_report_threshold == 0 {
            return Err(PortError::invalid(
                "review_report_threshold",
                "must be at least 1",
            ));
        }
        if !(self.max_radius_km > 0.0 && self.max_radius_km <= MAX_RADIUS_KM) {
            return Err(PortError::invalid(
                "max_radius_km",
                format!("must be within (0, {MAX_RADIUS_KM}]"),
            ));
        }
        if self.default_nearby_limit == 0 || self.search_limit == 0 {
            return Err(PortError::invalid("limit", "must be at least 1"));
        }
        if !(self.simplify_tolerance.is_finite() && self.simplify_tolerance >= 0.0) {
            return Err(PortError::invalid(
                "simplify_tolerance",
                "must be a non-negative number",
            ));
        }
        Ok(self)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, PortError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_err| PortError::invalid(key, format!("cannot parse {raw:?}")))
        })
        .transpose()
}
