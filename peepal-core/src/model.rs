//! Domain data structures for toilets, reviews, routes and provider tokens.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::PortError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// WGS-84 coordinate in degrees.
pub struct Coordinate {
    /// Latitude, within `[-90, 90]`.
    pub latitude: f64,
    /// Longitude, within `[-180, 180]`.
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting values outside the valid ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] naming the offending field.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, PortError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(PortError::invalid(
                "latitude",
                "must be a number between -90 and 90",
            ));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(PortError::invalid(
                "longitude",
                "must be a number between -180 and 180",
            ));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parse a coordinate from query-string values.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] when either value is not a number or out of range.
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self, PortError> {
        let lat = latitude
            .trim()
            .parse::<f64>()
            .map_err(|_err| PortError::invalid("latitude", "must be a number"))?;
        let lon = longitude
            .trim()
            .parse::<f64>()
            .map_err(|_err| PortError::invalid("longitude", "must be a number"))?;
        Self::new(lat, lon)
    }

    /// Re-check the range invariants of a deserialized coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] when a component is out of range.
    pub fn validated(self) -> Result<Self, PortError> {
        Self::new(self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{},{}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier for a toilet record.
pub struct ToiletId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier for a review record.
pub struct ReviewId(pub String);

impl fmt::Display for ToiletId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for ToiletId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<&str> for ReviewId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Kinds of records that can be reported.
pub enum EntityKind {
    /// A toilet listing.
    Toilet,
    /// A review attached to a toilet.
    Review,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Toilet => "Toilet",
            EntityKind::Review => "Review",
        };
        formatter.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
/// Attribute that may be known present, known absent, or not recorded at all.
///
/// Serialized as `true`, `false` or `null`.
pub enum TriState {
    /// No data recorded.
    #[default]
    Unknown,
    /// Known to be available.
    Yes,
    /// Known to be unavailable.
    No,
}

impl TriState {
    /// Whether a record with this value survives a filter asking for `wanted`.
    ///
    /// Unknown never excludes.
    #[must_use]
    pub const fn admits(self, wanted: bool) -> bool {
        match self {
            TriState::Unknown => true,
            TriState::Yes => wanted,
            TriState::No => !wanted,
        }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => TriState::Unknown,
            Some(true) => TriState::Yes,
            Some(false) => TriState::No,
        }
    }
}

impl From<TriState> for Option<bool> {
    fn from(value: TriState) -> Self {
        match value {
            TriState::Unknown => None,
            TriState::Yes => Some(true),
            TriState::No => Some(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Facilities a toilet may offer.
pub enum Amenity {
    /// Wheelchair accessible.
    Handicap,
    /// Bidet or bidet spray.
    Bidet,
    /// Shower.
    Shower,
    /// Hand sanitiser.
    Sanitiser,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Tri-state amenity flags of a toilet.
pub struct Amenities {
    /// Wheelchair access.
    #[serde(default)]
    pub handicap_avail: TriState,
    /// Bidet.
    #[serde(default)]
    pub bidet_avail: TriState,
    /// Shower.
    #[serde(default)]
    pub shower_avail: TriState,
    /// Hand sanitiser.
    #[serde(default)]
    pub sanitiser_avail: TriState,
}

impl Amenities {
    /// Value recorded for one amenity.
    #[must_use]
    pub const fn get(&self, amenity: Amenity) -> TriState {
        match amenity {
            Amenity::Handicap => self.handicap_avail,
            Amenity::Bidet => self.bidet_avail,
            Amenity::Shower => self.shower_avail,
            Amenity::Sanitiser => self.sanitiser_avail,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Caller-requested amenity values for a search.
pub struct AmenityFilter(BTreeMap<Amenity, bool>);

impl AmenityFilter {
    /// Filter that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a requirement for one amenity.
    #[must_use]
    pub fn require(mut self, amenity: Amenity, wanted: bool) -> Self {
        self.0.insert(amenity, wanted);
        self
    }

    /// Build a filter from the optional request flags.
    #[must_use]
    pub fn from_flags(
        handicap: Option<bool>,
        bidet: Option<bool>,
        shower: Option<bool>,
        sanitiser: Option<bool>,
    ) -> Self {
        [
            (Amenity::Handicap, handicap),
            (Amenity::Bidet, bidet),
            (Amenity::Shower, shower),
            (Amenity::Sanitiser, sanitiser),
        ]
        .into_iter()
        .filter_map(|(amenity, wanted)| wanted.map(|flag| (amenity, flag)))
        .fold(Self::new(), |filter, (amenity, flag)| {
            filter.require(amenity, flag)
        })
    }

    /// True when no amenity is constrained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a toilet with these amenities passes every requirement.
    #[must_use]
    pub fn admits(&self, amenities: &Amenities) -> bool {
        self.0
            .iter()
            .all(|(amenity, wanted)| amenities.get(*amenity).admits(*wanted))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A public toilet listing.
pub struct Toilet {
    /// Unique identifier.
    pub id: ToiletId,
    /// Display name.
    pub name: String,
    /// Street address, matched by search.
    pub address: String,
    /// Position of the entrance.
    pub location: Coordinate,
    /// Tri-state facility flags.
    #[serde(flatten)]
    pub amenities: Amenities,
    /// Reports received so far.
    #[serde(default)]
    pub report_count: u32,
    /// Average rating, two decimals.
    #[serde(default)]
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A user review of a toilet.
pub struct Review {
    /// Unique identifier.
    pub id: ReviewId,
    /// Toilet being reviewed.
    pub toilet_id: ToiletId,
    /// Star rating, 1 to 5.
    pub rating: u8,
    /// Free-form text.
    #[serde(default)]
    pub review_text: Option<String>,
    /// Reports received so far.
    #[serde(default)]
    pub report_count: u32,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Check the rating range.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] when the rating is outside 1..=5.
    pub fn validate(&self) -> Result<(), PortError> {
        if (1..=5).contains(&self.rating) {
            Ok(())
        } else {
            Err(PortError::invalid("rating", "must be an integer between 1 and 5"))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Toilet augmented with its walking-distance estimate in meters.
pub struct NearbyToilet {
    /// The listing.
    #[serde(flatten)]
    pub toilet: Toilet,
    /// Approximate walking distance, rounded to the meter.
    pub distance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Result of a moderation report.
pub struct ReportReceipt {
    /// Human-readable outcome.
    pub message: String,
    /// Whether the report removed the record.
    pub deleted: bool,
}

#[derive(Debug, Clone, Deserialize)]
/// Query parameters of a nearby lookup.
pub struct NearbyRequest {
    /// Latitude as sent on the query string.
    pub latitude: String,
    /// Longitude as sent on the query string.
    pub longitude: String,
    /// Search radius in kilometers.
    #[serde(default)]
    pub radius: Option<f64>,
    /// Maximum number of results.
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Body of a keyword search.
pub struct SearchRequest {
    /// Address text to look for.
    pub query: String,
    /// Caller latitude.
    pub latitude: f64,
    /// Caller longitude.
    pub longitude: f64,
    /// Wheelchair access wanted or refused.
    #[serde(default)]
    pub handicap_avail: Option<bool>,
    /// Bidet wanted or refused.
    #[serde(default)]
    pub bidet_avail: Option<bool>,
    /// Shower wanted or refused.
    #[serde(default)]
    pub shower_avail: Option<bool>,
    /// Sanitiser wanted or refused.
    #[serde(default)]
    pub sanitiser_avail: Option<bool>,
}

impl SearchRequest {
    /// Caller position.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] when the coordinates are out of range.
    pub fn origin(&self) -> Result<Coordinate, PortError> {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Amenity constraints carried by the request.
    #[must_use]
    pub fn filter(&self) -> AmenityFilter {
        AmenityFilter::from_flags(
            self.handicap_avail,
            self.bidet_avail,
            self.shower_avail,
            self.sanitiser_avail,
        )
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
/// Body of a navigation request: the walker's current position.
pub struct NavigateRequest {
    /// Origin latitude.
    pub latitude: f64,
    /// Origin longitude.
    pub longitude: f64,
}

impl NavigateRequest {
    /// Origin position.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidInput`] when the coordinates are out of range.
    pub fn origin(&self) -> Result<Coordinate, PortError> {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// One leg of a walking route.
pub struct RouteStep {
    /// Formatted distance, e.g. `"120 meters"`.
    pub distance: String,
    /// Formatted duration, e.g. `"2 min"`.
    pub duration: String,
    /// Raw distance from the provider.
    pub distance_meters: f64,
    /// Raw duration from the provider.
    pub duration_seconds: f64,
    /// Full-detail encoded path of the step.
    pub polyline: String,
    /// First point of the step path.
    pub start_location: Coordinate,
    /// Last point of the step path.
    pub end_location: Coordinate,
    /// Plain-text instruction.
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Client-renderable walking route.
pub struct Route {
    /// Simplified encoded path of the whole route.
    pub overview_polyline: String,
    /// Where the route starts.
    pub start_location: Coordinate,
    /// Where the route ends.
    pub end_location: Coordinate,
    /// Formatted total distance.
    pub distance: String,
    /// Formatted total duration.
    pub duration: String,
    /// Ordered steps.
    pub directions: Vec<RouteStep>,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Directions as returned by the provider, before assembly.
pub struct RawDirections {
    /// Snapped origin, when the provider reports one.
    pub origin: Option<Coordinate>,
    /// Snapped destination, when the provider reports one.
    pub destination: Option<Coordinate>,
    /// Candidate routes, best first.
    pub routes: Vec<RawRoute>,
    /// Steps shared by all routes.
    pub steps: Vec<RawStep>,
    /// Coordinate paths referenced by the steps.
    pub step_paths: Vec<Vec<Coordinate>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Candidate route summary.
pub struct RawRoute {
    /// Total distance.
    pub distance_meters: f64,
    /// Total duration.
    pub duration_seconds: f64,
    /// Indexes into [`RawDirections::steps`].
    pub step_indexes: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// A provider step referencing one of the step paths.
pub struct RawStep {
    /// Index into [`RawDirections::step_paths`].
    pub step_path_index: usize,
    /// Step distance.
    pub distance_meters: f64,
    /// Step duration.
    pub duration_seconds: f64,
    /// Instruction text, possibly with HTML markup.
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Token as handed out by the provider's token endpoint.
pub struct IssuedToken {
    /// Bearer value.
    pub access_token: String,
    /// Lifetime from issue.
    pub expires_in_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Cached bearer credential and the instant it stops being used.
pub struct ProviderToken {
    /// Bearer value.
    pub value: String,
    /// Instant after which the token is refreshed.
    pub expires_at: DateTime<Utc>,
}

impl ProviderToken {
    /// Whether the token may still be handed out at `now`.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tri_state_round_trips_through_nullable_json() {
        let amenities: Amenities =
            serde_json::from_str(r#"{"handicapAvail":true,"bidetAvail":false}"#)
                .expect("amenities parse");
        assert_eq!(amenities.handicap_avail, TriState::Yes);
        assert_eq!(amenities.bidet_avail, TriState::No);
        assert_eq!(amenities.shower_avail, TriState::Unknown);

        let json = serde_json::to_value(amenities).expect("amenities serialize");
        assert_eq!(json["showerAvail"], serde_json::Value::Null);
        assert_eq!(json["bidetAvail"], serde_json::Value::Bool(false));
    }

    #[test]
    fn unknown_never_excludes() {
        assert!(TriState::Unknown.admits(true));
        assert!(TriState::Unknown.admits(false));
        assert!(TriState::Yes.admits(true));
        assert!(!TriState::Yes.admits(false));
        assert!(!TriState::No.admits(true));
        assert!(TriState::No.admits(false));
    }

    #[test]
    fn filter_from_flags_skips_unset_entries() {
        let filter = AmenityFilter::from_flags(None, Some(true), None, None);
        let unknown = Amenities::default();
        let without_bidet = Amenities {
            bidet_avail: TriState::No,
            ..Amenities::default()
        };
        assert!(filter.admits(&unknown));
        assert!(!filter.admits(&without_bidet));
        assert!(AmenityFilter::from_flags(None, None, None, None).is_empty());
    }

    #[test]
    fn coordinates_are_range_checked() {
        assert!(Coordinate::new(1.35, 103.8).is_ok());
        assert!(Coordinate::new(91.0, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());

        let err = Coordinate::parse("north", "103.8").expect_err("non-numeric latitude");
        assert!(err.to_string().contains("latitude"));
        let parsed = Coordinate::parse(" 1.3 ", "103.8").expect("trimmed input parses");
        assert!((parsed.latitude - 1.3).abs() < f64::EPSILON);
    }

    #[test]
    fn toilet_parses_with_missing_optional_fields() {
        let toilet: Toilet = serde_json::from_str(
            r#"{"id":"7","name":"Block 5","address":"5 Tampines St",
                "location":{"latitude":1.35,"longitude":103.94},"showerAvail":true}"#,
        )
        .expect("toilet parse");
        assert_eq!(toilet.id, ToiletId::from("7"));
        assert_eq!(toilet.report_count, 0);
        assert_eq!(toilet.amenities.shower_avail, TriState::Yes);
        assert_eq!(toilet.amenities.bidet_avail, TriState::Unknown);
    }

    #[test]
    fn review_rating_must_be_one_to_five() {
        let mut review = Review {
            id: ReviewId::from("r1"),
            toilet_id: ToiletId::from("t1"),
            rating: 5,
            review_text: None,
            report_count: 0,
            created_at: Utc::now(),
        };
        assert!(review.validate().is_ok());
        review.rating = 0;
        assert!(review.validate().is_err());
        review.rating = 6;
        assert!(review.validate().is_err());
    }
}
