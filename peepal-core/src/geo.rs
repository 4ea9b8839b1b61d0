//! Distance utilities on the WGS-84 ellipsoid.

use crate::model::Coordinate;

/// Semi-major axis of the WGS-84 ellipsoid, meters.
pub const WGS84_SEMI_MAJOR_M: f64 = 6_378_137.0;
/// Flattening of the WGS-84 ellipsoid.
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;
/// Semi-minor axis of the WGS-84 ellipsoid, meters.
pub const WGS84_SEMI_MINOR_M: f64 = WGS84_SEMI_MAJOR_M * (1.0 - WGS84_FLATTENING);
/// Mean earth radius used by the spherical fallback, meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

const VINCENTY_MAX_ITERATIONS: usize = 200;
const VINCENTY_CONVERGENCE: f64 = 1e-12;

/// Surface distance in meters between two points on the ellipsoid.
///
/// Uses Vincenty's inverse formula and falls back to the haversine
/// distance for antipodal and nearly antipodal points where the iteration has no answer.
#[must_use]
pub fn geography_distance(from: Coordinate, to: Coordinate) -> f64 {
    vincenty_distance(from, to).unwrap_or_else(|| haversine_distance(from, to))
}

/// Great-circle distance in meters on a sphere of radius [`EARTH_RADIUS_M`].
#[must_use]
pub fn haversine_distance(from: Coordinate, to: Coordinate) -> f64 {
    let phi_from = from.latitude.to_radians();
    let phi_to = to.latitude.to_radians();
    let delta_phi = (to.latitude - from.latitude).to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let half_chord = (delta_phi / 2.0).sin().powi(2)
        + phi_from.cos() * phi_to.cos() * (delta_lambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * half_chord.min(1.0).sqrt().asin()
}

/// Vincenty inverse solution; `None` for antipodal points or when the iteration fails to converge.
#[must_use]
pub fn vincenty_distance(from: Coordinate, to: Coordinate) -> Option<f64> {
    let flattening = WGS84_FLATTENING;
    let lon_delta = (to.longitude - from.longitude).to_radians();
    let reduced_from = ((1.0 - flattening) * from.latitude.to_radians().tan()).atan();
    let reduced_to = ((1.0 - flattening) * to.latitude.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = reduced_from.sin_cos();
    let (sin_u2, cos_u2) = reduced_to.sin_cos();

    let mut lambda = lon_delta;
    for _ in 0..VINCENTY_MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        if sin_sigma.abs() < f64::EPSILON {
            // coincident when cos_sigma is +1, antipodal when it is -1
            return (cos_sigma > 0.0).then_some(0.0);
        }
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // equatorial line: cos_sq_alpha is zero
        let cos_2sigma_m = if cos_sq_alpha.abs() < f64::EPSILON {
            0.0
        } else {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        };
        let correction =
            flattening / 16.0 * cos_sq_alpha * (4.0 + flattening * (4.0 - 3.0 * cos_sq_alpha));

        let previous = lambda;
        lambda = lon_delta
            + (1.0 - correction)
                * flattening
                * sin_alpha
                * (sigma
                    + correction
                        * sin_sigma
                        * (cos_2sigma_m
                            + correction * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

        if (lambda - previous).abs() < VINCENTY_CONVERGENCE {
            let axis_sq = WGS84_SEMI_MAJOR_M.powi(2);
            let minor_sq = WGS84_SEMI_MINOR_M.powi(2);
            let u_sq = cos_sq_alpha * (axis_sq - minor_sq) / minor_sq;
            let coeff_a =
                1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let coeff_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = coeff_b
                * sin_sigma
                * (cos_2sigma_m
                    + coeff_b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                            - coeff_b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma.powi(2))
                                * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));
            return Some(WGS84_SEMI_MINOR_M * coeff_a * (sigma - delta_sigma));
        }
    }

    None
}

/// Clamp a requested search radius to `[0, ceiling_km]`.
///
/// Missing or non-finite input yields the ceiling.
#[must_use]
pub fn clamp_radius_km(requested: Option<f64>, ceiling_km: f64) -> f64 {
    match requested {
        Some(radius) if radius.is_finite() => radius.clamp(0.0, ceiling_km),
        _ => ceiling_km,
    }
}

/// Straight-line meters scaled to an approximate walking distance, rounded.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "distance is finite and non-negative"
)]
pub fn walking_distance_m(straight_line_m: f64, factor: f64) -> u64 {
    (straight_line_m.max(0.0) * factor).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate {
            latitude,
            longitude,
        }
    }

    #[test]
    fn vincenty_matches_reference_geodesic() {
        // Flinders Peak to Buninyong, 54 972.271 m
        let flinders = point(-37.951_033_417, 144.424_867_889);
        let buninyong = point(-37.652_821_139, 143.926_495_528);
        let distance = vincenty_distance(flinders, buninyong).expect("converges");
        assert!((distance - 54_972.271).abs() < 0.5, "got {distance}");
    }

    #[test]
    fn coincident_points_are_zero_apart() {
        let here = point(1.3521, 103.8198);
        assert!(geography_distance(here, here).abs() < f64::EPSILON);
    }

    #[test]
    fn haversine_stays_close_to_ellipsoid_at_city_scale() {
        let orchard = point(1.3048, 103.8318);
        let changi = point(1.3644, 103.9915);
        let ellipsoid = geography_distance(orchard, changi);
        let sphere = haversine_distance(orchard, changi);
        assert!((ellipsoid - sphere).abs() / ellipsoid < 0.005);
        assert!(ellipsoid > 18_000.0 && ellipsoid < 19_500.0, "got {ellipsoid}");
    }

    #[test]
    fn antipodal_points_still_yield_a_distance() {
        let distance = geography_distance(point(0.0, 0.0), point(0.0, 180.0));
        assert!(distance > 19_900_000.0 && distance < 20_100_000.0);

        let skewed = point(10.0, 20.0);
        let opposite = point(-10.0, -160.0);
        assert_eq!(vincenty_distance(skewed, opposite), None);
        assert!(geography_distance(skewed, opposite) > 19_900_000.0);
    }

    #[test]
    fn radius_is_clamped_to_ceiling() {
        assert!((clamp_radius_km(Some(100.0), 5.0) - 5.0).abs() < f64::EPSILON);
        assert!((clamp_radius_km(Some(2.5), 5.0) - 2.5).abs() < f64::EPSILON);
        assert!(clamp_radius_km(Some(-1.0), 5.0).abs() < f64::EPSILON);
        assert!((clamp_radius_km(None, 5.0) - 5.0).abs() < f64::EPSILON);
        assert!((clamp_radius_km(Some(f64::NAN), 5.0) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn walking_distance_scales_then_rounds() {
        assert_eq!(walking_distance_m(100.0, 1.4), 140);
        assert_eq!(walking_distance_m(0.4, 1.4), 1);
        assert_eq!(walking_distance_m(-3.0, 1.4), 0);
    }
}
