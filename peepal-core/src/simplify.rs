//! Path simplification: radial-distance pre-pass followed by Douglas-Peucker.
//!
//! Distances are planar in degrees, which is adequate at walking-route scale.

use crate::model::Coordinate;

/// Reduce `points` while keeping every dropped point within `tolerance` degrees
/// of the simplified line.
///
/// With `high_quality` unset a cheap radial-distance pass runs first, which
/// drops clustered points before the Douglas-Peucker pass. The first and
/// last points are always kept.
#[must_use]
pub fn simplify(points: &[Coordinate], tolerance: f64, high_quality: bool) -> Vec<Coordinate> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let sq_tolerance = tolerance * tolerance;
    let reduced = if high_quality {
        points.to_vec()
    } else {
        radial_distance(points, sq_tolerance)
    };

    douglas_peucker(&reduced, sq_tolerance)
}

fn sq_distance(left: Coordinate, right: Coordinate) -> f64 {
    let dx = left.latitude - right.latitude;
    let dy = left.longitude - right.longitude;
    dx * dx + dy * dy
}

/// Squared distance from `point` to the segment `start..end`.
fn sq_segment_distance(point: Coordinate, start: Coordinate, end: Coordinate) -> f64 {
    let mut x = start.latitude;
    let mut y = start.longitude;
    let dx = end.latitude - x;
    let dy = end.longitude - y;

    let length_sq = dx * dx + dy * dy;
    if length_sq > 0.0 {
        let along = ((point.latitude - x) * dx + (point.longitude - y) * dy) / length_sq;
        if along > 1.0 {
            x = end.latitude;
            y = end.longitude;
        } else if along > 0.0 {
            x += dx * along;
            y += dy * along;
        }
    }

    let dx = point.latitude - x;
    let dy = point.longitude - y;
    dx * dx + dy * dy
}

fn radial_distance(points: &[Coordinate], sq_tolerance: f64) -> Vec<Coordinate> {
    let Some((&first, rest)) = points.split_first() else {
        return Vec::new();
    };

    let mut kept = vec![first];
    let mut anchor = first;
    let mut anchor_is_last = true;

    for &point in rest {
        if sq_distance(point, anchor) > sq_tolerance {
            kept.push(point);
            anchor = point;
            anchor_is_last = true;
        } else {
            anchor_is_last = false;
        }
    }

    if !anchor_is_last
        && let Some(&last) = rest.last()
    {
        kept.push(last);
    }

    kept
}

fn douglas_peucker(points: &[Coordinate], sq_tolerance: f64) -> Vec<Coordinate> {
    let last_index = points.len().saturating_sub(1);
    let mut keep = vec![false; points.len()];
    if let Some(flag) = keep.first_mut() {
        *flag = true;
    }
    if let Some(flag) = keep.last_mut() {
        *flag = true;
    }

    let mut ranges = vec![(0_usize, last_index)];
    while let Some((first, last)) = ranges.pop() {
        let (Some(&start), Some(&end)) = (points.get(first), points.get(last)) else {
            continue;
        };

        let mut max_sq_distance = sq_tolerance;
        let mut split = None;
        for (offset, &point) in points.iter().enumerate().take(last).skip(first + 1) {
            let distance = sq_segment_distance(point, start, end);
            if distance > max_sq_distance {
                max_sq_distance = distance;
                split = Some(offset);
            }
        }

        if let Some(index) = split {
            if let Some(flag) = keep.get_mut(index) {
                *flag = true;
            }
            if index - first > 1 {
                ranges.push((first, index));
            }
            if last - index > 1 {
                ranges.push((index, last));
            }
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(&point, kept)| kept.then_some(point))
        .collect()
}
