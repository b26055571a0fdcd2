//! Greedy first-seen point deduplication.

use geom_types::Point3d;
use tracing::{debug, instrument};

use crate::config::check_tolerance;
use crate::failure::{Failure, QueryResult};
use crate::index::{Region, SpatialIndex};

/// Collapse points within `tolerance` of an earlier kept point.
///
/// Points are visited in input order. A point is kept unless it lies within
/// `tolerance` (inclusive) of a point already kept. Non-finite points are
/// dropped. The result is not transitively closed: a chain of points each
/// within tolerance of the next may keep several of them.
pub fn deduplicate(points: &[Point3d], tolerance: f64) -> QueryResult<Vec<Point3d>> {
    let kept = deduplicate_indices(points, tolerance)?;
    Ok(kept.into_iter().map(|i| points[i]).collect())
}

/// Like [`deduplicate`], but returns the input positions of the kept points.
#[instrument(skip(points), fields(count = points.len()))]
pub fn deduplicate_indices(points: &[Point3d], tolerance: f64) -> QueryResult<Vec<usize>> {
    if points.is_empty() {
        return Err(Failure::empty_input("points"));
    }
    let tolerance = check_tolerance(tolerance)?;

    let mut index = SpatialIndex::new();
    let mut kept = Vec::new();
    let mut dropped_invalid = 0usize;

    for (i, point) in points.iter().enumerate() {
        if !point.is_valid() {
            dropped_invalid += 1;
            continue;
        }
        if index.query(Region::sphere(*point, tolerance)).next().is_some() {
            continue;
        }
        index.insert_point(*point, i)?;
        kept.push(i);
    }

    debug!(
        kept = kept.len(),
        merged = points.len() - kept.len() - dropped_invalid,
        dropped_invalid,
        "deduplicated points"
    );
    Ok(kept)
}
