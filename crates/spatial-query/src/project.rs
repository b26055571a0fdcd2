//! Closest-point projection of query points onto a curve set.

use geom_oracle::GeometryOracle;
use geom_types::Point3d;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::boundary::{curve_bounds, guarded};
use crate::failure::{Failure, QueryResult};
use crate::index::SpatialIndex;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub query_index: usize,
    /// The curve holding the closest point. Ties go to the lower index.
    pub curve_index: usize,
    pub point: Point3d,
    pub parameter: f64,
    pub distance: f64,
}

/// Project every point onto the nearest of `curves`.
///
/// Curves are visited in ascending bounding-box distance; the walk stops once
/// a box is farther away than the best projection found.
#[instrument(skip_all, fields(curves = curves.len(), points = points.len()))]
pub fn closest_points<O: GeometryOracle>(
    oracle: &O,
    curves: &[O::Curve],
    points: &[Point3d],
) -> QueryResult<Vec<Projection>> {
    if curves.is_empty() {
        return Err(Failure::empty_input("curves"));
    }
    if points.is_empty() {
        return Err(Failure::empty_input("points"));
    }
    let boxes = curve_bounds(oracle, curves)?;
    let mut index = SpatialIndex::new();
    for (i, bounds) in boxes.iter().enumerate() {
        index.insert_box(*bounds, i)?;
    }

    let mut projections = Vec::with_capacity(points.len());
    let mut kernel_calls = 0usize;
    for (qi, point) in points.iter().enumerate() {
        if !point.is_valid() {
            return Err(Failure::geometry_invalid("query point", qi));
        }

        let mut best: Option<Projection> = None;
        for (ci, box_distance) in index.nearest(*point) {
            if best.is_some_and(|b| box_distance > b.distance) {
                break;
            }
            let found = guarded("closest_point_on_curve", &[ci, qi], || {
                oracle.closest_point_on_curve(&curves[ci], point)
            })?;
            kernel_calls += 1;
            let distance = found.point.distance_to(point);
            let better = match best {
                None => true,
                Some(b) => distance < b.distance || (distance == b.distance && ci < b.curve_index),
            };
            if better {
                best = Some(Projection {
                    query_index: qi,
                    curve_index: ci,
                    point: found.point,
                    parameter: found.t,
                    distance,
                });
            }
        }

        match best {
            Some(projection) => projections.push(projection),
            None => return Err(Failure::empty_input("indexed curves")),
        }
    }

    debug!(kernel_calls, "projected points onto curves");
    Ok(projections)
}
