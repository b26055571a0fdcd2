//! Intersection orchestration: broad phase, kernel narrow phase, duplicate
//! hit suppression.

use std::collections::HashSet;

use geom_oracle::GeometryOracle;
use geom_types::{Point3d, Ray};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::boundary::{curve_bounds, guarded, surface_bounds};
use crate::broad_phase::{candidates, cross_candidates};
use crate::config::{HitSuppression, QueryConfig};
use crate::dedup::{deduplicate, deduplicate_indices};
use crate::failure::{Failure, QueryResult};

// ─── Results ────────────────────────────────────────────────────────────────

/// Where on a primitive a hit lies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Parameter {
    Curve(f64),
    Surface { u: f64, v: f64 },
}

/// One intersection event between primitive `index_a` and `index_b`.
///
/// For curve/curve hits both indices address the curve list and
/// `index_a <= index_b`; equal indices mark a self-intersection. For
/// surface/curve hits `index_a` addresses the surfaces and `index_b` the
/// curves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub point: Point3d,
    pub index_a: usize,
    pub index_b: usize,
    pub param_a: Parameter,
    pub param_b: Option<Parameter>,
    /// Part of an overlapping (coincident) stretch rather than a crossing.
    pub overlap: bool,
}

/// Outcome of casting one ray at a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshRayHit {
    pub ray_index: usize,
    pub hit: bool,
    /// `Point3d::UNSET` on a miss.
    pub point: Point3d,
    /// Ray parameter of the hit; NaN on a miss.
    pub parameter: f64,
    pub face: Option<usize>,
}

impl MeshRayHit {
    pub fn miss(ray_index: usize) -> Self {
        Self {
            ray_index,
            hit: false,
            point: Point3d::UNSET,
            parameter: f64::NAN,
            face: None,
        }
    }
}

// ─── Engine ─────────────────────────────────────────────────────────────────

/// Runs intersection queries against one kernel with one configuration.
pub struct IntersectionEngine<'o, O: GeometryOracle> {
    oracle: &'o O,
    config: QueryConfig,
}

impl<'o, O: GeometryOracle> IntersectionEngine<'o, O> {
    pub fn new(oracle: &'o O, config: QueryConfig) -> Self {
        Self { oracle, config }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// All intersections among `curves`.
    ///
    /// Only pairs whose tolerance-inflated bounds overlap reach the kernel.
    /// With `include_self`, each curve's self-intersections are computed too.
    /// Hits come out in ascending pair order `(i, j)`, a self pair `(i, i)`
    /// before `(i, j > i)`, kernel order within a pair, then duplicates are
    /// suppressed per the configured policy.
    #[instrument(skip(self, curves), fields(count = curves.len()))]
    pub fn curve_curve(&self, curves: &[O::Curve], include_self: bool) -> QueryResult<Vec<Hit>> {
        let tolerance = self.config.resolve()?;
        if curves.is_empty() {
            return Err(Failure::empty_input("curves"));
        }
        let boxes = curve_bounds(self.oracle, curves)?;
        let pairs = candidates(&boxes, tolerance.absolute, include_self)?;

        let mut hits = Vec::new();
        for pair in &pairs {
            let (i, j) = (pair.i, pair.j);
            let events = if pair.is_self() {
                guarded("intersect_curve_self", &[i], || {
                    self.oracle.intersect_curve_self(&curves[i], &tolerance)
                })?
            } else {
                guarded("intersect_curves", &[i, j], || {
                    self.oracle.intersect_curves(&curves[i], &curves[j], &tolerance)
                })?
            };
            hits.extend(events.into_iter().map(|e| Hit {
                point: e.point,
                index_a: i,
                index_b: j,
                param_a: Parameter::Curve(e.t_a),
                param_b: Some(Parameter::Curve(e.t_b)),
                overlap: e.overlap,
            }));
        }

        let raw = hits.len();
        let hits = suppress_duplicates(hits, tolerance.absolute, self.config.hit_suppression)?;
        info!(
            candidates = pairs.len(),
            raw_hits = raw,
            hits = hits.len(),
            "curve/curve intersection complete"
        );
        Ok(hits)
    }

    /// All intersections between every surface and every curve. Hits are
    /// ordered by `(surface, curve)` pair, kernel order within a pair.
    #[instrument(skip(self, surfaces, curves), fields(surfaces = surfaces.len(), curves = curves.len()))]
    pub fn surface_curve(
        &self,
        surfaces: &[O::Surface],
        curves: &[O::Curve],
    ) -> QueryResult<Vec<Hit>> {
        let tolerance = self.config.resolve()?;
        if surfaces.is_empty() {
            return Err(Failure::empty_input("surfaces"));
        }
        if curves.is_empty() {
            return Err(Failure::empty_input("curves"));
        }
        let surface_boxes = surface_bounds(self.oracle, surfaces)?;
        let curve_boxes = curve_bounds(self.oracle, curves)?;
        let pairs = cross_candidates(&surface_boxes, &curve_boxes, tolerance.absolute)?;

        let mut hits = Vec::new();
        for pair in &pairs {
            let (s, c) = (pair.i, pair.j);
            let events = guarded("intersect_curve_surface", &[s, c], || {
                self.oracle
                    .intersect_curve_surface(&curves[c], &surfaces[s], &tolerance)
            })?;
            hits.extend(events.into_iter().map(|e| Hit {
                point: e.point,
                index_a: s,
                index_b: c,
                param_a: Parameter::Surface { u: e.u, v: e.v },
                param_b: Some(Parameter::Curve(e.t)),
                overlap: e.overlap,
            }));
        }

        let raw = hits.len();
        let hits = suppress_duplicates(hits, tolerance.absolute, self.config.hit_suppression)?;
        info!(
            candidates = pairs.len(),
            raw_hits = raw,
            hits = hits.len(),
            "surface/curve intersection complete"
        );
        Ok(hits)
    }

    /// The nearest hit of every ray on `mesh`, one result per ray in input
    /// order. A ray that misses yields [`MeshRayHit::miss`].
    #[instrument(skip(self, mesh, rays), fields(rays = rays.len()))]
    pub fn mesh_ray(&self, mesh: &O::Mesh, rays: &[Ray]) -> QueryResult<Vec<MeshRayHit>> {
        if !guarded("mesh_is_valid", &[0], || Ok(self.oracle.mesh_is_valid(mesh)))? {
            return Err(Failure::geometry_invalid("mesh", 0));
        }
        if rays.is_empty() {
            return Err(Failure::empty_input("rays"));
        }
        if let Some(bad) = rays.iter().position(|r| !r.is_valid()) {
            return Err(Failure::geometry_invalid("ray", bad));
        }

        let mut results = Vec::with_capacity(rays.len());
        for (i, ray) in rays.iter().enumerate() {
            let event = guarded("intersect_mesh_ray", &[i], || {
                self.oracle.intersect_mesh_ray(mesh, ray)
            })?;
            results.push(match event {
                Some(e) => MeshRayHit {
                    ray_index: i,
                    hit: true,
                    point: e.point,
                    parameter: e.t,
                    face: Some(e.face),
                },
                None => MeshRayHit::miss(i),
            });
        }

        info!(
            rays = rays.len(),
            hits = results.iter().filter(|r| r.hit).count(),
            "mesh/ray intersection complete"
        );
        Ok(results)
    }
}

// ─── Convenience Entry Points ───────────────────────────────────────────────

pub fn curve_curve<O: GeometryOracle>(
    oracle: &O,
    curves: &[O::Curve],
    tolerance: f64,
    include_self: bool,
) -> QueryResult<Vec<Hit>> {
    IntersectionEngine::new(oracle, QueryConfig::with_tolerance(tolerance))
        .curve_curve(curves, include_self)
}

pub fn surface_curve<O: GeometryOracle>(
    oracle: &O,
    surfaces: &[O::Surface],
    curves: &[O::Curve],
    tolerance: f64,
) -> QueryResult<Vec<Hit>> {
    IntersectionEngine::new(oracle, QueryConfig::with_tolerance(tolerance))
        .surface_curve(surfaces, curves)
}

pub fn mesh_ray<O: GeometryOracle>(
    oracle: &O,
    mesh: &O::Mesh,
    rays: &[Ray],
) -> QueryResult<Vec<MeshRayHit>> {
    IntersectionEngine::new(oracle, QueryConfig::default()).mesh_ray(mesh, rays)
}

// ─── Duplicate Suppression ──────────────────────────────────────────────────

/// Bit pattern of a point with `-0.0` folded into `0.0`, so that the set
/// lookup agrees with `==` on finite coordinates.
fn point_key(p: &Point3d) -> [u64; 3] {
    [
        (p.x + 0.0).to_bits(),
        (p.y + 0.0).to_bits(),
        (p.z + 0.0).to_bits(),
    ]
}

fn suppress_duplicates(
    hits: Vec<Hit>,
    tolerance: f64,
    mode: HitSuppression,
) -> QueryResult<Vec<Hit>> {
    if hits.is_empty() {
        return Ok(hits);
    }
    let points: Vec<Point3d> = hits.iter().map(|h| h.point).collect();
    let before = hits.len();

    let kept: Vec<Hit> = match mode {
        HitSuppression::FirstPerCluster => deduplicate_indices(&points, tolerance)?
            .into_iter()
            .map(|i| hits[i])
            .collect(),
        HitSuppression::ExactMembership => {
            let representatives: HashSet<[u64; 3]> = deduplicate(&points, tolerance)?
                .iter()
                .map(point_key)
                .collect();
            hits.into_iter()
                .filter(|h| representatives.contains(&point_key(&h.point)))
                .collect()
        }
    };

    debug!(before, after = kept.len(), ?mode, "suppressed duplicate hits");
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_at(x: f64, index_a: usize, index_b: usize) -> Hit {
        Hit {
            point: Point3d::new(x, 0.0, 0.0),
            index_a,
            index_b,
            param_a: Parameter::Curve(0.0),
            param_b: Some(Parameter::Curve(0.0)),
            overlap: false,
        }
    }

    #[test]
    fn test_first_per_cluster_keeps_first_emitted() {
        let hits = vec![hit_at(0.0, 0, 1), hit_at(1e-9, 0, 2), hit_at(0.0, 1, 2), hit_at(5.0, 2, 3)];
        let kept = suppress_duplicates(hits, 1e-6, HitSuppression::FirstPerCluster).unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!((kept[0].index_a, kept[0].index_b), (0, 1));
        assert_eq!((kept[1].index_a, kept[1].index_b), (2, 3));
    }

    #[test]
    fn test_exact_membership_keeps_exact_copies() {
        let hits = vec![hit_at(0.0, 0, 1), hit_at(1e-9, 0, 2), hit_at(0.0, 1, 2), hit_at(5.0, 2, 3)];
        let kept = suppress_duplicates(hits, 1e-6, HitSuppression::ExactMembership).unwrap();
        // The near-duplicate at 1e-9 goes, both exact copies of 0.0 stay.
        let pairs: Vec<_> = kept.iter().map(|h| (h.index_a, h.index_b)).collect();
        assert_eq!(pairs, vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_signed_zero_is_the_same_point() {
        assert_eq!(point_key(&Point3d::new(-0.0, 0.0, 0.0)), point_key(&Point3d::ORIGIN));
    }

    #[test]
    fn test_empty_hits_pass_through() {
        assert!(suppress_duplicates(Vec::new(), 1e-6, HitSuppression::FirstPerCluster)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_miss_record() {
        let miss = MeshRayHit::miss(3);
        assert!(!miss.hit);
        assert!(!miss.point.is_valid());
        assert!(miss.parameter.is_nan());
        assert_eq!(miss.face, None);
    }
}
