mod boundary;
pub mod broad_phase;
pub mod config;
pub mod dedup;
pub mod failure;
pub mod index;
pub mod intersect;
pub mod neighbors;
pub mod project;

// Re-export the public surface at crate root for convenience.
pub use broad_phase::{candidate_lists, candidates, cross_candidates, CandidatePair};
pub use config::{check_tolerance, HitSuppression, QueryConfig};
pub use dedup::{deduplicate, deduplicate_indices};
pub use failure::{Failure, FailureCode, QueryResult};
pub use index::{Region, SpatialIndex, Volume};
pub use intersect::{
    curve_curve, mesh_ray, surface_curve, Hit, IntersectionEngine, MeshRayHit, Parameter,
};
pub use neighbors::{nearest_neighbors, nearest_neighbors_with_distances, Neighbor};
pub use project::{closest_points, Projection};
