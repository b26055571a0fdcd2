//! Batched k-nearest-neighbor queries.

use geom_types::Point3d;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::failure::{Failure, QueryResult};
use crate::index::SpatialIndex;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Position in the search set.
    pub index: usize,
    pub distance: f64,
}

/// For every query point, the indices of its `k` nearest search points,
/// nearest first. Equidistant search points are ordered by ascending index.
pub fn nearest_neighbors(
    search: &[Point3d],
    queries: &[Point3d],
    k: usize,
) -> QueryResult<Vec<Vec<usize>>> {
    let rows = nearest_neighbors_with_distances(search, queries, k)?;
    Ok(rows
        .into_iter()
        .map(|row| row.into_iter().map(|n| n.index).collect())
        .collect())
}

/// [`nearest_neighbors`] with the Euclidean distance of every neighbor.
#[instrument(skip(search, queries), fields(search = search.len(), queries = queries.len()))]
pub fn nearest_neighbors_with_distances(
    search: &[Point3d],
    queries: &[Point3d],
    k: usize,
) -> QueryResult<Vec<Vec<Neighbor>>> {
    if search.is_empty() {
        return Err(Failure::empty_input("search points"));
    }
    if k == 0 || k > search.len() {
        return Err(Failure::invalid_k(k, search.len()));
    }
    if queries.is_empty() {
        return Err(Failure::empty_input("query points"));
    }

    let mut index = SpatialIndex::new();
    for (i, point) in search.iter().enumerate() {
        if !point.is_valid() {
            return Err(Failure::geometry_invalid("search point", i));
        }
        index.insert_point(*point, i)?;
    }

    let mut rows = Vec::with_capacity(queries.len());
    for (qi, query) in queries.iter().enumerate() {
        if !query.is_valid() {
            return Err(Failure::geometry_invalid("query point", qi));
        }
        rows.push(
            index
                .nearest(*query)
                .take(k)
                .map(|(index, distance)| Neighbor { index, distance })
                .collect(),
        );
    }

    debug!(k, height = index.height(), "nearest neighbors resolved");
    Ok(rows)
}
