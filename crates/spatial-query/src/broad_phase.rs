//! Broad phase: candidate pairs whose tolerance-inflated boxes overlap.
//!
//! Every box is grown by the tolerance on all sides before indexing and before
//! querying, so two primitives closer than the tolerance are never pruned.

use geom_types::BoundingBox;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::check_tolerance;
use crate::failure::{Failure, QueryResult};
use crate::index::{Region, SpatialIndex};

/// An unordered pair of primitive indices. Within one collection `i < j`, or
/// `i == j` for a requested self pair. Across two collections `i` indexes the
/// first and `j` the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidatePair {
    pub i: usize,
    pub j: usize,
}

impl CandidatePair {
    pub fn new(i: usize, j: usize) -> Self {
        Self { i, j }
    }

    pub fn is_self(&self) -> bool {
        self.i == self.j
    }
}

/// Validate and inflate every box, indexing each under its position.
fn inflated_index(
    boxes: &[BoundingBox],
    tolerance: f64,
    kind: &str,
) -> QueryResult<(SpatialIndex, Vec<BoundingBox>)> {
    let mut index = SpatialIndex::new();
    let mut inflated = Vec::with_capacity(boxes.len());
    for (i, bounds) in boxes.iter().enumerate() {
        if !bounds.is_valid() {
            return Err(Failure::geometry_invalid(kind, i));
        }
        let grown = bounds.expanded(tolerance);
        index.insert_box(grown, i)?;
        inflated.push(grown);
    }
    Ok((index, inflated))
}

/// All pairs `(i, j)`, `i < j`, whose inflated boxes overlap, plus `(i, i)`
/// for every box when `include_self` is set. Sorted ascending, no duplicates.
#[instrument(skip(boxes), fields(count = boxes.len()))]
pub fn candidates(
    boxes: &[BoundingBox],
    tolerance: f64,
    include_self: bool,
) -> QueryResult<Vec<CandidatePair>> {
    if boxes.is_empty() {
        return Err(Failure::empty_input("bounding boxes"));
    }
    let tolerance = check_tolerance(tolerance)?;
    let (index, inflated) = inflated_index(boxes, tolerance, "bounding box")?;

    let mut pairs = Vec::new();
    for (i, bounds) in inflated.iter().enumerate() {
        if include_self {
            pairs.push(CandidatePair::new(i, i));
        }
        pairs.extend(
            index
                .query(Region::Box(*bounds))
                .filter(|&j| j > i)
                .map(|j| CandidatePair::new(i, j)),
        );
    }
    pairs.sort_unstable();

    debug!(pairs = pairs.len(), height = index.height(), "broad phase complete");
    Ok(pairs)
}

/// For every box, the ascending indices of the other boxes it may touch.
#[instrument(skip(boxes), fields(count = boxes.len()))]
pub fn candidate_lists(boxes: &[BoundingBox], tolerance: f64) -> QueryResult<Vec<Vec<usize>>> {
    if boxes.is_empty() {
        return Err(Failure::empty_input("bounding boxes"));
    }
    let tolerance = check_tolerance(tolerance)?;
    let (index, inflated) = inflated_index(boxes, tolerance, "bounding box")?;

    Ok(inflated
        .iter()
        .enumerate()
        .map(|(i, bounds)| {
            let mut others: Vec<usize> = index
                .query(Region::Box(*bounds))
                .filter(|&j| j != i)
                .collect();
            others.sort_unstable();
            others
        })
        .collect())
}

/// Pairs `(i, j)` with `i` indexing `first` and `j` indexing `second` whose
/// inflated boxes overlap. Sorted ascending.
#[instrument(skip(first, second), fields(first = first.len(), second = second.len()))]
pub fn cross_candidates(
    first: &[BoundingBox],
    second: &[BoundingBox],
    tolerance: f64,
) -> QueryResult<Vec<CandidatePair>> {
    if first.is_empty() || second.is_empty() {
        return Err(Failure::empty_input("bounding boxes"));
    }
    let tolerance = check_tolerance(tolerance)?;
    let (index, _) = inflated_index(first, tolerance, "first bounding box")?;

    let mut pairs = Vec::new();
    for (j, bounds) in second.iter().enumerate() {
        if !bounds.is_valid() {
            return Err(Failure::geometry_invalid("second bounding box", j));
        }
        let grown = bounds.expanded(tolerance);
        pairs.extend(index.query(Region::Box(grown)).map(|i| CandidatePair::new(i, j)));
    }
    pairs.sort_unstable();

    debug!(pairs = pairs.len(), "cross broad phase complete");
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureCode;
    use geom_types::Point3d;

    fn cube(x: f64, y: f64, z: f64, size: f64) -> BoundingBox {
        BoundingBox::new(Point3d::new(x, y, z), Point3d::new(x + size, y + size, z + size))
    }

    fn pairs(list: &[(usize, usize)]) -> Vec<CandidatePair> {
        list.iter().map(|&(i, j)| CandidatePair::new(i, j)).collect()
    }

    #[test]
    fn test_overlapping_chain() {
        let boxes = [cube(0.0, 0.0, 0.0, 1.0), cube(0.5, 0.0, 0.0, 1.0), cube(1.2, 0.0, 0.0, 1.0)];
        assert_eq!(candidates(&boxes, 0.0, false).unwrap(), pairs(&[(0, 1), (1, 2)]));
    }

    #[test]
    fn test_tolerance_bridges_gap() {
        let boxes = [cube(0.0, 0.0, 0.0, 1.0), cube(1.1, 0.0, 0.0, 1.0)];
        assert!(candidates(&boxes, 0.0, false).unwrap().is_empty());
        assert!(candidates(&boxes, 0.04, false).unwrap().is_empty());
        assert_eq!(candidates(&boxes, 0.06, false).unwrap(), pairs(&[(0, 1)]));
    }

    #[test]
    fn test_touching_boxes_are_candidates() {
        let boxes = [cube(0.0, 0.0, 0.0, 1.0), cube(1.0, 1.0, 1.0, 1.0)];
        assert_eq!(candidates(&boxes, 0.0, false).unwrap(), pairs(&[(0, 1)]));
    }

    #[test]
    fn test_include_self() {
        let boxes = [cube(0.0, 0.0, 0.0, 1.0), cube(5.0, 0.0, 0.0, 1.0), cube(5.5, 0.0, 0.0, 1.0)];
        assert_eq!(candidates(&boxes, 0.0, false).unwrap(), pairs(&[(1, 2)]));
        assert_eq!(
            candidates(&boxes, 0.0, true).unwrap(),
            pairs(&[(0, 0), (1, 1), (1, 2), (2, 2)])
        );
    }

    #[test]
    fn test_identical_boxes_pair_once() {
        let boxes = vec![cube(0.0, 0.0, 0.0, 1.0); 4];
        let out = candidates(&boxes, 0.0, false).unwrap();
        assert_eq!(out, pairs(&[(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]));
    }

    #[test]
    fn test_candidate_lists() {
        let boxes = [cube(0.0, 0.0, 0.0, 1.0), cube(0.5, 0.0, 0.0, 1.0), cube(9.0, 0.0, 0.0, 1.0)];
        assert_eq!(
            candidate_lists(&boxes, 0.0).unwrap(),
            vec![vec![1], vec![0], vec![]]
        );
    }

    #[test]
    fn test_cross_candidates() {
        let first = [cube(0.0, 0.0, 0.0, 1.0), cube(10.0, 0.0, 0.0, 1.0)];
        let second = [cube(10.5, 0.5, 0.5, 0.1), cube(0.5, 0.5, 0.5, 0.1), cube(50.0, 0.0, 0.0, 1.0)];
        assert_eq!(
            cross_candidates(&first, &second, 0.0).unwrap(),
            pairs(&[(0, 1), (1, 0)])
        );
    }

    #[test]
    fn test_failures() {
        let boxes = [cube(0.0, 0.0, 0.0, 1.0)];
        assert_eq!(candidates(&[], 0.0, false).unwrap_err().code, FailureCode::EmptyInput);
        assert_eq!(
            candidates(&boxes, -0.1, false).unwrap_err().code,
            FailureCode::InvalidTolerance
        );
        let bad = [cube(0.0, 0.0, 0.0, 1.0), BoundingBox::empty()];
        let err = candidates(&bad, 0.0, false).unwrap_err();
        assert_eq!(err.code, FailureCode::GeometryInvalid);
        assert_eq!(err.metadata.unwrap()["index"], 1);
    }
}
