//! Dynamic AABB tree over points and boxes.
//!
//! Leaves hold caller-supplied integer ids. Insertion picks a sibling by a
//! surface-area cost and rebalances ancestors with AVL-style rotations, so the
//! tree height stays logarithmic for any insertion order.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use geom_types::{BoundingBox, Point3d};
use slotmap::{new_key_type, SlotMap};

use crate::failure::{Failure, QueryResult};

// ─── Entries and Regions ────────────────────────────────────────────────────

new_key_type! {
    pub struct NodeKey;
}

/// The shape stored under an id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Volume {
    Point(Point3d),
    Box(BoundingBox),
}

impl Volume {
    pub fn bounds(&self) -> BoundingBox {
        match self {
            Volume::Point(p) => BoundingBox::from_point(*p),
            Volume::Box(b) => *b,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Volume::Point(p) => p.is_valid(),
            Volume::Box(b) => b.is_valid(),
        }
    }

    /// Squared distance from `p` to the volume; zero inside a box.
    pub fn distance_squared_to(&self, p: &Point3d) -> f64 {
        match self {
            Volume::Point(q) => q.distance_squared_to(p),
            Volume::Box(b) => b.distance_squared_to_point(p),
        }
    }

    fn within(&self, region: &Region) -> bool {
        match (self, region) {
            (Volume::Point(p), Region::Sphere { center, radius }) => {
                (*p - *center).within_length(*radius)
            }
            (Volume::Point(p), Region::Box(b)) => b.contains_point(p),
            (Volume::Box(b), region) => region.overlaps(b),
        }
    }
}

/// A query region. Both shapes are closed: boundary contact matches. A sphere
/// with a negative or NaN radius matches nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Region {
    Sphere { center: Point3d, radius: f64 },
    Box(BoundingBox),
}

impl Region {
    pub fn sphere(center: Point3d, radius: f64) -> Self {
        Region::Sphere { center, radius }
    }

    fn overlaps(&self, bounds: &BoundingBox) -> bool {
        match self {
            Region::Sphere { center, radius } => bounds.intersects_sphere(center, *radius),
            Region::Box(b) => b.intersects(bounds),
        }
    }
}

// ─── Tree Storage ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Leaf { id: usize, volume: Volume },
    Branch { left: NodeKey, right: NodeKey },
}

#[derive(Debug, Clone)]
struct Node {
    bounds: BoundingBox,
    parent: Option<NodeKey>,
    /// Leaves have height 0.
    height: u32,
    kind: NodeKind,
}

#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    nodes: SlotMap<NodeKey, Node>,
    root: Option<NodeKey>,
    len: usize,
}

/// Insertion cost of a box. The edge-length term keeps flat and collinear
/// boxes, whose area is zero, comparable.
fn cost(bounds: &BoundingBox) -> f64 {
    let s = bounds.size();
    bounds.half_area() + s.x + s.y + s.z
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the root; 0 for a single leaf or an empty index.
    pub fn height(&self) -> u32 {
        self.root.map_or(0, |r| self.nodes[r].height)
    }

    /// Bounds of everything stored, `None` when empty.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.root.map(|r| self.nodes[r].bounds)
    }

    pub fn insert_point(&mut self, point: Point3d, id: usize) -> QueryResult<()> {
        self.insert(Volume::Point(point), id)
    }

    pub fn insert_box(&mut self, bounds: BoundingBox, id: usize) -> QueryResult<()> {
        self.insert(Volume::Box(bounds), id)
    }

    /// Store `volume` under `id`. Ids are not checked for uniqueness.
    pub fn insert(&mut self, volume: Volume, id: usize) -> QueryResult<()> {
        if !volume.is_valid() {
            return Err(Failure::invalid_argument(format!(
                "cannot index non-finite or inverted volume for id {id}"
            )));
        }
        let leaf = self.nodes.insert(Node {
            bounds: volume.bounds(),
            parent: None,
            height: 0,
            kind: NodeKind::Leaf { id, volume },
        });
        self.insert_leaf(leaf);
        self.len += 1;
        Ok(())
    }

    fn children(&self, key: NodeKey) -> Option<(NodeKey, NodeKey)> {
        match self.nodes[key].kind {
            NodeKind::Branch { left, right } => Some((left, right)),
            NodeKind::Leaf { .. } => None,
        }
    }

    fn set_children(&mut self, key: NodeKey, left: NodeKey, right: NodeKey) {
        self.nodes[key].kind = NodeKind::Branch { left, right };
        self.nodes[left].parent = Some(key);
        self.nodes[right].parent = Some(key);
    }

    /// Point `parent`'s link to `old` at `new`, or make `new` the root.
    fn replace_child(&mut self, parent: Option<NodeKey>, old: NodeKey, new: NodeKey) {
        self.nodes[new].parent = parent;
        match parent {
            Some(p) => {
                if let Some((left, right)) = self.children(p) {
                    if left == old {
                        self.set_children(p, new, right);
                    } else {
                        self.set_children(p, left, new);
                    }
                }
            }
            None => self.root = Some(new),
        }
    }

    /// Recompute a branch's bounds and height from its children.
    fn refit(&mut self, key: NodeKey) {
        if let Some((left, right)) = self.children(key) {
            let bounds = self.nodes[left].bounds.union(&self.nodes[right].bounds);
            let height = 1 + self.nodes[left].height.max(self.nodes[right].height);
            let node = &mut self.nodes[key];
            node.bounds = bounds;
            node.height = height;
        }
    }

    fn best_sibling(&self, root: NodeKey, leaf_bounds: &BoundingBox) -> NodeKey {
        let mut current = root;
        while let Some((left, right)) = self.children(current) {
            let bounds = &self.nodes[current].bounds;
            let combined = cost(&bounds.union(leaf_bounds));
            let here = 2.0 * combined;
            let inheritance = 2.0 * (combined - cost(bounds));

            let descend = |child: NodeKey| {
                let node = &self.nodes[child];
                let merged = cost(&node.bounds.union(leaf_bounds));
                match node.kind {
                    NodeKind::Leaf { .. } => merged + inheritance,
                    NodeKind::Branch { .. } => merged - cost(&node.bounds) + inheritance,
                }
            };
            let cost_left = descend(left);
            let cost_right = descend(right);

            if here < cost_left && here < cost_right {
                break;
            }
            current = if cost_left <= cost_right { left } else { right };
        }
        current
    }

    fn insert_leaf(&mut self, leaf: NodeKey) {
        let Some(root) = self.root else {
            self.root = Some(leaf);
            return;
        };

        let leaf_bounds = self.nodes[leaf].bounds;
        let sibling = self.best_sibling(root, &leaf_bounds);

        let old_parent = self.nodes[sibling].parent;
        let branch = self.nodes.insert(Node {
            bounds: self.nodes[sibling].bounds.union(&leaf_bounds),
            parent: None,
            height: self.nodes[sibling].height + 1,
            kind: NodeKind::Branch {
                left: sibling,
                right: leaf,
            },
        });
        self.replace_child(old_parent, sibling, branch);
        self.set_children(branch, sibling, leaf);

        let mut cursor = self.nodes[leaf].parent;
        while let Some(key) = cursor {
            self.refit(key);
            let key = self.balance(key);
            cursor = self.nodes[key].parent;
        }
    }

    /// Rotate the taller child of `key` up when the child heights differ by
    /// more than one. Returns the node now occupying `key`'s position.
    fn balance(&mut self, key: NodeKey) -> NodeKey {
        let Some((left, right)) = self.children(key) else {
            return key;
        };
        let skew = self.nodes[right].height as i64 - self.nodes[left].height as i64;
        if skew > 1 {
            self.promote(key, right)
        } else if skew < -1 {
            self.promote(key, left)
        } else {
            key
        }
    }

    fn promote(&mut self, key: NodeKey, heavy: NodeKey) -> NodeKey {
        let (Some((a, b)), Some((left, right))) = (self.children(heavy), self.children(key)) else {
            return key;
        };
        let (keep, moved) = if self.nodes[a].height > self.nodes[b].height {
            (a, b)
        } else {
            (b, a)
        };

        let parent = self.nodes[key].parent;
        self.replace_child(parent, key, heavy);
        if left == heavy {
            self.set_children(key, moved, right);
        } else {
            self.set_children(key, left, moved);
        }
        self.set_children(heavy, key, keep);

        self.refit(key);
        self.refit(heavy);
        heavy
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    /// Lazily yield the ids of every entry inside `region`, in no particular
    /// order. A region with NaN extents matches nothing.
    pub fn query(&self, region: Region) -> Query<'_> {
        Query {
            index: self,
            region,
            stack: self.root.into_iter().collect(),
        }
    }

    /// Yield `(id, distance)` in ascending distance from `target`. Entries at
    /// equal distance come out in ascending id order.
    pub fn nearest(&self, target: Point3d) -> Nearest<'_> {
        let mut heap = BinaryHeap::new();
        if let Some(root) = self.root {
            heap.push(Reverse(self.candidate(root, &target)));
        }
        Nearest {
            index: self,
            target,
            heap,
        }
    }

    /// Ids of the `k` entries nearest `target`, nearest first.
    pub fn k_nearest(&self, target: Point3d, k: usize) -> QueryResult<Vec<usize>> {
        if k == 0 || k > self.len {
            return Err(Failure::invalid_argument(format!(
                "k must be in 1..={}, got {k}",
                self.len
            )));
        }
        if !target.is_valid() {
            return Err(Failure::invalid_argument("nearest-neighbor target must be finite"));
        }
        Ok(self.nearest(target).take(k).map(|(id, _)| id).collect())
    }

    fn candidate(&self, key: NodeKey, target: &Point3d) -> Candidate {
        let node = &self.nodes[key];
        match node.kind {
            NodeKind::Leaf { id, volume } => Candidate {
                distance_squared: volume.distance_squared_to(target),
                slot: Slot::Entry(id),
            },
            NodeKind::Branch { .. } => Candidate {
                distance_squared: node.bounds.distance_squared_to_point(target),
                slot: Slot::Node(key),
            },
        }
    }
}

pub struct Query<'a> {
    index: &'a SpatialIndex,
    region: Region,
    stack: Vec<NodeKey>,
}

impl Iterator for Query<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while let Some(key) = self.stack.pop() {
            let node = &self.index.nodes[key];
            if !self.region.overlaps(&node.bounds) {
                continue;
            }
            match node.kind {
                NodeKind::Leaf { id, volume } => {
                    if volume.within(&self.region) {
                        return Some(id);
                    }
                }
                NodeKind::Branch { left, right } => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
            }
        }
        None
    }
}

// ─── Best-first Traversal ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Node(NodeKey),
    Entry(usize),
}

/// Heap item. Orders by distance, then unexpanded subtrees before entries so
/// a subtree touching the current distance is opened before any entry at that
/// distance is emitted, then by id.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance_squared: f64,
    slot: Slot,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_squared
            .total_cmp(&other.distance_squared)
            .then_with(|| match (self.slot, other.slot) {
                (Slot::Node(a), Slot::Node(b)) => a.cmp(&b),
                (Slot::Node(_), Slot::Entry(_)) => Ordering::Less,
                (Slot::Entry(_), Slot::Node(_)) => Ordering::Greater,
                (Slot::Entry(a), Slot::Entry(b)) => a.cmp(&b),
            })
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

pub struct Nearest<'a> {
    index: &'a SpatialIndex,
    target: Point3d,
    heap: BinaryHeap<Reverse<Candidate>>,
}

impl Iterator for Nearest<'_> {
    type Item = (usize, f64);

    fn next(&mut self) -> Option<(usize, f64)> {
        while let Some(Reverse(candidate)) = self.heap.pop() {
            match candidate.slot {
                Slot::Entry(id) => return Some((id, candidate.distance_squared.sqrt())),
                Slot::Node(key) => {
                    if let Some((left, right)) = self.index.children(key) {
                        self.heap
                            .push(Reverse(self.index.candidate(left, &self.target)));
                        self.heap
                            .push(Reverse(self.index.candidate(right, &self.target)));
                    }
                }
            }
        }
        None
    }
}
