//! 2D k-d tree over projected points
//!
//! Nearest-neighbour and fixed-radius queries used by the concavity
//! suggestion, DBSCAN region queries and nearest-neighbour distance
//! statistics.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use vectis_core::ProjectedPoint;

use crate::maybe_rayon::*;

/// A 2D k-d tree for spatial queries on projected points.
#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<ProjectedPoint>,
}

#[derive(Debug)]
struct KdNode {
    /// Index into `points`
    point_idx: usize,
    /// Split dimension: 0 = x, 1 = y
    split_dim: u8,
    left: Option<usize>,
    right: Option<usize>,
}

/// A point found by a query
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    /// Index of the point in the slice the tree was built from
    pub index: usize,
    pub distance_sq: f64,
}

impl KdTree {
    /// Build a k-d tree. Indices in query results refer to `points`.
    pub fn build(points: &[ProjectedPoint]) -> Self {
        let mut nodes = Vec::with_capacity(points.len());
        if !points.is_empty() {
            let mut indices: Vec<usize> = (0..points.len()).collect();
            build_recursive(points, &mut indices, 0, &mut nodes);
        }
        Self {
            nodes,
            points: points.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Nearest point to `q`, skipping the point stored at index `exclude`.
    pub fn nearest_excluding(&self, q: &ProjectedPoint, exclude: Option<usize>) -> Option<Neighbor> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut best = Neighbor { index: usize::MAX, distance_sq: f64::INFINITY };
        self.nearest_recursive(0, q, exclude, &mut best);
        (best.index != usize::MAX).then_some(best)
    }

    /// Nearest point to `q`
    pub fn nearest(&self, q: &ProjectedPoint) -> Option<Neighbor> {
        self.nearest_excluding(q, None)
    }

    /// All points within `radius` of `q` (inclusive), in no particular order.
    pub fn within_radius(&self, q: &ProjectedPoint, radius: f64) -> Vec<Neighbor> {
        let mut results = Vec::new();
        if self.nodes.is_empty() || radius < 0.0 {
            return results;
        }
        self.radius_recursive(0, q, radius * radius, &mut results);
        results
    }

    fn nearest_recursive(&self, node_idx: usize, q: &ProjectedPoint, exclude: Option<usize>, best: &mut Neighbor) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];

        let dx = q.x - p.x;
        let dy = q.y - p.y;
        let dist_sq = dx * dx + dy * dy;

        if dist_sq < best.distance_sq && exclude != Some(node.point_idx) {
            *best = Neighbor { index: node.point_idx, distance_sq: dist_sq };
        }

        let diff = if node.split_dim == 0 { dx } else { dy };
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = first {
            self.nearest_recursive(child, q, exclude, best);
        }
        if diff * diff < best.distance_sq {
            if let Some(child) = second {
                self.nearest_recursive(child, q, exclude, best);
            }
        }
    }

    fn radius_recursive(&self, node_idx: usize, q: &ProjectedPoint, radius_sq: f64, results: &mut Vec<Neighbor>) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];

        let dx = q.x - p.x;
        let dy = q.y - p.y;
        let dist_sq = dx * dx + dy * dy;

        if dist_sq <= radius_sq {
            results.push(Neighbor { index: node.point_idx, distance_sq: dist_sq });
        }

        let diff = if node.split_dim == 0 { dx } else { dy };

        if let Some(left) = node.left {
            if diff > 0.0 || diff * diff <= radius_sq {
                self.radius_recursive(left, q, radius_sq, results);
            }
        }
        if let Some(right) = node.right {
            if diff < 0.0 || diff * diff <= radius_sq {
                self.radius_recursive(right, q, radius_sq, results);
            }
        }
    }
}

fn build_recursive(points: &[ProjectedPoint], indices: &mut [usize], depth: usize, nodes: &mut Vec<KdNode>) -> usize {
    let n = indices.len();
    let split_dim = (depth % 2) as u8;

    let key = |i: usize| if split_dim == 0 { points[i].x } else { points[i].y };
    indices.sort_by(|&a, &b| key(a).total_cmp(&key(b)));

    let median = n / 2;
    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_dim,
        left: None,
        right: None,
    });

    if median > 0 {
        let left_idx = build_recursive(points, &mut indices[..median], depth + 1, nodes);
        nodes[node_idx].left = Some(left_idx);
    }
    if median + 1 < n {
        let right_idx = build_recursive(points, &mut indices[median + 1..], depth + 1, nodes);
        nodes[node_idx].right = Some(right_idx);
    }

    node_idx
}

/// Distance from every point to its nearest other point.
///
/// Coincident points have a nearest distance of zero. Returns an empty vector
/// for fewer than two points.
pub fn nearest_neighbor_distances(points: &[ProjectedPoint]) -> Vec<f64> {
    if points.len() < 2 {
        return Vec::new();
    }
    let tree = KdTree::build(points);
    (0..points.len())
        .into_par_iter()
        .map(|i| {
            tree.nearest_excluding(&points[i], Some(i))
                .map(|n| n.distance_sq.sqrt())
                .unwrap_or(0.0)
        })
        .collect()
}
