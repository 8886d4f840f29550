//! Bounding Volume Hierarchy (BVH) over world-space triangles.
//!
//! Uses a binary tree with a median split along the longest centroid axis.

use vesper_math::{Aabb, Interval, Ray};

use crate::triangle::{Triangle, TriangleHit};

/// Maximum primitives per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// BVH node - either a branch with two children or a leaf with primitives.
pub enum BvhNode {
    /// Internal node with two children.
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    /// Leaf node with a small number of primitives.
    Leaf { triangles: Vec<Triangle>, bbox: Aabb },
    /// Empty node (for edge cases).
    Empty,
}

impl BvhNode {
    /// Create a BVH from a list of triangles.
    pub fn new(triangles: Vec<Triangle>) -> Self {
        if triangles.is_empty() {
            return BvhNode::Empty;
        }
        Self::build(triangles)
    }

    /// Recursive BVH construction.
    ///
    /// Simple median-split approach: sort triangles by centroid on the longest
    /// axis, split in half, recurse.
    fn build(mut triangles: Vec<Triangle>) -> Self {
        let n = triangles.len();

        let bounds = triangles
            .iter()
            .fold(Aabb::EMPTY, |acc, t| Aabb::surrounding(&acc, &t.bounding_box()));

        if n <= LEAF_MAX_SIZE {
            return BvhNode::Leaf {
                triangles,
                bbox: bounds,
            };
        }

        // Choose split axis based on centroid spread
        let centroid_bounds = triangles.iter().fold(Aabb::EMPTY, |acc, t| {
            acc.include_point(t.bounding_box().centroid())
        });
        let axis = centroid_bounds.longest_axis();

        triangles.sort_unstable_by(|a, b| {
            let a_val = a.bounding_box().centroid()[axis];
            let b_val = b.bounding_box().centroid()[axis];
            a_val.total_cmp(&b_val)
        });

        // Split at midpoint
        let right_triangles = triangles.split_off(n / 2);
        let left = Self::build(triangles);
        let right = Self::build(right_triangles);

        BvhNode::Branch {
            left: Box::new(left),
            right: Box::new(right),
            bbox: bounds,
        }
    }

    /// Closest triangle hit within `ray_t`.
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<(TriangleHit, &Triangle)> {
        match self {
            BvhNode::Empty => None,

            BvhNode::Leaf { triangles, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return None;
                }

                let mut closest = None;
                let mut closest_t = ray_t.max;
                for triangle in triangles {
                    if let Some(hit) = triangle.intersect(ray, ray_t.with_max(closest_t)) {
                        closest_t = hit.t;
                        closest = Some((hit, triangle));
                    }
                }
                closest
            }

            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return None;
                }

                let hit_left = left.hit(ray, ray_t);

                // Only check right up to closest hit
                let right_max = hit_left.map_or(ray_t.max, |(hit, _)| hit.t);
                let hit_right = right.hit(ray, ray_t.with_max(right_max));

                hit_right.or(hit_left)
            }
        }
    }

    /// True if any triangle intersects the ray within `ray_t`.
    pub fn any_hit(&self, ray: &Ray, ray_t: Interval) -> bool {
        match self {
            BvhNode::Empty => false,
            BvhNode::Leaf { triangles, bbox } => {
                bbox.hit(ray, ray_t) && triangles.iter().any(|t| t.intersect(ray, ray_t).is_some())
            }
            BvhNode::Branch { left, right, bbox } => {
                bbox.hit(ray, ray_t) && (left.any_hit(ray, ray_t) || right.any_hit(ray, ray_t))
            }
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Branch { bbox, .. } => *bbox,
        }
    }
}
