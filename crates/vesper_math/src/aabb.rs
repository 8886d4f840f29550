use crate::{Interval, Ray, Vec3};

/// Smallest extent a box built from points is given along any axis, so
/// axis-aligned triangles still have a hittable volume.
const MIN_EXTENT: f32 = 1e-4;

/// Axis-aligned bounding box stored as its two corners.
///
/// The empty box has `min = +inf` and `max = -inf`, so folding points or
/// boxes into it needs no special case.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Box spanning two corner points in any order, padded to a minimum
    /// thickness.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        let pad = (Vec3::splat(MIN_EXTENT) - (max - min)).max(Vec3::ZERO) * 0.5;
        Self {
            min: min - pad,
            max: max + pad,
        }
    }

    pub fn surrounding(a: &Aabb, b: &Aabb) -> Self {
        Self {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        }
    }

    pub fn include_point(&self, p: Vec3) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        self.max
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Slab test against the part of `ray` inside `ray_t`.
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> bool {
        let inv_dir = ray.direction.recip();
        let t0 = (self.min - ray.origin) * inv_dir;
        let t1 = (self.max - ray.origin) * inv_dir;

        let near = t0.min(t1).max_element().max(ray_t.min);
        let far = t0.max(t1).min_element().min(ray_t.max);
        near < far
    }

    /// Axis of largest extent; ties go to the later axis.
    pub fn longest_axis(&self) -> usize {
        let e = self.extent();
        if e.x > e.y && e.x > e.z {
            0
        } else if e.y > e.z {
            1
        } else {
            2
        }
    }

    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Center and radius of the sphere circumscribing the box. An empty box
    /// gives a zero sphere at the origin.
    pub fn bounding_sphere(&self) -> (Vec3, f32) {
        if self.is_empty() {
            return (Vec3::ZERO, 0.0);
        }
        let center = self.centroid();
        (center, (self.max - center).length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points(Vec3::new(10.0, 0.0, 10.0), Vec3::new(0.0, 10.0, 0.0));

        assert_eq!(aabb.min(), Vec3::ZERO);
        assert_eq!(aabb.max(), Vec3::splat(10.0));
    }

    #[test]
    fn test_flat_box_is_padded() {
        let aabb = Aabb::from_points(Vec3::new(-1.0, 2.0, -1.0), Vec3::new(1.0, 2.0, 1.0));
        let extent = aabb.extent();

        assert!((extent.y - MIN_EXTENT).abs() < 1e-6);
        assert!((aabb.centroid().y - 2.0).abs() < 1e-6);
        assert_eq!(extent.x, 2.0);
    }

    #[test]
    fn test_aabb_surrounding_empty() {
        let b = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let merged = Aabb::surrounding(&Aabb::EMPTY, &b);

        assert!(Aabb::EMPTY.is_empty());
        assert!(!merged.is_empty());
        assert_eq!(merged, b);
    }

    #[test]
    fn test_aabb_hit() {
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray_t = Interval::new(0.0, 100.0);

        let toward = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert!(aabb.hit(&toward, ray_t));

        let away = Ray::new(Vec3::new(0.0, 0.0, -5.0), -Vec3::Z);
        assert!(!aabb.hit(&away, ray_t));

        let beside = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::Z);
        assert!(!aabb.hit(&beside, ray_t));

        // Box lies beyond the interval
        assert!(!aabb.hit(&toward, Interval::new(0.0, 3.0)));
    }

    #[test]
    fn test_aabb_longest_axis() {
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0)).longest_axis(), 0);
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 10.0, 1.0)).longest_axis(), 1);
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0)).longest_axis(), 2);
    }

    #[test]
    fn test_aabb_bounding_sphere() {
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let (center, radius) = aabb.bounding_sphere();

        assert!(center.length() < 1e-6);
        assert!((radius - 3.0_f32.sqrt()).abs() < 1e-5);
        assert_eq!(Aabb::EMPTY.bounding_sphere().1, 0.0);
    }
}
