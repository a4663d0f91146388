use std::fmt;

use crate::geometry::{Axis, Point3};
use crate::ray::Ray;

/// Axis Aligned Bounding Box
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds3 {
    pub p_min: Point3,
    pub p_max: Point3,
}

impl Bounds3 {
    /// An inverted (empty) box: unions with it are identity.
    pub fn new() -> Bounds3 {
        Bounds3 {
            p_min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            p_max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points(p1: Point3, p2: Point3) -> Bounds3 {
        Bounds3 {
            p_min: Point3::new(p1.x.min(p2.x), p1.y.min(p2.y), p1.z.min(p2.z)),
            p_max: Point3::new(p1.x.max(p2.x), p1.y.max(p2.y), p1.z.max(p2.z)),
        }
    }

    pub fn extend(&mut self, p: Point3) {
        if p.x < self.p_min.x {
            self.p_min.x = p.x
        }
        if p.y < self.p_min.y {
            self.p_min.y = p.y
        }
        if p.z < self.p_min.z {
            self.p_min.z = p.z
        }
        if p.x > self.p_max.x {
            self.p_max.x = p.x
        }
        if p.y > self.p_max.y {
            self.p_max.y = p.y
        }
        if p.z > self.p_max.z {
            self.p_max.z = p.z
        }
    }

    pub fn union(a: &Bounds3, b: &Bounds3) -> Bounds3 {
        let mut out = *a;
        out.extend(b.p_min);
        out.extend(b.p_max);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.p_min.x > self.p_max.x || self.p_min.y > self.p_max.y || self.p_min.z > self.p_max.z
    }

    pub fn surface_area(&self) -> f64 {
        let d = self.p_max - self.p_min;
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    pub fn overlaps(&self, other: &Bounds3) -> bool {
        self.p_min.x <= other.p_max.x
            && self.p_max.x >= other.p_min.x
            && self.p_min.y <= other.p_max.y
            && self.p_max.y >= other.p_min.y
            && self.p_min.z <= other.p_max.z
            && self.p_max.z >= other.p_min.z
    }

    /// Shrinks the box to end at `split` along `axis` (left child of a
    /// k-d split).
    pub fn clipped_above(&self, axis: Axis, split: f64) -> Bounds3 {
        let mut b = *self;
        b.p_max[axis] = split;
        b
    }

    /// Shrinks the box to start at `split` along `axis` (right child).
    pub fn clipped_below(&self, axis: Axis, split: f64) -> Bounds3 {
        let mut b = *self;
        b.p_min[axis] = split;
        b
    }

    /// Slab test; returns the signed entry/exit parameters of the ray
    /// against the box, or `None` when the box lies behind the ray or is
    /// missed entirely.
    pub fn clip_ray(&self, ray: &Ray) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let mut t0 = f64::NEG_INFINITY;
        let mut t1 = f64::INFINITY;
        for &axis in &Axis::ALL {
            let d = ray.d[axis];
            if d != 0.0 {
                let inv = 1.0 / d;
                let mut near = (self.p_min[axis] - ray.o[axis]) * inv;
                let mut far = (self.p_max[axis] - ray.o[axis]) * inv;
                if near > far {
                    std::mem::swap(&mut near, &mut far);
                }
                t0 = t0.max(near);
                t1 = t1.min(far);
            } else if ray.o[axis] < self.p_min[axis] || ray.o[axis] > self.p_max[axis] {
                return None;
            }
        }
        if t0 > t1 || t1 <= 0.0 {
            None
        } else {
            Some((t0, t1))
        }
    }
}

impl Default for Bounds3 {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Bounds3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.p_min, self.p_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector3;
    use approx::assert_relative_eq;

    #[test]
    fn test_union_with_empty_is_identity() {
        let a = Bounds3::from_points(Point3::new(-1.0, 0.0, 2.0), Point3::new(3.0, 1.0, 4.0));
        assert_eq!(Bounds3::union(&a, &Bounds3::new()), a);
        assert_eq!(Bounds3::union(&Bounds3::new(), &a), a);
    }

    #[test]
    fn test_surface_area() {
        let b = Bounds3::from_points(Point3::origin(), Point3::new(2.0, 3.0, 4.0));
        assert_relative_eq!(b.surface_area(), 2.0 * (6.0 + 8.0 + 12.0));
    }

    #[test]
    fn test_clip_ray_through_box() {
        let b = Bounds3::from_points(Point3::new(1.0, -1.0, -1.0), Point3::new(3.0, 1.0, 1.0));
        let ray = Ray::launch(Point3::origin(), Vector3::new(1.0, 0.0, 0.0), 0.0);
        let (t0, t1) = b.clip_ray(&ray).unwrap();
        assert_relative_eq!(t0, 1.0);
        assert_relative_eq!(t1, 3.0);
    }

    #[test]
    fn test_clip_ray_misses() {
        let b = Bounds3::from_points(Point3::new(1.0, 2.0, -1.0), Point3::new(3.0, 4.0, 1.0));
        let ray = Ray::launch(Point3::origin(), Vector3::new(1.0, 0.0, 0.0), 0.0);
        assert!(b.clip_ray(&ray).is_none());
        // box fully behind the origin
        let behind = Bounds3::from_points(Point3::new(-3.0, -1.0, -1.0), Point3::new(-1.0, 1.0, 1.0));
        assert!(behind.clip_ray(&ray).is_none());
    }

    #[test]
    fn test_clip_ray_from_inside() {
        let b = Bounds3::from_points(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let ray = Ray::launch(Point3::origin(), Vector3::new(0.0, 0.0, 1.0), 0.0);
        let (t0, t1) = b.clip_ray(&ray).unwrap();
        assert_relative_eq!(t0, -1.0);
        assert_relative_eq!(t1, 1.0);
    }
}
