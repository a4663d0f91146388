use std::fmt;

use crate::geometry::{Point3, Vector3};

/// Where a ray sits in its bounce chain. Launched rays start in `Start`;
/// the ray spawned by the first triangle reflection (and all later ones)
/// travels in `MoreReflect`. `FirstReflect` is the transient state under
/// which the first reflection's field is computed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RayState {
    Start,
    FirstReflect,
    MoreReflect,
}

#[derive(Debug, Clone)]
pub struct Ray {
    pub o: Point3,
    /// Unit direction.
    pub d: Vector3,
    /// Solid angle of the angular cell that launched this ray, steradians.
    pub unit_surface_area: f64,
    pub state: RayState,
    /// Last reflection position. Meaningless in `Start`.
    pub prev_point: Point3,
    /// Path length from the transmitter up to `prev_point`. Monotonic
    /// non-decreasing along a bounce chain.
    pub prev_mileage: f64,
    /// Indices of the triangles reflected off so far, in order. Rays with
    /// equal paths sample the same physical multipath.
    pub path: Vec<u32>,
}

impl Ray {
    /// A primary ray leaving the transmitter.
    pub fn launch(o: Point3, d: Vector3, unit_surface_area: f64) -> Ray {
        debug_assert!((d.length_squared() - 1.0).abs() < 1e-9);
        Ray {
            o,
            d,
            unit_surface_area,
            state: RayState::Start,
            prev_point: o,
            prev_mileage: 0.0,
            path: Vec::new(),
        }
    }

    /// The ray spawned by a specular reflection at `hit`, travelling in
    /// `direction` with `mileage` metres behind it.
    pub fn reflected(&self, hit: Point3, direction: Vector3, mileage: f64, triangle: u32) -> Ray {
        debug_assert!(mileage >= self.prev_mileage);
        let mut path = self.path.clone();
        path.push(triangle);
        Ray {
            o: hit,
            d: direction,
            unit_surface_area: self.unit_surface_area,
            state: RayState::MoreReflect,
            prev_point: hit,
            prev_mileage: mileage,
            path,
        }
    }

    pub fn at(&self, t: f64) -> Point3 {
        self.o + self.d * t
    }

    /// Closest approach of the ray's supporting line to `p`.
    pub fn distance_to_line(&self, p: Point3) -> f64 {
        let to = p - self.o;
        let along = to.dot(&self.d);
        (to - self.d * along).length()
    }
}

impl fmt::Display for Ray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[o={}, d={}, state={:?}, mileage={}]",
            self.o, self.d, self.state, self.prev_mileage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_launch_state() {
        let r = Ray::launch(Point3::origin(), Vector3::new(0.0, 0.0, 1.0), 0.01);
        assert_eq!(r.state, RayState::Start);
        assert!(r.path.is_empty());
        assert_eq!(r.prev_mileage, 0.0);
    }

    #[test]
    fn test_reflected_extends_path_and_mileage() {
        let r = Ray::launch(Point3::origin(), Vector3::new(1.0, 0.0, 0.0), 0.01);
        let hit = Point3::new(5.0, 0.0, 0.0);
        let r2 = r.reflected(hit, Vector3::new(-1.0, 0.0, 0.0), 5.0, 7);
        assert_eq!(r2.state, RayState::MoreReflect);
        assert_eq!(r2.path, vec![7]);
        assert_eq!(r2.prev_point, hit);
        assert_relative_eq!(r2.prev_mileage, 5.0);
        assert_relative_eq!(r2.unit_surface_area, r.unit_surface_area);
    }

    #[test]
    fn test_distance_to_line() {
        let r = Ray::launch(Point3::origin(), Vector3::new(1.0, 0.0, 0.0), 0.0);
        assert_relative_eq!(r.distance_to_line(Point3::new(4.0, 3.0, 0.0)), 3.0);
        assert_relative_eq!(r.distance_to_line(Point3::new(-2.0, 0.0, 0.0)), 0.0);
    }
}
