use crate::bounds::Bounds3;
use crate::geometry::{Point3, Vector3};
use crate::ray::Ray;
use crate::MIN_HIT_DISTANCE;

/// A surface hit: signed distance along the ray (forward, beyond the
/// self-intersection epsilon), the hit position and the outward normal.
#[derive(Debug, Copy, Clone)]
pub struct Intersection {
    pub distance: f64,
    pub position: Point3,
    pub normal: Vector3,
}

/// An occluder. Both faces reflect; the field kernel flips the stored
/// outward normal against the incoming ray.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub a: Point3,
    pub b: Point3,
    pub c: Point3,
    pub normal: Vector3,
    pub index: u32,
}

impl Triangle {
    /// Normal derived from the counter-clockwise winding of `a, b, c`.
    pub fn new(a: Point3, b: Point3, c: Point3, index: u32) -> Triangle {
        let normal = (b - a).cross(&(c - a)).normalize();
        Triangle::with_normal(a, b, c, normal, index)
    }

    pub fn with_normal(a: Point3, b: Point3, c: Point3, normal: Vector3, index: u32) -> Triangle {
        Triangle {
            a,
            b,
            c,
            normal,
            index,
        }
    }

    pub fn bounding_box(&self) -> Bounds3 {
        let mut b = Bounds3::from_points(self.a, self.b);
        b.extend(self.c);
        b
    }

    /// Barycenter.
    pub fn center(&self) -> Point3 {
        Point3::new(
            (self.a.x + self.b.x + self.c.x) / 3.0,
            (self.a.y + self.b.y + self.c.y) / 3.0,
            (self.a.z + self.b.z + self.c.z) / 3.0,
        )
    }

    /// Möller–Trumbore, without back-face culling.
    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        let h = ray.d.cross(&e2);
        let det = e1.dot(&h);
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = ray.o - self.a;
        let u = s.dot(&h) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(&e1);
        let v = ray.d.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(&q) * inv_det;
        if t < MIN_HIT_DISTANCE {
            return None;
        }
        Some(Intersection {
            distance: t,
            position: ray.at(t),
            normal: self.normal,
        })
    }
}

/// A receiver sphere: an observer that rays pierce, never an occluder.
#[derive(Debug, Clone)]
pub struct RxSphere {
    pub center: Point3,
    pub radius: f64,
    /// Receiver index in registration order.
    pub index: u32,
}

impl RxSphere {
    pub fn new(center: Point3, radius: f64, index: u32) -> RxSphere {
        RxSphere {
            center,
            radius,
            index,
        }
    }

    pub fn bounding_box(&self) -> Bounds3 {
        let r = Vector3::new(self.radius, self.radius, self.radius);
        Bounds3::from_points(self.center - r, self.center + r)
    }

    /// Nearest forward surface hit.
    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let oc = ray.o - self.center;
        let b = 2.0 * oc.dot(&ray.d);
        let c = oc.length_squared() - self.radius * self.radius;
        let disc = b * b - 4.0 * c;
        if disc < 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        let t0 = (-b - sq) / 2.0;
        let t1 = (-b + sq) / 2.0;
        let t = if t0 >= MIN_HIT_DISTANCE {
            t0
        } else if t1 >= MIN_HIT_DISTANCE {
            t1
        } else {
            return None;
        };
        let position = ray.at(t);
        Some(Intersection {
            distance: t,
            position,
            normal: (position - self.center).normalize(),
        })
    }
}

/// The tagged geometry variant the accelerators traverse. The tag itself
/// decides occluder vs observer.
#[derive(Debug, Clone)]
pub enum Geometry {
    Triangle(Triangle),
    Receiver(RxSphere),
}

impl Geometry {
    pub fn bounding_box(&self) -> Bounds3 {
        match self {
            Geometry::Triangle(t) => t.bounding_box(),
            Geometry::Receiver(s) => s.bounding_box(),
        }
    }

    pub fn center(&self) -> Point3 {
        match self {
            Geometry::Triangle(t) => t.center(),
            Geometry::Receiver(s) => s.center,
        }
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        match self {
            Geometry::Triangle(t) => t.intersect(ray),
            Geometry::Receiver(s) => s.intersect(ray),
        }
    }
}

/// The session-owned geometry store. Triangles are appended as the scene
/// is described; receiver spheres are attached just before the
/// accelerator is built.
#[derive(Debug, Default)]
pub struct Scene {
    geometries: Vec<Geometry>,
    n_triangles: usize,
}

impl Scene {
    pub fn new() -> Scene {
        Scene::default()
    }

    pub fn add_triangle(&mut self, a: Point3, b: Point3, c: Point3) -> u32 {
        let index = self.n_triangles as u32;
        self.geometries
            .insert(self.n_triangles, Geometry::Triangle(Triangle::new(a, b, c, index)));
        self.n_triangles += 1;
        index
    }

    pub fn add_triangle_with_normal(
        &mut self,
        a: Point3,
        b: Point3,
        c: Point3,
        normal: Vector3,
    ) -> u32 {
        let index = self.n_triangles as u32;
        self.geometries.insert(
            self.n_triangles,
            Geometry::Triangle(Triangle::with_normal(a, b, c, normal, index)),
        );
        self.n_triangles += 1;
        index
    }

    /// Registers one observer sphere per receiver point, all with the same
    /// radius. Replaces any previously attached receivers.
    pub fn attach_receivers(&mut self, points: &[Point3], radius: f64) {
        self.geometries.truncate(self.n_triangles);
        for (i, p) in points.iter().enumerate() {
            self.geometries
                .push(Geometry::Receiver(RxSphere::new(*p, radius, i as u32)));
        }
    }

    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    pub fn triangle_count(&self) -> usize {
        self.n_triangles
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Union of every member bounding box.
    pub fn bounds(&self) -> Bounds3 {
        self.geometries
            .iter()
            .fold(Bounds3::new(), |b, g| Bounds3::union(&b, &g.bounding_box()))
    }
}
