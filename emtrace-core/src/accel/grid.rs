use log::info;

use crate::accel::{test_geometry, Accelerator, CrossingSet, RayIntersection};
use crate::bounds::Bounds3;
use crate::geometry::{Axis, Point3};
use crate::ray::Ray;
use crate::scene::Scene;

const MAX_RESOLUTION: usize = 64;

/// Uniform voxel grid walked with a 3-D DDA. Voxel resolution follows the
/// cube root of the geometry count along the longest extent.
#[derive(Debug)]
pub struct Grid {
    bounds: Bounds3,
    dims: [usize; 3],
    width: [f64; 3],
    cells: Vec<Vec<u32>>,
}

impl Grid {
    pub fn build(scene: &Scene) -> Grid {
        let bounds = scene.bounds();
        let n = scene.geometries().len();
        if n == 0 || bounds.is_empty() {
            return Grid {
                bounds,
                dims: [1, 1, 1],
                width: [0.0, 0.0, 0.0],
                cells: vec![Vec::new()],
            };
        }

        let diag = bounds.p_max - bounds.p_min;
        let max_extent = diag.x.max(diag.y).max(diag.z);
        let voxels_per_unit = 3.0 * (n as f64).cbrt() / max_extent;
        let mut dims = [1usize; 3];
        let mut width = [0.0f64; 3];
        for (k, &axis) in Axis::ALL.iter().enumerate() {
            let extent = diag[axis];
            dims[k] = ((extent * voxels_per_unit).round() as usize).clamp(1, MAX_RESOLUTION);
            width[k] = extent / dims[k] as f64;
        }

        let mut cells = vec![Vec::new(); dims[0] * dims[1] * dims[2]];
        let mut grid = Grid {
            bounds,
            dims,
            width,
            cells: Vec::new(),
        };
        for (i, g) in scene.geometries().iter().enumerate() {
            let b = g.bounding_box();
            let lo = grid.voxel_of(b.p_min);
            let hi = grid.voxel_of(b.p_max);
            for x in lo[0]..=hi[0] {
                for y in lo[1]..=hi[1] {
                    for z in lo[2]..=hi[2] {
                        cells[grid.offset([x, y, z])].push(i as u32);
                    }
                }
            }
        }
        grid.cells = cells;
        info!(
            "grid accelerator: {}x{}x{} voxels over {} geometries",
            dims[0], dims[1], dims[2], n
        );
        grid
    }

    fn offset(&self, v: [usize; 3]) -> usize {
        (v[2] * self.dims[1] + v[1]) * self.dims[0] + v[0]
    }

    fn voxel_of(&self, p: Point3) -> [usize; 3] {
        let mut v = [0usize; 3];
        for (k, &axis) in Axis::ALL.iter().enumerate() {
            let w = if self.width[k] == 0.0 {
                0.0
            } else {
                (p[axis] - self.bounds.p_min[axis]) / self.width[k]
            };
            v[k] = (w as isize).clamp(0, self.dims[k] as isize - 1) as usize;
        }
        v
    }
}

impl Accelerator for Grid {
    fn intersect(&self, scene: &Scene, ray: &Ray) -> RayIntersection {
        let mut best = None;
        let mut crossings = CrossingSet::default();
        let (t_enter, _) = match self.bounds.clip_ray(ray) {
            Some(range) => range,
            None => return RayIntersection::default(),
        };
        let t_start = t_enter.max(0.0);
        let start = ray.at(t_start);
        let mut voxel = self.voxel_of(start);

        // per-axis DDA state
        let mut step = [0isize; 3];
        let mut next_t = [f64::INFINITY; 3];
        let mut delta_t = [f64::INFINITY; 3];
        for (k, &axis) in Axis::ALL.iter().enumerate() {
            let d = ray.d[axis];
            // a degenerate axis (flat bounding box) has a single voxel and
            // must never govern the exit; leave its next_t at infinity
            if d == 0.0 || self.width[k] == 0.0 {
                continue;
            }
            delta_t[k] = (self.width[k] / d).abs();
            let voxel_min = self.bounds.p_min[axis] + voxel[k] as f64 * self.width[k];
            if d > 0.0 {
                step[k] = 1;
                next_t[k] = t_start + (voxel_min + self.width[k] - start[axis]) / d;
            } else {
                step[k] = -1;
                next_t[k] = t_start + (voxel_min - start[axis]) / d;
            }
        }

        loop {
            for &gi in &self.cells[self.offset(voxel)] {
                test_geometry(
                    &scene.geometries()[gi as usize],
                    gi,
                    ray,
                    &mut best,
                    &mut crossings,
                );
            }

            // exit parameter of the current voxel
            let k = if next_t[0] < next_t[1] {
                if next_t[0] < next_t[2] {
                    0
                } else {
                    2
                }
            } else if next_t[1] < next_t[2] {
                1
            } else {
                2
            };
            // a hit before the voxel exit cannot be beaten by later voxels
            if let Some(hit) = best {
                if hit.distance <= next_t[k] {
                    break;
                }
            }
            // every axis inert: the entry voxel is the only one on the ray
            if next_t[k] == f64::INFINITY {
                break;
            }
            let stepped = voxel[k] as isize + step[k];
            if stepped < 0 || stepped >= self.dims[k] as isize {
                break;
            }
            voxel[k] = stepped as usize;
            next_t[k] += delta_t[k];
        }

        RayIntersection {
            crossings: crossings.finish(&best),
            occluder: best,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::Linear;
    use crate::geometry::Vector3;
    use approx::assert_relative_eq;

    fn wall_scene() -> Scene {
        let mut scene = Scene::new();
        for i in 0..6 {
            let x = 2.0 + i as f64;
            scene.add_triangle(
                Point3::new(x, -5.0, -5.0),
                Point3::new(x, 5.0, -5.0),
                Point3::new(x, 0.0, 5.0),
            );
        }
        scene.attach_receivers(&[Point3::new(1.0, 0.0, 0.0)], 0.25);
        scene
    }

    #[test]
    fn test_matches_linear_on_axis_ray() {
        let scene = wall_scene();
        let grid = Grid::build(&scene);
        let ray = Ray::launch(Point3::new(-1.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), 0.0);
        let got = grid.intersect(&scene, &ray);
        let want = Linear.intersect(&scene, &ray);
        let (g, w) = (got.occluder.unwrap(), want.occluder.unwrap());
        assert_eq!(g.triangle, w.triangle);
        assert_relative_eq!(g.distance, w.distance);
        assert_eq!(got.crossings.len(), want.crossings.len());
    }

    #[test]
    fn test_flat_scene_degenerate_axis() {
        // all geometry coplanar at z = 0: the bounding box is flat along z
        let mut scene = Scene::new();
        for i in 0..8 {
            let x = 2.0 * i as f64;
            scene.add_triangle(
                Point3::new(x, -1.0, 0.0),
                Point3::new(x + 1.0, -1.0, 0.0),
                Point3::new(x, 1.0, 0.0),
            );
        }
        let grid = Grid::build(&scene);
        let rays = [
            // straight down onto a triangle interior
            Ray::launch(Point3::new(4.2, -0.5, 3.0), Vector3::new(0.0, 0.0, -1.0), 0.0),
            // oblique crossing
            Ray::launch(
                Point3::new(0.3, -0.5, 2.0),
                Vector3::new(1.0, 0.0, -1.0).normalize(),
                0.0,
            ),
            // straight down into the gap between triangles: a miss that
            // must still terminate
            Ray::launch(Point3::new(1.5, 0.9, 3.0), Vector3::new(0.0, 0.0, -1.0), 0.0),
            // travelling within the plane
            Ray::launch(Point3::new(-1.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), 0.0),
        ];
        for ray in &rays {
            let got = grid.intersect(&scene, ray);
            let want = Linear.intersect(&scene, ray);
            match (&got.occluder, &want.occluder) {
                (Some(g), Some(w)) => {
                    assert_eq!(g.triangle, w.triangle, "occluder mismatch for {}", ray);
                    assert_relative_eq!(g.distance, w.distance);
                }
                (None, None) => {}
                other => panic!("hit/miss disagreement for {}: {:?}", ray, other),
            }
        }
    }

    #[test]
    fn test_empty_scene() {
        let scene = Scene::new();
        let grid = Grid::build(&scene);
        let ray = Ray::launch(Point3::origin(), Vector3::new(1.0, 0.0, 0.0), 0.0);
        let r = grid.intersect(&scene, &ray);
        assert!(r.occluder.is_none());
        assert!(r.crossings.is_empty());
    }
}
