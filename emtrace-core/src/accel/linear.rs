use crate::accel::{test_geometry, Accelerator, CrossingSet, RayIntersection};
use crate::ray::Ray;
use crate::scene::Scene;

/// Brute-force scan over the whole geometry list. Slow, but its results
/// define the contract the other accelerators are checked against.
#[derive(Debug, Default)]
pub struct Linear;

impl Accelerator for Linear {
    fn intersect(&self, scene: &Scene, ray: &Ray) -> RayIntersection {
        let mut best = None;
        let mut crossings = CrossingSet::default();
        for (i, g) in scene.geometries().iter().enumerate() {
            test_geometry(g, i as u32, ray, &mut best, &mut crossings);
        }
        RayIntersection {
            crossings: crossings.finish(&best),
            occluder: best,
        }
    }
}
