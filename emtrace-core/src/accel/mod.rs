use std::str::FromStr;

use crate::geometry::{Point3, Vector3};
use crate::ray::Ray;
use crate::scene::{Geometry, Scene};
use crate::Error;

mod grid;
mod kdtree;
mod linear;

pub use self::grid::Grid;
pub use self::kdtree::KdTree;
pub use self::linear::Linear;

/// The nearest triangle terminating a ray segment.
#[derive(Debug, Copy, Clone)]
pub struct OccluderHit {
    pub triangle: u32,
    pub distance: f64,
    pub position: Point3,
    pub normal: Vector3,
}

/// A receiver sphere pierced by the ray before its occluder.
#[derive(Debug, Copy, Clone)]
pub struct RxCrossing {
    pub receiver: u32,
    pub distance: f64,
    /// Closest approach of the ray line to the sphere centre.
    pub offset: f64,
    pub radius: f64,
}

/// What a single traversal reports: the nearest occluder hit, if any, and
/// every receiver pierced strictly before it (or anywhere along the ray
/// when nothing occludes).
#[derive(Debug, Default)]
pub struct RayIntersection {
    pub occluder: Option<OccluderHit>,
    pub crossings: Vec<RxCrossing>,
}

/// The shared intersection contract of all accelerator variants.
pub trait Accelerator: Send + Sync {
    fn intersect(&self, scene: &Scene, ray: &Ray) -> RayIntersection;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AccelKind {
    Linear,
    Grid,
    KdTree,
}

impl Default for AccelKind {
    fn default() -> Self {
        AccelKind::KdTree
    }
}

impl FromStr for AccelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<AccelKind, Error> {
        match s.to_ascii_lowercase().as_str() {
            "linear" | "bruteforce" => Ok(AccelKind::Linear),
            "grid" => Ok(AccelKind::Grid),
            "kdtree" | "kd" => Ok(AccelKind::KdTree),
            other => Err(Error::invalid_parameter(
                "accelerator",
                format!("unknown variant '{}'", other),
            )),
        }
    }
}

impl AccelKind {
    pub fn build(self, scene: &Scene) -> Box<dyn Accelerator> {
        match self {
            AccelKind::Linear => Box::new(Linear),
            AccelKind::Grid => Box::new(Grid::build(scene)),
            AccelKind::KdTree => Box::new(KdTree::build(scene)),
        }
    }
}

/// Keeps the nearest piercing seen so far for each receiver.
#[derive(Debug, Default)]
pub(crate) struct CrossingSet {
    items: Vec<RxCrossing>,
}

impl CrossingSet {
    pub fn note(&mut self, receiver: u32, distance: f64, offset: f64, radius: f64) {
        match self.items.iter_mut().find(|c| c.receiver == receiver) {
            Some(c) => {
                if distance < c.distance {
                    c.distance = distance;
                    c.offset = offset;
                }
            }
            None => self.items.push(RxCrossing {
                receiver,
                distance,
                offset,
                radius,
            }),
        }
    }

    /// Drops every crossing at or beyond the accepted occluder.
    pub fn finish(mut self, occluder: &Option<OccluderHit>) -> Vec<RxCrossing> {
        if let Some(hit) = occluder {
            self.items.retain(|c| c.distance < hit.distance);
        }
        self.items
    }
}

/// Tests one geometry and folds the outcome into the running occluder /
/// crossing state. Shared by every accelerator variant.
pub(crate) fn test_geometry(
    geometry: &Geometry,
    index: u32,
    ray: &Ray,
    best: &mut Option<OccluderHit>,
    crossings: &mut CrossingSet,
) {
    let isect = match geometry.intersect(ray) {
        Some(i) => i,
        None => return,
    };
    match geometry {
        Geometry::Triangle(_) => {
            if best.map_or(true, |b| isect.distance < b.distance) {
                *best = Some(OccluderHit {
                    triangle: index,
                    distance: isect.distance,
                    position: isect.position,
                    normal: isect.normal,
                });
            }
        }
        Geometry::Receiver(s) => {
            let offset = ray.distance_to_line(s.center);
            crossings.note(s.index, isect.distance, offset, s.radius);
        }
    }
}
