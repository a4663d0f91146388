//! Angular tiling of the transmitter sphere, the recursive bounce trace
//! and the per-receiver contribution buckets.

use std::collections::HashMap;
use std::f64::consts::PI;

use log::error;
use num::complex::Complex64;
use rayon::prelude::*;

use crate::accel::Accelerator;
use crate::field;
use crate::geometry::complex::ComplexVector;
use crate::geometry::{Point3, Vector3};
use crate::ray::{Ray, RayState};
use crate::scene::Scene;
use crate::session::Parameters;

/// A contribution key: the multipath signature plus the receiver offset
/// of the recording ray. Rays of neighbouring cells that sample the same
/// multipath at the same offset collapse onto one entry instead of being
/// double-counted.
type PathKey = (Vec<u32>, u64);

/// Per-receiver accumulation buckets. Written only by the launcher while
/// a simulation runs; read at power read-out.
#[derive(Debug, Default)]
pub struct RxFields {
    buckets: Vec<HashMap<PathKey, ComplexVector>>,
}

impl RxFields {
    pub fn new(receivers: usize) -> RxFields {
        RxFields {
            buckets: vec![HashMap::new(); receivers],
        }
    }

    /// Stores a contribution under `(path, offset)`; at most one
    /// contribution is kept per key.
    pub fn record(&mut self, receiver: u32, path: &[u32], offset: f64, field: ComplexVector) {
        self.buckets[receiver as usize]
            .entry((path.to_vec(), offset.to_bits()))
            .or_insert(field);
    }

    /// Commutative, associative worker-map merge.
    pub fn merge(mut self, other: RxFields) -> RxFields {
        if self.buckets.is_empty() {
            return other;
        }
        for (bucket, incoming) in self.buckets.iter_mut().zip(other.buckets) {
            for (key, field) in incoming {
                bucket.entry(key).or_insert(field);
            }
        }
        self
    }

    pub fn receiver_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn contribution_count(&self, receiver: usize) -> usize {
        self.buckets[receiver].len()
    }

    /// Accumulated `Σ(real² + imag²)` over every stored contribution of
    /// one receiver.
    pub fn field_norm_sqr(&self, receiver: usize) -> f64 {
        self.buckets[receiver].values().map(|v| v.norm_sqr()).sum()
    }
}

/// Number of azimuth and elevation cells for a spacing in degrees.
pub fn grid_size(ray_spacing: f64) -> (usize, usize) {
    (
        (360.0 / ray_spacing).round() as usize,
        (180.0 / ray_spacing).round() as usize,
    )
}

/// Centre direction and solid angle (steradians) of cell `(i, j)`. The
/// areas of a full grid sum to 4π.
pub fn cell(i: usize, j: usize, n_theta: usize, n_phi: usize) -> (Vector3, f64) {
    let theta = i as f64 * 2.0 * PI / n_theta as f64;
    let phi = (j as f64 + 0.5) * PI / n_phi as f64;
    let direction = Vector3::new(
        phi.sin() * theta.cos(),
        phi.sin() * theta.sin(),
        phi.cos(),
    );
    let phi_lo = j as f64 * PI / n_phi as f64;
    let phi_hi = (j + 1) as f64 * PI / n_phi as f64;
    let area = (2.0 * PI / n_theta as f64) * (phi_lo.cos() - phi_hi.cos());
    (direction, area)
}

struct Tracer<'a> {
    scene: &'a Scene,
    accel: &'a dyn Accelerator,
    k: f64,
    amplitude: f64,
    eps: Complex64,
    max_reflections: u32,
}

impl Tracer<'_> {
    /// One segment of a bounce chain: record every receiver pierced
    /// before the nearest occluder, then recurse on the specular
    /// reflection until the bounce limit.
    fn trace(&self, ray: &Ray, ei: ComplexVector, depth: u32, fields: &mut RxFields) {
        let isect = self.accel.intersect(self.scene, ray);

        for crossing in &isect.crossings {
            let field = match ray.state {
                RayState::Start => {
                    field::direct_field(ray.d, crossing.distance, self.k, self.amplitude)
                }
                RayState::MoreReflect => {
                    field::transport(&ei, ray.d, ray.prev_mileage, crossing.distance, self.k)
                }
                RayState::FirstReflect => {
                    error!("dropping ray in transient reflect state at a receiver: {}", ray);
                    return;
                }
            };
            let mileage = ray.prev_mileage + crossing.distance;
            let scale = field::capture_scale(ray.unit_surface_area, mileage, crossing.radius);
            fields.record(crossing.receiver, &ray.path, crossing.offset, field * scale);
        }

        if depth == self.max_reflections {
            return;
        }
        let hit = match isect.occluder {
            Some(hit) => hit,
            None => return,
        };

        let (reflected, direction, mileage) = match ray.state {
            RayState::Start => {
                let at_hit = field::direct_field(ray.d, hit.distance, self.k, self.amplitude);
                let (field, jr) =
                    field::reflect(&at_hit, ray.d, hit.normal, true, 0.0, 0.0, self.k, self.eps);
                (field, jr, hit.distance)
            }
            RayState::MoreReflect => {
                let (field, jr) = field::reflect(
                    &ei,
                    ray.d,
                    hit.normal,
                    false,
                    ray.prev_mileage,
                    hit.distance,
                    self.k,
                    self.eps,
                );
                (field, jr, ray.prev_mileage + hit.distance)
            }
            RayState::FirstReflect => {
                error!("dropping ray in transient reflect state at an occluder: {}", ray);
                return;
            }
        };

        let next = ray.reflected(hit.position, direction, mileage, hit.triangle);
        self.trace(&next, reflected, depth + 1, fields);
    }
}

/// Tiles the unit sphere and casts one ray per cell. Each rayon worker
/// fills a private bucket map; the maps are merged afterwards, so the
/// result matches the serial semantics up to float summation order.
pub fn run(
    scene: &Scene,
    accel: &dyn Accelerator,
    tx: Point3,
    params: &Parameters,
    receivers: usize,
) -> RxFields {
    let lambda = field::wavelength(params.frequency);
    let tracer = Tracer {
        scene,
        accel,
        k: field::wave_number(lambda),
        amplitude: field::launch_amplitude(field::transmit_power_watts(params.tx_power)),
        eps: field::complex_permittivity(params.permittivity, params.conductivity, lambda),
        max_reflections: params.max_reflections,
    };

    let (n_theta, n_phi) = grid_size(params.ray_spacing);
    (0..n_theta)
        .into_par_iter()
        .fold(
            || RxFields::new(receivers),
            |mut fields, i| {
                for j in 0..n_phi {
                    let (direction, area) = cell(i, j, n_theta, n_phi);
                    let ray = Ray::launch(tx, direction, area);
                    tracer.trace(&ray, ComplexVector::zero(), 0, &mut fields);
                }
                fields
            },
        )
        .reduce(|| RxFields::new(receivers), RxFields::merge)
}
