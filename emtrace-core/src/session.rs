use std::path::Path;
use std::time::Instant;

use log::info;

use crate::accel::AccelKind;
use crate::field;
use crate::geometry::Point3;
use crate::launcher::{self, RxFields};
use crate::scene::Scene;
use crate::stl;
use crate::{Error, Result};

/// Simulation parameters. Spatial quantities are metres, `frequency` is
/// MHz, `tx_power` is dBm.
#[derive(Debug, Clone)]
pub struct Parameters {
    /// Relative permittivity of all reflecting surfaces (e.g. 5.0 for
    /// concrete).
    pub permittivity: f64,
    /// Conductivity in S/m.
    pub conductivity: f64,
    /// Bounce limit; 0 traces the direct path only.
    pub max_reflections: u32,
    /// Angular cell size of the launch tiling, degrees.
    pub ray_spacing: f64,
    pub frequency: f64,
    pub tx_power: f64,
    pub rx_radius: f64,
}

impl Default for Parameters {
    fn default() -> Parameters {
        Parameters {
            permittivity: 5.0,
            conductivity: 0.01,
            max_reflections: 3,
            ray_spacing: 1.0,
            frequency: 900.0,
            tx_power: 0.0,
            rx_radius: 1.0,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> Result<()> {
        if !(self.frequency > 0.0) {
            return Err(Error::invalid_parameter(
                "frequency",
                format!("must be positive, got {} MHz", self.frequency),
            ));
        }
        if !(self.ray_spacing > 0.0 && self.ray_spacing <= 180.0) {
            return Err(Error::invalid_parameter(
                "ray_spacing",
                format!("must be in (0, 180] degrees, got {}", self.ray_spacing),
            ));
        }
        if !(self.rx_radius > 0.0) {
            return Err(Error::invalid_parameter(
                "rx_radius",
                format!("must be positive, got {} m", self.rx_radius),
            ));
        }
        Ok(())
    }
}

/// Owns the scene, the transmitter and receivers, the chosen accelerator
/// variant and the accumulated receiver fields. Drives
/// preprocess → simulate → read-out; once `simulate` has run, the
/// geometry is frozen.
#[derive(Debug, Default)]
pub struct Session {
    scene: Scene,
    accel_kind: AccelKind,
    tx: Point3,
    rx_points: Vec<Point3>,
    params: Parameters,
    fields: Option<RxFields>,
}

impl Session {
    pub fn new() -> Session {
        Session::default()
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.fields.is_some() {
            Err(Error::SceneFrozen)
        } else {
            Ok(())
        }
    }

    /// Adds one occluder triangle; its normal follows the winding of
    /// `a, b, c`. Returns the triangle index.
    pub fn add_triangle(&mut self, a: Point3, b: Point3, c: Point3) -> Result<u32> {
        self.ensure_mutable()?;
        Ok(self.scene.add_triangle(a, b, c))
    }

    /// Loads every facet of a binary STL model into the scene. Nothing is
    /// added when the file fails to parse. Returns the facet count.
    pub fn add_stl_model<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        self.ensure_mutable()?;
        let facets = stl::load_binary_stl(path)?;
        let n = facets.len();
        for facet in facets {
            let [a, b, c] = facet.vertices;
            if facet.normal.length_squared() > 1e-12 {
                self.scene
                    .add_triangle_with_normal(a, b, c, facet.normal.normalize());
            } else {
                // some exporters zero the normal; fall back to the winding
                self.scene.add_triangle(a, b, c);
            }
        }
        Ok(n)
    }

    pub fn set_preprocess_method(&mut self, kind: AccelKind) -> Result<()> {
        self.ensure_mutable()?;
        self.accel_kind = kind;
        Ok(())
    }

    pub fn set_transmitter(&mut self, point: Point3) -> Result<()> {
        self.ensure_mutable()?;
        self.tx = point;
        Ok(())
    }

    pub fn add_receiver(&mut self, point: Point3) -> Result<()> {
        self.ensure_mutable()?;
        self.rx_points.push(point);
        Ok(())
    }

    pub fn set_receivers(&mut self, points: Vec<Point3>) -> Result<()> {
        self.ensure_mutable()?;
        self.rx_points = points;
        Ok(())
    }

    pub fn set_parameters(&mut self, params: Parameters) -> Result<()> {
        self.ensure_mutable()?;
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// Attaches the receiver spheres, builds the accelerator and launches
    /// the full angular tiling. Freezes the scene.
    pub fn simulate(&mut self) -> Result<()> {
        self.ensure_mutable()?;
        self.params.validate()?;

        self.scene
            .attach_receivers(&self.rx_points, self.params.rx_radius);
        let start = Instant::now();
        let accel = self.accel_kind.build(&self.scene);
        info!(
            "simulating {} triangles, {} receivers with {:?}",
            self.scene.triangle_count(),
            self.rx_points.len(),
            self.accel_kind
        );
        let fields = launcher::run(
            &self.scene,
            accel.as_ref(),
            self.tx,
            &self.params,
            self.rx_points.len(),
        );
        info!("simulation finished in {:.2?}", start.elapsed());
        self.fields = Some(fields);
        Ok(())
    }

    /// Received power in dBm per receiver, in registration order. A
    /// receiver with no accumulated field reports `tx_power − 250`.
    pub fn rx_powers(&self) -> Vec<f64> {
        let lambda = field::wavelength(self.params.frequency);
        (0..self.rx_points.len())
            .map(|i| {
                let sum = self
                    .fields
                    .as_ref()
                    .map_or(0.0, |fields| fields.field_norm_sqr(i));
                if sum == 0.0 {
                    self.params.tx_power - 250.0
                } else {
                    field::power_dbm(sum, lambda)
                }
            })
            .collect()
    }
}
