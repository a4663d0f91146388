// Lints
#![deny(unused_qualifications, unused_must_use)]
#![warn(rust_2018_idioms)]
// Clippy config
#![allow(
    clippy::float_cmp,
    clippy::many_single_char_names,
    clippy::excessive_precision,
    clippy::too_many_arguments
)]

pub mod accel;
pub mod bounds;
mod error;
pub mod field;
mod geometry;
pub mod launcher;
pub mod ray;
pub mod scene;
pub mod session;
pub mod stl;

pub use crate::accel::AccelKind;
pub use crate::error::{Error, Result};
pub use crate::geometry::complex::ComplexVector;
pub use crate::geometry::matrix::Matrix3;
pub use crate::geometry::{Axis, Point3, Vector3};
pub use crate::session::{Parameters, Session};

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
/// Free-space wave impedance, ohms.
pub const FREE_SPACE_IMPEDANCE: f64 = 377.0;

/// Smallest forward hit distance; rejects self-intersection of a ray
/// with the surface it just left.
pub const MIN_HIT_DISTANCE: f64 = 1e-4;
