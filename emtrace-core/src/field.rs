//! Free-space launch, transport and specular-reflection field kernels.
//!
//! All kernels work on complex 3-vector fields (V/m) and use the
//! convention `e^{-jkd}` for a wave that has travelled `d` metres.

use num::complex::Complex64;

use crate::geometry::complex::{euler, ComplexVector};
use crate::geometry::matrix::Matrix3;
use crate::geometry::Vector3;
use crate::{FREE_SPACE_IMPEDANCE, SPEED_OF_LIGHT};

use std::f64::consts::PI;

pub fn wavelength(frequency_mhz: f64) -> f64 {
    SPEED_OF_LIGHT / (frequency_mhz * 1e6)
}

pub fn wave_number(lambda: f64) -> f64 {
    2.0 * PI / lambda
}

pub fn transmit_power_watts(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0 - 3.0)
}

/// Launch-field amplitude at 1 m for an ideal vertically polarised
/// radiator of `watts` transmit power.
pub fn launch_amplitude(watts: f64) -> f64 {
    (watts * FREE_SPACE_IMPEDANCE / (2.0 * PI)).sqrt()
}

/// `ε = εr − j·60·λ·σ` with λ in metres and σ in S/m.
pub fn complex_permittivity(relative: f64, conductivity: f64, lambda: f64) -> Complex64 {
    Complex64::new(relative, -60.0 * lambda * conductivity)
}

/// Fresnel reflection coefficients `(R_H, R_V)` for grazing angle `psi`
/// (between ray and surface) against a medium of complex permittivity
/// `eps`.
pub fn fresnel_coefficients(psi: f64, eps: Complex64) -> (Complex64, Complex64) {
    let sin_psi = psi.sin();
    let cos_psi = psi.cos();
    let eta = (eps - cos_psi * cos_psi).sqrt();
    let r_h = (eps * sin_psi - eta) / (eps * sin_psi + eta);
    let r_v = (sin_psi - eta) / (sin_psi + eta);
    (r_h, r_v)
}

/// Field of the transmitter at `distance` along launch direction `j`,
/// polarised along `θ̂` of an idealised vertical dipole. Zenith-parallel
/// directions fall back to `(1,0,0)` as the azimuth seed, which only
/// fixes the arbitrary polarisation azimuth of those rays.
pub fn direct_field(j: Vector3, distance: f64, k: f64, amplitude: f64) -> ComplexVector {
    let z_cross = Vector3::new(0.0, 0.0, 1.0).cross(&j);
    let phi_hat = if z_cross.length() < 1e-6 {
        Vector3::new(1.0, 0.0, 0.0)
    } else {
        z_cross.normalize()
    };
    let theta_hat = phi_hat.cross(&j);
    let e_theta = euler(amplitude / distance, -k * distance);
    e_theta * theta_hat
}

/// Orthonormal frame `(α, β, ĵ)` for a segment direction, as the matrix
/// whose columns are the frame vectors.
pub fn transport_basis(j: Vector3) -> Matrix3 {
    let alpha = if j.x.abs() > 0.1 {
        Vector3::new(1.0, 0.0, 0.0).cross(&j)
    } else {
        Vector3::new(0.0, 1.0, 0.0).cross(&j)
    }
    .normalize();
    let beta = j.cross(&alpha);
    Matrix3::from_columns(alpha, beta, j)
}

/// Carries `ei` over a straight segment of length `s` that starts
/// `prev_mileage` metres from the transmitter: spherical divergence
/// `s1/(s1+s)` and phase delay `k·s` on the two transverse components.
pub fn transport(ei: &ComplexVector, j: Vector3, prev_mileage: f64, s: f64, k: f64) -> ComplexVector {
    let h = transport_basis(j);
    let a = h.inverse() * *ei;
    let factor = euler(prev_mileage / (prev_mileage + s), -k * s);
    let alpha = Vector3::new(h.m[0][0], h.m[1][0], h.m[2][0]);
    let beta = Vector3::new(h.m[0][1], h.m[1][1], h.m[2][1]);
    (a.x * factor) * alpha + (a.y * factor) * beta
}

/// Mirror direction of `j` on a surface whose stored outward normal is
/// `normal`; the normal is flipped to face the incoming ray first.
pub fn reflect_direction(j: Vector3, normal: Vector3) -> Vector3 {
    let n = if normal.dot(&j) < 0.0 { normal } else { -normal };
    j - 2.0 * n.dot(&j) * n
}

/// Specular reflection of the incident field `ei` travelling along `ji`
/// against a triangle with outward `normal`. On the first bounce `ei` is
/// the field already propagated to the hit, so no extra spreading is
/// applied; later bounces fold in the `prev_mileage/(prev_mileage+s2)`
/// divergence and `k·s2` delay for the segment leading to this hit.
/// Returns the reflected field and the mirror direction.
pub fn reflect(
    ei: &ComplexVector,
    ji: Vector3,
    normal: Vector3,
    first_bounce: bool,
    prev_mileage: f64,
    s2: f64,
    k: f64,
    eps: Complex64,
) -> (ComplexVector, Vector3) {
    let jr = reflect_direction(ji, normal);

    let psi = 0.5 * ji.dot(&jr).clamp(-1.0, 1.0).acos();
    let (r_h, r_v) = fresnel_coefficients(psi, eps);

    let cross = ji.cross(&jr);
    let alpha1 = if cross.length() < 1e-6 {
        // normal incidence: the incidence plane is undefined
        if ji.x.abs() > 0.1 {
            Vector3::new(0.0, 1.0, 0.0).cross(&ji).normalize()
        } else {
            Vector3::new(1.0, 0.0, 0.0).cross(&ji).normalize()
        }
    } else {
        cross.normalize()
    };
    let beta1 = ji.cross(&alpha1).normalize();
    let alpha2 = alpha1;
    let beta2 = jr.cross(&alpha2).normalize();

    let h1 = Matrix3::from_columns(alpha1, beta1, ji);
    let a = h1.inverse() * *ei;

    let factor = if first_bounce {
        Complex64::new(1.0, 0.0)
    } else {
        euler(prev_mileage / (prev_mileage + s2), -k * s2)
    };
    let field = (a.x * r_v * factor) * alpha2 + (a.y * r_h * factor) * beta2;
    (field, jr)
}

/// `sqrt(A_proj/A_rx)` under-sampling correction: a ray whose angular-cell
/// footprint at the receiver is smaller than the capture cross-section
/// may only deliver its own share of the sphere.
pub fn capture_scale(unit_surface_area: f64, mileage: f64, radius: f64) -> f64 {
    let a_proj = unit_surface_area * mileage * mileage;
    let a_rx = PI * radius * radius;
    if a_proj < a_rx {
        (a_proj / a_rx).sqrt()
    } else {
        1.0
    }
}

/// Received power for an accumulated `|E|²`, in dBm.
pub fn power_dbm(field_norm_sqr: f64, lambda: f64) -> f64 {
    let watts = lambda * lambda / (8.0 * PI * FREE_SPACE_IMPEDANCE) * field_norm_sqr;
    10.0 * watts.log10() + 30.0
}
