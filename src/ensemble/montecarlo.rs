//! Monte-Carlo jitter shared by triangulation and configuration mode
//! (`spec.md` 4.G, "Monte-Carlo jitter").

use crate::dynamics::shape::Shape;
use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Normal};

pub const DEFAULT_SPEED_SIGMA: f64 = 100.0;
pub const DEFAULT_SHAPE_SIGMA: f64 = 0.15;
pub const DEFAULT_MASS_EPSILON: f64 = 0.1;
pub const DEFAULT_C_ML_RELATIVE_SIGMA: f64 = 0.01;

fn gaussian<R: Rng>(rng: &mut R, sigma: f64) -> f64 {
    if sigma <= 0.0 {
        return 0.0;
    }
    Normal::new(0.0, sigma).unwrap().sample(rng)
}

/// A normal draw resampled until positive, for quantities (mass, density)
/// that must stay physical (`spec.md` 4.G: "mass and density use a
/// positive-truncated normal").
pub fn positive_truncated_normal<R: Rng>(rng: &mut R, mean: f64, sigma: f64) -> f64 {
    if sigma <= 0.0 {
        return mean;
    }
    let dist = Normal::new(mean, sigma).unwrap();
    for _ in 0..1000 {
        let v = dist.sample(rng);
        if v > 0.0 {
            return v;
        }
    }
    mean
}

/// Uniform draw over `[nominal * (1 - epsilon), nominal * (1 + epsilon)]`,
/// used for a nominal mass without an explicit sigma (`spec.md` 4.G).
pub fn uniform_fractional<R: Rng>(rng: &mut R, nominal: f64, epsilon: f64) -> f64 {
    if epsilon <= 0.0 {
        return nominal;
    }
    rng.gen_range(nominal * (1.0 - epsilon)..=nominal * (1.0 + epsilon))
}

/// Isotropic Gaussian position jitter in ECI, sigma in metres.
pub fn jitter_position<R: Rng>(rng: &mut R, pos_eci: Vector3<f64>, sigma_m: f64) -> Vector3<f64> {
    pos_eci + Vector3::new(gaussian(rng, sigma_m), gaussian(rng, sigma_m), gaussian(rng, sigma_m))
}

/// Perturbs the ECI velocity's right-ascension/declination by independent
/// Gaussian draws while holding speed fixed, per `spec.md` 4.G: "ra/dec of
/// the ECI velocity are perturbed by the triangulation metadata's ra/dec
/// sigma".
pub fn jitter_velocity_direction<R: Rng>(
    rng: &mut R,
    vel_eci: Vector3<f64>,
    ra_sigma_deg: f64,
    dec_sigma_deg: f64,
) -> Vector3<f64> {
    let speed = vel_eci.norm();
    if speed < 1e-9 {
        return vel_eci;
    }
    let unit = vel_eci / speed;
    let ra = unit.y.atan2(unit.x);
    let dec = unit.z.asin();

    let ra2 = ra + gaussian(rng, ra_sigma_deg.to_radians());
    let dec2 = (dec + gaussian(rng, dec_sigma_deg.to_radians())).clamp(
        -std::f64::consts::FRAC_PI_2,
        std::f64::consts::FRAC_PI_2,
    );

    let new_unit = Vector3::new(dec2.cos() * ra2.cos(), dec2.cos() * ra2.sin(), dec2.sin());
    new_unit * speed
}

/// Jitters the scalar speed magnitude, default sigma 100 m/s.
pub fn jitter_speed<R: Rng>(rng: &mut R, speed: f64, sigma: f64) -> f64 {
    (speed + gaussian(rng, sigma)).max(0.0)
}

/// Jitters the shape factor; very sensitive, per `spec.md` 4.G.
pub fn jitter_shape<R: Rng>(rng: &mut R, shape: Shape, sigma: f64) -> Shape {
    let perturbed = (shape.factor() + gaussian(rng, sigma)).max(0.1);
    Shape::Custom(perturbed)
}

/// Jitters the mass-loss coefficient by a 1% relative Gaussian, per
/// `spec.md` 4.G.
pub fn jitter_c_ml<R: Rng>(rng: &mut R, c_ml: f64) -> f64 {
    (c_ml + gaussian(rng, c_ml * DEFAULT_C_ML_RELATIVE_SIGMA)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn positive_truncated_normal_never_goes_negative() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let v = positive_truncated_normal(&mut rng, 0.01, 0.05);
            assert!(v > 0.0);
        }
    }

    #[test]
    fn uniform_fractional_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..1000 {
            let v = uniform_fractional(&mut rng, 10.0, 0.1);
            assert!(v >= 9.0 && v <= 11.0);
        }
    }

    #[test]
    fn velocity_direction_jitter_preserves_speed() {
        let mut rng = StdRng::seed_from_u64(3);
        let vel = Vector3::new(1000.0, 2000.0, -3000.0);
        let jittered = jitter_velocity_direction(&mut rng, vel, 0.5, 0.5);
        assert!((jittered.norm() - vel.norm()).abs() < 1e-6);
    }
}
