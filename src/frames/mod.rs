//! Frame & geodesy utilities (`spec.md` component A).
//!
//! Coordinate frames are encoded as distinct newtypes around
//! `nalgebra::Vector3<f64>` so that a position or velocity cannot be passed
//! to a function expecting the wrong frame without an explicit conversion
//! call — the "coordinate-frame correctness" design note of `spec.md` §9.
//! All conversions here are pure functions of their inputs.

pub mod geodesy;

pub use geodesy::{earth_radius, MU_EARTH, OMEGA_EARTH, WGS84_A, WGS84_B, WGS84_E2};

use nalgebra::{Matrix3, Vector3};

/// Earth-centred inertial position or velocity (m or m/s).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eci(pub Vector3<f64>);

/// Earth-centred Earth-fixed position or velocity (m or m/s).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ecef(pub Vector3<f64>);

/// East/North/Up local tangent-plane vector (m or m/s), not a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Enu(pub Vector3<f64>);

/// Geodetic latitude (rad), longitude (rad), height above the WGS84-class
/// ellipsoid (m).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Llh {
    pub lat: f64,
    pub lon: f64,
    pub height: f64,
}

impl Eci {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Vector3::new(x, y, z))
    }

    pub fn norm(&self) -> f64 {
        self.0.norm()
    }
}

impl Ecef {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Vector3::new(x, y, z))
    }

    pub fn norm(&self) -> f64 {
        self.0.norm()
    }
}

/// Greenwich mean sidereal angle (rad) at Julian date `t_jd`, accounting for
/// Earth rotation only (no precession/nutation), per `spec.md` 4.A.
pub fn gmst_rad(t_jd: f64) -> f64 {
    const J2000: f64 = 2_451_545.0;
    const SECONDS_PER_DAY: f64 = 86_400.0;
    let d = t_jd - J2000;
    // Mean sidereal time at J2000 plus the Earth's rotation rate times the
    // elapsed time; this is the rotation-only approximation spec.md asks for.
    let theta0 = 280.460_618_37_f64.to_radians();
    let theta = theta0 + OMEGA_EARTH * d * SECONDS_PER_DAY;
    theta.rem_euclid(2.0 * std::f64::consts::PI)
}

fn r3(theta: f64) -> Matrix3<f64> {
    let (s, c) = theta.sin_cos();
    Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0)
}

/// ECI -> ECEF for a position, at Julian date `t_jd`.
pub fn eci2ecef_pos(pos: Eci, t_jd: f64) -> Ecef {
    let theta = gmst_rad(t_jd);
    Ecef(r3(theta) * pos.0)
}

/// ECEF -> ECI for a position, at Julian date `t_jd`.
pub fn ecef2eci_pos(pos: Ecef, t_jd: f64) -> Eci {
    let theta = gmst_rad(t_jd);
    Eci(r3(theta).transpose() * pos.0)
}

/// ECI -> ECEF for a (position, velocity) pair, accounting for the frame's
/// rotation rate in the velocity transform.
pub fn eci2ecef(pos: Eci, vel: Eci, t_jd: f64) -> (Ecef, Ecef) {
    let theta = gmst_rad(t_jd);
    let rot = r3(theta);
    let omega = Vector3::new(0.0, 0.0, OMEGA_EARTH);
    let pos_ecef = rot * pos.0;
    let vel_ecef = rot * vel.0 - omega.cross(&pos_ecef);
    (Ecef(pos_ecef), Ecef(vel_ecef))
}

/// ECEF -> ECI for a (position, velocity) pair.
pub fn ecef2eci(pos: Ecef, vel: Ecef, t_jd: f64) -> (Eci, Eci) {
    let theta = gmst_rad(t_jd);
    let rot_t = r3(theta).transpose();
    let omega = Vector3::new(0.0, 0.0, OMEGA_EARTH);
    let vel_eci_frame = vel.0 + omega.cross(&pos.0);
    (Eci(rot_t * pos.0), Eci(rot_t * vel_eci_frame))
}

/// Geodetic latitude/longitude/height from ECEF, using Bowring's method on a
/// WGS84-class ellipsoid.
pub fn ecef2llh(pos: Ecef) -> Llh {
    let Vector3 { x, y, z, .. } = pos.0;
    let p = (x * x + y * y).sqrt();
    let lon = y.atan2(x);

    if p < 1e-12 {
        // On the polar axis; longitude is undefined, latitude is +/-90 deg.
        let lat = if z >= 0.0 {
            std::f64::consts::FRAC_PI_2
        } else {
            -std::f64::consts::FRAC_PI_2
        };
        let height = z.abs() - WGS84_B;
        return Llh { lat, lon: 0.0, height };
    }

    // Bowring's initial guess, then two Newton-style refinements; converges
    // to sub-millimetre accuracy everywhere off the poles.
    let theta = (z * WGS84_A).atan2(p * WGS84_B);
    let ep2 = (WGS84_A.powi(2) - WGS84_B.powi(2)) / WGS84_B.powi(2);
    let mut lat = (z + ep2 * WGS84_B * theta.sin().powi(3))
        .atan2(p - WGS84_E2 * WGS84_A * theta.cos().powi(3));

    for _ in 0..2 {
        let n = geodesy::prime_vertical_radius(lat);
        let height = p / lat.cos() - n;
        lat = (z / p) * (1.0 - WGS84_E2 * n / (n + height)).recip().atan();
    }

    let n = geodesy::prime_vertical_radius(lat);
    let height = p / lat.cos() - n;

    Llh { lat, lon, height }
}

/// ECEF from geodetic latitude/longitude/height on a WGS84-class ellipsoid.
pub fn llh2ecef(llh: Llh) -> Ecef {
    let n = geodesy::prime_vertical_radius(llh.lat);
    let (sin_lat, cos_lat) = (llh.lat.sin(), llh.lat.cos());
    let (sin_lon, cos_lon) = (llh.lon.sin(), llh.lon.cos());
    let x = (n + llh.height) * cos_lat * cos_lon;
    let y = (n + llh.height) * cos_lat * sin_lon;
    let z = ((1.0 - WGS84_E2) * n + llh.height) * sin_lat;
    Ecef::new(x, y, z)
}

/// Rotation matrix from ENU to ECEF at geodetic (lat, lon).
pub fn enu2ecef_matrix(lat: f64, lon: f64) -> Matrix3<f64> {
    let (sin_lat, cos_lat) = (lat.sin(), lat.cos());
    let (sin_lon, cos_lon) = (lon.sin(), lon.cos());
    Matrix3::new(
        -sin_lon,
        -sin_lat * cos_lon,
        cos_lat * cos_lon,
        cos_lon,
        -sin_lat * sin_lon,
        cos_lat * sin_lon,
        0.0,
        cos_lat,
        sin_lat,
    )
}

/// ENU -> ECEF vector conversion at a given geodetic (lat, lon).
pub fn enu2ecef(enu: Enu, lat: f64, lon: f64) -> Ecef {
    Ecef(enu2ecef_matrix(lat, lon) * enu.0)
}

/// ECEF -> ENU vector conversion at a given geodetic (lat, lon).
pub fn ecef2enu(ecef: Ecef, lat: f64, lon: f64) -> Enu {
    Enu(enu2ecef_matrix(lat, lon).transpose() * ecef.0)
}

/// Central-body gravitational acceleration at an ECI position, m/s^2.
/// `spec.md` 4.A: uses mu = 3.986005e14 m^3/s^2; higher-order harmonics are
/// out of scope.
pub fn gravity_vector(pos: Eci) -> Vector3<f64> {
    let r = pos.0.norm();
    -MU_EARTH / r.powi(3) * pos.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn llh_ecef_roundtrip() {
        let cases = [
            (0.0_f64.to_radians(), 0.0_f64.to_radians(), 0.0),
            (45.0_f64.to_radians(), 130.0_f64.to_radians(), 1000.0),
            (-33.8_f64.to_radians(), 151.2_f64.to_radians(), 35_000.0),
            (89.0_f64.to_radians(), 10.0_f64.to_radians(), 500.0),
        ];
        for (lat, lon, height) in cases {
            let llh = Llh { lat, lon, height };
            let ecef = llh2ecef(llh);
            let back = ecef2llh(ecef);
            assert_relative_eq!(back.lat, lat, epsilon = 1e-9);
            assert_relative_eq!(back.lon, lon, epsilon = 1e-9);
            assert_relative_eq!(back.height, height, epsilon = 1e-3);
        }
    }

    #[test]
    fn eci_ecef_pos_roundtrip() {
        let t_jd = 2_451_545.3;
        let pos = Eci::new(6_778_000.0, 1234.0, -2345.0);
        let ecef = eci2ecef_pos(pos, t_jd);
        let back = ecef2eci_pos(ecef, t_jd);
        assert_relative_eq!(back.0.x, pos.0.x, epsilon = 1e-6);
        assert_relative_eq!(back.0.y, pos.0.y, epsilon = 1e-6);
        assert_relative_eq!(back.0.z, pos.0.z, epsilon = 1e-6);
    }

    #[test]
    fn gravity_points_inward() {
        let pos = Eci::new(7_000_000.0, 0.0, 0.0);
        let g = gravity_vector(pos);
        assert!(g.x < 0.0);
        assert_relative_eq!(g.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(g.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn earth_radius_between_polar_and_equatorial() {
        let r_eq = earth_radius(0.0);
        let r_pole = earth_radius(std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(r_eq, WGS84_A, epsilon = 1e-6);
        assert_relative_eq!(r_pole, WGS84_B, epsilon = 1e-6);
        assert!(r_pole < r_eq);
    }
}
