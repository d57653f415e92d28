//! WGS84-class ellipsoid constants and the geodetic <-> geocentric machinery
//! that the frame conversions in `super` build on.

/// WGS84 semi-major axis (m).
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 semi-minor axis (m).
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);
/// First eccentricity squared.
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

/// Earth's standard gravitational parameter, m^3/s^2.
pub const MU_EARTH: f64 = 3.986_005_000e14;

/// Earth's rotation rate, rad/s (mean sidereal).
pub const OMEGA_EARTH: f64 = 7.292_115_146_7e-5;

/// Radius of curvature in the prime vertical at geodetic latitude `lat` (rad).
pub fn prime_vertical_radius(lat: f64) -> f64 {
    WGS84_A / (1.0 - WGS84_E2 * lat.sin().powi(2)).sqrt()
}

/// Geocentric Earth radius at geodetic latitude `lat` (rad), i.e. the
/// distance from the Earth's center to the reference ellipsoid surface.
/// This is `spec.md` 4.A's "Earth radius at a given geodetic latitude".
pub fn earth_radius(lat: f64) -> f64 {
    let (sin_lat, cos_lat) = (lat.sin(), lat.cos());
    let num = (WGS84_A.powi(2) * cos_lat).powi(2) + (WGS84_B.powi(2) * sin_lat).powi(2);
    let den = (WGS84_A * cos_lat).powi(2) + (WGS84_B * sin_lat).powi(2);
    (num / den).sqrt()
}
