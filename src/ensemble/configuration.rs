//! Configuration-mode ensemble seeding (`spec.md` 4.G.3): scalar initial
//! parameters, optionally expanded into a Monte-Carlo ensemble.

use crate::dynamics::shape::Shape;
use crate::ensemble::montecarlo::{jitter_shape, positive_truncated_normal, DEFAULT_SHAPE_SIGMA};
use crate::ensemble::ParticleSeed;
use crate::errors::{DarkflightError, Result};
use crate::frames::{ecef2eci, enu2ecef, llh2ecef, Enu, Llh};
use crate::io::types::{MetSection, MonteCarloSection};
use nalgebra::Vector3;
use rand::Rng;

/// Resolves the configuration-mode epoch: `spec.md` §6 lists `jd0 |
/// exposure_time` as alternative keys for the same role (the absolute
/// Julian date at which the luminous trajectory ends and dark flight
/// begins); different camera-network configs name the field differently.
fn resolve_epoch(met: &MetSection) -> Result<f64> {
    met.jd0
        .or(met.exposure_time)
        .ok_or_else(|| DarkflightError::InputMalformed("met section missing jd0/exposure_time".into()))
}

/// Builds the velocity vector (ENU) from total speed, zenith angle (from
/// local vertical) and azimuth (clockwise from north), descending into the
/// ground.
fn velocity_enu(vtot: f64, zenith_deg: f64, azimuth_deg: f64) -> Enu {
    let z = zenith_deg.to_radians();
    let az = azimuth_deg.to_radians();
    Enu(Vector3::new(vtot * z.sin() * az.sin(), vtot * z.sin() * az.cos(), -vtot * z.cos()))
}

fn single_seed(
    t0_jd: f64,
    lat_deg: f64,
    lon_deg: f64,
    height_m: f64,
    vtot: f64,
    zenith_deg: f64,
    azimuth_deg: f64,
    mass: f64,
    rho_bulk: f64,
    shape: Shape,
    c_ml: f64,
) -> ParticleSeed {
    let llh = Llh { lat: lat_deg.to_radians(), lon: lon_deg.to_radians(), height: height_m };
    let pos_ecef = llh2ecef(llh);
    let vel_ecef = enu2ecef(velocity_enu(vtot, zenith_deg, azimuth_deg), llh.lat, llh.lon);
    let (pos_eci, vel_eci) = ecef2eci(pos_ecef, vel_ecef, t0_jd);

    ParticleSeed {
        t0_jd,
        pos_eci: pos_eci.0,
        vel_eci: vel_eci.0,
        mass,
        rho_bulk,
        shape,
        c_ml,
        weight: 1.0,
    }
}

/// Builds the initial ensemble from scalar configuration parameters,
/// sampling `mc` Monte-Carlo realizations when `mc > 0` (`spec.md` 4.G.3).
pub fn build<R: Rng>(
    met: &MetSection,
    mc_section: &MonteCarloSection,
    shape_code: Shape,
    c_ml: f64,
    mc: usize,
    rng: &mut R,
) -> Result<Vec<ParticleSeed>> {
    let t0_jd = resolve_epoch(met)?;

    if mc == 0 {
        return Ok(vec![single_seed(
            t0_jd,
            met.lat0,
            met.lon0,
            met.z0,
            met.vtot0,
            met.zenangle,
            met.azimuth0,
            met.mass0,
            met.rdens0,
            shape_code,
            c_ml,
        )]);
    }

    let mut seeds = Vec::with_capacity(mc);
    for _ in 0..mc {
        let lat = met.lat0 + mc_section.dlat.unwrap_or(0.0) * standard_gaussian(rng);
        let lon = met.lon0 + mc_section.dlon.unwrap_or(0.0) * standard_gaussian(rng);
        let z = met.z0 + mc_section.dz.unwrap_or(0.0) * standard_gaussian(rng);
        let vtot = met.vtot0 + mc_section.dvtot.unwrap_or(0.0) * standard_gaussian(rng);
        let zenith = met.zenangle + mc_section.dzenith.unwrap_or(0.0) * standard_gaussian(rng);
        let azimuth = met.azimuth0 + mc_section.dazimuth0.unwrap_or(0.0) * standard_gaussian(rng);

        let mass = positive_truncated_normal(rng, met.mass0, mc_section.dmass.unwrap_or(0.0));
        let rho_bulk = positive_truncated_normal(rng, met.rdens0, mc_section.drdens.unwrap_or(0.0));
        let shape = jitter_shape(rng, shape_code, DEFAULT_SHAPE_SIGMA);

        seeds.push(single_seed(t0_jd, lat, lon, z, vtot, zenith, azimuth, mass, rho_bulk, shape, c_ml));
    }

    Ok(seeds)
}

fn standard_gaussian<R: Rng>(rng: &mut R) -> f64 {
    use rand_distr::{Distribution, StandardNormal};
    StandardNormal.sample(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn base_met() -> MetSection {
        MetSection {
            lat0: -33.0,
            lon0: 151.0,
            z0: 30_000.0,
            vtot0: 15_000.0,
            zenangle: 45.0,
            azimuth0: 90.0,
            rdens0: 3500.0,
            mass0: 1.0,
            jd0: Some(2_451_545.0),
            exposure_time: None,
            m_min: None,
            m_max: None,
            m_sigma: None,
            c_s: None,
        }
    }

    #[test]
    fn zero_mc_returns_single_deterministic_seed() {
        let met = base_met();
        let mc = MonteCarloSection::default();
        let mut rng = StdRng::seed_from_u64(0);
        let seeds = build(&met, &mc, Shape::Sphere, 1e-7, 0, &mut rng).unwrap();
        assert_eq!(seeds.len(), 1);
    }

    #[test]
    fn positive_mc_returns_requested_count() {
        let met = base_met();
        let mc = MonteCarloSection { dlat: Some(0.01), ..Default::default() };
        let mut rng = StdRng::seed_from_u64(0);
        let seeds = build(&met, &mc, Shape::Sphere, 1e-7, 25, &mut rng).unwrap();
        assert_eq!(seeds.len(), 25);
    }

    #[test]
    fn missing_epoch_is_input_malformed() {
        let mut met = base_met();
        met.jd0 = None;
        met.exposure_time = None;
        let mc = MonteCarloSection::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(build(&met, &mc, Shape::Sphere, 1e-7, 0, &mut rng).is_err());
    }
}
