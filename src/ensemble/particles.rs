//! Particle-mode ensemble seeding (`spec.md` 4.G.2): a gridded posterior
//! from a preceding Monte-Carlo fit.

use crate::dynamics::drag::cd_hypersonic;
use crate::dynamics::shape::Shape;
use crate::ensemble::ParticleSeed;
use crate::errors::Result;
use crate::frames::{ecef2eci, Ecef};
use crate::io::types::ParticleRow;
use crate::time::parse_iso_to_jd;
use std::collections::HashSet;

const MASS_FLOOR_KG: f64 = 0.010;

/// Builds the initial ensemble from a particle snapshot, taking every
/// unique terminal position whose mass exceeds 10 g (`spec.md` 4.G.2). Only
/// rows at the snapshot's last time step are candidates; earlier time steps
/// are intermediate trajectory samples, not terminal positions.
pub fn build(rows: &[ParticleRow]) -> Result<Vec<ParticleSeed>> {
    let last_time = rows.iter().map(|r| r.time).fold(f64::MIN, f64::max);
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for row in rows {
        if row.time != last_time {
            continue;
        }
        if row.mass <= MASS_FLOOR_KG {
            continue;
        }
        let key = (
            row.x_geo.to_bits(),
            row.y_geo.to_bits(),
            row.z_geo.to_bits(),
        );
        if !seen.insert(key) {
            continue;
        }

        let t0_jd = parse_iso_to_jd(&row.datetime)?;
        let pos_ecef = Ecef::new(row.x_geo, row.y_geo, row.z_geo);
        let vel_ecef = Ecef::new(row.x_geo_dt, row.y_geo_dt, row.z_geo_dt);
        let (pos_eci, vel_eci) = ecef2eci(pos_ecef, vel_ecef, t0_jd);

        let rho_bulk = (1.5 / row.kappa).powf(1.5);
        let shape = Shape::Custom(row.a);
        // The original computes `c_ml = sigma * cd_hypersonic(A)` at load
        // time rather than storing it directly (`DFN_DarkFlight.py` ~l.394).
        let c_ml = row.sigma * cd_hypersonic(row.a);

        seeds.push(ParticleSeed {
            t0_jd,
            pos_eci: pos_eci.0,
            vel_eci: vel_eci.0,
            mass: row.mass,
            rho_bulk,
            shape,
            c_ml,
            weight: row.weight,
        });
    }

    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(mass: f64, x: f64) -> ParticleRow {
        ParticleRow {
            time: 0.0,
            x_geo: x,
            y_geo: 0.0,
            z_geo: 6_378_137.0,
            x_geo_dt: 0.0,
            y_geo_dt: 0.0,
            z_geo_dt: -1000.0,
            mass,
            kappa: 1.5,
            sigma: 0.1,
            a: 1.21,
            weight: 1.0,
            datetime: "2020-01-01T00:00:00".to_string(),
        }
    }

    #[test]
    fn filters_particles_below_mass_floor() {
        let rows = vec![row(0.005, 0.0), row(0.05, 1.0)];
        let seeds = build(&rows).unwrap();
        assert_eq!(seeds.len(), 1);
    }

    #[test]
    fn deduplicates_identical_terminal_positions() {
        let rows = vec![row(0.05, 1.0), row(0.05, 1.0)];
        let seeds = build(&rows).unwrap();
        assert_eq!(seeds.len(), 1);
    }

    #[test]
    fn reconstructs_bulk_density_from_kappa() {
        let rows = vec![row(0.05, 1.0)];
        let seeds = build(&rows).unwrap();
        // kappa = 1.5 => rho_bulk = (1.5/1.5)^1.5 = 1.0
        assert!((seeds[0].rho_bulk - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ignores_non_terminal_time_steps() {
        let mut early = row(0.05, 0.0);
        early.time = 0.0;
        early.mass = 0.02;
        let mut terminal = row(0.05, 1.0);
        terminal.time = 5.0;
        terminal.mass = 0.08;
        let seeds = build(&[early, terminal]).unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].mass, 0.08);
    }
}
