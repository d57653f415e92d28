//! Atmosphere sampling (`spec.md` component B).
//!
//! Three interchangeable data sources — none, a 1-D vertical sounding, or a
//! 4-D gridded forecast snapshot — are unified behind a single priority-
//! ordered `sample` contract (`spec.md` 4.B rules 1-6):
//!
//! 1. If a grid snapshot is present and covers the query height, sample it.
//! 2. Else if a sounding is present, sample it.
//! 3. Else fall back to the reference model.
//! 4. A grid sample whose vertical interpolation is NaN at every queried
//!    column falls back to the most recent history entry (rule 4); failing
//!    that, to the sounding or reference model (rule 3).
//! 5. Wind is built from the source's ENU convention, then corrected for the
//!    Earth's rotation (`omega_earth x pos_eci`) to get the true air-relative
//!    wind velocity seen by the body.
//! 6. Every sample, regardless of source, is appended to the propagation's
//!    bounded history (or discarded by a `NullHistory`).

pub mod grid;
pub mod history;
pub mod reference;
pub mod sounding;

use crate::frames::{ecef2llh, enu2ecef, gravity_vector, Eci, Enu, Llh, OMEGA_EARTH};
use grid::WindGridSnapshot;
use history::{AtmosphereHistory, HistoryEntry};
use nalgebra::Vector3;
use sounding::{wind_enu_from_sounding, Sounding};

/// Saturation vapour pressure (Pa) over liquid water at temperature `t_k`,
/// via the Wobus polynomial approximation used to recover density from
/// pressure, temperature and relative humidity (`spec.md` 4.B rule 6;
/// resolved against `examples/original_source/df_functions.py`'s
/// `WobusSVP`/density helpers).
fn wobus_svp_pa(t_k: f64) -> f64 {
    let t_c = (t_k - 273.15).clamp(-80.0, 50.0);
    const C0: f64 = 0.995_460_924_4;
    const C1: f64 = -0.014_349_697_53;
    const C2: f64 = 9.699_277_951e-5;
    const C3: f64 = -4.216_512_282e-7;
    const C4: f64 = 9.693_880_497e-10;
    const C5: f64 = -1.267_603_524e-12;
    const C6: f64 = 1.133_784_929e-15;
    const C7: f64 = -5.934_047_973e-19;
    const C8: f64 = 1.342_849_031e-22;
    let p = C0
        + t_c * (C1 + t_c * (C2 + t_c * (C3 + t_c * (C4 + t_c * (C5 + t_c * (C6 + t_c * (C7 + t_c * C8)))))));
    let es = 6.1078 / p.powi(8);
    es * 100.0 // hPa -> Pa
}

/// Moist-air density (kg/m^3) from dry-air pressure/temperature and relative
/// humidity, per `spec.md` 4.B rule 6: `rho = (P / (Rd T)) (1 - 0.378 Pv / P)`.
pub fn density_from_pressure(press_pa: f64, temp_k: f64, rhum_fraction: f64) -> f64 {
    const RD: f64 = 287.05;
    let pv = wobus_svp_pa(temp_k) * rhum_fraction.clamp(0.0, 1.0);
    (press_pa / (RD * temp_k)) * (1.0 - 0.378 * pv / press_pa)
}

#[derive(Debug, Clone, Copy)]
pub struct AtmosphereSample {
    pub density_kg_m3: f64,
    pub temperature_k: f64,
    pub pressure_pa: f64,
    /// Air-relative wind velocity in ECI, m/s (includes the Earth-rotation
    /// correction of rule 5).
    pub wind_eci: Eci,
    pub wind_enu: Enu,
}

/// A source of atmospheric state, holding at most one sounding and one grid
/// snapshot at a time, plus the reference-model fallback that is always
/// available.
#[derive(Clone)]
pub struct Atmosphere {
    sounding: Option<Sounding>,
    grid: Option<WindGridSnapshot>,
}

impl Atmosphere {
    pub fn none() -> Self {
        Self { sounding: None, grid: None }
    }

    pub fn with_sounding(sounding: Sounding) -> Self {
        Self { sounding: Some(sounding), grid: None }
    }

    pub fn with_grid(grid: WindGridSnapshot) -> Self {
        Self { sounding: None, grid: Some(grid) }
    }

    pub fn with_grid_and_sounding(grid: WindGridSnapshot, sounding: Sounding) -> Self {
        Self { sounding: Some(sounding), grid: Some(grid) }
    }

    /// Produces a Monte-Carlo-perturbed copy of this atmosphere's wind
    /// field, for use once per MC realisation (`spec.md` 4.G: "each layer
    /// ... independently offset by a uniform draw from `[-wind_err,
    /// +wind_err]`"). Temperature, pressure and humidity are left untouched;
    /// only wind is jittered.
    pub fn jittered<R: rand::Rng>(&self, rng: &mut R, wind_err: f64) -> Self {
        Self {
            sounding: self.sounding.as_ref().map(|s| s.jittered(rng, wind_err, wind_err)),
            grid: self.grid.as_ref().map(|g| g.jittered(rng, wind_err)),
        }
    }

    /// Samples atmospheric state at `pos_eci`/`t_jd`, per the priority rules
    /// documented on the module. `history` records the sample (a `NullHistory`
    /// may be passed to disable recording, e.g. during ensemble runs).
    pub fn sample(&self, pos_eci: Eci, t_jd: f64, history: &mut AtmosphereHistory) -> AtmosphereSample {
        let ecef = crate::frames::eci2ecef_pos(pos_eci, t_jd);
        let llh = ecef2llh(ecef);

        let (temp_k, press_pa, rhum, wind_enu_raw) = self.raw_sample(llh, history);
        let density = density_from_pressure(press_pa, temp_k, rhum);

        let wind_ecef = enu2ecef(wind_enu_raw, llh.lat, llh.lon);
        let omega = Vector3::new(0.0, 0.0, OMEGA_EARTH);
        // Earth-rotation correction (rule 5): the wind field is specified in
        // the rotating frame, so the inertial air velocity also carries the
        // rigid-body rotation term `omega x r`.
        let wind_eci_vec = wind_ecef.0 + omega.cross(&ecef.0);

        history.push(HistoryEntry {
            height_m: llh.height,
            wind_enu: wind_enu_raw,
            density_kg_m3: density,
            temperature_k: temp_k,
        });

        AtmosphereSample {
            density_kg_m3: density,
            temperature_k: temp_k,
            pressure_pa: press_pa,
            wind_eci: Eci(wind_eci_vec),
            wind_enu: wind_enu_raw,
        }
    }

    fn raw_sample(&self, llh: Llh, history: &AtmosphereHistory) -> (f64, f64, f64, Enu) {
        if let Some(grid) = &self.grid {
            if llh.height <= grid.max_height() {
                let gs = grid.sample(llh, history);
                if !gs.temp_k.is_nan() && !gs.press_pa.is_nan() {
                    let wind_enu = Enu(Vector3::new(gs.wind_east, gs.wind_north, gs.wind_up));
                    return (gs.temp_k, gs.press_pa, gs.rhum / 100.0, wind_enu);
                }
                // Grid vertical interpolation failed (rule 4): fall through
                // to the sounding/reference chain below.
            }
        }

        if let Some(sounding) = &self.sounding {
            if !sounding.is_empty() && llh.height <= sounding.max_height() {
                let s = sounding.sample(llh.height);
                let wind_enu = wind_enu_from_sounding(s.wind_speed, s.wind_dir_deg);
                return (s.temp_k, s.press_pa, s.rhum / 100.0, wind_enu);
            }
        }

        let (temp_k, press_pa, density) = reference::sample(llh.height);
        let _ = density; // density is re-derived uniformly via density_from_pressure
        (temp_k, press_pa, 0.0, Enu(Vector3::zeros()))
    }
}

/// Combined gravity + air-relative velocity helper used by the dynamics
/// module: `v_rel = v_eci - wind_eci`.
pub fn relative_velocity(vel_eci: Vector3<f64>, wind_eci: Eci) -> Vector3<f64> {
    vel_eci - wind_eci.0
}

pub fn gravity_eci(pos_eci: Eci) -> Vector3<f64> {
    gravity_vector(pos_eci)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_atmosphere_uses_reference_model_and_zero_wind() {
        let atm = Atmosphere::none();
        let mut history = AtmosphereHistory::default();
        let pos = Eci::new(6_378_137.0, 0.0, 0.0);
        let sample = atm.sample(pos, 2_451_545.0, &mut history);
        assert!(sample.density_kg_m3 > 0.0);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn wobus_svp_increases_with_temperature() {
        let p_cold = wobus_svp_pa(250.0);
        let p_warm = wobus_svp_pa(300.0);
        assert!(p_warm > p_cold);
    }

    #[test]
    fn density_from_pressure_matches_dry_ideal_gas_at_zero_humidity() {
        let rho = density_from_pressure(101_325.0, 288.15, 0.0);
        assert!((rho - 1.225).abs() < 0.01);
    }

    #[test]
    fn query_above_sounding_top_falls_back_to_reference_model() {
        use sounding::SoundingLevel;
        let sounding = Sounding::new(vec![
            SoundingLevel { height_m: 0.0, temp_k: 288.15, press_pa: 101_325.0, rhum: 0.3, wind_speed: 20.0, wind_dir_deg: 270.0 },
            SoundingLevel { height_m: 10_000.0, temp_k: 220.0, press_pa: 26_500.0, rhum: 0.1, wind_speed: 20.0, wind_dir_deg: 270.0 },
        ]);
        let atm = Atmosphere::with_sounding(sounding);
        let mut history = AtmosphereHistory::default();
        let pos = Eci::new(earth_radius_plus(50_000.0), 0.0, 0.0);
        let sample = atm.sample(pos, 2_451_545.0, &mut history);
        // The sounding clamps to a nonzero top-level wind; the reference
        // model (no sounding/grid coverage) always reports zero wind, so a
        // zero wind vector here proves the query fell through past the top.
        assert_eq!(sample.wind_enu.0, Vector3::zeros());
    }

    fn earth_radius_plus(height_m: f64) -> f64 {
        crate::frames::WGS84_A + height_m
    }

    #[test]
    fn jittered_atmosphere_perturbs_sounding_wind_only() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;
        use sounding::SoundingLevel;

        let levels = vec![SoundingLevel {
            height_m: 0.0,
            temp_k: 288.15,
            press_pa: 101_325.0,
            rhum: 0.3,
            wind_speed: 10.0,
            wind_dir_deg: 270.0,
        }];
        let atm = Atmosphere::with_sounding(Sounding::new(levels));
        let mut rng = StdRng::seed_from_u64(11);
        let jittered = atm.jittered(&mut rng, 2.0);

        let mut history = AtmosphereHistory::default();
        let pos = Eci::new(earth_radius_plus(0.0), 0.0, 0.0);
        let before = atm.sample(pos, 2_451_545.0, &mut history);
        let after = jittered.sample(pos, 2_451_545.0, &mut history);

        assert_eq!(before.temperature_k, after.temperature_k);
        // Speed perturbed by at most 2 m/s and direction by at most 2 degrees
        // off a 10 m/s base wind bounds the vector displacement well under 5.
        assert!((before.wind_enu.0 - after.wind_enu.0).norm() <= 5.0);
    }
}
