//! Result assembler (`spec.md` component I): turns an accepted step plus
//! the particle metadata that produced it into a tabular output record.

use crate::dynamics::darkflight::DarkflightState;
use crate::dynamics::shape::Shape;
use crate::ensemble::ParticleSeed;
use crate::frames::{ecef2llh, eci2ecef, Eci};
use crate::time::jd_to_iso;

/// One emitted output row, per `spec.md` 4.I.
#[derive(Debug, Clone)]
pub struct OutputRow {
    pub datetime_iso: String,
    pub julian_date: f64,
    pub weight: f64,
    pub initial_mass_kg: f64,
    pub mass_kg: f64,
    pub rho_bulk_kg_m3: f64,
    pub shape_code: String,
    pub c_ml: f64,
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub height_m: f64,
    pub ecef_pos_m: [f64; 3],
    pub ecef_vel_m_s: [f64; 3],
    pub speed_m_s: f64,
    pub abs_magnitude: Option<f64>,
}

/// Assembles one [`OutputRow`] from an accepted step, the seed it grew from,
/// and the shared reference epoch (`spec.md` 4.I).
pub fn assemble_row(
    t0_jd: f64,
    t_s: f64,
    state: &DarkflightState,
    seed: &ParticleSeed,
    abs_magnitude: Option<f64>,
) -> OutputRow {
    let t_jd = t0_jd + t_s / 86_400.0;
    let (pos_ecef, vel_ecef) = eci2ecef(Eci(state.pos_eci), Eci(state.vel_eci), t_jd);
    let llh = ecef2llh(pos_ecef);

    OutputRow {
        datetime_iso: jd_to_iso(t_jd),
        julian_date: t_jd,
        weight: seed.weight,
        initial_mass_kg: seed.mass,
        mass_kg: state.mass,
        rho_bulk_kg_m3: state.rho_bulk,
        shape_code: Shape::Custom(state.shape_factor).code(),
        c_ml: state.c_ml,
        lat_deg: llh.lat.to_degrees(),
        lon_deg: llh.lon.to_degrees(),
        height_m: llh.height,
        ecef_pos_m: [pos_ecef.0.x, pos_ecef.0.y, pos_ecef.0.z],
        ecef_vel_m_s: [vel_ecef.0.x, vel_ecef.0.y, vel_ecef.0.z],
        speed_m_s: vel_ecef.0.norm(),
        abs_magnitude,
    }
}

/// Error budgets used by a Monte-Carlo run (`spec.md` §6: `-me,-se,-we`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorBudgets {
    pub mass: Option<f64>,
    pub shape: Option<f64>,
    pub wind_speed: Option<f64>,
}

/// Run-level metadata accompanying a result file, per `spec.md` 4.I.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub atmosphere_source: String,
    pub requested_shape_code: String,
    pub error_budgets: Option<ErrorBudgets>,
    pub run_timestamp_iso: String,
}

impl RunMetadata {
    pub fn new(atmosphere_source: impl Into<String>, requested_shape: Shape, run_timestamp_iso: impl Into<String>) -> Self {
        Self {
            atmosphere_source: atmosphere_source.into(),
            requested_shape_code: requested_shape.code(),
            error_budgets: None,
            run_timestamp_iso: run_timestamp_iso.into(),
        }
    }

    pub fn with_error_budgets(mut self, budgets: ErrorBudgets) -> Self {
        self.error_budgets = Some(budgets);
        self
    }
}
