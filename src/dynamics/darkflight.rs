//! The dark-flight equations of motion (`spec.md` 4.D).

use crate::atmosphere::{gravity_eci, relative_velocity, Atmosphere};
use crate::atmosphere::history::AtmosphereHistory;
use crate::dynamics::drag::drag_coefficient;
use crate::dynamics::mass_loss::mass_loss_coefficient;
use crate::frames::Eci;
use nalgebra::Vector3;

/// Fixed-size state vector carried by the integrator: position (ECI, m),
/// velocity (ECI, m/s), mass (kg), bulk density (kg/m^3), shape factor, and
/// mass-loss coefficient. The last three are carried as state purely so the
/// integrator's generic step machinery doesn't need a side channel; their
/// derivative is always zero (`spec.md` 4.D: "dρ_bulk = dA = dc_ml = 0").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DarkflightState {
    pub pos_eci: Vector3<f64>,
    pub vel_eci: Vector3<f64>,
    pub mass: f64,
    pub rho_bulk: f64,
    pub shape_factor: f64,
    pub c_ml: f64,
}

pub const STATE_DIM: usize = 11;

impl DarkflightState {
    pub fn to_array(&self) -> [f64; STATE_DIM] {
        [
            self.pos_eci.x,
            self.pos_eci.y,
            self.pos_eci.z,
            self.vel_eci.x,
            self.vel_eci.y,
            self.vel_eci.z,
            self.mass,
            self.rho_bulk,
            self.shape_factor,
            self.c_ml,
            0.0, // reserved: keeps the array a round STATE_DIM if fields grow
        ]
    }

    pub fn from_array(a: &[f64; STATE_DIM]) -> Self {
        Self {
            pos_eci: Vector3::new(a[0], a[1], a[2]),
            vel_eci: Vector3::new(a[3], a[4], a[5]),
            mass: a[6],
            rho_bulk: a[7],
            shape_factor: a[8],
            c_ml: a[9],
        }
    }
}

/// Configuration carried alongside the state through every derivative
/// evaluation: the atmosphere source, the reference epoch, and the lift
/// coefficient (zero disables the lift term entirely, per `spec.md` 4.D).
pub struct DynamicsConfig<'a> {
    pub atmosphere: &'a Atmosphere,
    pub t0_jd: f64,
    pub c_lift: f64,
    /// Original program's `X[10]` luminous-efficiency-like weight; `None`
    /// disables the absolute-magnitude side channel entirely.
    pub luminosity_weight: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicsOutput {
    pub abs_magnitude: Option<f64>,
}

/// Evaluates `dstate/dt` at `(t, state)`, per `spec.md` 4.D. `t` is seconds
/// elapsed since `config.t0_jd`. Samples are appended to `history`.
pub fn derivative(
    t: f64,
    state: &DarkflightState,
    config: &DynamicsConfig,
    history: &mut AtmosphereHistory,
) -> (DarkflightState, DynamicsOutput) {
    let t_jd = config.t0_jd + t / 86_400.0;
    let pos_eci = Eci(state.pos_eci);

    let a_gravity = gravity_eci(pos_eci);

    let atm = config.atmosphere.sample(pos_eci, t_jd, history);
    let v_rel = relative_velocity(state.vel_eci, atm.wind_eci);
    let speed = v_rel.norm();

    let regime = drag_coefficient(speed, atm.temperature_k, atm.density_kg_m3, state.shape_factor);
    let cd = regime.cd;

    let denom_drag = 2.0 * state.mass.max(1e-12).cbrt() * state.rho_bulk.max(1e-6).powf(2.0 / 3.0);
    let a_drag = if denom_drag > 0.0 && speed > 0.0 {
        -cd * state.shape_factor * atm.density_kg_m3 * speed * v_rel / denom_drag
    } else {
        Vector3::zeros()
    };

    let a_lift = if config.c_lift > 0.0 && speed > 0.0 {
        let cross = a_gravity.cross(&v_rel);
        let cross_norm = cross.norm();
        if cross_norm > 1e-12 {
            let n_lift = cross / cross_norm;
            config.c_lift * state.shape_factor * atm.density_kg_m3 * speed * speed * n_lift / denom_drag.max(1e-30)
        } else {
            Vector3::zeros()
        }
    } else {
        Vector3::zeros()
    };

    let dm_dt = if state.mass > 0.0 {
        -state.c_ml * state.shape_factor * atm.density_kg_m3 * speed.powi(3) * state.mass.powf(2.0 / 3.0)
            / (2.0 * state.rho_bulk.max(1e-6).powf(2.0 / 3.0))
    } else {
        0.0
    };

    let derivative = DarkflightState {
        pos_eci: state.vel_eci,
        vel_eci: a_gravity + a_drag + a_lift,
        mass: dm_dt,
        rho_bulk: 0.0,
        shape_factor: 0.0,
        c_ml: 0.0,
    };

    let abs_magnitude = config.luminosity_weight.map(|weight| {
        // spec.md D item 1: lum = -weight * (v^2/2 + Cd/c_ml) * dm/dt * 1e7,
        // abs mag = -2.5 log10(lum / 1.5e10).
        let lum = -weight * (speed * speed / 2.0 + cd / state.c_ml.max(1e-30)) * dm_dt * 1e7;
        -2.5 * (lum.max(1e-300) / 1.5e10).log10()
    });

    (derivative, DynamicsOutput { abs_magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::Atmosphere;

    fn base_state() -> DarkflightState {
        DarkflightState {
            pos_eci: Vector3::new(6_400_000.0, 0.0, 0.0),
            vel_eci: Vector3::new(0.0, 1000.0, -3000.0),
            mass: 1.0,
            rho_bulk: 3500.0,
            shape_factor: 1.21,
            c_ml: 0.042e-6 * 2.0,
        }
    }

    #[test]
    fn mass_derivative_is_non_positive() {
        let atm = Atmosphere::none();
        let mut history = AtmosphereHistory::default();
        let config = DynamicsConfig {
            atmosphere: &atm,
            t0_jd: 2_451_545.0,
            c_lift: 0.0,
            luminosity_weight: None,
        };
        let (deriv, _) = derivative(0.0, &base_state(), &config, &mut history);
        assert!(deriv.mass <= 0.0);
    }

    #[test]
    fn shape_density_coefficient_derivatives_are_zero() {
        let atm = Atmosphere::none();
        let mut history = AtmosphereHistory::default();
        let config = DynamicsConfig {
            atmosphere: &atm,
            t0_jd: 2_451_545.0,
            c_lift: 0.0,
            luminosity_weight: None,
        };
        let (deriv, _) = derivative(0.0, &base_state(), &config, &mut history);
        assert_eq!(deriv.rho_bulk, 0.0);
        assert_eq!(deriv.shape_factor, 0.0);
        assert_eq!(deriv.c_ml, 0.0);
    }

    #[test]
    fn no_lift_configured_gives_zero_lift_contribution() {
        let atm = Atmosphere::none();
        let mut history = AtmosphereHistory::default();
        let config_no_lift = DynamicsConfig {
            atmosphere: &atm,
            t0_jd: 2_451_545.0,
            c_lift: 0.0,
            luminosity_weight: None,
        };
        let config_lift = DynamicsConfig {
            atmosphere: &atm,
            t0_jd: 2_451_545.0,
            c_lift: 1.0,
            luminosity_weight: None,
        };
        let (d1, _) = derivative(0.0, &base_state(), &config_no_lift, &mut history);
        let (d2, _) = derivative(0.0, &base_state(), &config_lift, &mut AtmosphereHistory::default());
        assert_ne!(d1.vel_eci, d2.vel_eci);
    }
}
