//! Adaptive 5(4) Dormand-Prince integrator with PI step-size control
//! (`spec.md` 4.E), generalizing the teacher's `ErrorCtrl`-driven step
//! acceptance (`error_ctrl.rs`) to this crate's fixed-size dark-flight state.

use crate::dynamics::darkflight::{derivative, DarkflightState, DynamicsConfig, DynamicsOutput, STATE_DIM};
use crate::errors::{DarkflightError, Result};
use crate::propagators::error_ctrl::{ErrorCtrl, RSSStep};
use crate::atmosphere::history::AtmosphereHistory;
use nalgebra::{VectorN, U11};

// Classic Dormand-Prince 5(4) Butcher tableau (Hairer, Norsett & Wanner;
// identical to the pair underlying scipy's `dopri5`/`RK45`).
const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

const A2: [f64; 1] = [1.0 / 5.0];
const A3: [f64; 2] = [3.0 / 40.0, 9.0 / 40.0];
const A4: [f64; 3] = [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0];
const A5: [f64; 4] = [19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0];
const A6: [f64; 5] = [
    9017.0 / 3168.0,
    -355.0 / 33.0,
    46732.0 / 5247.0,
    49.0 / 176.0,
    -5103.0 / 18656.0,
];
const A7: [f64; 6] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];

/// 5th-order solution weights (identical to `A7`: FSAL property).
const B5: [f64; 7] = [35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0, 0.0];
/// 4th-order embedded solution weights, for error estimation.
const B4: [f64; 7] = [
    5179.0 / 57600.0,
    0.0,
    7571.0 / 16695.0,
    393.0 / 640.0,
    -92097.0 / 339200.0,
    187.0 / 2100.0,
    1.0 / 40.0,
];

/// Tolerances and step bounds. `spec.md` 4.E: rtol 1e-4 always; atol 1e-6
/// and a 1e-6 s initial step only when lift is active (the tighter profile),
/// otherwise the no-lift profile's 0.1 s initial step and 3 s max step.
#[derive(Debug, Clone, Copy)]
pub struct IntegratorProfile {
    pub rtol: f64,
    pub atol: f64,
    pub dt0: f64,
    pub dt_max: f64,
}

impl IntegratorProfile {
    pub fn select(c_lift: f64) -> Self {
        if c_lift > 0.0 {
            Self { rtol: 1e-4, atol: 1e-6, dt0: 1e-6, dt_max: 5.0 }
        } else {
            Self { rtol: 1e-4, atol: 1e-6, dt0: 0.1, dt_max: 3.0 }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepCommand {
    Continue,
    Terminate,
}

/// A single accepted integration step.
#[derive(Debug, Clone, Copy)]
pub struct AcceptedStep {
    pub t: f64,
    pub state: DarkflightState,
    pub output: DynamicsOutput,
}

fn to_vector(s: &DarkflightState) -> VectorN<f64, U11> {
    VectorN::<f64, U11>::from_row_slice(&s.to_array())
}

fn from_vector(v: &VectorN<f64, U11>) -> DarkflightState {
    let mut a = [0.0; STATE_DIM];
    a.copy_from_slice(v.as_slice());
    DarkflightState::from_array(&a)
}

/// Runs the adaptive integrator from `t0` until the observer returns
/// `StepCommand::Terminate` or `max_steps` accepted steps is exceeded
/// (a defensive bound, not part of `spec.md`'s termination policy).
///
/// `observer` is called after every accepted step with `(t, &state)` and
/// decides whether to keep going. Every accepted step is appended to
/// `steps` so a single-particle run can emit the full trajectory
/// (`spec.md` 4.H).
pub fn integrate<F>(
    initial_state: DarkflightState,
    config: &DynamicsConfig,
    profile: IntegratorProfile,
    history: &mut AtmosphereHistory,
    mut observer: F,
    steps: &mut Vec<AcceptedStep>,
) -> Result<()>
where
    F: FnMut(f64, &DarkflightState) -> StepCommand,
{
    const MAX_STEPS: usize = 2_000_000;

    let mut t = 0.0_f64;
    let mut state = initial_state;
    let mut h = profile.dt0;
    let mut err_prev = 1.0_f64;

    let (deriv0, out0) = derivative(t, &state, config, history);
    steps.push(AcceptedStep { t, state, output: out0 });
    if observer(t, &state) == StepCommand::Terminate {
        return Ok(());
    }
    let mut k1 = deriv0;

    for _ in 0..MAX_STEPS {
        if h.abs() < 1e-14 {
            return Err(DarkflightError::StepSizeUnderflow);
        }

        let y0 = to_vector(&state);
        let f = |st: &DarkflightState, tt: f64, hist: &mut AtmosphereHistory| derivative(tt, st, config, hist).0;

        let k1v = to_vector(&k1);

        let s2 = from_vector(&(y0 + h * A2[0] * k1v));
        let k2 = f(&s2, t + C[1] * h, history);
        let k2v = to_vector(&k2);

        let s3 = from_vector(&(y0 + h * (A3[0] * k1v + A3[1] * k2v)));
        let k3 = f(&s3, t + C[2] * h, history);
        let k3v = to_vector(&k3);

        let s4 = from_vector(&(y0 + h * (A4[0] * k1v + A4[1] * k2v + A4[2] * k3v)));
        let k4 = f(&s4, t + C[3] * h, history);
        let k4v = to_vector(&k4);

        let s5 = from_vector(&(y0 + h * (A5[0] * k1v + A5[1] * k2v + A5[2] * k3v + A5[3] * k4v)));
        let k5 = f(&s5, t + C[4] * h, history);
        let k5v = to_vector(&k5);

        let s6 = from_vector(
            &(y0 + h * (A6[0] * k1v + A6[1] * k2v + A6[2] * k3v + A6[3] * k4v + A6[4] * k5v)),
        );
        let k6 = f(&s6, t + C[5] * h, history);
        let k6v = to_vector(&k6);

        let s7 = from_vector(
            &(y0 + h * (A7[0] * k1v + A7[1] * k2v + A7[2] * k3v + A7[3] * k4v + A7[4] * k5v + A7[5] * k6v)),
        );
        let (k7_state, out7) = derivative(t + C[6] * h, &s7, config, history);
        let k7v = to_vector(&k7_state);

        let ks = [k1v, k2v, k3v, k4v, k5v, k6v, k7v];

        let mut y5 = y0;
        let mut y4 = y0;
        for (i, k) in ks.iter().enumerate() {
            y5 += h * B5[i] * k;
            y4 += h * B4[i] * k;
        }

        let error_est = y5 - y4;
        let tol = VectorN::<f64, U11>::from_fn(|i, _| profile.atol + profile.rtol * y5[i].abs().max(y0[i].abs()));
        let scaled_error = VectorN::<f64, U11>::from_fn(|i, _| error_est[i] / tol[i].max(1e-300));

        let err_norm = RSSStep::estimate::<U11>(&scaled_error, &y5, &y0).max(1e-12);

        if !err_norm.is_finite() || !y5.iter().all(|v| v.is_finite()) {
            return Err(DarkflightError::NonFiniteState);
        }

        if err_norm <= 1.0 {
            let next_state = from_vector(&y5);
            let next_t = t + h;

            steps.push(AcceptedStep { t: next_t, state: next_state, output: out7 });

            let command = observer(next_t, &next_state);

            t = next_t;
            state = next_state;
            k1 = s7_derivative_at_accept(&k7_state);
            err_prev = err_norm;

            if command == StepCommand::Terminate {
                return Ok(());
            }
        }

        // PI step-size control (Gustafsson): combines the current error
        // with the previous accepted step's error so the step size doesn't
        // oscillate near the tolerance boundary.
        const SAFETY: f64 = 0.9;
        const ALPHA: f64 = 0.2; // 1 / (order + 1), order = 4 (embedded)
        const BETA: f64 = 0.04;
        const FAC_MIN: f64 = 0.2;
        const FAC_MAX: f64 = 5.0;

        let fac = SAFETY * err_norm.powf(-ALPHA) * err_prev.powf(BETA);
        let fac = fac.clamp(FAC_MIN, FAC_MAX);
        h = (h * fac).min(profile.dt_max).max(1e-12);
    }

    Err(DarkflightError::StepSizeUnderflow)
}

fn s7_derivative_at_accept(k7_state: &DarkflightState) -> DarkflightState {
    *k7_state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::Atmosphere;
    use crate::frames::WGS84_A;
    use nalgebra::Vector3;

    fn sample_state() -> DarkflightState {
        DarkflightState {
            pos_eci: Vector3::new(WGS84_A + 30_000.0, 0.0, 0.0),
            vel_eci: Vector3::new(0.0, 0.0, -200.0),
            mass: 1.0,
            rho_bulk: 3500.0,
            shape_factor: 1.21,
            c_ml: 1e-7,
        }
    }

    /// Idempotence (`spec.md` §8): an observer that terminates immediately
    /// after the first (unintegrated) sample leaves the state untouched.
    #[test]
    fn zero_second_propagation_returns_initial_state_exactly() {
        let initial = sample_state();
        let atmosphere = Atmosphere::none();
        let config = DynamicsConfig { atmosphere: &atmosphere, t0_jd: 2_451_545.0, c_lift: 0.0, luminosity_weight: None };
        let profile = IntegratorProfile::select(0.0);
        let mut history = AtmosphereHistory::default();
        let mut steps = Vec::new();

        integrate(initial, &config, profile, &mut history, |_, _| StepCommand::Terminate, &mut steps).unwrap();

        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].t, 0.0);
        assert_eq!(steps[0].state, initial);
    }

    /// Invariant (`spec.md` §8): mass is strictly decreasing across accepted
    /// steps whenever ablation is active (`c_ml > 0`, real atmosphere).
    #[test]
    fn mass_strictly_decreases_with_ablation_active() {
        let initial = sample_state();
        let atmosphere = Atmosphere::none();
        let config = DynamicsConfig { atmosphere: &atmosphere, t0_jd: 2_451_545.0, c_lift: 0.0, luminosity_weight: None };
        let profile = IntegratorProfile::select(0.0);
        let mut history = AtmosphereHistory::default();
        let mut steps = Vec::new();
        let mut count = 0;

        integrate(initial, &config, profile, &mut history, |_, _| {
            count += 1;
            if count >= 50 { StepCommand::Terminate } else { StepCommand::Continue }
        }, &mut steps)
        .unwrap();

        for pair in steps.windows(2) {
            assert!(pair[1].state.mass < pair[0].state.mass, "mass did not strictly decrease: {} -> {}", pair[0].state.mass, pair[1].state.mass);
        }
    }
}
