//! Terminal-event predicate and surface backtracking (`spec.md` 4.E).
//! `check_termination` plays the role of the teacher's sign-crossing
//! `Event::eval`, evaluated directly against the three documented
//! conditions rather than through a trait object, since the ground check
//! needs a mutable terrain-cache lookup.

use crate::dynamics::darkflight::DarkflightState;
use crate::frames::{ecef2llh, eci2ecef_pos, earth_radius, Eci};
use crate::terrain::GroundHeightSource;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerminationReason {
    GroundImpact,
    DustMassThreshold,
    NegativeMass,
}

/// Checks the three terminal conditions of `spec.md` 4.E directly (rather
/// than through the `TerminalEvent` trait, since the ground check needs a
/// mutable terrain cache lookup): returns the first condition that is true.
pub fn check_termination(
    t: f64,
    state: &DarkflightState,
    t0_jd: f64,
    ground: &mut dyn GroundHeightSource,
) -> Option<TerminationReason> {
    let t_jd = t0_jd + t / 86_400.0;
    let ecef = eci2ecef_pos(Eci(state.pos_eci), t_jd);
    let llh = ecef2llh(ecef);
    let ground_radius = earth_radius(llh.lat) + ground.height_m(llh.lat, llh.lon);

    if state.pos_eci.norm() < ground_radius {
        return Some(TerminationReason::GroundImpact);
    }
    if state.mass < 1e-3 {
        return Some(TerminationReason::DustMassThreshold);
    }
    if state.mass < 0.0 {
        return Some(TerminationReason::NegativeMass);
    }
    None
}

/// Backtracks the final accepted step to the modelled ground surface,
/// per `spec.md` 4.E: linear interpolation between the last two accepted
/// positions using `f = (||p_prev|| - r_end) / (||p_prev|| - ||p_last||)`.
pub fn backtrack_to_surface(
    t_prev: f64,
    state_prev: &DarkflightState,
    t_last: f64,
    state_last: &DarkflightState,
    ground_radius_at_last: f64,
) -> (f64, DarkflightState) {
    let r_prev = state_prev.pos_eci.norm();
    let r_last = state_last.pos_eci.norm();
    let denom = r_prev - r_last;
    let f = if denom.abs() > 1e-12 {
        ((r_prev - ground_radius_at_last) / denom).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let lerp = |a: f64, b: f64| a + f * (b - a);
    let pos = state_prev.pos_eci + f * (state_last.pos_eci - state_prev.pos_eci);
    let vel = state_prev.vel_eci + f * (state_last.vel_eci - state_prev.vel_eci);
    let t = lerp(t_prev, t_last);

    let state = DarkflightState {
        pos_eci: pos,
        vel_eci: vel,
        mass: lerp(state_prev.mass, state_last.mass),
        rho_bulk: state_last.rho_bulk,
        shape_factor: state_last.shape_factor,
        c_ml: state_last.c_ml,
    };

    (t, state)
}
