//! Hypersonic drag coefficient model (`spec.md` 4.C).
//!
//! The coefficient is a pure function of relative speed, air temperature,
//! density and shape factor, blended across the free-molecular, transition
//! and continuum flow regimes by Knudsen number, in the spirit of the
//! bridging formulae surveyed by Bird (*Molecular Gas Dynamics and the
//! Direct Simulation of Gas Flows*) and commonly used in meteoroid ablation
//! codes. The original program's own `atm_functions.dragcoeff` was not part
//! of the retrieved source; this module reconstructs the same three-regime
//! shape described by `spec.md` 4.C from that standard literature form,
//! keeping `Cd_hypersonic` as the free-molecular asymptote.

const BOLTZMANN: f64 = 1.380649e-23;
const AIR_MOLECULE_DIAMETER: f64 = 3.64e-10;
const GAS_CONSTANT_SPECIFIC: f64 = 287.05;
const GAMMA_AIR: f64 = 1.4;

/// High-Mach (free-molecular) drag coefficient for a catalogued shape.
/// `spec.md` 4.C: "e.g. 2.0 for sphere-like bodies".
pub fn cd_hypersonic(shape_factor: f64) -> f64 {
    // Sphere-like bodies (A ~ 1.21) sit near 2.0; the coefficient scales
    // mildly with bluffness as A departs from the sphere's reference value.
    2.0 * (shape_factor / 1.21).powf(0.15)
}

/// Mean free path (m) of air at the given state, via kinetic theory:
/// `lambda = 1 / (sqrt(2) * pi * d^2 * n)`, `n` the number density.
fn mean_free_path(temp_k: f64, pressure_pa: f64) -> f64 {
    const SEA_LEVEL_FALLBACK: f64 = 6.6e-8;
    if pressure_pa <= 0.0 || temp_k <= 0.0 {
        return SEA_LEVEL_FALLBACK;
    }
    let n = pressure_pa / (BOLTZMANN * temp_k);
    let d = AIR_MOLECULE_DIAMETER;
    1.0 / (std::f64::consts::SQRT_2 * std::f64::consts::PI * d * d * n)
}

fn speed_of_sound(temp_k: f64) -> f64 {
    (GAMMA_AIR * GAS_CONSTANT_SPECIFIC * temp_k).sqrt()
}

fn reynolds_number(speed: f64, density_kg_m3: f64, temp_k: f64, length_scale: f64) -> f64 {
    // Sutherland's law for dynamic viscosity of air (Pa.s).
    const MU0: f64 = 1.716e-5;
    const T0: f64 = 273.15;
    const SUTHERLAND_S: f64 = 110.4;
    let mu = MU0 * (temp_k / T0).powf(1.5) * (T0 + SUTHERLAND_S) / (temp_k + SUTHERLAND_S);
    density_kg_m3 * speed * length_scale / mu
}

/// Characteristic length scale (m) implied by the shape factor, used only
/// for Reynolds-number bookkeeping: `spec.md` asks that `drag_coefficient`
/// return `Re` alongside `Cd`, not that a geometric size be tracked as
/// dynamical state, so a nominal 0.1 m reference body is used.
const NOMINAL_LENGTH_SCALE: f64 = 0.1;

#[derive(Debug, Clone, Copy)]
pub struct DragRegime {
    pub cd: f64,
    pub reynolds: f64,
    pub knudsen: f64,
    pub mach: f64,
}

/// Blends free-molecular, transition and continuum drag coefficients by
/// Knudsen number, per `spec.md` 4.C.
pub fn drag_coefficient(speed: f64, temp_k: f64, density_kg_m3: f64, shape_factor: f64) -> DragRegime {
    let pressure_pa = density_kg_m3 * GAS_CONSTANT_SPECIFIC * temp_k;
    let lambda = mean_free_path(temp_k, pressure_pa);
    let kn = lambda / NOMINAL_LENGTH_SCALE;
    let mach = speed / speed_of_sound(temp_k);
    let re = reynolds_number(speed, density_kg_m3, temp_k, NOMINAL_LENGTH_SCALE);

    let cd_fm = cd_hypersonic(shape_factor);
    // Continuum hypersonic drag coefficient asymptote for a bluff body at
    // high Mach number (blunt-body limit), used as the Kn -> 0 endpoint.
    let cd_continuum = 0.92 * (shape_factor / 1.21).powf(0.2);

    // Standard logistic bridging function between free-molecular (Kn >> 1)
    // and continuum (Kn << 1) flow, using log(Kn) as the blend parameter so
    // the transition regime spans several decades of Kn, matching the
    // free-molecular/transition/continuum split called for by spec.md 4.C.
    let bridge = 1.0 / (1.0 + (3.0 * kn.ln()).clamp(-50.0, 50.0).exp());
    let cd = cd_continuum + (cd_fm - cd_continuum) * (1.0 - bridge);

    DragRegime { cd, reynolds: re, knudsen: kn, mach }
}
