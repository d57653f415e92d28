//! Mass-loss (ablation) coefficient banding (`spec.md` 4.C).

/// Piecewise-constant sigma, calibrated to bulk-density bands, multiplied by
/// the hypersonic drag coefficient to give the mass-loss coefficient used by
/// the dynamics function's ablation law.
pub fn mass_loss_coefficient(rho_bulk: f64, cd_hyp: f64) -> f64 {
    let sigma = if rho_bulk > 5000.0 {
        0.07e-6
    } else if rho_bulk > 2500.0 {
        0.014e-6
    } else if rho_bulk > 1500.0 {
        0.042e-6
    } else {
        0.1e-6
    };
    sigma * cd_hyp
}
