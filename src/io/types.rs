//! Data types produced by the event-file/config-file adapters
//! (`spec.md` §6); the adapters themselves are thin (`src/io/event_file.rs`,
//! `src/io/wind_file.rs`), but these types are the concrete interface the
//! ensemble builder consumes.

use serde::Deserialize;

/// One row of a tabular triangulation (`.ecsv`-style) event file.
#[derive(Debug, Clone, Deserialize)]
pub struct TriangulationRow {
    pub datetime: String,
    #[serde(rename = "X_geo")]
    pub x_geo: f64,
    #[serde(rename = "Y_geo")]
    pub y_geo: f64,
    #[serde(rename = "Z_geo")]
    pub z_geo: f64,
    #[serde(rename = "DX_DT_geo")]
    pub dx_dt_geo: Option<f64>,
    #[serde(rename = "DY_DT_geo")]
    pub dy_dt_geo: Option<f64>,
    #[serde(rename = "DZ_DT_geo")]
    pub dz_dt_geo: Option<f64>,
    /// Speed, m/s: populated from whichever of `D_DT_EKS`/`D_DT_fitted`/
    /// `D_DT_geo` is present in the source file (`serde(alias)` tries each
    /// in turn; only one will actually be present in a given file).
    #[serde(alias = "D_DT_EKS", alias = "D_DT_fitted", alias = "D_DT_geo")]
    pub speed: Option<f64>,
    pub cross_track_error: Option<f64>,
}

/// Triangulation metadata accompanying a tabular event file.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriangulationMeta {
    pub ra_ecef_inf_deg: Option<f64>,
    pub dec_ecef_inf_deg: Option<f64>,
    pub ra_eci_inf_err_deg: Option<f64>,
    pub dec_eci_inf_err_deg: Option<f64>,
}

/// One row of a particle-snapshot event file (a preceding Monte-Carlo fit's
/// gridded posterior).
#[derive(Debug, Clone, Deserialize)]
pub struct ParticleRow {
    pub time: f64,
    #[serde(rename = "X_geo")]
    pub x_geo: f64,
    #[serde(rename = "Y_geo")]
    pub y_geo: f64,
    #[serde(rename = "Z_geo")]
    pub z_geo: f64,
    #[serde(rename = "X_geo_DT")]
    pub x_geo_dt: f64,
    #[serde(rename = "Y_geo_DT")]
    pub y_geo_dt: f64,
    #[serde(rename = "Z_geo_DT")]
    pub z_geo_dt: f64,
    pub mass: f64,
    pub kappa: f64,
    pub sigma: f64,
    #[serde(rename = "A")]
    pub a: f64,
    pub weight: f64,
    pub datetime: String,
}

/// The `met` section of a configuration-mode event file.
#[derive(Debug, Clone, Deserialize)]
pub struct MetSection {
    pub lat0: f64,
    pub lon0: f64,
    pub z0: f64,
    pub vtot0: f64,
    pub zenangle: f64,
    pub azimuth0: f64,
    pub rdens0: f64,
    pub mass0: f64,
    /// Either an absolute Julian date or an `exposure_time` offset; exactly
    /// one must be present (`spec.md` §6). `DESIGN.md` records the choice
    /// of schema for the Open Question this raises.
    pub jd0: Option<f64>,
    pub exposure_time: Option<f64>,
    pub m_min: Option<f64>,
    pub m_max: Option<f64>,
    pub m_sigma: Option<f64>,
    pub c_s: Option<f64>,
}

/// The `montecarlo` section of a configuration-mode event file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MonteCarloSection {
    pub dlat: Option<f64>,
    pub dlon: Option<f64>,
    pub dz: Option<f64>,
    pub dvtot: Option<f64>,
    pub dzenith: Option<f64>,
    pub dazimuth0: Option<f64>,
    pub dmass: Option<f64>,
    pub drdens: Option<f64>,
}
