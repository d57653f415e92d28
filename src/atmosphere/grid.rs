//! 4-D gridded forecast snapshot (`spec.md` §3, "Atmosphere dataset (ii)").
//!
//! A `WindGridSnapshot` is already time-interpolated to the query instant by
//! the adapter that produced it (`spec.md` 4.B: the grid is "a time-
//! interpolated snapshot"); this module only does the spatial lookup
//! described in 4.B rule 4.

use crate::atmosphere::history::AtmosphereHistory;
use crate::frames::Llh;

/// A single time-interpolated snapshot of a 4-D gridded forecast, laid out
/// as `nz` vertical levels over a fixed `ny x nx` horizontal grid.
#[derive(Debug, Clone)]
pub struct WindGridSnapshot {
    pub nz: usize,
    pub ny: usize,
    pub nx: usize,
    /// Per horizontal-cell latitude (deg), length `ny * nx`.
    pub lat_deg: Vec<f64>,
    /// Per horizontal-cell longitude (deg), length `ny * nx`.
    pub lon_deg: Vec<f64>,
    /// Height (m) at every grid point, length `nz * ny * nx`.
    pub height_m: Vec<f64>,
    /// Wind east component (m/s), length `nz * ny * nx`.
    pub wind_east: Vec<f64>,
    /// Wind north component (m/s), length `nz * ny * nx`.
    pub wind_north: Vec<f64>,
    /// Wind vertical component (m/s), length `nz * ny * nx`.
    pub wind_up: Vec<f64>,
    pub temp_k: Vec<f64>,
    pub press_pa: Vec<f64>,
    pub rhum: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct GridSample {
    pub wind_east: f64,
    pub wind_north: f64,
    pub wind_up: f64,
    pub temp_k: f64,
    pub press_pa: f64,
    pub rhum: f64,
}

impl WindGridSnapshot {
    fn idx_horiz(&self, y: usize, x: usize) -> usize {
        y * self.nx + x
    }

    fn idx_3d(&self, z: usize, y: usize, x: usize) -> usize {
        (z * self.ny + y) * self.nx + x
    }

    /// Finds the horizontal cell nearest `(lat_deg, lon_deg)` by the
    /// argmin of squared angular distance (`spec.md` 4.B rule 4).
    fn nearest_column(&self, lat_deg: f64, lon_deg: f64) -> (usize, usize) {
        let mut best = (0, 0);
        let mut best_d2 = f64::INFINITY;
        for y in 0..self.ny {
            for x in 0..self.nx {
                let i = self.idx_horiz(y, x);
                let dlat = self.lat_deg[i] - lat_deg;
                let dlon = self.lon_deg[i] - lon_deg;
                let d2 = dlat * dlat + dlon * dlon;
                if d2 < best_d2 {
                    best_d2 = d2;
                    best = (y, x);
                }
            }
        }
        best
    }

    /// Vertically interpolates `field` at column `(y, x)` to `height_m`.
    /// Returns `NaN` if `height_m` is below the lowest model level at that
    /// column, matching `spec.md` 4.B rule 4's "vertical interpolation
    /// returns not-a-number" case.
    fn vertical_interp(&self, field: &[f64], y: usize, x: usize, height_m: f64) -> f64 {
        let mut below = None;
        for z in 0..self.nz.saturating_sub(1) {
            let h0 = self.height_m[self.idx_3d(z, y, x)];
            let h1 = self.height_m[self.idx_3d(z + 1, y, x)];
            if height_m >= h0.min(h1) && height_m <= h0.max(h1) {
                let f0 = field[self.idx_3d(z, y, x)];
                let f1 = field[self.idx_3d(z + 1, y, x)];
                let frac = if (h1 - h0).abs() > 1e-9 {
                    (height_m - h0) / (h1 - h0)
                } else {
                    0.0
                };
                return f0 + frac * (f1 - f0);
            }
            if z == 0 && height_m < h0.min(h1) {
                below = Some(());
            }
        }
        if below.is_some() {
            return f64::NAN;
        }
        // Above the top level: hold the top value rather than extrapolate.
        field[self.idx_3d(self.nz - 1, y, x)]
    }

    /// Samples the grid at `llh`, per `spec.md` 4.B rule 4: nearest cell's
    /// 3x3 horizontal neighbourhood, vertically interpolated per neighbour
    /// column, then bilinear-interpolated across the four in-plane
    /// neighbours surrounding the exact (lat, lon). Falls back to the most
    /// recent history entry if the vertical interpolation is NaN (below the
    /// lowest model level).
    pub fn sample(&self, llh: Llh, history: &AtmosphereHistory) -> GridSample {
        let lat_deg = llh.lat.to_degrees();
        let lon_deg = llh.lon.to_degrees();
        let (y0, x0) = self.nearest_column(lat_deg, lon_deg);

        let y_lo = y0.saturating_sub(1).min(self.ny.saturating_sub(2));
        let x_lo = x0.saturating_sub(1).min(self.nx.saturating_sub(2));
        let y_hi = (y_lo + 1).min(self.ny - 1);
        let x_hi = (x_lo + 1).min(self.nx - 1);

        let fields: [&[f64]; 6] = [
            &self.wind_east,
            &self.wind_north,
            &self.wind_up,
            &self.temp_k,
            &self.press_pa,
            &self.rhum,
        ];

        let mut out = [0.0_f64; 6];
        for (k, field) in fields.iter().enumerate() {
            let v_ll = self.vertical_interp(field, y_lo, x_lo, llh.height);
            let v_lr = self.vertical_interp(field, y_lo, x_hi, llh.height);
            let v_ul = self.vertical_interp(field, y_hi, x_lo, llh.height);
            let v_ur = self.vertical_interp(field, y_hi, x_hi, llh.height);

            let lat_ll = self.lat_deg[self.idx_horiz(y_lo, x_lo)];
            let lat_ul = self.lat_deg[self.idx_horiz(y_hi, x_lo)];
            let lon_ll = self.lon_deg[self.idx_horiz(y_lo, x_lo)];
            let lon_lr = self.lon_deg[self.idx_horiz(y_lo, x_hi)];

            let ty = if (lat_ul - lat_ll).abs() > 1e-12 {
                ((lat_deg - lat_ll) / (lat_ul - lat_ll)).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let tx = if (lon_lr - lon_ll).abs() > 1e-12 {
                ((lon_deg - lon_ll) / (lon_lr - lon_ll)).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let bottom = v_ll + tx * (v_lr - v_ll);
            let top = v_ul + tx * (v_ur - v_ul);
            out[k] = bottom + ty * (top - bottom);
        }

        let sample = GridSample {
            wind_east: out[0],
            wind_north: out[1],
            wind_up: out[2],
            temp_k: out[3],
            press_pa: out[4],
            rhum: out[5],
        };

        if sample.temp_k.is_nan() || sample.press_pa.is_nan() {
            if let Some(last) = history.last() {
                return GridSample {
                    wind_east: last.wind_enu.0.x,
                    wind_north: last.wind_enu.0.y,
                    wind_up: last.wind_enu.0.z,
                    temp_k: last.temperature_k,
                    press_pa: sample.press_pa, // pressure not tracked in history; best-effort
                    rhum: sample.rhum,
                };
            }
        }
        sample
    }

    pub fn max_height(&self) -> f64 {
        self.height_m
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Applies an independent Monte-Carlo wind perturbation to every grid
    /// point, mirroring `Sounding::jittered` for the gridded wind source
    /// (`spec.md` 4.G): a uniform draw on `[-speed_err, speed_err]` (m/s)
    /// added independently to the east and north components.
    pub fn jittered<R: rand::Rng>(&self, rng: &mut R, speed_err: f64) -> Self {
        use rand::distributions::Uniform;
        let dist = Uniform::new_inclusive(-speed_err, speed_err);
        let wind_east = self.wind_east.iter().map(|v| v + rng.sample(dist)).collect();
        let wind_north = self.wind_north.iter().map(|v| v + rng.sample(dist)).collect();
        Self { wind_east, wind_north, ..self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> WindGridSnapshot {
        WindGridSnapshot {
            nz: 1,
            ny: 1,
            nx: 1,
            lat_deg: vec![0.0],
            lon_deg: vec![0.0],
            height_m: vec![0.0],
            wind_east: vec![10.0],
            wind_north: vec![-5.0],
            wind_up: vec![0.0],
            temp_k: vec![288.15],
            press_pa: vec![101_325.0],
            rhum: vec![0.3],
        }
    }

    #[test]
    fn jittered_stays_within_the_uniform_bound() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;
        let snap = snapshot();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let jittered = snap.jittered(&mut rng, 3.0);
            assert!((jittered.wind_east[0] - snap.wind_east[0]).abs() <= 3.0);
            assert!((jittered.wind_north[0] - snap.wind_north[0]).abs() <= 3.0);
        }
    }
}
