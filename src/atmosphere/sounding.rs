//! 1-D vertical atmospheric sounding (`spec.md` §3, "Atmosphere dataset (i)").

use crate::frames::Enu;
use nalgebra::Vector3;

/// One height-indexed row of a vertical sounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundingLevel {
    pub height_m: f64,
    pub temp_k: f64,
    pub press_pa: f64,
    pub rhum: f64,
    pub wind_speed: f64,
    /// Clockwise azimuth from true north that the wind is blowing *from*.
    pub wind_dir_deg: f64,
}

/// An ordered-by-height vertical sounding.
#[derive(Debug, Clone)]
pub struct Sounding {
    levels: Vec<SoundingLevel>,
}

#[derive(Debug, Clone, Copy)]
pub struct SoundingSample {
    pub temp_k: f64,
    pub press_pa: f64,
    pub rhum: f64,
    pub wind_speed: f64,
    pub wind_dir_deg: f64,
}

impl Sounding {
    /// Builds a sounding from unordered levels, sorting by height.
    pub fn new(mut levels: Vec<SoundingLevel>) -> Self {
        levels.sort_by(|a, b| a.height_m.partial_cmp(&b.height_m).unwrap());
        Self { levels }
    }

    pub fn min_height(&self) -> f64 {
        self.levels.first().map_or(0.0, |l| l.height_m)
    }

    pub fn max_height(&self) -> f64 {
        self.levels.last().map_or(0.0, |l| l.height_m)
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Samples the sounding at `height_m`, clamping to the edge level outside
    /// `[min_height, max_height]` and cubic-Hermite interpolating within it,
    /// per `spec.md` 4.B rule 2.
    pub fn sample(&self, height_m: f64) -> SoundingSample {
        assert!(!self.levels.is_empty(), "sounding has no levels");

        if height_m <= self.min_height() {
            return Self::row_to_sample(&self.levels[0]);
        }
        if height_m >= self.max_height() {
            return Self::row_to_sample(self.levels.last().unwrap());
        }

        let idx = self
            .levels
            .iter()
            .position(|l| l.height_m > height_m)
            .unwrap();
        let (lo, hi) = (&self.levels[idx - 1], &self.levels[idx]);

        // Catmull-Rom-style cubic Hermite interpolation using the enclosing
        // points plus, where available, one extra neighbour on each side for
        // the tangent estimate. Falls back to the two-point tangent (which
        // degenerates to linear) at the ends of the series.
        let lo_prev = if idx >= 2 { Some(&self.levels[idx - 2]) } else { None };
        let hi_next = self.levels.get(idx + 1);

        let interp = |lo_v: f64, hi_v: f64, lo_prev_v: Option<f64>, hi_next_v: Option<f64>| {
            cubic_hermite(
                lo.height_m,
                hi.height_m,
                lo_v,
                hi_v,
                lo_prev_v,
                lo_prev.map(|l| l.height_m),
                hi_next_v,
                hi_next.map(|l| l.height_m),
                height_m,
            )
        };

        SoundingSample {
            temp_k: interp(
                lo.temp_k,
                hi.temp_k,
                lo_prev.map(|l| l.temp_k),
                hi_next.map(|l| l.temp_k),
            ),
            press_pa: interp(
                lo.press_pa,
                hi.press_pa,
                lo_prev.map(|l| l.press_pa),
                hi_next.map(|l| l.press_pa),
            ),
            rhum: interp(
                lo.rhum,
                hi.rhum,
                lo_prev.map(|l| l.rhum),
                hi_next.map(|l| l.rhum),
            ),
            wind_speed: interp(
                lo.wind_speed,
                hi.wind_speed,
                lo_prev.map(|l| l.wind_speed),
                hi_next.map(|l| l.wind_speed),
            ),
            wind_dir_deg: interp(
                lo.wind_dir_deg,
                hi.wind_dir_deg,
                lo_prev.map(|l| l.wind_dir_deg),
                hi_next.map(|l| l.wind_dir_deg),
            ),
        }
    }

    /// Applies an independent Monte-Carlo wind perturbation to every layer,
    /// per `spec.md` 4.G: a uniform draw on `[-speed_err, speed_err]` added
    /// to the layer speed, and an analogous draw applied to direction.
    pub fn jittered<R: rand::Rng>(&self, rng: &mut R, speed_err: f64, dir_err: f64) -> Self {
        use rand::distributions::Uniform;
        let speed_dist = Uniform::new_inclusive(-speed_err, speed_err);
        let dir_dist = Uniform::new_inclusive(-dir_err, dir_err);
        let levels = self
            .levels
            .iter()
            .map(|l| SoundingLevel {
                wind_speed: l.wind_speed + rng.sample(speed_dist),
                wind_dir_deg: (l.wind_dir_deg + rng.sample(dir_dist)).rem_euclid(360.0),
                ..*l
            })
            .collect();
        Self { levels }
    }

    fn row_to_sample(row: &SoundingLevel) -> SoundingSample {
        SoundingSample {
            temp_k: row.temp_k,
            press_pa: row.press_pa,
            rhum: row.rhum,
            wind_speed: row.wind_speed,
            wind_dir_deg: row.wind_dir_deg,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cubic_hermite(
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    y_prev: Option<f64>,
    x_prev: Option<f64>,
    y_next: Option<f64>,
    x_next: Option<f64>,
    x: f64,
) -> f64 {
    let h = x1 - x0;
    // Tangent via centered difference where neighbours exist, else the
    // secant slope of the enclosing interval (reduces to linear at edges).
    let t0 = match (y_prev, x_prev) {
        (Some(yp), Some(xp)) => (y1 - yp) / (x1 - xp),
        _ => (y1 - y0) / h,
    };
    let t1 = match (y_next, x_next) {
        (Some(yn), Some(xn)) => (yn - y0) / (xn - x0),
        _ => (y1 - y0) / h,
    };

    let t = (x - x0) / h;
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    h00 * y0 + h10 * h * t0 + h01 * y1 + h11 * h * t1
}

/// Constructs the ENU wind vector from the 1-D sounding's "wind-from,
/// clockwise from north" convention: `spec.md` 4.B rule 5.
pub fn wind_enu_from_sounding(speed: f64, wind_dir_deg: f64) -> Enu {
    let wdir = wind_dir_deg.to_radians();
    Enu(-Vector3::new(speed * wdir.sin(), speed * wdir.cos(), 0.0))
}
