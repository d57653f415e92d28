//! Terrain terminator (`spec.md` 4.F).

use std::collections::HashMap;

/// A source of ground height above mean sea level, selected per run.
pub trait GroundHeightSource: Send + Sync {
    /// Ground height (m) at the given geodetic latitude/longitude (radians).
    fn height_m(&mut self, lat_rad: f64, lon_rad: f64) -> f64;
}

/// A single constant ground height for the whole run.
#[derive(Debug, Clone, Copy)]
pub struct ConstantGround {
    pub height_m: f64,
}

impl GroundHeightSource for ConstantGround {
    fn height_m(&mut self, _lat_rad: f64, _lon_rad: f64) -> f64 {
        self.height_m
    }
}

/// SRTM-3 tile cache keyed by `(floor(lat_deg), floor(lon_deg))`
/// (`spec.md` 4.F rule 2). A missing tile or a void cell returns 0 m and
/// logs a warning, matching the documented environment-degraded fallback
/// (`spec.md` §7).
pub struct SrtmGround {
    tiles: HashMap<(i64, i64), SrtmTile>,
    loader: Box<dyn FnMut(i64, i64) -> Option<SrtmTile> + Send + Sync>,
}

/// One loaded SRTM-3 tile: a square grid of elevation samples, `None` where
/// the dataset has a void cell.
#[derive(Clone)]
pub struct SrtmTile {
    pub samples_per_side: usize,
    pub elevations_m: Vec<Option<f64>>,
}

impl SrtmTile {
    fn sample(&self, frac_lat: f64, frac_lon: f64) -> Option<f64> {
        let n = self.samples_per_side;
        if n == 0 {
            return None;
        }
        let row = ((1.0 - frac_lat) * (n - 1) as f64).round() as usize;
        let col = (frac_lon * (n - 1) as f64).round() as usize;
        let row = row.min(n - 1);
        let col = col.min(n - 1);
        self.elevations_m[row * n + col]
    }
}

impl SrtmGround {
    /// `loader` fetches (or constructs from a file cache) the tile at
    /// integer `(floor(lat_deg), floor(lon_deg))`, returning `None` if the
    /// tile itself is missing from the cache root.
    pub fn new(loader: Box<dyn FnMut(i64, i64) -> Option<SrtmTile> + Send + Sync>) -> Self {
        Self { tiles: HashMap::new(), loader }
    }
}

impl GroundHeightSource for SrtmGround {
    fn height_m(&mut self, lat_rad: f64, lon_rad: f64) -> f64 {
        let lat_deg = lat_rad.to_degrees();
        let lon_deg = lon_rad.to_degrees();
        let key = (lat_deg.floor() as i64, lon_deg.floor() as i64);

        let tile = self.tiles.entry(key).or_insert_with(|| match (self.loader)(key.0, key.1) {
            Some(t) => t,
            None => {
                log::warn!(
                    "SRTM tile ({}, {}) missing from cache; substituting 0 m ground height",
                    key.0,
                    key.1
                );
                SrtmTile { samples_per_side: 0, elevations_m: Vec::new() }
            }
        });

        let frac_lat = lat_deg - key.0 as f64;
        let frac_lon = lon_deg - key.1 as f64;
        match tile.sample(frac_lat, frac_lon) {
            Some(h) => h,
            None => {
                log::warn!(
                    "SRTM void at ({:.4}, {:.4}); substituting 0 m ground height",
                    lat_deg,
                    lon_deg
                );
                0.0
            }
        }
    }
}
