//! Thin adapter for the wind file formats of `spec.md` §6: a tabular
//! sounding, or a gridded forecast snapshot already flattened to rows.

use crate::atmosphere::grid::WindGridSnapshot;
use crate::atmosphere::sounding::{Sounding, SoundingLevel};
use crate::errors::{DarkflightError, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

fn read_csv_err(err: csv::Error) -> DarkflightError {
    DarkflightError::InputMalformed(err.to_string())
}

/// Column order is fixed (`# Height, TempK, Press, RHum, Wind, WDir`); the
/// file carries no header row, matching the original reader's explicit
/// `names=` override (`DFN_DarkFlight.py` ~l.859).
type SoundingRow = (f64, f64, f64, f64, f64, f64);

/// Reads a tabular sounding (`# Height, TempK, Press, RHum, Wind, WDir`),
/// per `spec.md` §6.
pub fn read_sounding(path: &Path) -> Result<Sounding> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(read_csv_err)?;

    let rows: Vec<SoundingRow> = reader
        .deserialize()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(read_csv_err)?;

    let levels = rows
        .into_iter()
        .map(|(height, temp_k, press, rhum, wind, wdir)| SoundingLevel {
            height_m: height,
            temp_k,
            press_pa: press,
            rhum: rhum / 100.0,
            wind_speed: wind,
            wind_dir_deg: wdir,
        })
        .collect();

    Ok(Sounding::new(levels))
}

#[derive(Debug, Deserialize)]
struct GridRow {
    lat: f64,
    lon: f64,
    z: f64,
    #[serde(rename = "uvmet_east")]
    wind_east: f64,
    #[serde(rename = "uvmet_north")]
    wind_north: f64,
    wa: f64,
    tk: f64,
    p: f64,
    rh: f64,
}

/// Reads a gridded forecast snapshot already flattened to one row per
/// `(lat, lon, height)` grid point (`spec.md` §6's `z, lat, lon, uvmet, wa,
/// tk, p, rh` variables, pre-interpolated to a single time instant by the
/// upstream extraction step this adapter does not perform). Dimensions are
/// inferred from the distinct lat/lon/height values present, so rows must
/// cover a complete rectangular `nz x ny x nx` grid.
pub fn read_grid_snapshot(path: &Path) -> Result<WindGridSnapshot> {
    let mut reader = csv::ReaderBuilder::new().from_path(path).map_err(read_csv_err)?;
    let rows: Vec<GridRow> = reader
        .deserialize()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(read_csv_err)?;

    if rows.is_empty() {
        return Err(DarkflightError::InputMalformed("gridded forecast file has no rows".into()));
    }

    let lats: BTreeSet<i64> = rows.iter().map(|r| (r.lat * 1e6).round() as i64).collect();
    let lons: BTreeSet<i64> = rows.iter().map(|r| (r.lon * 1e6).round() as i64).collect();
    let ny = lats.len();
    let nx = lons.len();
    if ny == 0 || nx == 0 || rows.len() % (ny * nx) != 0 {
        return Err(DarkflightError::InputMalformed(
            "gridded forecast rows do not form a rectangular nz x ny x nx grid".into(),
        ));
    }
    let nz = rows.len() / (ny * nx);

    let lat_index: std::collections::HashMap<i64, usize> =
        lats.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    let lon_index: std::collections::HashMap<i64, usize> =
        lons.iter().enumerate().map(|(i, &v)| (v, i)).collect();

    let mut snapshot = WindGridSnapshot {
        nz,
        ny,
        nx,
        lat_deg: vec![0.0; ny * nx],
        lon_deg: vec![0.0; ny * nx],
        height_m: vec![0.0; nz * ny * nx],
        wind_east: vec![0.0; nz * ny * nx],
        wind_north: vec![0.0; nz * ny * nx],
        wind_up: vec![0.0; nz * ny * nx],
        temp_k: vec![0.0; nz * ny * nx],
        press_pa: vec![0.0; nz * ny * nx],
        rhum: vec![0.0; nz * ny * nx],
    };

    // Rows are grouped by (lat, lon) column, `nz` consecutive levels per
    // column, in input order -- the shape a per-column WRF extraction
    // naturally produces.
    let mut next_z_for_column = vec![0usize; ny * nx];
    for row in &rows {
        let y = lat_index[&((row.lat * 1e6).round() as i64)];
        let x = lon_index[&((row.lon * 1e6).round() as i64)];
        let col = y * nx + x;
        snapshot.lat_deg[col] = row.lat;
        snapshot.lon_deg[col] = row.lon;

        let z = next_z_for_column[col];
        if z >= nz {
            return Err(DarkflightError::InputMalformed(
                "gridded forecast column has more levels than the inferred nz".into(),
            ));
        }
        let idx = (z * ny + y) * nx + x;
        snapshot.height_m[idx] = row.z;
        snapshot.wind_east[idx] = row.wind_east;
        snapshot.wind_north[idx] = row.wind_north;
        snapshot.wind_up[idx] = row.wa;
        snapshot.temp_k[idx] = row.tk;
        snapshot.press_pa[idx] = row.p;
        snapshot.rhum[idx] = row.rh;
        next_z_for_column[col] += 1;
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("darkflight_test_{}_{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_sounding_csv_into_levels() {
        let path = write_temp(
            "sounding.csv",
            "0,288.15,101325,50,5,270\n1000,281.65,89870,40,10,280\n",
        );
        let sounding = read_sounding(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(!sounding.is_empty());
        assert_eq!(sounding.min_height(), 0.0);
        assert_eq!(sounding.max_height(), 1000.0);
    }

    #[test]
    fn reads_rectangular_grid_snapshot() {
        let path = write_temp(
            "grid.csv",
            "lat,lon,z,uvmet_east,uvmet_north,wa,tk,p,rh\n\
             -33.0,151.0,0,1.0,2.0,0.0,290.0,101000.0,40.0\n\
             -33.0,151.0,1000,1.5,2.5,0.0,285.0,90000.0,35.0\n\
             -33.0,152.0,0,1.1,2.1,0.0,290.5,101100.0,41.0\n\
             -33.0,152.0,1000,1.6,2.6,0.0,285.5,90100.0,36.0\n\
             -32.0,151.0,0,0.9,1.9,0.0,289.0,100900.0,39.0\n\
             -32.0,151.0,1000,1.4,2.4,0.0,284.0,89900.0,34.0\n\
             -32.0,152.0,0,0.8,1.8,0.0,288.5,100800.0,38.0\n\
             -32.0,152.0,1000,1.3,2.3,0.0,283.5,89800.0,33.0\n",
        );
        let grid = read_grid_snapshot(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!((grid.nz, grid.ny, grid.nx), (2, 2, 2));
        assert_eq!(grid.max_height(), 1000.0);
    }
}
