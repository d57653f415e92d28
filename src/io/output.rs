//! Output writers (`spec.md` §6 "Output files"): an ECSV-style CSV writer
//! used by default, an optional FITS writer for ensembles over 1000
//! particles, and the unimplemented KML/GeoJSON/plotting seams left as a
//! named `OutputSinks` trait per `SPEC_FULL.md` §C.

use crate::errors::{DarkflightError, Result};
use crate::result::{OutputRow, RunMetadata};
use std::path::Path;

const FITS_THRESHOLD_PARTICLES: usize = 1000;

/// Writes `rows` as a row-oriented CSV, one row per emitted sample, with
/// `meta` recorded as leading `#`-commented header lines (`spec.md` 4.I).
pub fn write_ecsv(path: &Path, rows: &[OutputRow], meta: &RunMetadata) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;
    let mut writer = std::io::BufWriter::new(file);
    write_header_comments(&mut writer, meta)?;

    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    csv_writer
        .write_record([
            "datetime",
            "jd",
            "weight",
            "initial_mass_kg",
            "mass_kg",
            "rho_bulk_kg_m3",
            "shape",
            "c_ml",
            "lat_deg",
            "lon_deg",
            "height_m",
            "ecef_x_m",
            "ecef_y_m",
            "ecef_z_m",
            "ecef_vx_m_s",
            "ecef_vy_m_s",
            "ecef_vz_m_s",
            "speed_m_s",
            "abs_magnitude",
        ])
        .map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;

    for row in rows {
        csv_writer
            .write_record(&[
                row.datetime_iso.clone(),
                format!("{}", row.julian_date),
                format!("{}", row.weight),
                format!("{}", row.initial_mass_kg),
                format!("{}", row.mass_kg),
                format!("{}", row.rho_bulk_kg_m3),
                row.shape_code.clone(),
                format!("{}", row.c_ml),
                format!("{}", row.lat_deg),
                format!("{}", row.lon_deg),
                format!("{}", row.height_m),
                format!("{}", row.ecef_pos_m[0]),
                format!("{}", row.ecef_pos_m[1]),
                format!("{}", row.ecef_pos_m[2]),
                format!("{}", row.ecef_vel_m_s[0]),
                format!("{}", row.ecef_vel_m_s[1]),
                format!("{}", row.ecef_vel_m_s[2]),
                format!("{}", row.speed_m_s),
                row.abs_magnitude.map(|m| format!("{}", m)).unwrap_or_default(),
            ])
            .map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;
    }
    csv_writer.flush().map_err(|e| DarkflightError::InputMalformed(e.to_string()))
}

fn write_header_comments(writer: &mut impl std::io::Write, meta: &RunMetadata) -> Result<()> {
    writeln!(writer, "# atmosphere_source = {}", meta.atmosphere_source)
        .and_then(|_| writeln!(writer, "# requested_shape = {}", meta.requested_shape_code))
        .and_then(|_| writeln!(writer, "# run_timestamp = {}", meta.run_timestamp_iso))
        .map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;
    if let Some(budgets) = &meta.error_budgets {
        writeln!(
            writer,
            "# error_budgets = mass:{:?} shape:{:?} wind_speed:{:?}",
            budgets.mass, budgets.shape, budgets.wind_speed
        )
        .map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;
    }
    Ok(())
}

/// Picks the output file's extension/writer per `spec.md` §6: ensembles
/// over 1000 particles go to FITS when the `fits-output` feature is
/// enabled; otherwise (or with the feature disabled) they fall back to the
/// ECSV writer and a warning records the fallback.
pub fn write_result(path_stem: &Path, rows: &[OutputRow], meta: &RunMetadata, particle_count: usize) -> Result<std::path::PathBuf> {
    if particle_count > FITS_THRESHOLD_PARTICLES {
        #[cfg(feature = "fits-output")]
        {
            let fits_path = path_stem.with_extension("fits");
            write_fits(&fits_path, rows, meta)?;
            return Ok(fits_path);
        }
        #[cfg(not(feature = "fits-output"))]
        {
            log::warn!(
                "{} particles exceeds the FITS threshold but the fits-output feature is disabled; writing ECSV instead",
                particle_count
            );
        }
    }
    let ecsv_path = path_stem.with_extension("ecsv");
    write_ecsv(&ecsv_path, rows, meta)?;
    Ok(ecsv_path)
}

#[cfg(feature = "fits-output")]
fn write_fits(path: &Path, rows: &[OutputRow], _meta: &RunMetadata) -> Result<()> {
    use fitsio::tables::{ColumnDataDescription, ColumnDataType, ConcreteColumnDescription};
    use fitsio::FitsFile;

    let lat: Vec<f64> = rows.iter().map(|r| r.lat_deg).collect();
    let lon: Vec<f64> = rows.iter().map(|r| r.lon_deg).collect();
    let mass: Vec<f64> = rows.iter().map(|r| r.mass_kg).collect();
    let weight: Vec<f64> = rows.iter().map(|r| r.weight).collect();

    let columns = vec![
        ConcreteColumnDescription {
            name: "lat_deg".to_string(),
            data_type: ColumnDataDescription::scalar(ColumnDataType::Double),
        },
        ConcreteColumnDescription {
            name: "lon_deg".to_string(),
            data_type: ColumnDataDescription::scalar(ColumnDataType::Double),
        },
        ConcreteColumnDescription {
            name: "mass_kg".to_string(),
            data_type: ColumnDataDescription::scalar(ColumnDataType::Double),
        },
        ConcreteColumnDescription {
            name: "weight".to_string(),
            data_type: ColumnDataDescription::scalar(ColumnDataType::Double),
        },
    ];

    let mut fptr = FitsFile::create(path)
        .open()
        .map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;
    let hdu = fptr
        .create_table("IMPACTS".to_string(), &columns)
        .map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;

    hdu.write_col(&mut fptr, "lat_deg", &lat).map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;
    hdu.write_col(&mut fptr, "lon_deg", &lon).map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;
    hdu.write_col(&mut fptr, "mass_kg", &mass).map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;
    hdu.write_col(&mut fptr, "weight", &weight).map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;

    Ok(())
}

/// Named seam for the rendering outputs `spec.md` §6 lists but places out of
/// scope (KML, GeoJSON, wind/drag diagnostic PNGs). `NullSink` is the only
/// implementation shipped here; a real renderer is an external collaborator.
pub trait OutputSinks {
    fn write_kml(&mut self, rows: &[OutputRow]) -> Result<()>;
    fn write_geojson(&mut self, rows: &[OutputRow]) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct NullSink;

impl OutputSinks for NullSink {
    fn write_kml(&mut self, _rows: &[OutputRow]) -> Result<()> {
        Ok(())
    }
    fn write_geojson(&mut self, _rows: &[OutputRow]) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::shape::Shape;

    fn row() -> OutputRow {
        OutputRow {
            datetime_iso: "2026-07-30T00:00:00Z".to_string(),
            julian_date: 2_461_000.5,
            weight: 1.0,
            initial_mass_kg: 1.0,
            mass_kg: 0.5,
            rho_bulk_kg_m3: 3500.0,
            shape_code: "s".to_string(),
            c_ml: 1e-7,
            lat_deg: -33.0,
            lon_deg: 151.0,
            height_m: 1000.0,
            ecef_pos_m: [1.0, 2.0, 3.0],
            ecef_vel_m_s: [10.0, 20.0, 30.0],
            speed_m_s: 37.4,
            abs_magnitude: None,
        }
    }

    #[test]
    fn writes_ecsv_with_header_comments_and_rows() {
        let path = std::env::temp_dir().join(format!("darkflight_test_out_{}.ecsv", std::process::id()));
        let meta = RunMetadata::new("reference", Shape::Sphere, "2026-07-30T00:00:00Z");
        write_ecsv(&path, &[row()], &meta).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(contents.contains("# atmosphere_source = reference"));
        assert!(contents.contains("datetime,jd,weight"));
        assert!(contents.contains("2026-07-30T00:00:00Z"));
    }

    #[test]
    fn null_sink_accepts_any_rows() {
        let mut sink = NullSink;
        assert!(sink.write_kml(&[row()]).is_ok());
        assert!(sink.write_geojson(&[row()]).is_ok());
    }
}
