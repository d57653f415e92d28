//! Thin CSV/config adapters for the three event-file formats (`spec.md` §6).
//! No column-repair heuristics: a malformed or missing column is reported
//! as [`DarkflightError::InputMalformed`], matching `spec.md` §7.

use crate::errors::{DarkflightError, Result};
use crate::io::types::{MetSection, MonteCarloSection, ParticleRow, TriangulationMeta, TriangulationRow};
use std::path::Path;

fn read_csv_err(err: csv::Error) -> DarkflightError {
    DarkflightError::InputMalformed(err.to_string())
}

/// Reads a tabular triangulation event file's rows (`spec.md` §6).
pub fn read_triangulation_rows(path: &Path) -> Result<Vec<TriangulationRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(read_csv_err)?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<TriangulationRow>, _>>()
        .map_err(read_csv_err)
}

/// Reads the `#`-commented metadata header of a triangulation event file
/// (`triangulation_ra_ecef_inf = VALUE` style lines), tolerating its absence
/// entirely (the ensemble builder falls back to finite differences).
pub fn read_triangulation_meta(path: &Path) -> Result<TriangulationMeta> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;

    let mut meta = TriangulationMeta::default();
    for line in text.lines() {
        let line = line.trim_start_matches('#').trim();
        let Some((key, value)) = line.split_once('=') else { continue };
        let (key, value) = (key.trim(), value.trim());
        let parsed: Option<f64> = value.parse().ok();
        match (key, parsed) {
            ("triangulation_ra_ecef_inf", Some(v)) => meta.ra_ecef_inf_deg = Some(v),
            ("triangulation_dec_ecef_inf", Some(v)) => meta.dec_ecef_inf_deg = Some(v),
            ("triangulation_ra_eci_inf_err", Some(v)) => meta.ra_eci_inf_err_deg = Some(v),
            ("triangulation_dec_eci_inf_err", Some(v)) => meta.dec_eci_inf_err_deg = Some(v),
            _ => {}
        }
    }
    Ok(meta)
}

/// Reads a particle-snapshot event file's rows from its CSV representation
/// (`spec.md` §6 describes this table as a FITS binary table; see
/// [`read_particle_rows_fits`] for the native format, gated behind the
/// `fits-output` feature since it shares that feature's `fitsio` dependency).
pub fn read_particle_rows(path: &Path) -> Result<Vec<ParticleRow>> {
    let mut reader = csv::ReaderBuilder::new().from_path(path).map_err(read_csv_err)?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<ParticleRow>, _>>()
        .map_err(read_csv_err)
}

/// Reads a particle-snapshot event file's rows from a FITS binary table, the
/// format the original program actually writes/reads for this mode
/// (`DFN_DarkFlight.py`: `fits.open(ifile, mode='append')[-1].data`). Column
/// names match [`ParticleRow`]'s source naming.
#[cfg(feature = "fits-output")]
pub fn read_particle_rows_fits(path: &Path) -> Result<Vec<ParticleRow>> {
    use fitsio::FitsFile;

    let mut fptr = FitsFile::open(path).map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;

    // The binary table has no per-row datetime column; the common epoch for
    // every particle is recorded once in the primary header.
    let datetime: String = {
        let primary = fptr.primary_hdu().map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;
        primary
            .read_key(&mut fptr, "DATETIME")
            .map_err(|_| DarkflightError::InputMalformed("FITS primary header missing DATETIME".into()))?
    };

    let hdu = fptr.hdu(1).map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;

    let read_col = |name: &str| -> Result<Vec<f64>> {
        hdu.read_col(&mut fptr, name).map_err(|e| DarkflightError::InputMalformed(format!("column {}: {}", name, e)))
    };
    let time = read_col("time")?;
    let x_geo = read_col("X_geo")?;
    let y_geo = read_col("Y_geo")?;
    let z_geo = read_col("Z_geo")?;
    let x_geo_dt = read_col("X_geo_DT")?;
    let y_geo_dt = read_col("Y_geo_DT")?;
    let z_geo_dt = read_col("Z_geo_DT")?;
    let mass = read_col("mass")?;
    let kappa = read_col("kappa")?;
    let sigma = read_col("sigma")?;
    let a = read_col("A")?;
    let weight = read_col("weight")?;

    let n = time.len();
    let mut rows = Vec::with_capacity(n);
    for i in 0..n {
        rows.push(ParticleRow {
            time: time[i],
            x_geo: x_geo[i],
            y_geo: y_geo[i],
            z_geo: z_geo[i],
            x_geo_dt: x_geo_dt[i],
            y_geo_dt: y_geo_dt[i],
            z_geo_dt: z_geo_dt[i],
            mass: mass[i],
            kappa: kappa[i],
            sigma: sigma[i],
            a: a[i],
            weight: weight[i],
            datetime: datetime.clone(),
        });
    }
    Ok(rows)
}

/// Reads the `met`/`montecarlo` sections of a configuration-mode event file
/// (`spec.md` §6).
pub fn read_configuration(path: &Path) -> Result<(MetSection, MonteCarloSection)> {
    let mut settings = config::Config::default();
    settings
        .merge(config::File::from(path))
        .map_err(|e| DarkflightError::InputMalformed(e.to_string()))?;

    let met: MetSection = settings
        .get("met")
        .map_err(|e| DarkflightError::InputMalformed(format!("met section: {}", e)))?;
    let montecarlo: MonteCarloSection = settings
        .get("montecarlo")
        .unwrap_or_default();

    Ok((met, montecarlo))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangulation_meta_parses_hash_commented_keys() {
        let path = std::env::temp_dir().join(format!("darkflight_test_meta_{}.ecsv", std::process::id()));
        std::fs::write(
            &path,
            "# triangulation_ra_ecef_inf = 123.4\n# triangulation_dec_ecef_inf = -12.0\ndatetime,X_geo,Y_geo,Z_geo\n",
        )
        .unwrap();

        let meta = read_triangulation_meta(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(meta.ra_ecef_inf_deg, Some(123.4));
        assert_eq!(meta.dec_ecef_inf_deg, Some(-12.0));
    }
}
