//! Triangulation-mode ensemble seeding (`spec.md` 4.G.1): a tabular
//! terminal-state event file.

use crate::dynamics::shape::Shape;
use crate::ensemble::{ParticleSeed, VelocityModel};
use crate::errors::{DarkflightError, Result};
use crate::frames::{ecef2eci, Ecef};
use crate::io::types::{TriangulationMeta, TriangulationRow};
use crate::time::parse_iso_to_jd;
use nalgebra::Vector3;

/// Builds the initial ensemble from the last-time-step row of a tabular
/// triangulation, per `spec.md` 4.G.1. If `masses` has more than one entry,
/// the seed is expanded into one particle per mass (the "fall-line" mode).
pub fn build(
    rows: &[TriangulationRow],
    meta: &TriangulationMeta,
    velocity_model: VelocityModel,
    masses: &[f64],
    rho_bulk: f64,
    shape: Shape,
    c_ml: f64,
    weight: f64,
) -> Result<Vec<ParticleSeed>> {
    let last = rows
        .last()
        .ok_or_else(|| DarkflightError::InputMalformed("triangulation table has no rows".into()))?;

    let t0_jd = parse_iso_to_jd(&last.datetime)?;
    let pos_ecef = Ecef::new(last.x_geo, last.y_geo, last.z_geo);
    let vel_ecef = reconstruct_velocity(rows, last, meta, velocity_model)?;

    let (pos_eci, vel_eci) = ecef2eci(pos_ecef, vel_ecef, t0_jd);

    let masses = if masses.is_empty() { &[f64::NAN][..] } else { masses };

    Ok(masses
        .iter()
        .map(|&mass| ParticleSeed {
            t0_jd,
            pos_eci: pos_eci.0,
            vel_eci: vel_eci.0,
            mass,
            rho_bulk,
            shape,
            c_ml,
            weight,
        })
        .collect())
}

fn reconstruct_velocity(
    rows: &[TriangulationRow],
    last: &TriangulationRow,
    meta: &TriangulationMeta,
    velocity_model: VelocityModel,
) -> Result<Ecef> {
    match velocity_model {
        VelocityModel::Raw => {
            if let (Some(dx), Some(dy), Some(dz)) = (last.dx_dt_geo, last.dy_dt_geo, last.dz_dt_geo) {
                Ok(Ecef::new(dx, dy, dz))
            } else if rows.len() >= 2 {
                finite_difference_velocity(rows)
            } else {
                Err(DarkflightError::InputMalformed(
                    "raw velocity model needs ECEF velocity columns or >= 2 rows".into(),
                ))
            }
        }
        VelocityModel::Eks | VelocityModel::Grits => {
            let speed = last
                .speed
                .ok_or_else(|| DarkflightError::InputMalformed("row missing scalar speed column".into()))?;
            let direction = match (meta.ra_ecef_inf_deg, meta.dec_ecef_inf_deg) {
                (Some(ra_deg), Some(dec_deg)) => radiant_direction(ra_deg, dec_deg),
                _ => {
                    if rows.len() >= 2 {
                        travel_direction_from_positions(rows)?
                    } else {
                        return Err(DarkflightError::InputMalformed(
                            "missing triangulation radiant metadata and insufficient rows to infer it".into(),
                        ));
                    }
                }
            };
            Ok(Ecef(direction * speed))
        }
    }
}

fn finite_difference_velocity(rows: &[TriangulationRow]) -> Result<Ecef> {
    let a = &rows[rows.len() - 2];
    let b = &rows[rows.len() - 1];
    let dt = parse_iso_to_jd(&b.datetime)? - parse_iso_to_jd(&a.datetime)?;
    let dt_s = dt * 86_400.0;
    if dt_s.abs() < 1e-9 {
        return Err(DarkflightError::InputMalformed(
            "last two triangulation rows share a timestamp".into(),
        ));
    }
    Ok(Ecef::new(
        (b.x_geo - a.x_geo) / dt_s,
        (b.y_geo - a.y_geo) / dt_s,
        (b.z_geo - a.z_geo) / dt_s,
    ))
}

/// Direction of travel inferred from the last two row positions (used when
/// radiant metadata is absent).
fn travel_direction_from_positions(rows: &[TriangulationRow]) -> Result<Vector3<f64>> {
    let a = &rows[rows.len() - 2];
    let b = &rows[rows.len() - 1];
    let d = Vector3::new(b.x_geo - a.x_geo, b.y_geo - a.y_geo, b.z_geo - a.z_geo);
    let n = d.norm();
    if n < 1e-9 {
        return Err(DarkflightError::InputMalformed(
            "cannot infer radiant: last two rows coincide".into(),
        ));
    }
    Ok(d / n)
}

/// Unit vector of the direction of travel from a right-ascension/
/// declination radiant (the point in the sky the meteor appears to
/// originate from; travel direction is the antipode).
fn radiant_direction(ra_deg: f64, dec_deg: f64) -> Vector3<f64> {
    let ra = ra_deg.to_radians();
    let dec = dec_deg.to_radians();
    let radiant = Vector3::new(dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin());
    -radiant
}
