//! ISO-8601 UTC datetime <-> Julian date conversion, via the teacher's
//! `hifitime` dependency.

use crate::errors::{DarkflightError, Result};
use hifitime::Epoch;

/// Parses an ISO-8601 UTC datetime string into a Julian date (UTC).
pub fn parse_iso_to_jd(datetime: &str) -> Result<f64> {
    Epoch::from_gregorian_str(datetime)
        .map(|epoch| epoch.as_jde_utc_days())
        .map_err(|e| DarkflightError::InputMalformed(format!("invalid datetime {:?}: {}", datetime, e)))
}

/// Formats a Julian date (UTC) back to an ISO-8601 UTC datetime string, for
/// result-row assembly (`spec.md` 4.I).
pub fn jd_to_iso(jd: f64) -> String {
    let epoch = Epoch::from_jde_utc(jd);
    format!("{}", epoch)
}
