//! Event timestamps: unix seconds (UTC) as written by the DRAGON readout.

use hifitime::Epoch;

/// Integer part of the MJD of the unix epoch, 1970-01-01T00:00:00 UTC.
pub const MJDREFI: i64 = 40587;
/// Fractional part of the MJD reference.
pub const MJDREFF: f64 = 0.0;

pub const TIMEUNIT: &str = "s";
pub const TIMESYS: &str = "UTC";
pub const TIMEREF: &str = "LOCAL";

pub fn epoch_from_unix(seconds: f64) -> Epoch {
    Epoch::from_unix_seconds(seconds)
}

/// UTC Modified Julian Date of a unix timestamp.
pub fn unix_to_mjd(seconds: f64) -> f64 {
    epoch_from_unix(seconds).to_mjd_utc_days()
}

/// `YYYY-MM-DD` (UTC) of a unix timestamp, as used by DATE_OBS.
pub fn iso_date(seconds: f64) -> String {
    let (y, m, d, ..) = epoch_from_unix(seconds).to_gregorian_utc();
    format!("{y:04}-{m:02}-{d:02}")
}
