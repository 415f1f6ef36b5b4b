//! Horizontal to equatorial (J2000) conversion for event and pointing
//! directions.
//!
//! The chain is: alt/az → hour angle/declination of date at the site →
//! right ascension of date via Greenwich mean sidereal time → mean
//! J2000 position by removing IAU 1976 precession. UT1 is taken equal to
//! UTC; nutation, aberration and refraction are neglected, which keeps
//! the result within about an arcminute of a full ICRS reduction.

use std::f64::consts::TAU;

use nalgebra::{Matrix3, Vector3};

use crate::config::Observatory;

/// MJD of the J2000.0 epoch.
const T2000: f64 = 51544.5;
const ARCSEC: f64 = std::f64::consts::PI / (180.0 * 3600.0);

/// An equatorial sky position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyCoord {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl SkyCoord {
    pub fn new(ra_deg: f64, dec_deg: f64) -> Self {
        SkyCoord { ra_deg, dec_deg }
    }

    fn from_unit_vector(v: &Vector3<f64>) -> Self {
        let dec = v.z.clamp(-1.0, 1.0).asin();
        let ra = v.y.atan2(v.x).rem_euclid(TAU);
        SkyCoord {
            ra_deg: ra.to_degrees(),
            dec_deg: dec.to_degrees(),
        }
    }

    fn unit_vector(ra: f64, dec: f64) -> Vector3<f64> {
        Vector3::new(dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin())
    }
}

/// Greenwich mean sidereal time in radians, IAU 1982 expression.
///
/// `mjd` is a UT1 Modified Julian Date.
pub fn gmst(mjd: f64) -> f64 {
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;
    // sidereal days per solar day
    const RAP: f64 = 1.00273790934;

    let day = mjd.floor();
    let t = (day - T2000) / 36525.0;
    let gmst0 = (((C3 * t + C2) * t + C1) * t + C0) * TAU / 86400.0;
    (gmst0 + (mjd - day) * TAU * RAP).rem_euclid(TAU)
}

/// Rotation of the reference frame about the y axis.
fn frame_rot_y(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c)
}

/// Rotation of the reference frame about the z axis.
fn frame_rot_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0)
}

/// IAU 1976 precession matrix taking mean J2000 vectors to mean of date.
pub fn precession_matrix(mjd: f64) -> Matrix3<f64> {
    let t = (mjd - T2000) / 36525.0;
    let zeta = ((0.017998 * t + 0.30188) * t + 2306.2181) * t * ARCSEC;
    let z = ((0.018203 * t + 1.09468) * t + 2306.2181) * t * ARCSEC;
    let theta = ((-0.041833 * t - 0.42665) * t + 2004.3109) * t * ARCSEC;
    frame_rot_z(-z) * frame_rot_y(theta) * frame_rot_z(-zeta)
}

/// Convert a horizontal direction seen from `site` at `mjd` (UTC) to a
/// mean J2000 equatorial position.
///
/// `alt` and `az` are in radians, azimuth counted from North through East.
pub fn altaz_to_radec(alt: f64, az: f64, mjd: f64, site: &Observatory) -> SkyCoord {
    let lat = site.lat_deg.to_radians();
    let (sin_alt, cos_alt) = alt.sin_cos();
    let (sin_az, cos_az) = az.sin_cos();
    let (sin_lat, cos_lat) = lat.sin_cos();

    let dec = (sin_alt * sin_lat + cos_alt * cos_lat * cos_az)
        .clamp(-1.0, 1.0)
        .asin();
    let hour_angle = (-sin_az * cos_alt).atan2(sin_alt * cos_lat - cos_alt * cos_az * sin_lat);

    let lst = gmst(mjd) + site.lon_deg.to_radians();
    let ra_of_date = lst - hour_angle;

    let of_date = SkyCoord::unit_vector(ra_of_date, dec);
    let j2000 = precession_matrix(mjd).transpose() * of_date;
    SkyCoord::from_unit_vector(&j2000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angular_distance(a: SkyCoord, b: SkyCoord) -> f64 {
        let va = SkyCoord::unit_vector(a.ra_deg.to_radians(), a.dec_deg.to_radians());
        let vb = SkyCoord::unit_vector(b.ra_deg.to_radians(), b.dec_deg.to_radians());
        va.dot(&vb).clamp(-1.0, 1.0).acos().to_degrees()
    }

    #[test]
    fn gmst_at_j2000() {
        // 280.46061837 deg at 2000-01-01T12:00 UT1
        assert!((gmst(T2000).to_degrees() - 280.460_618_37).abs() < 1e-4);
    }

    #[test]
    fn gmst_is_normalized() {
        for mjd in [40587.0, 51544.0, 59000.25, 60123.9] {
            let g = gmst(mjd);
            assert!((0.0..TAU).contains(&g));
        }
    }

    #[test]
    fn precession_vanishes_at_j2000() {
        let p = precession_matrix(T2000);
        assert!((p - Matrix3::identity()).abs().max() < 1e-15);
    }

    #[test]
    fn precession_is_orthonormal() {
        let p = precession_matrix(59000.0);
        assert!((p * p.transpose() - Matrix3::identity()).abs().max() < 1e-12);
    }

    #[test]
    fn precession_moves_equinox_point() {
        // After 20 years an object at the equinox of date sits at roughly
        // -922" in RA and -401" in Dec in J2000 coordinates.
        let mjd = T2000 + 20.0 * 365.25;
        let of_date = SkyCoord::unit_vector(0.0, 0.0);
        let j2000 = SkyCoord::from_unit_vector(&(precession_matrix(mjd).transpose() * of_date));
        let ra = if j2000.ra_deg > 180.0 {
            j2000.ra_deg - 360.0
        } else {
            j2000.ra_deg
        };
        assert!((ra * 3600.0 + 922.4).abs() < 2.0, "ra = {ra}");
        assert!((j2000.dec_deg * 3600.0 + 400.9).abs() < 2.0, "dec = {}", j2000.dec_deg);
    }

    #[test]
    fn zenith_is_local_sidereal_time() {
        let site = Observatory::default();
        let mjd = T2000;
        let sky = altaz_to_radec(std::f64::consts::FRAC_PI_2, 0.3, mjd, &site);
        let lst = (gmst(mjd).to_degrees() + site.lon_deg).rem_euclid(360.0);
        assert!(angular_distance(sky, SkyCoord::new(lst, site.lat_deg)) < 1e-6);
    }

    #[test]
    fn north_horizon_is_below_the_pole() {
        let site = Observatory::default();
        let sky = altaz_to_radec(0.0, 0.0, 59000.0, &site);
        // Precession since J2000 shifts the pole by about 0.1 deg.
        assert!((sky.dec_deg - (90.0 - site.lat_deg)).abs() < 0.2);
    }

    #[test]
    fn crab_transit_from_la_palma() {
        // Crab Nebula transits due south at about 84 deg altitude.
        let crab = SkyCoord::new(83.63308, 22.0145);
        let site = Observatory::default();
        let mjd0 = 59000.0;
        let crab_vec = SkyCoord::unit_vector(crab.ra_deg.to_radians(), crab.dec_deg.to_radians());
        let of_date = SkyCoord::from_unit_vector(&(precession_matrix(mjd0) * crab_vec));

        let hour_angle = (gmst(mjd0).to_degrees() + site.lon_deg - of_date.ra_deg).rem_euclid(360.0);
        let mjd = mjd0 + (360.0 - hour_angle) / 360.0 / 1.00273790934;

        let alt = (90.0 - (site.lat_deg - of_date.dec_deg)).to_radians();
        let sky = altaz_to_radec(alt, std::f64::consts::PI, mjd, &site);
        assert!(angular_distance(sky, crab) < 1e-3, "{sky:?}");
    }

    #[test]
    fn right_ascension_in_range() {
        let site = Observatory::default();
        for k in 0..24 {
            let sky = altaz_to_radec(0.8, k as f64 * 0.26, 59500.0 + k as f64 / 24.0, &site);
            assert!((0.0..360.0).contains(&sky.ra_deg));
            assert!((-90.0..=90.0).contains(&sky.dec_deg));
        }
    }
}
