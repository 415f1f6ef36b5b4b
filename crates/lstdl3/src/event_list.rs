//! DL3 event lists: the `EVENTS`, `GTI` and `POINTING` HDUs of one run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use lstdl3_fits::header::MAX_STRING_LEN;
use lstdl3_fits::{
    BinaryColumnData, BinaryColumnDescriptor, BinaryColumnType, BinaryTableHdu, Card, NewFitsFile,
};
use tracing::{debug, info, warn};

use crate::config::Dl3Config;
use crate::coords::{altaz_to_radec, SkyCoord};
use crate::dl2::Dl2Events;
use crate::error::{Dl3Error, Result};
use crate::gadf::{self, default_header};
use crate::irf::IrfHdus;
use crate::time::{iso_date, unix_to_mjd, MJDREFF, MJDREFI, TIMEREF, TIMESYS, TIMEUNIT};

/// What is being observed in a run, and how.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInfo {
    /// Run number, written as OBS_ID.
    pub run: i64,
    pub source_name: String,
    /// Observation mode, e.g. `ON`, `OFF` or `WOBBLE`.
    pub obs_mode: String,
    /// Catalogue position of the source.
    pub source: SkyCoord,
}

/// The three HDUs built from one DL2 table.
#[derive(Debug, Clone)]
pub struct EventList {
    pub obs_id: i64,
    pub events: BinaryTableHdu,
    pub gti: BinaryTableHdu,
    pub pointing: BinaryTableHdu,
}

fn round6(x: f64) -> f64 {
    (x * 1e6).round() / 1e6
}

fn double_column(name: &str, unit: &str, values: Vec<f64>) -> (BinaryColumnDescriptor, BinaryColumnData) {
    (
        BinaryColumnDescriptor::new(name, 1, BinaryColumnType::Double).with_unit(unit),
        BinaryColumnData::Double(values),
    )
}

/// Distinct telescope ids, as `N_TELS` and `TELLIST`.
fn telescopes(tel_id: &[i64]) -> (i64, String) {
    let ids: BTreeSet<i64> = tel_id.iter().copied().collect();
    let list = ids
        .iter()
        .map(|id| format!("LST-{id}"))
        .collect::<Vec<_>>()
        .join(",");
    (ids.len() as i64, list)
}

fn check_finite(name: &str, values: &[f64]) -> Result<()> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(bad) => Err(Dl3Error::InvalidInput(format!("non-finite {name} {bad}"))),
        None => Ok(()),
    }
}

/// Header strings must survive the trip into a FITS card unchanged.
fn check_header_text(name: &str, value: &str) -> Result<()> {
    if !value.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        return Err(Dl3Error::InvalidInput(format!(
            "{name} {value:?} is not printable ASCII"
        )));
    }
    if value.len() > MAX_STRING_LEN {
        return Err(Dl3Error::InvalidInput(format!(
            "{name} is longer than {MAX_STRING_LEN} characters"
        )));
    }
    Ok(())
}

/// Build the `EVENTS`, `GTI` and `POINTING` HDUs for one run.
pub fn create_event_list(dl2: &Dl2Events, run: &RunInfo, config: &Dl3Config) -> Result<EventList> {
    dl2.validate()?;
    check_finite("dragon_time", &dl2.dragon_time)?;
    check_finite("pointing_alt", &dl2.pointing_alt)?;
    check_finite("pointing_az", &dl2.pointing_az)?;
    check_finite("source position", &[run.source.ra_deg, run.source.dec_deg])?;
    check_header_text("source name", &run.source_name)?;
    check_header_text("observation mode", &run.obs_mode)?;
    if !dl2.dragon_time.windows(2).all(|w| w[0] <= w[1]) {
        warn!(run = run.run, "dragon_time is not sorted");
    }

    let t_start = dl2.dragon_time.iter().copied().fold(f64::INFINITY, f64::min);
    let t_stop = dl2.dragon_time.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let ontime = t_stop - t_start;
    let deadc = config.dead_time.deadc();
    let livetime = deadc * ontime;
    let date_obs = iso_date(t_start);

    let site = &config.observatory;
    let alt_pnt = round6(
        (dl2.pointing_alt.iter().sum::<f64>() / dl2.len() as f64).to_degrees(),
    );
    let az_pnt = round6(dl2.pointing_az[0].to_degrees());
    let pnt_sky = altaz_to_radec(
        alt_pnt.to_radians(),
        az_pnt.to_radians(),
        unix_to_mjd(t_start),
        site,
    );

    let (ra, dec): (Vec<f64>, Vec<f64>) = dl2
        .reco_alt
        .iter()
        .zip(&dl2.reco_az)
        .zip(&dl2.dragon_time)
        .map(|((&alt, &az), &t)| {
            let sky = altaz_to_radec(alt, az, unix_to_mjd(t), site);
            (sky.ra_deg, sky.dec_deg)
        })
        .unzip();

    let (n_tels, tellist) = telescopes(&dl2.tel_id);
    debug!(
        run = run.run,
        events = dl2.len(),
        t_start,
        t_stop,
        ra_pnt = pnt_sky.ra_deg,
        dec_pnt = pnt_sky.dec_deg,
        "event list derived values"
    );

    let mut ev_header = default_header(&config.gadf);
    ev_header.extend([
        Card::new("HDUCLAS1", "EVENTS"),
        Card::new("OBS_ID", run.run).with_comment("observation id"),
        Card::new("DATE_OBS", date_obs.as_str()).with_comment("start date (UTC)"),
        Card::new("TSTART", t_start).with_comment("[s] start time"),
        Card::new("TSTOP", t_stop).with_comment("[s] stop time"),
        Card::new("MJDREFI", MJDREFI).with_comment("unix epoch, integer part"),
        Card::new("MJDREFF", MJDREFF).with_comment("unix epoch, fractional part"),
        Card::new("TIMEUNIT", TIMEUNIT),
        Card::new("TIMESYS", TIMESYS),
        Card::new("TIMEREF", TIMEREF),
        Card::new("OBJECT", run.source_name.as_str()),
        Card::new("OBS_MODE", run.obs_mode.as_str()),
        Card::new("N_TELS", n_tels),
        Card::new("TELLIST", tellist.as_str()),
        Card::new("RA_PNT", pnt_sky.ra_deg).with_comment("[deg]"),
        Card::new("DEC_PNT", pnt_sky.dec_deg).with_comment("[deg]"),
        Card::new("ALT_PNT", alt_pnt).with_comment("[deg]"),
        Card::new("AZ_PNT", az_pnt).with_comment("[deg]"),
        Card::new("RA_OBJ", run.source.ra_deg).with_comment("[deg]"),
        Card::new("DEC_OBJ", run.source.dec_deg).with_comment("[deg]"),
        Card::new("FOVALIGN", "ALTAZ"),
        Card::new("ONTIME", ontime).with_comment("[s]"),
        Card::new("LIVETIME", livetime).with_comment("[s]"),
        Card::new("DEADC", deadc).with_comment("dead time correction"),
        Card::new("TELESCOP", config.gadf.telescope.as_str()),
        Card::new("INSTRUME", config.gadf.instrument.as_str()),
        Card::new("GEOLON", site.lon_deg).with_comment("[deg]"),
        Card::new("GEOLAT", site.lat_deg).with_comment("[deg]"),
        Card::new("ALTITUDE", site.height_m).with_comment("[m]"),
        Card::new("EQUINOX", 2000.0),
        Card::new("RADECSYS", "ICRS"),
    ]);

    let (d_time, c_time) = double_column("TIME", "s", dl2.dragon_time.clone());
    let (d_ra, c_ra) = double_column("RA", "deg", ra);
    let (d_dec, c_dec) = double_column("DEC", "deg", dec);
    let (d_energy, c_energy) = double_column("ENERGY", "TeV", dl2.reco_energy.clone());
    let events = BinaryTableHdu::new(gadf::EVENTS)
        .column(
            BinaryColumnDescriptor::new("EVENT_ID", 1, BinaryColumnType::Long),
            BinaryColumnData::Long(dl2.event_id.clone()),
        )
        .column(d_time, c_time)
        .column(d_ra, c_ra)
        .column(d_dec, c_dec)
        .column(d_energy, c_energy)
        .cards(ev_header);

    let time_cards = || {
        [
            Card::new("MJDREFI", MJDREFI),
            Card::new("MJDREFF", MJDREFF),
            Card::new("TIMESYS", TIMESYS),
            Card::new("TIMEUNIT", TIMEUNIT),
        ]
    };

    let (d_start, c_start) = double_column("START", "s", vec![t_start]);
    let (d_stop, c_stop) = double_column("STOP", "s", vec![t_stop]);
    let gti = BinaryTableHdu::new(gadf::GTI)
        .column(d_start, c_start)
        .column(d_stop, c_stop)
        .cards(default_header(&config.gadf))
        .cards([
            Card::new("HDUCLAS1", "GTI"),
            Card::new("OBS_ID", run.run),
        ])
        .cards(time_cards())
        .card(Card::new("TIMEREF", TIMEREF));

    let pointing = BinaryTableHdu::new(gadf::POINTING)
        .cards(default_header(&config.gadf))
        .cards([
            Card::new("HDUCLAS1", "POINTING"),
            Card::new("OBS_ID", run.run),
            Card::new("RA_PNT", pnt_sky.ra_deg).with_comment("[deg]"),
            Card::new("DEC_PNT", pnt_sky.dec_deg).with_comment("[deg]"),
            Card::new("ALT_PNT", alt_pnt).with_comment("[deg]"),
            Card::new("AZ_PNT", az_pnt).with_comment("[deg]"),
            Card::new("TIME", t_start).with_comment("[s]"),
        ])
        .cards(time_cards());

    Ok(EventList {
        obs_id: run.run,
        events,
        gti,
        pointing,
    })
}

/// `dl3_LST-1.Run02008.fits`, or `.fits.gz` with `gzip`.
pub fn dl3_file_name(run: i64, gzip: bool) -> String {
    let ext = if gzip { "fits.gz" } else { "fits" };
    format!("dl3_LST-1.Run{run:05}.{ext}")
}

/// Write an event list, followed by the IRF HDUs if given, to `path`.
pub fn write_dl3_file(
    list: &EventList,
    irf: Option<&IrfHdus>,
    path: &Path,
    overwrite: bool,
) -> Result<PathBuf> {
    let mut file = NewFitsFile::create(path)
        .overwrite(overwrite)
        .primary_card(Card::new("CREATOR", "lstdl3"))
        .table(&list.events)?
        .table(&list.gti)?
        .table(&list.pointing)?;
    if let Some(irf) = irf {
        for (extname, bytes) in irf.iter() {
            debug!(extname, "appending IRF HDU");
            file = file.raw_hdu(bytes);
        }
    }
    let written = file.write().map_err(|e| match e {
        lstdl3_fits::Error::FileExists(p) => Dl3Error::OutputExists(p),
        other => other.into(),
    })?;
    info!(path = %written.display(), obs_id = list.obs_id, "wrote DL3 file");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lstdl3_fits::header::{card_float_value, card_integer_value, card_string_value};

    fn dl2() -> Dl2Events {
        Dl2Events {
            event_id: vec![10, 11, 12],
            dragon_time: vec![1_600_000_000.0, 1_600_000_005.0, 1_600_000_012.5],
            reco_alt: vec![1.2, 1.21, 1.19],
            reco_az: vec![3.1, 3.11, 3.09],
            reco_energy: vec![0.1, 1.0, 10.0],
            pointing_alt: vec![1.2, 1.2, 1.3],
            pointing_az: vec![3.1, 3.2, 3.3],
            tel_id: vec![1, 1, 1],
        }
    }

    fn run() -> RunInfo {
        RunInfo {
            run: 2008,
            source_name: "Crab".into(),
            obs_mode: "WOBBLE".into(),
            source: SkyCoord::new(83.63308, 22.0145),
        }
    }

    #[test]
    fn events_header_values() {
        let list = create_event_list(&dl2(), &run(), &Dl3Config::default()).unwrap();
        let cards = list.events.build_cards().unwrap();

        assert_eq!(card_integer_value(&cards, "OBS_ID"), Some(2008));
        assert_eq!(card_string_value(&cards, "DATE_OBS").as_deref(), Some("2020-09-13"));
        assert_eq!(card_float_value(&cards, "TSTART"), Some(1_600_000_000.0));
        assert_eq!(card_float_value(&cards, "TSTOP"), Some(1_600_000_012.5));
        assert_eq!(card_float_value(&cards, "ONTIME"), Some(12.5));
        assert_eq!(card_integer_value(&cards, "MJDREFI"), Some(40587));
        assert_eq!(card_string_value(&cards, "OBS_MODE").as_deref(), Some("WOBBLE"));
        assert_eq!(card_string_value(&cards, "FOVALIGN").as_deref(), Some("ALTAZ"));
        assert_eq!(card_string_value(&cards, "HDUCLAS1").as_deref(), Some("EVENTS"));
        assert_eq!(card_float_value(&cards, "RA_OBJ"), Some(83.63308));

        let deadc = card_float_value(&cards, "DEADC").unwrap();
        assert!((deadc - 1.0 / (1.0 + 2.6e-5 * 2800.0)).abs() < 1e-15);
        let livetime = card_float_value(&cards, "LIVETIME").unwrap();
        assert!((livetime - deadc * 12.5).abs() < 1e-12);
    }

    #[test]
    fn pointing_alt_is_mean_and_az_is_first() {
        let list = create_event_list(&dl2(), &run(), &Dl3Config::default()).unwrap();
        let cards = list.events.header_cards();
        let alt = card_float_value(cards, "ALT_PNT").unwrap();
        let az = card_float_value(cards, "AZ_PNT").unwrap();
        assert_eq!(alt, round6(((1.2 + 1.2 + 1.3) / 3.0f64).to_degrees()));
        assert_eq!(az, round6(3.1f64.to_degrees()));
        assert_eq!(card_float_value(list.pointing.header_cards(), "ALT_PNT"), Some(alt));
    }

    #[test]
    fn time_range_uses_extremes() {
        let mut events = dl2();
        events.dragon_time = vec![1_600_000_005.0, 1_600_000_000.0, 1_600_000_003.0];
        let list = create_event_list(&events, &run(), &Dl3Config::default()).unwrap();
        let gti = list.gti.build_cards().unwrap();
        assert_eq!(card_integer_value(&gti, "NAXIS2"), Some(1));
        let cards = list.events.header_cards();
        assert_eq!(card_float_value(cards, "TSTART"), Some(1_600_000_000.0));
        assert_eq!(card_float_value(cards, "TSTOP"), Some(1_600_000_005.0));
        assert_eq!(
            card_float_value(list.pointing.header_cards(), "TIME"),
            Some(1_600_000_000.0)
        );
    }

    #[test]
    fn telescope_list() {
        assert_eq!(telescopes(&[1, 1, 1]), (1, "LST-1".to_string()));
        assert_eq!(telescopes(&[3, 1, 3, 2]), (3, "LST-1,LST-2,LST-3".to_string()));
    }

    #[test]
    fn pointing_hdu_has_no_columns() {
        let list = create_event_list(&dl2(), &run(), &Dl3Config::default()).unwrap();
        assert_eq!(list.pointing.num_rows(), 0);
        let cards = list.pointing.build_cards().unwrap();
        assert_eq!(card_integer_value(&cards, "TFIELDS"), Some(0));
        assert_eq!(card_string_value(&cards, "EXTNAME").as_deref(), Some("POINTING"));
    }

    #[test]
    fn event_columns_follow_input_rows() {
        let list = create_event_list(&dl2(), &run(), &Dl3Config::default()).unwrap();
        assert_eq!(list.events.num_rows(), 3);
        let cards = list.events.build_cards().unwrap();
        assert_eq!(card_string_value(&cards, "TTYPE1").as_deref(), Some("EVENT_ID"));
        assert_eq!(card_string_value(&cards, "TFORM1").as_deref(), Some("1K"));
        assert_eq!(card_string_value(&cards, "TTYPE5").as_deref(), Some("ENERGY"));
        assert_eq!(card_string_value(&cards, "TUNIT5").as_deref(), Some("TeV"));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            create_event_list(&Dl2Events::default(), &run(), &Dl3Config::default()),
            Err(Dl3Error::EmptyInput)
        ));
    }

    #[test]
    fn non_finite_time_is_rejected() {
        let mut events = dl2();
        events.dragon_time[1] = f64::NAN;
        assert!(matches!(
            create_event_list(&events, &run(), &Dl3Config::default()),
            Err(Dl3Error::InvalidInput(_))
        ));
    }

    #[test]
    fn non_finite_pointing_is_rejected() {
        let mut events = dl2();
        events.pointing_alt[2] = f64::NAN;
        let err = create_event_list(&events, &run(), &Dl3Config::default()).unwrap_err();
        assert!(matches!(err, Dl3Error::InvalidInput(ref why) if why.contains("pointing_alt")));

        let mut events = dl2();
        events.pointing_az[0] = f64::INFINITY;
        assert!(matches!(
            create_event_list(&events, &run(), &Dl3Config::default()),
            Err(Dl3Error::InvalidInput(_))
        ));

        let mut source = run();
        source.source.dec_deg = f64::NAN;
        assert!(matches!(
            create_event_list(&dl2(), &source, &Dl3Config::default()),
            Err(Dl3Error::InvalidInput(_))
        ));
    }

    #[test]
    fn header_text_must_be_ascii() {
        let mut named = run();
        named.source_name = "\u{3b7} Car".into();
        assert!(matches!(
            create_event_list(&dl2(), &named, &Dl3Config::default()),
            Err(Dl3Error::InvalidInput(_))
        ));

        let mut mode = run();
        mode.obs_mode = "W".repeat(MAX_STRING_LEN + 1);
        assert!(matches!(
            create_event_list(&dl2(), &mode, &Dl3Config::default()),
            Err(Dl3Error::InvalidInput(_))
        ));
    }

    #[test]
    fn gti_and_pointing_headers() {
        let list = create_event_list(&dl2(), &run(), &Dl3Config::default()).unwrap();

        let gti = list.gti.build_cards().unwrap();
        assert_eq!(card_integer_value(&gti, "OBS_ID"), Some(2008));
        assert_eq!(card_integer_value(&gti, "MJDREFI"), Some(40587));
        assert_eq!(card_float_value(&gti, "MJDREFF"), Some(0.0));
        assert_eq!(card_string_value(&gti, "TIMESYS").as_deref(), Some("UTC"));
        assert_eq!(card_string_value(&gti, "TIMEUNIT").as_deref(), Some("s"));
        assert_eq!(card_string_value(&gti, "TIMEREF").as_deref(), Some(TIMEREF));

        let pnt = list.pointing.build_cards().unwrap();
        let events = list.events.header_cards();
        assert_eq!(card_integer_value(&pnt, "OBS_ID"), Some(2008));
        assert_eq!(card_float_value(&pnt, "RA_PNT"), card_float_value(events, "RA_PNT"));
        assert_eq!(card_float_value(&pnt, "DEC_PNT"), card_float_value(events, "DEC_PNT"));
        assert!(card_float_value(&pnt, "RA_PNT").is_some());
        assert!(card_float_value(&pnt, "DEC_PNT").is_some());
        assert_eq!(card_float_value(&pnt, "TIME"), Some(1_600_000_000.0));
        assert_eq!(card_integer_value(&pnt, "MJDREFI"), Some(40587));
        assert_eq!(card_float_value(&pnt, "MJDREFF"), Some(0.0));
        assert_eq!(card_string_value(&pnt, "TIMESYS").as_deref(), Some("UTC"));
        assert_eq!(card_string_value(&pnt, "TIMEUNIT").as_deref(), Some("s"));
    }

    #[test]
    fn file_names() {
        assert_eq!(dl3_file_name(2008, false), "dl3_LST-1.Run02008.fits");
        assert_eq!(dl3_file_name(12345, true), "dl3_LST-1.Run12345.fits.gz");
    }
}
