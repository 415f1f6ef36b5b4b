//! The two-level GADF index over a directory of DL3 files.
//!
//! `obs-index.fits.gz` holds one row per observation (pointing, times,
//! target); `hdu-index.fits.gz` holds one row per HDU telling readers in
//! which file and extension each piece of an observation lives. File
//! names in the index are relative to the indexed directory.

use std::fs;
use std::path::{Path, PathBuf};

use lstdl3_fits::{
    BinaryColumnData, BinaryColumnDescriptor, BinaryColumnType, BinaryTableHdu, Card, FitsFile, Hdu,
    NewFitsFile,
};
use tracing::{debug, error, info, warn};

use crate::config::Dl3Config;
use crate::error::{Dl3Error, Result};
use crate::gadf::{self, default_header, HduClass};

/// Width of the FILE_NAME column.
const FILE_NAME_WIDTH: usize = 54;
const HDU_TYPE_MIN_WIDTH: usize = 6;

/// What an index run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSummary {
    pub observations: usize,
    pub hdu_rows: usize,
    /// Files that were listed but could not be indexed.
    pub skipped: Vec<String>,
    pub hdu_index: PathBuf,
    pub obs_index: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
struct HduRow {
    obs_id: i64,
    class: HduClass,
    file_name: String,
}

#[derive(Debug, Clone, PartialEq)]
struct ObsRow {
    obs_id: i64,
    date_obs: String,
    ra_pnt: f64,
    dec_pnt: f64,
    alt_pnt: f64,
    az_pnt: f64,
    ra_obj: f64,
    dec_obj: f64,
    ontime: f64,
    livetime: f64,
    deadc: f64,
    tstart: f64,
    tstop: f64,
    object: String,
    obs_mode: String,
    n_tels: i64,
    tellist: String,
    mjdrefi: i64,
    mjdreff: f64,
}

impl ObsRow {
    fn zen_pnt(&self) -> f64 {
        90.0 - self.alt_pnt
    }
}

struct HeaderReader<'a> {
    hdu: &'a Hdu,
    name: &'static str,
}

impl HeaderReader<'_> {
    fn missing(&self, keyword: &str) -> Dl3Error {
        Dl3Error::MissingHeaderKey {
            keyword: keyword.to_string(),
            hdu: self.name.to_string(),
        }
    }

    fn float(&self, keyword: &str) -> Result<f64> {
        self.hdu
            .float_value(keyword)
            .ok_or_else(|| self.missing(keyword))
    }

    fn integer(&self, keyword: &str) -> Result<i64> {
        self.hdu
            .integer_value(keyword)
            .ok_or_else(|| self.missing(keyword))
    }

    fn string(&self, keyword: &str) -> Result<String> {
        self.hdu
            .string_value(keyword)
            .ok_or_else(|| self.missing(keyword))
    }
}

/// Observation row from the EVENTS header, with the pointing taken from
/// the POINTING header.
fn obs_row(events: &Hdu, pointing: &Hdu) -> Result<ObsRow> {
    let ev = HeaderReader {
        hdu: events,
        name: gadf::EVENTS,
    };
    let pnt = HeaderReader {
        hdu: pointing,
        name: gadf::POINTING,
    };
    Ok(ObsRow {
        obs_id: ev.integer("OBS_ID")?,
        date_obs: ev.string("DATE_OBS")?,
        ra_pnt: pnt.float("RA_PNT")?,
        dec_pnt: pnt.float("DEC_PNT")?,
        alt_pnt: pnt.float("ALT_PNT")?,
        az_pnt: pnt.float("AZ_PNT")?,
        ra_obj: ev.float("RA_OBJ")?,
        dec_obj: ev.float("DEC_OBJ")?,
        ontime: ev.float("ONTIME")?,
        livetime: ev.float("LIVETIME")?,
        deadc: ev.float("DEADC")?,
        tstart: ev.float("TSTART")?,
        tstop: ev.float("TSTOP")?,
        object: ev.string("OBJECT")?,
        obs_mode: ev.string("OBS_MODE")?,
        n_tels: ev.integer("N_TELS")?,
        tellist: ev.string("TELLIST")?,
        mjdrefi: ev.integer("MJDREFI")?,
        mjdreff: ev.float("MJDREFF")?,
    })
}

/// Index rows of one DL3 file.
fn index_file(file: &FitsFile, file_name: &str) -> Result<(ObsRow, Vec<HduRow>)> {
    let require = |extname: &str| {
        file.hdu(extname).ok_or_else(|| Dl3Error::MissingHdu {
            hdu: extname.to_string(),
            file: file.filename().to_path_buf(),
        })
    };
    let events = require(gadf::EVENTS)?;
    require(gadf::GTI)?;
    let pointing = require(gadf::POINTING)?;

    let obs = obs_row(events, pointing)?;
    let row = |class: HduClass| HduRow {
        obs_id: obs.obs_id,
        class,
        file_name: file_name.to_string(),
    };

    let mut rows = vec![
        row(gadf::EVENTS_CLASS),
        row(gadf::GTI_CLASS),
        row(gadf::POINTING_CLASS),
    ];

    for (class, required) in [
        (gadf::EDISP_CLASS, true),
        (gadf::AEFF_CLASS, true),
        (gadf::BKG_CLASS, false),
        (gadf::PSF_CLASS, false),
        (gadf::RAD_MAX_CLASS, false),
    ] {
        if file.hdu(class.hdu_name).is_some() {
            rows.push(row(class));
        } else if required {
            error!(file = file_name, "{} HDU not found", class.hdu_name);
        }
    }
    Ok((obs, rows))
}

/// Values that do not fit in a `width`-byte column.
fn overlong(values: &[String], width: usize) -> impl Iterator<Item = &String> {
    values.iter().filter(move |v| v.len() > width)
}

fn ascii_column(
    name: &str,
    width: usize,
    values: Vec<String>,
) -> (BinaryColumnDescriptor, BinaryColumnData) {
    for value in overlong(&values, width) {
        warn!(column = name, value = %value, "value longer than {width} characters is truncated");
    }
    (
        BinaryColumnDescriptor::new(name, width, BinaryColumnType::Ascii),
        BinaryColumnData::Ascii(values),
    )
}

fn float_column(name: &str, unit: &str, values: Vec<f32>) -> (BinaryColumnDescriptor, BinaryColumnData) {
    let desc = BinaryColumnDescriptor::new(name, 1, BinaryColumnType::Float);
    let desc = if unit.is_empty() {
        desc
    } else {
        desc.with_unit(unit)
    };
    (desc, BinaryColumnData::Float(values))
}

fn index_header(config: &Dl3Config, hduclas2: &str) -> Vec<Card> {
    let mut cards = default_header(&config.gadf);
    cards.extend([
        Card::new("HDUCLAS1", "INDEX"),
        Card::new("HDUCLAS2", hduclas2),
        Card::new("TELESCOP", config.gadf.index_telescope.as_str()),
        Card::new("INSTRUME", config.gadf.index_instrument.as_str()),
    ]);
    cards
}

fn hdu_index_table(rows: &[HduRow], config: &Dl3Config) -> BinaryTableHdu {
    let type_width = rows
        .iter()
        .map(|r| r.class.hdu_type.len())
        .max()
        .unwrap_or(0)
        .max(HDU_TYPE_MIN_WIDTH);
    let strings = |f: fn(&HduRow) -> &str| -> Vec<String> {
        rows.iter().map(|r| f(r).to_string()).collect()
    };

    let columns = [
        ascii_column("HDU_TYPE", type_width, strings(|r| r.class.hdu_type)),
        ascii_column("HDU_CLASS", 10, strings(|r| r.class.hdu_class)),
        ascii_column("HDU_CLASS2", 20, strings(|r| r.class.hdu_class2)),
        ascii_column("HDU_CLASS3", 20, strings(|r| r.class.hdu_class3)),
        ascii_column("HDU_CLASS4", 20, strings(|r| r.class.hdu_class4)),
        ascii_column("FILE_DIR", 70, strings(|_| "")),
        ascii_column("FILE_NAME", FILE_NAME_WIDTH, strings(|r| r.file_name.as_str())),
        ascii_column("HDU_NAME", 20, strings(|r| r.class.hdu_name)),
    ];

    columns.into_iter().fold(
        BinaryTableHdu::new(gadf::HDU_INDEX).column(
            BinaryColumnDescriptor::new("OBS_ID", 1, BinaryColumnType::Long),
            BinaryColumnData::Long(rows.iter().map(|r| r.obs_id).collect()),
        ),
        |table, (desc, data)| table.column(desc, data),
    )
    .cards(index_header(config, "HDU"))
}

fn obs_index_table(rows: &[ObsRow], config: &Dl3Config) -> BinaryTableHdu {
    let floats = |f: fn(&ObsRow) -> f64| -> Vec<f32> { rows.iter().map(|r| f(r) as f32).collect() };
    let doubles = |f: fn(&ObsRow) -> f64| -> Vec<f64> { rows.iter().map(f).collect() };
    let strings = |f: fn(&ObsRow) -> &str| -> Vec<String> {
        rows.iter().map(|r| f(r).to_string()).collect()
    };

    let (d_date, c_date) = ascii_column("DATE_OBS", 12, strings(|r| r.date_obs.as_str()));
    let mut table = BinaryTableHdu::new(gadf::OBS_INDEX)
        .column(
            BinaryColumnDescriptor::new("OBS_ID", 1, BinaryColumnType::Long),
            BinaryColumnData::Long(rows.iter().map(|r| r.obs_id).collect()),
        )
        .column(d_date, c_date);

    let float_columns: [(&str, &str, fn(&ObsRow) -> f64); 10] = [
        ("RA_PNT", "deg", |r| r.ra_pnt),
        ("DEC_PNT", "deg", |r| r.dec_pnt),
        ("ZEN_PNT", "deg", ObsRow::zen_pnt),
        ("ALT_PNT", "deg", |r| r.alt_pnt),
        ("AZ_PNT", "deg", |r| r.az_pnt),
        ("RA_OBJ", "deg", |r| r.ra_obj),
        ("DEC_OBJ", "deg", |r| r.dec_obj),
        ("ONTIME", "s", |r| r.ontime),
        ("LIVETIME", "s", |r| r.livetime),
        ("DEADC", "", |r| r.deadc),
    ];
    for (name, unit, get) in float_columns {
        let (desc, data) = float_column(name, unit, floats(get));
        table = table.column(desc, data);
    }

    let mut table = table
        .column(
            BinaryColumnDescriptor::new("TSTART", 1, BinaryColumnType::Double).with_unit("s"),
            BinaryColumnData::Double(doubles(|r| r.tstart)),
        )
        .column(
            BinaryColumnDescriptor::new("TSTOP", 1, BinaryColumnType::Double).with_unit("s"),
            BinaryColumnData::Double(doubles(|r| r.tstop)),
        );
    let (d, c) = ascii_column("OBJECT", 20, strings(|r| r.object.as_str()));
    table = table.column(d, c);
    let (d, c) = ascii_column("OBS_MODE", 20, strings(|r| r.obs_mode.as_str()));
    table = table
        .column(d, c)
        .column(
            BinaryColumnDescriptor::new("N_TELS", 1, BinaryColumnType::Long),
            BinaryColumnData::Long(rows.iter().map(|r| r.n_tels).collect()),
        );
    let (d, c) = ascii_column("TELLIST", 20, strings(|r| r.tellist.as_str()));
    table = table.column(d, c).cards(index_header(config, "OBS"));

    // The reference epoch of the last indexed file describes the index.
    if let Some(last) = rows.last() {
        table = table.cards([
            Card::new("MJDREFI", last.mjdrefi),
            Card::new("MJDREFF", last.mjdreff),
        ]);
    }
    table
}

/// Build `hdu-index.fits.gz` and `obs-index.fits.gz` in `fits_dir` from
/// the DL3 files `file_names` (relative to `fits_dir`).
///
/// Missing or unreadable files are logged and skipped. Existing index
/// files are replaced. Fails without writing anything when no file
/// could be indexed.
pub fn create_obs_hdu_index<S: AsRef<str>>(
    file_names: &[S],
    fits_dir: &Path,
    config: &Dl3Config,
) -> Result<IndexSummary> {
    let mut hdu_rows = Vec::new();
    let mut obs_rows = Vec::new();
    let mut skipped = Vec::new();

    for name in file_names {
        let name: &str = name.as_ref();
        let path = fits_dir.join(name);
        if !path.is_file() {
            error!("fits {name} doesn't exist");
            skipped.push(name.to_string());
            continue;
        }
        let indexed = FitsFile::open(&path)
            .map_err(Dl3Error::from)
            .and_then(|file| index_file(&file, name));
        match indexed {
            Ok((obs, rows)) => {
                debug!(file = name, obs_id = obs.obs_id, hdus = rows.len(), "indexed");
                obs_rows.push(obs);
                hdu_rows.extend(rows);
            }
            Err(e) => {
                error!("fits corrupted for file {name}: {e}");
                skipped.push(name.to_string());
            }
        }
    }

    if obs_rows.is_empty() {
        return Err(Dl3Error::NoObservations(fits_dir.to_path_buf()));
    }

    let hdu_table = hdu_index_table(&hdu_rows, config);
    let obs_table = obs_index_table(&obs_rows, config);

    let hdu_index = NewFitsFile::create(fits_dir.join(gadf::HDU_INDEX_FILE))
        .overwrite(true)
        .table(&hdu_table)?
        .write()?;
    let obs_index = NewFitsFile::create(fits_dir.join(gadf::OBS_INDEX_FILE))
        .overwrite(true)
        .table(&obs_table)?
        .write()?;

    info!(
        dir = %fits_dir.display(),
        observations = obs_rows.len(),
        hdus = hdu_rows.len(),
        skipped = skipped.len(),
        "wrote index files"
    );
    Ok(IndexSummary {
        observations: obs_rows.len(),
        hdu_rows: hdu_rows.len(),
        skipped,
        hdu_index,
        obs_index,
    })
}

/// Sorted names of the `<prefix>*.fits` and `<prefix>*.fits.gz` files in `dir`.
pub fn scan_dir(dir: &Path, prefix: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with(prefix) && (name.ends_with(".fits") || name.ends_with(".fits.gz")) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lstdl3_fits::header::{card_integer_value, card_string_value};

    fn events_hdu(obs_id: i64) -> BinaryTableHdu {
        BinaryTableHdu::new(gadf::EVENTS).cards([
            Card::new("OBS_ID", obs_id),
            Card::new("DATE_OBS", "2020-09-13"),
            Card::new("RA_OBJ", 83.63),
            Card::new("DEC_OBJ", 22.01),
            Card::new("ONTIME", 100.0),
            Card::new("LIVETIME", 93.0),
            Card::new("DEADC", 0.93),
            Card::new("TSTART", 1.6e9),
            Card::new("TSTOP", 1.6e9 + 100.0),
            Card::new("OBJECT", "Crab"),
            Card::new("OBS_MODE", "WOBBLE"),
            Card::new("N_TELS", 1i64),
            Card::new("TELLIST", "LST-1"),
            // older files carry the reference epoch as strings
            Card::new("MJDREFI", "40587"),
            Card::new("MJDREFF", "0"),
        ])
    }

    fn pointing_hdu() -> BinaryTableHdu {
        BinaryTableHdu::new(gadf::POINTING).cards([
            Card::new("RA_PNT", 83.9),
            Card::new("DEC_PNT", 22.2),
            Card::new("ALT_PNT", 70.0),
            Card::new("AZ_PNT", 180.0),
        ])
    }

    fn write_dl3(dir: &Path, name: &str, obs_id: i64, extra: &[&str]) {
        let mut file = NewFitsFile::create(dir.join(name))
            .table(&events_hdu(obs_id))
            .unwrap()
            .table(&BinaryTableHdu::new(gadf::GTI))
            .unwrap()
            .table(&pointing_hdu())
            .unwrap();
        for extname in extra {
            file = file.table(&BinaryTableHdu::new(extname)).unwrap();
        }
        file.write().unwrap();
    }

    #[test]
    fn rows_for_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        write_dl3(
            dir.path(),
            "dl3_a.fits",
            1,
            &[gadf::EFFECTIVE_AREA, gadf::ENERGY_DISPERSION, gadf::RAD_MAX],
        );
        let file = FitsFile::open(dir.path().join("dl3_a.fits")).unwrap();
        let (obs, rows) = index_file(&file, "dl3_a.fits").unwrap();

        assert_eq!(obs.obs_id, 1);
        assert_eq!(obs.mjdrefi, 40587);
        assert_eq!(obs.zen_pnt(), 20.0);
        let types: Vec<&str> = rows.iter().map(|r| r.class.hdu_type).collect();
        assert_eq!(types, vec!["events", "gti", "pointing", "edisp", "aeff", "rad_max"]);
    }

    #[test]
    fn aeff_row_does_not_need_edisp() {
        let dir = tempfile::tempdir().unwrap();
        write_dl3(dir.path(), "dl3_b.fits", 2, &[gadf::EFFECTIVE_AREA]);
        let file = FitsFile::open(dir.path().join("dl3_b.fits")).unwrap();
        let (_, rows) = index_file(&file, "dl3_b.fits").unwrap();
        assert_eq!(rows.last().unwrap().class, gadf::AEFF_CLASS);
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn missing_header_key_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dl3_c.fits");
        NewFitsFile::create(&path)
            .table(&BinaryTableHdu::new(gadf::EVENTS).card(Card::new("OBS_ID", 3i64)))
            .unwrap()
            .table(&BinaryTableHdu::new(gadf::GTI))
            .unwrap()
            .table(&pointing_hdu())
            .unwrap()
            .write()
            .unwrap();
        let file = FitsFile::open(&path).unwrap();
        assert!(matches!(
            index_file(&file, "dl3_c.fits"),
            Err(Dl3Error::MissingHeaderKey { ref keyword, .. }) if keyword == "DATE_OBS"
        ));
    }

    #[test]
    fn hdu_type_widens_for_rad_max() {
        let row = |class| HduRow {
            obs_id: 1,
            class,
            file_name: "f.fits".into(),
        };
        let config = Dl3Config::default();
        let cards = hdu_index_table(&[row(gadf::EVENTS_CLASS)], &config)
            .build_cards()
            .unwrap();
        assert_eq!(card_string_value(&cards, "TFORM2").as_deref(), Some("6A"));

        let cards = hdu_index_table(&[row(gadf::EVENTS_CLASS), row(gadf::RAD_MAX_CLASS)], &config)
            .build_cards()
            .unwrap();
        assert_eq!(card_string_value(&cards, "TFORM2").as_deref(), Some("7A"));
        assert_eq!(card_integer_value(&cards, "NAXIS2"), Some(2));
    }

    #[test]
    fn scan_picks_prefixed_fits_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "dl3_LST-1.Run02009.fits.gz",
            "dl3_LST-1.Run02008.fits",
            "dl2_LST-1.Run02008.fits",
            "dl3_notes.txt",
            "hdu-index.fits.gz",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("dl3_subdir.fits")).unwrap();

        assert_eq!(
            scan_dir(dir.path(), "dl3").unwrap(),
            vec!["dl3_LST-1.Run02008.fits", "dl3_LST-1.Run02009.fits.gz"]
        );
    }

    #[test]
    fn overlong_index_values_are_flagged() {
        let tellist = vec!["LST-1".to_string(), "LST-1,LST-2,LST-3,LST-4".to_string()];
        let flagged: Vec<_> = overlong(&tellist, 20).collect();
        assert_eq!(flagged, vec!["LST-1,LST-2,LST-3,LST-4"]);
        assert_eq!(overlong(&tellist, 23).count(), 0);

        let (desc, _) = ascii_column("TELLIST", 20, tellist);
        assert_eq!(desc.byte_width(), 20);
    }
}
