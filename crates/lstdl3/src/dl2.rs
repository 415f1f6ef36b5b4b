//! DL2 event tables: reconstructed direction, energy and pointing per event.
//!
//! Angles are in radians, energies in TeV and `dragon_time` in unix
//! seconds (UTC). Tables are read from a FITS binary table or from CSV.

use std::path::Path;

use lstdl3_fits::{BinaryColumnData, FitsFile, Hdu};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Dl3Error, Result};

/// EXTNAME looked up first when reading DL2 from FITS.
pub const DL2_EXTNAME: &str = "DL2 EVENTS";

pub const COLUMNS: [&str; 8] = [
    "event_id",
    "dragon_time",
    "reco_alt",
    "reco_az",
    "reco_energy",
    "pointing_alt",
    "pointing_az",
    "tel_id",
];

/// Column-oriented DL2 events, all columns of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dl2Events {
    pub event_id: Vec<i64>,
    pub dragon_time: Vec<f64>,
    pub reco_alt: Vec<f64>,
    pub reco_az: Vec<f64>,
    pub reco_energy: Vec<f64>,
    pub pointing_alt: Vec<f64>,
    pub pointing_az: Vec<f64>,
    pub tel_id: Vec<i64>,
}

/// One CSV row.
#[derive(Debug, Deserialize)]
struct Dl2Record {
    event_id: i64,
    dragon_time: f64,
    reco_alt: f64,
    reco_az: f64,
    reco_energy: f64,
    pointing_alt: f64,
    pointing_az: f64,
    tel_id: i64,
}

impl Dl2Events {
    pub fn len(&self) -> usize {
        self.event_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.event_id.is_empty()
    }

    fn push(&mut self, r: Dl2Record) {
        self.event_id.push(r.event_id);
        self.dragon_time.push(r.dragon_time);
        self.reco_alt.push(r.reco_alt);
        self.reco_az.push(r.reco_az);
        self.reco_energy.push(r.reco_energy);
        self.pointing_alt.push(r.pointing_alt);
        self.pointing_az.push(r.pointing_az);
        self.tel_id.push(r.tel_id);
    }

    fn lengths(&self) -> [(&'static str, usize); 8] {
        [
            ("event_id", self.event_id.len()),
            ("dragon_time", self.dragon_time.len()),
            ("reco_alt", self.reco_alt.len()),
            ("reco_az", self.reco_az.len()),
            ("reco_energy", self.reco_energy.len()),
            ("pointing_alt", self.pointing_alt.len()),
            ("pointing_az", self.pointing_az.len()),
            ("tel_id", self.tel_id.len()),
        ]
    }

    /// Check that the table is non-empty and rectangular.
    pub fn validate(&self) -> Result<()> {
        let expected = self.len();
        if let Some((column, found)) = self.lengths().into_iter().find(|&(_, n)| n != expected) {
            return Err(Dl3Error::LengthMismatch {
                column: column.to_string(),
                expected,
                found,
            });
        }
        if expected == 0 {
            return Err(Dl3Error::EmptyInput);
        }
        Ok(())
    }

    /// Load a DL2 table, choosing CSV or FITS from the file extension.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Dl3Error::FileNotFound(path.to_path_buf()));
        }
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if is_csv {
            Self::read_csv(path)
        } else {
            Self::read_fits(path)
        }
    }

    /// Load from a CSV file whose header row names the DL2 columns.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let headers = reader.headers()?.clone();
        if let Some(missing) = COLUMNS.iter().find(|c| !headers.iter().any(|h| h == **c)) {
            return Err(Dl3Error::MissingColumn(missing.to_string()));
        }

        let mut events = Dl2Events::default();
        for record in reader.deserialize() {
            events.push(record?);
        }
        debug!(path = %path.as_ref().display(), events = events.len(), "read DL2 CSV");
        events.validate()?;
        Ok(events)
    }

    /// Load from the `DL2 EVENTS` HDU of a FITS file, or its first binary
    /// table when no HDU has that name.
    pub fn read_fits<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = FitsFile::open(path.as_ref())?;
        let hdu = file
            .hdu(DL2_EXTNAME)
            .or_else(|| file.first_table())
            .ok_or_else(|| Dl3Error::MissingHdu {
                hdu: DL2_EXTNAME.to_string(),
                file: path.as_ref().to_path_buf(),
            })?;

        let floats = |name: &str| float_column(&file, hdu, name);
        let ints = |name: &str| integer_column(&file, hdu, name);
        let events = Dl2Events {
            event_id: ints("event_id")?,
            dragon_time: floats("dragon_time")?,
            reco_alt: floats("reco_alt")?,
            reco_az: floats("reco_az")?,
            reco_energy: floats("reco_energy")?,
            pointing_alt: floats("pointing_alt")?,
            pointing_az: floats("pointing_az")?,
            tel_id: ints("tel_id")?,
        };
        debug!(path = %path.as_ref().display(), events = events.len(), "read DL2 FITS");
        events.validate()?;
        Ok(events)
    }
}

fn column(file: &FitsFile, hdu: &Hdu, name: &str) -> Result<BinaryColumnData> {
    file.column(hdu, name).map_err(|e| match e {
        lstdl3_fits::Error::ColumnNotFound(_) => Dl3Error::MissingColumn(name.to_string()),
        other => other.into(),
    })
}

fn float_column(file: &FitsFile, hdu: &Hdu, name: &str) -> Result<Vec<f64>> {
    column(file, hdu, name)?
        .to_f64_vec()
        .ok_or_else(|| Dl3Error::InvalidInput(format!("column {name} is not numeric")))
}

fn integer_column(file: &FitsFile, hdu: &Hdu, name: &str) -> Result<Vec<i64>> {
    column(file, hdu, name)?
        .to_i64_vec()
        .ok_or_else(|| Dl3Error::InvalidInput(format!("column {name} is not an integer column")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lstdl3_fits::{BinaryColumnDescriptor, BinaryColumnType, BinaryTableHdu, NewFitsFile};

    const CSV: &str = "\
event_id,dragon_time,reco_alt,reco_az,reco_energy,pointing_alt,pointing_az,tel_id
1,1600000000.0,1.2,3.1,0.5,1.21,3.12,1
2,1600000001.5,1.1,3.0,1.5,1.21,3.12,1
";

    #[test]
    fn reads_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dl2.csv");
        std::fs::write(&path, CSV).unwrap();

        let events = Dl2Events::read(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events.event_id, vec![1, 2]);
        assert_eq!(events.dragon_time[1], 1_600_000_001.5);
        assert_eq!(events.tel_id, vec![1, 1]);
    }

    #[test]
    fn csv_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dl2.csv");
        std::fs::write(&path, "event_id,dragon_time\n1,2.0\n").unwrap();
        assert!(matches!(
            Dl2Events::read(&path),
            Err(Dl3Error::MissingColumn(ref c)) if c == "reco_alt"
        ));
    }

    #[test]
    fn csv_without_rows_is_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dl2.csv");
        std::fs::write(&path, CSV.lines().next().unwrap()).unwrap();
        assert!(matches!(Dl2Events::read(&path), Err(Dl3Error::EmptyInput)));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Dl2Events::read(dir.path().join("dl2.fits")),
            Err(Dl3Error::FileNotFound(_))
        ));
    }

    fn double(name: &str, values: Vec<f64>) -> (BinaryColumnDescriptor, BinaryColumnData) {
        (
            BinaryColumnDescriptor::new(name, 1, BinaryColumnType::Double),
            BinaryColumnData::Double(values),
        )
    }

    #[test]
    fn reads_fits_with_mixed_numeric_types() {
        let (d_time, c_time) = double("dragon_time", vec![10.0, 11.0]);
        let (d_alt, c_alt) = double("reco_alt", vec![1.0, 1.1]);
        let (d_az, c_az) = double("reco_az", vec![2.0, 2.1]);
        let (d_palt, c_palt) = double("pointing_alt", vec![1.05, 1.05]);
        let (d_paz, c_paz) = double("pointing_az", vec![2.05, 2.05]);
        let table = BinaryTableHdu::new(DL2_EXTNAME)
            .column(
                BinaryColumnDescriptor::new("event_id", 1, BinaryColumnType::Long),
                BinaryColumnData::Long(vec![7, 8]),
            )
            .column(d_time, c_time)
            .column(d_alt, c_alt)
            .column(d_az, c_az)
            .column(
                BinaryColumnDescriptor::new("reco_energy", 1, BinaryColumnType::Float),
                BinaryColumnData::Float(vec![0.25, 4.0]),
            )
            .column(d_palt, c_palt)
            .column(d_paz, c_paz)
            .column(
                BinaryColumnDescriptor::new("tel_id", 1, BinaryColumnType::Short),
                BinaryColumnData::Short(vec![1, 1]),
            );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dl2_LST-1.Run02008.fits.gz");
        NewFitsFile::create(&path).table(&table).unwrap().write().unwrap();

        let events = Dl2Events::read(&path).unwrap();
        assert_eq!(events.event_id, vec![7, 8]);
        assert_eq!(events.reco_energy, vec![0.25, 4.0]);
        assert_eq!(events.tel_id, vec![1, 1]);
    }

    #[test]
    fn fits_missing_column() {
        let (d, c) = double("dragon_time", vec![1.0]);
        let table = BinaryTableHdu::new("OTHER").column(d, c);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dl2.fits");
        NewFitsFile::create(&path).table(&table).unwrap().write().unwrap();

        assert!(matches!(
            Dl2Events::read(&path),
            Err(Dl3Error::MissingColumn(ref c)) if c == "event_id"
        ));
    }

    #[test]
    fn ragged_table_is_rejected() {
        let mut events = Dl2Events::default();
        events.push(Dl2Record {
            event_id: 1,
            dragon_time: 0.0,
            reco_alt: 0.0,
            reco_az: 0.0,
            reco_energy: 0.0,
            pointing_alt: 0.0,
            pointing_az: 0.0,
            tel_id: 1,
        });
        events.reco_az.push(1.0);
        assert!(matches!(
            events.validate(),
            Err(Dl3Error::LengthMismatch { ref column, expected: 1, found: 2 }) if column == "reco_az"
        ));
    }
}
