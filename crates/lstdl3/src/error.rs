use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Dl3Error {
    #[error("FITS error: {0}")]
    Fits(#[from] lstdl3_fits::Error),

    #[error("Unable to perform file operation: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid configuration file: {0}")]
    Config(#[from] toml::de::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Missing column in DL2 table: {0}")]
    MissingColumn(String),

    #[error("Column {column} has {found} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("DL2 table contains no events")]
    EmptyInput,

    #[error("HDU {hdu} not found in {file}")]
    MissingHdu { hdu: String, file: PathBuf },

    #[error("Header keyword {keyword} missing from HDU {hdu}")]
    MissingHeaderKey { keyword: String, hdu: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} already exists, pass overwrite to replace it")]
    OutputExists(PathBuf),

    #[error("No DL3 file could be indexed in {0}")]
    NoObservations(PathBuf),
}

pub type Result<T> = std::result::Result<T, Dl3Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_culprit() {
        let err = Dl3Error::MissingHeaderKey {
            keyword: "OBS_ID".into(),
            hdu: "EVENTS".into(),
        };
        assert_eq!(err.to_string(), "Header keyword OBS_ID missing from HDU EVENTS");

        let err = Dl3Error::LengthMismatch {
            column: "reco_alt".into(),
            expected: 3,
            found: 2,
        };
        assert_eq!(err.to_string(), "Column reco_alt has 2 rows, expected 3");
    }

    #[test]
    fn fits_errors_convert() {
        let err: Dl3Error = lstdl3_fits::Error::UnexpectedEof.into();
        assert!(matches!(err, Dl3Error::Fits(_)));
    }
}
