use std::path::PathBuf;

/// All errors that can occur while reading or writing FITS products.
#[derive(Debug)]
pub enum Error {
    /// Malformed FITS header block.
    InvalidHeader(&'static str),
    /// Premature end of data while reading.
    UnexpectedEof,
    /// Malformed keyword name in a header card.
    InvalidKeyword,
    /// Unknown or unsupported XTENSION type.
    UnsupportedExtension(String),
    /// A header value or TFORM could not be parsed correctly.
    InvalidValue,
    /// A required keyword was not found in the header.
    MissingKeyword(&'static str),
    /// A binary table column was not found by name.
    ColumnNotFound(String),
    /// A column does not hold one cell per table row.
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
    /// Column data does not match the declared column type.
    ColumnType(String),
    /// The column type is recognized but its cells are not decoded.
    UnsupportedColumn(String),
    /// A header card value that cannot be written as a FITS card.
    CardValue {
        keyword: String,
        reason: &'static str,
    },
    /// A gzip member could not be decoded.
    Decompression(String),
    /// Refused to replace an existing output file.
    FileExists(PathBuf),
    /// An I/O error from the standard library.
    Io(std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidHeader(why) => write!(f, "invalid FITS header: {why}"),
            Error::UnexpectedEof => write!(f, "unexpected end of file"),
            Error::InvalidKeyword => write!(f, "invalid keyword name"),
            Error::UnsupportedExtension(x) => write!(f, "unsupported XTENSION type: {x}"),
            Error::InvalidValue => write!(f, "invalid header value"),
            Error::MissingKeyword(kw) => write!(f, "missing required keyword: {kw}"),
            Error::ColumnNotFound(name) => write!(f, "column not found: {name}"),
            Error::ColumnLength {
                column,
                expected,
                found,
            } => write!(
                f,
                "column {column} has {found} cells, table has {expected} rows"
            ),
            Error::ColumnType(name) => write!(f, "column {name} data does not match its TFORM"),
            Error::UnsupportedColumn(name) => {
                write!(f, "column {name} has a type that cannot be read")
            }
            Error::CardValue { keyword, reason } => {
                write!(f, "cannot write {keyword} card: {reason}")
            }
            Error::Decompression(why) => write!(f, "gzip decompression failed: {why}"),
            Error::FileExists(path) => write!(f, "file already exists: {}", path.display()),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
