//! Whole-file reading and writing, with transparent gzip handling.

use std::path::{Path, PathBuf};

use crate::bintable::{read_binary_column_by_name, BinaryColumnData, BinaryTableHdu};
use crate::error::{Error, Result};
use crate::gzip;
use crate::hdu::{parse_fits, FitsData, Hdu};
use crate::header::{check_card, serialize_header, Card};
use crate::primary::build_primary_header;

/// Returns `true` if `path` names a gzip-compressed file (`*.gz`).
pub fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// An in-memory, fully parsed FITS file.
#[derive(Debug)]
pub struct FitsFile {
    data: Vec<u8>,
    fits: FitsData,
    filename: PathBuf,
}

impl FitsFile {
    /// Read and parse a FITS file, inflating it first if it is gzip.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read(path.as_ref())?;
        Self::from_bytes(raw, path.as_ref())
    }

    /// Parse FITS bytes (optionally gzip) that came from `filename`.
    pub fn from_bytes<P: AsRef<Path>>(raw: Vec<u8>, filename: P) -> Result<Self> {
        let data = gzip::maybe_decompress(raw)?;
        let fits = parse_fits(&data)?;
        Ok(FitsFile {
            data,
            fits,
            filename: filename.as_ref().to_path_buf(),
        })
    }

    /// The decompressed FITS byte stream.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn hdus(&self) -> &FitsData {
        &self.fits
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// The HDU with the given EXTNAME.
    pub fn hdu(&self, extname: &str) -> Option<&Hdu> {
        self.fits.find_by_name(extname)
    }

    /// The first binary table extension in the file.
    pub fn first_table(&self) -> Option<&Hdu> {
        self.fits.iter().find(|hdu| hdu.is_binary_table())
    }

    /// Read a named column from a binary table HDU of this file.
    pub fn column(&self, hdu: &Hdu, name: &str) -> Result<BinaryColumnData> {
        read_binary_column_by_name(&self.data, hdu, name)
    }

    /// The padded bytes of `hdu`, for copying into another file.
    pub fn raw_hdu(&self, hdu: &Hdu) -> Result<&[u8]> {
        hdu.raw_bytes(&self.data)
    }
}

/// Builder for a new FITS file: an empty primary HDU followed by extensions.
#[derive(Debug)]
pub struct NewFitsFile {
    path: PathBuf,
    overwrite: bool,
    primary_cards: Vec<Card>,
    extensions: Vec<Vec<u8>>,
}

impl NewFitsFile {
    pub fn create<P: AsRef<Path>>(path: P) -> Self {
        NewFitsFile {
            path: path.as_ref().to_path_buf(),
            overwrite: false,
            primary_cards: Vec::new(),
            extensions: Vec::new(),
        }
    }

    /// Replace an existing file instead of failing.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Add a card to the primary header.
    pub fn primary_card(mut self, card: Card) -> Self {
        self.primary_cards.push(card);
        self
    }

    /// Append a binary table extension.
    pub fn table(mut self, table: &BinaryTableHdu) -> Result<Self> {
        self.extensions.push(table.to_bytes()?);
        Ok(self)
    }

    /// Append an already serialized, block-padded HDU.
    pub fn raw_hdu(mut self, bytes: &[u8]) -> Self {
        self.extensions.push(bytes.to_vec());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The uncompressed FITS byte stream.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let primary = build_primary_header(&self.primary_cards);
        primary.iter().try_for_each(check_card)?;
        let mut out = serialize_header(&primary);
        for ext in &self.extensions {
            out.extend_from_slice(ext);
        }
        Ok(out)
    }

    /// Write the file, gzip-compressed when the path ends in `.gz`.
    pub fn write(self) -> Result<PathBuf> {
        if !self.overwrite && self.path.exists() {
            return Err(Error::FileExists(self.path));
        }
        let bytes = self.to_bytes()?;
        let bytes = if is_gzip_path(&self.path) {
            gzip::compress(&bytes)?
        } else {
            bytes
        };
        std::fs::write(&self.path, bytes)?;
        Ok(self.path)
    }
}
