use crate::block::{padded_byte_len, BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::header::{
    card_float_value, card_integer_value, card_logical_value, card_string_value,
    header_byte_len, parse_header_blocks, Card,
};

/// Describes the kind and shape of data in a single HDU.
#[derive(Debug, Clone, PartialEq)]
pub enum HduInfo {
    /// Primary HDU, possibly holding an image.
    Primary {
        /// BITPIX value (8, 16, 32, 64, -32, -64).
        bitpix: i64,
        /// Axis dimensions (NAXIS1, NAXIS2, ...).
        naxes: Vec<usize>,
    },
    /// Image extension (XTENSION = 'IMAGE').
    Image { bitpix: i64, naxes: Vec<usize> },
    /// ASCII table extension (XTENSION = 'TABLE').
    AsciiTable {
        naxis1: usize,
        naxis2: usize,
        tfields: usize,
    },
    /// Binary table extension (XTENSION = 'BINTABLE').
    BinaryTable {
        /// Row width in bytes.
        naxis1: usize,
        /// Number of rows.
        naxis2: usize,
        /// Size of the heap following the main table, in bytes.
        pcount: usize,
        /// Number of columns.
        tfields: usize,
    },
}

/// A single Header Data Unit located inside a FITS byte stream.
#[derive(Debug, Clone)]
pub struct Hdu {
    /// Parsed metadata describing the HDU type and shape.
    pub info: HduInfo,
    /// Byte offset where the header begins in the FITS stream.
    pub header_start: usize,
    /// Byte offset where the data segment begins.
    pub data_start: usize,
    /// Length of the data segment in bytes (unpadded).
    pub data_len: usize,
    /// All header cards parsed from this HDU.
    pub cards: Vec<Card>,
}

impl Hdu {
    /// EXTNAME of this HDU, if any.
    pub fn extname(&self) -> Option<String> {
        card_string_value(&self.cards, "EXTNAME")
    }

    /// String value of a header keyword.
    pub fn string_value(&self, keyword: &str) -> Option<String> {
        card_string_value(&self.cards, keyword)
    }

    /// Integer value of a header keyword.
    pub fn integer_value(&self, keyword: &str) -> Option<i64> {
        card_integer_value(&self.cards, keyword)
    }

    /// Floating-point value of a header keyword.
    pub fn float_value(&self, keyword: &str) -> Option<f64> {
        card_float_value(&self.cards, keyword)
    }

    /// Returns `true` for binary table extensions.
    pub fn is_binary_table(&self) -> bool {
        matches!(self.info, HduInfo::BinaryTable { .. })
    }

    /// The block-padded header and data bytes of this HDU within `file`,
    /// ready to be appended verbatim to another FITS stream.
    pub fn raw_bytes<'a>(&self, file: &'a [u8]) -> Result<&'a [u8]> {
        let end = self.data_start + padded_byte_len(self.data_len);
        file.get(self.header_start..end).ok_or(Error::UnexpectedEof)
    }
}

/// A collection of HDUs parsed from a complete FITS file.
#[derive(Debug, Clone)]
pub struct FitsData {
    /// All HDUs in the file, with the primary HDU at index 0.
    pub hdus: Vec<Hdu>,
}

impl FitsData {
    /// Returns the primary (first) HDU.
    pub fn primary(&self) -> &Hdu {
        &self.hdus[0]
    }

    /// Returns the HDU at the given index, or `None` if out of bounds.
    pub fn get(&self, index: usize) -> Option<&Hdu> {
        self.hdus.get(index)
    }

    /// Finds the first HDU whose EXTNAME matches `name`.
    ///
    /// The comparison ignores ASCII case, as FITS readers conventionally do.
    pub fn find_by_name(&self, name: &str) -> Option<&Hdu> {
        self.hdus.iter().find(|hdu| {
            hdu.extname()
                .map(|s| s.eq_ignore_ascii_case(name))
                .unwrap_or(false)
        })
    }

    /// Returns the number of HDUs.
    pub fn len(&self) -> usize {
        self.hdus.len()
    }

    /// Returns `true` if the file contains no HDUs.
    pub fn is_empty(&self) -> bool {
        self.hdus.is_empty()
    }

    /// Iterates over all HDUs in order.
    pub fn iter(&self) -> impl Iterator<Item = &Hdu> {
        self.hdus.iter()
    }
}

fn required(cards: &[Card], keyword: &'static str) -> Result<usize> {
    let n = card_integer_value(cards, keyword).ok_or(Error::MissingKeyword(keyword))?;
    usize::try_from(n).map_err(|_| Error::InvalidHeader("negative axis or count"))
}

fn axes(cards: &[Card]) -> Result<Vec<usize>> {
    let naxis = required(cards, "NAXIS")?;
    (1..=naxis)
        .map(|i| {
            let n = card_integer_value(cards, &format!("NAXIS{i}"))
                .ok_or(Error::MissingKeyword("NAXISn"))?;
            usize::try_from(n).map_err(|_| Error::InvalidHeader("negative axis length"))
        })
        .collect()
}

fn bitpix(cards: &[Card]) -> Result<i64> {
    let bitpix = card_integer_value(cards, "BITPIX").ok_or(Error::MissingKeyword("BITPIX"))?;
    match bitpix {
        8 | 16 | 32 | 64 | -32 | -64 => Ok(bitpix),
        _ => Err(Error::InvalidHeader("invalid BITPIX")),
    }
}

fn parse_hdu_info(cards: &[Card], is_primary: bool) -> Result<HduInfo> {
    if is_primary {
        if card_logical_value(cards, "SIMPLE") != Some(true) {
            return Err(Error::InvalidHeader("SIMPLE must be T"));
        }
        return Ok(HduInfo::Primary {
            bitpix: bitpix(cards)?,
            naxes: axes(cards)?,
        });
    }

    let xtension = card_string_value(cards, "XTENSION").ok_or(Error::MissingKeyword("XTENSION"))?;
    match xtension.as_str() {
        "IMAGE" => Ok(HduInfo::Image {
            bitpix: bitpix(cards)?,
            naxes: axes(cards)?,
        }),
        "TABLE" => Ok(HduInfo::AsciiTable {
            naxis1: required(cards, "NAXIS1")?,
            naxis2: required(cards, "NAXIS2")?,
            tfields: required(cards, "TFIELDS")?,
        }),
        "BINTABLE" => Ok(HduInfo::BinaryTable {
            naxis1: required(cards, "NAXIS1")?,
            naxis2: required(cards, "NAXIS2")?,
            pcount: required(cards, "PCOUNT")?,
            tfields: required(cards, "TFIELDS")?,
        }),
        other => Err(Error::UnsupportedExtension(other.to_string())),
    }
}

fn data_byte_len(info: &HduInfo) -> Result<usize> {
    let overflow = Error::InvalidHeader("data size overflow");
    match info {
        HduInfo::Primary { bitpix, naxes } | HduInfo::Image { bitpix, naxes } => {
            if naxes.is_empty() {
                return Ok(0);
            }
            let bytes_per_value = (bitpix.unsigned_abs() / 8) as usize;
            naxes
                .iter()
                .try_fold(bytes_per_value, |acc, &d| acc.checked_mul(d))
                .ok_or(overflow)
        }
        HduInfo::AsciiTable { naxis1, naxis2, .. } => naxis1.checked_mul(*naxis2).ok_or(overflow),
        HduInfo::BinaryTable {
            naxis1,
            naxis2,
            pcount,
            ..
        } => naxis1
            .checked_mul(*naxis2)
            .and_then(|n| n.checked_add(*pcount))
            .ok_or(overflow),
    }
}

/// Parse a complete FITS byte stream into a [`FitsData`] containing all HDUs.
///
/// Trailing bytes after the last complete HDU are ignored, but a header
/// that announces more data than the stream holds is an error.
pub fn parse_fits(data: &[u8]) -> Result<FitsData> {
    if data.len() < BLOCK_SIZE {
        return Err(Error::UnexpectedEof);
    }

    let mut hdus = Vec::new();
    let mut offset: usize = 0;

    while data.len().saturating_sub(offset) >= BLOCK_SIZE {
        let remaining = &data[offset..];
        let is_primary = hdus.is_empty();

        let header_len = match header_byte_len(remaining) {
            Ok(len) => len,
            Err(_) if !is_primary => break,
            Err(e) => return Err(e),
        };
        let cards = parse_header_blocks(&remaining[..header_len])?;

        if is_primary
            && cards
                .first()
                .map(|c| c.keyword_str() != "SIMPLE")
                .unwrap_or(true)
        {
            return Err(Error::InvalidHeader("first HDU must be primary"));
        }

        let info = parse_hdu_info(&cards, is_primary)?;
        let data_len = data_byte_len(&info)?;
        let data_start = offset + header_len;
        let data_end = data_start
            .checked_add(data_len)
            .ok_or(Error::InvalidHeader("data size overflow"))?;

        if data_end > data.len() {
            return Err(Error::UnexpectedEof);
        }

        hdus.push(Hdu {
            info,
            header_start: offset,
            data_start,
            data_len,
            cards,
        });

        offset = data_len
            .checked_next_multiple_of(BLOCK_SIZE)
            .and_then(|padded| data_start.checked_add(padded))
            .ok_or(Error::InvalidHeader("data size overflow"))?;
    }

    Ok(FitsData { hdus })
}
