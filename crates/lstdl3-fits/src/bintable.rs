//! FITS binary table extension reading and writing.

use crate::block::{pad_to_block, DATA_PAD_BYTE};
use crate::error::{Error, Result};
use crate::hdu::{Hdu, HduInfo};
use crate::header::{card_string_value, check_card, serialize_header, Card};

/// The data type of a column in a FITS binary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryColumnType {
    /// L -- logical, stored as a single byte (T/F).
    Logical,
    /// I -- 16-bit signed integer.
    Short,
    /// J -- 32-bit signed integer.
    Int,
    /// K -- 64-bit signed integer.
    Long,
    /// E -- 32-bit IEEE float.
    Float,
    /// D -- 64-bit IEEE float.
    Double,
    /// A -- ASCII character.
    Ascii,
    /// B -- unsigned byte.
    Byte,
    /// X -- bit array, packed eight to a byte. Not decoded.
    Bit,
    /// C, M, P or Q -- complex values and heap array descriptors. Their
    /// cells are stepped over, never decoded.
    Opaque { code: u8, size: usize },
}

impl BinaryColumnType {
    /// Number of bytes per single element.
    pub fn byte_size(self) -> usize {
        match self {
            BinaryColumnType::Logical
            | BinaryColumnType::Ascii
            | BinaryColumnType::Byte
            | BinaryColumnType::Bit => 1,
            BinaryColumnType::Short => 2,
            BinaryColumnType::Int | BinaryColumnType::Float => 4,
            BinaryColumnType::Long | BinaryColumnType::Double => 8,
            BinaryColumnType::Opaque { size, .. } => size,
        }
    }

    fn code(self) -> char {
        match self {
            BinaryColumnType::Logical => 'L',
            BinaryColumnType::Short => 'I',
            BinaryColumnType::Int => 'J',
            BinaryColumnType::Long => 'K',
            BinaryColumnType::Float => 'E',
            BinaryColumnType::Double => 'D',
            BinaryColumnType::Ascii => 'A',
            BinaryColumnType::Byte => 'B',
            BinaryColumnType::Bit => 'X',
            BinaryColumnType::Opaque { code, .. } => code as char,
        }
    }
}

/// Describes one column in a binary table.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryColumnDescriptor {
    /// Column name (TTYPEn).
    pub name: String,
    /// Repeat count from TFORMn. For `A` columns this is the string width.
    pub repeat: usize,
    /// The element data type.
    pub col_type: BinaryColumnType,
    /// Physical unit (TUNITn), if any.
    pub unit: Option<String>,
}

impl BinaryColumnDescriptor {
    pub fn new(name: &str, repeat: usize, col_type: BinaryColumnType) -> Self {
        BinaryColumnDescriptor {
            name: name.to_string(),
            repeat,
            col_type,
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    /// Total bytes this column occupies per row.
    pub fn byte_width(&self) -> usize {
        match self.col_type {
            BinaryColumnType::Bit => self.repeat.div_ceil(8),
            other => self.repeat * other.byte_size(),
        }
    }

    /// The TFORMn value, e.g. `1K` or `20A`.
    pub fn tform(&self) -> String {
        format!("{}{}", self.repeat, self.col_type.code())
    }

    /// Number of values one row contributes to [`BinaryColumnData`].
    fn values_per_row(&self) -> usize {
        match self.col_type {
            BinaryColumnType::Ascii => 1,
            _ => self.repeat,
        }
    }
}

/// Column data extracted from or destined for a binary table.
#[derive(Debug, Clone, PartialEq)]
pub enum BinaryColumnData {
    Logical(Vec<bool>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Ascii(Vec<String>),
    Byte(Vec<u8>),
}

impl BinaryColumnData {
    /// Number of stored values.
    pub fn len(&self) -> usize {
        match self {
            BinaryColumnData::Logical(v) => v.len(),
            BinaryColumnData::Short(v) => v.len(),
            BinaryColumnData::Int(v) => v.len(),
            BinaryColumnData::Long(v) => v.len(),
            BinaryColumnData::Float(v) => v.len(),
            BinaryColumnData::Double(v) => v.len(),
            BinaryColumnData::Ascii(v) => v.len(),
            BinaryColumnData::Byte(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widen any numeric column to `f64`.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            BinaryColumnData::Byte(v) => Some(v.iter().map(|&x| x as f64).collect()),
            BinaryColumnData::Short(v) => Some(v.iter().map(|&x| x as f64).collect()),
            BinaryColumnData::Int(v) => Some(v.iter().map(|&x| x as f64).collect()),
            BinaryColumnData::Long(v) => Some(v.iter().map(|&x| x as f64).collect()),
            BinaryColumnData::Float(v) => Some(v.iter().map(|&x| x as f64).collect()),
            BinaryColumnData::Double(v) => Some(v.clone()),
            BinaryColumnData::Logical(_) | BinaryColumnData::Ascii(_) => None,
        }
    }

    /// Widen any integer column to `i64`.
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        match self {
            BinaryColumnData::Byte(v) => Some(v.iter().map(|&x| x as i64).collect()),
            BinaryColumnData::Short(v) => Some(v.iter().map(|&x| x as i64).collect()),
            BinaryColumnData::Int(v) => Some(v.iter().map(|&x| x as i64).collect()),
            BinaryColumnData::Long(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Parse a TFORMn value like "1J", "10E", "20A" or "1PE(100)".
///
/// Returns the repeat count and the column type.
pub fn parse_tform_binary(s: &str) -> Result<(usize, BinaryColumnType)> {
    let s = s.trim();
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    let repeat = if digits == 0 {
        1
    } else {
        s[..digits].parse::<usize>().map_err(|_| Error::InvalidValue)?
    };
    let type_char = *s.as_bytes().get(digits).ok_or(Error::InvalidValue)?;
    let suffix = &s[digits + 1..];

    let col_type = match type_char {
        b'L' => BinaryColumnType::Logical,
        b'B' => BinaryColumnType::Byte,
        b'I' => BinaryColumnType::Short,
        b'J' => BinaryColumnType::Int,
        b'K' => BinaryColumnType::Long,
        b'E' => BinaryColumnType::Float,
        b'D' => BinaryColumnType::Double,
        b'A' => BinaryColumnType::Ascii,
        b'X' => BinaryColumnType::Bit,
        b'C' | b'P' => BinaryColumnType::Opaque {
            code: type_char,
            size: 8,
        },
        b'M' | b'Q' => BinaryColumnType::Opaque {
            code: type_char,
            size: 16,
        },
        _ => return Err(Error::InvalidValue),
    };
    // Only heap descriptors carry an element type and maximum length.
    if !suffix.is_empty() && !matches!(type_char, b'P' | b'Q') {
        return Err(Error::InvalidValue);
    }

    Ok((repeat, col_type))
}

/// Extract binary table column descriptors from header cards.
///
/// Unnamed columns get the name `COLn`.
pub fn parse_binary_table_columns(
    cards: &[Card],
    tfields: usize,
) -> Result<Vec<BinaryColumnDescriptor>> {
    (1..=tfields)
        .map(|i| {
            let tform = card_string_value(cards, &format!("TFORM{i}"))
                .ok_or(Error::MissingKeyword("TFORMn"))?;
            let (repeat, col_type) = parse_tform_binary(&tform)?;
            let name =
                card_string_value(cards, &format!("TTYPE{i}")).unwrap_or_else(|| format!("COL{i}"));
            let unit = card_string_value(cards, &format!("TUNIT{i}")).filter(|u| !u.is_empty());
            Ok(BinaryColumnDescriptor {
                name,
                repeat,
                col_type,
                unit,
            })
        })
        .collect()
}

/// The columns and row layout of a binary table HDU.
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub naxis1: usize,
    pub naxis2: usize,
    pub columns: Vec<BinaryColumnDescriptor>,
}

impl TableLayout {
    /// Read the layout of `hdu`, checking that its rows fit in `fits_data`.
    pub fn of(fits_data: &[u8], hdu: &Hdu) -> Result<Self> {
        let (naxis1, naxis2, tfields) = match &hdu.info {
            HduInfo::BinaryTable {
                naxis1,
                naxis2,
                tfields,
                ..
            } => (*naxis1, *naxis2, *tfields),
            _ => return Err(Error::InvalidHeader("HDU is not a binary table")),
        };

        let end = naxis1
            .checked_mul(naxis2)
            .and_then(|n| n.checked_add(hdu.data_start))
            .ok_or(Error::InvalidHeader("data size overflow"))?;
        if end > fits_data.len() {
            return Err(Error::UnexpectedEof);
        }

        let columns = parse_binary_table_columns(&hdu.cards, tfields)?;
        let row_width: usize = columns.iter().map(|c| c.byte_width()).sum();
        if row_width > naxis1 {
            return Err(Error::InvalidHeader("columns wider than NAXIS1"));
        }

        Ok(TableLayout {
            naxis1,
            naxis2,
            columns,
        })
    }

    /// Index of the column named `name` (ASCII case-insensitive).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn column_offset(&self, col_index: usize) -> usize {
        self.columns[..col_index]
            .iter()
            .map(|c| c.byte_width())
            .sum()
    }
}

/// Read a single column from all rows of a binary table HDU.
pub fn read_binary_column(
    fits_data: &[u8],
    hdu: &Hdu,
    col_index: usize,
) -> Result<BinaryColumnData> {
    let layout = TableLayout::of(fits_data, hdu)?;
    let col = layout.columns.get(col_index).ok_or(Error::InvalidValue)?;
    let offset = layout.column_offset(col_index);
    read_column_cells(fits_data, hdu.data_start, &layout, col, offset)
}

/// Read a column by its TTYPE name.
pub fn read_binary_column_by_name(
    fits_data: &[u8],
    hdu: &Hdu,
    name: &str,
) -> Result<BinaryColumnData> {
    let layout = TableLayout::of(fits_data, hdu)?;
    let idx = layout
        .column_index(name)
        .ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;
    let offset = layout.column_offset(idx);
    read_column_cells(fits_data, hdu.data_start, &layout, &layout.columns[idx], offset)
}

fn read_column_cells(
    fits_data: &[u8],
    data_start: usize,
    layout: &TableLayout,
    col: &BinaryColumnDescriptor,
    col_offset: usize,
) -> Result<BinaryColumnData> {
    let size = col.col_type.byte_size();
    let cells = (0..layout.naxis2).map(move |row| {
        let base = data_start + row * layout.naxis1 + col_offset;
        &fits_data[base..base + col.byte_width()]
    });

    fn elements<'a, T>(
        cells: impl Iterator<Item = &'a [u8]>,
        size: usize,
        decode: impl Fn(&[u8]) -> T,
    ) -> Vec<T> {
        cells
            .flat_map(|cell| cell.chunks_exact(size).map(&decode).collect::<Vec<_>>())
            .collect()
    }

    let data = match col.col_type {
        BinaryColumnType::Logical => {
            BinaryColumnData::Logical(elements(cells, size, |b| b[0] == b'T'))
        }
        BinaryColumnType::Short => BinaryColumnData::Short(elements(cells, size, |b| {
            i16::from_be_bytes([b[0], b[1]])
        })),
        BinaryColumnType::Int => BinaryColumnData::Int(elements(cells, size, |b| {
            i32::from_be_bytes([b[0], b[1], b[2], b[3]])
        })),
        BinaryColumnType::Long => BinaryColumnData::Long(elements(cells, size, |b| {
            i64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        })),
        BinaryColumnType::Float => BinaryColumnData::Float(elements(cells, size, |b| {
            f32::from_be_bytes([b[0], b[1], b[2], b[3]])
        })),
        BinaryColumnType::Double => BinaryColumnData::Double(elements(cells, size, |b| {
            f64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        })),
        BinaryColumnType::Byte => BinaryColumnData::Byte(elements(cells, size, |b| b[0])),
        BinaryColumnType::Bit | BinaryColumnType::Opaque { .. } => {
            return Err(Error::UnsupportedColumn(col.name.clone()))
        }
        BinaryColumnType::Ascii => {
            let values = cells
                .map(|cell| {
                    let end = cell.iter().position(|&b| b == 0).unwrap_or(cell.len());
                    core::str::from_utf8(&cell[..end])
                        .map(|s| s.trim_end().to_string())
                        .map_err(|_| Error::InvalidValue)
                })
                .collect::<Result<Vec<_>>>()?;
            BinaryColumnData::Ascii(values)
        }
    };
    Ok(data)
}

/// Longest prefix of `s` that fits in `width` bytes without splitting a
/// character.
pub fn truncate_str(s: &str, width: usize) -> &str {
    if s.len() <= width {
        return s;
    }
    let mut end = width;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Append the big-endian bytes of one cell (one column, one row) to `out`.
fn serialize_cell(
    col: &BinaryColumnDescriptor,
    data: &BinaryColumnData,
    row: usize,
    out: &mut Vec<u8>,
) -> Result<()> {
    let start = row * col.repeat;
    let range = start..start + col.repeat;
    match (col.col_type, data) {
        (BinaryColumnType::Logical, BinaryColumnData::Logical(vals)) => {
            out.extend(vals[range].iter().map(|&b| if b { b'T' } else { b'F' }));
        }
        (BinaryColumnType::Short, BinaryColumnData::Short(vals)) => {
            vals[range].iter().for_each(|v| out.extend(v.to_be_bytes()));
        }
        (BinaryColumnType::Int, BinaryColumnData::Int(vals)) => {
            vals[range].iter().for_each(|v| out.extend(v.to_be_bytes()));
        }
        (BinaryColumnType::Long, BinaryColumnData::Long(vals)) => {
            vals[range].iter().for_each(|v| out.extend(v.to_be_bytes()));
        }
        (BinaryColumnType::Float, BinaryColumnData::Float(vals)) => {
            vals[range].iter().for_each(|v| out.extend(v.to_be_bytes()));
        }
        (BinaryColumnType::Double, BinaryColumnData::Double(vals)) => {
            vals[range].iter().for_each(|v| out.extend(v.to_be_bytes()));
        }
        (BinaryColumnType::Byte, BinaryColumnData::Byte(vals)) => {
            out.extend_from_slice(&vals[range]);
        }
        (BinaryColumnType::Ascii, BinaryColumnData::Ascii(vals)) => {
            let s = truncate_str(&vals[row], col.repeat);
            out.extend_from_slice(s.as_bytes());
            out.resize(out.len() + col.repeat - s.len(), b' ');
        }
        _ => return Err(Error::ColumnType(col.name.clone())),
    }
    Ok(())
}

/// A binary table extension under construction.
#[derive(Debug, Clone, Default)]
pub struct BinaryTableHdu {
    extname: String,
    columns: Vec<(BinaryColumnDescriptor, BinaryColumnData)>,
    cards: Vec<Card>,
}

impl BinaryTableHdu {
    pub fn new(extname: &str) -> Self {
        BinaryTableHdu {
            extname: extname.to_string(),
            ..Default::default()
        }
    }

    pub fn extname(&self) -> &str {
        &self.extname
    }

    /// Append a column; row counts are checked when serializing.
    pub fn column(mut self, desc: BinaryColumnDescriptor, data: BinaryColumnData) -> Self {
        self.columns.push((desc, data));
        self
    }

    /// Append a header card after the structural keywords.
    pub fn card(mut self, card: Card) -> Self {
        self.cards.push(card);
        self
    }

    /// Append several header cards.
    pub fn cards(mut self, cards: impl IntoIterator<Item = Card>) -> Self {
        self.cards.extend(cards);
        self
    }

    pub fn header_cards(&self) -> &[Card] {
        &self.cards
    }

    /// Number of rows, taken from the first column.
    pub fn num_rows(&self) -> usize {
        self.columns
            .first()
            .map(|(desc, data)| data.len() / desc.values_per_row().max(1))
            .unwrap_or(0)
    }

    fn check_lengths(&self) -> Result<usize> {
        let rows = self.num_rows();
        for (desc, data) in &self.columns {
            let expected = rows * desc.values_per_row();
            if data.len() != expected {
                return Err(Error::ColumnLength {
                    column: desc.name.clone(),
                    expected: rows,
                    found: data.len() / desc.values_per_row().max(1),
                });
            }
        }
        Ok(rows)
    }

    /// All header cards for this table: mandatory keywords, column
    /// definitions, EXTNAME, then the user cards.
    pub fn build_cards(&self) -> Result<Vec<Card>> {
        let naxis2 = self.check_lengths()?;
        let naxis1: usize = self.columns.iter().map(|(d, _)| d.byte_width()).sum();

        let mut cards = vec![
            Card::new("XTENSION", "BINTABLE").with_comment("binary table extension"),
            Card::new("BITPIX", 8i64).with_comment("array data type"),
            Card::new("NAXIS", 2i64).with_comment("number of array dimensions"),
            Card::new("NAXIS1", naxis1 as i64).with_comment("length of dimension 1"),
            Card::new("NAXIS2", naxis2 as i64).with_comment("length of dimension 2"),
            Card::new("PCOUNT", 0i64).with_comment("number of group parameters"),
            Card::new("GCOUNT", 1i64).with_comment("number of groups"),
            Card::new("TFIELDS", self.columns.len() as i64)
                .with_comment("number of table fields"),
        ];

        for (i, (desc, _)) in self.columns.iter().enumerate() {
            let n = i + 1;
            cards.push(Card::new(&format!("TTYPE{n}"), desc.name.as_str()));
            cards.push(Card::new(&format!("TFORM{n}"), desc.tform()));
            if let Some(unit) = &desc.unit {
                cards.push(Card::new(&format!("TUNIT{n}"), unit.as_str()));
            }
        }

        cards.push(Card::new("EXTNAME", self.extname.as_str()).with_comment("extension name"));
        cards.extend(self.cards.iter().cloned());
        cards.iter().try_for_each(check_card)?;
        Ok(cards)
    }

    /// Serialize the table rows, padded to a multiple of 2880 bytes.
    pub fn serialize_data(&self) -> Result<Vec<u8>> {
        let naxis2 = self.check_lengths()?;
        let naxis1: usize = self.columns.iter().map(|(d, _)| d.byte_width()).sum();
        let mut buf = Vec::with_capacity(naxis1 * naxis2);
        for row in 0..naxis2 {
            for (desc, data) in &self.columns {
                serialize_cell(desc, data, row, &mut buf)?;
            }
        }
        pad_to_block(&mut buf, DATA_PAD_BYTE);
        Ok(buf)
    }

    /// Header and data bytes, each padded to block boundaries.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = serialize_header(&self.build_cards()?);
        out.extend(self.serialize_data()?);
        Ok(out)
    }
}
