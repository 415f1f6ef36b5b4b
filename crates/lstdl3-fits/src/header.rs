//! FITS header card parsing, writing, and typed keyword lookup.

use core::str;

use crate::block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE, HEADER_PAD_BYTE};
use crate::error::{Error, Result};
use crate::value::{format_value, parse_value, Value};

// ── Types ──

/// A parsed FITS header card (one 80-byte keyword record).
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// The 8-byte keyword name, ASCII, left-justified, space-padded.
    pub keyword: [u8; 8],
    /// The parsed value, if this card has a value indicator (`= ` in bytes 8..10).
    pub value: Option<Value>,
    /// An optional comment string.
    pub comment: Option<String>,
}

impl Card {
    /// Build a valued card. Keywords longer than 8 bytes are truncated.
    pub fn new(keyword: &str, value: impl Into<Value>) -> Self {
        Card {
            keyword: make_keyword(keyword),
            value: Some(value.into()),
            comment: None,
        }
    }

    /// Attach a ` / comment` to the card.
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Return the keyword as a trimmed UTF-8 string.
    pub fn keyword_str(&self) -> &str {
        let end = self
            .keyword
            .iter()
            .rposition(|&b| b != b' ')
            .map(|i| i + 1)
            .unwrap_or(0);
        str::from_utf8(&self.keyword[..end]).unwrap_or("")
    }

    /// Returns `true` if this card is the END keyword.
    pub fn is_end(&self) -> bool {
        &self.keyword == b"END     "
    }

    /// Returns `true` if this is a blank card (keyword is all spaces).
    pub fn is_blank(&self) -> bool {
        self.keyword.iter().all(|&b| b == b' ')
    }

    /// Returns `true` for COMMENT, HISTORY and blank keywords.
    pub fn is_commentary(&self) -> bool {
        is_commentary_keyword(&self.keyword)
    }
}

/// Pad a keyword name to 8 bytes with trailing ASCII spaces.
pub fn make_keyword(name: &str) -> [u8; 8] {
    let mut k = [b' '; 8];
    let bytes = name.as_bytes();
    let len = bytes.len().min(8);
    k[..len].copy_from_slice(&bytes[..len]);
    k
}

// ── Parsing ──

const COMMENTARY_KEYWORDS: [&[u8; 8]; 3] = [b"COMMENT ", b"HISTORY ", b"        "];

fn is_commentary_keyword(keyword: &[u8; 8]) -> bool {
    COMMENTARY_KEYWORDS.contains(&keyword)
}

fn free_text(bytes: &[u8]) -> Result<Option<String>> {
    let text = str::from_utf8(bytes)
        .map_err(|_| Error::InvalidHeader("card is not ASCII"))?
        .trim_end();
    Ok((!text.is_empty()).then(|| text.to_string()))
}

/// Parse a single 80-byte FITS header card.
pub fn parse_card(card_bytes: &[u8; CARD_SIZE]) -> Result<Card> {
    let mut keyword = [b' '; 8];
    keyword.copy_from_slice(&card_bytes[..8]);

    if !keyword
        .iter()
        .all(|b| matches!(b, b'A'..=b'Z' | b'0'..=b'9' | b' ' | b'-' | b'_'))
    {
        return Err(Error::InvalidKeyword);
    }

    if &keyword == b"END     " {
        return Ok(Card {
            keyword,
            value: None,
            comment: None,
        });
    }

    let has_value = card_bytes[8] == b'=' && card_bytes[9] == b' ';
    if is_commentary_keyword(&keyword) || !has_value {
        return Ok(Card {
            keyword,
            value: None,
            comment: free_text(&card_bytes[8..])?,
        });
    }

    let value_field = &card_bytes[10..];
    match parse_value(value_field) {
        Some((val, comment)) => Ok(Card {
            keyword,
            value: Some(val),
            comment: comment.map(String::from),
        }),
        None => {
            let field = str::from_utf8(value_field)
                .map_err(|_| Error::InvalidHeader("card is not ASCII"))?;
            let comment = field
                .find('/')
                .map(|idx| field[idx + 1..].trim().to_string())
                .filter(|c| !c.is_empty());
            Ok(Card {
                keyword,
                value: None,
                comment,
            })
        }
    }
}

/// Parse consecutive 2880-byte header blocks until the END card is found.
///
/// The returned cards include the END card.
pub fn parse_header_blocks(data: &[u8]) -> Result<Vec<Card>> {
    let mut cards = Vec::new();
    for chunk in data.chunks_exact(CARD_SIZE).take(header_card_limit(data)) {
        let card_bytes: &[u8; CARD_SIZE] = chunk
            .try_into()
            .map_err(|_| Error::InvalidHeader("short card"))?;
        let card = parse_card(card_bytes)?;
        let is_end = card.is_end();
        cards.push(card);
        if is_end {
            return Ok(cards);
        }
    }
    Err(Error::UnexpectedEof)
}

/// Only complete blocks are scanned for cards.
fn header_card_limit(data: &[u8]) -> usize {
    (data.len() / BLOCK_SIZE) * CARDS_PER_BLOCK
}

/// Return the number of bytes consumed by the header (always a multiple of BLOCK_SIZE).
pub fn header_byte_len(data: &[u8]) -> Result<usize> {
    data.chunks_exact(CARD_SIZE)
        .take(header_card_limit(data))
        .position(|card| &card[..8] == b"END     ")
        .map(|idx| (idx / CARDS_PER_BLOCK + 1) * BLOCK_SIZE)
        .ok_or(Error::UnexpectedEof)
}

// ── Writing ──

/// Serialize a [`Card`] into an 80-byte FITS card image.
pub fn format_card(card: &Card) -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    buf[..8].copy_from_slice(&card.keyword);

    match (&card.value, &card.comment) {
        (Some(value), comment) => {
            buf[8] = b'=';
            buf[9] = b' ';
            let mut field = format_value(value);
            if let Some(comment) = comment {
                insert_comment(&mut field, comment);
            }
            buf[10..].copy_from_slice(&field);
        }
        (None, Some(comment)) if !card.is_blank() => {
            let bytes = comment.as_bytes();
            let len = bytes.len().min(72);
            buf[8..8 + len].copy_from_slice(&bytes[..len]);
        }
        _ => {}
    }

    buf
}

/// Insert a ` / comment` string into a 70-byte value field.
fn insert_comment(field: &mut [u8; 70], comment: &str) {
    let content_end = if field[0] == b'\'' {
        let mut i = 1;
        while i < 70 {
            if field[i] == b'\'' {
                if i + 1 < 70 && field[i + 1] == b'\'' {
                    i += 2;
                    continue;
                }
                i += 1;
                break;
            }
            i += 1;
        }
        i
    } else {
        20
    };

    let sep_start = content_end + 1;
    if sep_start + 3 >= 70 {
        return;
    }

    field[sep_start] = b'/';
    field[sep_start + 1] = b' ';

    let comment_start = sep_start + 2;
    let bytes = comment.as_bytes();
    let len = bytes.len().min(70 - comment_start);
    field[comment_start..comment_start + len].copy_from_slice(&bytes[..len]);
}

/// Longest string value that fits between the quotes of a fixed-format card.
pub const MAX_STRING_LEN: usize = 68;

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7e).contains(&b))
}

/// Check that `card` can be written without losing or mangling its value.
///
/// Non-finite floats, non-ASCII text and strings too long for the value
/// field are rejected.
pub fn check_card(card: &Card) -> Result<()> {
    let reject = |reason| {
        Err(Error::CardValue {
            keyword: card.keyword_str().to_string(),
            reason,
        })
    };
    match &card.value {
        Some(Value::Float(f)) if !f.is_finite() => return reject("float is not finite"),
        Some(Value::String(s)) if !is_printable_ascii(s) => {
            return reject("string is not printable ASCII")
        }
        Some(Value::String(s)) if s.len() + s.matches('\'').count() > MAX_STRING_LEN => {
            return reject("string does not fit in one card")
        }
        _ => {}
    }
    if card.comment.as_deref().is_some_and(|c| !is_printable_ascii(c)) {
        return reject("comment is not printable ASCII");
    }
    Ok(())
}

/// Serialize a sequence of header cards into complete FITS header blocks.
///
/// Appends the END card and pads the final block with blank cards.
/// The returned length is always a multiple of [`BLOCK_SIZE`].
pub fn serialize_header(cards: &[Card]) -> Vec<u8> {
    let mut buf = Vec::with_capacity((cards.len() + 1) * CARD_SIZE);
    for card in cards.iter().filter(|c| !c.is_end()) {
        buf.extend_from_slice(&format_card(card));
    }
    let mut end = [b' '; CARD_SIZE];
    end[..3].copy_from_slice(b"END");
    buf.extend_from_slice(&end);
    crate::block::pad_to_block(&mut buf, HEADER_PAD_BYTE);
    buf
}

// ── Lookup ──

/// Find the first card with the given keyword.
pub fn find_card<'a>(cards: &'a [Card], keyword: &str) -> Option<&'a Card> {
    cards.iter().find(|c| c.keyword_str() == keyword)
}

/// Find the value of the first card with the given keyword.
pub fn card_value<'a>(cards: &'a [Card], keyword: &str) -> Option<&'a Value> {
    find_card(cards, keyword).and_then(|c| c.value.as_ref())
}

/// String value of `keyword`, trimmed.
pub fn card_string_value(cards: &[Card], keyword: &str) -> Option<String> {
    card_value(cards, keyword)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
}

/// Integer value of `keyword` (integral floats and numeric strings accepted).
pub fn card_integer_value(cards: &[Card], keyword: &str) -> Option<i64> {
    card_value(cards, keyword).and_then(Value::as_i64)
}

/// Floating-point value of `keyword` (integers and numeric strings accepted).
pub fn card_float_value(cards: &[Card], keyword: &str) -> Option<f64> {
    card_value(cards, keyword).and_then(Value::as_f64)
}

/// Logical value of `keyword`.
pub fn card_logical_value(cards: &[Card], keyword: &str) -> Option<bool> {
    match card_value(cards, keyword) {
        Some(Value::Logical(b)) => Some(*b),
        _ => None,
    }
}

// ── Tests ──
