use core::str;

/// A parsed FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// FITS logical value (`T` or `F`).
    Logical(bool),
    /// FITS integer value.
    Integer(i64),
    /// FITS floating-point value.
    Float(f64),
    /// FITS character string (content between single quotes).
    String(String),
}

impl Value {
    /// Numeric view of the value.
    ///
    /// Integers widen to `f64`, and quoted numbers such as `'40587'` parse as
    /// well since several DL3 producers write reference epochs as strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => parse_float_str(s.trim()),
            Value::Logical(_) => None,
        }
    }

    /// Integer view of the value; floats must be integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String view; only FITS strings qualify.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Logical(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Locate ` /` in `field` and return the trimmed comment after it.
///
/// Real-world writers omit the space after the slash, so ` /` alone is
/// accepted as the separator.
fn comment_after(field: &[u8]) -> (usize, Option<&str>) {
    let len = field.len();
    let mut i = 0;
    while i + 1 < len {
        if field[i] == b' ' && field[i + 1] == b'/' {
            let mut comment_start = i + 2;
            if comment_start < len && field[comment_start] == b' ' {
                comment_start += 1;
            }
            let comment = str::from_utf8(&field[comment_start..])
                .ok()
                .map(|s| s.trim_end())
                .filter(|s| !s.is_empty());
            return (i, comment);
        }
        i += 1;
    }
    (len, None)
}

/// Parse a quoted FITS string starting at `field[0] == '\''`.
fn parse_string(field: &[u8]) -> Option<(Value, Option<&str>)> {
    let mut value = String::new();
    let mut i = 1;
    let len = field.len();

    while i < len {
        if field[i] == b'\'' {
            if i + 1 < len && field[i + 1] == b'\'' {
                value.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            break;
        }
        value.push(field[i] as char);
        i += 1;
    }

    let trimmed = value.trim_end().to_string();
    let (_, comment) = comment_after(&field[i..]);
    Some((Value::String(trimmed), comment))
}

/// Parse a float string, handling FITS `D` exponent notation.
fn parse_float_str(s: &str) -> Option<f64> {
    let normalized = s.replace(['D', 'd'], "E");
    normalized.parse::<f64>().ok()
}

/// Parse a FITS header value from the 70-byte value portion of an 80-byte
/// card (bytes 10..80).
///
/// Returns the parsed [`Value`] and an optional comment string, or `None`
/// when the field holds no value (an undefined keyword).
pub fn parse_value(value_bytes: &[u8]) -> Option<(Value, Option<&str>)> {
    let first = value_bytes.iter().position(|&b| b != b' ')?;
    if value_bytes[first] == b'\'' {
        return parse_string(&value_bytes[first..]);
    }

    let (end, comment) = comment_after(value_bytes);
    let text = str::from_utf8(&value_bytes[..end]).ok()?.trim();
    if text.is_empty() {
        return None;
    }

    match text {
        "T" => return Some((Value::Logical(true), comment)),
        "F" => return Some((Value::Logical(false), comment)),
        _ => {}
    }

    if !text.contains(['.', 'E', 'e', 'D', 'd']) {
        if let Ok(n) = text.parse::<i64>() {
            return Some((Value::Integer(n), comment));
        }
    }

    parse_float_str(text).map(|f| (Value::Float(f), comment))
}

/// Serialize a [`Value`] into a 70-byte field suitable for bytes 10..80 of an
/// 80-byte FITS card.
///
/// Numeric and logical values are right-justified in the first 20 bytes
/// (columns 11-30 of the card).  String values start at byte 0 with a single
/// quote.
pub fn format_value(value: &Value) -> [u8; 70] {
    let mut buf = [b' '; 70];

    match value {
        Value::Logical(b) => {
            buf[19] = if *b { b'T' } else { b'F' };
        }
        Value::Integer(n) => {
            right_justify(n.to_string().as_bytes(), &mut buf[..20]);
        }
        Value::Float(f) => {
            right_justify(format_float(*f).as_bytes(), &mut buf[..20]);
        }
        Value::String(s) => write_string(s, &mut buf),
    }

    buf
}

fn right_justify(src: &[u8], dest: &mut [u8]) {
    let len = src.len().min(dest.len());
    let start = dest.len() - len;
    dest[start..].copy_from_slice(&src[..len]);
}

/// Shortest representation that round-trips, always carrying a decimal
/// point, falling back to reduced-precision scientific notation when it
/// exceeds the 20-column fixed-format field.
fn format_float(f: f64) -> String {
    if f == 0.0 {
        return String::from("0.0");
    }
    let mut s = format!("{f:?}").replace('e', "E");
    if !s.contains('.') {
        match s.find('E') {
            Some(pos) => s.insert_str(pos, ".0"),
            None => s.push_str(".0"),
        }
    }
    if s.len() <= 20 {
        return s;
    }
    let mut precision = 15usize;
    loop {
        let s = format!("{:.prec$E}", f, prec = precision);
        if s.len() <= 20 || precision == 0 {
            return s;
        }
        precision -= 1;
    }
}

fn write_string(s: &str, buf: &mut [u8; 70]) {
    let mut pos = 0;
    buf[pos] = b'\'';
    pos += 1;

    for ch in s.bytes() {
        if ch == b'\'' {
            if pos + 2 >= 70 {
                break;
            }
            buf[pos] = b'\'';
            buf[pos + 1] = b'\'';
            pos += 2;
        } else {
            if pos + 1 >= 70 {
                break;
            }
            buf[pos] = ch;
            pos += 1;
        }
    }

    // Strings occupy at least 8 characters between the quotes.
    pos = pos.max(9);
    buf[pos] = b'\'';
}
