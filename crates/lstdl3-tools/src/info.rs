//! Human-readable HDU summaries of FITS files.

use lstdl3_fits::bintable::TableLayout;
use lstdl3_fits::header::card_value;
use lstdl3_fits::{FitsFile, Hdu, HduInfo, Value};

fn ext_label(hdu: &Hdu) -> String {
    match hdu.extname() {
        Some(name) => format!(" (EXTNAME: {name})"),
        None => String::new(),
    }
}

fn format_columns(file: &FitsFile, hdu: &Hdu, out: &mut String) {
    let Ok(layout) = TableLayout::of(file.data(), hdu) else {
        out.push_str("  Columns: <unreadable>\n");
        return;
    };
    for (i, col) in layout.columns.iter().enumerate() {
        let unit = col
            .unit
            .as_deref()
            .map(|u| format!(" [{u}]"))
            .unwrap_or_default();
        out.push_str(&format!("    {:>2} {:<12} {}{}\n", i + 1, col.name, col.tform(), unit));
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Logical(b) => String::from(if *b { "T" } else { "F" }),
        Value::Integer(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => s.clone(),
    }
}

const HEADER_KEYS: [&str; 6] = ["HDUCLAS1", "HDUCLAS2", "OBS_ID", "OBJECT", "TSTART", "TSTOP"];

fn format_hdu(file: &FitsFile, index: usize, hdu: &Hdu, verbose: bool) -> String {
    let mut out = String::new();
    match &hdu.info {
        HduInfo::Primary { bitpix, naxes } | HduInfo::Image { bitpix, naxes } => {
            let kind = if index == 0 { "Primary" } else { "IMAGE extension" };
            out.push_str(&format!("HDU {index}: {kind}{}\n", ext_label(hdu)));
            out.push_str(&format!("  BITPIX: {bitpix}\n"));
            out.push_str(&format!("  NAXIS: {}\n", naxes.len()));
            if !naxes.is_empty() {
                out.push_str(&format!("  Dimensions: {naxes:?}\n"));
            }
        }
        HduInfo::AsciiTable {
            naxis2, tfields, ..
        } => {
            out.push_str(&format!("HDU {index}: TABLE extension{}\n", ext_label(hdu)));
            out.push_str(&format!("  Columns: {tfields}\n"));
            out.push_str(&format!("  Rows: {naxis2}\n"));
        }
        HduInfo::BinaryTable {
            naxis1,
            naxis2,
            tfields,
            ..
        } => {
            out.push_str(&format!("HDU {index}: BINTABLE extension{}\n", ext_label(hdu)));
            out.push_str(&format!("  Columns: {tfields}\n"));
            out.push_str(&format!("  Rows: {naxis2}\n"));
            out.push_str(&format!("  Row width: {naxis1} bytes\n"));
            if verbose && *tfields > 0 {
                format_columns(file, hdu, &mut out);
            }
        }
    }
    if verbose {
        for key in HEADER_KEYS {
            if let Some(value) = card_value(&hdu.cards, key) {
                out.push_str(&format!("  {key}: {}\n", value_text(value)));
            }
        }
    }
    out
}

/// Summary of every HDU in `file`; `verbose` adds columns and key headers.
pub fn format_fits_info(file: &FitsFile, verbose: bool) -> String {
    file.hdus()
        .iter()
        .enumerate()
        .map(|(i, hdu)| format_hdu(file, i, hdu, verbose))
        .collect::<Vec<_>>()
        .join("\n")
}
