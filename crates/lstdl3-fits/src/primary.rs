//! Primary HDU construction.

use crate::header::Card;

/// Header cards for an empty primary HDU announcing extensions.
///
/// `extra` cards follow the mandatory keywords.
pub fn build_primary_header(extra: &[Card]) -> Vec<Card> {
    let mut cards = vec![
        Card::new("SIMPLE", true).with_comment("conforms to FITS standard"),
        Card::new("BITPIX", 8i64).with_comment("array data type"),
        Card::new("NAXIS", 0i64).with_comment("number of array dimensions"),
        Card::new("EXTEND", true),
    ];
    cards.extend(extra.iter().cloned());
    cards
}
