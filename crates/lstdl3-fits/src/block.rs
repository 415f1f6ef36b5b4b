//! FITS logical records.
//!
//! Every header and data unit occupies a whole number of 2880-byte blocks.
//! Headers are padded with ASCII spaces, data with zero bytes.

pub const BLOCK_SIZE: usize = 2880;
pub const CARD_SIZE: usize = 80;
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

pub const HEADER_PAD_BYTE: u8 = b' ';
pub const DATA_PAD_BYTE: u8 = 0;

/// `num_bytes` rounded up to a whole number of blocks.
pub const fn padded_byte_len(num_bytes: usize) -> usize {
    num_bytes.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// Fill `buf` with `pad_byte` up to the next block boundary.
pub fn pad_to_block(buf: &mut Vec<u8>, pad_byte: u8) {
    buf.resize(padded_byte_len(buf.len()), pad_byte);
}
