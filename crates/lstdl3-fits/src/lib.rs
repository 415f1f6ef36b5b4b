//! Pure Rust FITS reading and writing for GADF DL3 products.
//!
//! Covers what event lists and index files need: header cards, HDU
//! walking, binary tables, gzip containers and whole-file assembly.

pub mod bintable;
pub mod block;
pub mod error;
pub mod file;
pub mod gzip;
pub mod hdu;
pub mod header;
pub mod primary;
pub mod value;

pub use bintable::{BinaryColumnData, BinaryColumnDescriptor, BinaryColumnType, BinaryTableHdu};
pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use error::{Error, Result};
pub use file::{FitsFile, NewFitsFile};
pub use hdu::{parse_fits, FitsData, Hdu, HduInfo};
pub use header::Card;
pub use value::Value;
