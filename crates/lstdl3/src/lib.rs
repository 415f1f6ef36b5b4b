//! LST-1 DL2 to DL3 conversion.
//!
//! Turns reconstructed DL2 event tables into GADF event lists
//! ([`event_list::create_event_list`], [`event_list::write_dl3_file`]) and
//! indexes a directory of DL3 files ([`index::create_obs_hdu_index`]).

pub mod config;
pub mod coords;
pub mod dl2;
pub mod error;
pub mod event_list;
pub mod gadf;
pub mod index;
pub mod irf;
pub mod time;

pub use config::Dl3Config;
pub use coords::SkyCoord;
pub use dl2::Dl2Events;
pub use error::{Dl3Error, Result};
pub use event_list::{create_event_list, dl3_file_name, write_dl3_file, EventList, RunInfo};
pub use index::{create_obs_hdu_index, scan_dir, IndexSummary};
pub use irf::IrfHdus;
