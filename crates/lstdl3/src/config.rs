//! Run configuration, loaded from a TOML file.
//!
//! Every field has a default matching LST-1, so an empty file (or no file)
//! is a valid configuration.
//!
//! ```toml
//! [observatory]
//! lon_deg = -17.89139
//! lat_deg = 28.76139
//! height_m = 2184.0
//!
//! [dead_time]
//! dead_time_s = 2.6e-5
//! trigger_rate_hz = 2800.0
//!
//! [output]
//! gzip = true
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Geodetic position of the telescope.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct Observatory {
    /// East longitude in degrees.
    pub lon_deg: f64,
    /// Geodetic latitude in degrees.
    pub lat_deg: f64,
    /// Height above sea level in metres.
    pub height_m: f64,
}

impl Default for Observatory {
    fn default() -> Self {
        Observatory {
            lon_deg: -17.89139,
            lat_deg: 28.76139,
            height_m: 2184.0,
        }
    }
}

/// Parameters of the dead-time correction `1 / (1 + dead_time * rate)`.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeadTime {
    /// Per-event dead time of the DRS4 readout, in seconds.
    pub dead_time_s: f64,
    /// Average trigger rate, in Hz.
    pub trigger_rate_hz: f64,
}

impl Default for DeadTime {
    fn default() -> Self {
        DeadTime {
            dead_time_s: 2.6e-5,
            trigger_rate_hz: 2800.0,
        }
    }
}

impl DeadTime {
    /// Dead-time correction factor (DEADC).
    pub fn deadc(&self) -> f64 {
        1.0 / (1.0 + self.dead_time_s * self.trigger_rate_hz)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GadfHeader {
    pub hdudoc: String,
    pub hduvers: String,
    pub hduclass: String,
    /// TELESCOP of the DL3 files.
    pub telescope: String,
    /// INSTRUME of the DL3 files.
    pub instrument: String,
    /// TELESCOP of the index files.
    pub index_telescope: String,
    /// INSTRUME of the index files.
    pub index_instrument: String,
}

impl Default for GadfHeader {
    fn default() -> Self {
        GadfHeader {
            hdudoc: "https://github.com/open-gamma-ray-astro/gamma-astro-data-formats".into(),
            hduvers: "0.2".into(),
            hduclass: "GADF".into(),
            telescope: "CTA".into(),
            instrument: "LST-1".into(),
            index_telescope: "CTA".into(),
            index_instrument: "LST-1".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputOptions {
    /// Write `*.fits.gz` instead of `*.fits` DL3 files.
    pub gzip: bool,
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Dl3Config {
    pub observatory: Observatory,
    pub dead_time: DeadTime,
    pub gadf: GadfHeader,
    pub output: OutputOptions,
}

impl Dl3Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
