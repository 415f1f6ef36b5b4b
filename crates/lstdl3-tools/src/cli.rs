//! Command line arguments for `lstdl3`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "lstdl3")]
#[command(version)]
#[command(about = "Produce and index LST-1 DL3 files", long_about = None)]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a DL2 event table into a DL3 event list
    CreateDl3(CreateDl3Args),
    /// Write hdu-index.fits.gz and obs-index.fits.gz for a DL3 directory
    Index(IndexArgs),
    /// Print the HDU layout of a FITS file
    Info(InfoArgs),
}

#[derive(clap::Args, Debug)]
pub struct CreateDl3Args {
    /// DL2 events (.fits, .fits.gz or .csv)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Directory for the DL3 file
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Run number, used as OBS_ID
    #[arg(short, long)]
    pub run: i64,

    /// Name written to OBJECT
    #[arg(long, value_name = "NAME")]
    pub source_name: String,

    /// Source right ascension (ICRS, degrees)
    #[arg(long, value_name = "DEG", allow_negative_numbers = true)]
    pub source_ra: f64,

    /// Source declination (ICRS, degrees)
    #[arg(long, value_name = "DEG", allow_negative_numbers = true)]
    pub source_dec: f64,

    /// Observation mode written to OBS_MODE
    #[arg(long, default_value = "WOBBLE")]
    pub mode: String,

    /// IRF file whose HDUs are appended to the event list
    #[arg(long, value_name = "FILE")]
    pub irf: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write a gzipped .fits.gz file
    #[arg(long)]
    pub gzip: bool,

    /// Replace an existing output file
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(clap::Args, Debug)]
pub struct IndexArgs {
    /// Directory holding the DL3 files
    #[arg(short, long, value_name = "DIR")]
    pub dir: PathBuf,

    /// File name prefix of the DL3 files
    #[arg(short, long, default_value = "dl3")]
    pub prefix: String,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct InfoArgs {
    /// FITS file (.fits or .fits.gz)
    pub file: PathBuf,

    /// Show columns and GADF header keys
    #[arg(short = 'l', long)]
    pub long: bool,
}
