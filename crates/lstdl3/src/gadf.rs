//! Gamma Astro Data Format names: header keywords shared by every HDU,
//! extension names and the HDU classes listed in the HDU index.

use lstdl3_fits::Card;

use crate::config::GadfHeader;

pub const EVENTS: &str = "EVENTS";
pub const GTI: &str = "GTI";
pub const POINTING: &str = "POINTING";
pub const EFFECTIVE_AREA: &str = "EFFECTIVE AREA";
pub const ENERGY_DISPERSION: &str = "ENERGY DISPERSION";
pub const BACKGROUND: &str = "BACKGROUND";
pub const PSF: &str = "PSF";
pub const RAD_MAX: &str = "RAD_MAX";
pub const HDU_INDEX: &str = "HDU INDEX";
pub const OBS_INDEX: &str = "OBS INDEX";

pub const HDU_INDEX_FILE: &str = "hdu-index.fits.gz";
pub const OBS_INDEX_FILE: &str = "obs-index.fits.gz";

/// IRF extensions copied into DL3 files, in output order.
pub const IRF_HDUS: [&str; 5] = [EFFECTIVE_AREA, ENERGY_DISPERSION, BACKGROUND, PSF, RAD_MAX];

/// `HDUDOC`, `HDUVERS` and `HDUCLASS` cards.
pub fn default_header(gadf: &GadfHeader) -> Vec<Card> {
    vec![
        Card::new("HDUDOC", gadf.hdudoc.as_str()),
        Card::new("HDUVERS", gadf.hduvers.as_str()),
        Card::new("HDUCLASS", gadf.hduclass.as_str()),
    ]
}

/// One row of the HDU index, without the file location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HduClass {
    pub hdu_type: &'static str,
    pub hdu_class: &'static str,
    pub hdu_class2: &'static str,
    pub hdu_class3: &'static str,
    pub hdu_class4: &'static str,
    /// EXTNAME of the HDU.
    pub hdu_name: &'static str,
}

impl HduClass {
    const fn plain(name: &'static str, extname: &'static str) -> Self {
        HduClass {
            hdu_type: name,
            hdu_class: name,
            hdu_class2: "",
            hdu_class3: "",
            hdu_class4: "",
            hdu_name: extname,
        }
    }

    const fn irf(
        hdu_type: &'static str,
        hdu_class: &'static str,
        class2: &'static str,
        class4: &'static str,
        extname: &'static str,
    ) -> Self {
        HduClass {
            hdu_type,
            hdu_class,
            hdu_class2: class2,
            hdu_class3: "POINT-LIKE",
            hdu_class4: class4,
            hdu_name: extname,
        }
    }
}

pub const EVENTS_CLASS: HduClass = HduClass::plain("events", EVENTS);
pub const GTI_CLASS: HduClass = HduClass::plain("gti", GTI);
pub const POINTING_CLASS: HduClass = HduClass::plain("pointing", POINTING);
pub const EDISP_CLASS: HduClass =
    HduClass::irf("edisp", "edisp_2d", "EDISP", "EDISP_2D", ENERGY_DISPERSION);
pub const AEFF_CLASS: HduClass =
    HduClass::irf("aeff", "aeff_2d", "AEFF", "AEFF_2D", EFFECTIVE_AREA);
pub const BKG_CLASS: HduClass = HduClass::irf("bkg", "bkg_2d", "BKG", "BKG_2D", BACKGROUND);
pub const PSF_CLASS: HduClass = HduClass::irf("psf", "psf_table", "PSF", "PSF_TABLE", PSF);
pub const RAD_MAX_CLASS: HduClass =
    HduClass::irf("rad_max", "rad_max_2d", "RAD_MAX", "RAD_MAX_2D", RAD_MAX);
