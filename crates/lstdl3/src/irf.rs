//! Instrument response HDUs taken verbatim from an IRF file.

use std::path::Path;

use lstdl3_fits::FitsFile;
use tracing::debug;

use crate::error::{Dl3Error, Result};
use crate::gadf::{EFFECTIVE_AREA, ENERGY_DISPERSION, IRF_HDUS};

/// Serialized IRF extensions, in the order they are appended to DL3 files.
#[derive(Debug, Clone, Default)]
pub struct IrfHdus {
    hdus: Vec<(String, Vec<u8>)>,
}

impl IrfHdus {
    /// Read the IRF extensions of `path`.
    ///
    /// `EFFECTIVE AREA` and `ENERGY DISPERSION` are required;
    /// `BACKGROUND`, `PSF` and `RAD_MAX` are taken when present.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Dl3Error::FileNotFound(path.to_path_buf()));
        }
        let file = FitsFile::open(path)?;

        for required in [EFFECTIVE_AREA, ENERGY_DISPERSION] {
            if file.hdu(required).is_none() {
                return Err(Dl3Error::MissingHdu {
                    hdu: required.to_string(),
                    file: path.to_path_buf(),
                });
            }
        }

        let mut hdus = Vec::new();
        for extname in IRF_HDUS {
            if let Some(hdu) = file.hdu(extname) {
                hdus.push((extname.to_string(), file.raw_hdu(hdu)?.to_vec()));
            }
        }
        debug!(path = %path.display(), count = hdus.len(), "read IRF HDUs");
        Ok(IrfHdus { hdus })
    }

    pub fn len(&self) -> usize {
        self.hdus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hdus.is_empty()
    }

    pub fn contains(&self, extname: &str) -> bool {
        self.hdus.iter().any(|(name, _)| name == extname)
    }

    /// `(EXTNAME, bytes)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.hdus
            .iter()
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lstdl3_fits::{
        BinaryColumnData, BinaryColumnDescriptor, BinaryColumnType, BinaryTableHdu, NewFitsFile,
    };

    fn irf_table(extname: &str) -> BinaryTableHdu {
        BinaryTableHdu::new(extname).column(
            BinaryColumnDescriptor::new("ENERG_LO", 3, BinaryColumnType::Float).with_unit("TeV"),
            BinaryColumnData::Float(vec![0.01, 0.1, 1.0]),
        )
    }

    fn write_irf(dir: &Path, extnames: &[&str]) -> std::path::PathBuf {
        let path = dir.join("irf.fits.gz");
        let mut file = NewFitsFile::create(&path);
        for name in extnames {
            file = file.table(&irf_table(name)).unwrap();
        }
        file.write().unwrap();
        path
    }

    #[test]
    fn keeps_known_irf_hdus_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_irf(
            dir.path(),
            &[ENERGY_DISPERSION, "UNRELATED", EFFECTIVE_AREA, "RAD_MAX"],
        );
        let irf = IrfHdus::read(&path).unwrap();
        let names: Vec<&str> = irf.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec![EFFECTIVE_AREA, ENERGY_DISPERSION, "RAD_MAX"]);
        assert!(!irf.contains("BACKGROUND"));
        assert!(irf.iter().all(|(_, b)| b.len() % lstdl3_fits::BLOCK_SIZE == 0));
    }

    #[test]
    fn effective_area_is_required() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_irf(dir.path(), &[ENERGY_DISPERSION]);
        assert!(matches!(
            IrfHdus::read(&path),
            Err(Dl3Error::MissingHdu { ref hdu, .. }) if hdu == EFFECTIVE_AREA
        ));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            IrfHdus::read(dir.path().join("irf.fits")),
            Err(Dl3Error::FileNotFound(_))
        ));
    }
}
