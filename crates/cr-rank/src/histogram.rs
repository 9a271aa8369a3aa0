//! Five-dimensional log-density table used by the PhaseTD statistic.

use crate::bins::BinEdges;
use crate::calibration::{CalibrationTable, NdArray};
use cr_core::{Error, Result};

/// Axis order of the histogram: time delay, phase difference, SNR of the
/// larger-amplitude side, SNR of the other side, amplitude ratio.
pub const N_AXES: usize = 5;

/// Normalized noise log-density over (td, pd, snr1, snr2, rd) bins.
///
/// Values are `ln(map / max(map))`, so every entry is `<= 0` and empty bins are
/// `-inf`.
#[derive(Debug, Clone)]
pub struct PhaseTdHistogram {
    shape: [usize; N_AXES],
    strides: [usize; N_AXES],
    log_density: Vec<f64>,
    tbins: BinEdges,
    pbins: BinEdges,
    sbins: BinEdges,
    rbins: BinEdges,
}

impl PhaseTdHistogram {
    /// Build from a raw density map and its bin edges.
    ///
    /// The map must have shape `(tbins-1, pbins-1, sbins-1, sbins-1, rbins-1)`,
    /// hold finite non-negative values, and have a positive maximum.
    pub fn new(
        map: &NdArray,
        tbins: BinEdges,
        pbins: BinEdges,
        sbins: BinEdges,
        rbins: BinEdges,
    ) -> Result<Self> {
        let expected =
            [tbins.n_bins(), pbins.n_bins(), sbins.n_bins(), sbins.n_bins(), rbins.n_bins()];
        if map.shape() != expected {
            return Err(Error::Calibration(format!(
                "phasetd map shape {:?} does not match bin edges {expected:?}",
                map.shape()
            )));
        }
        if let Some(v) = map.data().iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(Error::Calibration(format!(
                "phasetd map values must be finite and >= 0, got {v}"
            )));
        }
        let top = map.data().iter().copied().fold(0.0f64, f64::max);
        if top <= 0.0 {
            return Err(Error::Calibration("phasetd map has no positive entries".into()));
        }

        let log_density = map.data().iter().map(|v| (v / top).ln()).collect();

        let mut strides = [1usize; N_AXES];
        for k in (0..N_AXES - 1).rev() {
            strides[k] = strides[k + 1] * expected[k + 1];
        }

        Ok(Self { shape: expected, strides, log_density, tbins, pbins, sbins, rbins })
    }

    /// Build from a `phasetd_newsnr` calibration table (`map`, `tbins`, `pbins`,
    /// `sbins`, `rbins`).
    pub fn from_table(table: &CalibrationTable) -> Result<Self> {
        let edges = |name: &str| -> Result<BinEdges> {
            BinEdges::new(name, table.array_1d(name)?.to_vec())
        };
        Self::new(
            table.array("map")?,
            edges("tbins")?,
            edges("pbins")?,
            edges("sbins")?,
            edges("rbins")?,
        )
    }

    /// Histogram dimensions.
    pub fn shape(&self) -> [usize; N_AXES] {
        self.shape
    }

    /// Time-delay edges.
    pub fn tbins(&self) -> &BinEdges {
        &self.tbins
    }

    /// Phase-difference edges.
    pub fn pbins(&self) -> &BinEdges {
        &self.pbins
    }

    /// SNR edges, shared by both SNR axes.
    pub fn sbins(&self) -> &BinEdges {
        &self.sbins
    }

    /// Amplitude-ratio edges.
    pub fn rbins(&self) -> &BinEdges {
        &self.rbins
    }

    /// Saturated bin indices of a point.
    pub fn bin_indices(&self, td: f64, pd: f64, snr1: f64, snr2: f64, rd: f64) -> [usize; N_AXES] {
        [
            self.tbins.bin_index(td),
            self.pbins.bin_index(pd),
            self.sbins.bin_index(snr1),
            self.sbins.bin_index(snr2),
            self.rbins.bin_index(rd),
        ]
    }

    /// Log-density at bin indices produced by [`Self::bin_indices`].
    pub fn log_density_at(&self, idx: [usize; N_AXES]) -> f64 {
        let flat: usize = idx.iter().zip(&self.strides).map(|(i, s)| i * s).sum();
        self.log_density[flat]
    }
}
