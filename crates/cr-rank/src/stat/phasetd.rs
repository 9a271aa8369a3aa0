//! Histogram-corrected newsnr over time delay, phase and amplitude.

use super::{check_paired, slide_multiples};
use crate::calibration::CalibrationStore;
use crate::histogram::{N_AXES, PhaseTdHistogram};
use crate::reweight::get_newsnr;
use cr_core::{PhaseTdRow, RankingStatistic, Result, SingleFeature, TriggerBatch, fields};
use std::f64::consts::TAU;

/// Calibration tag of the PhaseTD histogram table.
pub const PHASETD_TAG: &str = "phasetd_newsnr";

/// Relative geometry of one coincidence, in the histogram's conventions.
///
/// `rd <= 1` always holds for finite inputs: when the first side has the larger
/// amplitude the ratio is inverted and `snr1`/`snr2` are swapped with it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoincGeometry {
    /// Time delay `t1 - t2 - slide*step`.
    pub td: f64,
    /// Phase difference in `[0, 2π)`.
    pub pd: f64,
    /// Amplitude ratio, at most 1.
    pub rd: f64,
    /// SNR labelled as side 1 after the swap.
    pub snr1: f64,
    /// SNR labelled as side 2 after the swap.
    pub snr2: f64,
}

impl CoincGeometry {
    /// Geometry of rows `a`, `b` with a total time-slide offset in seconds.
    pub fn new(a: &PhaseTdRow, b: &PhaseTdRow, offset: f64) -> Self {
        let td = a.end_time - b.end_time - offset;
        let pd = (a.coa_phase - b.coa_phase).rem_euclid(TAU);
        let rd = a.sigma / b.sigma;
        if rd > 1.0 {
            Self { td, pd, rd: 1.0 / rd, snr1: b.snr, snr2: a.snr }
        } else {
            Self { td, pd, rd, snr1: a.snr, snr2: b.snr }
        }
    }
}

/// NewSNR corrected by the noise density of the coincidence's time delay,
/// phase difference, SNRs and amplitude ratio.
#[derive(Debug, Clone)]
pub struct PhaseTdStatistic {
    hist: PhaseTdHistogram,
}

impl PhaseTdStatistic {
    /// Wrap an already-built histogram.
    pub fn new(hist: PhaseTdHistogram) -> Self {
        Self { hist }
    }

    /// Load the `phasetd_newsnr` table from the store.
    pub fn from_store(store: &CalibrationStore) -> Result<Self> {
        let hist = PhaseTdHistogram::from_table(store.require(PHASETD_TAG)?)?;
        tracing::debug!(shape = ?hist.shape(), "phasetd histogram loaded");
        Ok(Self::new(hist))
    }

    /// The normalized histogram.
    pub fn histogram(&self) -> &PhaseTdHistogram {
        &self.hist
    }

    /// Bin indices of a coincidence geometry.
    pub fn bin_indices(&self, g: &CoincGeometry) -> [usize; N_AXES] {
        self.hist.bin_indices(g.td, g.pd, g.snr1, g.snr2, g.rd)
    }

    /// Squared statistic before the square root, clamped at 0.
    pub fn coinc_squared(&self, a: &PhaseTdRow, b: &PhaseTdRow, offset: f64) -> f64 {
        let g = CoincGeometry::new(a, b, offset);
        let rstat = a.newsnr * a.newsnr + b.newsnr * b.newsnr;
        let cstat = rstat + 2.0 * self.hist.log_density_at(self.bin_indices(&g));
        if cstat < 0.0 { 0.0 } else { cstat }
    }
}

impl RankingStatistic for PhaseTdStatistic {
    fn name(&self) -> &'static str {
        "phasetd_newsnr"
    }

    /// Requires `snr`, `chisq`, `chisq_dof`, `coa_phase`, `end_time` and `sigmasq`.
    fn single(&self, trigs: &TriggerBatch) -> Result<SingleFeature> {
        let newsnr = get_newsnr(trigs)?;
        let phase = trigs.require(fields::COA_PHASE)?;
        let time = trigs.require(fields::END_TIME)?;
        let sigmasq = trigs.require(fields::SIGMASQ)?;
        let snr = trigs.require(fields::SNR)?;
        Ok(SingleFeature::PhaseTd(
            (0..trigs.n_events())
                .map(|i| PhaseTdRow {
                    newsnr: f64::from(newsnr[i]),
                    coa_phase: phase[i],
                    end_time: time[i],
                    sigma: sigmasq[i].sqrt(),
                    snr: snr[i],
                })
                .collect(),
        ))
    }

    fn coinc(
        &self,
        s1: &SingleFeature,
        s2: &SingleFeature,
        slide: &[i64],
        step: f64,
    ) -> Result<Vec<f64>> {
        let (r1, r2) = (s1.as_rows()?, s2.as_rows()?);
        check_paired(r1.len(), r2.len())?;
        let multiple = slide_multiples(slide, r1.len())?;
        Ok(r1
            .iter()
            .zip(r2)
            .enumerate()
            .map(|(i, (a, b))| self.coinc_squared(a, b, multiple(i) as f64 * step).sqrt())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bins::BinEdges;
    use crate::calibration::{CalibrationTable, NdArray};
    use approx::assert_relative_eq;
    use cr_core::Error;
    use proptest::prelude::*;

    const TBINS: [f64; 3] = [-1.0, 0.0, 1.0];
    const PBINS: [f64; 3] = [0.0, std::f64::consts::PI, TAU];
    const SBINS: [f64; 3] = [0.0, 10.0, 100.0];
    const RBINS: [f64; 3] = [0.0, 0.5, 1.0];

    /// 2^5 bins; flat index `k` holds `k + 1`, so the peak is bin (1,1,1,1,1).
    fn table() -> CalibrationTable {
        CalibrationTable::new(PHASETD_TAG)
            .with_array(
                "map",
                NdArray::new(vec![2; 5], (1..=32).map(f64::from).collect()).unwrap(),
            )
            .with_array("tbins", TBINS.to_vec())
            .with_array("pbins", PBINS.to_vec())
            .with_array("sbins", SBINS.to_vec())
            .with_array("rbins", RBINS.to_vec())
    }

    fn stat() -> PhaseTdStatistic {
        PhaseTdStatistic::from_store(&CalibrationStore::from_tables(vec![table()]).unwrap())
            .unwrap()
    }

    fn row(newsnr: f64, coa_phase: f64, end_time: f64, sigma: f64, snr: f64) -> PhaseTdRow {
        PhaseTdRow { newsnr, coa_phase, end_time, sigma, snr }
    }

    fn flat(idx: [usize; 5]) -> usize {
        idx.iter().fold(0, |acc, &i| acc * 2 + i)
    }

    #[test]
    fn test_single_rows() {
        let trigs = TriggerBatch::from_columns(vec![
            ("snr".to_string(), vec![9.0]),
            ("chisq".to_string(), vec![0.0]),
            ("chisq_dof".to_string(), vec![6.0]),
            ("coa_phase".to_string(), vec![1.5]),
            ("end_time".to_string(), vec![1000.25]),
            ("sigmasq".to_string(), vec![16.0]),
        ])
        .unwrap();
        let s = stat().single(&trigs).unwrap();
        assert_eq!(s.as_rows().unwrap()[0].to_array(), [9.0, 1.5, 1000.25, 4.0, 9.0]);
    }

    #[test]
    fn test_single_requires_timing_columns() {
        let trigs = TriggerBatch::from_columns(vec![
            ("snr".to_string(), vec![9.0]),
            ("chisq".to_string(), vec![0.0]),
            ("chisq_dof".to_string(), vec![6.0]),
        ])
        .unwrap();
        assert!(matches!(stat().single(&trigs), Err(Error::Validation(_))));
    }

    #[test]
    fn test_geometry_swaps_when_ratio_above_one() {
        let a = row(8.0, 0.0, 0.0, 4.0, 12.0);
        let b = row(7.0, 0.0, 0.0, 2.0, 11.0);
        let g = CoincGeometry::new(&a, &b, 0.0);
        assert_eq!(g.rd, 0.5);
        assert_eq!((g.snr1, g.snr2), (11.0, 12.0));

        let g = CoincGeometry::new(&b, &a, 0.0);
        assert_eq!(g.rd, 0.5);
        assert_eq!((g.snr1, g.snr2), (11.0, 12.0));
    }

    #[test]
    fn test_geometry_time_slide_and_phase_wrap() {
        let a = row(8.0, 0.5, 100.0, 1.0, 8.0);
        let b = row(8.0, 1.5, 95.0, 1.0, 8.0);
        let g = CoincGeometry::new(&a, &b, 3.0 * 1.5);
        assert_relative_eq!(g.td, 0.5);
        assert_relative_eq!(g.pd, TAU - 1.0);
    }

    #[test]
    fn test_coinc_adds_log_density() {
        let s = stat();
        // td=0.5 -> 1, pd=0 -> 0, snr 20/20 -> 1/1, rd=1 -> 1
        let a = row(6.0, 1.0, 10.5, 1.0, 20.0);
        let b = row(8.0, 1.0, 10.0, 1.0, 20.0);
        let g = CoincGeometry::new(&a, &b, 0.0);
        let idx = s.bin_indices(&g);
        assert_eq!(idx, [1, 0, 1, 1, 1]);
        let expected = 100.0 + 2.0 * ((flat(idx) + 1) as f64 / 32.0).ln();

        let out = s
            .coinc(&SingleFeature::PhaseTd(vec![a]), &SingleFeature::PhaseTd(vec![b]), &[0], 1.0)
            .unwrap();
        assert_relative_eq!(out[0], expected.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_peak_bin_leaves_quadrature_unchanged() {
        let s = stat();
        let a = row(3.0, 4.0, 0.5, 1.0, 50.0);
        let b = row(4.0, 0.5, 0.0, 1.0, 50.0);
        assert_eq!(s.bin_indices(&CoincGeometry::new(&a, &b, 0.0)), [1, 1, 1, 1, 1]);
        assert_relative_eq!(s.coinc_squared(&a, &b, 0.0), 25.0);
    }

    #[test]
    fn test_negative_cstat_clamped() {
        let map = NdArray::new(vec![1; 5], vec![1.0]).unwrap();
        let map2 = NdArray::new(vec![1, 1, 1, 1, 2], vec![1.0, 0.0]).unwrap();
        let edges = |v: &[f64]| BinEdges::new("e", v.to_vec()).unwrap();
        assert!(
            PhaseTdHistogram::new(&map, edges(&TBINS), edges(&PBINS), edges(&SBINS), edges(&RBINS))
                .is_err()
        );
        let hist = PhaseTdHistogram::new(
            &map2,
            edges(&[-1.0, 1.0]),
            edges(&[0.0, TAU]),
            edges(&[0.0, 100.0]),
            edges(&RBINS),
        )
        .unwrap();
        let s = PhaseTdStatistic::new(hist);
        // rd = 1 lands in the empty bin: log density is -inf
        let a = row(5.0, 0.0, 0.0, 1.0, 5.0);
        assert_eq!(s.coinc_squared(&a, &a, 0.0), 0.0);
        let out = s
            .coinc(&SingleFeature::PhaseTd(vec![a]), &SingleFeature::PhaseTd(vec![a]), &[0], 0.0)
            .unwrap();
        assert_eq!(out, vec![0.0]);
    }

    #[test]
    fn test_coinc_rejects_scalar_features() {
        let v = SingleFeature::Values(vec![1.0]);
        assert!(stat().coinc(&v, &v, &[0], 0.0).is_err());
    }

    #[test]
    fn test_coinc_checks_slide_length() {
        let a = SingleFeature::PhaseTd(vec![row(5.0, 0.0, 0.0, 1.0, 5.0); 3]);
        assert!(stat().coinc(&a, &a, &[0, 1], 0.1).is_err());
        assert_eq!(stat().coinc(&a, &a, &[0, 1, 2], 0.1).unwrap().len(), 3);
    }

    #[test]
    fn test_from_store_keeps_edges() {
        let s = stat();
        let hist = s.histogram();
        assert_eq!(hist.shape(), [2; 5]);
        assert_eq!(hist.tbins().edges(), &TBINS);
        assert_eq!(hist.pbins().edges(), &PBINS);
        assert_eq!(hist.sbins().edges(), &SBINS);
        assert_eq!(hist.rbins().edges(), &RBINS);
        // peak of a map holding 1..=32 sits in the last flat bin
        assert_eq!(hist.log_density_at([1; 5]), 0.0);
    }

    #[test]
    fn test_missing_table() {
        let err = PhaseTdStatistic::from_store(&CalibrationStore::empty()).unwrap_err();
        assert!(err.to_string().contains(PHASETD_TAG));
    }

    fn any_row() -> impl Strategy<Value = PhaseTdRow> {
        (0.0f64..30.0, -20.0f64..20.0, -1e3f64..1e3, 1e-3f64..1e3, 0.0f64..200.0)
            .prop_map(|(n, p, t, s, r)| row(n, p, t, s, r))
    }

    proptest! {
        #[test]
        fn prop_bins_and_ratio_in_range(a in any_row(), b in any_row(), slide in -50i64..50) {
            let s = stat();
            let g = CoincGeometry::new(&a, &b, slide as f64 * 0.2);
            prop_assert!(g.rd <= 1.0);
            prop_assert!(g.pd >= 0.0 && g.pd <= TAU);
            let idx = s.bin_indices(&g);
            prop_assert!(idx.iter().all(|&i| i <= 1));
            if a.sigma / b.sigma > 1.0 {
                prop_assert_eq!((g.snr1, g.snr2), (b.snr, a.snr));
            } else {
                prop_assert_eq!((g.snr1, g.snr2), (a.snr, b.snr));
            }
            prop_assert!(s.coinc_squared(&a, &b, slide as f64 * 0.2) >= 0.0);
        }
    }
}
