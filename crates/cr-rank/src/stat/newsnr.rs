//! Closed-form newsnr statistics.

use super::{paired_values, quadrature};
use crate::reweight::{autochisq_newsnr, get_newsnr};
use cr_core::{RankingStatistic, Result, SingleFeature, TriggerBatch, fields};

/// Value assigned to triggers that fail the veto cut.
pub const CUT_SENTINEL: f32 = -1.0;

/// Triggers below this newsnr are subject to the veto cut.
const CUT_NEWSNR_BELOW: f32 = 10.0;
/// Veto criterion above which a low-newsnr trigger is cut.
const CUT_VETO_ABOVE: f64 = 2.0;

/// NewSNR statistic: single value is newsnr, coincidences add in quadrature.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewSnrStatistic;

impl NewSnrStatistic {
    /// Create the statistic. It needs no calibration.
    pub fn new() -> Self {
        Self
    }
}

impl RankingStatistic for NewSnrStatistic {
    fn name(&self) -> &'static str {
        "newsnr"
    }

    fn single(&self, trigs: &TriggerBatch) -> Result<SingleFeature> {
        Ok(SingleFeature::Values(get_newsnr(trigs)?))
    }

    fn coinc(
        &self,
        s1: &SingleFeature,
        s2: &SingleFeature,
        _slide: &[i64],
        _step: f64,
    ) -> Result<Vec<f64>> {
        let (a, b) = paired_values(s1, s2)?;
        Ok(a.iter().zip(b).map(|(&x, &y)| quadrature(x, y)).collect())
    }
}

/// NewSNR with a veto cut.
///
/// Triggers with newsnr below 10 whose `veto_chisq_ratio` exceeds 2 are
/// replaced by [`CUT_SENTINEL`]; a coincidence with a cut trigger on either
/// side ranks 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewSnrCutStatistic;

impl NewSnrCutStatistic {
    /// Create the statistic. It needs no calibration.
    pub fn new() -> Self {
        Self
    }
}

impl RankingStatistic for NewSnrCutStatistic {
    fn name(&self) -> &'static str {
        "newsnr_cut"
    }

    fn single(&self, trigs: &TriggerBatch) -> Result<SingleFeature> {
        let newsnr = get_newsnr(trigs)?;
        let veto = trigs.require(fields::VETO_CHISQ_RATIO)?;
        Ok(SingleFeature::Values(
            newsnr
                .iter()
                .zip(veto)
                .map(|(&v, &r)| {
                    if v < CUT_NEWSNR_BELOW && r > CUT_VETO_ABOVE { CUT_SENTINEL } else { v }
                })
                .collect(),
        ))
    }

    fn coinc(
        &self,
        s1: &SingleFeature,
        s2: &SingleFeature,
        _slide: &[i64],
        _step: f64,
    ) -> Result<Vec<f64>> {
        let (a, b) = paired_values(s1, s2)?;
        Ok(a.iter()
            .zip(b)
            .map(|(&x, &y)| {
                if x == CUT_SENTINEL || y == CUT_SENTINEL { 0.0 } else { quadrature(x, y) }
            })
            .collect())
    }
}

/// Minimum of the power-chi-square and auto-chi-square newsnr, combined in
/// quadrature.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxContTradNewSnrStatistic;

impl MaxContTradNewSnrStatistic {
    /// Create the statistic. It needs no calibration.
    pub fn new() -> Self {
        Self
    }
}

impl RankingStatistic for MaxContTradNewSnrStatistic {
    fn name(&self) -> &'static str {
        "max_cont_trad_newsnr"
    }

    /// Requires `snr`, `chisq`, `chisq_dof`, `cont_chisq` and `cont_chisq_dof`.
    fn single(&self, trigs: &TriggerBatch) -> Result<SingleFeature> {
        let trad = get_newsnr(trigs)?;
        let cont = autochisq_newsnr(trigs)?;
        Ok(SingleFeature::Values(
            trad.iter().zip(&cont).map(|(&t, &c)| t.min(c as f32)).collect(),
        ))
    }

    fn coinc(
        &self,
        s1: &SingleFeature,
        s2: &SingleFeature,
        slide: &[i64],
        step: f64,
    ) -> Result<Vec<f64>> {
        NewSnrStatistic.coinc(s1, s2, slide, step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reweight::newsnr;
    use approx::assert_relative_eq;
    use cr_core::Error;
    use proptest::prelude::*;

    fn batch(columns: &[(&str, Vec<f64>)]) -> TriggerBatch {
        TriggerBatch::from_columns(columns.iter().map(|(n, c)| (n.to_string(), c.clone())))
            .unwrap()
    }

    fn values(v: &[f32]) -> SingleFeature {
        SingleFeature::Values(v.to_vec())
    }

    #[test]
    fn test_newsnr_single_and_coinc() {
        let trigs = batch(&[
            ("snr", vec![6.0, 8.0]),
            ("chisq", vec![10.0, 60.0]),
            ("chisq_dof", vec![6.0, 6.0]),
        ]);
        let s = NewSnrStatistic.single(&trigs).unwrap();
        let v = s.as_values().unwrap();
        assert_eq!(v[0], 6.0);
        assert_relative_eq!(v[1], newsnr(8.0, 6.0) as f32);

        let c = NewSnrStatistic.coinc(&values(&[3.0, 6.0]), &values(&[4.0, 8.0]), &[0], 0.0).unwrap();
        assert_relative_eq!(c[0], 5.0);
        assert_relative_eq!(c[1], 10.0);
    }

    #[test]
    fn test_coinc_rejects_rows() {
        let rows = SingleFeature::PhaseTd(vec![]);
        assert!(NewSnrStatistic.coinc(&rows, &values(&[]), &[], 0.0).is_err());
    }

    #[test]
    fn test_cut_marks_vetoed_triggers() {
        let trigs = batch(&[
            ("snr", vec![6.0, 6.0, 12.0]),
            ("chisq", vec![0.0, 0.0, 0.0]),
            ("chisq_dof", vec![6.0, 6.0, 6.0]),
            ("veto_chisq_ratio", vec![3.0, 1.0, 3.0]),
        ]);
        let s = NewSnrCutStatistic.single(&trigs).unwrap();
        assert_eq!(s.as_values().unwrap(), &[CUT_SENTINEL, 6.0, 12.0]);
        // input untouched
        assert_eq!(trigs.column("snr").unwrap(), &[6.0, 6.0, 12.0]);
    }

    #[test]
    fn test_cut_requires_veto_column() {
        let trigs =
            batch(&[("snr", vec![6.0]), ("chisq", vec![0.0]), ("chisq_dof", vec![6.0])]);
        let err = NewSnrCutStatistic.single(&trigs).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("veto_chisq_ratio"));
    }

    #[test]
    fn test_cut_coinc_zeroes_either_side() {
        let c = NewSnrCutStatistic
            .coinc(&values(&[-1.0, 3.0, -1.0, 3.0]), &values(&[4.0, -1.0, -1.0, 4.0]), &[0], 0.0)
            .unwrap();
        assert_eq!(c, vec![0.0, 0.0, 0.0, 5.0]);
    }

    #[test]
    fn test_max_cont_trad_takes_minimum() {
        let trigs = batch(&[
            ("snr", vec![10.0, 10.0]),
            ("chisq", vec![0.0, 40.0]),
            ("chisq_dof", vec![6.0, 6.0]),
            ("cont_chisq", vec![20.0, 0.0]),
            ("cont_chisq_dof", vec![5.0, 5.0]),
        ]);
        let s = MaxContTradNewSnrStatistic.single(&trigs).unwrap();
        let v = s.as_values().unwrap();
        assert_relative_eq!(v[0], newsnr(10.0, 4.0) as f32);
        assert_relative_eq!(v[1], newsnr(10.0, 4.0) as f32);
    }

    #[test]
    fn test_max_cont_trad_requires_auto_chisq() {
        let trigs =
            batch(&[("snr", vec![6.0]), ("chisq", vec![0.0]), ("chisq_dof", vec![6.0])]);
        assert!(MaxContTradNewSnrStatistic.single(&trigs).is_err());
    }

    proptest! {
        #[test]
        fn prop_quadrature_symmetric(
            pairs in proptest::collection::vec((0.0f32..50.0, 0.0f32..50.0), 0..32),
        ) {
            let a: Vec<f32> = pairs.iter().map(|p| p.0).collect();
            let b: Vec<f32> = pairs.iter().map(|p| p.1).collect();
            let ab = NewSnrStatistic.coinc(&values(&a), &values(&b), &[0], 0.0).unwrap();
            let ba = NewSnrStatistic.coinc(&values(&b), &values(&a), &[0], 0.0).unwrap();
            prop_assert_eq!(ab, ba);
        }

        #[test]
        fn prop_cut_sentinel_forces_zero(
            a in proptest::collection::vec(prop_oneof![Just(-1.0f32), 0.0f32..50.0], 1..32),
            b in proptest::collection::vec(prop_oneof![Just(-1.0f32), 0.0f32..50.0], 1..32),
        ) {
            let n = a.len().min(b.len());
            let (a, b) = (&a[..n], &b[..n]);
            let c = NewSnrCutStatistic.coinc(&values(a), &values(b), &[0], 0.0).unwrap();
            for i in 0..n {
                if a[i] == -1.0 || b[i] == -1.0 {
                    prop_assert_eq!(c[i], 0.0);
                } else {
                    prop_assert!(c[i] >= 0.0);
                }
            }
        }
    }
}
