//! Ranking statistic variants.

use crate::calibration::CalibrationStore;
use crate::registry::StatisticKind;
use cr_core::{Error, RankingStatistic, Result, SingleFeature, TriggerBatch};
use std::path::Path;

mod expfit;
mod newsnr;
mod phasetd;

pub use expfit::{ALPHA_REF, ExpFitCombinedSnr, ExpFitStatistic};
pub use newsnr::{
    CUT_SENTINEL, MaxContTradNewSnrStatistic, NewSnrCutStatistic, NewSnrStatistic,
};
pub use phasetd::{CoincGeometry, PHASETD_TAG, PhaseTdStatistic};

/// Closed set of statistic implementations selected through the registry.
#[derive(Debug, Clone)]
pub enum Statistic {
    /// Quadrature sum of newsnr.
    NewSnr(NewSnrStatistic),
    /// NewSNR with a veto cut.
    NewSnrCut(NewSnrCutStatistic),
    /// NewSNR corrected by the time/phase/amplitude noise histogram.
    PhaseTd(PhaseTdStatistic),
    /// Exponential noise-fit log-likelihood ratio.
    ExpFit(ExpFitStatistic),
    /// ExpFit rescaled to resemble network SNR.
    ExpFitCombinedSnr(ExpFitCombinedSnr),
    /// Minimum of power- and auto-chi-square newsnr.
    MaxContTradNewSnr(MaxContTradNewSnrStatistic),
}

impl Statistic {
    /// Build the statistic `kind`, reading whatever calibration it needs.
    pub fn from_store(kind: StatisticKind, store: &CalibrationStore) -> Result<Self> {
        let stat = match kind {
            StatisticKind::NewSnr => Self::NewSnr(NewSnrStatistic::new()),
            StatisticKind::NewSnrCut => Self::NewSnrCut(NewSnrCutStatistic::new()),
            StatisticKind::PhaseTd => Self::PhaseTd(PhaseTdStatistic::from_store(store)?),
            StatisticKind::ExpFit => Self::ExpFit(ExpFitStatistic::from_store(store)?),
            StatisticKind::ExpFitCombinedSnr => {
                Self::ExpFitCombinedSnr(ExpFitCombinedSnr::from_store(store)?)
            }
            StatisticKind::MaxContTradNewSnr => {
                Self::MaxContTradNewSnr(MaxContTradNewSnrStatistic::new())
            }
        };
        tracing::info!(stat = kind.name(), n_tables = store.len(), "statistic constructed");
        Ok(stat)
    }

    /// Resolve `name` through the registry and build it.
    pub fn from_name(name: &str, store: &CalibrationStore) -> Result<Self> {
        Self::from_store(name.parse()?, store)
    }

    /// Resolve `name`, load the calibration files and build the statistic.
    pub fn from_files<P: AsRef<Path>>(name: &str, files: &[P]) -> Result<Self> {
        let kind: StatisticKind = name.parse()?;
        let store = CalibrationStore::open(files)?;
        Self::from_store(kind, &store)
    }

    /// Registry kind of this statistic.
    pub fn kind(&self) -> StatisticKind {
        match self {
            Self::NewSnr(_) => StatisticKind::NewSnr,
            Self::NewSnrCut(_) => StatisticKind::NewSnrCut,
            Self::PhaseTd(_) => StatisticKind::PhaseTd,
            Self::ExpFit(_) => StatisticKind::ExpFit,
            Self::ExpFitCombinedSnr(_) => StatisticKind::ExpFitCombinedSnr,
            Self::MaxContTradNewSnr(_) => StatisticKind::MaxContTradNewSnr,
        }
    }

    fn inner(&self) -> &dyn RankingStatistic {
        match self {
            Self::NewSnr(s) => s,
            Self::NewSnrCut(s) => s,
            Self::PhaseTd(s) => s,
            Self::ExpFit(s) => s,
            Self::ExpFitCombinedSnr(s) => s,
            Self::MaxContTradNewSnr(s) => s,
        }
    }
}

impl RankingStatistic for Statistic {
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn single(&self, trigs: &TriggerBatch) -> Result<SingleFeature> {
        self.inner().single(trigs)
    }

    fn coinc(
        &self,
        s1: &SingleFeature,
        s2: &SingleFeature,
        slide: &[i64],
        step: f64,
    ) -> Result<Vec<f64>> {
        self.inner().coinc(s1, s2, slide, step)
    }
}

/// Scalar features of both sides, checked to have equal length.
pub(crate) fn paired_values<'a>(
    s1: &'a SingleFeature,
    s2: &'a SingleFeature,
) -> Result<(&'a [f32], &'a [f32])> {
    let (a, b) = (s1.as_values()?, s2.as_values()?);
    check_paired(a.len(), b.len())?;
    Ok((a, b))
}

pub(crate) fn check_paired(n1: usize, n2: usize) -> Result<()> {
    if n1 != n2 {
        return Err(Error::Validation(format!(
            "coincident feature arrays differ in length: {n1} vs {n2}"
        )));
    }
    Ok(())
}

/// Slide multiple of coincidence `i`; `slide` is either per-coincidence or a
/// single broadcast value.
pub(crate) fn slide_multiples(slide: &[i64], n: usize) -> Result<impl Fn(usize) -> i64 + '_> {
    if slide.len() != n && slide.len() != 1 {
        return Err(Error::Validation(format!(
            "slide length mismatch: expected {n} (or 1), got {}",
            slide.len()
        )));
    }
    Ok(move |i: usize| if slide.len() == 1 { slide[0] } else { slide[i] })
}

/// `sqrt(s1² + s2²)`.
#[inline]
pub(crate) fn quadrature(a: f32, b: f32) -> f64 {
    let (a, b) = (f64::from(a), f64::from(b));
    (a * a + b * b).sqrt()
}
