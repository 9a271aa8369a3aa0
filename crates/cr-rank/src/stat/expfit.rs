//! Exponential noise-fit statistics.

use super::paired_values;
use crate::calibration::CalibrationStore;
use crate::fits::ExpFitModel;
use crate::reweight::get_newsnr;
use cr_core::{Error, RankingStatistic, Result, SingleFeature, TriggerBatch};

/// Reference exponential slope used to rescale [`ExpFitCombinedSnr`]; typical
/// of low-mass templates.
pub const ALPHA_REF: f64 = 6.0;

/// Per-trigger `(newsnr, alpha, lambda, threshold)` for a batch.
fn fitted_newsnr(
    model: &ExpFitModel,
    trigs: &TriggerBatch,
) -> Result<Vec<(f64, f64, f64, f64)>> {
    let ifo = trigs.ifo().ok_or_else(|| {
        Error::Validation("trigger batch has no detector identifier".into())
    })?;
    let newsnr = get_newsnr(trigs)?;
    newsnr
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            let template = trigs.template_for(i).ok_or_else(|| {
                Error::Validation("trigger batch has no template association".into())
            })?;
            let (alpha, lambda, thresh) = model.lookup(ifo, template)?;
            Ok((f64::from(n), alpha, lambda, thresh))
        })
        .collect()
}

/// Exponential noise-fit statistic.
///
/// The single value is the log noise-rate density of a trigger in its
/// template, `-alpha*(newsnr - threshold) + ln(alpha) + ln(lambda)`. The
/// coincident value approximates the network log-likelihood ratio and maps it
/// back to SNR-like units.
#[derive(Debug, Clone)]
pub struct ExpFitStatistic {
    model: ExpFitModel,
}

impl ExpFitStatistic {
    /// Wrap fit coefficients.
    pub fn new(model: ExpFitModel) -> Self {
        Self { model }
    }

    /// Load every `<detector>-fit_coeffs` table from the store.
    pub fn from_store(store: &CalibrationStore) -> Result<Self> {
        Ok(Self::new(ExpFitModel::from_store(store)?))
    }

    /// The loaded fit coefficients.
    pub fn model(&self) -> &ExpFitModel {
        &self.model
    }
}

impl RankingStatistic for ExpFitStatistic {
    fn name(&self) -> &'static str {
        "exp_fit_stat"
    }

    /// Requires `snr`, `chisq`, `chisq_dof`, a detector identifier and a
    /// template association.
    fn single(&self, trigs: &TriggerBatch) -> Result<SingleFeature> {
        Ok(SingleFeature::Values(
            fitted_newsnr(&self.model, trigs)?
                .into_iter()
                .map(|(n, alpha, lambda, thresh)| {
                    (-alpha * (n - thresh) + alpha.ln() + lambda.ln()) as f32
                })
                .collect(),
        ))
    }

    /// `sqrt(2 * (-s1 - s2 + Σ threshold²/2))`; NaN when the bracket is negative.
    fn coinc(
        &self,
        s1: &SingleFeature,
        s2: &SingleFeature,
        _slide: &[i64],
        _step: f64,
    ) -> Result<Vec<f64>> {
        let (a, b) = paired_values(s1, s2)?;
        let thresholds = self.model.threshold_term();
        Ok(a.iter()
            .zip(b)
            .map(|(&x, &y)| {
                let loglr = -f64::from(x) - f64::from(y) + thresholds;
                (2.0 * loglr).sqrt()
            })
            .collect())
    }
}

/// Monotonic rescaling of [`ExpFitStatistic`] that resembles network SNR for
/// coincidences with similar newsnr in each detector.
#[derive(Debug, Clone)]
pub struct ExpFitCombinedSnr {
    model: ExpFitModel,
    alpha_ref: f64,
}

impl ExpFitCombinedSnr {
    /// Wrap fit coefficients with the default reference slope.
    pub fn new(model: ExpFitModel) -> Self {
        Self { model, alpha_ref: ALPHA_REF }
    }

    /// Load every `<detector>-fit_coeffs` table from the store.
    pub fn from_store(store: &CalibrationStore) -> Result<Self> {
        Ok(Self::new(ExpFitModel::from_store(store)?))
    }

    /// The loaded fit coefficients.
    pub fn model(&self) -> &ExpFitModel {
        &self.model
    }

    /// Reference slope used for the rescaling.
    pub fn alpha_ref(&self) -> f64 {
        self.alpha_ref
    }
}

impl RankingStatistic for ExpFitCombinedSnr {
    fn name(&self) -> &'static str {
        "exp_fit_csnr"
    }

    fn single(&self, trigs: &TriggerBatch) -> Result<SingleFeature> {
        let aref = self.alpha_ref;
        Ok(SingleFeature::Values(
            fitted_newsnr(&self.model, trigs)?
                .into_iter()
                .map(|(n, alpha, lambda, thresh)| {
                    let lognoiserate = -alpha * (n - thresh) + (alpha / aref).ln() + lambda.ln();
                    ((thresh - lognoiserate / aref) / std::f64::consts::SQRT_2) as f32
                })
                .collect(),
        ))
    }

    /// Plain sum; the single values are already on an SNR-like scale.
    fn coinc(
        &self,
        s1: &SingleFeature,
        s2: &SingleFeature,
        _slide: &[i64],
        _step: f64,
    ) -> Result<Vec<f64>> {
        let (a, b) = paired_values(s1, s2)?;
        Ok(a.iter().zip(b).map(|(&x, &y)| f64::from(x) + f64::from(y)).collect())
    }
}
