//! Per-template exponential noise-fit coefficients.

use crate::calibration::{CalibrationStore, CalibrationTable};
use cr_core::{Error, Result};
use std::collections::BTreeMap;

/// Tag suffix of fit-coefficient tables: `<detector>-fit_coeffs`.
pub const FIT_COEFFS_TAG: &str = "fit_coeffs";

/// Detector name of a `<detector>-fit_coeffs` tag.
///
/// Only the second `-`-separated component is checked, so `H1-fit_coeffs-v2`
/// also belongs to `H1`.
pub fn detector_of_tag(tag: &str) -> Option<&str> {
    let mut parts = tag.split('-');
    let ifo = parts.next()?;
    (parts.next()? == FIT_COEFFS_TAG).then_some(ifo)
}

/// Fit coefficients of one detector, sorted by template id.
///
/// Index `i` of `alpha`/`lambda` belongs to the `i`-th smallest template id.
#[derive(Debug, Clone, PartialEq)]
pub struct FitCoefficients {
    template_ids: Vec<f64>,
    alpha: Vec<f64>,
    lambda: Vec<f64>,
    threshold: f64,
}

impl FitCoefficients {
    /// Sort parallel `(template_id, alpha, lambda)` arrays by template id.
    pub fn from_unsorted(
        template_id: &[f64],
        alpha: &[f64],
        lambda: &[f64],
        threshold: f64,
    ) -> Result<Self> {
        if alpha.len() != template_id.len() || lambda.len() != template_id.len() {
            return Err(Error::Calibration(format!(
                "fit coefficient length mismatch: template_id={}, fit_coeff={}, count_above_thresh={}",
                template_id.len(),
                alpha.len(),
                lambda.len()
            )));
        }
        let mut order: Vec<usize> = (0..template_id.len()).collect();
        order.sort_by(|&a, &b| template_id[a].total_cmp(&template_id[b]));

        Ok(Self {
            template_ids: order.iter().map(|&i| template_id[i]).collect(),
            alpha: order.iter().map(|&i| alpha[i]).collect(),
            lambda: order.iter().map(|&i| lambda[i]).collect(),
            threshold,
        })
    }

    /// Read `template_id`, `fit_coeff`, `count_above_thresh` and the
    /// `stat_threshold` attribute from a fit-coefficient table.
    pub fn from_table(table: &CalibrationTable) -> Result<Self> {
        Self::from_unsorted(
            table.array_1d("template_id")?,
            table.array_1d("fit_coeff")?,
            table.array_1d("count_above_thresh")?,
            table.attr_f64("stat_threshold")?,
        )
    }

    /// Sorted template ids.
    pub fn template_ids(&self) -> &[f64] {
        &self.template_ids
    }

    /// Exponential slopes in template-id order.
    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    /// Relative trigger rates in template-id order.
    pub fn lambda(&self) -> &[f64] {
        &self.lambda
    }

    /// Statistic threshold the fits were made above.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.alpha.len()
    }

    /// Whether no templates were fitted.
    pub fn is_empty(&self) -> bool {
        self.alpha.is_empty()
    }

    /// `(alpha, lambda)` of the template at sorted position `template`.
    pub fn get(&self, template: usize) -> Option<(f64, f64)> {
        Some((*self.alpha.get(template)?, *self.lambda.get(template)?))
    }
}

/// Fit coefficients of every detector found in a calibration store.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpFitModel {
    fits: BTreeMap<String, FitCoefficients>,
}

impl ExpFitModel {
    /// Collect all `<detector>-fit_coeffs` tables.
    ///
    /// Fails if the store is empty or no table follows the naming convention.
    pub fn from_store(store: &CalibrationStore) -> Result<Self> {
        if store.is_empty() {
            return Err(Error::Calibration("can't find any statistic files".into()));
        }
        let mut fits = BTreeMap::new();
        for (tag, table) in store.iter() {
            let Some(ifo) = detector_of_tag(tag) else {
                continue;
            };
            let coeffs = FitCoefficients::from_table(table)?;
            tracing::debug!(
                ifo,
                n_templates = coeffs.len(),
                threshold = coeffs.threshold(),
                "fit coefficients loaded"
            );
            fits.insert(ifo.to_string(), coeffs);
        }
        if fits.is_empty() {
            return Err(Error::Calibration(format!(
                "none of the statistic files has the required attribute called {{ifo}}-{FIT_COEFFS_TAG}, got {:?}",
                store.tags().collect::<Vec<_>>()
            )));
        }
        Ok(Self { fits })
    }

    /// Build directly from per-detector coefficients.
    pub fn from_fits(fits: impl IntoIterator<Item = (String, FitCoefficients)>) -> Result<Self> {
        let fits: BTreeMap<_, _> = fits.into_iter().collect();
        if fits.is_empty() {
            return Err(Error::Calibration("no fit coefficients supplied".into()));
        }
        Ok(Self { fits })
    }

    /// Detectors with fits, sorted.
    pub fn ifos(&self) -> impl Iterator<Item = &str> {
        self.fits.keys().map(String::as_str)
    }

    /// Coefficients of one detector.
    pub fn fits(&self, ifo: &str) -> Option<&FitCoefficients> {
        self.fits.get(ifo)
    }

    /// `(alpha, lambda, threshold)` for a detector and sorted template position.
    pub fn lookup(&self, ifo: &str, template: usize) -> Result<(f64, f64, f64)> {
        let coeffs = self
            .fits(ifo)
            .ok_or_else(|| Error::Validation(format!("no fit coefficients for detector '{ifo}'")))?;
        let (alpha, lambda) = coeffs.get(template).ok_or_else(|| {
            Error::Validation(format!(
                "template index {template} out of range for detector '{ifo}' ({} templates)",
                coeffs.len()
            ))
        })?;
        Ok((alpha, lambda, coeffs.threshold()))
    }

    /// `Σ threshold²/2` over all detectors.
    pub fn threshold_term(&self) -> f64 {
        self.fits.values().map(|f| f.threshold() * f.threshold() / 2.0).sum()
    }
}
