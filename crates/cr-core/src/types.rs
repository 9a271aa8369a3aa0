//! Common data types for coincrank

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known trigger column names.
pub mod fields {
    /// Matched-filter signal-to-noise ratio.
    pub const SNR: &str = "snr";
    /// Power chi-square.
    pub const CHISQ: &str = "chisq";
    /// Number of power chi-square bins.
    pub const CHISQ_DOF: &str = "chisq_dof";
    /// Auto chi-square.
    pub const CONT_CHISQ: &str = "cont_chisq";
    /// Auto chi-square degrees of freedom.
    pub const CONT_CHISQ_DOF: &str = "cont_chisq_dof";
    /// Coalescence phase (radians).
    pub const COA_PHASE: &str = "coa_phase";
    /// Trigger end time (seconds).
    pub const END_TIME: &str = "end_time";
    /// Template normalization (squared sensitivity).
    pub const SIGMASQ: &str = "sigmasq";
    /// Veto criterion consulted by the cut statistic.
    pub const VETO_CHISQ_RATIO: &str = "veto_chisq_ratio";
}

/// Template association of a trigger batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateIndex {
    /// Every trigger in the batch came from the same template.
    Batch(usize),
    /// One template index per trigger.
    PerEvent(Vec<usize>),
}

/// Columnar single-detector trigger data.
///
/// All columns have the same length, checked at construction. The batch is
/// read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TriggerBatchRepr", into = "TriggerBatchRepr")]
pub struct TriggerBatch {
    n_events: usize,
    columns: BTreeMap<String, Vec<f64>>,
    ifo: Option<String>,
    template: Option<TemplateIndex>,
}

#[derive(Serialize, Deserialize)]
struct TriggerBatchRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ifo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    template: Option<TemplateIndex>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl TryFrom<TriggerBatchRepr> for TriggerBatch {
    type Error = Error;

    fn try_from(repr: TriggerBatchRepr) -> Result<Self> {
        let mut batch = Self::from_columns(repr.columns)?;
        batch.ifo = repr.ifo;
        if let Some(template) = repr.template {
            batch = batch.with_template(template)?;
        }
        Ok(batch)
    }
}

impl From<TriggerBatch> for TriggerBatchRepr {
    fn from(batch: TriggerBatch) -> Self {
        Self { ifo: batch.ifo, template: batch.template, columns: batch.columns }
    }
}

impl TriggerBatch {
    /// Build a batch from named columns, rejecting columns of unequal length.
    pub fn from_columns(columns: impl IntoIterator<Item = (String, Vec<f64>)>) -> Result<Self> {
        let mut by_name = BTreeMap::new();
        let mut n_events: Option<(usize, String)> = None;
        for (name, col) in columns {
            match &n_events {
                Some((n, first)) if *n != col.len() => {
                    return Err(Error::Validation(format!(
                        "column length mismatch for '{name}': expected {n} (from '{first}'), got {}",
                        col.len()
                    )));
                }
                Some(_) => {}
                None => n_events = Some((col.len(), name.clone())),
            }
            by_name.insert(name, col);
        }
        let n_events = n_events.map(|(n, _)| n).unwrap_or(0);
        Ok(Self { n_events, columns: by_name, ifo: None, template: None })
    }

    /// Tag the batch with the detector it came from.
    pub fn with_ifo(mut self, ifo: impl Into<String>) -> Self {
        self.ifo = Some(ifo.into());
        self
    }

    /// Associate the batch with template indices.
    ///
    /// Per-event indices must match the number of triggers.
    pub fn with_template(mut self, template: TemplateIndex) -> Result<Self> {
        if let TemplateIndex::PerEvent(ids) = &template
            && ids.len() != self.n_events
        {
            return Err(Error::Validation(format!(
                "template index length mismatch: expected {}, got {}",
                self.n_events,
                ids.len()
            )));
        }
        self.template = Some(template);
        Ok(self)
    }

    /// Number of triggers.
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// Detector identifier, if set.
    pub fn ifo(&self) -> Option<&str> {
        self.ifo.as_deref()
    }

    /// Template association, if set.
    pub fn template(&self) -> Option<&TemplateIndex> {
        self.template.as_ref()
    }

    /// Template index of trigger `event`.
    pub fn template_for(&self, event: usize) -> Option<usize> {
        match self.template.as_ref()? {
            TemplateIndex::Batch(t) => (event < self.n_events).then_some(*t),
            TemplateIndex::PerEvent(ids) => ids.get(event).copied(),
        }
    }

    /// Column names in stable order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Get a column by name, failing with a validation error if it is absent.
    pub fn require(&self, name: &str) -> Result<&[f64]> {
        self.column(name).ok_or_else(|| {
            Error::Validation(format!("trigger batch is missing required column '{name}'"))
        })
    }
}

/// One PhaseTD single-detector row: `[newsnr, phase, time, sqrt(sigmasq), snr]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseTdRow {
    /// Re-weighted SNR.
    pub newsnr: f64,
    /// Coalescence phase (radians).
    pub coa_phase: f64,
    /// End time (seconds).
    pub end_time: f64,
    /// Square root of the template normalization.
    pub sigma: f64,
    /// Raw SNR.
    pub snr: f64,
}

impl PhaseTdRow {
    /// Fixed column layout of the row.
    pub fn to_array(self) -> [f64; 5] {
        [self.newsnr, self.coa_phase, self.end_time, self.sigma, self.snr]
    }

    /// Build a row from the fixed column layout.
    pub fn from_array(row: [f64; 5]) -> Self {
        let [newsnr, coa_phase, end_time, sigma, snr] = row;
        Self { newsnr, coa_phase, end_time, sigma, snr }
    }
}

/// Output of a statistic's single-detector step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SingleFeature {
    /// One scalar per trigger.
    Values(Vec<f32>),
    /// One PhaseTD row per trigger.
    PhaseTd(Vec<PhaseTdRow>),
}

impl SingleFeature {
    /// Number of triggers represented.
    pub fn len(&self) -> usize {
        match self {
            Self::Values(v) => v.len(),
            Self::PhaseTd(rows) => rows.len(),
        }
    }

    /// Whether the feature holds no triggers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scalar values, or a validation error for row features.
    pub fn as_values(&self) -> Result<&[f32]> {
        match self {
            Self::Values(v) => Ok(v),
            Self::PhaseTd(_) => {
                Err(Error::Validation("expected scalar features, got PhaseTD rows".into()))
            }
        }
    }

    /// PhaseTD rows, or a validation error for scalar features.
    pub fn as_rows(&self) -> Result<&[PhaseTdRow]> {
        match self {
            Self::PhaseTd(rows) => Ok(rows),
            Self::Values(_) => {
                Err(Error::Validation("expected PhaseTD rows, got scalar features".into()))
            }
        }
    }
}
