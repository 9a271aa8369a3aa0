//! Core traits for coincrank
//!
//! Every ranking statistic exposes the same two-step capability: reduce one
//! detector's triggers to per-event features, then combine two detectors'
//! features into a coincident ranking value. Pipelines depend only on this
//! trait, never on a concrete statistic.

use crate::Result;
use crate::types::{SingleFeature, TriggerBatch};

/// Ranking statistic capability.
pub trait RankingStatistic: Send + Sync {
    /// Registry name of the statistic (e.g. `"newsnr"`).
    fn name(&self) -> &'static str;

    /// Compute the single-detector features for one batch of triggers.
    fn single(&self, trigs: &TriggerBatch) -> Result<SingleFeature>;

    /// Combine two aligned feature arrays into coincident ranking values.
    ///
    /// `slide` holds, per coincidence, the number of time-slide steps of `step`
    /// seconds separating the two detectors; a single entry applies to every
    /// coincidence. Statistics that do not use timing ignore both.
    fn coinc(
        &self,
        s1: &SingleFeature,
        s2: &SingleFeature,
        slide: &[i64],
        step: f64,
    ) -> Result<Vec<f64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstStatistic;

    impl RankingStatistic for ConstStatistic {
        fn name(&self) -> &'static str {
            "const"
        }

        fn single(&self, trigs: &TriggerBatch) -> Result<SingleFeature> {
            Ok(SingleFeature::Values(vec![1.0; trigs.n_events()]))
        }

        fn coinc(
            &self,
            s1: &SingleFeature,
            _s2: &SingleFeature,
            _slide: &[i64],
            _step: f64,
        ) -> Result<Vec<f64>> {
            Ok(vec![0.0; s1.len()])
        }
    }

    #[test]
    fn test_trait_object_dispatch() {
        let stat: Box<dyn RankingStatistic> = Box::new(ConstStatistic);
        let trigs =
            TriggerBatch::from_columns(vec![("snr".to_string(), vec![5.0, 6.0])]).unwrap();
        let s = stat.single(&trigs).unwrap();
        assert_eq!(stat.name(), "const");
        assert_eq!(stat.coinc(&s, &s, &[0], 0.0).unwrap().len(), 2);
    }
}
