//! # cr-rank
//!
//! Coincident ranking statistics.
//!
//! This crate provides:
//! - The re-weighted SNR primitive and the single-detector reducer built on it.
//! - Value-typed calibration tables keyed by their `stat` tag.
//! - Six ranking statistics behind [`cr_core::RankingStatistic`], selected by
//!   name through the [`registry`].
//!
//! ```
//! use cr_core::{RankingStatistic, TriggerBatch};
//! use cr_rank::{CalibrationStore, Statistic};
//!
//! let stat = Statistic::from_name("newsnr", &CalibrationStore::empty()).unwrap();
//! let trigs = TriggerBatch::from_columns(vec![
//!     ("snr".to_string(), vec![6.0]),
//!     ("chisq".to_string(), vec![8.0]),
//!     ("chisq_dof".to_string(), vec![5.0]),
//! ])
//! .unwrap();
//! let s1 = stat.single(&trigs).unwrap();
//! let ranked = stat.coinc(&s1, &s1, &[0], 0.0).unwrap();
//! assert_eq!(ranked.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bins;
pub mod calibration;
pub mod fits;
pub mod histogram;
pub mod registry;
pub mod reweight;
pub mod stat;

pub use bins::BinEdges;
pub use calibration::{AttrValue, CalibrationStore, CalibrationTable, NdArray};
pub use fits::{ExpFitModel, FitCoefficients};
pub use histogram::PhaseTdHistogram;
pub use registry::{StatisticKind, get_statistic};
pub use reweight::{get_newsnr, newsnr};
pub use stat::{
    CoincGeometry, ExpFitCombinedSnr, ExpFitStatistic, MaxContTradNewSnrStatistic,
    NewSnrCutStatistic, NewSnrStatistic, PhaseTdStatistic, Statistic,
};
