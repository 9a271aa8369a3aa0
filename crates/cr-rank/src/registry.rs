//! Name → statistic registry.

use crate::calibration::CalibrationStore;
use crate::stat::Statistic;
use cr_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registered statistic kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatisticKind {
    /// `newsnr`
    #[serde(rename = "newsnr")]
    NewSnr,
    /// `newsnr_cut`
    #[serde(rename = "newsnr_cut")]
    NewSnrCut,
    /// `phasetd_newsnr`
    #[serde(rename = "phasetd_newsnr")]
    PhaseTd,
    /// `exp_fit_stat`
    #[serde(rename = "exp_fit_stat")]
    ExpFit,
    /// `exp_fit_csnr`
    #[serde(rename = "exp_fit_csnr")]
    ExpFitCombinedSnr,
    /// `max_cont_trad_newsnr`
    #[serde(rename = "max_cont_trad_newsnr")]
    MaxContTradNewSnr,
}

impl StatisticKind {
    /// Every registered kind, in registry order.
    pub const ALL: [Self; 6] = [
        Self::NewSnr,
        Self::NewSnrCut,
        Self::PhaseTd,
        Self::ExpFit,
        Self::ExpFitCombinedSnr,
        Self::MaxContTradNewSnr,
    ];

    /// Registry name.
    pub fn name(self) -> &'static str {
        match self {
            Self::NewSnr => "newsnr",
            Self::NewSnrCut => "newsnr_cut",
            Self::PhaseTd => "phasetd_newsnr",
            Self::ExpFit => "exp_fit_stat",
            Self::ExpFitCombinedSnr => "exp_fit_csnr",
            Self::MaxContTradNewSnr => "max_cont_trad_newsnr",
        }
    }

    /// Whether construction reads calibration tables.
    pub fn needs_calibration(self) -> bool {
        matches!(self, Self::PhaseTd | Self::ExpFit | Self::ExpFitCombinedSnr)
    }

    /// Build the statistic from a calibration store.
    pub fn build(self, store: &CalibrationStore) -> Result<Statistic> {
        Statistic::from_store(self, store)
    }
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StatisticKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| Error::UnknownStatistic(s.to_string()))
    }
}

/// Look up a statistic kind by name.
pub fn get_statistic(name: &str) -> Result<StatisticKind> {
    name.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_names_roundtrip() {
        for kind in StatisticKind::ALL {
            assert_eq!(get_statistic(kind.name()).unwrap(), kind);
            assert_eq!(kind.to_string(), kind.name());
        }
    }

    #[test]
    fn test_unknown_name_reported() {
        let err = get_statistic("newsnr_sgveto").unwrap_err();
        assert!(matches!(err, Error::UnknownStatistic(ref s) if s == "newsnr_sgveto"));
        assert_eq!(err.to_string(), "newsnr_sgveto is not an available detection statistic");
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert!(get_statistic("NewSNR").is_err());
        assert!(get_statistic("").is_err());
    }

    #[test]
    fn test_serde_uses_registry_names() {
        let json = serde_json::to_string(&StatisticKind::ExpFitCombinedSnr).unwrap();
        assert_eq!(json, "\"exp_fit_csnr\"");
        let kind: StatisticKind = serde_json::from_str("\"phasetd_newsnr\"").unwrap();
        assert_eq!(kind, StatisticKind::PhaseTd);
    }

    #[test]
    fn test_needs_calibration() {
        assert!(!StatisticKind::NewSnr.needs_calibration());
        assert!(StatisticKind::PhaseTd.needs_calibration());
        assert!(StatisticKind::ExpFitCombinedSnr.needs_calibration());
    }
}
