//! Ascending bin edges with saturating bin lookup.

use cr_core::{Error, Result};

/// Strictly ascending bin edges (at least two, i.e. at least one bin).
#[derive(Debug, Clone, PartialEq)]
pub struct BinEdges {
    edges: Vec<f64>,
}

impl BinEdges {
    /// Validate and wrap bin edges. `name` is used in error messages.
    pub fn new(name: &str, edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(Error::Calibration(format!(
                "bin edges '{name}' need at least 2 entries, got {}",
                edges.len()
            )));
        }
        if let Some(i) = edges.iter().position(|e| e.is_nan()) {
            return Err(Error::Calibration(format!("bin edges '{name}'[{i}] is NaN")));
        }
        for (i, w) in edges.windows(2).enumerate() {
            if w[0] >= w[1] {
                return Err(Error::Calibration(format!(
                    "bin edges '{name}' must be strictly ascending, got [{i}]={} and [{}]={}",
                    w[0],
                    i + 1,
                    w[1]
                )));
            }
        }
        Ok(Self { edges })
    }

    /// Edge values.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Number of bins (`edges - 1`).
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Leftmost insertion point of `x`: the number of edges strictly below it.
    ///
    /// NaN sorts after every edge.
    pub fn searchsorted(&self, x: f64) -> usize {
        if x.is_nan() {
            return self.edges.len();
        }
        self.edges.partition_point(|e| *e < x)
    }

    /// Bin holding `x`, saturated to the first or last bin outside the edges.
    ///
    /// Always in `0..=n_bins() - 1`.
    pub fn bin_index(&self, x: f64) -> usize {
        self.searchsorted(x).saturating_sub(1).min(self.edges.len() - 2)
    }
}
