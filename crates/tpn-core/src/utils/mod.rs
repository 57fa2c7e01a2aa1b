use serde::{Deserialize, Serialize};

use crate::{TpnError, TpnResult};

/// Useful enumerations for particle species and detector channels.
pub mod enums;
/// A plain three-vector used for momenta and positions.
pub mod vectors;

/// A helper method to get histogram edges from evenly-spaced `bins` over a given `range`
/// # See Also
/// [`Histogram`]
/// [`get_bin_index`]
pub fn get_bin_edges(bins: usize, range: (f64, f64)) -> Vec<f64> {
    let bin_width = (range.1 - range.0) / (bins as f64);
    (0..=bins)
        .map(|i| range.0 + (i as f64 * bin_width))
        .collect()
}

/// A helper method to obtain the index of a bin where a value should go in a histogram with evenly
/// spaced `bins` over a given `range`. The last bin is closed, so a value on the upper edge lands in
/// it.
///
/// # See Also
/// [`Histogram`]
/// [`get_bin_edges`]
pub fn get_bin_index(value: f64, bins: usize, limits: (f64, f64)) -> Option<usize> {
    if value >= limits.0 && value <= limits.1 {
        let bin_width = (limits.1 - limits.0) / bins as f64;
        let bin_index = ((value - limits.0) / bin_width).floor() as usize;
        Some(bin_index.min(bins - 1))
    } else {
        None
    }
}

fn check_binning(bins: usize, range: (f64, f64)) -> TpnResult<()> {
    if bins == 0 || !(range.1 > range.0) {
        return Err(TpnError::InvalidBinning {
            bins,
            lower: range.0,
            upper: range.1,
        });
    }
    Ok(())
}

/// A simple struct which represents a histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// The number of counts in each bin
    pub counts: Vec<f64>,
    /// The edges of each bin (length is one greater than `counts`)
    pub bin_edges: Vec<f64>,
}

impl Histogram {
    /// Total number of entries which landed inside the range.
    pub fn entries(&self) -> f64 {
        self.counts.iter().sum()
    }
}

/// A method which creates a histogram from some data by binning it with evenly spaced `bins` within
/// the given `range`. Values outside the range (including the `-9999` sentinel) are dropped.
pub fn histogram<T: AsRef<[f64]>>(values: T, bins: usize, range: (f64, f64)) -> TpnResult<Histogram> {
    check_binning(bins, range)?;
    let mut counts = vec![0.0; bins];
    for &value in values.as_ref() {
        if let Some(bin_index) = get_bin_index(value, bins, range) {
            counts[bin_index] += 1.0;
        }
    }
    Ok(Histogram {
        counts,
        bin_edges: get_bin_edges(bins, range),
    })
}

/// A two-dimensional histogram with row-major counts (`counts[x_bin][y_bin]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram2d {
    /// Counts indexed by `[x_bin][y_bin]`
    pub counts: Vec<Vec<f64>>,
    /// Edges along the x-axis
    pub x_edges: Vec<f64>,
    /// Edges along the y-axis
    pub y_edges: Vec<f64>,
}

/// Bin paired `(x, y)` values into a [`Histogram2d`]. Pairs with either coordinate outside its
/// range are dropped.
pub fn histogram2d(
    x: &[f64],
    y: &[f64],
    x_binning: (usize, (f64, f64)),
    y_binning: (usize, (f64, f64)),
) -> TpnResult<Histogram2d> {
    let (x_bins, x_range) = x_binning;
    let (y_bins, y_range) = y_binning;
    check_binning(x_bins, x_range)?;
    check_binning(y_bins, y_range)?;
    if x.len() != y.len() {
        return Err(TpnError::LengthMismatch {
            context: "2D histogram coordinates".to_string(),
            expected: x.len(),
            actual: y.len(),
        });
    }
    let mut counts = vec![vec![0.0; y_bins]; x_bins];
    for (&xv, &yv) in x.iter().zip(y) {
        if let (Some(i), Some(j)) = (
            get_bin_index(xv, x_bins, x_range),
            get_bin_index(yv, y_bins, y_range),
        ) {
            counts[i][j] += 1.0;
        }
    }
    Ok(Histogram2d {
        counts,
        x_edges: get_bin_edges(x_bins, x_range),
        y_edges: get_bin_edges(y_bins, y_range),
    })
}
