use auto_ops::impl_op_ex;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::{
    config::CutFlowConfig,
    table::{Column, FrozenTable},
    TpnError, TpnResult,
};

/// A lazy iterator over `(cut, efficiency)` pairs produced by [`threshold_scan`].
///
/// Cuts are computed as `min + i * step` rather than by repeated addition, so the sequence does
/// not drift. The iterator is [`Clone`], so a scan can be restarted from the beginning.
#[derive(Debug, Clone)]
pub struct ThresholdScan<'a> {
    values: &'a [f64],
    min: f64,
    max: f64,
    step: f64,
    invert: bool,
    index: usize,
}

impl ThresholdScan<'_> {
    /// Collect the scan into separate cut and efficiency vectors.
    pub fn unzip(self) -> (Vec<f64>, Vec<f64>) {
        Iterator::unzip(self)
    }

    fn efficiency(&self, cut: f64) -> f64 {
        let passing = if self.invert {
            self.values.iter().filter(|v| **v > cut).count()
        } else {
            self.values.iter().filter(|v| **v < cut).count()
        };
        passing as f64 / self.values.len() as f64 * 100.0
    }
}

impl Iterator for ThresholdScan<'_> {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let cut = self.min + self.index as f64 * self.step;
        if cut > self.max {
            return None;
        }
        self.index += 1;
        Some((cut, self.efficiency(cut)))
    }
}

/// Scan a cut value from `min` to `max` (inclusive) in increments of `step`, yielding the
/// percentage of `values` strictly below each cut (or strictly above it if `invert` is set).
///
/// # Errors
///
/// Returns [`TpnError::EmptyDenominator`] if `values` is empty, [`TpnError::InvalidStep`] if
/// `step` is not a positive, finite number and [`TpnError::InvalidScanRange`] if `min` or `max`
/// is not finite.
pub fn threshold_scan(
    values: &[f64],
    min: f64,
    max: f64,
    step: f64,
    invert: bool,
) -> TpnResult<ThresholdScan<'_>> {
    if values.is_empty() {
        return Err(TpnError::EmptyDenominator {
            context: "threshold scan".to_string(),
        });
    }
    if !(step.is_finite() && step > 0.0) {
        return Err(TpnError::InvalidStep { step });
    }
    if !(min.is_finite() && max.is_finite()) {
        return Err(TpnError::InvalidScanRange { min, max });
    }
    Ok(ThresholdScan {
        values,
        min,
        max,
        step,
        invert,
        index: 0,
    })
}

/// A per-event boolean selection over a [`FrozenTable`].
///
/// Masks combine with `&`, `|` and `!`. Binary operators work element-wise over the shorter of
/// the two operands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mask(Vec<bool>);

impl Mask {
    /// Select every row of `column` for which `predicate` holds.
    pub fn from_column<F>(table: &FrozenTable, column: Column, predicate: F) -> Self
    where
        F: Fn(f64) -> bool,
    {
        Self(table.column(column).iter().map(|v| predicate(*v)).collect())
    }

    /// A mask selecting every one of `len` rows.
    pub fn all(len: usize) -> Self {
        Self(vec![true; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of selected rows.
    pub fn count(&self) -> usize {
        self.0.iter().filter(|b| **b).count()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// The values at the selected positions, in order.
    pub fn select(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .zip(&self.0)
            .filter_map(|(value, keep)| keep.then_some(*value))
            .collect()
    }

    /// The selected count over the total count.
    pub fn pass_fraction(&self) -> PassFraction {
        PassFraction {
            pass: self.count(),
            total: self.len(),
        }
    }
}

impl From<Vec<bool>> for Mask {
    fn from(value: Vec<bool>) -> Self {
        Self(value)
    }
}

#[rustfmt::skip]
impl_op_ex!(& |a: &Mask, b: &Mask| -> Mask { Mask(a.0.iter().zip(&b.0).map(|(x, y)| *x && *y).collect()) });
#[rustfmt::skip]
impl_op_ex!(| |a: &Mask, b: &Mask| -> Mask { Mask(a.0.iter().zip(&b.0).map(|(x, y)| *x || *y).collect()) });
#[rustfmt::skip]
impl_op_ex!(! |a: &Mask| -> Mask { Mask(a.0.iter().map(|x| !x).collect()) });

/// A count of passing events out of a total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassFraction {
    pub pass: usize,
    pub total: usize,
}

impl PassFraction {
    /// The passing fraction in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`TpnError::EmptyDenominator`] when `total` is zero.
    pub fn fraction(&self) -> TpnResult<f64> {
        if self.total == 0 {
            return Err(TpnError::EmptyDenominator {
                context: "pass fraction".to_string(),
            });
        }
        Ok(self.pass as f64 / self.total as f64)
    }

    /// The passing fraction as a percentage.
    pub fn percent(&self) -> TpnResult<f64> {
        Ok(self.fraction()? * 100.0)
    }
}

impl Display for PassFraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.fraction() {
            Ok(fraction) => write!(f, "{}/{} = {}", self.pass, self.total, fraction),
            Err(_) => write!(f, "{}/{} = undefined", self.pass, self.total),
        }
    }
}

/// The standard per-event selections used to slice histograms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VetoMasks {
    /// Exactly one full track.
    pub single_track: Mask,
    /// The ECal veto passed.
    pub ecal_veto: Mask,
    /// The HCal veto passed.
    pub hcal_veto: Mask,
    /// All three of the above.
    pub basic_veto: Mask,
}

impl VetoMasks {
    pub fn from_table(table: &FrozenTable) -> Self {
        let single_track = Mask::from_column(table, Column::TrackCount, |v| v == 1.0);
        let ecal_veto = Mask::from_column(table, Column::PassesEcalVeto, |v| v == 1.0);
        let hcal_veto = Mask::from_column(table, Column::PassesHcalVeto, |v| v == 1.0);
        let basic_veto = &single_track & &ecal_veto & &hcal_veto;
        Self {
            single_track,
            ecal_veto,
            hcal_veto,
            basic_veto,
        }
    }

    /// Labelled selections in plotting order, starting with every event.
    pub fn labelled(&self) -> [(&'static str, Mask); 5] {
        [
            ("All", Mask::all(self.single_track.len())),
            ("Single track", self.single_track.clone()),
            ("Hcal veto", self.hcal_veto.clone()),
            ("Ecal veto", self.ecal_veto.clone()),
            ("Basic veto", self.basic_veto.clone()),
        ]
    }
}

/// The five headline veto efficiencies.
#[derive(Debug, Clone, PartialEq)]
pub struct EfficiencySummary {
    pub lines: Vec<(String, PassFraction)>,
}

impl EfficiencySummary {
    /// Compute the summary over a finalized table.
    ///
    /// # Errors
    ///
    /// Returns [`TpnError::EmptyDenominator`] for a table without events.
    pub fn from_table(table: &FrozenTable) -> TpnResult<Self> {
        if table.n_events() == 0 {
            return Err(TpnError::EmptyDenominator {
                context: "veto efficiency summary".to_string(),
            });
        }
        let masks = VetoMasks::from_table(table);
        let single_stub = Mask::from_column(table, Column::StubCount, |v| v == 1.0);
        let lines = vec![
            ("Events that pass track veto", masks.single_track.pass_fraction()),
            ("Events passing stub veto", single_stub.pass_fraction()),
            ("Events passing Ecal veto", masks.ecal_veto.pass_fraction()),
            ("Events passing Hcal veto", masks.hcal_veto.pass_fraction()),
            ("Events passing veto", masks.basic_veto.pass_fraction()),
        ]
        .into_iter()
        .map(|(label, fraction)| (label.to_string(), fraction))
        .collect();
        Ok(Self { lines })
    }
}

impl Display for EfficiencySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (label, fraction) in &self.lines {
            writeln!(f, "{label}: {fraction}")?;
        }
        Ok(())
    }
}

/// A sequence of selections reported with their surviving counts.
#[derive(Debug, Clone, PartialEq)]
pub struct CutFlow {
    pub total: usize,
    pub steps: Vec<(String, PassFraction)>,
}

impl CutFlow {
    /// Apply the individual and cumulative selections configured in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TpnError::EmptyDenominator`] for a table without events.
    pub fn from_table(table: &FrozenTable, config: &CutFlowConfig) -> TpnResult<Self> {
        let total = table.n_events();
        if total == 0 {
            return Err(TpnError::EmptyDenominator {
                context: "cut flow".to_string(),
            });
        }
        let down_tp = Mask::from_column(table, Column::DownTpEnergy, |v| v < config.down_tp_max);
        let up_tp = Mask::from_column(table, Column::UpTpEnergy, |v| v < config.up_tp_max);
        let track = Mask::from_column(table, Column::TrackCount, |v| v == config.track_count);
        let back_scatter = Mask::from_column(table, Column::AxialCount, |v| v <= config.axial_max);
        let stub = Mask::from_column(table, Column::StubCount, |v| v <= config.stub_max);
        let hcal_pe = Mask::from_column(table, Column::TotalHcalPe, |v| v <= config.hcal_pe_max);
        let ecal = Mask::from_column(table, Column::PassesEcalVeto, |v| v == 1.0);

        let upstream = &down_tp & &track & &up_tp & &stub & &back_scatter;
        let with_hcal = &upstream & &hcal_pe;
        let with_ecal = &with_hcal & &ecal;

        let steps = vec![
            ("Down TP veto", down_tp),
            ("Up TP veto", up_tp),
            ("Track veto", track),
            ("Back-scatter veto", back_scatter),
            ("Hcal PE veto", hcal_pe),
            ("Upstream veto", upstream),
            ("Upstream veto + hcal", with_hcal),
            ("Upstream veto + hcal + ecal bdt", with_ecal),
        ]
        .into_iter()
        .map(|(label, mask)| (label.to_string(), mask.pass_fraction()))
        .collect();
        Ok(Self { total, steps })
    }
}

impl Display for CutFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total events: {}", self.total)?;
        for (label, fraction) in &self.steps {
            let percent = fraction.percent().unwrap_or(f64::NAN);
            writeln!(f, "{label}: {} ({percent:.4}%)", fraction.pass)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{FeatureRow, FeatureTable};
    use approx::assert_relative_eq;

    const NO_HITS: [f64; 0] = [];

    fn table_from(rows: &[FeatureRow]) -> FrozenTable {
        let mut table = FeatureTable::new();
        for row in rows {
            table.append(row, NO_HITS, NO_HITS);
        }
        table.finalize()
    }

    fn vetoed(track: f64, stub: f64, ecal: f64, hcal: f64) -> FeatureRow {
        FeatureRow {
            track_count: track,
            stub_count: stub,
            passes_ecal_veto: ecal,
            passes_hcal_veto: hcal,
            ..Default::default()
        }
    }

    #[test]
    fn test_threshold_scan_fixed_points() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (cuts, efficiencies) = threshold_scan(&values, 0.0, 5.0, 1.0, false)
            .unwrap()
            .unzip();
        assert_eq!(cuts, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        // a value equal to the cut does not pass
        assert_eq!(efficiencies, vec![0.0, 0.0, 20.0, 40.0, 60.0, 80.0]);
        assert!(efficiencies.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_threshold_scan_inverted() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (_, efficiencies) = threshold_scan(&values, 0.0, 5.0, 1.0, true)
            .unwrap()
            .unzip();
        assert_eq!(efficiencies, vec![100.0, 80.0, 60.0, 40.0, 20.0, 0.0]);
    }

    #[test]
    fn test_threshold_scan_does_not_drift() {
        let values = [0.5];
        let scan = threshold_scan(&values, 0.0, 1.0, 0.1, false).unwrap();
        let cuts: Vec<f64> = scan.clone().map(|(cut, _)| cut).collect();
        assert_eq!(cuts.len(), 11);
        assert_relative_eq!(cuts[10], 1.0);
        assert_eq!(scan.count(), 11);
    }

    #[test]
    fn test_threshold_scan_errors() {
        assert!(matches!(
            threshold_scan(&[], 0.0, 1.0, 0.1, false),
            Err(TpnError::EmptyDenominator { .. })
        ));
        assert!(matches!(
            threshold_scan(&[1.0], 0.0, 1.0, 0.0, false),
            Err(TpnError::InvalidStep { .. })
        ));
        assert!(matches!(
            threshold_scan(&[1.0], 0.0, 1.0, f64::NAN, false),
            Err(TpnError::InvalidStep { .. })
        ));
        assert_eq!(threshold_scan(&[1.0], 2.0, 1.0, 0.5, false).unwrap().count(), 0);
    }

    #[test]
    fn test_threshold_scan_rejects_unbounded_range() {
        assert!(matches!(
            threshold_scan(&[1.0], f64::NAN, 1.0, 0.5, false),
            Err(TpnError::InvalidScanRange { .. })
        ));
        assert!(matches!(
            threshold_scan(&[1.0], 0.0, f64::INFINITY, 0.5, false),
            Err(TpnError::InvalidScanRange { .. })
        ));
        assert!(matches!(
            threshold_scan(&[1.0], f64::NEG_INFINITY, 1.0, 0.5, true),
            Err(TpnError::InvalidScanRange { .. })
        ));
    }

    #[test]
    fn test_mask_operators() {
        let a = Mask::from(vec![true, true, false, false]);
        let b = Mask::from(vec![true, false, true, false]);
        assert_eq!((&a & &b).as_slice(), &[true, false, false, false]);
        assert_eq!((&a | &b).as_slice(), &[true, true, true, false]);
        assert_eq!((!&a).as_slice(), &[false, false, true, true]);
        assert_eq!((a.clone() & b.clone()).count(), 1);
        assert_eq!(a.select(&[1.0, 2.0, 3.0, 4.0]), vec![1.0, 2.0]);
    }

    #[test]
    fn test_pass_fraction() {
        let fraction = PassFraction { pass: 3, total: 4 };
        assert_relative_eq!(fraction.fraction().unwrap(), 0.75);
        assert_eq!(fraction.to_string(), "3/4 = 0.75");
        let empty = PassFraction { pass: 0, total: 0 };
        assert!(matches!(
            empty.fraction(),
            Err(TpnError::EmptyDenominator { .. })
        ));
        assert_eq!(empty.to_string(), "0/0 = undefined");
    }

    #[test]
    fn test_efficiency_summary() {
        let table = table_from(&[
            vetoed(1.0, 1.0, 1.0, 1.0),
            vetoed(1.0, 0.0, 1.0, 0.0),
            vetoed(2.0, 1.0, 0.0, 1.0),
            vetoed(0.0, 2.0, 1.0, 1.0),
        ]);
        let summary = EfficiencySummary::from_table(&table).unwrap();
        let text = summary.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Events that pass track veto: 2/4 = 0.5",
                "Events passing stub veto: 2/4 = 0.5",
                "Events passing Ecal veto: 3/4 = 0.75",
                "Events passing Hcal veto: 3/4 = 0.75",
                "Events passing veto: 1/4 = 0.25",
            ]
        );
        assert!(matches!(
            EfficiencySummary::from_table(&table_from(&[])),
            Err(TpnError::EmptyDenominator { .. })
        ));
    }

    #[test]
    fn test_veto_masks_labels() {
        let table = table_from(&[vetoed(1.0, 0.0, 1.0, 0.0), vetoed(1.0, 0.0, 1.0, 1.0)]);
        let masks = VetoMasks::from_table(&table);
        let labelled = masks.labelled();
        let labels: Vec<&str> = labelled.iter().map(|(label, _)| *label).collect();
        assert_eq!(
            labels,
            vec!["All", "Single track", "Hcal veto", "Ecal veto", "Basic veto"]
        );
        let counts: Vec<usize> = labelled.iter().map(|(_, mask)| mask.count()).collect();
        assert_eq!(counts, vec![2, 2, 1, 2, 1]);
    }

    #[test]
    fn test_cut_flow() {
        let clean = FeatureRow {
            down_tp_energy: 0.1,
            up_tp_energy: 0.1,
            track_count: 1.0,
            stub_count: 0.0,
            axial_count: 0.0,
            total_hcal_pe: 3.0,
            passes_ecal_veto: 1.0,
            ..Default::default()
        };
        let noisy_hcal = FeatureRow {
            total_hcal_pe: 12.0,
            ..clean
        };
        let upstream_hit = FeatureRow {
            up_tp_energy: 0.6,
            ..clean
        };
        let ecal_fail = FeatureRow {
            passes_ecal_veto: 0.0,
            ..clean
        };
        let table = table_from(&[clean, noisy_hcal, upstream_hit, ecal_fail]);
        let flow = CutFlow::from_table(&table, &CutFlowConfig::default()).unwrap();
        assert_eq!(flow.total, 4);
        let counts: Vec<(&str, usize)> = flow
            .steps
            .iter()
            .map(|(label, fraction)| (label.as_str(), fraction.pass))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("Down TP veto", 4),
                ("Up TP veto", 3),
                ("Track veto", 4),
                ("Back-scatter veto", 4),
                ("Hcal PE veto", 3),
                ("Upstream veto", 3),
                ("Upstream veto + hcal", 2),
                ("Upstream veto + hcal + ecal bdt", 1),
            ]
        );
        let text = flow.to_string();
        assert!(text.starts_with("Total events: 4\n"));
        assert!(text.contains("Upstream veto + hcal: 2 (50.0000%)"));
    }
}
