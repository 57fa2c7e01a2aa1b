use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    efficiency::VetoMasks,
    table::{Column, FrozenTable},
    utils::{histogram, histogram2d, Histogram2d},
    TpnResult,
};

/// Binning and presentation of a one-dimensional histogram of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramSpec {
    /// Name of the panel, unique within a battery.
    pub name: &'static str,
    pub column: Column,
    pub bins: usize,
    pub range: (f64, f64),
    pub x_label: &'static str,
    pub log_y: bool,
}

impl HistogramSpec {
    const fn new(
        name: &'static str,
        column: Column,
        bins: usize,
        range: (f64, f64),
        x_label: &'static str,
    ) -> Self {
        Self {
            name,
            column,
            bins,
            range,
            x_label,
            log_y: true,
        }
    }
}

/// Binning and presentation of a two-dimensional histogram of two aligned columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Histogram2dSpec {
    pub name: &'static str,
    pub x: Column,
    pub y: Column,
    pub x_binning: (usize, (f64, f64)),
    pub y_binning: (usize, (f64, f64)),
    pub x_label: &'static str,
    pub y_label: &'static str,
}

const KE_BINNING: (usize, (f64, f64)) = (160, (0.0, 4000.0));
const THETA_BINNING: (usize, (f64, f64)) = (360, (0.0, 180.0));
const PAD_BINNING: (usize, (f64, f64)) = (200, (0.0, 100.0));

/// The standard one-dimensional panels, in presentation order.
pub const STANDARD_HISTOGRAMS: [HistogramSpec; 25] = [
    HistogramSpec::new(
        "pn_gamma_energy",
        Column::PnGammaEnergy,
        160,
        (0.0, 4000.0),
        "E(γ) (MeV)",
    ),
    HistogramSpec::new(
        "pn_particle_mult",
        Column::PnParticleMult,
        120,
        (0.0, 120.0),
        "PN Multiplicity",
    ),
    HistogramSpec::new(
        "pn_interaction_z",
        Column::PnInteractionZ,
        450,
        (-100.0, 350.0),
        "PN γ Interaction Point z (mm)",
    ),
    HistogramSpec::new(
        "pn_interaction_z_target",
        Column::PnInteractionZ,
        450,
        (-1.0, 1.0),
        "PN γ Interaction Point z (mm)",
    ),
    HistogramSpec::new(
        "lead_hadron_ke",
        Column::LeadHadronKe,
        KE_BINNING.0,
        KE_BINNING.1,
        "Leading Hadron Kinetic Energy (MeV)",
    ),
    HistogramSpec::new(
        "lead_hadron_theta",
        Column::LeadHadronTheta,
        THETA_BINNING.0,
        THETA_BINNING.1,
        "Leading Hadron Theta (degrees)",
    ),
    HistogramSpec::new(
        "lead_hadron_p",
        Column::LeadHadronP,
        KE_BINNING.0,
        KE_BINNING.1,
        "Leading Hadron Momentum (MeV)",
    ),
    HistogramSpec::new(
        "lead_proton_ke",
        Column::LeadProtonKe,
        KE_BINNING.0,
        KE_BINNING.1,
        "Leading p Kinetic Energy (MeV)",
    ),
    HistogramSpec::new(
        "lead_proton_theta",
        Column::LeadProtonTheta,
        THETA_BINNING.0,
        THETA_BINNING.1,
        "Leading p Theta (degrees)",
    ),
    HistogramSpec::new(
        "lead_proton_p",
        Column::LeadProtonP,
        KE_BINNING.0,
        KE_BINNING.1,
        "Leading p Momentum (MeV)",
    ),
    HistogramSpec::new(
        "lead_neutron_ke",
        Column::LeadNeutronKe,
        KE_BINNING.0,
        KE_BINNING.1,
        "Leading n Kinetic Energy (MeV)",
    ),
    HistogramSpec::new(
        "lead_neutron_theta",
        Column::LeadNeutronTheta,
        THETA_BINNING.0,
        THETA_BINNING.1,
        "Leading n Theta (degrees)",
    ),
    HistogramSpec::new(
        "lead_neutron_p",
        Column::LeadNeutronP,
        KE_BINNING.0,
        KE_BINNING.1,
        "Leading n Momentum (MeV)",
    ),
    HistogramSpec::new(
        "lead_pion_ke",
        Column::LeadPionKe,
        KE_BINNING.0,
        KE_BINNING.1,
        "Leading π Kinetic Energy (MeV)",
    ),
    HistogramSpec::new(
        "lead_pion_theta",
        Column::LeadPionTheta,
        THETA_BINNING.0,
        THETA_BINNING.1,
        "Leading π Theta (degrees)",
    ),
    HistogramSpec::new(
        "lead_pion_p",
        Column::LeadPionP,
        KE_BINNING.0,
        KE_BINNING.1,
        "Leading π Momentum (MeV)",
    ),
    HistogramSpec::new(
        "track_count",
        Column::TrackCount,
        10,
        (0.0, 10.0),
        "Track Multiplicity",
    ),
    HistogramSpec::new(
        "stub_count",
        Column::StubCount,
        10,
        (0.0, 10.0),
        "Stub Multiplicity",
    ),
    HistogramSpec::new(
        "axial_count",
        Column::AxialCount,
        10,
        (0.0, 10.0),
        "Axial Multiplicity",
    ),
    HistogramSpec::new(
        "down_tp_energy",
        Column::DownTpEnergy,
        PAD_BINNING.0,
        PAD_BINNING.1,
        "Energy Deposited in Downstream Trigger Pad (MeV)",
    ),
    HistogramSpec::new(
        "up_tp_energy",
        Column::UpTpEnergy,
        PAD_BINNING.0,
        PAD_BINNING.1,
        "Energy Deposited in Upstream Trigger Pad (MeV)",
    ),
    HistogramSpec::new(
        "total_ecal_energy",
        Column::TotalEcalEnergy,
        140,
        (0.0, 140.0),
        "Total Energy Deposited in Ecal Si (MeV)",
    ),
    HistogramSpec::new(
        "ecal_hit_energy",
        Column::EcalHitEnergy,
        200,
        (0.0, 100.0),
        "Readout Hit Energy Deposited in Ecal Si (MeV)",
    ),
    HistogramSpec::new(
        "hcal_hit_energy",
        Column::HcalHitEnergy,
        300,
        (0.0, 150.0),
        "Readout Hit Energy Deposited in Hcal Scint (MeV)",
    ),
    HistogramSpec::new(
        "total_hcal_energy",
        Column::TotalHcalEnergy,
        400,
        (0.0, 400.0),
        "Total Energy Deposited in Hcal Scint (MeV)",
    ),
];

const fn leader_map(
    name: &'static str,
    x: Column,
    y: Column,
    x_label: &'static str,
    y_label: &'static str,
) -> Histogram2dSpec {
    Histogram2dSpec {
        name,
        x,
        y,
        x_binning: KE_BINNING,
        y_binning: THETA_BINNING,
        x_label,
        y_label,
    }
}

/// The standard two-dimensional panels. These are filled from every event.
pub const STANDARD_HISTOGRAMS_2D: [Histogram2dSpec; 5] = [
    leader_map(
        "lead_hadron_ke_theta",
        Column::LeadHadronKe,
        Column::LeadHadronTheta,
        "Leading Hadron Kinetic Energy (MeV)",
        "Leading Hadron Theta (degrees)",
    ),
    leader_map(
        "lead_proton_ke_theta",
        Column::LeadProtonKe,
        Column::LeadProtonTheta,
        "Leading p Kinetic Energy (MeV)",
        "Leading p Theta (degrees)",
    ),
    leader_map(
        "lead_neutron_ke_theta",
        Column::LeadNeutronKe,
        Column::LeadNeutronTheta,
        "Leading n Kinetic Energy (MeV)",
        "Leading n Theta (degrees)",
    ),
    leader_map(
        "lead_pion_ke_theta",
        Column::LeadPionKe,
        Column::LeadPionTheta,
        "Leading π Kinetic Energy (MeV)",
        "Leading π Theta (degrees)",
    ),
    Histogram2dSpec {
        name: "up_down_tp_energy",
        x: Column::UpTpEnergy,
        y: Column::DownTpEnergy,
        x_binning: PAD_BINNING,
        y_binning: PAD_BINNING,
        x_label: "Energy Deposited in Upstream Trigger Pad (MeV)",
        y_label: "Energy Deposited in Downstream Trigger Pad (MeV)",
    },
];

/// A filled one-dimensional panel: shared bin edges and one count series per selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramPanel {
    pub name: String,
    pub column: Column,
    pub x_label: String,
    pub log_y: bool,
    pub bin_edges: Vec<f64>,
    pub series: IndexMap<String, Vec<f64>>,
}

/// A filled two-dimensional panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram2dPanel {
    pub name: String,
    pub x_label: String,
    pub y_label: String,
    #[serde(flatten)]
    pub histogram: Histogram2d,
}

/// Binned data for every standard panel, ready to hand to a plotter as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotBattery {
    pub histograms: Vec<HistogramPanel>,
    pub histograms_2d: Vec<Histogram2dPanel>,
}

impl PlotBattery {
    /// Fill the standard battery. Per-event columns get one series per veto selection; the
    /// hit-energy pools carry no event index, so they get only the `All` series.
    pub fn build(table: &FrozenTable) -> TpnResult<Self> {
        Self::build_with(table, &STANDARD_HISTOGRAMS, &STANDARD_HISTOGRAMS_2D)
    }

    /// Fill an arbitrary set of panels.
    pub fn build_with(
        table: &FrozenTable,
        specs: &[HistogramSpec],
        specs_2d: &[Histogram2dSpec],
    ) -> TpnResult<Self> {
        let selections = VetoMasks::from_table(table).labelled();
        let histograms = specs
            .iter()
            .map(|spec| -> TpnResult<HistogramPanel> {
                let values = table.column(spec.column);
                let mut series = IndexMap::new();
                let mut bin_edges = Vec::new();
                for (label, mask) in &selections {
                    if spec.column.is_pool() && *label != "All" {
                        continue;
                    }
                    let filled = if spec.column.is_pool() {
                        histogram(values, spec.bins, spec.range)?
                    } else {
                        histogram(mask.select(values), spec.bins, spec.range)?
                    };
                    bin_edges = filled.bin_edges;
                    series.insert(label.to_string(), filled.counts);
                }
                Ok(HistogramPanel {
                    name: spec.name.to_string(),
                    column: spec.column,
                    x_label: spec.x_label.to_string(),
                    log_y: spec.log_y,
                    bin_edges,
                    series,
                })
            })
            .collect::<TpnResult<Vec<_>>>()?;
        let histograms_2d = specs_2d
            .iter()
            .map(|spec| -> TpnResult<Histogram2dPanel> {
                Ok(Histogram2dPanel {
                    name: spec.name.to_string(),
                    x_label: spec.x_label.to_string(),
                    y_label: spec.y_label.to_string(),
                    histogram: histogram2d(
                        table.column(spec.x),
                        table.column(spec.y),
                        spec.x_binning,
                        spec.y_binning,
                    )?,
                })
            })
            .collect::<TpnResult<Vec<_>>>()?;
        Ok(Self {
            histograms,
            histograms_2d,
        })
    }

    /// Look up a one-dimensional panel by name.
    pub fn histogram(&self, name: &str) -> Option<&HistogramPanel> {
        self.histograms.iter().find(|panel| panel.name == name)
    }
}
