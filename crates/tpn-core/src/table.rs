use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use tracing::info;

use crate::{efficiency::Mask, TpnError, TpnResult, SENTINEL};

/// Parquet persistence for frozen tables.
pub mod io;

/// The fixed set of output columns.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    PnGammaEnergy,
    PnParticleMult,
    PnInteractionZ,
    TrackCount,
    StubCount,
    AxialCount,
    EcalHitEnergy,
    TotalEcalEnergy,
    PassesEcalVeto,
    HcalHitEnergy,
    TotalHcalEnergy,
    TotalHcalPe,
    PassesHcalVeto,
    UpTpEnergy,
    DownTpEnergy,
    LeadHadronKe,
    LeadHadronTheta,
    LeadHadronP,
    LeadPionKe,
    LeadPionTheta,
    LeadPionP,
    LeadNeutronKe,
    LeadNeutronTheta,
    LeadNeutronP,
    LeadProtonKe,
    LeadProtonTheta,
    LeadProtonP,
}

impl Column {
    /// Every column in schema order.
    pub const ALL: [Column; 27] = [
        Column::PnGammaEnergy,
        Column::PnParticleMult,
        Column::PnInteractionZ,
        Column::TrackCount,
        Column::StubCount,
        Column::AxialCount,
        Column::EcalHitEnergy,
        Column::TotalEcalEnergy,
        Column::PassesEcalVeto,
        Column::HcalHitEnergy,
        Column::TotalHcalEnergy,
        Column::TotalHcalPe,
        Column::PassesHcalVeto,
        Column::UpTpEnergy,
        Column::DownTpEnergy,
        Column::LeadHadronKe,
        Column::LeadHadronTheta,
        Column::LeadHadronP,
        Column::LeadPionKe,
        Column::LeadPionTheta,
        Column::LeadPionP,
        Column::LeadNeutronKe,
        Column::LeadNeutronTheta,
        Column::LeadNeutronP,
        Column::LeadProtonKe,
        Column::LeadProtonTheta,
        Column::LeadProtonP,
    ];

    /// The columns which receive exactly one value per event, in schema order.
    pub const ALIGNED: [Column; 25] = [
        Column::PnGammaEnergy,
        Column::PnParticleMult,
        Column::PnInteractionZ,
        Column::TrackCount,
        Column::StubCount,
        Column::AxialCount,
        Column::TotalEcalEnergy,
        Column::PassesEcalVeto,
        Column::TotalHcalEnergy,
        Column::TotalHcalPe,
        Column::PassesHcalVeto,
        Column::UpTpEnergy,
        Column::DownTpEnergy,
        Column::LeadHadronKe,
        Column::LeadHadronTheta,
        Column::LeadHadronP,
        Column::LeadPionKe,
        Column::LeadPionTheta,
        Column::LeadPionP,
        Column::LeadNeutronKe,
        Column::LeadNeutronTheta,
        Column::LeadNeutronP,
        Column::LeadProtonKe,
        Column::LeadProtonTheta,
        Column::LeadProtonP,
    ];

    /// The schema name of the column.
    pub const fn name(&self) -> &'static str {
        match self {
            Column::PnGammaEnergy => "pn_gamma_energy",
            Column::PnParticleMult => "pn_particle_mult",
            Column::PnInteractionZ => "pn_interaction_z",
            Column::TrackCount => "track_count",
            Column::StubCount => "stub_count",
            Column::AxialCount => "axial_count",
            Column::EcalHitEnergy => "ecal_hit_energy",
            Column::TotalEcalEnergy => "total_ecal_energy",
            Column::PassesEcalVeto => "passes_ecal_veto",
            Column::HcalHitEnergy => "hcal_hit_energy",
            Column::TotalHcalEnergy => "total_hcal_energy",
            Column::TotalHcalPe => "total_hcal_pe",
            Column::PassesHcalVeto => "passes_hcal_veto",
            Column::UpTpEnergy => "up_tp_energy",
            Column::DownTpEnergy => "down_tp_energy",
            Column::LeadHadronKe => "lead_hadron_ke",
            Column::LeadHadronTheta => "lead_hadron_theta",
            Column::LeadHadronP => "lead_hadron_p",
            Column::LeadPionKe => "lead_pion_ke",
            Column::LeadPionTheta => "lead_pion_theta",
            Column::LeadPionP => "lead_pion_p",
            Column::LeadNeutronKe => "lead_neutron_ke",
            Column::LeadNeutronTheta => "lead_neutron_theta",
            Column::LeadNeutronP => "lead_neutron_p",
            Column::LeadProtonKe => "lead_proton_ke",
            Column::LeadProtonTheta => "lead_proton_theta",
            Column::LeadProtonP => "lead_proton_p",
        }
    }

    /// Hit-energy pools grow once per hit rather than once per event.
    pub const fn is_pool(&self) -> bool {
        matches!(self, Column::EcalHitEnergy | Column::HcalHitEnergy)
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Column {
    type Err = TpnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Column::ALL
            .into_iter()
            .find(|column| column.name() == lowered)
            .ok_or_else(|| TpnError::ParseError {
                name: s.to_string(),
                object: "Column".to_string(),
            })
    }
}

/// Kinetic energy, polar angle (degrees) and momentum magnitude of a leading particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaderKinematics {
    pub ke: f64,
    pub theta: f64,
    pub p: f64,
}

impl Default for LeaderKinematics {
    fn default() -> Self {
        Self {
            ke: SENTINEL,
            theta: SENTINEL,
            p: SENTINEL,
        }
    }
}

/// One event's worth of aligned column values. Every field starts out at [`SENTINEL`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow {
    pub pn_gamma_energy: f64,
    pub pn_particle_mult: f64,
    pub pn_interaction_z: f64,
    pub track_count: f64,
    pub stub_count: f64,
    pub axial_count: f64,
    pub total_ecal_energy: f64,
    pub passes_ecal_veto: f64,
    pub total_hcal_energy: f64,
    pub total_hcal_pe: f64,
    pub passes_hcal_veto: f64,
    pub up_tp_energy: f64,
    pub down_tp_energy: f64,
    pub lead_hadron: LeaderKinematics,
    pub lead_pion: LeaderKinematics,
    pub lead_neutron: LeaderKinematics,
    pub lead_proton: LeaderKinematics,
}

impl Default for FeatureRow {
    fn default() -> Self {
        Self {
            pn_gamma_energy: SENTINEL,
            pn_particle_mult: SENTINEL,
            pn_interaction_z: SENTINEL,
            track_count: SENTINEL,
            stub_count: SENTINEL,
            axial_count: SENTINEL,
            total_ecal_energy: SENTINEL,
            passes_ecal_veto: SENTINEL,
            total_hcal_energy: SENTINEL,
            total_hcal_pe: SENTINEL,
            passes_hcal_veto: SENTINEL,
            up_tp_energy: SENTINEL,
            down_tp_energy: SENTINEL,
            lead_hadron: LeaderKinematics::default(),
            lead_pion: LeaderKinematics::default(),
            lead_neutron: LeaderKinematics::default(),
            lead_proton: LeaderKinematics::default(),
        }
    }
}

impl FeatureRow {
    /// The value this row holds for an aligned column, or `None` for a hit-energy pool.
    pub fn value(&self, column: Column) -> Option<f64> {
        Some(match column {
            Column::PnGammaEnergy => self.pn_gamma_energy,
            Column::PnParticleMult => self.pn_particle_mult,
            Column::PnInteractionZ => self.pn_interaction_z,
            Column::TrackCount => self.track_count,
            Column::StubCount => self.stub_count,
            Column::AxialCount => self.axial_count,
            Column::TotalEcalEnergy => self.total_ecal_energy,
            Column::PassesEcalVeto => self.passes_ecal_veto,
            Column::TotalHcalEnergy => self.total_hcal_energy,
            Column::TotalHcalPe => self.total_hcal_pe,
            Column::PassesHcalVeto => self.passes_hcal_veto,
            Column::UpTpEnergy => self.up_tp_energy,
            Column::DownTpEnergy => self.down_tp_energy,
            Column::LeadHadronKe => self.lead_hadron.ke,
            Column::LeadHadronTheta => self.lead_hadron.theta,
            Column::LeadHadronP => self.lead_hadron.p,
            Column::LeadPionKe => self.lead_pion.ke,
            Column::LeadPionTheta => self.lead_pion.theta,
            Column::LeadPionP => self.lead_pion.p,
            Column::LeadNeutronKe => self.lead_neutron.ke,
            Column::LeadNeutronTheta => self.lead_neutron.theta,
            Column::LeadNeutronP => self.lead_neutron.p,
            Column::LeadProtonKe => self.lead_proton.ke,
            Column::LeadProtonTheta => self.lead_proton.theta,
            Column::LeadProtonP => self.lead_proton.p,
            Column::EcalHitEnergy | Column::HcalHitEnergy => return None,
        })
    }
}

/// The growing per-column accumulator. Aligned columns all have one entry per appended row; the
/// two hit-energy pools grow by one entry per hit.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns: IndexMap<Column, Vec<f64>>,
    ecal_hit_energy: Vec<f64>,
    hcal_hit_energy: Vec<f64>,
}

impl Default for FeatureTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureTable {
    /// Create an empty table with every aligned column present.
    pub fn new() -> Self {
        Self {
            columns: Column::ALIGNED
                .into_iter()
                .map(|column| (column, Vec::new()))
                .collect(),
            ecal_hit_energy: Vec::new(),
            hcal_hit_energy: Vec::new(),
        }
    }

    /// Append one event: a complete row plus that event's hit energies.
    pub fn append<E, H>(&mut self, row: &FeatureRow, ecal_hit_energy: E, hcal_hit_energy: H)
    where
        E: IntoIterator<Item = f64>,
        H: IntoIterator<Item = f64>,
    {
        for (column, values) in self.columns.iter_mut() {
            if let Some(value) = row.value(*column) {
                values.push(value);
            }
        }
        self.ecal_hit_energy.extend(ecal_hit_energy);
        self.hcal_hit_energy.extend(hcal_hit_energy);
    }

    /// Concatenate another table onto the end of this one, preserving order.
    pub fn merge(&mut self, other: FeatureTable) {
        let FeatureTable {
            columns,
            mut ecal_hit_energy,
            mut hcal_hit_energy,
        } = other;
        for (column, mut values) in columns {
            self.columns.entry(column).or_default().append(&mut values);
        }
        self.ecal_hit_energy.append(&mut ecal_hit_energy);
        self.hcal_hit_energy.append(&mut hcal_hit_energy);
    }

    /// Number of rows appended so far.
    pub fn n_events(&self) -> usize {
        self.columns
            .get(&Column::PnGammaEnergy)
            .map_or(0, Vec::len)
    }

    /// Current contents of a column.
    pub fn column(&self, column: Column) -> &[f64] {
        match column {
            Column::EcalHitEnergy => &self.ecal_hit_energy,
            Column::HcalHitEnergy => &self.hcal_hit_energy,
            _ => self.columns.get(&column).map(Vec::as_slice).unwrap_or_default(),
        }
    }

    /// Freeze the table into dense, immutable columns.
    pub fn finalize(self) -> FrozenTable {
        let n_events = self.n_events();
        info!(
            n_events,
            n_ecal_hits = self.ecal_hit_energy.len(),
            n_hcal_hits = self.hcal_hit_energy.len(),
            "finalized feature table"
        );
        FrozenTable {
            n_events,
            columns: self
                .columns
                .into_iter()
                .map(|(column, values)| (column, values.into_boxed_slice()))
                .collect(),
            ecal_hit_energy: self.ecal_hit_energy.into_boxed_slice(),
            hcal_hit_energy: self.hcal_hit_energy.into_boxed_slice(),
        }
    }
}

/// An immutable snapshot of a [`FeatureTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrozenTable {
    n_events: usize,
    columns: IndexMap<Column, Box<[f64]>>,
    ecal_hit_energy: Box<[f64]>,
    hcal_hit_energy: Box<[f64]>,
}

impl FrozenTable {
    /// Build a snapshot from raw columns. Every aligned column must be present and all of them
    /// must share one length.
    pub fn from_columns(
        mut columns: IndexMap<Column, Vec<f64>>,
        ecal_hit_energy: Vec<f64>,
        hcal_hit_energy: Vec<f64>,
    ) -> TpnResult<Self> {
        let mut ordered = IndexMap::with_capacity(Column::ALIGNED.len());
        let mut n_events = None;
        for column in Column::ALIGNED {
            let values = columns
                .swap_remove(&column)
                .ok_or_else(|| TpnError::MissingColumn {
                    name: column.to_string(),
                })?;
            let expected = *n_events.get_or_insert(values.len());
            if values.len() != expected {
                return Err(TpnError::LengthMismatch {
                    context: format!("column \"{column}\""),
                    expected,
                    actual: values.len(),
                });
            }
            ordered.insert(column, values.into_boxed_slice());
        }
        Ok(Self {
            n_events: n_events.unwrap_or(0),
            columns: ordered,
            ecal_hit_energy: ecal_hit_energy.into_boxed_slice(),
            hcal_hit_energy: hcal_hit_energy.into_boxed_slice(),
        })
    }

    /// Number of events (the length of every aligned column).
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// The values of a column.
    pub fn column(&self, column: Column) -> &[f64] {
        match column {
            Column::EcalHitEnergy => &self.ecal_hit_energy,
            Column::HcalHitEnergy => &self.hcal_hit_energy,
            _ => self.columns.get(&column).map(|values| &values[..]).unwrap_or_default(),
        }
    }

    /// Iterate over the aligned columns in schema order.
    pub fn aligned_columns(&self) -> impl Iterator<Item = (Column, &[f64])> {
        self.columns
            .iter()
            .map(|(column, values)| (*column, &values[..]))
    }

    /// Keep only the rows selected by `mask`. The hit-energy pools carry no event index, so they
    /// are kept whole.
    pub fn filter(&self, mask: &Mask) -> TpnResult<FrozenTable> {
        if mask.len() != self.n_events {
            return Err(TpnError::LengthMismatch {
                context: "table filter mask".to_string(),
                expected: self.n_events,
                actual: mask.len(),
            });
        }
        Ok(FrozenTable {
            n_events: mask.count(),
            columns: self
                .columns
                .iter()
                .map(|(column, values)| (*column, mask.select(values).into_boxed_slice()))
                .collect(),
            ecal_hit_energy: self.ecal_hit_energy.clone(),
            hcal_hit_energy: self.hcal_hit_energy.clone(),
        })
    }
}
