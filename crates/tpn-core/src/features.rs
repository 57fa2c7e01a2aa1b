use indexmap::{IndexMap, IndexSet};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tracing::debug;

use crate::{
    config::ExtractorConfig,
    data::{EventSource, FindableTrack, Particle, ParticleId, VetoResult},
    navigator::{DecayGraph, TargetRegion},
    table::{FeatureRow, FeatureTable, LeaderKinematics},
    utils::enums::{Species, TrackCategory, VetoChannel},
    TpnError, TpnResult, SENTINEL,
};

/// Which running maximum a leader rule reads or writes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum LeaderSlot {
    Proton,
    Neutron,
    Pion,
}

impl LeaderSlot {
    const fn index(self) -> usize {
        match self {
            LeaderSlot::Proton => 0,
            LeaderSlot::Neutron => 1,
            LeaderSlot::Pion => 2,
        }
    }
}

/// Claims a daughter of `species` for `update` when its kinetic energy beats the running
/// maximum held in `compare`.
#[derive(Copy, Clone, Debug)]
struct LeaderRule {
    species: Species,
    compare: LeaderSlot,
    update: LeaderSlot,
}

#[derive(Copy, Clone, Debug)]
struct Leader<'a> {
    ke: f64,
    particle: Option<&'a Particle>,
}

impl Default for Leader<'_> {
    fn default() -> Self {
        Self {
            ke: SENTINEL,
            particle: None,
        }
    }
}

impl<'a> Leader<'a> {
    fn claim(&mut self, ke: f64, particle: &'a Particle) {
        self.ke = ke;
        self.particle = Some(particle);
    }

    fn kinematics(&self) -> LeaderKinematics {
        match self.particle {
            Some(particle) => LeaderKinematics {
                ke: self.ke,
                theta: particle.momentum.theta_degrees().unwrap_or(SENTINEL),
                p: particle.momentum.mag(),
            },
            None => LeaderKinematics::default(),
        }
    }
}

type TrackPredicate = fn(&FindableTrack, ParticleId) -> bool;

fn is_full_track(track: &FindableTrack, _recoil: ParticleId) -> bool {
    track.is_4s || track.is_3s1a
}

fn is_stub(track: &FindableTrack, recoil: ParticleId) -> bool {
    track.is_2s && track.particle != recoil
}

fn is_axial_only(track: &FindableTrack, _recoil: ParticleId) -> bool {
    track.is_2a && !track.is_4s && !track.is_3s1a && !track.is_2s
}

/// Track classification rules in priority order. A record lands in the first bucket whose
/// predicate holds, or in none.
const TRACK_RULES: [(TrackPredicate, TrackCategory); 3] = [
    (is_full_track, TrackCategory::Track),
    (is_stub, TrackCategory::Stub),
    (is_axial_only, TrackCategory::Axial),
];

/// Reduces one event to one [`FeatureRow`] plus its hit energies.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    region: TargetRegion,
    leader_rules: [LeaderRule; 3],
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl FeatureExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        let pion_compare = if config.legacy_pion_comparison {
            LeaderSlot::Neutron
        } else {
            LeaderSlot::Pion
        };
        Self {
            region: config.target_region(),
            leader_rules: [
                LeaderRule {
                    species: Species::Proton,
                    compare: LeaderSlot::Proton,
                    update: LeaderSlot::Proton,
                },
                LeaderRule {
                    species: Species::Neutron,
                    compare: LeaderSlot::Neutron,
                    update: LeaderSlot::Neutron,
                },
                LeaderRule {
                    species: Species::ChargedPion,
                    compare: pion_compare,
                    update: LeaderSlot::Pion,
                },
            ],
        }
    }

    /// Extract the features of `event` and append them to `table`. The event is numbered by the
    /// table's current length in error messages.
    ///
    /// # Errors
    ///
    /// Fails without touching `table` if the event has no recoil electron, contains a dangling
    /// particle link, or does not hold exactly one record per veto channel.
    pub fn process<E: EventSource + ?Sized>(
        &self,
        event: &E,
        table: &mut FeatureTable,
    ) -> TpnResult<()> {
        self.process_indexed(table.n_events(), event, table)
    }

    /// Process every event in order into a fresh table.
    #[cfg(feature = "rayon")]
    pub fn process_all<E: EventSource + Sync>(&self, events: &[E]) -> TpnResult<FeatureTable> {
        events
            .par_iter()
            .enumerate()
            .try_fold(FeatureTable::new, |mut table, (index, event)| {
                self.process_indexed(index, event, &mut table)?;
                Ok::<_, TpnError>(table)
            })
            .try_reduce(FeatureTable::new, |mut left, right| {
                left.merge(right);
                Ok(left)
            })
    }

    /// Process every event in order into a fresh table.
    #[cfg(not(feature = "rayon"))]
    pub fn process_all<E: EventSource>(&self, events: &[E]) -> TpnResult<FeatureTable> {
        let mut table = FeatureTable::new();
        for (index, event) in events.iter().enumerate() {
            self.process_indexed(index, event, &mut table)?;
        }
        Ok(table)
    }

    fn process_indexed<E: EventSource + ?Sized>(
        &self,
        index: usize,
        event: &E,
        table: &mut FeatureTable,
    ) -> TpnResult<()> {
        let graph = DecayGraph::new(event.particles())?;
        let recoil = graph
            .find_recoil()
            .ok_or(TpnError::MissingRecoil { event: index })?;
        let emission = graph.find_emission(recoil, &self.region);

        let mut row = FeatureRow::default();
        if let Some(emission) = emission {
            let pn_gamma = graph.get(emission);
            row.pn_gamma_energy = pn_gamma.energy;
            row.pn_particle_mult = pn_gamma.daughter_count() as f64;
            row.pn_interaction_z = pn_gamma.end_point.z;
            self.select_leaders(&graph, emission, &mut row);
        }

        let (up, down) = event
            .trigger_pad_hits()
            .iter()
            .fold((0.0, 0.0), |(up, down), hit| {
                if hit.position.z < 0.0 {
                    (up + hit.edep, down)
                } else if hit.position.z > 0.0 {
                    (up, down + hit.edep)
                } else {
                    (up, down)
                }
            });
        row.up_tp_energy = up;
        row.down_tp_energy = down;

        let buckets = classify_tracks(event.findable_tracks(), recoil);
        let bucket_len =
            |category: TrackCategory| buckets.get(&category).map_or(0, IndexSet::len) as f64;
        row.track_count = bucket_len(TrackCategory::Track);
        row.stub_count = bucket_len(TrackCategory::Stub);
        row.axial_count = bucket_len(TrackCategory::Axial);

        let ecal_hits = event.ecal_hits();
        row.total_ecal_energy = ecal_hits.iter().map(|hit| hit.energy).sum();
        let hcal_hits = event.hcal_hits();
        row.total_hcal_energy = hcal_hits.iter().map(|hit| hit.energy).sum();
        row.total_hcal_pe = hcal_hits.iter().map(|hit| hit.pe).sum();

        row.passes_ecal_veto = veto_flag(VetoChannel::Ecal, event.ecal_veto(), index)?;
        row.passes_hcal_veto = veto_flag(VetoChannel::Hcal, event.hcal_veto(), index)?;

        debug!(
            event = index,
            pn_gamma = emission.is_some(),
            tracks = row.track_count,
            "processed event"
        );
        table.append(
            &row,
            ecal_hits.iter().map(|hit| hit.energy),
            hcal_hits.iter().map(|hit| hit.energy),
        );
        Ok(())
    }

    /// Single pass over the emission products, tracking the leading hadron of any species and
    /// the leading proton, neutron and charged pion.
    fn select_leaders(&self, graph: &DecayGraph<'_>, emission: ParticleId, row: &mut FeatureRow) {
        let mut hadron = Leader::default();
        let mut leaders = [Leader::default(); 3];
        for (_, daughter) in graph.daughters(emission) {
            let ke = daughter.kinetic_energy();
            if hadron.ke < ke {
                hadron.claim(ke, daughter);
            }
            if let Some(rule) = self.leader_rules.iter().find(|rule| {
                rule.species.is_abs(daughter.pdg_id) && leaders[rule.compare.index()].ke < ke
            }) {
                leaders[rule.update.index()].claim(ke, daughter);
            }
        }
        row.lead_hadron = hadron.kinematics();
        row.lead_proton = leaders[LeaderSlot::Proton.index()].kinematics();
        row.lead_neutron = leaders[LeaderSlot::Neutron.index()].kinematics();
        row.lead_pion = leaders[LeaderSlot::Pion.index()].kinematics();
    }
}

fn classify_tracks(
    tracks: &[FindableTrack],
    recoil: ParticleId,
) -> IndexMap<TrackCategory, IndexSet<ParticleId>> {
    let mut buckets: IndexMap<TrackCategory, IndexSet<ParticleId>> = IndexMap::new();
    for track in tracks {
        if let Some((_, category)) = TRACK_RULES
            .iter()
            .find(|(predicate, _)| predicate(track, recoil))
        {
            buckets.entry(*category).or_default().insert(track.particle);
        }
    }
    buckets
}

fn veto_flag(channel: VetoChannel, results: &[VetoResult], event: usize) -> TpnResult<f64> {
    match results {
        [result] => Ok(if result.passes { 1.0 } else { 0.0 }),
        _ => Err(TpnError::VetoRecordCount {
            channel: channel.to_string(),
            event,
            found: results.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::{test_event, EventData, TriggerPadHit},
        table::Column,
        utils::vectors::Vec3,
    };
    use approx::assert_relative_eq;

    fn extract(event: &EventData, config: ExtractorConfig) -> FeatureTable {
        let mut table = FeatureTable::new();
        FeatureExtractor::new(config)
            .process(event, &mut table)
            .unwrap();
        table
    }

    fn value(table: &FeatureTable, column: Column) -> f64 {
        table.column(column)[0]
    }

    #[test]
    fn test_full_event() {
        let table = extract(&test_event(), ExtractorConfig::default());
        assert_eq!(table.n_events(), 1);
        assert_eq!(value(&table, Column::PnGammaEnergy), 2800.0);
        assert_eq!(value(&table, Column::PnParticleMult), 4.0);
        assert_eq!(value(&table, Column::PnInteractionZ), 0.3);
        assert_relative_eq!(value(&table, Column::LeadHadronKe), 500.0, epsilon = 1e-9);
        assert_relative_eq!(value(&table, Column::LeadHadronTheta), 90.0, epsilon = 1e-9);
        assert_relative_eq!(value(&table, Column::LeadHadronP), 400.0, epsilon = 1e-9);
        assert_relative_eq!(value(&table, Column::LeadProtonKe), 300.0, epsilon = 1e-9);
        assert_relative_eq!(value(&table, Column::LeadProtonTheta), 45.0, epsilon = 1e-9);
        assert_relative_eq!(
            value(&table, Column::LeadProtonP),
            300.0 * 2f64.sqrt(),
            epsilon = 1e-9
        );
        assert_relative_eq!(value(&table, Column::LeadNeutronKe), 500.0, epsilon = 1e-9);
        assert_relative_eq!(value(&table, Column::LeadPionKe), 200.0, epsilon = 1e-9);
        assert_relative_eq!(value(&table, Column::LeadPionTheta), 180.0, epsilon = 1e-9);
        assert_relative_eq!(value(&table, Column::LeadPionP), 250.0, epsilon = 1e-9);
        assert_relative_eq!(value(&table, Column::UpTpEnergy), 0.7, epsilon = 1e-12);
        assert_relative_eq!(value(&table, Column::DownTpEnergy), 1.2, epsilon = 1e-12);
        assert_eq!(value(&table, Column::TrackCount), 1.0);
        assert_eq!(value(&table, Column::StubCount), 1.0);
        assert_eq!(value(&table, Column::AxialCount), 1.0);
        assert_eq!(value(&table, Column::TotalEcalEnergy), 8.0);
        assert_eq!(value(&table, Column::TotalHcalEnergy), 5.0);
        assert_eq!(value(&table, Column::TotalHcalPe), 16.0);
        assert_eq!(value(&table, Column::PassesEcalVeto), 1.0);
        assert_eq!(value(&table, Column::PassesHcalVeto), 0.0);
        assert_eq!(table.column(Column::EcalHitEnergy), &[1.5, 2.5, 4.0]);
        assert_eq!(table.column(Column::HcalHitEnergy), &[3.0, 2.0]);
    }

    #[test]
    fn test_rows_stay_aligned() {
        let extractor = FeatureExtractor::default();
        let mut table = FeatureTable::new();
        let mut no_emission = test_event();
        no_emission.particles[0].daughters = vec![ParticleId(1)];
        for event in [&test_event(), &no_emission, &test_event()] {
            extractor.process(event, &mut table).unwrap();
        }
        assert_eq!(table.n_events(), 3);
        for column in Column::ALIGNED {
            assert_eq!(table.column(column).len(), 3, "{column}");
        }
        assert_eq!(table.column(Column::EcalHitEnergy).len(), 9);
        assert_eq!(table.column(Column::HcalHitEnergy).len(), 6);
    }

    #[test]
    fn test_childless_photon_gives_sentinels() {
        let mut event = test_event();
        event.particles[2].daughters.clear();
        let table = extract(&event, ExtractorConfig::default());
        assert_eq!(value(&table, Column::PnGammaEnergy), SENTINEL);
        for column in [
            Column::LeadHadronKe,
            Column::LeadHadronTheta,
            Column::LeadHadronP,
            Column::LeadProtonKe,
            Column::LeadNeutronTheta,
            Column::LeadPionP,
        ] {
            assert_eq!(value(&table, column), SENTINEL, "{column}");
        }
    }

    #[test]
    fn test_products_without_hadrons() {
        let mut event = test_event();
        for particle in event.particles[3..].iter_mut() {
            particle.pdg_id = 11;
        }
        let table = extract(&event, ExtractorConfig::default());
        assert_relative_eq!(value(&table, Column::LeadHadronKe), 500.0, epsilon = 1e-9);
        for column in [
            Column::LeadProtonKe,
            Column::LeadProtonTheta,
            Column::LeadProtonP,
            Column::LeadNeutronKe,
            Column::LeadPionKe,
        ] {
            assert_eq!(value(&table, column), SENTINEL, "{column}");
        }
    }

    #[test]
    fn test_species_rules_are_exclusive() {
        let table = extract(&test_event(), ExtractorConfig::default());
        let proton = value(&table, Column::LeadProtonKe);
        let neutron = value(&table, Column::LeadNeutronKe);
        let pion = value(&table, Column::LeadPionKe);
        assert!(proton != neutron && neutron != pion && proton != pion);

        let mut only_protons = test_event();
        for particle in only_protons.particles[3..].iter_mut() {
            particle.pdg_id = 2212;
        }
        let table = extract(&only_protons, ExtractorConfig::default());
        assert_relative_eq!(value(&table, Column::LeadProtonKe), 500.0, epsilon = 1e-9);
        assert_eq!(value(&table, Column::LeadNeutronKe), SENTINEL);
        assert_eq!(value(&table, Column::LeadPionKe), SENTINEL);
    }

    #[test]
    fn test_antiparticles_count_as_leaders() {
        let mut event = test_event();
        event.particles[3].pdg_id = -2212;
        let table = extract(&event, ExtractorConfig::default());
        assert_relative_eq!(value(&table, Column::LeadProtonKe), 300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_legacy_pion_comparison() {
        let legacy = ExtractorConfig {
            legacy_pion_comparison: true,
            ..Default::default()
        };
        let table = extract(&test_event(), legacy.clone());
        assert_eq!(value(&table, Column::LeadPionKe), SENTINEL);
        assert_eq!(value(&table, Column::LeadPionTheta), SENTINEL);

        // with the neutron removed the legacy rule keeps the last pion beating the sentinel
        let mut event = test_event();
        event.particles[2].daughters = vec![ParticleId(3), ParticleId(5), ParticleId(6)];
        let table = extract(&event, legacy);
        assert_relative_eq!(value(&table, Column::LeadPionKe), 100.0, epsilon = 1e-9);
        let table = extract(&event, ExtractorConfig::default());
        assert_relative_eq!(value(&table, Column::LeadPionKe), 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_trigger_pad_boundary() {
        let mut event = test_event();
        event.trigger_pad_hits = vec![
            TriggerPadHit {
                edep: 1.0,
                position: Vec3::new(0.0, 0.0, 0.0),
            },
            TriggerPadHit {
                edep: 2.0,
                position: Vec3::new(0.0, 0.0, 5.0),
            },
            TriggerPadHit {
                edep: 4.0,
                position: Vec3::new(0.0, 0.0, -5.0),
            },
        ];
        let table = extract(&event, ExtractorConfig::default());
        assert_eq!(value(&table, Column::DownTpEnergy), 2.0);
        assert_eq!(value(&table, Column::UpTpEnergy), 4.0);
    }

    #[test]
    fn test_track_priority() {
        let tracks = [
            FindableTrack {
                particle: ParticleId(3),
                is_4s: true,
                is_2s: true,
                is_2a: true,
                ..Default::default()
            },
            FindableTrack {
                particle: ParticleId(4),
                is_3s1a: true,
                ..Default::default()
            },
            FindableTrack {
                particle: ParticleId(5),
                is_2s: true,
                is_2a: true,
                ..Default::default()
            },
            FindableTrack {
                particle: ParticleId(6),
                ..Default::default()
            },
        ];
        let buckets = classify_tracks(&tracks, ParticleId(0));
        assert_eq!(buckets[&TrackCategory::Track].len(), 2);
        assert_eq!(buckets[&TrackCategory::Stub].len(), 1);
        assert!(!buckets.contains_key(&TrackCategory::Axial));
        assert!(buckets[&TrackCategory::Track].contains(&ParticleId(3)));
    }

    #[test]
    fn test_missing_recoil_appends_nothing() {
        let mut event = test_event();
        event.particles[0].pdg_id = -11;
        let mut table = FeatureTable::new();
        let err = FeatureExtractor::default()
            .process(&event, &mut table)
            .unwrap_err();
        assert!(matches!(err, TpnError::MissingRecoil { event: 0 }));
        assert_eq!(table.n_events(), 0);
        assert!(table.column(Column::EcalHitEnergy).is_empty());
    }

    #[test]
    fn test_recoil_without_emission() {
        let mut event = test_event();
        event.particles[0].daughters = vec![ParticleId(1)];
        let table = extract(&event, ExtractorConfig::default());
        assert_eq!(table.n_events(), 1);
        for column in [
            Column::PnGammaEnergy,
            Column::PnParticleMult,
            Column::PnInteractionZ,
            Column::LeadHadronKe,
            Column::LeadProtonTheta,
            Column::LeadNeutronP,
            Column::LeadPionKe,
        ] {
            assert_eq!(value(&table, column), SENTINEL, "{column}");
        }
        assert_eq!(value(&table, Column::TotalEcalEnergy), 8.0);
        assert_eq!(value(&table, Column::TrackCount), 1.0);
        assert_eq!(value(&table, Column::PassesHcalVeto), 0.0);
    }

    #[test]
    fn test_veto_record_count() {
        let mut event = test_event();
        event.hcal_veto.clear();
        let mut table = FeatureTable::new();
        match FeatureExtractor::default().process(&event, &mut table) {
            Err(TpnError::VetoRecordCount { channel, found, .. }) => {
                assert_eq!(channel, "Hcal");
                assert_eq!(found, 0);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(table.n_events(), 0);

        let mut event = test_event();
        event.ecal_veto.push(VetoResult { passes: false });
        assert!(matches!(
            FeatureExtractor::default().process(&event, &mut table),
            Err(TpnError::VetoRecordCount { found: 2, .. })
        ));
    }

    #[test]
    fn test_process_all_preserves_order() {
        let events: Vec<EventData> = (0..64)
            .map(|i| {
                let mut event = test_event();
                event.particles[2].energy = 1000.0 + i as f64;
                event
            })
            .collect();
        let table = FeatureExtractor::default().process_all(&events).unwrap();
        assert_eq!(table.n_events(), 64);
        let energies = table.column(Column::PnGammaEnergy);
        for (i, energy) in energies.iter().enumerate() {
            assert_eq!(*energy, 1000.0 + i as f64);
        }
        assert_eq!(table.column(Column::EcalHitEnergy).len(), 64 * 3);
    }

    #[test]
    fn test_process_all_reports_event_index() {
        let mut events = vec![test_event(); 5];
        events[3].particles[0].parents = vec![ParticleId(2)];
        match FeatureExtractor::default().process_all(&events) {
            Err(TpnError::MissingRecoil { event }) => assert_eq!(event, 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
