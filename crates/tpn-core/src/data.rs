use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::utils::vectors::Vec3;

/// Event I/O implementations (JSON lines).
pub mod io;

/// Index of a [`Particle`] inside its event's particle arena.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticleId(pub usize);

impl Display for ParticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for ParticleId {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

/// A simulated particle. Relations to other particles are stored as indices into the same event's
/// particle list, so the decay tree is an arena and never holds live references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// PDG Monte Carlo code.
    pub pdg_id: i32,
    /// Total energy (MeV).
    pub energy: f64,
    /// Rest mass (MeV).
    pub mass: f64,
    /// Three-momentum (MeV).
    pub momentum: Vec3,
    /// Creation point (mm).
    pub vertex: Vec3,
    /// Point where the particle interacted, decayed or left the world volume (mm).
    #[serde(default)]
    pub end_point: Vec3,
    /// Indices of the particles this one was produced by.
    #[serde(default)]
    pub parents: Vec<ParticleId>,
    /// Indices of the particles this one produced, in production order.
    #[serde(default)]
    pub daughters: Vec<ParticleId>,
}

impl Particle {
    /// Kinetic energy, `energy - mass`.
    pub fn kinetic_energy(&self) -> f64 {
        self.energy - self.mass
    }
    /// Number of parent links.
    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }
    /// Number of daughter links.
    pub fn daughter_count(&self) -> usize {
        self.daughters.len()
    }
}

/// A simulated hit in one of the trigger scintillator pads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerPadHit {
    /// Energy deposited (MeV).
    pub edep: f64,
    /// Hit position (mm). Only the sign of `z` matters to the analysis.
    pub position: Vec3,
}

/// Result of the track-findability study for one simulated particle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindableTrack {
    /// The particle which left the hits.
    pub particle: ParticleId,
    /// Findable with four stereo layers.
    #[serde(default)]
    pub is_4s: bool,
    /// Findable with three stereo layers and one axial layer.
    #[serde(default)]
    pub is_3s1a: bool,
    /// Findable with two stereo layers.
    #[serde(default)]
    pub is_2s: bool,
    /// Findable with two axial layers.
    #[serde(default)]
    pub is_2a: bool,
}

/// A digitized hit in the electromagnetic calorimeter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EcalHit {
    /// Reconstructed energy (MeV).
    pub energy: f64,
    #[serde(default)]
    pub position: Vec3,
}

/// A digitized hit in the hadronic calorimeter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HcalHit {
    /// Reconstructed energy (MeV).
    pub energy: f64,
    /// Number of photo-electrons.
    pub pe: f64,
    #[serde(default)]
    pub position: Vec3,
}

/// A veto decision published by a detector channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VetoResult {
    pub passes: bool,
}

/// Typed access to the collections of a single event.
///
/// Each method corresponds to one fixed collection of the simulation output. Implementors only
/// need to hand out slices; the extractor never mutates an event.
pub trait EventSource {
    /// Simulated particles (`SimParticles`).
    fn particles(&self) -> &[Particle];
    /// Trigger pad hits (`TriggerPadSimHits`).
    fn trigger_pad_hits(&self) -> &[TriggerPadHit];
    /// Findable track results (`FindableTracks`).
    fn findable_tracks(&self) -> &[FindableTrack];
    /// Electromagnetic calorimeter digis (`ecalDigis`).
    fn ecal_hits(&self) -> &[EcalHit];
    /// Hadronic calorimeter digis (`hcalDigis`).
    fn hcal_hits(&self) -> &[HcalHit];
    /// Electromagnetic calorimeter veto results (`EcalVeto`).
    fn ecal_veto(&self) -> &[VetoResult];
    /// Hadronic calorimeter veto results (`HcalVeto`).
    fn hcal_veto(&self) -> &[VetoResult];
}

/// Owned event data, as read from disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub particles: Vec<Particle>,
    #[serde(default)]
    pub trigger_pad_hits: Vec<TriggerPadHit>,
    #[serde(default)]
    pub findable_tracks: Vec<FindableTrack>,
    #[serde(default)]
    pub ecal_hits: Vec<EcalHit>,
    #[serde(default)]
    pub hcal_hits: Vec<HcalHit>,
    #[serde(default)]
    pub ecal_veto: Vec<VetoResult>,
    #[serde(default)]
    pub hcal_veto: Vec<VetoResult>,
}

impl EventSource for EventData {
    fn particles(&self) -> &[Particle] {
        &self.particles
    }
    fn trigger_pad_hits(&self) -> &[TriggerPadHit] {
        &self.trigger_pad_hits
    }
    fn findable_tracks(&self) -> &[FindableTrack] {
        &self.findable_tracks
    }
    fn ecal_hits(&self) -> &[EcalHit] {
        &self.ecal_hits
    }
    fn hcal_hits(&self) -> &[HcalHit] {
        &self.hcal_hits
    }
    fn ecal_veto(&self) -> &[VetoResult] {
        &self.ecal_veto
    }
    fn hcal_veto(&self) -> &[VetoResult] {
        &self.hcal_veto
    }
}

impl Display for EventData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Event:")?;
        writeln!(f, "  particles:")?;
        for (index, particle) in self.particles.iter().enumerate() {
            writeln!(
                f,
                "    #{index}: pdg {} E = {} p = {} vertex = {}",
                particle.pdg_id, particle.energy, particle.momentum, particle.vertex
            )?;
        }
        writeln!(f, "  trigger pad hits: {}", self.trigger_pad_hits.len())?;
        writeln!(f, "  findable tracks: {}", self.findable_tracks.len())?;
        writeln!(f, "  ecal hits: {}", self.ecal_hits.len())?;
        writeln!(f, "  hcal hits: {}", self.hcal_hits.len())?;
        Ok(())
    }
}

const PROTON_MASS: f64 = 938.272;
const NEUTRON_MASS: f64 = 939.565;
const PION_MASS: f64 = 139.570;
const ELECTRON_MASS: f64 = 0.511;

fn particle(pdg_id: i32, kinetic_energy: f64, mass: f64, momentum: [f64; 3], z: f64) -> Particle {
    Particle {
        pdg_id,
        energy: kinetic_energy + mass,
        mass,
        momentum: momentum.into(),
        vertex: Vec3::new(0.0, 0.0, z),
        end_point: Vec3::new(0.0, 0.0, z),
        parents: Vec::new(),
        daughters: Vec::new(),
    }
}

/// An event that can be used to test the extractor. The recoil electron (`#0`) radiates a soft
/// photon (`#1`) with no products and a PN photon (`#2`) which produces a proton (`#3`, 300 MeV
/// kinetic energy, 45°), a neutron (`#4`, 500 MeV, 90°), a $`\pi^+`$ (`#5`, 200 MeV, 180°) and a
/// $`\pi^-`$ (`#6`, 100 MeV, 0°).
pub fn test_event() -> EventData {
    let mut recoil = particle(11, 3499.489, ELECTRON_MASS, [0.0, 0.0, 3500.0], 0.0);
    recoil.daughters = vec![ParticleId(1), ParticleId(2)];
    let mut soft_photon = particle(22, 50.0, 0.0, [0.0, 0.0, 50.0], 0.1);
    soft_photon.parents = vec![ParticleId(0)];
    let mut pn_photon = particle(22, 2800.0, 0.0, [0.0, 0.0, 2800.0], 0.2);
    pn_photon.end_point = Vec3::new(0.0, 0.0, 0.3);
    pn_photon.parents = vec![ParticleId(0)];
    pn_photon.daughters = (3..=6).map(ParticleId).collect();
    let mut products = vec![
        particle(2212, 300.0, PROTON_MASS, [300.0, 0.0, 300.0], 0.3),
        particle(2112, 500.0, NEUTRON_MASS, [0.0, 400.0, 0.0], 0.3),
        particle(211, 200.0, PION_MASS, [0.0, 0.0, -250.0], 0.3),
        particle(-211, 100.0, PION_MASS, [0.0, 0.0, 150.0], 0.3),
    ];
    for product in products.iter_mut() {
        product.parents = vec![ParticleId(2)];
    }
    let mut particles = vec![recoil, soft_photon, pn_photon];
    particles.append(&mut products);
    EventData {
        particles,
        trigger_pad_hits: vec![
            TriggerPadHit {
                edep: 0.4,
                position: Vec3::new(0.0, 0.0, -5.0),
            },
            TriggerPadHit {
                edep: 0.3,
                position: Vec3::new(0.0, 0.0, -3.0),
            },
            TriggerPadHit {
                edep: 1.2,
                position: Vec3::new(0.0, 0.0, 5.0),
            },
            TriggerPadHit {
                edep: 7.0,
                position: Vec3::new(0.0, 0.0, 0.0),
            },
        ],
        findable_tracks: vec![
            FindableTrack {
                particle: ParticleId(0),
                is_4s: true,
                is_2s: true,
                ..Default::default()
            },
            FindableTrack {
                particle: ParticleId(3),
                is_2s: true,
                ..Default::default()
            },
            FindableTrack {
                particle: ParticleId(3),
                is_2s: true,
                ..Default::default()
            },
            FindableTrack {
                particle: ParticleId(5),
                is_2a: true,
                ..Default::default()
            },
            FindableTrack {
                particle: ParticleId(0),
                is_2s: true,
                ..Default::default()
            },
        ],
        ecal_hits: vec![
            EcalHit {
                energy: 1.5,
                ..Default::default()
            },
            EcalHit {
                energy: 2.5,
                ..Default::default()
            },
            EcalHit {
                energy: 4.0,
                ..Default::default()
            },
        ],
        hcal_hits: vec![
            HcalHit {
                energy: 3.0,
                pe: 10.0,
                ..Default::default()
            },
            HcalHit {
                energy: 2.0,
                pe: 6.0,
                ..Default::default()
            },
        ],
        ecal_veto: vec![VetoResult { passes: true }],
        hcal_veto: vec![VetoResult { passes: false }],
    }
}
