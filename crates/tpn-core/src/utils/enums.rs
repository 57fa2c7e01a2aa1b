use std::fmt::Display;

/// Particle species the analysis singles out, identified by PDG Monte Carlo code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Species {
    /// $`e^-`$, code 11.
    Electron,
    /// $`\gamma`$, code 22.
    Photon,
    /// $`p`$, code 2212.
    Proton,
    /// $`n`$, code 2112.
    Neutron,
    /// $`\pi^\pm`$, code 211.
    ChargedPion,
}

impl Species {
    /// The PDG code of the particle (not the antiparticle).
    pub const fn pdg_code(&self) -> i32 {
        match self {
            Species::Electron => 11,
            Species::Photon => 22,
            Species::Proton => 2212,
            Species::Neutron => 2112,
            Species::ChargedPion => 211,
        }
    }

    /// Exact match on the signed code.
    pub fn is(&self, pdg_id: i32) -> bool {
        pdg_id == self.pdg_code()
    }

    /// Match on the code magnitude, so antiparticles and both pion charges are included.
    pub fn is_abs(&self, pdg_id: i32) -> bool {
        pdg_id.abs() == self.pdg_code()
    }
}

/// Detector channels which publish a veto decision per event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VetoChannel {
    /// The silicon-tungsten electromagnetic calorimeter.
    Ecal,
    /// The scintillator hadronic calorimeter.
    Hcal,
}

impl Display for VetoChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VetoChannel::Ecal => write!(f, "Ecal"),
            VetoChannel::Hcal => write!(f, "Hcal"),
        }
    }
}

/// Buckets a findable track can be classified into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TrackCategory {
    /// Findable with the 4s or 3s1a strategy.
    Track,
    /// Findable only as a 2s stub, and not the recoil.
    Stub,
    /// Findable only with the 2a (axial) strategy.
    Axial,
}
