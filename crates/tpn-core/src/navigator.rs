use serde::{Deserialize, Serialize};

use crate::{
    data::{Particle, ParticleId},
    utils::enums::Species,
    TpnError, TpnResult,
};

/// Half-length of the target along the beam axis (mm).
pub const DEFAULT_TARGET_HALF_LENGTH: f64 = 0.550;

/// The region around the origin in which a PN photon must be created and interact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetRegion {
    /// Points with `|z| <= half_length` are inside the target.
    pub half_length: f64,
}

impl Default for TargetRegion {
    fn default() -> Self {
        Self {
            half_length: DEFAULT_TARGET_HALF_LENGTH,
        }
    }
}

impl TargetRegion {
    pub fn new(half_length: f64) -> Self {
        Self { half_length }
    }

    /// Check whether a particle was created inside the target.
    pub fn created_within(&self, particle: &Particle) -> bool {
        particle.vertex.z.abs() <= self.half_length
    }
}

/// A validated view over an event's particle arena.
///
/// Construction checks every parent and daughter index once, so traversal afterwards can index
/// the arena directly.
#[derive(Debug, Clone, Copy)]
pub struct DecayGraph<'a> {
    particles: &'a [Particle],
}

impl<'a> DecayGraph<'a> {
    /// Wrap a particle list, failing if any link points outside of it.
    pub fn new(particles: &'a [Particle]) -> TpnResult<Self> {
        let len = particles.len();
        for (index, particle) in particles.iter().enumerate() {
            if let Some(link) = particle
                .parents
                .iter()
                .chain(&particle.daughters)
                .find(|link| link.0 >= len)
            {
                return Err(TpnError::DanglingParticleLink {
                    particle: index,
                    link: link.0,
                    len,
                });
            }
        }
        Ok(Self { particles })
    }

    /// Number of particles in the arena.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Access a particle by index.
    pub fn get(&self, id: ParticleId) -> &'a Particle {
        &self.particles[id.0]
    }

    /// The `n`-th daughter of a particle, if it has that many.
    pub fn daughter(&self, id: ParticleId, n: usize) -> Option<(ParticleId, &'a Particle)> {
        self.get(id)
            .daughters
            .get(n)
            .map(|&daughter| (daughter, self.get(daughter)))
    }

    /// Iterate over the direct daughters of a particle in production order.
    pub fn daughters(&self, id: ParticleId) -> impl Iterator<Item = (ParticleId, &'a Particle)> + 'a {
        let particles = self.particles;
        particles[id.0]
            .daughters
            .iter()
            .map(move |&daughter| (daughter, &particles[daughter.0]))
    }

    /// Find the recoil electron: the first electron, in arena order, without parents.
    pub fn find_recoil(&self) -> Option<ParticleId> {
        self.particles
            .iter()
            .position(|particle| {
                Species::Electron.is(particle.pdg_id) && particle.parent_count() == 0
            })
            .map(ParticleId)
    }

    /// Find the PN photon among the recoil's daughters: the first photon which has products,
    /// was created inside the target, and whose first product was also created inside the target.
    pub fn find_emission(&self, recoil: ParticleId, region: &TargetRegion) -> Option<ParticleId> {
        self.daughters(recoil)
            .find(|(id, daughter)| {
                Species::Photon.is(daughter.pdg_id)
                    && region.created_within(daughter)
                    && self
                        .daughter(*id, 0)
                        .is_some_and(|(_, first)| region.created_within(first))
            })
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_event;
    use crate::utils::vectors::Vec3;

    fn at_z(pdg_id: i32, z: f64) -> Particle {
        Particle {
            pdg_id,
            vertex: Vec3::new(0.0, 0.0, z),
            ..Default::default()
        }
    }

    #[test]
    fn test_find_recoil_and_emission() {
        let event = test_event();
        let graph = DecayGraph::new(&event.particles).unwrap();
        let recoil = graph.find_recoil().unwrap();
        assert_eq!(recoil, ParticleId(0));
        let emission = graph.find_emission(recoil, &TargetRegion::default());
        assert_eq!(emission, Some(ParticleId(2)));
    }

    #[test]
    fn test_recoil_requires_no_parents() {
        let mut secondary = at_z(11, 0.0);
        secondary.parents = vec![ParticleId(2)];
        let positron = at_z(-11, 0.0);
        let primary = at_z(11, 0.0);
        let second_primary = at_z(11, 0.0);
        let particles = vec![secondary, positron, primary, second_primary];
        let graph = DecayGraph::new(&particles).unwrap();
        assert_eq!(graph.find_recoil(), Some(ParticleId(2)));
        let leptons = vec![particles[1].clone(), particles[2].clone()];
        let graph = DecayGraph::new(&leptons).unwrap();
        assert_eq!(graph.find_recoil(), Some(ParticleId(1)));
    }

    #[test]
    fn test_no_recoil() {
        let particles = vec![at_z(22, 0.0), at_z(2212, 0.0)];
        let graph = DecayGraph::new(&particles).unwrap();
        assert_eq!(graph.find_recoil(), None);
    }

    #[test]
    fn test_emission_requires_products_inside_target() {
        let mut recoil = at_z(11, 0.0);
        recoil.daughters = (1..=4).map(ParticleId).collect();
        // photon without products
        let childless = at_z(22, 0.0);
        // photon created outside the target
        let mut outside = at_z(22, 0.6);
        outside.daughters = vec![ParticleId(5)];
        // photon whose first product is created downstream
        let mut escapes = at_z(22, 0.1);
        escapes.daughters = vec![ParticleId(6), ParticleId(5)];
        let mut good = at_z(22, -0.55);
        good.daughters = vec![ParticleId(5)];
        let inside_product = at_z(2112, 0.2);
        let outside_product = at_z(2112, 200.0);
        let particles = vec![
            recoil,
            childless,
            outside,
            escapes,
            good,
            inside_product,
            outside_product,
        ];
        let graph = DecayGraph::new(&particles).unwrap();
        let region = TargetRegion::default();
        assert_eq!(graph.find_emission(ParticleId(0), &region), Some(ParticleId(4)));
        assert_eq!(
            graph.find_emission(ParticleId(0), &TargetRegion::new(0.5)),
            None
        );
    }

    #[test]
    fn test_emission_first_match_wins() {
        let mut event = test_event();
        let mut early = event.particles[2].clone();
        early.energy = 10.0;
        event.particles.push(early);
        event.particles[0].daughters.insert(0, ParticleId(7));
        let graph = DecayGraph::new(&event.particles).unwrap();
        assert_eq!(
            graph.find_emission(ParticleId(0), &TargetRegion::default()),
            Some(ParticleId(7))
        );
    }

    #[test]
    fn test_dangling_link_is_rejected() {
        let mut event = test_event();
        event.particles[2].daughters.push(ParticleId(42));
        match DecayGraph::new(&event.particles) {
            Err(TpnError::DanglingParticleLink {
                particle,
                link,
                len,
            }) => {
                assert_eq!(particle, 2);
                assert_eq!(link, 42);
                assert_eq!(len, 7);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_daughter_iteration_order() {
        let event = test_event();
        let graph = DecayGraph::new(&event.particles).unwrap();
        let codes: Vec<i32> = graph
            .daughters(ParticleId(2))
            .map(|(_, particle)| particle.pdg_id)
            .collect();
        assert_eq!(codes, vec![2212, 2112, 211, -211]);
        assert!(graph.daughter(ParticleId(1), 0).is_none());
    }
}
