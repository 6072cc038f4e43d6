//! Places on the sphere.
//!
//! Places sit on a Fibonacci lattice, nudged by seeded jitter so two
//! matches with different seeds do not look alike. The first place starts
//! with the player, the last with the enemy, the rest are neutral.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use orbis_core::config::GameConfig;
use orbis_core::texel::{length, scale};
use orbis_core::Side;

/// Lattice jitter, as a fraction of the sphere radius
const JITTER: f32 = 0.08;

/// A place units travel between
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub position: [f32; 3],
    pub owner: Option<Side>,
    pub troops: f32,
}

impl Place {
    pub fn is_owned_by(&self, side: Side) -> bool {
        self.owner == Some(side)
    }
}

/// Lay out `config.places` places on a sphere of `config.sphere_radius`
pub fn scatter(config: &GameConfig) -> Vec<Place> {
    let count = config.places;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());

    (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
            let ring = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden_angle * i as f32;

            let lattice = [theta.cos() * ring, y, theta.sin() * ring];
            let nudged = [
                lattice[0] + rng.gen_range(-JITTER..JITTER),
                lattice[1] + rng.gen_range(-JITTER..JITTER),
                lattice[2] + rng.gen_range(-JITTER..JITTER),
            ];
            let norm = length(nudged).max(f32::EPSILON);

            Place {
                position: scale(nudged, config.sphere_radius / norm),
                owner: starting_owner(i, count),
                troops: config.initial_troops,
            }
        })
        .collect()
}

fn starting_owner(index: usize, count: usize) -> Option<Side> {
    if index == 0 {
        Some(Side::Player)
    } else if index + 1 == count {
        Some(Side::Enemy)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbis_core::texel::distance;

    #[test]
    fn test_places_on_sphere() {
        let config = GameConfig::default();
        let places = scatter(&config);
        assert_eq!(places.len(), config.places);
        for place in &places {
            assert!((length(place.position) - config.sphere_radius).abs() < 1e-3);
        }
    }

    #[test]
    fn test_starting_owners() {
        let places = scatter(&GameConfig::default());
        assert_eq!(places[0].owner, Some(Side::Player));
        assert_eq!(places[places.len() - 1].owner, Some(Side::Enemy));
        assert!(places[1..places.len() - 1].iter().all(|p| p.owner.is_none()));
    }

    #[test]
    fn test_places_well_separated() {
        let places = scatter(&GameConfig::default());
        for (i, a) in places.iter().enumerate() {
            for b in &places[i + 1..] {
                assert!(distance(a.position, b.position) > 1.0);
            }
        }
    }

    #[test]
    fn test_seed_changes_layout() {
        let a = scatter(&GameConfig::default());
        let b = scatter(&GameConfig {
            seed: 7,
            ..GameConfig::default()
        });
        assert_ne!(a[3].position, b[3].position);
        assert_eq!(a, scatter(&GameConfig::default()));
    }
}
