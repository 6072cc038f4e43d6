//! Rule-based opponent.
//!
//! Every `think_interval` seconds the strategist looks at the map once:
//! its strongest place attacks the weakest place it does not own, if the
//! troops it would send beat the defenders by `attack_margin`.

use tracing::debug;

use orbis_compute::LaunchStatus;
use orbis_core::config::AiConfig;
use orbis_core::error::OrbisResult;
use orbis_core::Side;

use crate::campaign::Campaign;
use crate::places::Place;

/// An order the strategist gave
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Order {
    pub source: usize,
    pub destination: usize,
    pub status: LaunchStatus,
}

/// AI controller for one side
pub struct Strategist {
    side: Side,
    think_interval: f32,
    attack_margin: f32,
    cooldown: f32,
}

impl Strategist {
    pub fn new(side: Side, config: &AiConfig) -> Self {
        Self {
            side,
            think_interval: config.think_interval,
            attack_margin: config.attack_margin,
            cooldown: config.think_interval,
        }
    }

    /// Advance the think timer and issue at most one order
    pub fn update(&mut self, campaign: &mut Campaign, dt: f32) -> OrbisResult<Option<Order>> {
        self.cooldown -= dt;
        if self.cooldown > 0.0 {
            return Ok(None);
        }
        self.cooldown = self.think_interval;

        let Some((source, destination)) = self.choose_attack(campaign.places(), campaign.send_fraction()) else {
            return Ok(None);
        };
        let status = campaign.order(self.side, source, destination)?;
        debug!("🤖 {} orders {} → {}: {:?}", self.side, source, destination, status);

        Ok(Some(Order {
            source,
            destination,
            status,
        }))
    }

    /// Pick `(source, destination)` for an attack, if one looks winnable
    pub fn choose_attack(&self, places: &[Place], send_fraction: f32) -> Option<(usize, usize)> {
        let (source, strongest) = places
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_owned_by(self.side))
            .max_by(|(_, a), (_, b)| a.troops.total_cmp(&b.troops))?;

        let (destination, weakest) = places
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_owned_by(self.side))
            .min_by(|(_, a), (_, b)| a.troops.total_cmp(&b.troops))?;

        let force = (strongest.troops * send_fraction).floor();
        (force - self.attack_margin > weakest.troops).then_some((source, destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbis_core::OrbisConfig;

    fn place(owner: Option<Side>, troops: f32) -> Place {
        Place {
            position: [0.0; 3],
            owner,
            troops,
        }
    }

    fn strategist(side: Side) -> Strategist {
        Strategist::new(side, &AiConfig::default())
    }

    #[test]
    fn test_attacks_weakest_from_strongest() {
        let places = vec![
            place(Some(Side::Enemy), 6.0),
            place(None, 4.0),
            place(Some(Side::Enemy), 20.0),
            place(Some(Side::Player), 3.0),
        ];
        assert_eq!(strategist(Side::Enemy).choose_attack(&places, 0.5), Some((2, 3)));
    }

    #[test]
    fn test_holds_when_too_weak() {
        let places = vec![place(Some(Side::Enemy), 8.0), place(None, 3.0)];
        // floor(8 * 0.5) - 2 = 2, not enough for 3 defenders
        assert_eq!(strategist(Side::Enemy).choose_attack(&places, 0.5), None);
    }

    #[test]
    fn test_no_places_no_attack() {
        let places = vec![place(Some(Side::Player), 50.0), place(None, 0.0)];
        assert_eq!(strategist(Side::Enemy).choose_attack(&places, 0.5), None);
    }

    #[test]
    fn test_update_waits_for_think_interval() {
        let config = OrbisConfig::small(8);
        let places = vec![
            Place { position: [0.0, 0.0, 0.0], owner: Some(Side::Player), troops: 30.0 },
            Place { position: [5.0, 0.0, 0.0], owner: None, troops: 2.0 },
            Place { position: [10.0, 0.0, 0.0], owner: Some(Side::Enemy), troops: 30.0 },
        ];
        let mut campaign = Campaign::with_places(places, config.clone()).unwrap();
        let mut ai = Strategist::new(Side::Enemy, &config.ai);

        assert_eq!(ai.update(&mut campaign, 1.0).unwrap(), None);
        let order = ai.update(&mut campaign, 1.0).unwrap().unwrap();
        assert_eq!((order.source, order.destination), (2, 1));
        assert!(matches!(order.status, LaunchStatus::Started(_)));
        assert_eq!(ai.update(&mut campaign, 1.0).unwrap(), None);
    }
}
