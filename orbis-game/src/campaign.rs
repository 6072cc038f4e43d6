//! # Campaign - Match Bookkeeping
//!
//! Keeps the game-level state the simulation does not know about: troops
//! per place, place ownership and the match outcome. Everything it learns
//! about units comes from [`TickReport`]s.
//!
//! ## Troops of a launch
//!
//! Troops leave the source when the order is accepted (they are reserved
//! against the launch id). When the launch commits, any shortfall goes
//! back to the source; an aborted launch refunds everything. Refunds only
//! land if the source still belongs to the side that sent them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use orbis_compute::{LaunchId, LaunchStatus, Simulation, TickReport};
use orbis_core::error::{OrbisError, OrbisResult};
use orbis_core::{OrbisConfig, PerSide, Side};

use crate::places::{scatter, Place};

/// How a match ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Victory(Side),
    Draw,
}

#[derive(Clone, Copy, Debug)]
struct Reservation {
    source: usize,
    owner: Side,
    troops: usize,
}

/// One match: places, troops and the simulation moving units between them
pub struct Campaign {
    sim: Simulation,
    places: Vec<Place>,
    reservations: HashMap<LaunchId, Reservation>,
    troop_growth: f32,
    send_fraction: f32,
    live_counts: PerSide<usize>,
    elapsed: f32,
    outcome: Option<MatchOutcome>,
}

impl Campaign {
    /// Scatter places and start the simulation
    pub fn new(config: OrbisConfig) -> OrbisResult<Self> {
        let places = scatter(&config.game);
        Self::with_places(places, config)
    }

    /// Start a match on a given layout
    pub fn with_places(places: Vec<Place>, config: OrbisConfig) -> OrbisResult<Self> {
        let positions: Vec<[f32; 3]> = places.iter().map(|p| p.position).collect();
        let troop_growth = config.game.troop_growth;
        let send_fraction = config.game.send_fraction;
        let sim = Simulation::initialize(&positions, config)?;

        info!("🏁 Campaign started with {} places", places.len());

        Ok(Self {
            sim,
            places,
            reservations: HashMap::new(),
            troop_growth,
            send_fraction,
            live_counts: PerSide::default(),
            elapsed: 0.0,
            outcome: None,
        })
    }

    /// Send a share of `source`'s troops to `destination`
    ///
    /// Only the owner of `source` may order from it.
    pub fn order(&mut self, side: Side, source: usize, destination: usize) -> OrbisResult<LaunchStatus> {
        let count = self.places.len();
        let place = self
            .places
            .get(source)
            .ok_or(OrbisError::PlaceOutOfRange { place: source, count })?;
        if !place.is_owned_by(side) {
            debug!("{} cannot order from place {} it does not own", side, source);
            return Ok(LaunchStatus::Ignored);
        }

        let troops = (place.troops * self.send_fraction).floor().max(0.0) as usize;
        let status = self.sim.launch(troops, source, destination, side)?;

        if let LaunchStatus::Started(id) | LaunchStatus::Queued(id) = status {
            self.places[source].troops -= troops as f32;
            self.reservations.insert(
                id,
                Reservation {
                    source,
                    owner: side,
                    troops,
                },
            );
        }
        Ok(status)
    }

    /// Advance the match by `dt` seconds
    pub fn step(&mut self, dt: f32) -> OrbisResult<TickReport> {
        self.elapsed += dt;
        for place in self.places.iter_mut().filter(|p| p.owner.is_some()) {
            place.troops += self.troop_growth * dt;
        }

        let report = self.sim.tick(dt)?;

        for launch in &report.launches {
            if let Some(reservation) = self.reservations.remove(&launch.id) {
                self.refund(reservation, launch.shortfall());
            }
        }
        for aborted in &report.aborted_launches {
            if let Some(reservation) = self.reservations.remove(&aborted.id) {
                self.refund(reservation, reservation.troops);
            }
        }
        for event in &report.events {
            self.resolve_arrival(event.place_index, event.owner);
        }
        if !report.skipped_interpretation {
            self.live_counts = report.live_counts;
        }

        if self.outcome.is_none() {
            self.outcome = self.check_outcome();
            if let Some(outcome) = self.outcome {
                info!("🏆 Match over after {:.1}s: {:?}", self.elapsed, outcome);
            }
        }
        Ok(report)
    }

    fn refund(&mut self, reservation: Reservation, troops: usize) {
        if troops == 0 {
            return;
        }
        if let Some(place) = self.places.get_mut(reservation.source) {
            if place.is_owned_by(reservation.owner) {
                place.troops += troops as f32;
            }
        }
    }

    /// Apply one arriving unit to a place
    fn resolve_arrival(&mut self, place_index: usize, side: Side) {
        let Some(place) = self.places.get_mut(place_index) else {
            return;
        };
        if place.is_owned_by(side) {
            place.troops += 1.0;
            return;
        }

        place.troops -= 1.0;
        if place.troops < 0.0 {
            info!("⚔️ Place {} captured by {}", place_index, side);
            place.owner = Some(side);
            place.troops = 1.0;
        }
    }

    /// A side with no place and no unit anywhere has lost
    fn check_outcome(&self) -> Option<MatchOutcome> {
        let lost = |side: Side| {
            let has_place = self.places.iter().any(|p| p.is_owned_by(side));
            let has_units = self.live_counts[side] > 0
                || self.sim.in_flight(side) > 0
                || self.reservations.values().any(|r| r.owner == side);
            !has_place && !has_units
        };

        match (lost(Side::Player), lost(Side::Enemy)) {
            (true, true) => Some(MatchOutcome::Draw),
            (true, false) => Some(MatchOutcome::Victory(Side::Enemy)),
            (false, true) => Some(MatchOutcome::Victory(Side::Player)),
            (false, false) => None,
        }
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    /// Indices of the places `side` owns
    pub fn owned_by(&self, side: Side) -> Vec<usize> {
        self.places
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_owned_by(side))
            .map(|(i, _)| i)
            .collect()
    }

    /// Troops on all places of `side`
    pub fn garrison(&self, side: Side) -> f32 {
        self.places
            .iter()
            .filter(|p| p.is_owned_by(side))
            .map(|p| p.troops)
            .sum()
    }

    pub fn live_counts(&self) -> PerSide<usize> {
        self.live_counts
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn send_fraction(&self) -> f32 {
        self.send_fraction
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.1;

    fn place(x: f32, owner: Option<Side>, troops: f32) -> Place {
        Place {
            position: [x, 0.0, 0.0],
            owner,
            troops,
        }
    }

    fn config() -> OrbisConfig {
        let mut config = OrbisConfig::small(8);
        config.game.troop_growth = 0.0;
        config
    }

    fn campaign(places: Vec<Place>) -> Campaign {
        Campaign::with_places(places, config()).unwrap()
    }

    #[test]
    fn test_order_reserves_troops() {
        let mut game = campaign(vec![
            place(0.0, Some(Side::Player), 10.0),
            place(10.0, Some(Side::Enemy), 10.0),
        ]);
        assert!(matches!(game.order(Side::Player, 0, 1).unwrap(), LaunchStatus::Started(_)));
        assert_eq!(game.places()[0].troops, 5.0);

        game.step(DT).unwrap();
        let report = game.step(DT).unwrap();
        assert_eq!(report.launches[0].granted.len(), 5);
        assert_eq!(game.places()[0].troops, 5.0);
    }

    #[test]
    fn test_order_from_foreign_place_ignored() {
        let mut game = campaign(vec![
            place(0.0, Some(Side::Player), 10.0),
            place(10.0, Some(Side::Enemy), 10.0),
        ]);
        assert_eq!(game.order(Side::Enemy, 0, 1).unwrap(), LaunchStatus::Ignored);
        assert_eq!(game.places()[0].troops, 10.0);
        assert!(game.order(Side::Player, 7, 1).is_err());
    }

    #[test]
    fn test_shortfall_refunded() {
        let mut config = config();
        config.launch.owner_cap = Some(3);
        let places = vec![
            place(0.0, Some(Side::Player), 20.0),
            place(10.0, Some(Side::Enemy), 10.0),
        ];
        let mut game = Campaign::with_places(places, config).unwrap();

        game.order(Side::Player, 0, 1).unwrap();
        assert_eq!(game.places()[0].troops, 10.0);
        game.step(DT).unwrap();
        game.step(DT).unwrap();
        assert_eq!(game.places()[0].troops, 17.0);
    }

    #[test]
    fn test_arrivals_reinforce_and_capture() {
        let mut game = campaign(vec![
            place(0.0, Some(Side::Player), 10.0),
            place(10.0, None, 1.0),
            place(20.0, Some(Side::Player), 0.0),
        ]);

        game.resolve_arrival(2, Side::Player);
        assert_eq!(game.places()[2].troops, 1.0);

        game.resolve_arrival(1, Side::Enemy);
        assert_eq!(game.places()[1].owner, None);
        game.resolve_arrival(1, Side::Enemy);
        assert_eq!(game.places()[1].owner, Some(Side::Enemy));
        assert_eq!(game.places()[1].troops, 1.0);
    }

    #[test]
    fn test_units_travel_and_capture() {
        let mut game = campaign(vec![
            place(0.0, Some(Side::Player), 10.0),
            place(10.0, Some(Side::Enemy), 2.0),
        ]);
        game.order(Side::Player, 0, 1).unwrap();

        for _ in 0..500 {
            game.step(DT).unwrap();
            if game.outcome().is_some() && game.simulation().in_flight(Side::Player) == 0 {
                break;
            }
        }

        assert_eq!(game.places()[1].owner, Some(Side::Player));
        assert_eq!(game.places()[1].troops, 3.0);
        assert_eq!(game.outcome(), Some(MatchOutcome::Victory(Side::Player)));
    }

    #[test]
    fn test_troop_growth() {
        let mut config = config();
        config.game.troop_growth = 2.0;
        let places = vec![place(0.0, Some(Side::Player), 0.0), place(10.0, None, 0.0)];
        let mut game = Campaign::with_places(places, config).unwrap();

        for _ in 0..10 {
            game.step(DT).unwrap();
        }
        assert!((game.places()[0].troops - 2.0).abs() < 1e-4);
        assert_eq!(game.places()[1].troops, 0.0);
    }
}
