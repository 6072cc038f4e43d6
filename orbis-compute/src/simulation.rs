//! # Simulation
//!
//! Owns every piece of simulation state: the compute graph with its three
//! variables, the readback queue, the launch dispatcher and the slots
//! waiting to be reclaimed. Game code talks to it through four calls:
//! `initialize`, `launch`, `tick` and `reclaim`.
//!
//! ## One tick
//!
//! 1. Clamp `dt`, broadcast uniforms
//! 2. Watchdog: force-release a launch stuck without progress
//! 3. Apply reclaims deferred by the lock, start the next queued launch
//! 4. Request the aggregate readback, run the graph
//! 5. Feed readbacks back in evaluation order: slot allocation (velocity),
//!    unit placement (position), arrivals (aggregate)
//! 6. Reclaim the slots of arrived units
//!
//! Readbacks requested while handling step 5 are delivered by the *next*
//! tick, so `launch()` never completes within the call that made it.

use std::collections::BTreeSet;

use tracing::{debug, info, trace, warn};

use orbis_core::encoding::{is_anchor, is_free, parked_position};
use orbis_core::error::{OrbisError, OrbisResult};
use orbis_core::{OrbisConfig, PerSide, Side, Texel, Uniforms, ANCHOR_TAG, FIXED_MASS};

use crate::dispatch::{
    AbortedLaunch, Commit, Dispatcher, LaunchId, LaunchOutcome, LaunchRequest, LaunchStatus,
    VelocityStep,
};
use crate::graph::{ComputeGraph, VariableId};
use crate::interpreter::{interpret, reclaim_patches, ArrivalEvent};
use crate::kernels::{AggregateKernel, PositionKernel, VelocityKernel, AGGREGATE, POSITION, VELOCITY};
use crate::readback::ReadbackQueue;
use crate::texture::{SlotPatch, Texture};

/// What a readback was requested for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimRequest {
    /// Velocity snapshot to pick free slots for a launch
    AllocateSlots(LaunchId),
    /// Position snapshot to place a launch's units
    PlaceUnits(LaunchId),
    /// Aggregate snapshot to detect arrivals
    Arrivals,
}

impl SimRequest {
    fn launch(&self) -> Option<LaunchId> {
        match self {
            SimRequest::AllocateSlots(id) | SimRequest::PlaceUnits(id) => Some(*id),
            SimRequest::Arrivals => None,
        }
    }
}

/// Everything that happened during one tick
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<ArrivalEvent>,
    /// Travelling units per side (last known value when interpretation was skipped)
    pub live_counts: PerSide<usize>,
    /// Launches committed this tick
    pub launches: Vec<LaunchOutcome>,
    /// Launches whose lock was force-released this tick
    pub aborted_launches: Vec<AbortedLaunch>,
    pub skipped_interpretation: bool,
}

/// Result of a reclaim request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReclaimStatus {
    /// Slot is free again
    Reclaimed,
    /// Slot was already free; nothing changed
    AlreadyFree,
    /// A launch holds the lock; applied once it clears
    Deferred,
}

/// Slot counts by state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotCensus {
    pub anchors: usize,
    pub free: usize,
    pub allocated: usize,
    /// Allocated slots per owner
    pub by_side: PerSide<usize>,
}

impl SlotCensus {
    pub fn total(&self) -> usize {
        self.anchors + self.free + self.allocated
    }
}

/// The simulation core
pub struct Simulation {
    config: OrbisConfig,
    graph: ComputeGraph,
    readbacks: ReadbackQueue<SimRequest>,
    dispatcher: Dispatcher,

    velocity: VariableId,
    position: VariableId,
    aggregate: VariableId,

    num_places: usize,
    pending_reclaim: BTreeSet<usize>,
    live_counts: PerSide<usize>,
    tick: u64,
}

impl Simulation {
    /// Build the graph and seed one anchor per place
    ///
    /// Slots `[0, places.len())` become anchors at the given positions;
    /// every other slot starts free.
    pub fn initialize(places: &[[f32; 3]], config: OrbisConfig) -> OrbisResult<Self> {
        config.validate()?;
        let width = config.grid.width;
        if places.len() > width {
            return Err(OrbisError::config(format!(
                "{} places do not fit a grid of width {}",
                places.len(),
                width
            )));
        }

        let num_places = places.len();
        let positions = Texture::from_fn(width, width, |slot| match places.get(slot) {
            Some(&xyz) => Texel::from_xyz(xyz, ANCHOR_TAG),
            None => parked_position(),
        })?;
        let velocities = Texture::from_fn(width, width, |slot| {
            if slot < num_places {
                Texel::new(0.0, 0.0, 0.0, FIXED_MASS)
            } else {
                Texel::ZERO
            }
        })?;

        let mut graph = ComputeGraph::new(width, width)?;
        let velocity = graph.add_variable(VELOCITY, Box::new(VelocityKernel), velocities)?;
        let position = graph.add_variable(POSITION, Box::new(PositionKernel), positions)?;
        let aggregate = graph.add_variable(AGGREGATE, Box::new(AggregateKernel), Texture::new(width, width)?)?;
        graph.set_dependencies(velocity, &[VELOCITY, POSITION])?;
        graph.set_dependencies(position, &[POSITION, VELOCITY])?;
        graph.set_dependencies(aggregate, &[POSITION, VELOCITY])?;
        if let Some(e) = graph.init() {
            return Err(e);
        }

        info!(
            "🌍 Simulation ready: {} places, {} unit slots, cap {} per side",
            num_places,
            width * width - num_places,
            config.owner_cap()
        );

        Ok(Self {
            dispatcher: Dispatcher::new(&config),
            config,
            graph,
            readbacks: ReadbackQueue::new(),
            velocity,
            position,
            aggregate,
            num_places,
            pending_reclaim: BTreeSet::new(),
            live_counts: PerSide::default(),
            tick: 0,
        })
    }

    /// Ask for `count` units to travel from `source` to `destination`
    ///
    /// Nothing is allocated here; the grant shows up in a later
    /// [`TickReport::launches`].
    pub fn launch(&mut self, count: usize, source: usize, destination: usize, owner: Side) -> OrbisResult<LaunchStatus> {
        for place in [source, destination] {
            if place >= self.num_places {
                return Err(OrbisError::PlaceOutOfRange {
                    place,
                    count: self.num_places,
                });
            }
        }

        let request = LaunchRequest {
            count,
            source,
            destination,
            owner,
        };
        let status = self.dispatcher.request(request, self.tick);
        if let LaunchStatus::Started(id) = status {
            self.readbacks.request(self.velocity, SimRequest::AllocateSlots(id));
        }
        Ok(status)
    }

    /// Advance the simulation by one step of `dt` seconds
    pub fn tick(&mut self, dt: f32) -> OrbisResult<TickReport> {
        self.tick += 1;
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.config.kernel.max_dt)
        } else {
            0.0
        };
        self.graph
            .set_uniforms(Uniforms::from_config(&self.config, dt, self.tick));

        let mut report = TickReport {
            tick: self.tick,
            ..Default::default()
        };

        if let Some(aborted) = self.dispatcher.watchdog(self.tick) {
            self.readbacks.retain(|r| r.launch() != Some(aborted.id));
            report.aborted_launches.push(aborted);
        }

        if !self.dispatcher.is_locked() {
            self.flush_reclaims()?;
            if let Some(id) = self.dispatcher.start_next(self.tick) {
                self.readbacks.request(self.velocity, SimRequest::AllocateSlots(id));
            }
        }

        self.readbacks.request(self.aggregate, SimRequest::Arrivals);
        let delivered = self.graph.compute(&mut self.readbacks)?;
        report.live_counts = self.live_counts;

        for readback in delivered {
            match readback.request {
                SimRequest::AllocateSlots(id) => {
                    match self.dispatcher.on_velocity_readback(id, &readback.data, self.num_places, self.tick) {
                        VelocityStep::PlaceUnits(id) => {
                            self.readbacks.request(self.position, SimRequest::PlaceUnits(id));
                            self.dispatcher.await_positions(id);
                        }
                        VelocityStep::Finished(commit) => self.apply_commit(commit, &mut report)?,
                        VelocityStep::Stale => debug!("Stale velocity readback for {:?}", id),
                    }
                }
                SimRequest::PlaceUnits(id) => match self.dispatcher.on_position_readback(id, &readback.data)? {
                    Some(commit) => self.apply_commit(commit, &mut report)?,
                    None => debug!("Stale position readback for {:?}", id),
                },
                SimRequest::Arrivals => {
                    let interpretation = interpret(&readback.data, self.num_places, self.dispatcher.is_locked());
                    if interpretation.skipped {
                        report.skipped_interpretation = true;
                        continue;
                    }
                    for event in interpretation.events {
                        if !self.pending_reclaim.contains(&event.slot) {
                            report.events.push(event);
                        }
                    }
                    self.pending_reclaim.extend(interpretation.reclaim);
                    self.live_counts = interpretation.live_counts;
                    report.live_counts = interpretation.live_counts;
                }
            }
        }

        if !self.dispatcher.is_locked() {
            self.flush_reclaims()?;
        }

        trace!(
            "Tick {}: {} arrivals, live {}/{}",
            self.tick,
            report.events.len(),
            report.live_counts[Side::Player],
            report.live_counts[Side::Enemy]
        );
        Ok(report)
    }

    fn apply_commit(&mut self, commit: Commit, report: &mut TickReport) -> OrbisResult<()> {
        self.graph.upload(self.velocity, &commit.velocity)?;
        self.graph.upload(self.position, &commit.position)?;
        report.launches.push(commit.outcome);
        Ok(())
    }

    /// Return pending slots to the free pool
    fn flush_reclaims(&mut self) -> OrbisResult<()> {
        if self.pending_reclaim.is_empty() {
            return Ok(());
        }

        let mut slots = Vec::with_capacity(self.pending_reclaim.len());
        let mut released = PerSide::<usize>::default();
        {
            let velocity = self.graph.front(self.velocity)?;
            let position = self.graph.front(self.position)?;
            for &slot in &self.pending_reclaim {
                if is_free(&velocity.read(slot)?) {
                    continue;
                }
                if let Some(side) = Side::from_tag(position.read(slot)?.w) {
                    released[side] += 1;
                }
                slots.push(slot);
            }
        }
        self.pending_reclaim.clear();

        let (velocity, position) = reclaim_patches(&slots);
        self.graph.upload(self.velocity, &velocity)?;
        self.graph.upload(self.position, &position)?;
        for side in Side::ALL {
            self.dispatcher.release(side, released[side]);
        }

        debug!("♻️ Reclaimed {} slots", slots.len());
        Ok(())
    }

    /// Return one unit slot to the free pool
    pub fn reclaim(&mut self, slot: usize) -> OrbisResult<ReclaimStatus> {
        if slot < self.num_places {
            return Err(OrbisError::AnchorSlot(slot));
        }
        let velocity = self.graph.front(self.velocity)?.read(slot)?;
        if self.pending_reclaim.contains(&slot) {
            return Ok(ReclaimStatus::Deferred);
        }
        if is_free(&velocity) {
            return Ok(ReclaimStatus::AlreadyFree);
        }

        self.pending_reclaim.insert(slot);
        if self.dispatcher.is_locked() {
            return Ok(ReclaimStatus::Deferred);
        }
        self.flush_reclaims()?;
        Ok(ReclaimStatus::Reclaimed)
    }

    /// Move an anchor between ticks
    pub fn relocate_place(&mut self, place: usize, position: [f32; 3]) -> OrbisResult<()> {
        if place >= self.num_places {
            return Err(OrbisError::PlaceOutOfRange {
                place,
                count: self.num_places,
            });
        }
        self.graph.upload(
            self.position,
            &[SlotPatch::new(place, Texel::from_xyz(position, ANCHOR_TAG))],
        )
    }

    /// Count slots by state from the current textures
    pub fn slot_census(&self) -> OrbisResult<SlotCensus> {
        let velocity = self.graph.front(self.velocity)?;
        let position = self.graph.front(self.position)?;
        let mut census = SlotCensus::default();

        for (v, p) in velocity.texels().iter().zip(position.texels()) {
            if is_anchor(p) {
                census.anchors += 1;
            } else if is_free(v) {
                census.free += 1;
            } else {
                census.allocated += 1;
                if let Some(side) = Side::from_tag(p.w) {
                    census.by_side[side] += 1;
                }
            }
        }
        Ok(census)
    }

    /// Current `(position, velocity)` of a slot
    pub fn unit(&self, slot: usize) -> OrbisResult<(Texel, Texel)> {
        Ok((
            self.graph.front(self.position)?.read(slot)?,
            self.graph.front(self.velocity)?.read(slot)?,
        ))
    }

    /// Current position texture, e.g. for a renderer
    pub fn positions(&self) -> OrbisResult<&Texture> {
        self.graph.front(self.position)
    }

    /// Discard every queued readback, as a lost context would
    pub fn drop_pending_readbacks(&mut self) -> usize {
        let dropped = self.readbacks.drop_pending();
        if dropped > 0 {
            warn!("Dropped {} pending readbacks", dropped);
        }
        dropped
    }

    /// Committed units of `side` not yet reclaimed
    pub fn in_flight(&self, side: Side) -> usize {
        self.dispatcher.in_flight(side)
    }

    pub fn is_launch_in_progress(&self) -> bool {
        self.dispatcher.is_locked()
    }

    /// Launches waiting behind the lock
    pub fn queued_launches(&self) -> usize {
        self.dispatcher.queued()
    }

    pub fn width(&self) -> usize {
        self.config.grid.width
    }

    pub fn num_places(&self) -> usize {
        self.num_places
    }

    /// Total slots, anchors included
    pub fn capacity(&self) -> usize {
        self.config.grid.capacity()
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &OrbisConfig {
        &self.config
    }
}
