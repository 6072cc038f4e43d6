//! # Launch Dispatcher
//!
//! Moves units from a source place to a destination place without tearing
//! simulation state. Host code only ever sees textures through readbacks,
//! so a launch runs as a small state machine driven by two of them:
//!
//! ```text
//! Requested → VelocityReadPending → SlotsAllocated → PositionReadPending → Committed
//!               (velocity readback:      (position readback:
//!                pick free slots)         spawn near source, commit)
//! ```
//!
//! A single-flight lock is held from `VelocityReadPending` to `Committed`,
//! so two launches never scan the same free slots. Launches requested while
//! the lock is held are queued or dropped per [`LaunchPolicy`].
//!
//! Velocity and position patches are committed together, at the end, so
//! no kernel ever sees a slot with a target but no spawn position.
//!
//! A readback can be lost (context loss, dropped queue). `watchdog()`
//! force-releases a lock that made no progress for `timeout_ticks`.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use orbis_core::config::{LaunchPolicy, OrbisConfig};
use orbis_core::encoding::{encode_target, is_free};
use orbis_core::error::OrbisResult;
use orbis_core::texel::add;
use orbis_core::{PerSide, Side, Texel};

use crate::texture::{SlotPatch, Texture};

/// What the caller asked for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaunchRequest {
    pub count: usize,
    pub source: usize,
    pub destination: usize,
    pub owner: Side,
}

/// Identifies one launch from request to commit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LaunchId(pub u64);

/// Immediate answer to a launch request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchStatus {
    /// Took the lock; a velocity readback must be requested
    Started(LaunchId),
    /// Waiting behind the lock
    Queued(LaunchId),
    /// Lock held and the policy (or a full queue) refused it
    Dropped,
    /// Nothing to do (`count == 0` or `source == destination`)
    Ignored,
}

/// Where the launch holding the lock stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchPhase {
    Requested,
    VelocityReadPending,
    SlotsAllocated,
    PositionReadPending,
    Committed,
}

/// Result of a finished launch
#[derive(Clone, Debug, PartialEq)]
pub struct LaunchOutcome {
    pub id: LaunchId,
    pub request: LaunchRequest,
    /// Slots that received a unit, ascending
    pub granted: Vec<usize>,
}

impl LaunchOutcome {
    /// Units requested but not granted
    pub fn shortfall(&self) -> usize {
        self.request.count.saturating_sub(self.granted.len())
    }
}

/// A launch whose lock was force-released by the watchdog
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AbortedLaunch {
    pub id: LaunchId,
    pub request: LaunchRequest,
    pub phase: LaunchPhase,
    pub idle_ticks: u64,
}

/// Patches to upload when a launch commits
#[derive(Clone, Debug, PartialEq)]
pub struct Commit {
    pub outcome: LaunchOutcome,
    pub velocity: Vec<SlotPatch>,
    pub position: Vec<SlotPatch>,
}

/// Result of feeding a velocity readback to the dispatcher
#[derive(Clone, Debug, PartialEq)]
pub enum VelocityStep {
    /// Slots reserved; request a position readback for this launch
    PlaceUnits(LaunchId),
    /// No slot could be granted; the launch is over
    Finished(Commit),
    /// The readback belongs to no launch in this phase
    Stale,
}

#[derive(Debug)]
struct ActiveLaunch {
    id: LaunchId,
    request: LaunchRequest,
    phase: LaunchPhase,
    slots: Vec<usize>,
    velocity: Vec<SlotPatch>,
    last_progress: u64,
}

/// Launch state machine plus the per-side in-flight counters
pub struct Dispatcher {
    width: usize,
    owner_cap: usize,
    spawn_jitter: f32,
    timeout_ticks: u64,
    policy: LaunchPolicy,
    max_queued: usize,

    active: Option<ActiveLaunch>,
    queue: VecDeque<(LaunchId, LaunchRequest)>,
    in_flight: PerSide<usize>,
    next_id: u64,
    rng: StdRng,
}

impl Dispatcher {
    pub fn new(config: &OrbisConfig) -> Self {
        Self {
            width: config.grid.width,
            owner_cap: config.owner_cap(),
            spawn_jitter: config.launch.spawn_jitter,
            timeout_ticks: config.launch.timeout_ticks,
            policy: config.launch.policy,
            max_queued: config.launch.max_queued,
            active: None,
            queue: VecDeque::new(),
            in_flight: PerSide::default(),
            next_id: 0,
            rng: StdRng::seed_from_u64(config.launch.seed),
        }
    }

    /// Accept a launch request at `tick`
    pub fn request(&mut self, request: LaunchRequest, tick: u64) -> LaunchStatus {
        if request.count == 0 || request.source == request.destination {
            debug!("Ignoring empty launch {:?}", request);
            return LaunchStatus::Ignored;
        }

        // Waiting launches keep their order even if the lock is free now
        if self.active.is_none() && self.queue.is_empty() {
            let id = self.allocate_id();
            self.begin(id, request, tick);
            return LaunchStatus::Started(id);
        }

        match self.policy {
            LaunchPolicy::Queue if self.queue.len() < self.max_queued => {
                let id = self.allocate_id();
                self.queue.push_back((id, request));
                debug!("Launch {:?} queued ({} waiting)", id, self.queue.len());
                LaunchStatus::Queued(id)
            }
            _ => {
                warn!(
                    "⚠️ Launch of {} {} units dropped: lock held, {} queued",
                    request.count,
                    request.owner,
                    self.queue.len()
                );
                LaunchStatus::Dropped
            }
        }
    }

    /// Start the oldest queued launch if the lock is free
    pub fn start_next(&mut self, tick: u64) -> Option<LaunchId> {
        if self.active.is_some() {
            return None;
        }
        let (id, request) = self.queue.pop_front()?;
        self.begin(id, request, tick);
        Some(id)
    }

    fn begin(&mut self, id: LaunchId, request: LaunchRequest, tick: u64) {
        debug!(
            "🚀 Launch {:?}: {} {} units {} → {}",
            id, request.count, request.owner, request.source, request.destination
        );
        self.active = Some(ActiveLaunch {
            id,
            request,
            phase: LaunchPhase::VelocityReadPending,
            slots: Vec::new(),
            velocity: Vec::new(),
            last_progress: tick,
        });
    }

    fn allocate_id(&mut self) -> LaunchId {
        self.next_id += 1;
        LaunchId(self.next_id)
    }

    /// Pick free slots from the just-computed velocity texture
    ///
    /// Slots `[0, num_places)` are anchors and are never scanned. The grant
    /// is truncated by free capacity and by the owner's in-flight cap.
    pub fn on_velocity_readback(
        &mut self,
        id: LaunchId,
        velocity: &Texture,
        num_places: usize,
        tick: u64,
    ) -> VelocityStep {
        let Some(mut launch) = self.active.take() else {
            return VelocityStep::Stale;
        };
        if launch.id != id || launch.phase != LaunchPhase::VelocityReadPending {
            self.active = Some(launch);
            return VelocityStep::Stale;
        }

        let request = launch.request;
        let allowance = self.owner_cap.saturating_sub(self.in_flight[request.owner]);
        let wanted = request.count.min(allowance);

        let slots: Vec<usize> = velocity
            .texels()
            .iter()
            .enumerate()
            .skip(num_places)
            .filter(|(_, texel)| is_free(texel))
            .map(|(slot, _)| slot)
            .take(wanted)
            .collect();

        if slots.len() < request.count {
            warn!(
                "⚠️ Launch {:?}: granted {}/{} units (free pool or {} cap {} reached)",
                id,
                slots.len(),
                request.count,
                request.owner,
                self.owner_cap
            );
        }

        let target = encode_target(request.destination, self.width);
        launch.velocity = slots
            .iter()
            .map(|&slot| SlotPatch::new(slot, Texel::new(0.0, 0.0, 0.0, target)))
            .collect();
        launch.slots = slots;
        launch.phase = LaunchPhase::SlotsAllocated;
        launch.last_progress = tick;

        if launch.slots.is_empty() {
            return VelocityStep::Finished(self.commit(launch, Vec::new()));
        }
        self.active = Some(launch);
        VelocityStep::PlaceUnits(id)
    }

    /// Record that the position readback for `id` has been requested
    pub fn await_positions(&mut self, id: LaunchId) {
        if let Some(launch) = self.active.as_mut() {
            if launch.id == id && launch.phase == LaunchPhase::SlotsAllocated {
                launch.phase = LaunchPhase::PositionReadPending;
            }
        }
    }

    /// Place the reserved units next to the source anchor and commit
    ///
    /// Returns `None` for a readback that belongs to no pending launch.
    pub fn on_position_readback(&mut self, id: LaunchId, position: &Texture) -> OrbisResult<Option<Commit>> {
        let Some(launch) = self.active.take() else {
            return Ok(None);
        };
        if launch.id != id || launch.phase != LaunchPhase::PositionReadPending {
            self.active = Some(launch);
            return Ok(None);
        }

        let anchor = match position.read(launch.request.source) {
            Ok(texel) => texel.xyz(),
            Err(e) => {
                self.active = Some(launch);
                return Err(e);
            }
        };
        let tag = launch.request.owner.tag();
        let jitter = self.spawn_jitter;

        let patches = launch
            .slots
            .iter()
            .map(|&slot| {
                let offset = [
                    self.rng.gen_range(-jitter..=jitter),
                    self.rng.gen_range(-jitter..=jitter),
                    self.rng.gen_range(-jitter..=jitter),
                ];
                SlotPatch::new(slot, Texel::from_xyz(add(anchor, offset), tag))
            })
            .collect();

        Ok(Some(self.commit(launch, patches)))
    }

    fn commit(&mut self, mut launch: ActiveLaunch, position: Vec<SlotPatch>) -> Commit {
        launch.phase = LaunchPhase::Committed;
        self.in_flight[launch.request.owner] += launch.slots.len();

        info!(
            "✅ Launch {:?} committed: {} {} units {} → {}",
            launch.id,
            launch.slots.len(),
            launch.request.owner,
            launch.request.source,
            launch.request.destination
        );

        Commit {
            outcome: LaunchOutcome {
                id: launch.id,
                request: launch.request,
                granted: launch.slots,
            },
            velocity: launch.velocity,
            position,
        }
    }

    /// Force-release a lock that made no progress for `timeout_ticks`
    pub fn watchdog(&mut self, tick: u64) -> Option<AbortedLaunch> {
        let launch = self.active.as_ref()?;
        let idle_ticks = tick.saturating_sub(launch.last_progress);
        if idle_ticks < self.timeout_ticks {
            return None;
        }

        let aborted = AbortedLaunch {
            id: launch.id,
            request: launch.request,
            phase: launch.phase,
            idle_ticks,
        };
        warn!(
            "🔓 Launch {:?} stuck in {:?} for {} ticks; releasing lock",
            aborted.id, aborted.phase, idle_ticks
        );
        self.active = None;
        Some(aborted)
    }

    /// Return units of `side` to the pool (arrived or reclaimed)
    pub fn release(&mut self, side: Side, count: usize) {
        self.in_flight[side] = self.in_flight[side].saturating_sub(count);
    }

    /// True while a launch holds the single-flight lock
    pub fn is_locked(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<(LaunchId, LaunchPhase)> {
        self.active.as_ref().map(|l| (l.id, l.phase))
    }

    /// Phase of a launch that has not finished yet
    pub fn phase(&self, id: LaunchId) -> Option<LaunchPhase> {
        match &self.active {
            Some(launch) if launch.id == id => Some(launch.phase),
            _ => self
                .queue
                .iter()
                .any(|(queued, _)| *queued == id)
                .then_some(LaunchPhase::Requested),
        }
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight(&self, side: Side) -> usize {
        self.in_flight[side]
    }

    pub fn owner_cap(&self) -> usize {
        self.owner_cap
    }
}
