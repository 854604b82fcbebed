//! Simulator - drives rounds of a particle system and reports state changes.

use crate::error::SimError;

use amoebot_core::{MovementKind, Node, RoundSummary, System, SystemEvent};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of particles to build
    pub num_particles: usize,

    /// Maximum number of rounds (0 = unlimited)
    pub max_rounds: u64,

    /// Stop as soon as a round produces no movement
    pub stop_on_deadlock: bool,

    /// Stop as soon as the system becomes disconnected
    pub stop_on_disconnect: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_particles: 10,
            max_rounds: 500,
            stop_on_deadlock: true,
            stop_on_disconnect: false,
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    Terminated,
    Deadlocked,
    Disconnected,
    RoundLimit,
    Requested,
    Fault,
}

impl StopReason {
    pub fn name(&self) -> &'static str {
        match self {
            StopReason::Terminated => "terminated",
            StopReason::Deadlocked => "deadlocked",
            StopReason::Disconnected => "disconnected",
            StopReason::RoundLimit => "round_limit",
            StopReason::Requested => "requested",
            StopReason::Fault => "fault",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Notices for front ends and telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulatorEvent {
    Started,
    Stopped(StopReason),
    RoundCompleted { round: u64, movements: u64 },
    NumMovementsChanged(u64),
    ValidityChanged(bool),
    ConnectivityChanged(bool),
    DeadlockChanged(bool),
    TerminationChanged(bool),
    Log { message: String, is_error: bool },
}

/// Cancels a running simulation between rounds.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Requests a stop; the current round still completes.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Last reported value of each system-level condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Status {
    valid: bool,
    connected: bool,
    deadlocked: bool,
    terminated: bool,
}

impl Status {
    fn of(system: &System) -> Self {
        Self {
            valid: system.is_valid(),
            connected: system.is_connected(),
            deadlocked: system.is_deadlocked(),
            terminated: system.is_terminated(),
        }
    }
}

/// The Simulator - owns a system and drives it round by round.
pub struct Simulator {
    /// Configuration
    pub config: SimConfig,

    system: Option<System>,
    status: Option<Status>,
    stop: StopHandle,
    events: Vec<SimulatorEvent>,
    last_round_events: Vec<SystemEvent>,
    /// Set by a movement fault; cleared by [`Simulator::set_system`]
    halted: bool,
}

impl Simulator {
    /// Creates a simulator without a system.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            system: None,
            status: None,
            stop: StopHandle::default(),
            events: Vec::new(),
            last_round_events: Vec::new(),
            halted: false,
        }
    }

    /// Replaces the simulated system and resets all reported state.
    pub fn set_system(&mut self, system: System) {
        info!(
            "Loaded system: {} particles, seed={:?}",
            system.num_particles(),
            system.seed()
        );
        self.status = Some(Status::of(&system));
        self.system = Some(system);
        self.last_round_events.clear();
        self.halted = false;
        self.stop.reset();
        self.emit(SimulatorEvent::NumMovementsChanged(0));
    }

    pub fn system(&self) -> Option<&System> {
        self.system.as_ref()
    }

    /// Handle for stopping [`Simulator::run`] from elsewhere.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Requests a stop before the next round.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Advances exactly one round.
    ///
    /// After a movement fault every further round fails with
    /// [`SimError::Halted`] until a new system is loaded.
    pub fn round(&mut self) -> Result<RoundSummary, SimError> {
        let system = self.system.as_mut().ok_or(SimError::NoSystem)?;
        if self.halted {
            return Err(SimError::Halted);
        }

        match system.round() {
            Ok(summary) => {
                let movements = system.num_movements();
                self.last_round_events = system.drain_events();
                debug!(
                    "round {}: {} system events, {} movements total",
                    summary.round,
                    self.last_round_events.len(),
                    movements
                );
                self.emit(SimulatorEvent::RoundCompleted {
                    round: summary.round,
                    movements: summary.movements,
                });
                if summary.movements > 0 {
                    self.emit(SimulatorEvent::NumMovementsChanged(movements));
                }
                self.refresh_status();
                Ok(summary)
            }
            Err(err) => {
                error!("Round aborted: {}", err);
                self.last_round_events = system.drain_events();
                self.halted = true;
                self.log(format!("round aborted: {err}"), true);
                self.emit(SimulatorEvent::Stopped(StopReason::Fault));
                Err(err.into())
            }
        }
    }

    /// Runs rounds until the algorithm terminates, a stop condition from
    /// the configuration holds, a stop is requested, or the round limit is
    /// reached.
    pub fn run(&mut self) -> Result<StopReason, SimError> {
        self.run_with(|_, _| {})
    }

    /// Like [`Simulator::run`], calling `on_round` after every completed round.
    pub fn run_with<F>(&mut self, mut on_round: F) -> Result<StopReason, SimError>
    where
        F: FnMut(&Simulator, &RoundSummary),
    {
        if self.system.is_none() {
            return Err(SimError::NoSystem);
        }
        if self.halted {
            return Err(SimError::Halted);
        }
        info!(
            "Running: seed={}, max_rounds={}",
            self.config.seed, self.config.max_rounds
        );
        self.emit(SimulatorEvent::Started);

        let reason = loop {
            if self.stop.is_stop_requested() {
                break StopReason::Requested;
            }
            if self.config.max_rounds > 0 && self.num_rounds() >= self.config.max_rounds {
                break StopReason::RoundLimit;
            }

            let summary = self.round()?;
            on_round(self, &summary);

            if self.is_terminated() {
                break StopReason::Terminated;
            }
            if self.config.stop_on_deadlock && self.is_deadlocked() {
                break StopReason::Deadlocked;
            }
            if self.config.stop_on_disconnect && self.is_disconnected() {
                break StopReason::Disconnected;
            }
        };

        info!(
            "Stopped after {} rounds ({}), {} movements",
            self.num_rounds(),
            reason,
            self.num_movements()
        );
        self.emit(SimulatorEvent::Stopped(reason));
        Ok(reason)
    }

    /// Activates the particle at `(x, y)` once, outside any round.
    pub fn round_for_particle_at(&mut self, x: i32, y: i32) -> Result<MovementKind, SimError> {
        let system = self.system.as_mut().ok_or(SimError::NoSystem)?;
        if self.halted {
            return Err(SimError::Halted);
        }
        let movements_before = system.num_movements();

        let kind = match system.activate_at(Node::new(x, y)) {
            Ok(kind) => kind,
            Err(err) => {
                warn!("Activation at ({}, {}) failed: {}", x, y, err);
                if err.is_movement_fault() {
                    self.last_round_events = system.drain_events();
                    self.halted = true;
                }
                self.log(format!("activation at ({x}, {y}) failed: {err}"), true);
                return Err(err.into());
            }
        };

        let movements = system.num_movements();
        self.last_round_events = system.drain_events();
        if movements != movements_before {
            self.emit(SimulatorEvent::NumMovementsChanged(movements));
        }
        self.refresh_status();
        Ok(kind)
    }

    pub fn is_valid(&self) -> bool {
        self.system.as_ref().is_some_and(System::is_valid)
    }

    /// True after a movement fault, until a new system is loaded.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn is_disconnected(&self) -> bool {
        self.system.as_ref().is_some_and(|s| !s.is_connected())
    }

    pub fn is_terminated(&self) -> bool {
        self.system.as_ref().is_some_and(System::is_terminated)
    }

    pub fn is_deadlocked(&self) -> bool {
        self.system.as_ref().is_some_and(System::is_deadlocked)
    }

    pub fn num_particles(&self) -> usize {
        self.system.as_ref().map_or(0, System::num_particles)
    }

    pub fn num_movements(&self) -> u64 {
        self.system.as_ref().map_or(0, System::num_movements)
    }

    pub fn num_rounds(&self) -> u64 {
        self.system.as_ref().map_or(0, System::num_rounds)
    }

    /// Engine events of the most recent round or single activation.
    pub fn last_round_events(&self) -> &[SystemEvent] {
        &self.last_round_events
    }

    /// Hands over all notices since the last drain.
    pub fn drain_events(&mut self) -> Vec<SimulatorEvent> {
        std::mem::take(&mut self.events)
    }

    fn refresh_status(&mut self) {
        let Some(system) = self.system.as_ref() else {
            return;
        };
        let now = Status::of(system);
        let before = self.status.replace(now);

        if before.map(|s| s.valid) != Some(now.valid) {
            if !now.valid {
                if let Err(err) = system.check_validity() {
                    error!("System invalid: {}", err);
                }
            }
            self.emit(SimulatorEvent::ValidityChanged(now.valid));
        }
        if before.map(|s| s.connected) != Some(now.connected) {
            if !now.connected {
                warn!("System disconnected after round {}", self.num_rounds());
            }
            self.emit(SimulatorEvent::ConnectivityChanged(now.connected));
        }
        if before.map(|s| s.deadlocked) != Some(now.deadlocked) {
            self.emit(SimulatorEvent::DeadlockChanged(now.deadlocked));
        }
        if before.map(|s| s.terminated) != Some(now.terminated) {
            self.emit(SimulatorEvent::TerminationChanged(now.terminated));
        }
    }

    fn log(&mut self, message: String, is_error: bool) {
        self.emit(SimulatorEvent::Log { message, is_error });
    }

    fn emit(&mut self, event: SimulatorEvent) {
        self.events.push(event);
    }
}
