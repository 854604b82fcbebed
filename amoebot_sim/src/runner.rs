//! Scenario runner - builds a scenario, drives it and judges the outcome.

use crate::algorithms::{Beacon, Dummy, Inchworm, Jiggle, TokenRelay};
use crate::builder::{origin_particle, Orientation, SystemBuilder};
use crate::exporter::{SimExport, SimFrame};
use crate::scenarios::ScenarioId;
use crate::simulator::{SimConfig, Simulator, StopReason};

use amoebot_core::{MovementKind, Node, RoundSummary, System, SystemError, SystemEvent};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Movements each inchworm may initiate.
const INCHWORM_BUDGET: u32 = 6;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Rounds executed
    pub rounds: u64,

    /// Total movement weight
    pub movements: u64,

    /// Number of particles at end
    pub final_particle_count: usize,

    /// Why the run ended
    pub stop_reason: StopReason,

    /// Whether the final configuration is connected
    pub connected: bool,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioMetrics {
    /// Algorithm executions
    pub activations: u64,

    /// Activations skipped after a handover
    pub credited: u64,

    /// Push and pull movements
    pub handovers: u64,

    pub expansions: u64,
    pub contractions: u64,

    /// Tokens handed to another particle
    pub token_transfers: u64,
}

impl ScenarioMetrics {
    fn record(&mut self, summary: &RoundSummary, events: &[SystemEvent]) {
        self.activations += summary.activations as u64;
        self.credited += summary.credited as u64;

        for event in events {
            match event {
                SystemEvent::Moved { kind, .. } => match kind {
                    MovementKind::Expand => self.expansions += 1,
                    MovementKind::Contract => self.contractions += 1,
                    kind if kind.is_handover() => self.handovers += 1,
                    _ => {}
                },
                SystemEvent::TokenMoved { to: Some(_), .. } => self.token_transfers += 1,
                _ => {}
            }
        }
    }
}

/// Runs demonstration scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Number of particles
    num_particles: usize,

    /// Maximum number of rounds
    max_rounds: u64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, num_particles: usize) -> Self {
        Self {
            seed,
            num_particles,
            max_rounds: SimConfig::default().max_rounds,
        }
    }

    /// Runner for the seed, size and round limit of a simulator configuration.
    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.seed, config.num_particles).with_max_rounds(config.max_rounds)
    }

    /// Sets the round limit. Randomized scenarios never terminate, so the
    /// limit is at least one round.
    pub fn with_max_rounds(mut self, rounds: u64) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }

    /// Simulator configuration for a scenario.
    pub fn config(&self, scenario: ScenarioId) -> SimConfig {
        SimConfig {
            seed: self.seed,
            num_particles: self.num_particles,
            max_rounds: self.max_rounds,
            // token passes and finished-front checks produce idle rounds
            stop_on_deadlock: scenario == ScenarioId::Idle,
            stop_on_disconnect: false,
        }
    }

    /// Builds the initial configuration of a scenario.
    pub fn build(&self, scenario: ScenarioId) -> Result<System, SystemError> {
        let count = self.num_particles;
        let compass = Orientation::Fixed(0);
        let mut builder = SystemBuilder::new(self.seed);

        match scenario {
            ScenarioId::Idle => builder.with_orientation(compass).line(count, 0, &Dummy),
            ScenarioId::Inchworm => builder
                .with_orientation(compass)
                .line(count, 0, &Inchworm::new(0, INCHWORM_BUDGET)),
            ScenarioId::Relay => {
                let mut system = builder
                    .with_orientation(compass)
                    .line(count, 0, &TokenRelay::new(0))?;
                if let Some(origin) = origin_particle(&system) {
                    let beacon = Beacon {
                        origin: Node::new(0, 0),
                    };
                    system.put_token(origin, Arc::new(beacon))?;
                }
                Ok(system)
            }
            ScenarioId::Jiggle => {
                let jiggle = Jiggle::new(self.seed.wrapping_mul(0x517cc1b727220a95));
                builder.hexagon(hexagon_radius(count), &jiggle)
            }
            ScenarioId::Blob => {
                let jiggle = Jiggle::new(self.seed.wrapping_mul(0x517cc1b727220a95));
                builder.random_blob(count, &jiggle)
            }
        }
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, None)
    }

    /// Runs a scenario and records one frame per round.
    pub fn run_recorded(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        let mut export = SimExport::new(scenario.name(), self.seed);
        let result = self.execute(scenario, Some(&mut export));
        export.finalize(result.passed, result.failure_reason.clone());
        (result, export)
    }

    fn execute(&self, scenario: ScenarioId, mut export: Option<&mut SimExport>) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let system = match self.build(scenario) {
            Ok(system) => system,
            Err(err) => {
                warn!("Setup of {} failed: {}", scenario.name(), err);
                return self.setup_failure(scenario, err);
            }
        };
        if let Some(export) = export.as_deref_mut() {
            export.add_frame(SimFrame::capture(&system, &[]));
        }

        let mut sim = Simulator::new(self.config(scenario));
        sim.set_system(system);

        let mut metrics = ScenarioMetrics::default();
        let mut first_invalid_round = None;
        let outcome = sim.run_with(|sim, summary| {
            let events = sim.last_round_events();
            metrics.record(summary, events);

            if first_invalid_round.is_none() && !sim.is_valid() {
                first_invalid_round = Some(summary.round);
            }
            if let (Some(export), Some(system)) = (export.as_deref_mut(), sim.system()) {
                export.add_frame(SimFrame::capture(system, events));
            }
            if summary.round % 50 == 0 {
                debug!(
                    "  round {} | movements={} | connected={}",
                    summary.round,
                    sim.num_movements(),
                    !sim.is_disconnected()
                );
            }
        });

        let (stop_reason, fault) = match outcome {
            Ok(reason) => (reason, None),
            Err(err) => (StopReason::Fault, Some(format!("movement fault: {err}"))),
        };

        let failure_reason = fault
            .or_else(|| first_invalid_round.map(|round| format!("occupancy invalid after round {round}")))
            .or_else(|| self.check(scenario, &sim, stop_reason));
        let passed = failure_reason.is_none();

        info!(
            "{} {} complete: {} rounds, {} movements, {} handovers ({})",
            if passed { "✓" } else { "✗" },
            scenario.name(),
            sim.num_rounds(),
            sim.num_movements(),
            metrics.handovers,
            stop_reason
        );

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            rounds: sim.num_rounds(),
            movements: sim.num_movements(),
            final_particle_count: sim.num_particles(),
            stop_reason,
            connected: !sim.is_disconnected(),
            failure_reason,
            metrics,
        }
    }

    /// Scenario-specific assertions on the final state.
    fn check(&self, scenario: ScenarioId, sim: &Simulator, stop: StopReason) -> Option<String> {
        if scenario.is_randomized() {
            return (stop != StopReason::RoundLimit)
                .then(|| format!("random movers stopped early ({stop})"));
        }

        match scenario {
            ScenarioId::Idle => {
                if stop != StopReason::Deadlocked {
                    Some(format!("expected a deadlock, stopped by {stop}"))
                } else if sim.is_disconnected() {
                    Some("idle line became disconnected".to_string())
                } else {
                    None
                }
            }
            ScenarioId::Inchworm => {
                if stop != StopReason::Terminated {
                    Some(format!("not terminated after {} rounds ({stop})", sim.num_rounds()))
                } else if sim.num_movements() == 0 && self.num_particles > 0 {
                    Some("no particle moved".to_string())
                } else {
                    None
                }
            }
            ScenarioId::Relay => {
                if stop != StopReason::Terminated {
                    return Some(format!("relay not finished after {} rounds ({stop})", sim.num_rounds()));
                }
                let system = sim.system()?;
                let far_end = Node::new(self.num_particles.saturating_sub(1) as i32, 0);
                let holder = system
                    .particles()
                    .find(|(_, particle)| particle.tokens().count_of::<Beacon>() > 0)
                    .map(|(_, particle)| particle.shape().head());
                match holder {
                    Some(node) if node == far_end => None,
                    Some(node) => Some(format!("beacon stopped at {node}, expected {far_end}")),
                    None if self.num_particles == 0 => None,
                    None => Some("beacon lost".to_string()),
                }
            }
            ScenarioId::Jiggle | ScenarioId::Blob => None,
        }
    }

    fn setup_failure(&self, scenario: ScenarioId, err: SystemError) -> ScenarioResult {
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            rounds: 0,
            movements: 0,
            final_particle_count: 0,
            stop_reason: StopReason::Fault,
            connected: false,
            failure_reason: Some(format!("setup failed: {err}")),
            metrics: ScenarioMetrics::default(),
        }
    }
}

/// Largest hexagon radius whose hexagon fits into `count` particles.
fn hexagon_radius(count: usize) -> i32 {
    let mut radius = 0;
    while 3 * (radius + 1) * (radius + 2) < count {
        radius += 1;
    }
    radius as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hexagon_radius() {
        assert_eq!(hexagon_radius(0), 0);
        assert_eq!(hexagon_radius(6), 0);
        assert_eq!(hexagon_radius(7), 1);
        assert_eq!(hexagon_radius(18), 1);
        assert_eq!(hexagon_radius(19), 2);
    }

    #[test]
    fn test_idle_deadlocks_after_one_round() {
        let result = ScenarioRunner::new(42, 5).run(ScenarioId::Idle);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.rounds, 1);
        assert_eq!(result.movements, 0);
        assert_eq!(result.metrics.activations, 5);
        assert_eq!(result.stop_reason, StopReason::Deadlocked);
    }

    #[test]
    fn test_inchworm_terminates_with_handovers() {
        let result = ScenarioRunner::new(42, 6).run(ScenarioId::Inchworm);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.expansions > 0);
        assert!(result.metrics.contractions > 0);
        assert_eq!(result.final_particle_count, 6);
    }

    #[test]
    fn test_relay_delivers_to_far_end() {
        let result = ScenarioRunner::new(9, 7).run(ScenarioId::Relay);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.token_transfers, 6);
        assert_eq!(result.movements, 0);
    }

    #[test]
    fn test_random_movers_stay_valid() {
        for scenario in [ScenarioId::Jiggle, ScenarioId::Blob] {
            let result = ScenarioRunner::new(3, 12)
                .with_max_rounds(40)
                .run(scenario);
            assert!(result.passed, "{scenario}: {:?}", result.failure_reason);
            assert_eq!(result.rounds, 40);
            assert_eq!(
                result.metrics.activations + result.metrics.credited,
                40 * result.final_particle_count as u64
            );
        }
    }

    #[test]
    fn test_run_recorded_has_initial_frame_and_one_per_round() {
        let (result, export) = ScenarioRunner::new(42, 4).run_recorded(ScenarioId::Inchworm);
        assert_eq!(export.frames.len() as u64, result.rounds + 1);
        assert_eq!(export.frames[0].round, 0);
        assert_eq!(export.rounds, result.rounds);
        assert_eq!(export.passed, result.passed);
    }

    #[test]
    fn test_from_config_uses_seed_and_size() {
        let config = SimConfig {
            seed: 77,
            num_particles: 5,
            max_rounds: 0,
            ..Default::default()
        };
        let runner = ScenarioRunner::from_config(&config);
        let scenario_config = runner.config(ScenarioId::Blob);
        assert_eq!(scenario_config.seed, 77);
        assert_eq!(scenario_config.num_particles, 5);
        assert_eq!(scenario_config.max_rounds, 1);

        let result = runner.run(ScenarioId::Idle);
        assert_eq!(result.seed, 77);
        assert_eq!(result.final_particle_count, 5);
    }

    #[test]
    fn test_randomized_scenarios_judged_by_round_limit() {
        let runner = ScenarioRunner::new(5, 6).with_max_rounds(3);
        let system = runner.build(ScenarioId::Blob).unwrap();
        let mut sim = Simulator::new(runner.config(ScenarioId::Blob));
        sim.set_system(system);

        let randomized: Vec<_> = ScenarioId::all()
            .into_iter()
            .filter(ScenarioId::is_randomized)
            .collect();
        assert_eq!(randomized, vec![ScenarioId::Jiggle, ScenarioId::Blob]);

        for scenario in randomized {
            assert_eq!(runner.check(scenario, &sim, StopReason::RoundLimit), None);
            assert!(runner.check(scenario, &sim, StopReason::Deadlocked).is_some());
            assert!(runner.check(scenario, &sim, StopReason::Terminated).is_some());
        }
        assert!(runner
            .check(ScenarioId::Inchworm, &sim, StopReason::RoundLimit)
            .is_some());
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = ScenarioRunner::new(11, 10).with_max_rounds(30).run(ScenarioId::Blob);
        let b = ScenarioRunner::new(11, 10).with_max_rounds(30).run(ScenarioId::Blob);
        assert_eq!(a.movements, b.movements);
        assert_eq!(a.metrics, b.metrics);
    }
}
