//! Amoebot Simulation Harness
//!
//! This crate drives an [`amoebot_core::System`] from the outside: it builds
//! initial configurations, runs rounds until a stop condition holds, reports
//! state changes and records frames for offline viewing.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  ScenarioRunner                      │
//! │   ┌──────────────┐        ┌──────────────────────┐   │
//! │   │ SystemBuilder│──────► │      Simulator       │   │
//! │   │ line/hexagon │ System │ round / run / stop   │   │
//! │   │ random_blob  │        │ SimulatorEvent       │   │
//! │   └──────────────┘        └──────────┬───────────┘   │
//! │                                      │ per round     │
//! │                           ┌──────────▼───────────┐   │
//! │                           │ SimExport (JSON)     │   │
//! │                           └──────────────────────┘   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use amoebot_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42, 10).run(ScenarioId::Inchworm);
//! assert!(result.passed);
//! ```

pub mod algorithms;
mod builder;
mod error;
mod exporter;
mod runner;
pub mod scenarios;
mod simulator;

pub use builder::{origin_particle, Orientation, SystemBuilder};
pub use error::SimError;
pub use exporter::{ParticleFrame, SimExport, SimFrame};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use simulator::{SimConfig, Simulator, SimulatorEvent, StopHandle, StopReason};
