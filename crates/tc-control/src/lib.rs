//! `tc-control` — the step-loop controller of the traffic_ctl workspace.
//!
//! # One tick
//!
//! ```text
//! ⓪ Commands  — queued spawns, rule/load settings, manual light changes
//!               are applied in send order.
//! ① Load      — LoadGenerator may queue a burst of random-route spawns.
//! ② Spawn     — routes are registered once per session, then at most
//!               `max_spawns_per_tick` vehicles are added to the engine.
//! ③ Step      — the engine advances by one step.
//! ④ Refresh   — the tracker reconciles active vehicles and publishes a
//!               new VehicleSnapshot.
//! ⑤ Rule      — the signal rule reacts to the fresh snapshot.
//! ⑥ Lights    — every light's phase/state/program is published, including
//!               a change the rule just made.
//! ```
//!
//! A failing stage is logged (transient engine failures at most once per
//! throttle window), recorded in the [`TickReport`], and does not stop the
//! remaining stages or the driver.
//!
//! # Threads
//!
//! `play` starts exactly one driver thread.  It ticks, then waits
//! `tick_interval` on a stop channel, so `pause` and `shutdown` interrupt
//! the wait instead of sleeping it out.  Both wait at most `join_timeout`
//! for the driver to exit.  All ticks, from the driver or `step_once`,
//! run under one lock, so the engine is never driven concurrently.
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use tc_control::ControllerBuilder;
//! use tc_engine::MemoryEngine;
//!
//! let controller = ControllerBuilder::new(MemoryEngine::new(network))
//!     .catalog(catalog)
//!     .build()?;
//! controller.enqueue_spawn("r0", "car", 5)?;
//! controller.step_once()?;
//! println!("{} vehicles", controller.vehicle_count());
//! ```

pub mod builder;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod observer;
pub mod throttle;
pub mod tick;

#[cfg(test)]
mod tests;

pub use builder::ControllerBuilder;
pub use command::Command;
pub use config::ControllerConfig;
pub use controller::{FALLBACK_EDGE_LENGTH_M, RunState, StepController};
pub use error::{ControlError, ControlResult};
pub use observer::{NoopObserver, TickObserver};
pub use throttle::LogThrottle;
pub use tick::{TickFailure, TickReport, TickStage};
