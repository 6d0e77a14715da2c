//! `tc-signal` — traffic light state and the reactive signal rule.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                   |
//! |------------|------------------------------------------------------------|
//! | [`config`] | `SignalRuleConfig` with clamped setters                    |
//! | [`rule`]   | `SignalRuleEngine`, `RuleOutcome`                          |
//! | [`lights`] | `LightSnapshot`, `pull_lights`                             |
//!
//! # The rule
//!
//! One light watches one edge.  When at least `vehicle_threshold` vehicles
//! are on the edge the light is switched to `green_phase_index`, otherwise
//! to `red_phase_index`.  Changes are at least `debounce_interval_ms` apart.
//! Time comes from a caller-supplied millisecond clock so tests can drive
//! the debounce window directly.

pub mod config;
pub mod lights;
pub mod rule;


pub use config::SignalRuleConfig;
pub use lights::{LightSnapshot, pull_lights};
pub use rule::{RuleOutcome, SignalRuleEngine};
