//! # rollbar-wp Engine
//!
//! Drives the plugin from construction to a running reporting backend.
//!
//! - `lifecycle`: one plugin instance per process
//! - `plugin`: settings ownership, persistence and the test-trigger path
//! - `sequencer`: fail-soft server-side and client-side initialization
//! - `triggers`: host trigger points and their registered actions

mod error;
pub mod lifecycle;
pub mod plugin;
pub mod sequencer;
pub mod triggers;

pub use error::PluginError;
pub use lifecycle::{global, Lifecycle, LifecycleState};
pub use plugin::{Plugin, PluginBuilder, TestRequest, TEST_MESSAGE};
pub use sequencer::{ClientOutcome, ServerOutcome};
pub use triggers::{Trigger, TEST_ROUTE};
