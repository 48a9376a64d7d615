//! Process-scoped plugin instance with guarded one-time construction.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use opentelemetry::KeyValue;
use tracing::info;

use rollbar_wp_telemetry::EventLogger;

use crate::error::PluginError;
use crate::plugin::{Plugin, PluginBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
}

/// Holds at most one [`Plugin`]. Concurrent first access constructs once;
/// a failed construction leaves the cell empty for the next caller.
#[derive(Default)]
pub struct Lifecycle {
    cell: OnceCell<Arc<Plugin>>,
}

static GLOBAL: Lifecycle = Lifecycle::new();

/// The lifecycle shared by the whole process.
pub fn global() -> &'static Lifecycle {
    &GLOBAL
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        if self.cell.get().is_some() {
            LifecycleState::Initialized
        } else {
            LifecycleState::Uninitialized
        }
    }

    pub fn get(&self) -> Option<Arc<Plugin>> {
        self.cell.get().cloned()
    }

    /// Returns the instance, building it on first access.
    ///
    /// `builder` only runs on the constructing call: resolve settings,
    /// register triggers, then seed the store on first run.
    pub fn instance<F>(&self, builder: F) -> Result<Arc<Plugin>, PluginError>
    where
        F: FnOnce() -> PluginBuilder,
    {
        self.cell
            .get_or_try_init(|| {
                let plugin = builder().build()?;
                plugin.register_triggers();
                let seeded = plugin.seed_store()?;
                info!(seeded, "Plugin initialized");
                EventLogger::log_event(
                    "plugin_initialized",
                    vec![KeyValue::new("seeded", seeded)],
                );
                Ok::<_, PluginError>(Arc::new(plugin))
            })
            .cloned()
    }
}
