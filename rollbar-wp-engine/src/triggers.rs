//! Host trigger points and what the plugin registers against them.

use std::collections::BTreeMap;
use std::fmt;

/// Points in the host request lifecycle the plugin hooks into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Trigger {
    /// Early bootstrap, before any request handling.
    Bootstrap,
    /// Public page `<head>` rendering.
    PageHead,
    /// Admin page `<head>` rendering.
    AdminHead,
    RestApiInit,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::Bootstrap => "bootstrap",
            Trigger::PageHead => "page_head",
            Trigger::AdminHead => "admin_head",
            Trigger::RestApiInit => "rest_api_init",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    InitServerLogging,
    InitClientLogging,
    RegisterTestEndpoint,
}

/// The REST route served for the test trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub method: &'static str,
    pub path: &'static str,
}

pub const TEST_ROUTE: Route = Route {
    method: "POST",
    path: "/rollbar/v1/test-php-logging",
};

/// Ordered actions per trigger.
#[derive(Debug, Clone, Default)]
pub struct TriggerTable {
    actions: BTreeMap<Trigger, Vec<Action>>,
}

impl TriggerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The plugin's standard registrations.
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register(Trigger::Bootstrap, Action::InitServerLogging);
        table.register(Trigger::PageHead, Action::InitClientLogging);
        table.register(Trigger::AdminHead, Action::InitClientLogging);
        table.register(Trigger::RestApiInit, Action::RegisterTestEndpoint);
        table
    }

    pub fn register(&mut self, trigger: Trigger, action: Action) {
        self.actions.entry(trigger).or_default().push(action);
    }

    pub fn actions(&self, trigger: Trigger) -> &[Action] {
        self.actions.get(&trigger).map_or(&[], Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registrations() {
        let table = TriggerTable::standard();
        assert_eq!(table.actions(Trigger::Bootstrap), [Action::InitServerLogging]);
        assert_eq!(table.actions(Trigger::PageHead), [Action::InitClientLogging]);
        assert_eq!(table.actions(Trigger::AdminHead), [Action::InitClientLogging]);
        assert_eq!(
            table.actions(Trigger::RestApiInit),
            [Action::RegisterTestEndpoint]
        );
    }

    #[test]
    fn unregistered_trigger_has_no_actions() {
        assert!(TriggerTable::new().actions(Trigger::Bootstrap).is_empty());
    }
}
