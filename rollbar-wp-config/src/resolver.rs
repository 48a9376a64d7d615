//! Settings resolution.
//!
//! Layers, lowest first: registry defaults, the deployment environment
//! variable (only for `environment`, only when nothing is persisted), then
//! persisted options. The plugin keys are coerced on the way in, and the
//! assembled record is handed to the settings filter chain last.

use tracing::{debug, instrument};

use rollbar_wp_core::hooks::FilterChain;
use rollbar_wp_core::severity::Severity;
use rollbar_wp_core::store::{OptionStore, OPTION_KEY};
use rollbar_wp_core::value::{OptionMap, SettingValue};

use crate::defaults;
use crate::error::SettingsError;
use crate::settings::*;

/// Filter point over the fully resolved settings.
pub const SETTINGS_FILTER: &str = "rollbar_plugin_settings";

/// Default variable naming the deployment environment.
pub const DEFAULT_ENVIRONMENT_VAR: &str = "WP_ENV";

/// Threshold used when no logging level is persisted.
pub const DEFAULT_LOGGING_LEVEL: Severity = Severity::Error;

/// Source of the deployment environment override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvOverride {
    /// Read the named variable from the process environment.
    Process(String),
    /// A fixed value, or none at all.
    Fixed(Option<String>),
}

impl EnvOverride {
    pub fn process(var: impl Into<String>) -> Self {
        EnvOverride::Process(var.into())
    }

    pub fn fixed(value: Option<&str>) -> Self {
        EnvOverride::Fixed(value.map(str::to_string))
    }

    pub fn lookup(&self) -> Option<String> {
        let value = match self {
            EnvOverride::Process(var) => std::env::var(var).ok(),
            EnvOverride::Fixed(value) => value.clone(),
        };
        value.filter(|v| !v.is_empty())
    }
}

impl Default for EnvOverride {
    fn default() -> Self {
        EnvOverride::process(DEFAULT_ENVIRONMENT_VAR)
    }
}

/// HTML attribute escaping applied to tokens and the logging level.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

fn non_empty<'a>(options: &'a OptionMap, name: &str) -> Option<&'a SettingValue> {
    options.get(name).filter(|value| !value.is_empty())
}

/// Builds the settings record from persisted options and the environment.
///
/// The result holds every name in [`known_options`], whatever the store
/// contains.
#[instrument(level = "debug", skip(store, filters))]
pub fn resolve(
    store: &dyn OptionStore,
    env: &EnvOverride,
    filters: &FilterChain<SettingsRecord>,
) -> Result<SettingsRecord, SettingsError> {
    let mut options = store.get(OPTION_KEY)?.unwrap_or_default();

    if non_empty(&options, ENVIRONMENT).is_none() {
        if let Some(environment) = env.lookup() {
            debug!(%environment, "Using environment from {:?}", env);
            options.insert(ENVIRONMENT.to_string(), environment.into());
        }
    }

    let mut record = SettingsRecord::new();

    record.set(
        PHP_LOGGING_ENABLED,
        options
            .get(PHP_LOGGING_ENABLED)
            .map_or(SettingValue::Int(0), SettingValue::to_flag),
    );
    record.set(
        JS_LOGGING_ENABLED,
        options
            .get(JS_LOGGING_ENABLED)
            .map_or(SettingValue::Int(0), SettingValue::to_flag),
    );
    record.set(
        SERVER_SIDE_ACCESS_TOKEN,
        non_empty(&options, SERVER_SIDE_ACCESS_TOKEN)
            .map(|token| escape_attr(token.to_string().trim()))
            .unwrap_or_default(),
    );
    record.set(
        CLIENT_SIDE_ACCESS_TOKEN,
        non_empty(&options, CLIENT_SIDE_ACCESS_TOKEN)
            .map(|token| token.to_string().trim().to_string())
            .unwrap_or_default(),
    );
    record.set(
        LOGGING_LEVEL,
        non_empty(&options, LOGGING_LEVEL).map_or(
            SettingValue::Int(i64::from(DEFAULT_LOGGING_LEVEL.rank())),
            |level| escape_attr(level.to_string().trim()).into(),
        ),
    );

    for option in defaults::list_options() {
        let value = match options.get(option) {
            Some(value) => value.clone(),
            None => match defaults::default_for(option) {
                Some(value) => value,
                None => continue,
            },
        };
        record.set(option, value);
    }

    let dropped = options
        .keys()
        .filter(|name| !record.contains(name))
        .count();
    if dropped > 0 {
        debug!(dropped, "Ignoring persisted options outside the registry");
    }

    Ok(filters.apply(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rollbar_wp_core::store::{JsonFileStore, MemoryStore};
    use tracing_test::traced_test;

    fn chain() -> FilterChain<SettingsRecord> {
        FilterChain::new(SETTINGS_FILTER)
    }

    fn store_with(entries: &[(&str, SettingValue)]) -> MemoryStore {
        let map = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        MemoryStore::with_entry(OPTION_KEY, map)
    }

    #[test]
    fn empty_store_resolves_to_defaults() {
        let record = resolve(&MemoryStore::new(), &EnvOverride::fixed(None), &chain()).unwrap();
        for option in known_options() {
            assert!(record.contains(option), "missing {option}");
        }
        assert_eq!(record.get(PHP_LOGGING_ENABLED).unwrap(), &SettingValue::Int(0));
        assert_eq!(record.get(LOGGING_LEVEL).unwrap(), &SettingValue::Int(1));
        assert_eq!(record.string(ENVIRONMENT).unwrap(), "production");
        assert_eq!(record.string(SERVER_SIDE_ACCESS_TOKEN).unwrap(), "");
    }

    #[traced_test]
    #[test]
    fn environment_variable_fills_empty_environment() {
        let store = store_with(&[
            (PHP_LOGGING_ENABLED, true.into()),
            (SERVER_SIDE_ACCESS_TOKEN, "abc".into()),
            (ENVIRONMENT, "".into()),
            (LOGGING_LEVEL, "notice".into()),
        ]);
        std::env::set_var("DEPLOY_ENV", "staging");
        let record = resolve(&store, &EnvOverride::process("DEPLOY_ENV"), &chain()).unwrap();
        assert_eq!(record.string(ENVIRONMENT).unwrap(), "staging");
        assert_eq!(record.string(LOGGING_LEVEL).unwrap(), "notice");
        assert_eq!(record.get(PHP_LOGGING_ENABLED).unwrap(), &SettingValue::Int(1));
        assert_eq!(record.string(SERVER_SIDE_ACCESS_TOKEN).unwrap(), "abc");
        assert!(logs_contain("Using environment from"));
    }

    #[test]
    fn persisted_environment_wins_over_variable() {
        let store = store_with(&[(ENVIRONMENT, "qa".into())]);
        let record =
            resolve(&store, &EnvOverride::fixed(Some("staging")), &chain()).unwrap();
        assert_eq!(record.string(ENVIRONMENT).unwrap(), "qa");
    }

    #[test]
    fn tokens_are_trimmed_and_escaped() {
        let store = store_with(&[
            (SERVER_SIDE_ACCESS_TOKEN, "  tok\"en  ".into()),
            (CLIENT_SIDE_ACCESS_TOKEN, " client ".into()),
            (JS_LOGGING_ENABLED, "1".into()),
        ]);
        let record = resolve(&store, &EnvOverride::fixed(None), &chain()).unwrap();
        assert_eq!(record.string(SERVER_SIDE_ACCESS_TOKEN).unwrap(), "tok&quot;en");
        assert_eq!(record.string(CLIENT_SIDE_ACCESS_TOKEN).unwrap(), "client");
        assert_eq!(record.get(JS_LOGGING_ENABLED).unwrap(), &SettingValue::Int(1));
    }

    #[test]
    fn registry_values_are_copied_verbatim() {
        let store = store_with(&[
            ("timeout", SettingValue::Int(10)),
            ("branch", "release".into()),
            ("unrelated", "dropped".into()),
        ]);
        let record = resolve(&store, &EnvOverride::fixed(None), &chain()).unwrap();
        assert_eq!(record.get("timeout").unwrap(), &SettingValue::Int(10));
        assert_eq!(record.string("branch").unwrap(), "release");
        assert!(!record.contains("unrelated"));
    }

    #[test]
    fn filters_see_the_assembled_record() {
        let mut filters = chain();
        filters.add(|mut record: SettingsRecord| {
            record.set("code_version", "v1.2.3");
            record
        });
        let record = resolve(&MemoryStore::new(), &EnvOverride::fixed(None), &filters).unwrap();
        assert_eq!(record.string("code_version").unwrap(), "v1.2.3");
    }

    #[test]
    fn null_in_store_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(
            &path,
            r#"{"rollbar_wp": {"php_logging_enabled": 1, "code_version": null, "timeout": null}}"#,
        )
        .unwrap();

        let store = JsonFileStore::new(&path);
        let record = resolve(&store, &EnvOverride::fixed(None), &chain()).unwrap();
        assert_eq!(record.get(PHP_LOGGING_ENABLED).unwrap(), &SettingValue::Int(1));
        assert_eq!(
            record.get("code_version").unwrap(),
            &defaults::default_for("code_version").unwrap()
        );
        assert_eq!(record.get("timeout").unwrap(), &SettingValue::Int(3));
    }

    fn setting_value() -> impl Strategy<Value = SettingValue> {
        prop_oneof![
            any::<bool>().prop_map(SettingValue::Bool),
            any::<i64>().prop_map(SettingValue::Int),
            "[ -~]{0,12}".prop_map(SettingValue::String),
        ]
    }

    fn stored_options() -> impl Strategy<Value = OptionMap> {
        let known: Vec<&'static str> = known_options().collect();
        let name = prop_oneof![
            prop::sample::select(known).prop_map(str::to_string),
            "[a-z_]{1,10}",
        ];
        prop::collection::btree_map(name, setting_value(), 0..24)
    }

    proptest! {
        #[test]
        fn resolve_is_total_for_any_store_contents(
            stored in stored_options(),
            env in prop::option::of("[a-z]{0,8}"),
        ) {
            let store = MemoryStore::with_entry(OPTION_KEY, stored);
            let record = resolve(&store, &EnvOverride::fixed(env.as_deref()), &chain()).unwrap();
            for option in known_options() {
                prop_assert!(record.contains(option), "missing {}", option);
            }
            for flag in [PHP_LOGGING_ENABLED, JS_LOGGING_ENABLED] {
                let value = record.int(flag).unwrap();
                prop_assert!(value == 0 || value == 1);
            }
        }
    }
}
