//! Defaults provider for the notifier's option registry.
//!
//! Every option the notifier library understands is listed here together with
//! the function producing its canonical default. Most names map to a provider
//! of the same name; `branch` is the historical exception and is served by
//! [`git_branch`].

use rollbar_wp_core::severity::Severity;
use rollbar_wp_core::value::{OptionMap, SettingValue};

type Provider = fn() -> SettingValue;

const OPTIONS: &[(&str, Provider)] = &[
    ("access_token", || "".into()),
    ("agent_log_location", || "/var/tmp".into()),
    ("allow_exec", || true.into()),
    ("base_api_url", || "https://api.rollbar.com/api/1/".into()),
    ("branch", git_branch),
    ("capture_error_stacktraces", || true.into()),
    ("code_version", || "".into()),
    ("enable_utf8_sanitization", || true.into()),
    ("endpoint", || "https://api.rollbar.com/api/1/".into()),
    ("environment", || "production".into()),
    ("fluent_host", || "127.0.0.1".into()),
    ("fluent_port", || SettingValue::Int(24224)),
    ("fluent_tag", || "rollbar".into()),
    ("host", || "".into()),
    ("include_error_code_context", || false.into()),
    ("include_exception_code_context", || false.into()),
    ("include_raw_request_body", || false.into()),
    ("included_errno", included_errno),
    ("local_vars_dump", || true.into()),
    ("log_payload", || false.into()),
    ("max_items", || SettingValue::Int(10)),
    ("max_nesting_depth", || SettingValue::Int(-1)),
    ("minimum_level", || SettingValue::Int(0)),
    ("raise_on_error", || false.into()),
    ("report_suppressed", || false.into()),
    ("root", server_root),
    ("scrub_fields", || {
        "passwd,password,secret,confirm_password,password_confirmation,auth_token,csrf_token"
            .into()
    }),
    ("send_message_trace", || false.into()),
    ("timeout", || SettingValue::Int(3)),
    ("transmit", || true.into()),
    ("use_error_reporting", || false.into()),
    ("verbose", || "none".into()),
];

/// Branch reported with each item. Detection is left to the notifier, so the
/// default is empty.
pub fn git_branch() -> SettingValue {
    SettingValue::String(String::new())
}

pub fn server_root() -> SettingValue {
    "/".into()
}

/// Fatal, warning, parse, core, user and recoverable errors.
pub fn included_errno() -> SettingValue {
    let mask = [
        Severity::Error,
        Severity::Warning,
        Severity::Parse,
        Severity::CoreError,
        Severity::UserError,
        Severity::RecoverableError,
    ]
    .iter()
    .fold(0, |mask, level| mask | level.rank());
    SettingValue::Int(i64::from(mask))
}

/// Names of every registry option, in declaration order.
pub fn list_options() -> impl Iterator<Item = &'static str> {
    OPTIONS.iter().map(|(name, _)| *name)
}

/// Canonical default for `option`, or `None` if the registry does not know it.
pub fn default_for(option: &str) -> Option<SettingValue> {
    OPTIONS
        .iter()
        .find(|(name, _)| *name == option)
        .map(|(_, provider)| provider())
}

/// Default value of every registry option.
pub fn defaults() -> OptionMap {
    OPTIONS
        .iter()
        .map(|(name, provider)| (name.to_string(), provider()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_is_served_by_git_branch() {
        assert_eq!(default_for("branch"), Some(git_branch()));
        assert_eq!(default_for("git_branch"), None);
    }

    #[test]
    fn unknown_options_are_absent() {
        assert_eq!(default_for("no_such_option"), None);
        assert_eq!(default_for(""), None);
    }

    #[test]
    fn canonical_values() {
        assert_eq!(default_for("access_token"), Some("".into()));
        assert_eq!(default_for("environment"), Some("production".into()));
        assert_eq!(default_for("timeout"), Some(SettingValue::Int(3)));
        assert_eq!(default_for("included_errno"), Some(SettingValue::Int(4375)));
        assert_eq!(default_for("root"), Some("/".into()));
    }

    #[test]
    fn every_listed_option_has_a_default() {
        let all = defaults();
        assert_eq!(all.len(), list_options().count());
        for option in list_options() {
            assert_eq!(all.get(option), default_for(option).as_ref());
        }
    }
}
