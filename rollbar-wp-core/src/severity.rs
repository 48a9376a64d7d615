//! ## rollbar-wp-core::severity
//! **PHP error-classification levels and the included-errno mask**
//!
//! The platform assigns each level a power-of-two constant; that number is
//! both the bit the level occupies in a mask and its rank for threshold
//! comparisons. `E_ALL` sits above every other level. Ranks follow the
//! constants, not how severe a level sounds: `E_USER_DEPRECATED` outranks
//! `E_ERROR`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the sixteen standard error-classification levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(u32)]
pub enum Severity {
    Error = 1,
    Warning = 2,
    Parse = 4,
    Notice = 8,
    CoreError = 16,
    CoreWarning = 32,
    CompileError = 64,
    CompileWarning = 128,
    UserError = 256,
    UserWarning = 512,
    UserNotice = 1024,
    Strict = 2048,
    RecoverableError = 4096,
    Deprecated = 8192,
    UserDeprecated = 16384,
    All = 32767,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown severity level: {0:?}")]
pub struct UnknownSeverity(pub String);

impl Severity {
    /// The fixed rank table, in platform declaration order.
    pub const LEVELS: [Severity; 16] = [
        Severity::Error,
        Severity::Warning,
        Severity::Parse,
        Severity::Notice,
        Severity::CoreError,
        Severity::CoreWarning,
        Severity::CompileError,
        Severity::CompileWarning,
        Severity::UserError,
        Severity::UserWarning,
        Severity::UserNotice,
        Severity::Strict,
        Severity::RecoverableError,
        Severity::Deprecated,
        Severity::UserDeprecated,
        Severity::All,
    ];

    pub const fn rank(self) -> u32 {
        self as u32
    }

    /// The platform constant name, e.g. `E_USER_NOTICE`.
    pub const fn constant_name(self) -> &'static str {
        match self {
            Severity::Error => "E_ERROR",
            Severity::Warning => "E_WARNING",
            Severity::Parse => "E_PARSE",
            Severity::Notice => "E_NOTICE",
            Severity::CoreError => "E_CORE_ERROR",
            Severity::CoreWarning => "E_CORE_WARNING",
            Severity::CompileError => "E_COMPILE_ERROR",
            Severity::CompileWarning => "E_COMPILE_WARNING",
            Severity::UserError => "E_USER_ERROR",
            Severity::UserWarning => "E_USER_WARNING",
            Severity::UserNotice => "E_USER_NOTICE",
            Severity::Strict => "E_STRICT",
            Severity::RecoverableError => "E_RECOVERABLE_ERROR",
            Severity::Deprecated => "E_DEPRECATED",
            Severity::UserDeprecated => "E_USER_DEPRECATED",
            Severity::All => "E_ALL",
        }
    }

    pub fn from_rank(rank: u32) -> Option<Self> {
        Self::LEVELS.into_iter().find(|level| level.rank() == rank)
    }
}

/// Accumulates every level whose rank is at most the threshold's rank.
pub fn build_included_mask(threshold: Severity) -> u32 {
    Severity::LEVELS
        .iter()
        .filter(|level| level.rank() <= threshold.rank())
        .fold(0, |mask, level| mask | level.rank())
}

impl FromStr for Severity {
    type Err = UnknownSeverity;

    /// Accepts `E_NOTICE`, `notice` (any case) or the decimal rank `8`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(rank) = trimmed.parse::<u32>() {
            return Self::from_rank(rank).ok_or_else(|| UnknownSeverity(s.to_string()));
        }

        let upper = trimmed.to_ascii_uppercase();
        let wanted = if upper.starts_with("E_") {
            upper
        } else {
            format!("E_{upper}")
        };
        Self::LEVELS
            .into_iter()
            .find(|level| level.constant_name() == wanted)
            .ok_or_else(|| UnknownSeverity(s.to_string()))
    }
}

impl TryFrom<String> for Severity {
    type Error = UnknownSeverity;

    fn try_from(value: String) -> Result<Self, UnknownSeverity> {
        value.parse()
    }
}

impl From<Severity> for String {
    fn from(level: Severity) -> Self {
        level.constant_name().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.constant_name())
    }
}
