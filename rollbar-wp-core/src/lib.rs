//! # rollbar-wp-core
//!
//! Foundation layer shared by the settings resolver and the initialization
//! engine.
//!
//! ### Key Submodules:
//! - `severity`: the sixteen-level rank table and included-errno mask builder
//! - `value`: setting values as persisted in the option store
//! - `hooks`: ordered filter chains external code can register against
//! - `notices`: deferred admin notices rendered by the host
//! - `store`: the host option store seam (memory and JSON file backed)
//! - `backend`: the reporting backend seam and client snippet builder

pub mod backend;
pub mod error;
pub mod hooks;
pub mod notices;
pub mod severity;
pub mod store;
pub mod value;

pub mod prelude {
    pub use crate::backend::{Level, ReportingBackend, ServerConfig};
    pub use crate::error::*;
    pub use crate::hooks::FilterChain;
    pub use crate::notices::{Notice, NoticeQueue};
    pub use crate::severity::{build_included_mask, Severity};
    pub use crate::store::{OptionStore, OPTION_KEY};
    pub use crate::value::{OptionMap, SettingValue};
}

pub use error::{BackendError, StoreError};
