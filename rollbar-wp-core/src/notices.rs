//! Deferred admin notices.
//!
//! Initialization never renders anything itself; it queues a notice and the
//! host drains the queue when it renders its admin screens.

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    /// The backend rejected the server-side configuration.
    Misconfigured,
    /// Client-side logging is on but no client token is set.
    ClientTokenMissing,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Notice::Misconfigured => {
                "Rollbar is misconfigured. Please check the server side access token \
                 and the logging settings."
            }
            Notice::ClientTokenMissing => {
                "Rollbar is misconfigured. Please provide the client side access token."
            }
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Default)]
pub struct NoticeQueue {
    pending: Mutex<Vec<Notice>>,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a notice. Returns false if it was already pending.
    pub fn register(&self, notice: Notice) -> bool {
        let mut pending = self.pending.lock();
        if pending.contains(&notice) {
            return false;
        }
        warn!(notice = ?notice, "{}", notice.message());
        pending.push(notice);
        true
    }

    pub fn pending(&self) -> Vec<Notice> {
        self.pending.lock().clone()
    }

    pub fn contains(&self, notice: Notice) -> bool {
        self.pending.lock().contains(&notice)
    }

    /// Drains the queue for rendering.
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.pending.lock())
    }
}
