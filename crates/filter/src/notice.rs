//! Non-fatal filter notices.

use std::fmt;

use serde::Serialize;
use tracing::info;

/// A filter that was skipped because of its input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterNotice {
    /// Name the filter is registered under.
    pub filter: String,
    /// Property the filter was applied to.
    pub property: String,
    /// Why the input was ignored.
    pub reason: String,
}

impl fmt::Display for FilterNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "filter '{}' ignored on '{}': {}",
            self.filter, self.property, self.reason
        )
    }
}

/// Receives notices while filters are applied.
pub trait NoticeSink {
    /// Records one notice.
    fn notice(&mut self, notice: FilterNotice);
}

/// Collects notices and logs each one.
#[derive(Debug, Clone, Default)]
pub struct NoticeLog {
    notices: Vec<FilterNotice>,
}

impl NoticeLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded notices, oldest first.
    pub fn notices(&self) -> &[FilterNotice] {
        &self.notices
    }

    /// Number of notices.
    pub fn len(&self) -> usize {
        self.notices.len()
    }

    /// Returns true when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    /// Takes the recorded notices.
    pub fn into_notices(self) -> Vec<FilterNotice> {
        self.notices
    }
}

impl NoticeSink for NoticeLog {
    fn notice(&mut self, notice: FilterNotice) {
        info!(
            filter = %notice.filter,
            property = %notice.property,
            reason = %notice.reason,
            "Filter input ignored"
        );
        self.notices.push(notice);
    }
}
