// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Retention window computation.
//!
//! The "how long is data kept" decision lives here and nowhere else:
//! store calls pass an optional override, everything else uses the
//! configured default. The policy is a pure computation so the expiry
//! math is testable on its own.

use chrono::{DateTime, Duration, Utc};

use crate::config::DEFAULT_RETENTION_DAYS;

/// Retention policy applied at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    default_retention: Duration,
}

impl RetentionPolicy {
    /// Policy with an explicit default window.
    pub fn new(default_retention: Duration) -> Self {
        Self { default_retention }
    }

    /// Policy with a default window of `days` days. Day counts the time
    /// type cannot hold saturate at its nearest extreme.
    pub fn from_days(days: i64) -> Self {
        let window = Duration::try_days(days).unwrap_or(if days < 0 {
            Duration::MIN
        } else {
            Duration::MAX
        });
        Self::new(window)
    }

    /// The window to apply: the per-call override when given, the
    /// configured default otherwise. Overrides are not range-checked;
    /// a non-positive override simply yields an already-expired row.
    pub fn effective(&self, retention_override: Option<Duration>) -> Duration {
        retention_override.unwrap_or(self.default_retention)
    }

    /// Absolute expiry for a record written at `now`. Windows the
    /// calendar cannot absorb clamp to its nearest bound.
    pub fn expiry_from(
        &self,
        now: DateTime<Utc>,
        retention_override: Option<Duration>,
    ) -> DateTime<Utc> {
        let window = self.effective(retention_override);
        now.checked_add_signed(window).unwrap_or(if window < Duration::zero() {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
    }

    /// The configured default window.
    pub fn default_retention(&self) -> Duration {
        self.default_retention
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from_days(DEFAULT_RETENTION_DAYS)
    }
}
