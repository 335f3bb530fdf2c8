/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use strum_macros::Display;
use tokio::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Copy, Display, Eq, PartialEq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
}

struct ActiveNotification {
    notification: Notification,
    expires_at: Option<Instant>,
}

struct Inner {
    next_id: u64,
    active: Vec<ActiveNotification>,
}

/// Transient user-facing feedback. A dumb sink: it stacks whatever it is
/// handed and performs no deduplication of its own (the poller's notified
/// set owns the at-most-once guarantee for assignment events).
pub struct NotificationCenter {
    inner: Mutex<Inner>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                active: Vec::new(),
            }),
        }
    }

    /// Appends a notification and returns its handle. A zero duration means
    /// persistent until dismissed; anything positive self-expires.
    pub fn notify(
        &self,
        message: impl Into<String>,
        severity: Severity,
        duration: Duration,
    ) -> u64 {
        let message = message.into();
        let now = Instant::now();
        let mut inner = self.lock();
        Self::prune(&mut inner, now);
        let id = inner.next_id;
        inner.next_id += 1;
        info!(tag = "[NOTIFICATION]", severity = %severity, notification_id = id, message = %message);
        inner.active.push(ActiveNotification {
            notification: Notification {
                id,
                message,
                severity,
            },
            expires_at: (!duration.is_zero()).then(|| now + duration),
        });
        id
    }

    pub fn dismiss(&self, id: u64) -> bool {
        let mut inner = self.lock();
        let before = inner.active.len();
        inner.active.retain(|entry| entry.notification.id != id);
        inner.active.len() != before
    }

    /// Currently visible notifications, oldest first. Expired entries are
    /// dropped on read.
    pub fn active(&self) -> Vec<Notification> {
        let now = Instant::now();
        let mut inner = self.lock();
        Self::prune(&mut inner, now);
        inner
            .active
            .iter()
            .map(|entry| entry.notification.clone())
            .collect()
    }

    fn prune(inner: &mut Inner, now: Instant) {
        inner
            .active
            .retain(|entry| entry.expires_at.map_or(true, |expiry| expiry > now));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
