/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::notifier::{NotificationCenter, Severity};
use super::Shutdown;
use crate::common::backoff::{BackoffConfig, RetryBackoff};
use crate::common::types::*;
use crate::common::utils::format_position;
use crate::outbound::external::RideApi;
use crate::session::SessionStore;
use crate::view::TrackerView;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};

/// How long an assignment toast stays on screen.
const ASSIGNMENT_NOTIFICATION_TTL: Duration = Duration::from_secs(30);

const OFFLINE_WARNING: &str = "Connection lost. Showing the last known data, retrying in the background.";

/// A ride request whose driver went from absent to present between two
/// consecutive polls.
#[derive(Clone, Debug, PartialEq)]
pub struct AssignmentEvent {
    pub request_id: RequestId,
    pub driver: Driver,
}

/// Detects driver-assignment transitions across consecutive snapshots of the
/// rider's full request list.
///
/// Holds the previous snapshot (replaced wholesale on every successful poll)
/// and the set of request ids already notified. Ids enter the notified set
/// at most once and are never removed for the lifetime of the session.
#[derive(Debug, Default)]
pub struct AssignmentWatcher {
    previous: Option<FxHashMap<RequestId, RideRequest>>,
    notified: FxHashSet<RequestId>,
}

impl AssignmentWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure diff. An event fires for id `i` iff `i` is present in both
    /// snapshots, the previous entry had no driver, the current entry has
    /// one, and `i` has not been notified before. Requests first seen in
    /// `current` never fire, even if they arrive pre-assigned.
    pub fn diff_assignments(
        previous: &FxHashMap<RequestId, RideRequest>,
        current: &[RideRequest],
        notified: &FxHashSet<RequestId>,
    ) -> Vec<AssignmentEvent> {
        current
            .iter()
            .filter_map(|request| {
                let driver = request.driver.as_ref()?;
                let prior = previous.get(&request.id)?;
                if prior.driver.is_none() && !notified.contains(&request.id) {
                    Some(AssignmentEvent {
                        request_id: request.id,
                        driver: driver.clone(),
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    /// Applies a successful poll: returns the assignment events to announce,
    /// marks them notified and replaces the snapshot wholesale. The first
    /// poll only seeds the snapshot and never fires.
    pub fn observe(&mut self, current: &[RideRequest]) -> Vec<AssignmentEvent> {
        let events = match &self.previous {
            Some(previous) => Self::diff_assignments(previous, current, &self.notified),
            None => Vec::new(),
        };
        for event in &events {
            self.notified.insert(event.request_id);
        }
        self.previous = Some(
            current
                .iter()
                .map(|request| (request.id, request.clone()))
                .collect(),
        );
        events
    }

    pub fn already_notified(&self, request_id: RequestId) -> bool {
        self.notified.contains(&request_id)
    }
}

/// Toast body for a freshly assigned driver, with "Not available" fallbacks
/// for the optional pieces.
pub fn assignment_message(event: &AssignmentEvent) -> String {
    let RequestId(id) = event.request_id;
    let phone = event.driver.phone.as_deref().unwrap_or("Not available");
    let vehicle = event
        .driver
        .vehicle_number
        .as_deref()
        .unwrap_or("Not available");
    let position = event.driver.position();
    format!(
        "Driver Assigned!\nRide #RS-{id}\nDriver: {}\nPhone: {phone}\nVehicle: {vehicle}\nLocation: {}",
        event.driver.name,
        format_position(position.as_ref())
    )
}

/// Everything a polling loop needs, shared by reference rather than closed
/// over as module globals.
#[derive(Clone)]
pub struct PollerEnv {
    pub api: Arc<dyn RideApi>,
    pub session: Arc<SessionStore>,
    pub notifier: Arc<NotificationCenter>,
    pub view: Arc<dyn TrackerView>,
    pub requests: Arc<RwLock<Vec<RideRequest>>>,
    pub shutdown: Arc<Shutdown>,
}

enum TickOutcome {
    Fresh(Vec<RideRequest>),
    Failed,
    Terminal,
}

async fn poll_once(
    env: &PollerEnv,
    loop_tag: &str,
    backoff: &mut RetryBackoff,
    warning_id: &mut Option<u64>,
) -> TickOutcome {
    match env.api.list_ride_requests().await {
        Ok(current) => {
            if backoff.on_success() {
                if let Some(id) = warning_id.take() {
                    env.notifier.dismiss(id);
                    info!(tag = loop_tag, "backend reachable again, warning withdrawn");
                }
            }
            TickOutcome::Fresh(current)
        }
        Err(err) if err.is_auth_failure() => {
            warn!(tag = loop_tag, error = %err, "authorization rejected, handing off to re-authentication");
            env.session.clear();
            env.view.session_expired();
            env.shutdown.trigger();
            TickOutcome::Terminal
        }
        Err(err) => {
            let warn_now = backoff.on_failure();
            error!(tag = loop_tag, error = %err, consecutive_failures = backoff.consecutive_failures(), "poll failed, cached list left unchanged");
            if warn_now {
                *warning_id = Some(env.notifier.notify(
                    OFFLINE_WARNING,
                    Severity::Warning,
                    Duration::ZERO,
                ));
            }
            TickOutcome::Failed
        }
    }
}

/// Fast cadence loop keeping the rendered request list current. Independent
/// of the assignment watch; the two cadences and their backoff states are
/// never merged.
pub async fn run_dashboard_refresh(env: PollerEnv, config: BackoffConfig) {
    let mut backoff = RetryBackoff::new(config);
    let mut warning_id: Option<u64> = None;

    loop {
        if env.shutdown.is_triggered() {
            break;
        }
        match poll_once(&env, "[DASHBOARD REFRESH]", &mut backoff, &mut warning_id).await {
            TickOutcome::Fresh(current) => {
                *env.requests.write().await = current.clone();
                env.view.requests_updated(&current);
            }
            TickOutcome::Failed => {}
            TickOutcome::Terminal => break,
        }
        let delay = backoff.delay_with_jitter();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = env.shutdown.wait() => break,
        }
    }
    info!(tag = "[DASHBOARD REFRESH]", "loop stopped");
}

/// Slow cadence loop watching for driver-assignment transitions. Emits one
/// deduplicated toast per transition and forwards the event to whoever wants
/// to react (e.g. auto-opening the live map).
pub async fn run_assignment_watch(
    env: PollerEnv,
    config: BackoffConfig,
    events: mpsc::Sender<AssignmentEvent>,
) {
    let mut watcher = AssignmentWatcher::new();
    let mut backoff = RetryBackoff::new(config);
    let mut warning_id: Option<u64> = None;

    loop {
        if env.shutdown.is_triggered() {
            break;
        }
        match poll_once(&env, "[ASSIGNMENT WATCH]", &mut backoff, &mut warning_id).await {
            TickOutcome::Fresh(current) => {
                for event in watcher.observe(&current) {
                    let RequestId(id) = event.request_id;
                    info!(tag = "[ASSIGNMENT WATCH]", request_id = id, driver = %event.driver.name, "driver newly assigned");
                    env.notifier.notify(
                        assignment_message(&event),
                        Severity::Info,
                        ASSIGNMENT_NOTIFICATION_TTL,
                    );
                    let _ = events.send(event).await;
                }
                *env.requests.write().await = current.clone();
                env.view.requests_updated(&current);
            }
            TickOutcome::Failed => {}
            TickOutcome::Terminal => break,
        }
        let delay = backoff.delay_with_jitter();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = env.shutdown.wait() => break,
        }
    }
    info!(tag = "[ASSIGNMENT WATCH]", "loop stopped");
}
