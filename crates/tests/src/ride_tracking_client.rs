/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use async_trait::async_trait;
use ride_tracking_client::common::backoff::BackoffConfig;
use ride_tracking_client::common::types::*;
use ride_tracking_client::domain::action::auth::{self, Credentials};
use ride_tracking_client::domain::action::booking::{submit_booking, BookingForm};
use ride_tracking_client::domain::action::ActionError;
use ride_tracking_client::outbound::external::RideApi;
use ride_tracking_client::outbound::types::*;
use ride_tracking_client::session::{Session, SessionStore};
use ride_tracking_client::tools::error::AppError;
use ride_tracking_client::tracking::geolocation::location_channel;
use ride_tracking_client::tracking::notifier::{NotificationCenter, Severity};
use ride_tracking_client::tracking::poller::{
    run_assignment_watch, run_dashboard_refresh, PollerEnv,
};
use ride_tracking_client::tracking::projector::{MapProjector, MapViewState, Viewport};
use ride_tracking_client::tracking::Shutdown;
use ride_tracking_client::view::TrackerView;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Scripted backend: the list endpoint pops a queue of canned responses and
/// then keeps serving the last successful list.
#[derive(Default)]
struct StubApi {
    list_responses: Mutex<VecDeque<Result<Vec<RideRequest>, AppError>>>,
    fallback_list: Mutex<Vec<RideRequest>>,
    driver_response: Mutex<Option<Driver>>,
    login_token: Mutex<Option<String>>,
    create_calls: AtomicUsize,
    driver_calls: AtomicUsize,
    drained: Notify,
}

impl StubApi {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push_list(&self, response: Result<Vec<RideRequest>, AppError>) {
        self.list_responses
            .lock()
            .expect("stub lock")
            .push_back(response);
    }

    fn set_driver(&self, driver: Option<Driver>) {
        *self.driver_response.lock().expect("stub lock") = driver;
    }

    /// Resolves once every scripted list response has been consumed.
    async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            if self.list_responses.lock().expect("stub lock").is_empty() {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl RideApi for StubApi {
    async fn list_ride_requests(&self) -> Result<Vec<RideRequest>, AppError> {
        let popped = {
            let mut queue = self.list_responses.lock().expect("stub lock");
            let popped = queue.pop_front();
            if queue.is_empty() {
                self.drained.notify_waiters();
            }
            popped
        };
        match popped {
            Some(response) => {
                if let Ok(list) = &response {
                    *self.fallback_list.lock().expect("stub lock") = list.clone();
                }
                response
            }
            None => Ok(self.fallback_list.lock().expect("stub lock").clone()),
        }
    }

    async fn get_ride_request(&self, request_id: RequestId) -> Result<RideRequest, AppError> {
        self.fallback_list
            .lock()
            .expect("stub lock")
            .iter()
            .find(|request| request.id == request_id)
            .cloned()
            .ok_or_else(|| AppError::ExternalAPICallError("404 Not Found".to_string()))
    }

    async fn create_ride_request(
        &self,
        _booking: &CreateRideRequest,
    ) -> Result<ApiSuccess, AppError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ApiSuccess::default())
    }

    async fn get_driver(&self, _driver_id: DriverId) -> Result<Driver, AppError> {
        self.driver_calls.fetch_add(1, Ordering::SeqCst);
        self.driver_response
            .lock()
            .expect("stub lock")
            .clone()
            .ok_or_else(|| AppError::ExternalAPICallError("503 Service Unavailable".to_string()))
    }

    async fn login(&self, _credentials: &LoginRequest) -> Result<LoginResponse, AppError> {
        match self.login_token.lock().expect("stub lock").clone() {
            Some(token) => Ok(LoginResponse {
                token: Token(token),
                message: None,
            }),
            None => Err(AppError::InvalidRequest("Invalid credentials".to_string())),
        }
    }

    async fn register(&self, _registration: &RegisterRequest) -> Result<ApiSuccess, AppError> {
        Ok(ApiSuccess::default())
    }
}

#[derive(Default)]
struct RecordingView {
    request_updates: Mutex<Vec<usize>>,
    map_updates: Mutex<Vec<MapViewState>>,
    map_errors: Mutex<Vec<String>>,
    sessions_expired: AtomicUsize,
}

impl TrackerView for RecordingView {
    fn requests_updated(&self, requests: &[RideRequest]) {
        self.request_updates
            .lock()
            .expect("view lock")
            .push(requests.len());
    }

    fn map_updated(&self, state: &MapViewState) {
        self.map_updates
            .lock()
            .expect("view lock")
            .push(state.clone());
    }

    fn map_unavailable(&self, reason: &str) {
        self.map_errors
            .lock()
            .expect("view lock")
            .push(reason.to_string());
    }

    fn session_expired(&self) {
        self.sessions_expired.fetch_add(1, Ordering::SeqCst);
    }
}

fn driver(id: i64, lat: f64, lon: f64) -> Driver {
    Driver {
        id: DriverId(id),
        name: format!("driver-{id}"),
        phone: Some("+919876543210".to_string()),
        vehicle_type: Some("Sedan".to_string()),
        vehicle_number: Some("KA-01-1234".to_string()),
        latitude: Some(Latitude(lat)),
        longitude: Some(Longitude(lon)),
    }
}

fn request(id: i64, driver: Option<Driver>) -> RideRequest {
    RideRequest {
        id: RequestId(id),
        pickup_location: "Airport".to_string(),
        dropoff_location: "Station".to_string(),
        request_time: TimeStamp(chrono::Utc::now()),
        status: if driver.is_some() {
            RideStatus::ASSIGNED
        } else {
            RideStatus::PENDING
        },
        driver,
        fare_amount: None,
    }
}

fn fix(lat: f64, lon: f64) -> GeoPosition {
    GeoPosition {
        latitude: Latitude(lat),
        longitude: Longitude(lon),
        accuracy: Accuracy(15.0),
    }
}

struct Harness {
    env: PollerEnv,
    api: Arc<StubApi>,
    view: Arc<RecordingView>,
    notifier: Arc<NotificationCenter>,
    session: Arc<SessionStore>,
    shutdown: Arc<Shutdown>,
}

fn harness() -> Harness {
    let api = StubApi::new();
    let view = Arc::new(RecordingView::default());
    let notifier = Arc::new(NotificationCenter::new());
    let session = Arc::new(SessionStore::new());
    session.authenticate(Session {
        token: Token("token".to_string()),
        display_name: "asha".to_string(),
        role: Role::Rider,
    });
    let shutdown = Arc::new(Shutdown::new());
    let api_dyn: Arc<dyn RideApi> = api.clone();
    let env = PollerEnv {
        api: api_dyn,
        session: Arc::clone(&session),
        notifier: Arc::clone(&notifier),
        view: view.clone(),
        requests: Arc::new(tokio::sync::RwLock::new(Vec::new())),
        shutdown: Arc::clone(&shutdown),
    };
    Harness {
        env,
        api,
        view,
        notifier,
        session,
        shutdown,
    }
}

fn fast_cadence() -> BackoffConfig {
    BackoffConfig {
        base_delay_secs: 5,
        max_delay_secs: 120,
        warn_after_failures: 3,
    }
}

/// Lets every task that is ready run to its next timer before continuing.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn assignment_transition_notifies_exactly_once() {
    let h = harness();
    h.api.push_list(Ok(vec![request(7, None)]));
    h.api
        .push_list(Ok(vec![request(7, Some(driver(3, 12.34, 56.78)))]));
    h.api
        .push_list(Ok(vec![request(7, Some(driver(3, 12.34, 56.78)))]));

    let (events_tx, mut events_rx) = mpsc::channel(8);
    let watch = tokio::spawn(run_assignment_watch(
        h.env.clone(),
        fast_cadence(),
        events_tx,
    ));

    h.api.wait_drained().await;
    settle().await;

    let toasts: Vec<_> = h
        .notifier
        .active()
        .into_iter()
        .filter(|notification| notification.message.contains("Driver Assigned"))
        .collect();
    assert_eq!(toasts.len(), 1, "exactly one assignment toast");
    assert!(toasts[0].message.contains("#RS-7"));
    assert!(toasts[0].message.contains("driver-3"));

    let event = events_rx.recv().await.expect("one assignment event");
    assert_eq!(event.request_id, RequestId(7));
    assert!(
        events_rx.try_recv().is_err(),
        "no second event for the same assignment"
    );

    let cached = h.env.requests.read().await.clone();
    assert_eq!(cached.len(), 1);
    assert!(cached[0].driver.is_some(), "cache replaced wholesale");

    h.shutdown.trigger();
    watch.await.expect("watch loop exits cleanly");
}

#[tokio::test(start_paused = true)]
async fn three_consecutive_failures_raise_one_persistent_warning() {
    let h = harness();
    for _ in 0..3 {
        h.api
            .push_list(Err(AppError::ExternalAPICallError("502".to_string())));
    }

    let refresh = tokio::spawn(run_dashboard_refresh(h.env.clone(), fast_cadence()));

    h.api.wait_drained().await;
    settle().await;

    let warnings: Vec<_> = h
        .notifier
        .active()
        .into_iter()
        .filter(|notification| notification.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 1, "one warning for three failures");
    assert!(
        h.view.request_updates.lock().expect("view lock").is_empty(),
        "cached list untouched while failing"
    );

    // The queue now serves successes again; the warning is withdrawn.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(
        h.notifier.active().is_empty(),
        "warning dismissed on recovery"
    );
    assert!(
        !h.view.request_updates.lock().expect("view lock").is_empty(),
        "view refreshed after recovery"
    );

    h.shutdown.trigger();
    refresh.await.expect("refresh loop exits cleanly");
}

#[tokio::test(start_paused = true)]
async fn authorization_rejection_is_terminal() {
    let h = harness();
    h.api.push_list(Err(AppError::Unauthorized));

    let refresh = tokio::spawn(run_dashboard_refresh(h.env.clone(), fast_cadence()));
    refresh.await.expect("loop ends on its own");

    assert!(h.shutdown.is_triggered(), "terminal failure stops everything");
    assert!(!h.session.is_authenticated(), "credentials cleared");
    assert_eq!(h.view.sessions_expired.load(Ordering::SeqCst), 1);
    assert!(
        h.notifier.active().is_empty(),
        "no retry warning for a terminal failure"
    );
}

#[tokio::test(start_paused = true)]
async fn projector_rejects_non_finite_coordinates_without_starting_timers() {
    let h = harness();
    let api_dyn: Arc<dyn RideApi> = h.api.clone();
    let projector = MapProjector::new(api_dyn, h.view.clone(), Duration::from_secs(45));
    let (_handle, watcher) = location_channel();

    projector
        .open(f64::NAN, 56.78, "Asha", DriverId(3), RequestId(7), &watcher)
        .await;

    assert!(!projector.is_open().await);
    assert!(!projector.has_active_timers(), "no timer for a broken open");
    assert_eq!(h.view.map_errors.lock().expect("view lock").len(), 1);
    assert_eq!(h.api.driver_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn close_is_idempotent_and_leaves_no_timers() {
    let h = harness();
    h.api.set_driver(Some(driver(3, 12.34, 56.78)));
    let api_dyn: Arc<dyn RideApi> = h.api.clone();
    let projector = MapProjector::new(api_dyn, h.view.clone(), Duration::from_secs(45));
    let (handle, watcher) = location_channel();
    handle.update(fix(12.35, 56.79));

    projector
        .open(12.34, 56.78, "Asha", DriverId(3), RequestId(7), &watcher)
        .await;
    assert!(projector.is_open().await);
    assert!(projector.has_active_timers());

    projector.close().await;
    projector.close().await;
    assert!(!projector.is_open().await);
    assert!(!projector.has_active_timers());

    // A tick arriving after close is discarded, not applied.
    let updates_before = h.view.map_updates.lock().expect("view lock").len();
    projector.on_driver_tick().await;
    assert_eq!(
        h.view.map_updates.lock().expect("view lock").len(),
        updates_before
    );
}

#[tokio::test(start_paused = true)]
async fn driver_tick_and_rider_fix_share_one_recompute() {
    let h = harness();
    h.api.set_driver(None); // first refresh tick fails and is skipped silently
    let api_dyn: Arc<dyn RideApi> = h.api.clone();
    let projector = MapProjector::new(api_dyn, h.view.clone(), Duration::from_secs(45));
    let (handle, watcher) = location_channel();
    handle.update(fix(12.35, 56.79));

    projector
        .open(12.34, 56.78, "Asha", DriverId(3), RequestId(7), &watcher)
        .await;
    settle().await;

    let opened = projector.view_state().await.expect("map open");
    let initial_distance = opened.distance_km.expect("distance with a rider fix");
    assert!((initial_distance - 1.5545).abs() < 1e-3);
    assert_eq!(opened.eta_minutes, Some(3));
    assert!(matches!(opened.viewport, Viewport::Center { .. }));

    // Rider moves: derived values refresh without waiting for a driver tick.
    handle.update(fix(12.36, 56.80));
    settle().await;
    let after_rider = projector.view_state().await.expect("map open");
    let rider_distance = after_rider.distance_km.expect("distance");
    assert!(rider_distance > initial_distance);

    // Driver answers on the next tick: marker moves and the viewport refits.
    h.api.set_driver(Some(driver(3, 12.30, 56.70)));
    tokio::time::sleep(Duration::from_secs(50)).await;
    let after_driver = projector.view_state().await.expect("map open");
    assert_eq!(
        after_driver.driver_marker.position,
        Point {
            lat: Latitude(12.30),
            lon: Longitude(56.70)
        }
    );
    assert!(matches!(after_driver.viewport, Viewport::Fit { .. }));
    assert!(after_driver.distance_km.expect("distance") > rider_distance);

    projector.close().await;
}

#[tokio::test(start_paused = true)]
async fn identical_pickup_and_dropoff_never_reaches_the_network() {
    let h = harness();
    let form = BookingForm {
        pickup_location: "Airport".to_string(),
        dropoff_location: "airport".to_string(),
        request_time: "2026-08-05T18:30".to_string(),
    };

    let result = submit_booking(h.api.as_ref(), &form).await;
    match result {
        Err(ActionError::Validation(errors)) => {
            assert!(errors.field("dropoffLocation").is_some());
        }
        other => panic!("expected a validation failure, got {other:?}"),
    }
    assert_eq!(
        h.api.create_calls.load(Ordering::SeqCst),
        0,
        "no network call for an invalid form"
    );

    let valid = BookingForm {
        pickup_location: "Airport".to_string(),
        dropoff_location: "Station".to_string(),
        request_time: "2026-08-05T18:30".to_string(),
    };
    submit_booking(h.api.as_ref(), &valid)
        .await
        .expect("valid form submits");
    assert_eq!(h.api.create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn login_installs_a_rider_session() {
    let h = harness();
    h.session.clear();
    *h.api.login_token.lock().expect("stub lock") = Some("fresh-token".to_string());

    let session = auth::login(
        h.api.as_ref(),
        &h.session,
        &Credentials {
            email: "asha@example.com".to_string(),
            password: "secret1!".to_string(),
        },
    )
    .await
    .expect("login succeeds");

    assert_eq!(session.display_name, "asha");
    assert_eq!(session.role, Role::Rider);
    assert_eq!(
        h.session.token().expect("token stored"),
        Token("fresh-token".to_string())
    );

    *h.api.login_token.lock().expect("stub lock") = None;
    h.session.clear();
    let rejected = auth::login(
        h.api.as_ref(),
        &h.session,
        &Credentials {
            email: "asha@example.com".to_string(),
            password: "wrong".to_string(),
        },
    )
    .await;
    assert!(rejected.is_err());
    assert!(!h.session.is_authenticated());
}
