/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::geolocation::LocationWatcher;
use crate::common::types::*;
use crate::common::utils::{bounds, distance_between_in_km, eta_minutes, midpoint};
use crate::outbound::external::RideApi;
use crate::view::TrackerView;
use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

const SINGLE_MARKER_ZOOM: u8 = 15;
const TWO_MARKER_ZOOM: u8 = 13;

#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub position: Point,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Viewport {
    Center { center: Point, zoom: u8 },
    Fit { southwest: Point, northeast: Point },
}

/// The full render model for the live map: both markers, the connecting
/// line, the viewport and the derived distance/ETA. Each tick replaces the
/// derived values as one unit, never partially.
#[derive(Clone, Debug)]
pub struct MapViewState {
    pub request_id: RequestId,
    pub driver_marker: Marker,
    pub rider_marker: Option<Marker>,
    pub route_line: Option<(Point, Point)>,
    pub viewport: Viewport,
    pub distance_km: Option<f64>,
    pub eta_minutes: Option<u32>,
    pub last_updated: TimeStamp,
}

struct MapSession {
    driver_id: DriverId,
    rider_position: Option<GeoPosition>,
    state: MapViewState,
}

/// Projects one ride's driver and the rider's own position onto a live map
/// model. Owns the driver-refresh timer and the location-stream subscription
/// and tears both down on `close()`.
#[derive(Clone)]
pub struct MapProjector {
    api: Arc<dyn RideApi>,
    view: Arc<dyn TrackerView>,
    refresh_interval: Duration,
    session: Arc<tokio::sync::Mutex<Option<MapSession>>>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl MapProjector {
    pub fn new(
        api: Arc<dyn RideApi>,
        view: Arc<dyn TrackerView>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            api,
            view,
            refresh_interval,
            session: Arc::new(tokio::sync::Mutex::new(None)),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Opens the map for one ride. Non-finite driver coordinates render the
    /// inline error state and start nothing. Reopening replaces any map that
    /// is already open.
    pub async fn open(
        &self,
        driver_lat: f64,
        driver_lng: f64,
        driver_name: &str,
        driver_id: DriverId,
        request_id: RequestId,
        location: &LocationWatcher,
    ) {
        if !driver_lat.is_finite() || !driver_lng.is_finite() {
            self.view
                .map_unavailable("Driver location is not available");
            return;
        }

        self.close().await;

        let driver_point = Point {
            lat: Latitude(driver_lat),
            lon: Longitude(driver_lng),
        };
        let rider_position = location.current();

        let mut state = MapViewState {
            request_id,
            driver_marker: Marker {
                position: driver_point,
                label: driver_name.to_string(),
            },
            rider_marker: None,
            route_line: None,
            viewport: initial_viewport(&driver_point, rider_position.as_ref()),
            distance_km: None,
            eta_minutes: None,
            last_updated: TimeStamp(Utc::now()),
        };
        recompute_route(&mut state, rider_position.as_ref());
        self.view.map_updated(&state);

        *self.session.lock().await = Some(MapSession {
            driver_id,
            rider_position,
            state,
        });

        let refresh = {
            let projector = self.clone();
            tokio::spawn(async move {
                let mut timer = tokio::time::interval(projector.refresh_interval);
                loop {
                    timer.tick().await;
                    projector.on_driver_tick().await;
                }
            })
        };

        let subscription = {
            let projector = self.clone();
            let mut positions = location.subscribe();
            tokio::spawn(async move {
                while positions.changed().await.is_ok() {
                    let position = *positions.borrow();
                    if let Some(position) = position {
                        projector.on_rider_location_update(position).await;
                    }
                }
            })
        };

        let mut tasks = self.lock_tasks();
        tasks.push(refresh);
        tasks.push(subscription);
    }

    /// One driver-refresh tick: re-fetches the tracked driver and, when a
    /// usable fix comes back, moves the marker and refits the viewport. Any
    /// failure or missing fix skips the update silently.
    pub async fn on_driver_tick(&self) {
        let driver_id = match self.session.lock().await.as_ref() {
            Some(session) => session.driver_id,
            None => return,
        };

        let driver = match self.api.get_driver(driver_id).await {
            Ok(driver) => driver,
            Err(err) => {
                debug!(tag = "[DRIVER REFRESH]", error = %err, "skipping marker update");
                return;
            }
        };
        let position = match driver.position() {
            Some(position) => position,
            None => return, // no fix yet
        };

        let mut guard = self.session.lock().await;
        let session = match guard.as_mut() {
            Some(session) if session.driver_id == driver_id => session,
            // Closed or replaced while the fetch was in flight.
            _ => return,
        };
        session.state.driver_marker.position = position;
        if !driver.name.is_empty() {
            session.state.driver_marker.label = driver.name;
        }
        let rider_position = session.rider_position;
        recompute_route(&mut session.state, rider_position.as_ref());
        session.state.viewport =
            refit_viewport(&session.state.driver_marker.position, rider_position.as_ref());
        session.state.last_updated = TimeStamp(Utc::now());
        self.view.map_updated(&session.state);
    }

    /// Device-location tick: moves the rider marker and recomputes the
    /// derived values against the driver marker's last known position,
    /// without waiting for the next driver refresh.
    pub async fn on_rider_location_update(&self, position: GeoPosition) {
        let mut guard = self.session.lock().await;
        let session = match guard.as_mut() {
            Some(session) => session,
            None => return,
        };
        session.rider_position = Some(position);
        recompute_route(&mut session.state, Some(&position));
        session.state.last_updated = TimeStamp(Utc::now());
        self.view.map_updated(&session.state);
    }

    /// Tears the map down: stops the refresh timer, drops the location
    /// subscription and clears the render model. Safe to call when nothing
    /// is open.
    pub async fn close(&self) {
        let handles: Vec<JoinHandle<()>> = self.lock_tasks().drain(..).collect();
        for handle in handles {
            handle.abort();
        }
        *self.session.lock().await = None;
    }

    pub async fn is_open(&self) -> bool {
        self.session.lock().await.is_some()
    }

    pub fn has_active_timers(&self) -> bool {
        !self.lock_tasks().is_empty()
    }

    /// Snapshot of the current render model, for inspection.
    pub async fn view_state(&self) -> Option<MapViewState> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.state.clone())
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The single shared recompute routine. Distance and ETA are derived the
/// same way no matter which side's tick triggered the update.
fn recompute_route(state: &mut MapViewState, rider: Option<&GeoPosition>) {
    match rider {
        Some(rider) => {
            let rider_point = rider.point();
            let driver_point = state.driver_marker.position;
            let distance = distance_between_in_km(&rider_point, &driver_point);
            state.rider_marker = Some(Marker {
                position: rider_point,
                label: "Your Location".to_string(),
            });
            state.route_line = Some((rider_point, driver_point));
            state.distance_km = Some(distance);
            state.eta_minutes = Some(eta_minutes(distance));
        }
        None => {
            state.rider_marker = None;
            state.route_line = None;
            state.distance_km = None;
            state.eta_minutes = None;
        }
    }
}

fn initial_viewport(driver: &Point, rider: Option<&GeoPosition>) -> Viewport {
    match rider {
        Some(rider) => Viewport::Center {
            center: midpoint(&rider.point(), driver),
            zoom: TWO_MARKER_ZOOM,
        },
        None => Viewport::Center {
            center: *driver,
            zoom: SINGLE_MARKER_ZOOM,
        },
    }
}

fn refit_viewport(driver: &Point, rider: Option<&GeoPosition>) -> Viewport {
    match rider {
        Some(rider) => {
            let (southwest, northeast) = bounds(&rider.point(), driver);
            Viewport::Fit {
                southwest,
                northeast,
            }
        }
        None => Viewport::Center {
            center: *driver,
            zoom: SINGLE_MARKER_ZOOM,
        },
    }
}
