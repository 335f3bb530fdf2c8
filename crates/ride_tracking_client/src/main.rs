/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use ride_tracking_client::{
    common::types::*,
    domain::action::auth::{self, Credentials},
    environment::{AppConfig, AppState},
    session::SessionStore,
    tools::error::AppError,
    tools::logger::*,
    tracking::geolocation::{location_channel, LocationHandle, LocationWatcher},
    tracking::poller::{run_assignment_watch, run_dashboard_refresh, AssignmentEvent},
    tracking::projector::MapProjector,
    view::LogView,
};
use std::env::var;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

pub fn read_dhall_config(config_path: &str) -> Result<AppConfig, String> {
    let config = serde_dhall::from_file(config_path).parse::<AppConfig>();
    match config {
        Ok(config) => Ok(config),
        Err(e) => Err(format!("Error reading config: {}", e)),
    }
}

fn seed_rider_position(app_state: &AppState, handle: &LocationHandle) {
    if let Some(position) = app_state.rider_position {
        handle.update(GeoPosition {
            latitude: Latitude(position.lat),
            longitude: Longitude(position.lon),
            accuracy: Accuracy(position.accuracy),
        });
    }
}

async fn ensure_session(app_state: &AppState) -> Result<(), AppError> {
    if !app_state.session.is_authenticated() {
        match (var("RIDER_EMAIL"), var("RIDER_PASSWORD")) {
            (Ok(email), Ok(password)) => {
                auth::login(
                    app_state.api.as_ref(),
                    &app_state.session,
                    &Credentials { email, password },
                )
                .await?;
            }
            _ => {
                error!(
                    tag = "[STARTUP]",
                    "no stored session and no credentials, login required"
                );
                return Err(AppError::NotAuthenticated);
            }
        }
    }
    if !app_state.session.is_rider() {
        error!(tag = "[STARTUP]", "session role is not a rider");
        app_state.session.clear();
        return Err(AppError::NotAuthenticated);
    }
    Ok(())
}

/// Reacts to assignment events from the watch loop, opening the live map for
/// freshly assigned rides that already carry a driver fix.
async fn run_auto_track(
    mut events: mpsc::Receiver<AssignmentEvent>,
    projector: MapProjector,
    location: LocationWatcher,
    enabled: bool,
) {
    while let Some(event) = events.recv().await {
        if !enabled {
            continue;
        }
        if let Some(Point {
            lat: Latitude(lat),
            lon: Longitude(lon),
        }) = event.driver.position()
        {
            projector
                .open(
                    lat,
                    lon,
                    &event.driver.name,
                    event.driver.id,
                    event.request_id,
                    &location,
                )
                .await;
        }
    }
}

#[tokio::main]
async fn start_client() -> Result<(), AppError> {
    let dhall_config_path = var("DHALL_CONFIG")
        .unwrap_or_else(|_| "./dhall_config/ride_tracking_client.dhall".to_string());
    let app_config = read_dhall_config(&dhall_config_path).unwrap_or_else(|err| {
        println!("Dhall Config Reading Error : {}", err);
        std::process::exit(1);
    });

    let _guard = setup_tracing(app_config.logger_cfg);

    // The three persisted session values; any missing piece means "not
    // authenticated" and we fall back to a credential login below.
    let session = Arc::new(SessionStore::from_parts(
        var("RIDER_TOKEN").ok(),
        var("RIDER_NAME").ok(),
        var("RIDER_ROLE").ok(),
    ));

    let app_state = AppState::new(app_config, session, Arc::new(LogView))?;

    ensure_session(&app_state).await?;

    // Listen for SIGTERM signal.
    let shutdown_sigterm = Arc::clone(&app_state.shutdown);
    tokio::spawn(async move {
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            sigterm.recv().await;
            shutdown_sigterm.trigger();
        }
    });
    // Listen for SIGINT (Ctrl+C) signal.
    let shutdown_sigint = Arc::clone(&app_state.shutdown);
    tokio::spawn(async move {
        if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
            sigint.recv().await;
            shutdown_sigint.trigger();
        }
    });

    let (location_handle, location_watcher) = location_channel();
    seed_rider_position(&app_state, &location_handle);

    let projector = MapProjector::new(
        app_state.api.clone(),
        Arc::clone(&app_state.view),
        app_state.driver_refresh_interval,
    );

    let (events_tx, events_rx) = mpsc::channel(32);

    let dashboard_loop = tokio::spawn(run_dashboard_refresh(
        app_state.poller_env(),
        app_state.dashboard_refresh,
    ));
    let assignment_loop = tokio::spawn(run_assignment_watch(
        app_state.poller_env(),
        app_state.assignment_watch,
        events_tx,
    ));
    let auto_track_loop = tokio::spawn(run_auto_track(
        events_rx,
        projector.clone(),
        location_watcher,
        app_state.auto_track_on_assignment,
    ));

    info!(tag = "[STARTUP]", "ride tracking client running");

    app_state.shutdown.wait().await;

    info!(tag = "[SHUTDOWN]", "stopping loops and closing the map");
    projector.close().await;

    let _ = dashboard_loop.await;
    let _ = assignment_loop.await;
    auto_track_loop.abort();

    Ok(())
}

fn main() {
    start_client().expect("Failed to start the ride tracking client");
}
