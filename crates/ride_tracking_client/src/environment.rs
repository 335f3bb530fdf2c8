/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::backoff::BackoffConfig;
use crate::common::types::RideRequest;
use crate::outbound::external::{BackendApi, RideApi};
use crate::session::SessionStore;
use crate::tools::error::AppError;
use crate::tools::logger::LoggerConfig;
use crate::tracking::notifier::NotificationCenter;
use crate::tracking::poller::PollerEnv;
use crate::tracking::Shutdown;
use crate::view::TrackerView;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub logger_cfg: LoggerConfig,
    pub backend_url: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout: u64,
    pub dashboard_refresh: BackoffConfig,
    pub assignment_watch: BackoffConfig,
    /// Cadence of the single-driver location poll while a map is open, in
    /// seconds.
    pub driver_refresh_interval: u64,
    /// Open the live map automatically when an assignment event carries a
    /// usable driver fix.
    pub auto_track_on_assignment: bool,
    /// Optional fixed device fix for headless runs; `None` means no fix yet.
    pub rider_position: Option<ConfiguredPosition>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct ConfiguredPosition {
    pub lat: f64,
    pub lon: f64,
    pub accuracy: f64,
}

/// Shared, explicitly-owned state handed by reference to the poller, the
/// notifier and the projector.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<BackendApi>,
    pub session: Arc<SessionStore>,
    pub notifier: Arc<NotificationCenter>,
    pub view: Arc<dyn TrackerView>,
    pub requests: Arc<RwLock<Vec<RideRequest>>>,
    pub shutdown: Arc<Shutdown>,
    pub dashboard_refresh: BackoffConfig,
    pub assignment_watch: BackoffConfig,
    pub driver_refresh_interval: Duration,
    pub auto_track_on_assignment: bool,
    pub rider_position: Option<ConfiguredPosition>,
}

impl AppState {
    pub fn new(
        app_config: AppConfig,
        session: Arc<SessionStore>,
        view: Arc<dyn TrackerView>,
    ) -> Result<AppState, AppError> {
        let backend_url = Url::parse(app_config.backend_url.as_str()).map_err(|err| {
            AppError::InvalidConfiguration(format!("Failed to parse backend_url : {err}"))
        })?;
        let api = Arc::new(BackendApi::new(
            backend_url,
            Duration::from_millis(app_config.request_timeout),
            Arc::clone(&session),
        )?);

        Ok(AppState {
            api,
            session,
            notifier: Arc::new(NotificationCenter::new()),
            view,
            requests: Arc::new(RwLock::new(Vec::new())),
            shutdown: Arc::new(Shutdown::new()),
            dashboard_refresh: app_config.dashboard_refresh,
            assignment_watch: app_config.assignment_watch,
            driver_refresh_interval: Duration::from_secs(app_config.driver_refresh_interval),
            auto_track_on_assignment: app_config.auto_track_on_assignment,
            rider_position: app_config.rider_position,
        })
    }

    pub fn poller_env(&self) -> PollerEnv {
        let api: Arc<dyn RideApi> = self.api.clone();
        PollerEnv {
            api,
            session: Arc::clone(&self.session),
            notifier: Arc::clone(&self.notifier),
            view: Arc::clone(&self.view),
            requests: Arc::clone(&self.requests),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}
