/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::types::*;
use crate::common::types::*;
use crate::session::SessionStore;
use crate::tools::callapi::{call_api, call_api_unwrapping_error};
use crate::tools::error::{ApiErrorBody, AppError};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;

/// The rider-facing surface of the ride-hailing backend. Behind a trait so
/// the polling loops and the map projector can run against a stub in tests.
#[async_trait]
pub trait RideApi: Send + Sync {
    async fn list_ride_requests(&self) -> Result<Vec<RideRequest>, AppError>;
    async fn get_ride_request(&self, request_id: RequestId) -> Result<RideRequest, AppError>;
    async fn create_ride_request(&self, booking: &CreateRideRequest) -> Result<ApiSuccess, AppError>;
    async fn get_driver(&self, driver_id: DriverId) -> Result<Driver, AppError>;
    async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, AppError>;
    async fn register(&self, registration: &RegisterRequest) -> Result<ApiSuccess, AppError>;
}

pub struct BackendApi {
    client: Client,
    base_url: Url,
    session: Arc<SessionStore>,
}

impl BackendApi {
    pub fn new(
        base_url: Url,
        request_timeout: Duration,
        session: Arc<SessionStore>,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| AppError::InternalError(err.to_string()))?;
        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url.join(path).map_err(|err| {
            AppError::InvalidConfiguration(format!("Failed to build endpoint {path} : {err}"))
        })
    }

    /// The single session credential, read afresh for every outbound request.
    fn bearer(&self) -> Result<String, AppError> {
        let Token(token) = self.session.token()?;
        Ok(format!("Bearer {token}"))
    }
}

fn surface_error_message(status: StatusCode, error_body: Option<ApiErrorBody>) -> AppError {
    match error_body.and_then(|body| body.message) {
        Some(message) => AppError::InvalidRequest(message),
        None => AppError::ExternalAPICallError(status.to_string()),
    }
}

#[async_trait]
impl RideApi for BackendApi {
    async fn list_ride_requests(&self) -> Result<Vec<RideRequest>, AppError> {
        let url = self.endpoint("api/requests")?;
        let auth = self.bearer()?;
        let response: RideRequestListResponse = call_api::<RideRequestListResponse, String>(
            &self.client,
            Method::GET,
            &url,
            vec![("authorization", &auth)],
            None,
        )
        .await?;
        Ok(response.data.unwrap_or_default())
    }

    async fn get_ride_request(&self, request_id: RequestId) -> Result<RideRequest, AppError> {
        let RequestId(id) = request_id;
        let url = self.endpoint(&format!("api/requests/{id}"))?;
        let auth = self.bearer()?;
        let response: RideRequestResponse = call_api::<RideRequestResponse, String>(
            &self.client,
            Method::GET,
            &url,
            vec![("authorization", &auth)],
            None,
        )
        .await?;
        Ok(response.data)
    }

    async fn create_ride_request(
        &self,
        booking: &CreateRideRequest,
    ) -> Result<ApiSuccess, AppError> {
        let url = self.endpoint("api/requests")?;
        let auth = self.bearer()?;
        call_api_unwrapping_error(
            &self.client,
            Method::POST,
            &url,
            vec![("authorization", &auth)],
            Some(booking),
            Box::new(surface_error_message),
        )
        .await
    }

    async fn get_driver(&self, driver_id: DriverId) -> Result<Driver, AppError> {
        let DriverId(id) = driver_id;
        let url = self.endpoint(&format!("api/drivers/{id}"))?;
        let auth = self.bearer()?;
        let response: DriverResponse = call_api::<DriverResponse, String>(
            &self.client,
            Method::GET,
            &url,
            vec![("authorization", &auth)],
            None,
        )
        .await?;
        Ok(response.data)
    }

    async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, AppError> {
        let url = self.endpoint("api/user/login")?;
        call_api_unwrapping_error(
            &self.client,
            Method::POST,
            &url,
            vec![],
            Some(credentials),
            Box::new(surface_error_message),
        )
        .await
    }

    async fn register(&self, registration: &RegisterRequest) -> Result<ApiSuccess, AppError> {
        let url = self.endpoint("api/user/register")?;
        call_api_unwrapping_error(
            &self.client,
            Method::POST,
            &url,
            vec![],
            Some(registration),
            Box::new(surface_error_message),
        )
        .await
    }
}
