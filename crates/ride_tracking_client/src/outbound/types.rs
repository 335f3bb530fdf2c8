/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::{Driver, RideRequest, Token};
use serde::{Deserialize, Serialize};

/// `GET /api/requests`. A missing `data` field is an empty list, not an
/// error.
#[derive(Debug, Deserialize)]
pub struct RideRequestListResponse {
    #[serde(default)]
    pub data: Option<Vec<RideRequest>>,
}

/// `GET /api/requests/{id}`.
#[derive(Debug, Deserialize)]
pub struct RideRequestResponse {
    pub data: RideRequest,
}

/// `GET /api/drivers/{id}`.
#[derive(Debug, Deserialize)]
pub struct DriverResponse {
    pub data: Driver,
}

/// `POST /api/requests` body. Field names follow the backend's camelCase
/// form contract.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateRideRequest {
    pub pickup_location: String,
    pub dropoff_location: String,
    pub request_time: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: Token,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Generic 2xx acknowledgement.
#[derive(Debug, Default, Deserialize)]
pub struct ApiSuccess {
    #[serde(default)]
    pub message: Option<String>,
}
