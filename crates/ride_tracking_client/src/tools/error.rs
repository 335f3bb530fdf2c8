/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error payload the backend attaches to non-2xx responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InternalError(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("External API call failed : {0}")]
    ExternalAPICallError(String),
    #[error("{0}")]
    SerializationError(String),
    #[error("{0}")]
    DeserializationError(String),
    #[error("Request timed out")]
    RequestTimeout,
    #[error("Session token was rejected")]
    Unauthorized,
    #[error("No authenticated session")]
    NotAuthenticated,
    #[error("Invalid configuration : {0}")]
    InvalidConfiguration(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InternalError(_) => "INTERNAL_ERROR",
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::ExternalAPICallError(_) => "EXTERNAL_API_CALL_ERROR",
            AppError::SerializationError(_) => "SERIALIZATION_ERROR",
            AppError::DeserializationError(_) => "DESERIALIZATION_ERROR",
            AppError::RequestTimeout => "REQUEST_TIMEOUT",
            AppError::Unauthorized => "INVALID_TOKEN",
            AppError::NotAuthenticated => "NOT_AUTHENTICATED",
            AppError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
        }
    }

    /// Authorization failures are terminal for the session: loops stop,
    /// credentials are cleared and control hands off to re-authentication.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, AppError::Unauthorized | AppError::NotAuthenticated)
    }
}
