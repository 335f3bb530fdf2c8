/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::tools::error::{ApiErrorBody, AppError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::str::FromStr;
use tracing::{error, info};

/// Sends an asynchronous API request to the specified URL.
///
/// Non-2xx statuses are mapped onto the error taxonomy directly: 401 becomes
/// the terminal `Unauthorized`, a client-side timeout becomes
/// `RequestTimeout`, anything else an `ExternalAPICallError` carrying the
/// status. Use [`call_api_unwrapping_error`] when the response body of a
/// failed call matters.
pub async fn call_api<T, U>(
    client: &Client,
    method: Method,
    url: &Url,
    headers: Vec<(&str, &str)>,
    body: Option<U>,
) -> Result<T, AppError>
where
    T: DeserializeOwned,
    U: Serialize + Debug,
{
    let start_time = std::time::Instant::now();

    let request = build_request(client, &method, url, headers, &body)?;

    let resp = request.send().await;

    let url_str = format!(
        "{}://{}:{}",
        url.scheme(),
        url.host_str().unwrap_or(""),
        url.port().unwrap_or(80)
    );

    match resp {
        Ok(resp) => {
            if resp.status().is_success() {
                info!(tag = "[OUTGOING API]", request_method = %method, request_body = format!("{:?}", body), request_url = %url_str, request_path = url.path(), latency = format!("{:?}ms", start_time.elapsed().as_millis()));
                resp.json::<T>()
                    .await
                    .map_err(|err| AppError::DeserializationError(err.to_string()))
            } else if resp.status() == StatusCode::UNAUTHORIZED {
                error!(tag = "[OUTGOING API - UNAUTHORIZED]", request_method = %method, request_url = %url_str, request_path = url.path(), latency = format!("{:?}ms", start_time.elapsed().as_millis()));
                Err(AppError::Unauthorized)
            } else {
                error!(tag = "[OUTGOING API - ERROR]", request_method = %method, request_body = format!("{:?}", body), request_url = %url_str, request_path = url.path(), status = %resp.status(), latency = format!("{:?}ms", start_time.elapsed().as_millis()));
                Err(AppError::ExternalAPICallError(resp.status().to_string()))
            }
        }
        Err(err) if err.is_timeout() => {
            error!(tag = "[OUTGOING API - TIMEOUT]", request_method = %method, request_url = %url_str, request_path = url.path(), latency = format!("{:?}ms", start_time.elapsed().as_millis()));
            Err(AppError::RequestTimeout)
        }
        Err(err) => {
            error!(tag = "[OUTGOING API - ERROR]", request_method = %method, request_body = format!("{:?}", body), request_url = %url_str, request_path = url.path(), error = format!("{:?}", err), latency = format!("{:?}ms", start_time.elapsed().as_millis()));
            Err(AppError::ExternalAPICallError(err.to_string()))
        }
    }
}

/// Like [`call_api`], but hands failed responses (other than 401, which stays
/// terminal) to `error_handler` along with the parsed error body, so callers
/// can surface backend validation messages instead of a bare status code.
pub async fn call_api_unwrapping_error<T, U>(
    client: &Client,
    method: Method,
    url: &Url,
    headers: Vec<(&str, &str)>,
    body: Option<U>,
    error_handler: Box<dyn Fn(StatusCode, Option<ApiErrorBody>) -> AppError + Send + Sync>,
) -> Result<T, AppError>
where
    T: DeserializeOwned,
    U: Serialize + Debug,
{
    let start_time = std::time::Instant::now();

    let request = build_request(client, &method, url, headers, &body)?;

    let resp = request.send().await;

    let url_str = format!(
        "{}://{}:{}",
        url.scheme(),
        url.host_str().unwrap_or(""),
        url.port().unwrap_or(80)
    );

    match resp {
        Ok(resp) => {
            let status = resp.status();
            if status.is_success() {
                info!(tag = "[OUTGOING API]", request_method = %method, request_body = format!("{:?}", body), request_url = %url_str, request_path = url.path(), latency = format!("{:?}ms", start_time.elapsed().as_millis()));
                resp.json::<T>()
                    .await
                    .map_err(|err| AppError::DeserializationError(err.to_string()))
            } else if status == StatusCode::UNAUTHORIZED {
                error!(tag = "[OUTGOING API - UNAUTHORIZED]", request_method = %method, request_url = %url_str, request_path = url.path(), latency = format!("{:?}ms", start_time.elapsed().as_millis()));
                Err(AppError::Unauthorized)
            } else {
                let error_body = resp.json::<ApiErrorBody>().await.ok();
                error!(tag = "[OUTGOING API - ERROR]", request_method = %method, request_body = format!("{:?}", body), request_url = %url_str, request_path = url.path(), status = %status, error_body = format!("{:?}", error_body), latency = format!("{:?}ms", start_time.elapsed().as_millis()));
                Err(error_handler(status, error_body))
            }
        }
        Err(err) if err.is_timeout() => {
            error!(tag = "[OUTGOING API - TIMEOUT]", request_method = %method, request_url = %url_str, request_path = url.path(), latency = format!("{:?}ms", start_time.elapsed().as_millis()));
            Err(AppError::RequestTimeout)
        }
        Err(err) => {
            error!(tag = "[OUTGOING API - ERROR]", request_method = %method, request_body = format!("{:?}", body), request_url = %url_str, request_path = url.path(), error = format!("{:?}", err), latency = format!("{:?}ms", start_time.elapsed().as_millis()));
            Err(AppError::ExternalAPICallError(err.to_string()))
        }
    }
}

fn build_request<U>(
    client: &Client,
    method: &Method,
    url: &Url,
    headers: Vec<(&str, &str)>,
    body: &Option<U>,
) -> Result<reqwest::RequestBuilder, AppError>
where
    U: Serialize + Debug,
{
    let mut header_map = HeaderMap::new();

    for (header_key, header_value) in headers {
        let header_name = HeaderName::from_str(header_key)
            .map_err(|_| AppError::InvalidRequest(format!("Invalid Header Name : {header_key}")))?;
        let header_value = HeaderValue::from_str(header_value).map_err(|_| {
            AppError::InvalidRequest(format!("Invalid Header Value : {header_value}"))
        })?;

        header_map.insert(header_name, header_value);
    }

    let mut request = client
        .request(method.to_owned(), url.to_owned())
        .headers(header_map);

    if let Some(body) = body {
        let body = serde_json::to_string(body)
            .map_err(|err| AppError::SerializationError(err.to_string()))?;
        request = request
            .header("content-type", "application/json")
            .body(body);
    }

    Ok(request)
}
