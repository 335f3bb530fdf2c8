/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use super::ValidationErrors;
use crate::common::types::Role;
use crate::outbound::external::RideApi;
use crate::outbound::types::{ApiSuccess, LoginRequest, RegisterRequest};
use crate::session::{Session, SessionStore};
use crate::tools::error::AppError;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

pub const FIELD_USERNAME: &str = "username";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_PHONE: &str = "phone";
pub const FIELD_PASSWORD: &str = "password";

// 10-15 digits, optional leading country code marker.
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?\d{10,15}$").expect("phone pattern is valid"));

const PASSWORD_SYMBOLS: &str = "!@#$%^&*";

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// The email's local part doubles as the display name.
pub fn display_name_from_email(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Exchanges credentials for a session token and installs the rider session
/// into the store.
pub async fn login(
    api: &dyn RideApi,
    session: &SessionStore,
    credentials: &Credentials,
) -> Result<Session, AppError> {
    let response = api
        .login(&LoginRequest {
            email: credentials.email.clone(),
            password: credentials.password.clone(),
        })
        .await?;

    let authenticated = Session {
        token: response.token,
        display_name: display_name_from_email(&credentials.email).to_string(),
        role: Role::Rider,
    };
    session.authenticate(authenticated.clone());
    info!(tag = "[AUTH]", display_name = %authenticated.display_name, "login succeeded");
    Ok(authenticated)
}

/// Client-side registration checks, mirroring the signup form rules: every
/// field present, a plausible phone number and a password with at least one
/// digit and one symbol over an alphanumeric+symbol charset.
pub fn validate_registration(form: &RegistrationForm) -> Result<RegisterRequest, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let username = form.username.trim();
    let email = form.email.trim();
    let phone: String = form
        .phone
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let password = form.password.trim();

    if username.is_empty() {
        errors.push(FIELD_USERNAME, "Please fill in all fields");
    }
    if email.is_empty() {
        errors.push(FIELD_EMAIL, "Please fill in all fields");
    }
    if phone.is_empty() {
        errors.push(FIELD_PHONE, "Please fill in all fields");
    } else if !PHONE_PATTERN.is_match(&phone) {
        errors.push(
            FIELD_PHONE,
            "Please enter a valid phone number (10-15 digits, optional country code)",
        );
    }
    if password.is_empty() {
        errors.push(FIELD_PASSWORD, "Please fill in all fields");
    } else if !valid_password(password) {
        errors.push(
            FIELD_PASSWORD,
            "Password must be at least 8 characters long and include a number and a symbol",
        );
    }

    if errors.is_empty() {
        Ok(RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            phone,
            password: password.to_string(),
        })
    } else {
        Err(errors)
    }
}

fn valid_password(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
        && password
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SYMBOLS.contains(c))
}

/// Validates and, only when the form is clean, registers the account.
pub async fn register(
    api: &dyn RideApi,
    form: &RegistrationForm,
) -> Result<ApiSuccess, super::ActionError> {
    let body = validate_registration(form).map_err(super::ActionError::Validation)?;
    let response = api.register(&body).await?;
    info!(tag = "[AUTH]", username = %body.username, "registration submitted");
    Ok(response)
}
