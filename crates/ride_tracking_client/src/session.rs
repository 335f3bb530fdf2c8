/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::{Role, Token};
use crate::tools::error::AppError;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Session {
    pub token: Token,
    pub display_name: String,
    pub role: Role,
}

/// Ephemeral credential store for the current process. Holds the bearer
/// token, a display name and a role marker; absence of any of the three is
/// "not authenticated". Immutable for the session except on login, logout or
/// forced re-authentication.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<Option<Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from the three persisted values. Any missing piece, or
    /// an unknown role marker, yields an unauthenticated store.
    pub fn from_parts(
        token: Option<String>,
        display_name: Option<String>,
        role: Option<String>,
    ) -> Self {
        let session = match (token, display_name, role) {
            (Some(token), Some(display_name), Some(role)) => {
                Role::from_str(&role).ok().map(|role| Session {
                    token: Token(token),
                    display_name,
                    role,
                })
            }
            _ => None,
        };
        Self {
            inner: Mutex::new(session),
        }
    }

    pub fn authenticate(&self, session: Session) {
        *self.lock() = Some(session);
    }

    /// Drops the credentials. Every loop still in flight will fail its next
    /// authorization check and terminate.
    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub fn current(&self) -> Option<Session> {
        self.lock().clone()
    }

    pub fn token(&self) -> Result<Token, AppError> {
        self.lock()
            .as_ref()
            .map(|session| session.token.clone())
            .ok_or(AppError::NotAuthenticated)
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_some()
    }

    pub fn is_rider(&self) -> bool {
        matches!(
            self.lock().as_ref(),
            Some(Session {
                role: Role::Rider,
                ..
            })
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_three_parts_are_required() {
        let store = SessionStore::from_parts(
            Some("token".to_string()),
            Some("asha".to_string()),
            Some("user".to_string()),
        );
        assert!(store.is_authenticated());
        assert!(store.is_rider());

        let missing_role =
            SessionStore::from_parts(Some("token".to_string()), Some("asha".to_string()), None);
        assert!(!missing_role.is_authenticated());

        let missing_token =
            SessionStore::from_parts(None, Some("asha".to_string()), Some("user".to_string()));
        assert!(missing_token.token().is_err());
    }

    #[test]
    fn unknown_role_marker_is_unauthenticated() {
        let store = SessionStore::from_parts(
            Some("token".to_string()),
            Some("asha".to_string()),
            Some("superuser".to_string()),
        );
        assert!(!store.is_authenticated());
    }

    #[test]
    fn driver_session_is_not_a_rider() {
        let store = SessionStore::from_parts(
            Some("token".to_string()),
            Some("ravi".to_string()),
            Some("driver".to_string()),
        );
        assert!(store.is_authenticated());
        assert!(!store.is_rider());
    }

    #[test]
    fn clear_terminates_the_session() {
        let store = SessionStore::new();
        store.authenticate(Session {
            token: Token("token".to_string()),
            display_name: "asha".to_string(),
            role: Role::Rider,
        });
        assert!(store.token().is_ok());
        store.clear();
        assert!(matches!(store.token(), Err(AppError::NotAuthenticated)));
    }
}
