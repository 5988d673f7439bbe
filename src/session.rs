//! Per-request session resolution.
//!
//! Identity is never ambient: every handler that cares about the caller
//! takes a [`SessionState`] argument, resolved from the `Authorization`
//! header against the `sessions` table.

use crate::{
    errors::AppError,
    models::profile::{ADMIN_ROLE_ID, Profile},
    services::timestamp::{now_text, parse_timestamp},
    state::AppState,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("authentication required: {0}")]
    Unauthenticated(String),
    #[error("administrator access required")]
    Forbidden,
}

/// Lifecycle of a caller's identity within one request.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    Authenticating { token: String },
    Authenticated(Profile),
    Failed(String),
}

impl SessionState {
    /// Start from the raw `Authorization` header value, if any.
    pub fn begin(authorization: Option<&str>) -> Self {
        let Some(raw) = authorization else {
            return SessionState::Anonymous;
        };
        match raw.trim().split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
                SessionState::Authenticating {
                    token: token.trim().to_string(),
                }
            }
            _ => SessionState::Failed("malformed authorization header".into()),
        }
    }

    /// Look up a pending token. Other states are returned unchanged.
    pub async fn resolve(self, db: &SqlitePool) -> Result<Self, sqlx::Error> {
        let token = match self {
            SessionState::Authenticating { token } => token,
            settled => return Ok(settled),
        };

        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT p.id, p.full_name, p.role_id, p.created_at, s.expires_at
             FROM sessions s JOIN profiles p ON p.id = s.profile_id
             WHERE s.token = ?",
        )
        .bind(&token)
        .fetch_optional(db)
        .await?;

        Ok(match row {
            None => SessionState::Failed("unknown session token".into()),
            Some(row) if row.is_expired() => SessionState::Failed("session expired".into()),
            Some(row) => {
                debug!(profile = %row.id, "session authenticated");
                SessionState::Authenticated(row.into_profile())
            }
        })
    }

    pub fn require_user(&self) -> Result<&Profile, SessionError> {
        match self {
            SessionState::Authenticated(profile) => Ok(profile),
            SessionState::Failed(reason) => Err(SessionError::Unauthenticated(reason.clone())),
            SessionState::Anonymous | SessionState::Authenticating { .. } => {
                Err(SessionError::Unauthenticated("no session".into()))
            }
        }
    }

    pub fn require_admin(&self) -> Result<&Profile, SessionError> {
        let profile = self.require_user()?;
        if profile.is_admin() {
            Ok(profile)
        } else {
            Err(SessionError::Forbidden)
        }
    }
}

impl<S> FromRequestParts<S> for SessionState
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| value.to_str().unwrap_or_default());
        let session = SessionState::begin(header)
            .resolve(&app.db)
            .await
            .map_err(|err| AppError::internal(err.to_string()))?;
        Ok(session)
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    full_name: Option<String>,
    role_id: i64,
    created_at: String,
    expires_at: Option<String>,
}

impl SessionRow {
    fn is_expired(&self) -> bool {
        match self.expires_at.as_deref() {
            None => false,
            Some(raw) => parse_timestamp(raw).is_none_or(|at| at <= Utc::now()),
        }
    }

    fn into_profile(self) -> Profile {
        Profile {
            id: self.id,
            full_name: self.full_name,
            role_id: self.role_id,
            created_at: self.created_at,
        }
    }
}

/// Create a profile with admin rights plus a non-expiring session token.
pub async fn bootstrap_admin(db: &SqlitePool, full_name: &str) -> Result<(Profile, String), sqlx::Error> {
    let profile = sqlx::query_as::<_, Profile>(
        "INSERT INTO profiles (id, full_name, role_id, created_at) VALUES (?, ?, ?, ?)
         RETURNING id, full_name, role_id, created_at",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(full_name.trim())
    .bind(ADMIN_ROLE_ID)
    .bind(now_text())
    .fetch_one(db)
    .await?;

    let token = issue_token(db, &profile.id, None).await?;
    Ok((profile, token))
}

/// Store a fresh random token for `profile_id`.
pub async fn issue_token(
    db: &SqlitePool,
    profile_id: &str,
    expires_at: Option<&str>,
) -> Result<String, sqlx::Error> {
    let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    sqlx::query("INSERT INTO sessions (token, profile_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&token)
        .bind(profile_id)
        .bind(now_text())
        .bind(expires_at)
        .execute(db)
        .await?;
    Ok(token)
}
