//! SubscriptionService: newsletter sign-ups.

use crate::services::timestamp::now_text;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),
    #[error("`{0}` is already subscribed")]
    AlreadySubscribed(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct Subscription {
    pub id: i64,
    pub email: String,
    pub created_at: String,
}

#[derive(Clone)]
pub struct SubscriptionService {
    pub db: Arc<SqlitePool>,
}

impl SubscriptionService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn subscribe(&self, email: &str) -> Result<Subscription, SubscriptionError> {
        let email = normalize_email(email)?;
        sqlx::query_as::<_, Subscription>(
            "INSERT INTO subscriptions (email, created_at) VALUES (?, ?)
             RETURNING id, email, created_at",
        )
        .bind(&email)
        .bind(now_text())
        .fetch_one(&*self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                SubscriptionError::AlreadySubscribed(email.clone())
            } else {
                SubscriptionError::Sqlx(err)
            }
        })
    }
}

/// Trim and lowercase; require exactly one `@` with something on both sides
/// and a dot in the domain.
fn normalize_email(raw: &str) -> Result<String, SubscriptionError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(SubscriptionError::InvalidEmail(raw.trim().to_string()))
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
