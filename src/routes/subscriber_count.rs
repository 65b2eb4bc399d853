use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use sqlx::SqlitePool;

use crate::routes::{error_chain_fmt, json_error};
use crate::store::subscribers;

/// Public social-proof counter of confirmed subscribers.
#[tracing::instrument(name = "Get the subscriber count", skip(db_pool))]
pub async fn handle_subscriber_count(
    db_pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, SubscriberCountError> {
    let count = subscribers::count_confirmed(&db_pool)
        .await
        .context("Failed to count the confirmed subscribers.")?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": count,
        "displayCount": display_count(count)
    })))
}

/// Rounds down to a multiple of 50 once the count passes 100.
fn display_count(count: i64) -> i64 {
    if count > 100 {
        count / 50 * 50
    } else {
        count
    }
}

#[derive(thiserror::Error)]
pub enum SubscriberCountError {
    #[error("An error occurred. Please try again.")]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for SubscriberCountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscriberCountError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        json_error(self.status_code(), &self.to_string())
    }
}
