use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    domain::{
        analytics_event::{EventType, NewAnalyticsEvent},
        new_subscriber::FieldError,
        subscriber_email::SubscriberEmail,
    },
    routes::{error_chain_fmt, json_error},
    store::analytics,
};

#[derive(Deserialize, Debug)]
pub struct TrackEventBody {
    event_type: String,
    source: Option<String>,
    variant: Option<String>,
    subscriber_email: Option<String>,
    metadata: Option<serde_json::Value>,
}

impl TryFrom<TrackEventBody> for NewAnalyticsEvent {
    type Error = Vec<FieldError>;

    fn try_from(body: TrackEventBody) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();

        let event_type = serde_json::from_value::<EventType>(serde_json::Value::String(
            body.event_type,
        ))
        .ok()
        .filter(EventType::is_client_reportable);
        if event_type.is_none() {
            errors.push(FieldError::new("event_type", "Invalid event type"));
        }

        let source = body
            .source
            .map(|source| source.trim().to_string())
            .unwrap_or_default();
        if source.is_empty() {
            errors.push(FieldError::new("source", "Source is required"));
        }

        let subscriber_email = match body.subscriber_email {
            Some(email) => SubscriberEmail::parse(email)
                .map_err(|_| errors.push(FieldError::new("subscriber_email", "Invalid email")))
                .ok(),
            None => None,
        };

        if matches!(&body.metadata, Some(metadata) if !metadata.is_object()) {
            errors.push(FieldError::new("metadata", "Metadata must be an object"));
        }

        match event_type {
            Some(event_type) if errors.is_empty() => Ok(NewAnalyticsEvent {
                event_type,
                source,
                variant: body.variant.filter(|variant| !variant.trim().is_empty()),
                subscriber_email: subscriber_email.map(|email| email.as_ref().to_string()),
                metadata: body.metadata,
            }),
            _ => Err(errors),
        }
    }
}

#[tracing::instrument(
    name = "Track an analytics event",
    skip(body, db_pool),
    fields(event_type = %body.event_type)
)]
pub async fn handle_track_event(
    body: web::Json<TrackEventBody>,
    db_pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, AnalyticsError> {
    let event: NewAnalyticsEvent = body
        .into_inner()
        .try_into()
        .map_err(AnalyticsError::ValidationError)?;

    analytics::record_event(&db_pool, &event)
        .await
        .context("Failed to record the analytics event.")?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

#[tracing::instrument(name = "Get the conversion statistics", skip(db_pool))]
pub async fn handle_get_analytics(
    db_pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, AnalyticsError> {
    let stats = analytics::conversion_stats(&db_pool)
        .await
        .context("Failed to compute the conversion statistics.")?;

    Ok(HttpResponse::Ok().json(stats))
}

#[derive(thiserror::Error)]
pub enum AnalyticsError {
    #[error("Invalid data")]
    ValidationError(Vec<FieldError>),
    #[error("An error occurred. Please try again.")]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for AnalyticsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for AnalyticsError {
    fn status_code(&self) -> StatusCode {
        match self {
            AnalyticsError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AnalyticsError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AnalyticsError::ValidationError(details) => HttpResponse::build(self.status_code())
                .json(serde_json::json!({ "error": self.to_string(), "details": details })),
            _ => json_error(self.status_code(), &self.to_string()),
        }
    }
}
