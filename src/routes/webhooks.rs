use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    domain::{
        analytics_event::{EventType, NewAnalyticsEvent},
        subscriber_email::SubscriberEmail,
    },
    store::{analytics, subscribers},
};

/// Events after which the provider will no longer deliver to the address.
const UNSUBSCRIBING_EVENTS: [&str; 4] = ["unsubscribed", "hard_bounce", "bounce", "spam"];

#[derive(Deserialize, Debug)]
pub struct WebhookPayload {
    event: String,
    email: String,
    campaign_id: Option<i64>,
    subject: Option<String>,
    reason: Option<String>,
}

impl WebhookPayload {
    fn unsubscribes(&self) -> bool {
        UNSUBSCRIBING_EVENTS.contains(&self.event.as_str())
    }
}

/// Receives delivery notifications from the email provider. Always answers 200
/// so the provider does not keep retrying; failures are only logged.
#[tracing::instrument(name = "Handle an email provider webhook", skip(body, db_pool))]
pub async fn handle_provider_webhook(
    provider: web::Path<String>,
    body: web::Bytes,
    db_pool: web::Data<SqlitePool>,
) -> HttpResponse {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!("Failed to parse the webhook payload: {:?}", err);
            return HttpResponse::Ok().json(serde_json::json!({ "received": false }));
        }
    };

    tracing::info!(event = %payload.event, "Webhook event received");

    if payload.unsubscribes() {
        match SubscriberEmail::parse(payload.email.clone()) {
            Ok(email) => {
                if let Err(err) = subscribers::unsubscribe(&db_pool, &email).await {
                    tracing::error!("Failed to unsubscribe after a webhook event: {:?}", err);
                }
            }
            Err(err) => tracing::warn!("Webhook event carries an invalid email: {}", err),
        }
    }

    let event = NewAnalyticsEvent::new(
        EventType::EmailEvent,
        format!("{}_webhook", provider.into_inner()),
    )
    .with_subscriber_email(payload.email.trim().to_lowercase())
    .with_metadata(serde_json::json!({
        "event": payload.event,
        "campaign_id": payload.campaign_id,
        "subject": payload.subject,
        "reason": payload.reason
    }));
    if let Err(err) = analytics::record_event(&db_pool, &event).await {
        tracing::error!("Failed to record the webhook event: {:?}", err);
    }

    HttpResponse::Ok().json(serde_json::json!({ "received": true }))
}
