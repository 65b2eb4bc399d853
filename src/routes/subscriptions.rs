use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use sqlx::SqlitePool;

use crate::{
    domain::{
        analytics_event::{EventType, NewAnalyticsEvent},
        new_subscriber::{FieldError, NewSubscriber, NewSubscriberBody},
        subscriber_tokens::{ConfirmationToken, SubscriberTokens},
    },
    email_client::EmailClient,
    routes::{error_chain_fmt, json_error},
    startup::{ApplicationBaseUrl, SiteName},
    store::{analytics, is_unique_violation, preferences, subscribers},
};

#[tracing::instrument(
    name = "Creating a new subscriber handler",
    skip(body, db_pool, email_client, base_url, site_name),
    fields(
        subscriber_email = %body.email,
        subscriber_name = %body.name
    )
)]
pub async fn handle_create_subscription(
    body: web::Json<NewSubscriberBody>,
    db_pool: web::Data<SqlitePool>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<ApplicationBaseUrl>,
    site_name: web::Data<SiteName>,
) -> Result<HttpResponse, SubscribeError> {
    let new_subscriber: NewSubscriber = body
        .into_inner()
        .try_into()
        .map_err(SubscribeError::ValidationError)?;

    let existing = subscribers::find_by_email(&db_pool, &new_subscriber.email)
        .await
        .context("Failed to look up the subscriber by email.")?;

    match existing {
        Some(subscriber) if subscriber.status.is_pending() => {
            refresh_pending_profile(&db_pool, &new_subscriber).await?;

            send_confirmation_email(
                &email_client,
                &new_subscriber,
                &base_url.0,
                &site_name.0,
                &subscriber.confirmation_token,
            )
            .await
            .context("Failed to resend the confirmation email.")?;

            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Confirmation email resent. Please check your inbox."
            })))
        }
        Some(_) => Err(SubscribeError::AlreadySubscribed),
        None => {
            let tokens = SubscriberTokens::generate();
            let subscriber =
                match subscribers::insert_subscriber(&db_pool, &new_subscriber, &tokens).await {
                    Ok(subscriber) => subscriber,
                    Err(err) if is_unique_violation(&err) => {
                        return Err(SubscribeError::AlreadySubscribed)
                    }
                    Err(err) => {
                        return Err(anyhow::Error::new(err)
                            .context("Failed to insert new subscriber.")
                            .into())
                    }
                };

            preferences::create_default_preferences(&db_pool, subscriber.id)
                .await
                .context("Failed to create the default email preferences.")?;

            // The subscriber stays pending when this fails; resubmitting the form resends the same link
            send_confirmation_email(
                &email_client,
                &new_subscriber,
                &base_url.0,
                &site_name.0,
                &tokens.confirmation,
            )
            .await
            .context("Failed to send a confirmation email to a new subscriber.")?;

            let event = NewAnalyticsEvent::new(EventType::FormSubmit, &new_subscriber.source)
                .with_subscriber_email(new_subscriber.email.as_ref())
                .with_metadata(serde_json::json!({
                    "pdf_choice": new_subscriber.pdf_choice.as_ref()
                }));
            if let Err(err) = analytics::record_event(&db_pool, &event).await {
                tracing::warn!("Failed to record the form submission: {:?}", err);
            }

            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Please check your email to confirm your subscription."
            })))
        }
    }
}

/// Overwrites the stored profile, failing as a duplicate when the subscriber
/// was confirmed or unsubscribed after it was looked up.
async fn refresh_pending_profile(
    db_pool: &SqlitePool,
    new_subscriber: &NewSubscriber,
) -> Result<(), SubscribeError> {
    let still_pending = subscribers::update_pending_profile(db_pool, new_subscriber)
        .await
        .context("Failed to update the profile of a pending subscriber.")?;

    if !still_pending {
        return Err(SubscribeError::AlreadySubscribed);
    }

    Ok(())
}

#[tracing::instrument(
    name = "Send a confirmation email to a new subscriber",
    fields(base_url = %base_url),
    skip(email_client, new_subscriber, site_name, confirmation_token)
)]
async fn send_confirmation_email(
    email_client: &EmailClient,
    new_subscriber: &NewSubscriber,
    base_url: &str,
    site_name: &str,
    confirmation_token: &ConfirmationToken,
) -> Result<(), reqwest::Error> {
    let confirmation_link = format!("{}/confirm?token={}", base_url, confirmation_token.as_ref());
    let html_body = format!(
        r#"
            <div>
                <h1>Confirm your email address</h1>
                <p>Hi {name},</p>
                <p>Thanks for signing up for {site_name}! To complete your subscription and receive your free playbooks, please confirm your email address.</p>
                <p>Click <a href="{link}">here</a> to confirm your subscription!</p>
                <p>If you didn't sign up for {site_name}, you can safely ignore this email.</p>
            </div>
        "#,
        name = htmlescape::encode_minimal(new_subscriber.name.as_ref()),
        site_name = site_name,
        link = confirmation_link
    );

    email_client
        .send_email(
            &new_subscriber.email,
            new_subscriber.name.as_ref(),
            "Please confirm your email address",
            html_body.as_str(),
        )
        .await
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("Invalid data")]
    ValidationError(Vec<FieldError>),
    #[error("This email is already subscribed")]
    AlreadySubscribed,
    #[error("An error occurred. Please try again.")]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscribeError::ValidationError(_) => StatusCode::BAD_REQUEST,
            SubscribeError::AlreadySubscribed => StatusCode::BAD_REQUEST,
            SubscribeError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            SubscribeError::ValidationError(details) => HttpResponse::build(self.status_code())
                .json(serde_json::json!({ "error": self.to_string(), "details": details })),
            _ => json_error(self.status_code(), &self.to_string()),
        }
    }
}
