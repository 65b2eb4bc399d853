use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    contact_list::{ContactAttributes, ContactListClient},
    domain::{
        email_preferences::{Frequency, PreferencesUpdate},
        subscriber::Subscriber,
        subscriber_status::SubscriberStatus,
        subscriber_tokens::PreferenceToken,
    },
    email_client::EmailClient,
    routes::{error_chain_fmt, json_error, TokenParameters},
    startup::{ApplicationBaseUrl, SiteName},
    store::{preferences, subscribers},
};

#[derive(Deserialize, Debug)]
pub struct PreferencesBody {
    token: Option<String>,
    topic_business_automation: Option<bool>,
    topic_ai_trends: Option<bool>,
    topic_ai_education: Option<bool>,
    frequency: Option<Frequency>,
    unsubscribe: Option<bool>,
}

impl PreferencesBody {
    fn update(&self) -> PreferencesUpdate {
        PreferencesUpdate {
            topic_business_automation: self.topic_business_automation,
            topic_ai_trends: self.topic_ai_trends,
            topic_ai_education: self.topic_ai_education,
            frequency: self.frequency,
        }
    }
}

#[tracing::instrument(name = "Get email preferences", skip(parameters, db_pool))]
pub async fn handle_get_preferences(
    parameters: web::Query<TokenParameters>,
    db_pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, PreferencesError> {
    let subscriber = subscriber_from_token(&db_pool, parameters.into_inner().token()).await?;
    let email_preferences = preferences::get_preferences_or_default(&db_pool, subscriber.id)
        .await
        .context("Failed to fetch the email preferences.")?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "subscriber": subscriber.public_profile(),
        "preferences": email_preferences
    })))
}

#[tracing::instrument(
    name = "Update email preferences",
    skip(body, db_pool, email_client, contact_list, base_url, site_name)
)]
pub async fn handle_update_preferences(
    body: web::Json<PreferencesBody>,
    db_pool: web::Data<SqlitePool>,
    email_client: web::Data<EmailClient>,
    contact_list: web::Data<ContactListClient>,
    base_url: web::Data<ApplicationBaseUrl>,
    site_name: web::Data<SiteName>,
) -> Result<HttpResponse, PreferencesError> {
    let body = body.into_inner();
    let token = body.token.clone().filter(|token| !token.trim().is_empty());
    let subscriber = subscriber_from_token(&db_pool, token).await?;

    if body.unsubscribe == Some(true) {
        if subscriber
            .status
            .can_transition_to(SubscriberStatus::Unsubscribed)
        {
            subscribers::unsubscribe(&db_pool, &subscriber.email)
                .await
                .context("Failed to unsubscribe the subscriber.")?;

            if let Err(err) = contact_list.remove_contact(&subscriber.email).await {
                tracing::error!("Failed to remove the contact from the marketing list: {:?}", err);
            }
        }

        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "You have been unsubscribed successfully."
        })));
    }

    let update = body.update();
    if !update.is_empty() {
        preferences::update_preferences(&db_pool, subscriber.id, &update)
            .await
            .context("Failed to store the email preferences.")?;

        if !subscriber.status.is_unsubscribed() {
            let attributes = ContactAttributes::from_update(&update);
            if let Err(err) = contact_list
                .update_contact(&subscriber.email, &attributes)
                .await
            {
                tracing::error!("Failed to sync the preferences to the marketing list: {:?}", err);
            }

            if let Err(err) = send_preferences_updated_email(
                &email_client,
                &base_url.0,
                &site_name.0,
                &subscriber,
            )
            .await
            {
                tracing::error!("Failed to send the preferences updated email: {:?}", err);
            }
        }
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Your preferences have been updated successfully."
    })))
}

async fn subscriber_from_token(
    db_pool: &SqlitePool,
    token: Option<String>,
) -> Result<Subscriber, PreferencesError> {
    let token = token.ok_or(PreferencesError::MissingToken)?;
    let token = PreferenceToken::parse(token).map_err(|_| PreferencesError::InvalidToken)?;

    subscribers::find_by_preference_token(db_pool, &token)
        .await
        .context("Failed to fetch the subscriber by preference token.")?
        .ok_or(PreferencesError::InvalidToken)
}

#[tracing::instrument(
    name = "Send the preferences updated email",
    skip(email_client, site_name, subscriber)
)]
async fn send_preferences_updated_email(
    email_client: &EmailClient,
    base_url: &str,
    site_name: &str,
    subscriber: &Subscriber,
) -> Result<(), reqwest::Error> {
    let preferences_link = format!(
        "{}/preferences?token={}",
        base_url,
        subscriber.preference_token.as_ref()
    );
    let html_body = format!(
        r#"
            <div>
                <h1>Your preferences were updated</h1>
                <p>Hi {},</p>
                <p>We saved your new email preferences for {}.</p>
                <p>You can change them again at any time <a href="{}">here</a>.</p>
            </div>
        "#,
        htmlescape::encode_minimal(&subscriber.name),
        site_name,
        preferences_link
    );

    email_client
        .send_email(
            &subscriber.email,
            &subscriber.name,
            "Email preferences updated",
            html_body.as_str(),
        )
        .await
}

#[derive(thiserror::Error)]
pub enum PreferencesError {
    #[error("Token is required")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("An error occurred. Please try again.")]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for PreferencesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for PreferencesError {
    fn status_code(&self) -> StatusCode {
        match self {
            PreferencesError::MissingToken => StatusCode::BAD_REQUEST,
            PreferencesError::InvalidToken => StatusCode::NOT_FOUND,
            PreferencesError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error(self.status_code(), &self.to_string())
    }
}
