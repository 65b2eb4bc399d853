use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use sqlx::SqlitePool;

use crate::{
    contact_list::{ContactAttributes, ContactListClient},
    domain::{
        analytics_event::{EventType, NewAnalyticsEvent},
        email_preferences::EmailPreferences,
        subscriber::Subscriber,
        subscriber_status::SubscriberStatus,
        subscriber_tokens::ConfirmationToken,
    },
    email_client::EmailClient,
    routes::{error_chain_fmt, json_error, TokenParameters},
    startup::{ApplicationBaseUrl, SiteName},
    store::{analytics, preferences, subscribers},
};

#[tracing::instrument(
    name = "Confirm a pending subscriber",
    skip(parameters, db_pool, email_client, contact_list, base_url, site_name)
)]
pub async fn handle_confirm_subscription(
    parameters: web::Query<TokenParameters>,
    db_pool: web::Data<SqlitePool>,
    email_client: web::Data<EmailClient>,
    contact_list: web::Data<ContactListClient>,
    base_url: web::Data<ApplicationBaseUrl>,
    site_name: web::Data<SiteName>,
) -> Result<HttpResponse, ConfirmError> {
    let token = parameters
        .into_inner()
        .token()
        .ok_or(ConfirmError::MissingToken)?;
    // Malformed and unknown tokens get the same answer so that issued tokens cannot be probed
    let token = ConfirmationToken::parse(token).map_err(|_| ConfirmError::InvalidToken)?;

    let confirmed_now = subscribers::confirm(&db_pool, &token)
        .await
        .context("Failed to confirm the subscriber.")?;
    let subscriber = subscribers::find_by_confirmation_token(&db_pool, &token)
        .await
        .context("Failed to fetch the subscriber by confirmation token.")?;

    let subscriber = match (confirmed_now, subscriber) {
        (true, Some(subscriber)) => subscriber,
        (true, None) => {
            return Err(anyhow::anyhow!("A confirmed subscriber could not be found again.").into())
        }
        (false, Some(subscriber)) if subscriber.status == SubscriberStatus::Confirmed => {
            return Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Your email is already confirmed."
            })));
        }
        (false, _) => return Err(ConfirmError::InvalidToken),
    };

    complete_confirmation(
        &db_pool,
        &email_client,
        &contact_list,
        &base_url.0,
        &site_name.0,
        &subscriber,
    )
    .await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Email confirmed successfully! Check your inbox for your playbooks."
    })))
}

/// Side effects of a confirmation. The confirmed status is already committed,
/// so every step here only logs its failure.
#[tracing::instrument(
    name = "Complete the confirmation of a subscriber",
    skip_all,
    fields(subscriber_email = %subscriber.email)
)]
async fn complete_confirmation(
    db_pool: &SqlitePool,
    email_client: &EmailClient,
    contact_list: &ContactListClient,
    base_url: &str,
    site_name: &str,
    subscriber: &Subscriber,
) {
    let email_preferences = preferences::get_preferences_or_default(db_pool, subscriber.id)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!("Failed to fetch email preferences, using defaults: {:?}", err);
            EmailPreferences::default()
        });

    let attributes = ContactAttributes::from_subscriber(subscriber, &email_preferences);
    if let Err(err) = contact_list
        .upsert_contact(&subscriber.email, &attributes)
        .await
    {
        tracing::error!("Failed to add the subscriber to the marketing list: {:?}", err);
    }

    if let Err(err) = send_welcome_email(email_client, base_url, site_name, subscriber).await {
        tracing::error!("Failed to send the welcome email: {:?}", err);
    }

    let event = NewAnalyticsEvent::new(EventType::Conversion, &subscriber.source)
        .with_subscriber_email(subscriber.email.as_ref())
        .with_metadata(serde_json::json!({ "pdf_choice": subscriber.pdf_choice }));
    if let Err(err) = analytics::record_event(db_pool, &event).await {
        tracing::warn!("Failed to record the conversion: {:?}", err);
    }
}

#[tracing::instrument(
    name = "Send the welcome email with the download links",
    skip(email_client, site_name, subscriber),
    fields(pdf_choice = %subscriber.pdf_choice)
)]
async fn send_welcome_email(
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
    let resources: String = subscriber
        .resources()
        .iter()
        .map(|resource| {
            format!(
                r#"<p><strong>{}</strong> <a href="{}/assets/{}">Download</a></p>"#,
                resource.title, base_url, resource.file_name
            )
        })
        .collect();
    let html_body = format!(
        r#"
            <div>
                <h1>Welcome to {site_name}!</h1>
                <p>Hi {name},</p>
                <p>Your email is confirmed! Here are your free playbooks:</p>
                {resources}
                <p><a href="{preferences_link}">Manage Preferences</a> | <a href="{base_url}">Visit Our Website</a></p>
            </div>
        "#,
        site_name = site_name,
        name = htmlescape::encode_minimal(&subscriber.name),
        resources = resources,
        preferences_link = preferences_link,
        base_url = base_url
    );

    email_client
        .send_email(
            &subscriber.email,
            &subscriber.name,
            "Your playbooks are ready!",
            html_body.as_str(),
        )
        .await
}

#[derive(thiserror::Error)]
pub enum ConfirmError {
    #[error("Confirmation token is required")]
    MissingToken,
    #[error("Invalid or expired confirmation token")]
    InvalidToken,
    #[error("An error occurred. Please try again.")]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for ConfirmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ConfirmError {
    fn status_code(&self) -> StatusCode {
        match self {
            ConfirmError::MissingToken => StatusCode::BAD_REQUEST,
            ConfirmError::InvalidToken => StatusCode::NOT_FOUND,
            ConfirmError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error(self.status_code(), &self.to_string())
    }
}
