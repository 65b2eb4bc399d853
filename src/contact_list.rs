use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::email_preferences::{EmailPreferences, PreferencesUpdate};
use crate::domain::subscriber::Subscriber;
use crate::domain::subscriber_email::SubscriberEmail;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

/// Client of the marketing contact list kept by the email provider.
pub struct ContactListClient {
    http_client: Client,
    base_url: String,
    api_key: Secret<String>,
}

/// Contact attributes as named in the provider dashboard. `None` values are left out.
#[derive(Debug, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ContactAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_interest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "TOPIC_BUSINESS", skip_serializing_if = "Option::is_none")]
    pub topic_business_automation: Option<bool>,
    #[serde(rename = "TOPIC_TRENDS", skip_serializing_if = "Option::is_none")]
    pub topic_ai_trends: Option<bool>,
    #[serde(rename = "TOPIC_EDUCATION", skip_serializing_if = "Option::is_none")]
    pub topic_ai_education: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

impl ContactAttributes {
    pub fn from_subscriber(subscriber: &Subscriber, preferences: &EmailPreferences) -> Self {
        ContactAttributes {
            name: Some(subscriber.name.clone()),
            company: subscriber.company.clone(),
            role: subscriber.role.clone(),
            primary_interest: subscriber.primary_interest.clone(),
            source: Some(subscriber.source.clone()),
            topic_business_automation: Some(preferences.topic_business_automation),
            topic_ai_trends: Some(preferences.topic_ai_trends),
            topic_ai_education: Some(preferences.topic_ai_education),
            frequency: Some(preferences.frequency.as_ref().to_string()),
        }
    }

    pub fn from_update(update: &PreferencesUpdate) -> Self {
        ContactAttributes {
            topic_business_automation: update.topic_business_automation,
            topic_ai_trends: update.topic_ai_trends,
            topic_ai_education: update.topic_ai_education,
            frequency: update
                .frequency
                .map(|frequency| frequency.as_ref().to_string()),
            ..Default::default()
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateContactBody<'a> {
    email: &'a str,
    attributes: &'a ContactAttributes,
    update_enabled: bool,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateContactBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<&'a ContactAttributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email_blacklisted: Option<bool>,
}

impl ContactListClient {
    pub fn new(
        base_url: String,
        api_key: Secret<String>,
        timeout: Option<time::Duration>,
    ) -> ContactListClient {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()
            .expect("Failed to build the contact list HTTP client");

        ContactListClient {
            http_client,
            base_url,
            api_key,
        }
    }

    /// Creates the contact, or updates it when the provider already knows the address.
    #[tracing::instrument(name = "Add a contact to the marketing list", skip(self, attributes))]
    pub async fn upsert_contact(
        &self,
        email: &SubscriberEmail,
        attributes: &ContactAttributes,
    ) -> Result<(), reqwest::Error> {
        let url = format!("{}/contacts", self.base_url);
        let body = CreateContactBody {
            email: email.as_ref(),
            attributes,
            update_enabled: true,
        };

        self.http_client
            .post(&url)
            .header("api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    #[tracing::instrument(name = "Update the attributes of a contact", skip(self, attributes))]
    pub async fn update_contact(
        &self,
        email: &SubscriberEmail,
        attributes: &ContactAttributes,
    ) -> Result<(), reqwest::Error> {
        self.put_contact(
            email,
            &UpdateContactBody {
                attributes: Some(attributes),
                email_blacklisted: None,
            },
        )
        .await
    }

    /// Blacklists the contact so it no longer receives campaigns.
    #[tracing::instrument(name = "Remove a contact from the marketing list", skip(self))]
    pub async fn remove_contact(&self, email: &SubscriberEmail) -> Result<(), reqwest::Error> {
        self.put_contact(
            email,
            &UpdateContactBody {
                attributes: None,
                email_blacklisted: Some(true),
            },
        )
        .await
    }

    async fn put_contact(
        &self,
        email: &SubscriberEmail,
        body: &UpdateContactBody<'_>,
    ) -> Result<(), reqwest::Error> {
        let url = format!(
            "{}/contacts/{}",
            self.base_url,
            urlencoding::encode(email.as_ref())
        );

        self.http_client
            .put(&url)
            .header("api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
