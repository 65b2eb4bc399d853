use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::subscriber_email::SubscriberEmail;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

/// Client of the transactional email API of the email provider.
pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: SubscriberEmail,
    sender_name: String,
    api_key: Secret<String>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody<'a> {
    sender: EmailContact<'a>,
    to: Vec<EmailContact<'a>>,
    subject: &'a str,
    html_content: &'a str,
}

#[derive(serde::Serialize)]
struct EmailContact<'a> {
    email: &'a str,
    name: &'a str,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: SubscriberEmail,
        sender_name: String,
        api_key: Secret<String>,
        timeout: Option<time::Duration>,
    ) -> EmailClient {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()
            .expect("Failed to build the email HTTP client");

        EmailClient {
            http_client,
            base_url,
            sender,
            sender_name,
            api_key,
        }
    }

    #[tracing::instrument(
        name = "Send a transactional email",
        skip(self, html_content),
        fields(recipient = %recipient)
    )]
    pub async fn send_email(
        &self,
        recipient: &SubscriberEmail,
        recipient_name: &str,
        subject: &str,
        html_content: &str,
    ) -> Result<(), reqwest::Error> {
        let url = format!("{}/smtp/email", self.base_url);
        let body = SendEmailBody {
            sender: EmailContact {
                email: self.sender.as_ref(),
                name: &self.sender_name,
            },
            to: vec![EmailContact {
                email: recipient.as_ref(),
                name: recipient_name,
            }],
            subject,
            html_content,
        };

        self.http_client
            .post(&url)
            .header("api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?; // return an error when server response status code is 4xx or 5xx

        Ok(())
    }
}
