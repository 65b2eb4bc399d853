use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::pdf_choice::Resource;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_status::SubscriberStatus;
use crate::domain::subscriber_tokens::{ConfirmationToken, PreferenceToken};

/// A stored subscriber, the aggregate root that owns its email preferences.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub name: String,
    pub company: Option<String>,
    pub role: Option<String>,
    pub primary_interest: Option<String>,
    pub how_heard: Option<String>,
    pub pdf_choice: String,
    pub source: String,
    pub status: SubscriberStatus,
    pub confirmation_token: ConfirmationToken,
    pub preference_token: PreferenceToken,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the preferences page is allowed to see about a subscriber.
#[derive(Debug, serde::Serialize)]
pub struct PublicProfile {
    pub email: String,
    pub name: String,
    pub status: SubscriberStatus,
}

impl Subscriber {
    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            email: self.email.as_ref().to_string(),
            name: self.name.clone(),
            status: self.status,
        }
    }

    pub fn resources(&self) -> Vec<Resource> {
        crate::domain::pdf_choice::resources_for(&self.pdf_choice)
    }
}
