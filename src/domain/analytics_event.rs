use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    FormView,
    FormSubmit,
    Conversion,
    /// Delivery and engagement notifications from the email provider.
    EmailEvent,
}

impl EventType {
    /// Events browsers may report directly; the rest are recorded by the server.
    pub fn is_client_reportable(&self) -> bool {
        matches!(
            self,
            EventType::FormView | EventType::FormSubmit | EventType::Conversion
        )
    }
}

impl AsRef<str> for EventType {
    fn as_ref(&self) -> &str {
        match self {
            EventType::FormView => "form_view",
            EventType::FormSubmit => "form_submit",
            EventType::Conversion => "conversion",
            EventType::EmailEvent => "email_event",
        }
    }
}

/// An entry to append to the analytics log.
#[derive(Debug, Clone)]
pub struct NewAnalyticsEvent {
    pub event_type: EventType,
    pub source: String,
    pub variant: Option<String>,
    pub subscriber_email: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl NewAnalyticsEvent {
    pub fn new(event_type: EventType, source: impl Into<String>) -> NewAnalyticsEvent {
        NewAnalyticsEvent {
            event_type,
            source: source.into(),
            variant: None,
            subscriber_email: None,
            metadata: None,
        }
    }

    pub fn with_subscriber_email(mut self, email: impl Into<String>) -> NewAnalyticsEvent {
        self.subscriber_email = Some(email.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> NewAnalyticsEvent {
        self.metadata = Some(metadata);
        self
    }
}
