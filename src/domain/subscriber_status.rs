/// Lifecycle of a subscriber. Transitions only move forward:
/// `Pending -> Confirmed`, `Pending | Confirmed -> Unsubscribed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    Pending,
    Confirmed,
    Unsubscribed,
}

impl SubscriberStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, SubscriberStatus::Pending)
    }

    pub fn is_unsubscribed(&self) -> bool {
        matches!(self, SubscriberStatus::Unsubscribed)
    }

    pub fn can_transition_to(&self, next: SubscriberStatus) -> bool {
        matches!(
            (self, next),
            (SubscriberStatus::Pending, SubscriberStatus::Confirmed)
                | (SubscriberStatus::Pending, SubscriberStatus::Unsubscribed)
                | (SubscriberStatus::Confirmed, SubscriberStatus::Unsubscribed)
        )
    }

    pub fn parse(status: String) -> Result<SubscriberStatus, String> {
        match status.as_str() {
            "pending" => Ok(SubscriberStatus::Pending),
            "confirmed" => Ok(SubscriberStatus::Confirmed),
            "unsubscribed" => Ok(SubscriberStatus::Unsubscribed),
            _ => Err(format!("{} is not a valid subscriber status", status)),
        }
    }
}

impl AsRef<str> for SubscriberStatus {
    fn as_ref(&self) -> &str {
        match self {
            SubscriberStatus::Pending => "pending",
            SubscriberStatus::Confirmed => "confirmed",
            SubscriberStatus::Unsubscribed => "unsubscribed",
        }
    }
}
