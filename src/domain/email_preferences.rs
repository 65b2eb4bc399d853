use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn parse(frequency: String) -> Result<Frequency, String> {
        match frequency.as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => Err(format!("{} is not a valid email frequency", frequency)),
        }
    }
}

impl AsRef<str> for Frequency {
    fn as_ref(&self) -> &str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

/// Topic flags and send frequency of a single subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailPreferences {
    pub topic_business_automation: bool,
    pub topic_ai_trends: bool,
    pub topic_ai_education: bool,
    pub frequency: Frequency,
}

impl Default for EmailPreferences {
    fn default() -> Self {
        EmailPreferences {
            topic_business_automation: true,
            topic_ai_trends: true,
            topic_ai_education: true,
            frequency: Frequency::Weekly,
        }
    }
}

/// A partial preferences change: `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PreferencesUpdate {
    pub topic_business_automation: Option<bool>,
    pub topic_ai_trends: Option<bool>,
    pub topic_ai_education: Option<bool>,
    pub frequency: Option<Frequency>,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        self.topic_business_automation.is_none()
            && self.topic_ai_trends.is_none()
            && self.topic_ai_education.is_none()
            && self.frequency.is_none()
    }
}
