//! Capability credentials handed to subscribers by email.
//!
//! Holding a token is the only proof required to act on a subscriber: the
//! confirmation token proves control of the mailbox (double opt-in) and the
//! preference token grants long-lived access to the preferences page.

use rand::distributions::Alphanumeric;
use rand::Rng;

const TOKEN_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationToken(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceToken(String);

/// Both tokens issued to a subscriber on creation.
#[derive(Debug, Clone)]
pub struct SubscriberTokens {
    pub confirmation: ConfirmationToken,
    pub preference: PreferenceToken,
}

impl SubscriberTokens {
    pub fn generate() -> SubscriberTokens {
        let confirmation = ConfirmationToken(generate_token());
        let mut preference = PreferenceToken(generate_token());

        while preference.0 == confirmation.0 {
            preference = PreferenceToken(generate_token());
        }

        SubscriberTokens {
            confirmation,
            preference,
        }
    }
}

impl ConfirmationToken {
    pub fn parse(token: String) -> Result<ConfirmationToken, String> {
        validate_token(&token)?;

        Ok(Self(token))
    }
}

impl PreferenceToken {
    pub fn parse(token: String) -> Result<PreferenceToken, String> {
        validate_token(&token)?;

        Ok(Self(token))
    }
}

impl AsRef<str> for ConfirmationToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PreferenceToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn generate_token() -> String {
    // thread_rng is a CSPRNG reseeded from the operating system
    let mut rng = rand::thread_rng();

    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(TOKEN_LENGTH)
        .collect()
}

fn validate_token(token: &str) -> Result<(), String> {
    let has_expected_length = token.len() == TOKEN_LENGTH;
    let is_alphanumeric = token.chars().all(|char| char.is_ascii_alphanumeric());

    if !has_expected_length || !is_alphanumeric {
        return Err(String::from("token is malformed"));
    }

    Ok(())
}
