use serde::Deserialize;

use crate::domain::pdf_choice::PdfChoice;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_name::SubscriberName;

pub const DEFAULT_SOURCE: &str = "main_form";

/// A validated capture-form submission.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub name: SubscriberName,
    pub company: Option<String>,
    pub role: Option<String>,
    pub primary_interest: Option<String>,
    pub how_heard: Option<String>,
    pub pdf_choice: PdfChoice,
    pub source: String,
}

#[derive(Deserialize)]
pub struct NewSubscriberBody {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub role: Option<String>,
    pub primary_interest: Option<String>,
    pub how_heard: Option<String>,
    pub pdf_choice: String,
    pub source: Option<String>,
}

/// One rejected input field, reported back to the form.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> FieldError {
        FieldError {
            field,
            message: message.into(),
        }
    }
}

impl TryFrom<NewSubscriberBody> for NewSubscriber {
    type Error = Vec<FieldError>;

    fn try_from(body: NewSubscriberBody) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();

        let email = SubscriberEmail::parse(body.email)
            .map_err(|_| errors.push(FieldError::new("email", "Please enter a valid email")))
            .ok();
        let name = SubscriberName::parse(body.name)
            .map_err(|_| errors.push(FieldError::new("name", "Please enter your name")))
            .ok();
        let pdf_choice = PdfChoice::parse(body.pdf_choice)
            .map_err(|err| errors.push(FieldError::new("pdf_choice", err)))
            .ok();
        let source = match body.source.map(|source| source.trim().to_string()) {
            None => DEFAULT_SOURCE.to_string(),
            Some(source) if source.is_empty() => {
                errors.push(FieldError::new("source", "Source cannot be empty"));
                source
            }
            Some(source) => source,
        };

        match (email, name, pdf_choice) {
            (Some(email), Some(name), Some(pdf_choice)) if errors.is_empty() => Ok(NewSubscriber {
                email,
                name,
                company: non_blank(body.company),
                role: non_blank(body.role),
                primary_interest: non_blank(body.primary_interest),
                how_heard: non_blank(body.how_heard),
                pdf_choice,
                source,
            }),
            _ => Err(errors),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
