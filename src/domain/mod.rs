pub mod analytics_event;
pub mod email_preferences;
pub mod new_subscriber;
pub mod pdf_choice;
pub mod subscriber;
pub mod subscriber_email;
pub mod subscriber_name;
pub mod subscriber_status;
pub mod subscriber_tokens;
