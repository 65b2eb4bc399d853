mod analytics;
mod health_check;
mod preferences;
mod subscriber_count;
mod subscriptions;
mod subscriptions_confirm;
mod webhooks;

pub use analytics::*;
pub use health_check::*;
pub use preferences::*;
pub use subscriber_count::*;
pub use subscriptions::*;
pub use subscriptions_confirm::*;
pub use webhooks::*;

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};
use serde::Deserialize;

/// Query string carrying a capability token (`?token=`).
#[derive(Deserialize, Debug)]
pub struct TokenParameters {
    pub token: Option<String>,
}

impl TokenParameters {
    /// The token, unless it is absent or blank.
    pub fn token(self) -> Option<String> {
        self.token.filter(|token| !token.trim().is_empty())
    }
}

pub fn json_error(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({ "error": message }))
}

/// Turns body deserialization failures into the same JSON shape as domain validation errors.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(serde_json::json!({
        "error": "Invalid data",
        "details": [{ "field": "body", "message": err.to_string() }]
    }));

    InternalError::from_response(err, response).into()
}

/// Renders the error together with every cause in its source chain.
pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
