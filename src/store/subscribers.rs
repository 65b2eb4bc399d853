use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    new_subscriber::NewSubscriber,
    subscriber::Subscriber,
    subscriber_email::SubscriberEmail,
    subscriber_status::SubscriberStatus,
    subscriber_tokens::{ConfirmationToken, PreferenceToken, SubscriberTokens},
};

const SUBSCRIBER_COLUMNS: &str = r#"
    id, email, name, company, role, primary_interest, how_heard, pdf_choice, source,
    status, confirmation_token, preference_token, confirmed_at, created_at, updated_at
"#;

#[tracing::instrument(
    name = "Insert a new subscriber into the database",
    skip(new_subscriber, tokens, db_pool),
    fields(subscriber_email = %new_subscriber.email)
)]
pub async fn insert_subscriber(
    db_pool: &SqlitePool,
    new_subscriber: &NewSubscriber,
    tokens: &SubscriberTokens,
) -> Result<Subscriber, sqlx::Error> {
    let now = Utc::now();
    let subscriber = Subscriber {
        id: Uuid::new_v4(),
        email: new_subscriber.email.clone(),
        name: new_subscriber.name.as_ref().to_string(),
        company: new_subscriber.company.clone(),
        role: new_subscriber.role.clone(),
        primary_interest: new_subscriber.primary_interest.clone(),
        how_heard: new_subscriber.how_heard.clone(),
        pdf_choice: new_subscriber.pdf_choice.as_ref().to_string(),
        source: new_subscriber.source.clone(),
        status: SubscriberStatus::Pending,
        confirmation_token: tokens.confirmation.clone(),
        preference_token: tokens.preference.clone(),
        confirmed_at: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO subscribers (
            id, email, name, company, role, primary_interest, how_heard, pdf_choice, source,
            status, confirmation_token, preference_token, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(subscriber.id)
    .bind(subscriber.email.as_ref())
    .bind(&subscriber.name)
    .bind(&subscriber.company)
    .bind(&subscriber.role)
    .bind(&subscriber.primary_interest)
    .bind(&subscriber.how_heard)
    .bind(&subscriber.pdf_choice)
    .bind(&subscriber.source)
    .bind(subscriber.status.as_ref())
    .bind(subscriber.confirmation_token.as_ref())
    .bind(subscriber.preference_token.as_ref())
    .bind(subscriber.created_at)
    .bind(subscriber.updated_at)
    .execute(db_pool)
    .await?;

    Ok(subscriber)
}

#[tracing::instrument(name = "Fetch a subscriber by email", skip(db_pool))]
pub async fn find_by_email(
    db_pool: &SqlitePool,
    email: &SubscriberEmail,
) -> Result<Option<Subscriber>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM subscribers WHERE email = ?",
        SUBSCRIBER_COLUMNS
    );

    let subscriber = sqlx::query(&query)
        .bind(email.as_ref())
        .try_map(subscriber_from_row)
        .fetch_optional(db_pool)
        .await?;

    Ok(subscriber)
}

#[tracing::instrument(name = "Fetch a subscriber by confirmation token", skip_all)]
pub async fn find_by_confirmation_token(
    db_pool: &SqlitePool,
    token: &ConfirmationToken,
) -> Result<Option<Subscriber>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM subscribers WHERE confirmation_token = ?",
        SUBSCRIBER_COLUMNS
    );

    let subscriber = sqlx::query(&query)
        .bind(token.as_ref())
        .try_map(subscriber_from_row)
        .fetch_optional(db_pool)
        .await?;

    Ok(subscriber)
}

#[tracing::instrument(name = "Fetch a subscriber by preference token", skip_all)]
pub async fn find_by_preference_token(
    db_pool: &SqlitePool,
    token: &PreferenceToken,
) -> Result<Option<Subscriber>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM subscribers WHERE preference_token = ?",
        SUBSCRIBER_COLUMNS
    );

    let subscriber = sqlx::query(&query)
        .bind(token.as_ref())
        .try_map(subscriber_from_row)
        .fetch_optional(db_pool)
        .await?;

    Ok(subscriber)
}

/// Overwrites the profile of a subscriber that has not confirmed yet. Tokens are never touched.
#[tracing::instrument(
    name = "Update the profile of a pending subscriber",
    skip(new_subscriber, db_pool),
    fields(subscriber_email = %new_subscriber.email)
)]
pub async fn update_pending_profile(
    db_pool: &SqlitePool,
    new_subscriber: &NewSubscriber,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE subscribers
        SET name = ?, company = ?, role = ?, primary_interest = ?, how_heard = ?,
            pdf_choice = ?, source = ?, updated_at = ?
        WHERE email = ? AND status = ?
        "#,
    )
    .bind(new_subscriber.name.as_ref())
    .bind(&new_subscriber.company)
    .bind(&new_subscriber.role)
    .bind(&new_subscriber.primary_interest)
    .bind(&new_subscriber.how_heard)
    .bind(new_subscriber.pdf_choice.as_ref())
    .bind(&new_subscriber.source)
    .bind(Utc::now())
    .bind(new_subscriber.email.as_ref())
    .bind(SubscriberStatus::Pending.as_ref())
    .execute(db_pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Moves a pending subscriber to confirmed. Returns `false` when no pending
/// subscriber owns the token, so the transition happens at most once.
#[tracing::instrument(name = "Confirm a pending subscriber", skip_all)]
pub async fn confirm(db_pool: &SqlitePool, token: &ConfirmationToken) -> Result<bool, sqlx::Error> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE subscribers
        SET status = ?, confirmed_at = ?, updated_at = ?
        WHERE confirmation_token = ? AND status = ?
        "#,
    )
    .bind(SubscriberStatus::Confirmed.as_ref())
    .bind(now)
    .bind(now)
    .bind(token.as_ref())
    .bind(SubscriberStatus::Pending.as_ref())
    .execute(db_pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Returns `false` when the email is unknown or already unsubscribed.
#[tracing::instrument(name = "Unsubscribe a subscriber", skip(db_pool))]
pub async fn unsubscribe(db_pool: &SqlitePool, email: &SubscriberEmail) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE subscribers
        SET status = ?, updated_at = ?
        WHERE email = ? AND status != ?
        "#,
    )
    .bind(SubscriberStatus::Unsubscribed.as_ref())
    .bind(Utc::now())
    .bind(email.as_ref())
    .bind(SubscriberStatus::Unsubscribed.as_ref())
    .execute(db_pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[tracing::instrument(name = "Count confirmed subscribers", skip(db_pool))]
pub async fn count_confirmed(db_pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM subscribers WHERE status = ?")
        .bind(SubscriberStatus::Confirmed.as_ref())
        .fetch_one(db_pool)
        .await
}

fn subscriber_from_row(row: SqliteRow) -> Result<Subscriber, sqlx::Error> {
    Ok(Subscriber {
        id: row.try_get("id")?,
        email: SubscriberEmail::parse(row.try_get("email")?).map_err(decode_error)?,
        name: row.try_get("name")?,
        company: row.try_get("company")?,
        role: row.try_get("role")?,
        primary_interest: row.try_get("primary_interest")?,
        how_heard: row.try_get("how_heard")?,
        pdf_choice: row.try_get("pdf_choice")?,
        source: row.try_get("source")?,
        status: SubscriberStatus::parse(row.try_get("status")?).map_err(decode_error)?,
        confirmation_token: ConfirmationToken::parse(row.try_get("confirmation_token")?)
            .map_err(decode_error)?,
        preference_token: PreferenceToken::parse(row.try_get("preference_token")?)
            .map_err(decode_error)?,
        confirmed_at: row.try_get("confirmed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}
