use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::domain::email_preferences::{EmailPreferences, Frequency, PreferencesUpdate};
use crate::store::subscribers::decode_error;

/// Inserts the default preferences of a subscriber; a no-op when a row already exists.
#[tracing::instrument(name = "Create default email preferences", skip(db_pool))]
pub async fn create_default_preferences(
    db_pool: &SqlitePool,
    subscriber_id: Uuid,
) -> Result<(), sqlx::Error> {
    let defaults = EmailPreferences::default();

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO email_preferences (
            subscriber_id, topic_business_automation, topic_ai_trends, topic_ai_education,
            frequency, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(subscriber_id)
    .bind(defaults.topic_business_automation)
    .bind(defaults.topic_ai_trends)
    .bind(defaults.topic_ai_education)
    .bind(defaults.frequency.as_ref())
    .bind(Utc::now())
    .execute(db_pool)
    .await?;

    Ok(())
}

#[tracing::instrument(name = "Fetch email preferences", skip(db_pool))]
pub async fn get_preferences(
    db_pool: &SqlitePool,
    subscriber_id: Uuid,
) -> Result<Option<EmailPreferences>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT topic_business_automation, topic_ai_trends, topic_ai_education, frequency
        FROM email_preferences
        WHERE subscriber_id = ?
        "#,
    )
    .bind(subscriber_id)
    .try_map(|row: SqliteRow| {
        Ok(EmailPreferences {
            topic_business_automation: row.try_get("topic_business_automation")?,
            topic_ai_trends: row.try_get("topic_ai_trends")?,
            topic_ai_education: row.try_get("topic_ai_education")?,
            frequency: Frequency::parse(row.try_get("frequency")?).map_err(decode_error)?,
        })
    })
    .fetch_optional(db_pool)
    .await
}

/// Stored preferences, or the defaults when the subscriber has no row yet.
pub async fn get_preferences_or_default(
    db_pool: &SqlitePool,
    subscriber_id: Uuid,
) -> Result<EmailPreferences, sqlx::Error> {
    Ok(get_preferences(db_pool, subscriber_id)
        .await?
        .unwrap_or_default())
}

/// Writes only the fields present in `update`; absent fields keep their stored value.
#[tracing::instrument(name = "Update email preferences", skip(db_pool))]
pub async fn update_preferences(
    db_pool: &SqlitePool,
    subscriber_id: Uuid,
    update: &PreferencesUpdate,
) -> Result<(), sqlx::Error> {
    create_default_preferences(db_pool, subscriber_id).await?;

    sqlx::query(
        r#"
        UPDATE email_preferences
        SET topic_business_automation = COALESCE(?, topic_business_automation),
            topic_ai_trends = COALESCE(?, topic_ai_trends),
            topic_ai_education = COALESCE(?, topic_ai_education),
            frequency = COALESCE(?, frequency),
            updated_at = ?
        WHERE subscriber_id = ?
        "#,
    )
    .bind(update.topic_business_automation)
    .bind(update.topic_ai_trends)
    .bind(update.topic_ai_education)
    .bind(update.frequency.map(|frequency| frequency.as_ref().to_string()))
    .bind(Utc::now())
    .bind(subscriber_id)
    .execute(db_pool)
    .await?;

    Ok(())
}
