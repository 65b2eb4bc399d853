use chrono::Utc;
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::domain::analytics_event::{EventType, NewAnalyticsEvent};
use crate::domain::subscriber_status::SubscriberStatus;

#[derive(Debug, PartialEq, Serialize)]
pub struct SourceStats {
    pub source: String,
    pub views: i64,
    pub submissions: i64,
    pub conversions: i64,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct VariantStats {
    pub source: String,
    pub variant: String,
    pub views: i64,
    pub submissions: i64,
    pub conversions: i64,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionStats {
    pub by_source: Vec<SourceStats>,
    pub by_variant: Vec<VariantStats>,
    pub total_subscribers: i64,
    pub subscribers_by_source: Vec<SourceCount>,
}

#[tracing::instrument(
    name = "Record an analytics event",
    skip(event, db_pool),
    fields(
        event_type = %event.event_type.as_ref(),
        source = %event.source
    )
)]
pub async fn record_event(db_pool: &SqlitePool, event: &NewAnalyticsEvent) -> Result<(), sqlx::Error> {
    let metadata = event.metadata.as_ref().map(|metadata| metadata.to_string());

    sqlx::query(
        r#"
        INSERT INTO analytics_events (event_type, source, variant, subscriber_email, metadata, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.event_type.as_ref())
    .bind(&event.source)
    .bind(&event.variant)
    .bind(&event.subscriber_email)
    .bind(metadata)
    .bind(Utc::now())
    .execute(db_pool)
    .await?;

    Ok(())
}

/// Point-in-time scan of the whole event log plus the confirmed subscriber table.
#[tracing::instrument(name = "Compute conversion statistics", skip(db_pool))]
pub async fn conversion_stats(db_pool: &SqlitePool) -> Result<ConversionStats, sqlx::Error> {
    let by_source = sqlx::query(
        r#"
        SELECT source,
            SUM(CASE WHEN event_type = ? THEN 1 ELSE 0 END) AS views,
            SUM(CASE WHEN event_type = ? THEN 1 ELSE 0 END) AS submissions,
            SUM(CASE WHEN event_type = ? THEN 1 ELSE 0 END) AS conversions
        FROM analytics_events
        GROUP BY source
        ORDER BY source
        "#,
    )
    .bind(EventType::FormView.as_ref())
    .bind(EventType::FormSubmit.as_ref())
    .bind(EventType::Conversion.as_ref())
    .try_map(|row: SqliteRow| {
        Ok(SourceStats {
            source: row.try_get("source")?,
            views: row.try_get("views")?,
            submissions: row.try_get("submissions")?,
            conversions: row.try_get("conversions")?,
        })
    })
    .fetch_all(db_pool)
    .await?;

    let by_variant = sqlx::query(
        r#"
        SELECT source, variant,
            SUM(CASE WHEN event_type = ? THEN 1 ELSE 0 END) AS views,
            SUM(CASE WHEN event_type = ? THEN 1 ELSE 0 END) AS submissions,
            SUM(CASE WHEN event_type = ? THEN 1 ELSE 0 END) AS conversions
        FROM analytics_events
        WHERE variant IS NOT NULL
        GROUP BY source, variant
        ORDER BY source, variant
        "#,
    )
    .bind(EventType::FormView.as_ref())
    .bind(EventType::FormSubmit.as_ref())
    .bind(EventType::Conversion.as_ref())
    .try_map(|row: SqliteRow| {
        Ok(VariantStats {
            source: row.try_get("source")?,
            variant: row.try_get("variant")?,
            views: row.try_get("views")?,
            submissions: row.try_get("submissions")?,
            conversions: row.try_get("conversions")?,
        })
    })
    .fetch_all(db_pool)
    .await?;

    let subscribers_by_source = sqlx::query(
        r#"
        SELECT source, COUNT(*) AS count
        FROM subscribers
        WHERE status = ?
        GROUP BY source
        ORDER BY source
        "#,
    )
    .bind(SubscriberStatus::Confirmed.as_ref())
    .try_map(|row: SqliteRow| {
        Ok(SourceCount {
            source: row.try_get("source")?,
            count: row.try_get("count")?,
        })
    })
    .fetch_all(db_pool)
    .await?;

    let total_subscribers = subscribers_by_source.iter().map(|row| row.count).sum();

    Ok(ConversionStats {
        by_source,
        by_variant,
        total_subscribers,
        subscribers_by_source,
    })
}
