//! PostgreSQL connection and event queries

use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{EventId, EventRecord, NewEvent};
use crate::sync::EventSource;

/// PostgreSQL connection pool
#[derive(Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    /// Create a new PostgreSQL connection pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// `id` is selected as text, so ties must sort on the qualified column or
// Postgres compares the output alias ("9" > "10").
const LATEST_EVENT_SQL: &str = r#"
    SELECT id::text AS id, role, content, created_at
    FROM agent_events
    ORDER BY created_at DESC, agent_events.id DESC
    LIMIT 1
"#;

const RECENT_EVENTS_SQL: &str = r#"
    SELECT id::text AS id, role, content, created_at
    FROM agent_events
    ORDER BY created_at DESC, agent_events.id DESC
    LIMIT $1
"#;

const INSERT_EVENT_SQL: &str = r#"
    INSERT INTO agent_events (role, content)
    VALUES ($1, $2)
    RETURNING id::text AS id, role, content, created_at
"#;

/// Repository over the `agent_events` table.
///
/// The schema belongs to the backing service; ids are read as text so any
/// id column type works.
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Create a new event repository
    pub fn new(pool: &PostgresPool) -> Self {
        Self {
            pool: pool.pool.clone(),
        }
    }

    /// The newest event, if any
    pub async fn latest(&self) -> Result<Option<EventRecord>> {
        let row = sqlx::query(LATEST_EVENT_SQL)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_event).transpose()
    }

    /// Newest events first
    pub async fn recent(&self, limit: i64) -> Result<Vec<EventRecord>> {
        let rows = sqlx::query(RECENT_EVENTS_SQL)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_event).collect()
    }

    /// Insert an event; the store assigns `id` and `created_at`
    pub async fn insert(&self, event: &NewEvent) -> Result<EventRecord> {
        let row = sqlx::query(INSERT_EVENT_SQL)
            .bind(&event.role)
            .bind(&event.content)
            .fetch_one(&self.pool)
            .await?;

        let record = row_to_event(&row)?;
        debug!(event_id = %record.id, "Inserted event");
        Ok(record)
    }
}

#[async_trait::async_trait]
impl EventSource for EventRepository {
    async fn fetch_latest(&self) -> Result<Option<EventRecord>> {
        self.latest().await
    }
}

fn row_to_event(row: &PgRow) -> Result<EventRecord> {
    let id: String = row.try_get("id")?;
    let content: Option<String> = row.try_get("content")?;

    Ok(EventRecord {
        id: EventId::parse(&id),
        role: row.try_get("role")?,
        content: content.unwrap_or_default(),
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_by(sql: &str) -> &str {
        let start = sql.find("ORDER BY").unwrap();
        let end = sql[start..].find("LIMIT").unwrap();
        sql[start..start + end].trim()
    }

    #[test]
    fn test_id_ties_sort_on_the_column_not_the_text_alias() {
        for sql in [LATEST_EVENT_SQL, RECENT_EVENTS_SQL] {
            assert_eq!(
                order_by(sql),
                "ORDER BY created_at DESC, agent_events.id DESC"
            );
        }
    }

    #[test]
    fn test_queries_read_the_same_columns() {
        let columns = "SELECT id::text AS id, role, content, created_at";
        assert!(LATEST_EVENT_SQL.contains(columns));
        assert!(RECENT_EVENTS_SQL.contains(columns));
        assert!(INSERT_EVENT_SQL.contains("RETURNING id::text AS id, role, content, created_at"));
    }
}
