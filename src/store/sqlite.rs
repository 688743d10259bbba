use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::store::schema::{split_sql_statements, SCHEMA_VERSION, SQLITE_SCHEMA_SQL};
use crate::store::StoreError;
use crate::taste::metrics::AlgorithmMetricsRecord;
use crate::taste::types::{
    Category, ChoiceRecord, ComparisonEvent, FinalPreferenceSummary, SessionRecord,
    StatedPreferences, StimulusItem,
};
use crate::taste::variant::Variant;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db_url = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        run_migrations(&pool).await?;
        tracing::info!(path = %path.display(), "sqlite store ready");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn list_by_category(&self, category: Category) -> Result<Vec<StimulusItem>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT "id", "imageUrl", "style", "subject", "palette", "complexity", "category"
               FROM "stimulus_items" WHERE "category" = ? ORDER BY "id""#,
        )
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    pub async fn lookup_by_ids(&self, ids: &[i64]) -> Result<Vec<StimulusItem>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            r#"SELECT "id", "imageUrl", "style", "subject", "palette", "complexity", "category"
               FROM "stimulus_items" WHERE "id" IN ({placeholders})"#
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        let found = rows.iter().map(row_to_item).collect::<Result<Vec<_>, _>>()?;

        Ok(ids
            .iter()
            .filter_map(|id| found.iter().find(|item| item.id == *id).cloned())
            .collect())
    }

    pub async fn upsert_items(&self, items: &[StimulusItem]) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        for item in items {
            sqlx::query(
                r#"INSERT INTO "stimulus_items"
                   ("id", "imageUrl", "style", "subject", "palette", "complexity", "category")
                   VALUES (?, ?, ?, ?, ?, ?, ?)
                   ON CONFLICT ("id") DO UPDATE SET
                     "imageUrl" = excluded."imageUrl",
                     "style" = excluded."style",
                     "subject" = excluded."subject",
                     "palette" = excluded."palette",
                     "complexity" = excluded."complexity",
                     "category" = excluded."category""#,
            )
            .bind(item.id)
            .bind(&item.image_url)
            .bind(&item.style)
            .bind(&item.subject)
            .bind(&item.palette)
            .bind(&item.complexity)
            .bind(item.category.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(items.len())
    }

    pub async fn create_session(&self, session: &SessionRecord, snapshot: &str) -> Result<(), StoreError> {
        let stated = serde_json::to_string(&session.stated)?;
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"INSERT INTO "taste_sessions"
               ("id", "variant", "statedPreferences", "interactionCount", "createdAt", "completedAt")
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&session.id)
        .bind(session.variant.as_str())
        .bind(stated)
        .bind(session.interaction_count as i64)
        .bind(session.created_at_ms)
        .bind(session.completed_at_ms)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"INSERT INTO "preference_snapshots" ("sessionId", "snapshot", "updatedAt") VALUES (?, ?, ?)"#,
        )
        .bind(&session.id)
        .bind(snapshot)
        .bind(session.created_at_ms)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let row = sqlx::query(
            r#"SELECT "id", "variant", "statedPreferences", "interactionCount", "createdAt", "completedAt"
               FROM "taste_sessions" WHERE "id" = ?"#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_session).transpose()
    }

    pub async fn load_snapshot(&self, session_id: &str) -> Result<Option<String>, StoreError> {
        let snapshot: Option<String> = sqlx::query_scalar(
            r#"SELECT "snapshot" FROM "preference_snapshots" WHERE "sessionId" = ?"#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(snapshot)
    }

    pub async fn save_snapshot(&self, session_id: &str, snapshot: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        write_snapshot(&mut tx, session_id, snapshot).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn commit_choice(&self, choice: &ChoiceRecord, snapshot: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        record_choice(&mut tx, choice).await?;
        write_snapshot(&mut tx, &choice.session_id, snapshot).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_choices(&self, session_id: &str) -> Result<Vec<ChoiceRecord>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT "event", "recordedAt" FROM "choice_history"
               WHERE "sessionId" = ? ORDER BY "sequenceIndex""#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ChoiceRecord, StoreError> {
                let event: String = row.try_get("event")?;
                let event: ComparisonEvent = serde_json::from_str(&event)?;
                Ok(ChoiceRecord {
                    session_id: session_id.to_string(),
                    event,
                    recorded_at_ms: row.try_get("recordedAt")?,
                })
            })
            .collect()
    }

    pub async fn complete_session(
        &self,
        choice: &ChoiceRecord,
        snapshot: &str,
        summary: &FinalPreferenceSummary,
        metrics: &AlgorithmMetricsRecord,
        completed_at_ms: i64,
    ) -> Result<(), StoreError> {
        let summary_json = serde_json::to_string(summary)?;
        let metrics_json = serde_json::to_string(metrics)?;
        let session_id = &choice.session_id;

        let mut tx = self.pool.begin().await?;
        record_choice(&mut tx, choice).await?;
        write_snapshot(&mut tx, session_id, snapshot).await?;
        sqlx::query(r#"UPDATE "taste_sessions" SET "completedAt" = ? WHERE "id" = ?"#)
            .bind(completed_at_ms)
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"INSERT OR REPLACE INTO "preference_summaries" ("sessionId", "summary", "createdAt")
               VALUES (?, ?, ?)"#,
        )
        .bind(session_id)
        .bind(summary_json)
        .bind(completed_at_ms)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"INSERT OR REPLACE INTO "algorithm_metrics" ("sessionId", "variant", "record", "recordedAt")
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(session_id)
        .bind(metrics.variant.as_str())
        .bind(metrics_json)
        .bind(metrics.recorded_at_ms)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_summary(&self, session_id: &str) -> Result<Option<FinalPreferenceSummary>, StoreError> {
        let summary: Option<String> = sqlx::query_scalar(
            r#"SELECT "summary" FROM "preference_summaries" WHERE "sessionId" = ?"#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        match summary {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn list_metrics(&self, limit: usize) -> Result<Vec<AlgorithmMetricsRecord>, StoreError> {
        let rows: Vec<String> = sqlx::query_scalar(
            r#"SELECT "record" FROM "algorithm_metrics" ORDER BY "recordedAt" DESC, rowid DESC LIMIT ?"#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|raw| serde_json::from_str(raw).map_err(StoreError::from))
            .collect()
    }
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
    let version: Option<String> =
        sqlx::query_scalar(r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#)
            .fetch_optional(pool)
            .await
            .unwrap_or(None);

    if version.as_deref() == Some(SCHEMA_VERSION) {
        return Ok(());
    }

    for stmt in split_sql_statements(SQLITE_SCHEMA_SQL) {
        sqlx::query(&stmt).execute(pool).await?;
    }

    sqlx::query(r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', ?)"#)
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn write_snapshot(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    session_id: &str,
    snapshot: &str,
) -> Result<(), StoreError> {
    let now = chrono::Utc::now().timestamp_millis();
    let result = sqlx::query(
        r#"INSERT INTO "preference_snapshots" ("sessionId", "snapshot", "updatedAt") VALUES (?, ?, ?)
           ON CONFLICT ("sessionId") DO UPDATE SET "snapshot" = excluded."snapshot", "updatedAt" = excluded."updatedAt""#,
    )
    .bind(session_id)
    .bind(snapshot)
    .bind(now)
    .execute(&mut **tx)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
            Err(StoreError::SessionNotFound(session_id.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

async fn record_choice(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    choice: &ChoiceRecord,
) -> Result<(), StoreError> {
    let event = serde_json::to_string(&choice.event)?;
    let updated = sqlx::query(
        r#"UPDATE "taste_sessions" SET "interactionCount" = "interactionCount" + 1 WHERE "id" = ?"#,
    )
    .bind(&choice.session_id)
    .execute(&mut **tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(StoreError::SessionNotFound(choice.session_id.clone()));
    }

    sqlx::query(
        r#"INSERT INTO "choice_history" ("sessionId", "sequenceIndex", "event", "recordedAt")
           VALUES (?, ?, ?, ?)"#,
    )
    .bind(&choice.session_id)
    .bind(choice.event.sequence_index as i64)
    .bind(event)
    .bind(choice.recorded_at_ms)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn row_to_item(row: &SqliteRow) -> Result<StimulusItem, StoreError> {
    let category: String = row.try_get("category")?;
    Ok(StimulusItem {
        id: row.try_get("id")?,
        image_url: row.try_get("imageUrl")?,
        style: row.try_get("style")?,
        subject: row.try_get("subject")?,
        palette: row.try_get("palette")?,
        complexity: row.try_get("complexity")?,
        category: Category::parse(&category)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown category {category}")))?,
    })
}

fn row_to_session(row: &SqliteRow) -> Result<SessionRecord, StoreError> {
    let variant: String = row.try_get("variant")?;
    let stated: String = row.try_get("statedPreferences")?;
    let stated: StatedPreferences = serde_json::from_str(&stated)?;
    let interaction_count: i64 = row.try_get("interactionCount")?;

    Ok(SessionRecord {
        id: row.try_get("id")?,
        variant: Variant::from_str(&variant)
            .map_err(|_| StoreError::Corrupt(format!("unknown variant {variant}")))?,
        stated,
        interaction_count: u32::try_from(interaction_count)
            .map_err(|_| StoreError::Corrupt(format!("interaction count {interaction_count}")))?,
        created_at_ms: row.try_get("createdAt")?,
        completed_at_ms: row.try_get("completedAt")?,
    })
}
