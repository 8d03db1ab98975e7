use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::error::AppError;
use crate::models::memory::format_date;
use crate::models::{
    ListQuery, Memory, MemoryPage, MemoryPatch, MemoryRow, NewMemory, SearchCriteria, Tag,
};

const DUPLICATE_TITLE: &str = "A memory with this title already exists";
pub const NO_SEARCH_CRITERIA: &str = "At least one search parameter is required";

// Stays well under SQLite's bound-parameter limit.
const TAG_LOOKUP_CHUNK: usize = 500;

const MEMORY_COLUMNS: &str = "id, title, description, image, date";

/// Persistence for memories, tags and the `memory_tags` join table.
#[derive(Clone)]
pub struct MemoryStore {
    pool: SqlitePool,
}

impl MemoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn create(&self, new: NewMemory) -> Result<Memory, AppError> {
        let input = new.validate()?;

        let mut tx = self.pool.begin().await?;

        let id = sqlx::query("INSERT INTO memory (title, description, image, date) VALUES (?, ?, ?, ?)")
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.image)
            .bind(format_date(&input.date))
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::on_unique_violation(e, DUPLICATE_TITLE))?
            .last_insert_rowid();

        link_tags(&mut tx, id, &input.tags).await?;

        tx.commit().await?;
        tracing::info!(id, title = %input.title, "memory created");

        self.get(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Memory, AppError> {
        let row: Option<MemoryRow> = sqlx::query_as(&format!("SELECT {MEMORY_COLUMNS} FROM memory WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(AppError::NotFound);
        };

        let mut tags = self.load_tags(&[row.id]).await?;
        let names = tags.remove(&row.id).unwrap_or_default();
        Ok(row.with_tags(names))
    }

    pub async fn list(&self, query: &ListQuery) -> Result<MemoryPage, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM memory")
            .fetch_one(&self.pool)
            .await?;

        let direction = query.order.as_sql();
        let rows: Vec<MemoryRow> = sqlx::query_as(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memory ORDER BY date {direction}, id {direction} LIMIT ? OFFSET ?"
        ))
        .bind(query.limit)
        .bind(query.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(MemoryPage {
            total,
            page: query.page,
            limit: query.limit,
            memories: self.attach_tags(rows).await?,
        })
    }

    pub async fn update(&self, id: i64, patch: MemoryPatch) -> Result<Memory, AppError> {
        let mut tx = self.pool.begin().await?;

        // A write has to come first: a deferred transaction that reads and
        // then upgrades gets SQLITE_BUSY without waiting on the busy timeout.
        let claimed = sqlx::query("UPDATE memory SET id = id WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        let current: MemoryRow = sqlx::query_as(&format!("SELECT {MEMORY_COLUMNS} FROM memory WHERE id = ?"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        let (row, tags) = patch.apply(current)?;

        sqlx::query("UPDATE memory SET title = ?, description = ?, image = ?, date = ? WHERE id = ?")
            .bind(&row.title)
            .bind(&row.description)
            .bind(&row.image)
            .bind(format_date(&row.date))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::on_unique_violation(e, DUPLICATE_TITLE))?;

        if let Some(tags) = tags {
            sqlx::query("DELETE FROM memory_tags WHERE memory_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_tags(&mut tx, id, &tags).await?;
        }

        tx.commit().await?;
        tracing::info!(id, "memory updated");

        self.get(id).await
    }

    /// Removes the memory and its tag links. Tags themselves are kept.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM memory_tags WHERE memory_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM memory WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        tx.commit().await?;
        tracing::info!(id, "memory deleted");
        Ok(())
    }

    /// Returns every memory matching all supplied criteria, newest first.
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Memory>, AppError> {
        if criteria.is_empty() {
            return Err(AppError::validation(NO_SEARCH_CRITERIA));
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT m.id, m.title, m.description, m.image, m.date FROM memory m WHERE 1 = 1",
        );

        if let Some(text) = &criteria.query {
            let pattern = format!("%{}%", escape_like(text));
            qb.push(" AND (m.title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR m.description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        if let Some(tag) = &criteria.tag {
            qb.push(
                " AND EXISTS (SELECT 1 FROM memory_tags mt JOIN tag t ON t.id = mt.tag_id \
                 WHERE mt.memory_id = m.id AND t.name = ",
            )
            .push_bind(tag.clone())
            .push(")");
        }
        if let Some(start) = &criteria.start {
            qb.push(" AND m.date >= ").push_bind(format_date(start));
        }
        if let Some(end) = &criteria.end {
            qb.push(" AND m.date <= ").push_bind(format_date(end));
        }
        qb.push(" ORDER BY m.date DESC, m.id DESC");

        let rows: Vec<MemoryRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        tracing::debug!(matches = rows.len(), ?criteria, "memory search");

        self.attach_tags(rows).await
    }

    pub async fn find_tag(&self, name: &str) -> Result<Option<Tag>, AppError> {
        let tag = sqlx::query_as("SELECT id, name FROM tag WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    async fn attach_tags(&self, rows: Vec<MemoryRow>) -> Result<Vec<Memory>, AppError> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut tags = self.load_tags(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let names = tags.remove(&row.id).unwrap_or_default();
                row.with_tags(names)
            })
            .collect())
    }

    /// Tag names per memory id, in the order the links were made.
    async fn load_tags(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<String>>, AppError> {
        let mut tags: HashMap<i64, Vec<String>> = HashMap::new();

        for chunk in ids.chunks(TAG_LOOKUP_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT mt.memory_id, t.name FROM memory_tags mt JOIN tag t ON t.id = mt.tag_id WHERE mt.memory_id IN (",
            );
            let mut separated = qb.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(") ORDER BY mt.rowid");

            let rows: Vec<(i64, String)> = qb.build_query_as().fetch_all(&self.pool).await?;
            for (memory_id, name) in rows {
                tags.entry(memory_id).or_default().push(name);
            }
        }

        Ok(tags)
    }
}

/// Get-or-create by exact name. The UNIQUE constraint on `tag.name` decides
/// between concurrent creators; the loser's insert is a no-op.
async fn get_or_create_tag(conn: &mut SqliteConnection, name: &str) -> Result<Tag, AppError> {
    sqlx::query("INSERT INTO tag (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
        .bind(name)
        .execute(&mut *conn)
        .await?;

    let tag = sqlx::query_as("SELECT id, name FROM tag WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(tag)
}

async fn link_tags(conn: &mut SqliteConnection, memory_id: i64, names: &[String]) -> Result<(), AppError> {
    for name in names {
        let tag = get_or_create_tag(conn, name).await?;
        sqlx::query("INSERT OR IGNORE INTO memory_tags (memory_id, tag_id) VALUES (?, ?)")
            .bind(memory_id)
            .bind(tag.id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
