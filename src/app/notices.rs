use anyhow::Result;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::reaper;
use crate::domain::notice::{Notice, NoticeFields};
use crate::domain::user::User;
use crate::infra::db::Db;

#[derive(Debug, thiserror::Error)]
pub enum NoticeError {
    #[error("only admins can manage notices")]
    Forbidden,
}

#[derive(Clone)]
pub struct NoticeService {
    db: Db,
}

impl NoticeService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create a notice, stamping `post_date` with today's UTC date.
    /// Notification fan-out is the caller's follow-up, never part of the
    /// insert.
    pub async fn create(&self, requester: &User, fields: NoticeFields) -> Result<Notice> {
        if !requester.is_admin {
            return Err(NoticeError::Forbidden.into());
        }

        let notice = Notice {
            id: Uuid::new_v4(),
            title: fields.title,
            description: fields.description,
            category: fields.category,
            post_date: OffsetDateTime::now_utc().date(),
            event_date: fields.event_date,
            event_start_time: fields.event_start_time,
            event_end_time: fields.event_end_time,
        };

        sqlx::query(
            "INSERT INTO notices (id, title, description, category, post_date, event_date, event_start_time, event_end_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(notice.id)
        .bind(&notice.title)
        .bind(&notice.description)
        .bind(notice.category.as_str())
        .bind(notice.post_date)
        .bind(notice.event_date)
        .bind(notice.event_start_time)
        .bind(notice.event_end_time)
        .execute(self.db.pool())
        .await?;

        Ok(notice)
    }

    /// List all live notices. Runs an expiry sweep first so expired rows are
    /// never observable through this path.
    pub async fn list(&self) -> Result<Vec<Notice>> {
        reaper::sweep(&self.db).await?;

        let rows = sqlx::query(
            "SELECT id, title, description, category, post_date, event_date, event_start_time, event_end_time \
             FROM notices ORDER BY post_date DESC, id",
        )
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(map_notice).collect()
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Notice>> {
        let row = sqlx::query(
            "SELECT id, title, description, category, post_date, event_date, event_start_time, event_end_time \
             FROM notices WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(map_notice).transpose()
    }

    /// Full-field replace, `post_date` excluded. An update to a notice that
    /// has already expired still applies; the next sweep removes it.
    pub async fn update(
        &self,
        requester: &User,
        id: Uuid,
        fields: NoticeFields,
    ) -> Result<Option<Notice>> {
        if !requester.is_admin {
            return Err(NoticeError::Forbidden.into());
        }

        let row = sqlx::query(
            "UPDATE notices \
             SET title = $2, description = $3, category = $4, event_date = $5, \
                 event_start_time = $6, event_end_time = $7 \
             WHERE id = $1 \
             RETURNING id, title, description, category, post_date, event_date, event_start_time, event_end_time",
        )
        .bind(id)
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.category.as_str())
        .bind(fields.event_date)
        .bind(fields.event_start_time)
        .bind(fields.event_end_time)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(map_notice).transpose()
    }

    pub async fn delete(&self, requester: &User, id: Uuid) -> Result<bool> {
        if !requester.is_admin {
            return Err(NoticeError::Forbidden.into());
        }

        let result = sqlx::query("DELETE FROM notices WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_notice(row: &sqlx::sqlite::SqliteRow) -> Result<Notice> {
    let category: String = row.get("category");
    Ok(Notice {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        category: category.parse()?,
        post_date: row.get("post_date"),
        event_date: row.get("event_date"),
        event_start_time: row.get("event_start_time"),
        event_end_time: row.get("event_end_time"),
    })
}
