use anyhow::Result;
use time::OffsetDateTime;

use crate::infra::db::Db;

/// Delete every notice whose `event_date` is strictly in the past. One
/// statement, so a sweep is atomic; a concurrent sweep racing on the same
/// rows simply deletes zero of them. Notices without an `event_date` never
/// expire.
pub async fn sweep(db: &Db) -> Result<u64> {
    let today = OffsetDateTime::now_utc().date();
    let result = sqlx::query(
        "DELETE FROM notices WHERE event_date IS NOT NULL AND event_date < $1",
    )
    .bind(today)
    .execute(db.pool())
    .await?;

    let deleted = result.rows_affected();
    if deleted > 0 {
        tracing::info!(deleted, "removed expired notices");
    }
    Ok(deleted)
}
