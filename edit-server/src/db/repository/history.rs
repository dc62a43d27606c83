//! History Repository
//!
//! Append-only version log. Operations are stored as a type tag plus a JSON
//! parameter blob and decoded back into [`Operation`] on read.

use super::{RepoError, RepoResult};
use shared::models::{Operation, VersionCreate, VersionRecord};
use sqlx::{Executor, FromRow, Sqlite};

#[derive(Debug, FromRow)]
struct HistoryRow {
    id: i64,
    image_id: String,
    operation_type: String,
    operation_params: String,
    input_path: String,
    output_path: String,
    file_size: i64,
    created_at: i64,
    sequence: i64,
}

impl TryFrom<HistoryRow> for VersionRecord {
    type Error = RepoError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let operation = Operation::from_stored(&row.operation_type, &row.operation_params)
            .map_err(|e| {
                RepoError::Decode(format!(
                    "history {} ({}): {e}",
                    row.id, row.operation_type
                ))
            })?;
        Ok(VersionRecord {
            id: row.id,
            image_id: row.image_id,
            operation,
            input_path: row.input_path,
            output_path: row.output_path,
            file_size: row.file_size,
            created_at: row.created_at,
            sequence: row.sequence,
        })
    }
}

const COLUMNS: &str = "id, image_id, operation_type, operation_params, input_path, output_path, \
     file_size, created_at, sequence";

/// Append a record with `sequence = max(existing) + 1` (1 for an empty log).
///
/// Sequence assignment and insert are one statement. Concurrent appends for
/// the same image are serialized by the caller's image lock; the
/// `UNIQUE(image_id, sequence)` constraint turns a violation into
/// [`RepoError::Duplicate`].
pub async fn append<'e, E>(executor: E, data: &VersionCreate) -> RepoResult<VersionRecord>
where
    E: Executor<'e, Database = Sqlite>,
{
    let params = data
        .operation
        .params_json()
        .map_err(|e| RepoError::Decode(format!("operation params: {e}")))?;

    let sql = format!(
        "INSERT INTO history (image_id, operation_type, operation_params, input_path, output_path, \
         file_size, created_at, sequence) \
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, COALESCE(MAX(sequence), 0) + 1 \
         FROM history WHERE image_id = ?1 \
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, HistoryRow>(&sql)
        .bind(&data.image_id)
        .bind(data.operation.operation_type())
        .bind(params)
        .bind(&data.input_path)
        .bind(&data.output_path)
        .bind(data.file_size)
        .bind(shared::util::now_millis())
        .fetch_one(executor)
        .await?;
    row.try_into()
}

/// All records for an image, ascending by sequence
pub async fn list<'e, E>(executor: E, image_id: &str) -> RepoResult<Vec<VersionRecord>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {COLUMNS} FROM history WHERE image_id = ? ORDER BY sequence ASC");
    let rows = sqlx::query_as::<_, HistoryRow>(&sql)
        .bind(image_id)
        .fetch_all(executor)
        .await?;
    rows.into_iter().map(VersionRecord::try_from).collect()
}

pub async fn find_by_sequence<'e, E>(
    executor: E,
    image_id: &str,
    sequence: i64,
) -> RepoResult<Option<VersionRecord>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {COLUMNS} FROM history WHERE image_id = ? AND sequence = ?");
    let row = sqlx::query_as::<_, HistoryRow>(&sql)
        .bind(image_id)
        .bind(sequence)
        .fetch_optional(executor)
        .await?;
    row.map(VersionRecord::try_from).transpose()
}

/// Remove a single record.
///
/// Undo only ever removes the tail; retention removes the oldest entries.
pub async fn delete<'e, E>(executor: E, record: &VersionRecord) -> RepoResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("DELETE FROM history WHERE id = ?")
        .bind(record.id)
        .execute(executor)
        .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "history {} (image {}, sequence {})",
            record.id, record.image_id, record.sequence
        )));
    }
    Ok(())
}

/// Images whose log is longer than `limit`
pub async fn image_ids_exceeding<'e, E>(executor: E, limit: usize) -> RepoResult<Vec<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT image_id FROM history GROUP BY image_id HAVING COUNT(*) > ? ORDER BY image_id",
    )
    .bind(limit)
    .fetch_all(executor)
    .await?;
    Ok(ids)
}
